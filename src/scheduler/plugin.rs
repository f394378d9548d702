//! Bevy plugin wiring the scheduler into an app.

use bevy::prelude::*;
use log::debug;

use super::systems::{interrupt_on_damage, interrupt_on_mob_state, tick_do_afters_system};
use super::DoAfterStartRejected;
use crate::clock::{advance_do_after_clock, DoAfterClock};
use crate::interaction::Interactions;
use crate::DoAfterSettings;

/// System set containing the clock advance and the do-after tick.
///
/// Order game systems that start or inspect do-afters relative to this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoAfterSystems;

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value for Events V2."
)]
fn log_rejected_start(event: On<DoAfterStartRejected>) {
    debug!("{}", event.event());
}

/// Installs the do-after scheduler.
///
/// Resources already present are kept, so insert custom
/// [`DoAfterSettings`] or [`Interactions`] before adding the plugin to
/// override them.
#[derive(Default)]
pub struct DoAfterPlugin;

impl Plugin for DoAfterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DoAfterSettings>()
            .init_resource::<DoAfterClock>()
            .init_resource::<Interactions>();

        app.add_observer(log_rejected_start);
        app.add_observer(interrupt_on_damage);
        app.add_observer(interrupt_on_mob_state);

        app.add_systems(
            Update,
            (advance_do_after_clock, tick_do_afters_system)
                .chain()
                .in_set(DoAfterSystems),
        );
    }
}
