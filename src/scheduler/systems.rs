//! Tick-driven advancement and the observers reacting to damage and mob state.

use std::time::Duration;

use bevy::prelude::*;
use log::{debug, trace};

use super::lifecycle::{self, excess_time};
use super::{evaluator, ActiveDoAfters, CancelReason, DoAfterHandle, DoAfterRegistry};
use crate::clock;
use crate::components::MobState;

/// Damage dealt to an entity, raised by the host's health logic.
#[derive(EntityEvent, Debug, Clone, Copy, PartialEq)]
pub struct DamageChanged {
    /// Entity whose damage changed.
    pub entity: Entity,
    /// Magnitude of the change.
    pub delta: f32,
    /// Whether total damage went up.
    pub increased: bool,
    /// Whether this damage should interrupt actions. Healing and
    /// environmental ticks usually set this to `false`.
    pub interrupts: bool,
}

impl DamageChanged {
    /// Interrupting damage of `delta`.
    #[must_use]
    pub const fn interrupting(entity: Entity, delta: f32) -> Self {
        Self {
            entity,
            delta,
            increased: true,
            interrupts: true,
        }
    }
}

/// A mob's state transition, raised by the host's health logic.
#[derive(EntityEvent, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobStateChanged {
    /// Entity whose state changed.
    pub entity: Entity,
    /// State before the change.
    pub old: MobState,
    /// State after the change.
    pub new: MobState,
}

/// Advances every active do-after by one tick.
///
/// Terminal entries past their grace window are purged. Running entries are
/// evaluated in id order; the first failing check cancels, otherwise an
/// entry whose delay has elapsed completes. Actors left with an empty
/// registry lose their [`ActiveDoAfters`] marker.
pub fn tick_do_afters_system(world: &mut World) {
    let now = clock::now(world);
    let excess = excess_time(world);
    let mut active = world.query_filtered::<Entity, With<ActiveDoAfters>>();
    let actors: Vec<Entity> = active.iter(world).collect();
    for actor in actors {
        tick_actor(world, actor, now, excess);
    }
}

fn tick_actor(world: &mut World, actor: Entity, now: Duration, excess: Duration) {
    let ids = world
        .get::<DoAfterRegistry>(actor)
        .map(DoAfterRegistry::ids)
        .unwrap_or_default();
    for id in ids {
        tick_entry(world, DoAfterHandle::new(actor, id), now, excess);
    }
    let drained = world
        .get::<DoAfterRegistry>(actor)
        .is_none_or(DoAfterRegistry::is_empty);
    if drained {
        if let Ok(mut entity) = world.get_entity_mut(actor) {
            entity.remove::<ActiveDoAfters>();
            trace!("actor {actor} has no do-afters left");
        }
    }
}

fn tick_entry(world: &mut World, handle: DoAfterHandle, now: Duration, excess: Duration) {
    let Some(entry) = lifecycle::refreshed(world, handle, now) else {
        return;
    };
    if !entry.is_running() {
        if entry.grace_expired(now, excess) {
            lifecycle::purge(world, handle);
        }
        return;
    }
    if let Some(reason) = evaluator::should_cancel(world, &entry, handle) {
        lifecycle::cancel(world, handle, reason);
        return;
    }
    if entry.delay_elapsed() {
        lifecycle::complete(world, handle, now);
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value for Events V2."
)]
pub(crate) fn interrupt_on_damage(
    damage: On<DamageChanged>,
    registries: Query<&DoAfterRegistry>,
    mut commands: Commands,
) {
    if !damage.increased || !damage.interrupts {
        return;
    }
    let Ok(registry) = registries.get(damage.entity) else {
        return;
    };
    for id in registry.broken_by_damage(damage.delta) {
        let handle = DoAfterHandle::new(damage.entity, id);
        debug!("damage of {} interrupts do-after {handle}", damage.delta);
        commands.queue(move |world: &mut World| {
            lifecycle::cancel(world, handle, CancelReason::Damaged);
        });
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value for Events V2."
)]
pub(crate) fn interrupt_on_mob_state(changed: On<MobStateChanged>, mut commands: Commands) {
    if !changed.new.is_incapacitated() {
        return;
    }
    let actor = changed.entity;
    commands.queue(move |world: &mut World| {
        let cancelled = lifecycle::cancel_all(world, actor, CancelReason::Incapacitated);
        if cancelled > 0 {
            debug!("{actor} incapacitated, cancelled {cancelled} do-afters");
        }
    });
}
