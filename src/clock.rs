//! Fixed-step simulation clock driving do-after timing.

use std::time::Duration;

use bevy::prelude::*;

use crate::DoAfterSettings;

/// Current simulation time as seen by the scheduler.
///
/// The clock only moves when [`advance_do_after_clock`] runs, once per
/// schedule pass, by [`DoAfterSettings::tick_delta`]. Timing therefore has
/// one-tick resolution and never depends on wall-clock time.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoAfterClock {
    now: Duration,
    tick: u64,
}

impl DoAfterClock {
    /// Returns the current simulation time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Returns how many ticks have elapsed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Moves the clock forward by `delta` and counts one tick.
    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now.saturating_add(delta);
        self.tick = self.tick.saturating_add(1);
    }
}

/// Advances [`DoAfterClock`] by the configured tick delta.
pub fn advance_do_after_clock(mut clock: ResMut<DoAfterClock>, settings: Res<DoAfterSettings>) {
    clock.advance(settings.tick_delta);
}

/// Reads the scheduler time, treating a missing clock as the epoch.
pub(crate) fn now(world: &World) -> Duration {
    world
        .get_resource::<DoAfterClock>()
        .map_or(Duration::ZERO, DoAfterClock::now)
}
