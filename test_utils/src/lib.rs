//! Utility helpers for tests.
//!
//! Builds deterministic apps around [`DoAfterPlugin`] and records what the
//! scheduler reports through observers so tests can assert on it afterwards.
pub mod outcomes;

use std::time::Duration;

use bevy::prelude::*;
use do_after::{DoAfterPlugin, DoAfterSettings};

pub use outcomes::{
    install_outcome_recorder, install_rejection_recorder, Outcome, Outcomes, Rejections,
};

/// Tick length used by [`do_after_app`]; a round number keeps delays exact.
pub const TEST_TICK: Duration = Duration::from_millis(100);

/// Creates an app running [`DoAfterPlugin`] with a fixed [`TEST_TICK`] and
/// the default grace window.
#[must_use]
pub fn do_after_app() -> App {
    do_after_app_with(DoAfterSettings {
        tick_delta: TEST_TICK,
        ..DoAfterSettings::default()
    })
}

/// Creates an app running [`DoAfterPlugin`] with the given settings.
#[must_use]
pub fn do_after_app_with(settings: DoAfterSettings) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(settings);
    app.add_plugins(DoAfterPlugin);
    app
}

/// Runs `ticks` schedule passes.
pub fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}
