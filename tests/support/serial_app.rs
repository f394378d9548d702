//! Serial `rspec` harness around a shared do-after `App`.
//!
//! rspec wants its fixture to be `Clone + Send + Sync`; a Bevy `App` is
//! neither, so scenarios share one behind a mutex and the suite runs on a
//! single thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use rspec::report::Report;
use rspec::{block::Suite, ConfigurationBuilder, Logger, Runner};

/// An `App` that may be captured by rspec fixtures.
pub struct SerialApp(App);

// SAFETY: every access goes through the mutex in `SharedApp` and
// `run_serial` disables rspec's parallel execution.
unsafe impl Send for SerialApp {}
unsafe impl Sync for SerialApp {}

impl std::fmt::Debug for SerialApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SerialApp")
    }
}

impl SerialApp {
    /// Read-only access to the wrapped world.
    pub fn world(&self) -> &World {
        self.0.world()
    }

    /// Mutable access to the wrapped world.
    pub fn world_mut(&mut self) -> &mut World {
        self.0.world_mut()
    }

    /// Runs `trigger` against the world, applies the commands its observers
    /// queued and then runs one frame.
    pub fn trigger_and_tick(&mut self, trigger: impl FnOnce(&mut World)) {
        let world = self.0.world_mut();
        trigger(world);
        world.flush();
        self.0.update();
    }
}

/// Shared handle cloned into each rspec scenario.
pub type SharedApp = Arc<Mutex<SerialApp>>;

/// Wraps `app` for sharing across scenarios.
pub fn share(app: App) -> SharedApp {
    Arc::new(Mutex::new(SerialApp(app)))
}

/// Locks the shared app, ignoring poison left by an earlier failed scenario.
pub fn lock(app: &SharedApp) -> MutexGuard<'_, SerialApp> {
    app.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `suite` on the current thread, reporting every failure, then fails
/// the enclosing test if any scenario failed.
///
/// rspec catches scenario panics itself, so the report is the only place a
/// failure shows up.
pub fn run_serial<T>(suite: &Suite<T>)
where
    T: Clone + Send + Sync + std::fmt::Debug,
{
    let config = ConfigurationBuilder::default()
        .parallel(false)
        .exit_on_failure(false)
        .build()
        .unwrap_or_else(|e| panic!("rspec configuration failed: {e}"));
    let report =
        Runner::new(config, vec![Arc::new(Logger::new(std::io::stdout()))]).run(suite);
    assert!(
        report.is_success(),
        "{} of {} scenarios failed",
        report.get_failed(),
        report.get_passed() + report.get_failed() + report.get_ignored()
    );
}
