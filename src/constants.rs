//! Scheduler constants shared across systems.
//!
//! These are the defaults used when no [`DoAfterSettings`](crate::DoAfterSettings)
//! resource is inserted before the plugin, and the per-action defaults applied
//! by [`DoAfterArgs::new`](crate::DoAfterArgs::new).

/// Simulation time advanced by one scheduler tick, in seconds.
pub const DEFAULT_TICK_SECONDS: f64 = 1.0 / 30.0;
/// How long a cancelled or completed do-after stays queryable, in seconds.
pub const EXCESS_TIME_SECONDS: f64 = 0.5;
/// Reach used by range checks when a do-after sets no distance threshold.
pub const INTERACTION_RANGE: f32 = 1.5;
/// Distance a user (or the user-target gap) may drift before `break_on_move`
/// interrupts.
pub const MOVEMENT_THRESHOLD: f32 = 0.3;
/// Smallest single damage delta that interrupts a `break_on_damage` action.
pub const DAMAGE_THRESHOLD: f32 = 1.0;
