//! Serialisable progress view of running do-afters for client prediction.

use std::time::Duration;

use bevy::prelude::*;
use serde::Serialize;

use super::{DoAfter, DoAfterId};

/// What a client needs to draw and locally predict a do-after.
///
/// Derived only from stored state, so two snapshots of the same entry taken
/// on the same tick are identical. Entities are encoded with
/// [`Entity::to_bits`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoAfterSnapshot {
    /// Id within the actor's registry.
    pub id: DoAfterId,
    /// Clock time of the latest (re)start.
    pub start_time: Duration,
    /// Time until completion.
    pub delay: Duration,
    /// User position captured at start.
    pub user_position: Option<[f32; 3]>,
    /// User-to-target distance captured at start.
    pub target_distance: Option<f32>,
    /// Allowed drift before movement cancels.
    pub movement_threshold: f32,
    /// Reach override, if any.
    pub distance_threshold: Option<f32>,
    /// Whether movement cancels.
    pub break_on_move: bool,
    /// Whether movement while weightless cancels.
    pub break_on_weightless_move: bool,
    /// Target entity bits.
    pub target: Option<u64>,
    /// Tool entity bits.
    pub used: Option<u64>,
    /// Item held in the active hand at start.
    pub initial_item: Option<u64>,
    /// Clients should not draw progress for this entry.
    pub hidden: bool,
}

impl From<&DoAfter> for DoAfterSnapshot {
    fn from(entry: &DoAfter) -> Self {
        let args = entry.args();
        let snapshot = entry.snapshot();
        Self {
            id: entry.id(),
            start_time: entry.start_time(),
            delay: args.delay,
            user_position: snapshot.user_position.map(|position| position.to_array()),
            target_distance: snapshot.target_distance,
            movement_threshold: args.movement_threshold,
            distance_threshold: args.distance_threshold,
            break_on_move: args.break_on_move,
            break_on_weightless_move: args.break_on_weightless_move,
            target: args.target.map(Entity::to_bits),
            used: args.used.map(Entity::to_bits),
            initial_item: snapshot.initial_item.map(Entity::to_bits),
            hidden: args.hidden,
        }
    }
}
