//! A single tracked do-after and its lifecycle state.

use std::fmt;
use std::time::Duration;

use bevy::prelude::*;
use serde::Serialize;

use super::{DoAfterArgs, StartError};
use crate::components::Hands;
use crate::interaction::{distance, position};

/// Per-actor identifier of a do-after. Ids wrap and are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DoAfterId(pub u16);

impl fmt::Display for DoAfterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Globally unique reference to a do-after: its actor plus its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoAfterHandle {
    /// Entity owning the registry.
    pub actor: Entity,
    /// Id within that registry.
    pub id: DoAfterId,
}

impl DoAfterHandle {
    /// Builds a handle.
    #[must_use]
    pub const fn new(actor: Entity, id: DoAfterId) -> Self {
        Self { actor, id }
    }
}

impl fmt::Display for DoAfterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.actor, self.id)
    }
}

/// Lifecycle state of a do-after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DoAfterStatus {
    /// Counting down.
    Running,
    /// Interrupted before completing.
    Cancelled,
    /// Finished successfully.
    Completed,
}

impl DoAfterStatus {
    /// Whether the do-after has stopped running.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// What interrupted a do-after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CancelReason {
    /// A participant no longer exists.
    ParticipantMissing,
    /// The user moved too far.
    Moved,
    /// The target or tool left reach.
    OutOfReach,
    /// An attempt observer or the extra check refused.
    AttemptVetoed,
    /// The user lost its hands.
    HandsLost,
    /// The item held at start was dropped.
    ItemDropped,
    /// The active hand or its contents changed.
    HandChanged,
    /// The user can no longer interact.
    CannotInteract,
    /// Interrupting damage.
    Damaged,
    /// The user was downed or killed.
    Incapacitated,
    /// A newer duplicate replaced it.
    Superseded,
    /// Cancelled through the public API.
    External,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ParticipantMissing => "participant missing",
            Self::Moved => "user moved",
            Self::OutOfReach => "out of reach",
            Self::AttemptVetoed => "attempt vetoed",
            Self::HandsLost => "hands lost",
            Self::ItemDropped => "item dropped",
            Self::HandChanged => "hand changed",
            Self::CannotInteract => "cannot interact",
            Self::Damaged => "damaged",
            Self::Incapacitated => "incapacitated",
            Self::Superseded => "superseded",
            Self::External => "cancelled",
        })
    }
}

/// State captured when a do-after starts, compared against on every tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartSnapshot {
    /// User position, when movement breaks the do-after.
    pub user_position: Option<Vec3>,
    /// User-to-target distance, when movement breaks the do-after.
    pub target_distance: Option<f32>,
    /// Active hand name, when hands are needed.
    pub initial_hand: Option<String>,
    /// Item in the active hand, when hands are needed.
    pub initial_item: Option<Entity>,
}

impl StartSnapshot {
    /// Records what the cancellation checks will compare against.
    pub(crate) fn capture(world: &World, args: &DoAfterArgs) -> Result<Self, StartError> {
        let mut snapshot = Self::default();
        if args.break_on_move {
            snapshot.user_position = position(world, args.user);
            snapshot.target_distance = args
                .target
                .and_then(|target| distance(world, args.user, target));
        }
        // Without a break flag there is nothing to compare against; a
        // handless user is left for the evaluator to interrupt.
        if args.need_hand && (args.break_on_hand_change || args.break_on_drop_item) {
            let hands = world
                .get::<Hands>(args.user)
                .filter(|hands| hands.count() > 0)
                .ok_or(StartError::MissingHands { user: args.user })?;
            snapshot.initial_hand = hands.active_hand().map(str::to_owned);
            snapshot.initial_item = hands.active_held();
        }
        Ok(snapshot)
    }
}

/// A do-after tracked in a [`DoAfterRegistry`](super::DoAfterRegistry).
#[derive(Debug, Clone)]
pub struct DoAfter {
    id: DoAfterId,
    args: DoAfterArgs,
    status: DoAfterStatus,
    start_time: Duration,
    elapsed: Duration,
    cancelled_time: Option<Duration>,
    completed_time: Option<Duration>,
    cancel_reason: Option<CancelReason>,
    snapshot: StartSnapshot,
    completions: u32,
}

impl DoAfter {
    pub(crate) const fn new(
        id: DoAfterId,
        args: DoAfterArgs,
        now: Duration,
        snapshot: StartSnapshot,
    ) -> Self {
        Self {
            id,
            args,
            status: DoAfterStatus::Running,
            start_time: now,
            elapsed: Duration::ZERO,
            cancelled_time: None,
            completed_time: None,
            cancel_reason: None,
            snapshot,
            completions: 0,
        }
    }

    /// Id within the owning registry.
    #[must_use]
    pub const fn id(&self) -> DoAfterId {
        self.id
    }

    /// Arguments it was started with.
    #[must_use]
    pub const fn args(&self) -> &DoAfterArgs {
        &self.args
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> DoAfterStatus {
        self.status
    }

    /// Whether it is still counting down.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.status, DoAfterStatus::Running)
    }

    /// Clock time of the latest (re)start.
    #[must_use]
    pub const fn start_time(&self) -> Duration {
        self.start_time
    }

    /// Time since the latest (re)start, as of the last tick.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fraction of the delay elapsed, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.args.delay.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.args.delay.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// When it was cancelled.
    #[must_use]
    pub const fn cancelled_time(&self) -> Option<Duration> {
        self.cancelled_time
    }

    /// When it last completed.
    #[must_use]
    pub const fn completed_time(&self) -> Option<Duration> {
        self.completed_time
    }

    /// What cancelled it.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel_reason
    }

    /// State captured at start.
    #[must_use]
    pub const fn snapshot(&self) -> &StartSnapshot {
        &self.snapshot
    }

    /// How many times it has completed, counting repeats.
    #[must_use]
    pub const fn completions(&self) -> u32 {
        self.completions
    }

    /// Time it entered a terminal state.
    #[must_use]
    pub fn terminal_time(&self) -> Option<Duration> {
        self.cancelled_time.or(self.completed_time)
    }

    pub(crate) fn set_id(&mut self, id: DoAfterId) {
        self.id = id;
    }

    pub(crate) fn refresh_elapsed(&mut self, now: Duration) {
        self.elapsed = now.saturating_sub(self.start_time);
    }

    pub(crate) fn delay_elapsed(&self) -> bool {
        self.elapsed >= self.args.delay
    }

    /// Returns `false` when already terminal.
    pub(crate) fn mark_cancelled(&mut self, now: Duration, reason: CancelReason) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = DoAfterStatus::Cancelled;
        self.cancelled_time = Some(now);
        self.cancel_reason = Some(reason);
        true
    }

    /// Returns `false` when already terminal.
    pub(crate) fn mark_completed(&mut self, now: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = DoAfterStatus::Completed;
        self.completed_time = Some(now);
        self.completions = self.completions.saturating_add(1);
        true
    }

    /// Runs a completed do-after again from `now`, keeping its snapshot.
    pub(crate) fn restart(&mut self, now: Duration) -> bool {
        if self.status != DoAfterStatus::Completed {
            return false;
        }
        self.status = DoAfterStatus::Running;
        self.start_time = now;
        self.elapsed = Duration::ZERO;
        self.completed_time = None;
        true
    }

    /// Whether the terminal grace window has passed.
    pub(crate) fn grace_expired(&self, now: Duration, excess: Duration) -> bool {
        self.terminal_time()
            .is_some_and(|at| now.saturating_sub(at) > excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DoAfterEvent;
    use rstest::{fixture, rstest};

    #[derive(Clone, Debug)]
    struct Mop;

    impl DoAfterEvent for Mop {}

    #[fixture]
    fn running() -> DoAfter {
        let user = World::new().spawn_empty().id();
        let args = DoAfterArgs::new(user, Duration::from_secs(2), Mop);
        DoAfter::new(DoAfterId(4), args, Duration::from_secs(10), StartSnapshot::default())
    }

    #[rstest]
    fn terminal_transitions_happen_once(mut running: DoAfter) {
        assert!(running.mark_cancelled(Duration::from_secs(11), CancelReason::Moved));
        assert!(!running.mark_completed(Duration::from_secs(12)));
        assert!(!running.mark_cancelled(Duration::from_secs(12), CancelReason::External));
        assert_eq!(running.cancel_reason(), Some(CancelReason::Moved));
        assert_eq!(running.terminal_time(), Some(Duration::from_secs(11)));
    }

    #[rstest]
    fn restart_only_follows_completion(mut running: DoAfter) {
        assert!(!running.restart(Duration::from_secs(11)));
        running.refresh_elapsed(Duration::from_secs(12));
        assert!(running.delay_elapsed());
        assert!(running.mark_completed(Duration::from_secs(12)));
        assert!(running.restart(Duration::from_secs(12)));
        assert!(running.is_running());
        assert_eq!(running.start_time(), Duration::from_secs(12));
        assert_eq!(running.completions(), 1);
        assert_eq!(running.completed_time(), None);
    }

    #[rstest]
    #[case(Duration::from_millis(10_500), false)]
    #[case(Duration::from_millis(10_501), true)]
    fn grace_window_is_exclusive(
        mut running: DoAfter,
        #[case] now: Duration,
        #[case] expired: bool,
    ) {
        running.mark_cancelled(Duration::from_secs(10), CancelReason::External);
        assert_eq!(running.grace_expired(now, Duration::from_millis(500)), expired);
    }

    #[rstest]
    fn progress_is_clamped(mut running: DoAfter) {
        running.refresh_elapsed(Duration::from_secs(11));
        assert!((running.progress() - 0.5).abs() < f32::EPSILON);
        running.refresh_elapsed(Duration::from_secs(20));
        assert!((running.progress() - 1.0).abs() < f32::EPSILON);
    }

    #[rstest]
    fn handle_display_names_actor_and_id() {
        let actor = World::new().spawn_empty().id();
        let handle = DoAfterHandle::new(actor, DoAfterId(7));
        assert_eq!(handle.to_string(), format!("{actor}#7"));
    }
}
