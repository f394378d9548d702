//! Start parameters for a do-after.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::*;
use bitflags::bitflags;

use super::events::{ErasedEvent, Payload};
use super::DoAfterEvent;
use crate::{DAMAGE_THRESHOLD, MOVEMENT_THRESHOLD};

/// How often the attempt event is raised for a running do-after.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AttemptFrequency {
    /// Never raised.
    #[default]
    Never,
    /// Raised once when starting and once just before completing.
    StartAndEnd,
    /// Raised on every tick, including the start.
    EveryTick,
}

bitflags! {
    /// Criteria two do-afters of the same user must share to be duplicates.
    ///
    /// An empty set matches every pair.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DuplicateConditions: u8 {
        /// Both use the same tool.
        const SAME_TOOL = 1 << 0;
        /// Both act on the same target.
        const SAME_TARGET = 1 << 1;
        /// Both carry the same payload type.
        const SAME_EVENT = 1 << 2;
        /// All of the above.
        const ALL = Self::SAME_TOOL.bits() | Self::SAME_TARGET.bits() | Self::SAME_EVENT.bits();
    }
}

/// Predicate evaluated with the attempt. Returning `false` cancels.
pub type ExtraCheck = Arc<dyn Fn(&World) -> bool + Send + Sync>;

/// Everything needed to start a do-after.
///
/// Construct with [`DoAfterArgs::new`], then adjust the public fields or
/// chain the `with_*` helpers. The arguments are copied into the running
/// instance and never change afterwards.
///
/// ```
/// use std::time::Duration;
/// use bevy::prelude::World;
/// use do_after::{AttemptFrequency, DoAfterArgs, DoAfterEvent};
///
/// #[derive(Clone, Debug)]
/// struct Unscrew;
/// impl DoAfterEvent for Unscrew {}
///
/// let mut world = World::new();
/// let user = world.spawn_empty().id();
/// let panel = world.spawn_empty().id();
/// let mut args = DoAfterArgs::new(user, Duration::from_secs(3), Unscrew).with_target(panel);
/// args.break_on_move = true;
/// args.attempt_frequency = AttemptFrequency::StartAndEnd;
/// assert_eq!(args.target, Some(panel));
/// ```
#[derive(Clone)]
pub struct DoAfterArgs {
    /// Acting entity; owns the do-after.
    pub user: Entity,
    /// Entity acted upon.
    pub target: Option<Entity>,
    /// Tool or item being used.
    pub used: Option<Entity>,
    /// Time until completion.
    pub delay: Duration,
    /// Entity receiving attempt events and an extra terminal event.
    pub event_target: Option<Entity>,
    /// Also deliver attempt and terminal events undirected, in addition to
    /// any event target.
    pub broadcast: bool,
    /// Deliver the terminal event to the user.
    pub raise_on_user: bool,
    /// Deliver the terminal event to the target.
    pub raise_on_target: bool,
    /// Deliver the terminal event to the tool.
    pub raise_on_used: bool,
    /// The user must keep at least one hand.
    pub need_hand: bool,
    /// Cancel when the active hand or its contents change.
    pub break_on_hand_change: bool,
    /// Cancel when the item held at start leaves the user's hands.
    pub break_on_drop_item: bool,
    /// Cancel when the user moves away from where they started.
    pub break_on_move: bool,
    /// Apply movement checks even while the user is weightless.
    pub break_on_weightless_move: bool,
    /// Distance the user may drift before movement cancels.
    pub movement_threshold: f32,
    /// Reach override for target and tool checks.
    pub distance_threshold: Option<f32>,
    /// Cancel when the user takes enough interrupting damage.
    pub break_on_damage: bool,
    /// Smallest damage delta that cancels.
    pub damage_threshold: f32,
    /// Cancel when the user can no longer interact.
    pub require_can_interact: bool,
    /// When the attempt event fires.
    pub attempt_frequency: AttemptFrequency,
    /// Refuse to start while a duplicate is running.
    pub block_duplicate: bool,
    /// Cancel running duplicates when this one starts.
    pub cancel_duplicate: bool,
    /// What makes two do-afters duplicates.
    pub duplicate_condition: DuplicateConditions,
    /// Excluded from client-facing progress displays.
    pub hidden: bool,
    event: Arc<dyn ErasedEvent>,
    extra_check: Option<ExtraCheck>,
}

impl DoAfterArgs {
    /// Creates arguments with the stock interruption rules.
    pub fn new(user: Entity, delay: Duration, payload: impl DoAfterEvent) -> Self {
        Self {
            user,
            target: None,
            used: None,
            delay,
            event_target: None,
            broadcast: false,
            raise_on_user: true,
            raise_on_target: true,
            raise_on_used: true,
            need_hand: false,
            break_on_hand_change: true,
            break_on_drop_item: true,
            break_on_move: false,
            break_on_weightless_move: true,
            movement_threshold: MOVEMENT_THRESHOLD,
            distance_threshold: None,
            break_on_damage: false,
            damage_threshold: DAMAGE_THRESHOLD,
            require_can_interact: true,
            attempt_frequency: AttemptFrequency::Never,
            block_duplicate: true,
            cancel_duplicate: true,
            duplicate_condition: DuplicateConditions::ALL,
            hidden: false,
            event: Arc::new(Payload(payload)),
            extra_check: None,
        }
    }

    /// Sets the target.
    #[must_use]
    pub fn with_target(mut self, target: Entity) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the tool.
    #[must_use]
    pub fn with_used(mut self, used: Entity) -> Self {
        self.used = Some(used);
        self
    }

    /// Sets the event target.
    #[must_use]
    pub fn with_event_target(mut self, event_target: Entity) -> Self {
        self.event_target = Some(event_target);
        self
    }

    /// Adds a predicate checked whenever the attempt event fires.
    #[must_use]
    pub fn with_extra_check(
        mut self,
        check: impl Fn(&World) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.extra_check = Some(Arc::new(check));
        self
    }

    /// Borrows the payload if it is a `P`.
    #[must_use]
    pub fn payload<P: DoAfterEvent>(&self) -> Option<&P> {
        self.event.as_any().downcast_ref::<P>()
    }

    /// Type name of the payload, for diagnostics.
    #[must_use]
    pub fn payload_type_name(&self) -> &'static str {
        self.event.type_name()
    }

    /// Whether both carry the same payload type.
    #[must_use]
    pub fn same_event(&self, other: &Self) -> bool {
        self.payload_type() == other.payload_type()
    }

    pub(crate) fn payload_type(&self) -> TypeId {
        self.event.payload_type()
    }

    pub(crate) fn event(&self) -> &dyn ErasedEvent {
        self.event.as_ref()
    }

    pub(crate) fn extra_check(&self) -> Option<&ExtraCheck> {
        self.extra_check.as_ref()
    }

    /// Every entity the do-after names, with the role it plays.
    pub(crate) fn participants(&self) -> impl Iterator<Item = (super::Participant, Entity)> {
        use super::Participant;
        [
            Some((Participant::User, self.user)),
            self.target.map(|e| (Participant::Target, e)),
            self.used.map(|e| (Participant::Used, e)),
            self.event_target.map(|e| (Participant::EventTarget, e)),
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Debug for DoAfterArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoAfterArgs")
            .field("user", &self.user)
            .field("target", &self.target)
            .field("used", &self.used)
            .field("delay", &self.delay)
            .field("event", &self.event.type_name())
            .field("event_target", &self.event_target)
            .field("attempt_frequency", &self.attempt_frequency)
            .field("duplicate_condition", &self.duplicate_condition)
            .field("extra_check", &self.extra_check.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Clone, Debug, PartialEq)]
    struct Cuff {
        tight: bool,
    }

    impl DoAfterEvent for Cuff {}

    #[derive(Clone, Debug)]
    struct Uncuff;

    impl DoAfterEvent for Uncuff {}

    #[rstest]
    fn defaults_match_stock_rules() {
        let user = World::new().spawn_empty().id();
        let args = DoAfterArgs::new(user, Duration::from_secs(2), Uncuff);
        assert!(args.block_duplicate && args.cancel_duplicate);
        assert_eq!(args.duplicate_condition, DuplicateConditions::ALL);
        assert!(args.require_can_interact);
        assert!(!args.break_on_move && !args.break_on_damage && !args.need_hand);
        assert_eq!(args.attempt_frequency, AttemptFrequency::Never);
    }

    #[rstest]
    fn payload_downcasts_to_its_own_type_only() {
        let user = World::new().spawn_empty().id();
        let args = DoAfterArgs::new(user, Duration::ZERO, Cuff { tight: true });
        assert_eq!(args.payload::<Cuff>(), Some(&Cuff { tight: true }));
        assert!(args.payload::<Uncuff>().is_none());
        assert!(args.payload_type_name().ends_with("Cuff"));
    }

    #[rstest]
    fn same_event_compares_payload_types() {
        let user = World::new().spawn_empty().id();
        let a = DoAfterArgs::new(user, Duration::ZERO, Cuff { tight: true });
        let b = DoAfterArgs::new(user, Duration::ZERO, Cuff { tight: false });
        let c = DoAfterArgs::new(user, Duration::ZERO, Uncuff);
        assert!(a.same_event(&b));
        assert!(!a.same_event(&c));
    }

    #[rstest]
    fn participants_list_named_entities() {
        let mut world = World::new();
        let user = world.spawn_empty().id();
        let tool = world.spawn_empty().id();
        let args = DoAfterArgs::new(user, Duration::ZERO, Uncuff).with_used(tool);
        let entities: Vec<Entity> = args.participants().map(|(_, e)| e).collect();
        assert_eq!(entities, vec![user, tool]);
    }
}
