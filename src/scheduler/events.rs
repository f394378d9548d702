//! Attempt and completion events, and the router that delivers them.
//!
//! Payloads are ordinary Rust types implementing [`DoAfterEvent`]. The
//! concrete type is captured when [`DoAfterArgs::new`] is called and hidden
//! behind [`ErasedEvent`], so the scheduler can raise
//! [`DoAfterAttempt<P>`] and [`DoAfterFinished<P>`] without knowing `P`.
//!
//! Events are triggered with [`World::trigger_ref`], which lets the router read
//! back the `cancelled` and `repeat` flags observers set during delivery.

use std::any::{Any, TypeId};
use std::fmt;

use bevy::prelude::*;

use super::{DoAfterArgs, DoAfterHandle};

/// Payload carried by a do-after and handed back on every event it raises.
///
/// ```
/// use do_after::DoAfterEvent;
///
/// #[derive(Clone, Debug)]
/// struct PryDoor {
///     force: f32,
/// }
///
/// impl DoAfterEvent for PryDoor {}
/// ```
pub trait DoAfterEvent: Clone + fmt::Debug + Send + Sync + 'static {}

/// Role an entity plays when it receives a do-after event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// The acting entity.
    User,
    /// The entity acted upon.
    Target,
    /// The tool or item being used.
    Used,
    /// The explicitly configured event target.
    EventTarget,
    /// Undirected delivery; only global observers see it.
    Broadcast,
}

/// Cancellable check raised before continuing or completing a do-after.
///
/// Delivered to the configured event target, and undirected as well when
/// broadcasting or when there is no event target. Observers veto the action
/// with [`Self::cancel`].
#[derive(EntityEvent, Debug, Clone)]
pub struct DoAfterAttempt<P: DoAfterEvent> {
    /// Receiving entity; `Entity::PLACEHOLDER` for undirected deliveries.
    pub entity: Entity,
    /// Why this entity receives the event.
    pub recipient: Recipient,
    /// The do-after being checked.
    pub handle: DoAfterHandle,
    /// Acting entity.
    pub user: Entity,
    /// Entity acted upon, if any.
    pub target: Option<Entity>,
    /// Tool in use, if any.
    pub used: Option<Entity>,
    /// Caller payload.
    pub payload: P,
    cancelled: bool,
}

impl<P: DoAfterEvent> DoAfterAttempt<P> {
    /// Vetoes the do-after. It is cancelled instead of continuing.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether an observer has vetoed the attempt.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The receiving entity, or `None` for undirected deliveries.
    #[must_use]
    pub fn receiver(&self) -> Option<Entity> {
        (self.recipient != Recipient::Broadcast).then_some(self.entity)
    }
}

/// Terminal notification for a do-after, raised once on completion and once
/// on cancellation.
///
/// Observers may set [`Self::repeat`] on a successful completion to run the
/// same do-after again from the current tick, and [`Self::handled`] to tell
/// later recipients the outcome was already acted upon.
#[derive(EntityEvent, Debug, Clone)]
pub struct DoAfterFinished<P: DoAfterEvent> {
    /// Receiving entity; `Entity::PLACEHOLDER` for undirected deliveries.
    pub entity: Entity,
    /// Why this entity receives the event.
    pub recipient: Recipient,
    /// The finished do-after.
    pub handle: DoAfterHandle,
    /// Acting entity.
    pub user: Entity,
    /// Entity acted upon, if any.
    pub target: Option<Entity>,
    /// Tool in use, if any.
    pub used: Option<Entity>,
    /// Caller payload.
    pub payload: P,
    /// `true` when the do-after was interrupted rather than completed.
    pub cancelled: bool,
    /// Set by observers once the outcome has been applied.
    pub handled: bool,
    /// Set by observers to restart a completed do-after.
    pub repeat: bool,
}

impl<P: DoAfterEvent> DoAfterFinished<P> {
    /// The receiving entity, or `None` for undirected deliveries.
    #[must_use]
    pub fn receiver(&self) -> Option<Entity> {
        (self.recipient != Recipient::Broadcast).then_some(self.entity)
    }
}

/// Object-safe view of a payload, created at the `DoAfterArgs::new` call site.
pub(crate) trait ErasedEvent: Send + Sync + 'static {
    fn payload_type(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;

    /// Raises the attempt event. Returns `false` when an observer vetoed it.
    fn raise_attempt(&self, world: &mut World, handle: DoAfterHandle, args: &DoAfterArgs) -> bool;

    /// Raises the terminal event to every recipient. Returns whether an
    /// observer asked a successful completion to repeat.
    fn raise_finished(
        &self,
        world: &mut World,
        handle: DoAfterHandle,
        args: &DoAfterArgs,
        cancelled: bool,
    ) -> bool;
}

pub(crate) struct Payload<P>(pub(crate) P);

impl<P: DoAfterEvent> ErasedEvent for Payload<P> {
    fn payload_type(&self) -> TypeId {
        TypeId::of::<P>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn raise_attempt(&self, world: &mut World, handle: DoAfterHandle, args: &DoAfterArgs) -> bool {
        let mut attempt = DoAfterAttempt {
            entity: Entity::PLACEHOLDER,
            recipient: Recipient::Broadcast,
            handle,
            user: args.user,
            target: args.target,
            used: args.used,
            payload: self.0.clone(),
            cancelled: false,
        };
        for (recipient, entity) in attempt_recipients(world, args) {
            if recipient != Recipient::Broadcast && world.get_entity(entity).is_err() {
                continue;
            }
            attempt.entity = entity;
            attempt.recipient = recipient;
            world.trigger_ref(&mut attempt);
        }
        !attempt.cancelled
    }

    fn raise_finished(
        &self,
        world: &mut World,
        handle: DoAfterHandle,
        args: &DoAfterArgs,
        cancelled: bool,
    ) -> bool {
        let mut finished = DoAfterFinished {
            entity: Entity::PLACEHOLDER,
            recipient: Recipient::Broadcast,
            handle,
            user: args.user,
            target: args.target,
            used: args.used,
            payload: self.0.clone(),
            cancelled,
            handled: false,
            repeat: false,
        };
        for (recipient, entity) in finished_recipients(world, args) {
            // An earlier observer may have despawned a later recipient.
            if recipient != Recipient::Broadcast && world.get_entity(entity).is_err() {
                continue;
            }
            finished.entity = entity;
            finished.recipient = recipient;
            world.trigger_ref(&mut finished);
        }
        finished.repeat && !cancelled
    }
}

/// Attempts go to the event target when it is alive, then undirected when
/// broadcasting or when there is no live event target. A veto from either
/// delivery sticks.
pub(crate) fn attempt_recipients(world: &World, args: &DoAfterArgs) -> Vec<(Recipient, Entity)> {
    let mut recipients = Vec::with_capacity(2);
    if let Some(entity) = args
        .event_target
        .filter(|entity| world.get_entity(*entity).is_ok())
    {
        recipients.push((Recipient::EventTarget, entity));
    }
    if args.broadcast || recipients.is_empty() {
        recipients.push((Recipient::Broadcast, Entity::PLACEHOLDER));
    }
    recipients
}

/// Terminal events go to user, target and tool as enabled, then to the event
/// target, then undirected when broadcasting. Dead entities are skipped and
/// no entity receives the same event twice.
pub(crate) fn finished_recipients(world: &World, args: &DoAfterArgs) -> Vec<(Recipient, Entity)> {
    let candidates = [
        (args.raise_on_user, Recipient::User, Some(args.user)),
        (args.raise_on_target, Recipient::Target, args.target),
        (args.raise_on_used, Recipient::Used, args.used),
        (true, Recipient::EventTarget, args.event_target),
    ];
    let mut recipients: Vec<(Recipient, Entity)> = Vec::with_capacity(candidates.len() + 1);
    for (enabled, recipient, entity) in candidates {
        let Some(entity) = entity.filter(|_| enabled) else {
            continue;
        };
        if world.get_entity(entity).is_ok() && recipients.iter().all(|(_, seen)| *seen != entity)
        {
            recipients.push((recipient, entity));
        }
    }
    if args.broadcast {
        recipients.push((Recipient::Broadcast, Entity::PLACEHOLDER));
    }
    recipients
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::DoAfterId;
    use rstest::rstest;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct Weld;

    impl DoAfterEvent for Weld {}

    fn handle(world: &mut World) -> (Entity, DoAfterHandle) {
        let user = world.spawn_empty().id();
        (user, DoAfterHandle::new(user, DoAfterId(0)))
    }

    #[rstest]
    fn recipients_follow_raise_flags() {
        let mut world = World::new();
        let (user, _) = handle(&mut world);
        let target = world.spawn_empty().id();
        let tool = world.spawn_empty().id();
        let mut args = DoAfterArgs::new(user, Duration::from_secs(1), Weld)
            .with_target(target)
            .with_used(tool);
        args.raise_on_target = false;
        assert_eq!(
            finished_recipients(&world, &args),
            vec![(Recipient::User, user), (Recipient::Used, tool)]
        );
    }

    #[rstest]
    fn event_target_is_not_delivered_twice() {
        let mut world = World::new();
        let (user, _) = handle(&mut world);
        let args = DoAfterArgs::new(user, Duration::from_secs(1), Weld).with_event_target(user);
        assert_eq!(
            finished_recipients(&world, &args),
            vec![(Recipient::User, user)]
        );
    }

    #[rstest]
    fn broadcast_without_event_target_is_undirected() {
        let mut world = World::new();
        let (user, _) = handle(&mut world);
        let mut args = DoAfterArgs::new(user, Duration::from_secs(1), Weld);
        args.raise_on_user = false;
        args.broadcast = true;
        assert_eq!(
            finished_recipients(&world, &args),
            vec![(Recipient::Broadcast, Entity::PLACEHOLDER)]
        );
    }

    #[rstest]
    fn broadcast_adds_to_directed_event_target() {
        let mut world = World::new();
        let (user, _) = handle(&mut world);
        let console = world.spawn_empty().id();
        let mut args =
            DoAfterArgs::new(user, Duration::from_secs(1), Weld).with_event_target(console);
        args.broadcast = true;
        assert_eq!(
            finished_recipients(&world, &args),
            vec![
                (Recipient::User, user),
                (Recipient::EventTarget, console),
                (Recipient::Broadcast, Entity::PLACEHOLDER),
            ]
        );
        assert_eq!(
            attempt_recipients(&world, &args),
            vec![
                (Recipient::EventTarget, console),
                (Recipient::Broadcast, Entity::PLACEHOLDER),
            ]
        );
    }

    #[rstest]
    fn attempts_without_broadcast_stay_directed() {
        let mut world = World::new();
        let (user, _) = handle(&mut world);
        let console = world.spawn_empty().id();
        let args = DoAfterArgs::new(user, Duration::from_secs(1), Weld).with_event_target(console);
        assert_eq!(
            attempt_recipients(&world, &args),
            vec![(Recipient::EventTarget, console)]
        );
        world.despawn(console);
        assert_eq!(
            attempt_recipients(&world, &args),
            vec![(Recipient::Broadcast, Entity::PLACEHOLDER)]
        );
    }

    #[rstest]
    fn despawned_participants_receive_nothing() {
        let mut world = World::new();
        let (user, _) = handle(&mut world);
        let target = world.spawn_empty().id();
        let args = DoAfterArgs::new(user, Duration::from_secs(1), Weld).with_target(target);
        world.despawn(target);
        assert_eq!(
            finished_recipients(&world, &args),
            vec![(Recipient::User, user)]
        );
    }

    #[rstest]
    fn attempt_observer_veto_is_read_back() {
        let mut world = World::new();
        let (user, handle) = handle(&mut world);
        let args = DoAfterArgs::new(user, Duration::from_secs(1), Weld);
        assert!(args.event().raise_attempt(&mut world, handle, &args));
        world.add_observer(|mut attempt: On<DoAfterAttempt<Weld>>| {
            attempt.event_mut().cancel();
        });
        assert!(!args.event().raise_attempt(&mut world, handle, &args));
    }

    #[rstest]
    fn repeat_request_is_ignored_on_cancellation() {
        let mut world = World::new();
        let (user, handle) = handle(&mut world);
        let args = DoAfterArgs::new(user, Duration::from_secs(1), Weld);
        world.add_observer(|mut finished: On<DoAfterFinished<Weld>>| {
            finished.event_mut().repeat = true;
        });
        assert!(args.event().raise_finished(&mut world, handle, &args, false));
        assert!(!args.event().raise_finished(&mut world, handle, &args, true));
    }
}
