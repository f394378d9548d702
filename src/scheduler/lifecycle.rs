//! Starting, cancelling, completing and querying do-afters.
//!
//! Everything here works on a `&mut World` directly. Systems that only hold
//! `Commands` use [`DoAfterCommandsExt`], which defers the same operations.

use std::time::Duration;

use bevy::prelude::*;
use log::{debug, trace, warn};
use thiserror::Error;

use super::duplicate::{self, Resolution};
use super::evaluator;
use super::{
    AttemptFrequency, CancelReason, DoAfter, DoAfterArgs, DoAfterHandle, DoAfterRegistry,
    DoAfterStatus, StartError, StartSnapshot, UnknownHandle,
};
use super::{ActiveDoAfters, DoAfterId, Participant};
use crate::components::InstantDoAfters;
use crate::{clock, DoAfterSettings};

/// Raised when a start queued through [`DoAfterCommandsExt`] fails.
///
/// [`DoAfterPlugin`](crate::DoAfterPlugin) logs these at debug level.
#[derive(Event, Debug, Clone, PartialEq, Eq, Error)]
#[error("do-after for {user} rejected: {error}")]
pub struct DoAfterStartRejected {
    /// Entity that tried to start.
    pub user: Entity,
    /// Why the start failed.
    pub error: StartError,
}

/// Do-after operations on a [`World`].
///
/// ```
/// use std::time::Duration;
/// use bevy::prelude::World;
/// use do_after::{DoAfterArgs, DoAfterEvent, DoAfterStatus, DoAfterWorldExt};
///
/// #[derive(Clone, Debug)]
/// struct Search;
/// impl DoAfterEvent for Search {}
///
/// let mut world = World::new();
/// let user = world.spawn_empty().id();
/// let handle = world
///     .start_do_after(DoAfterArgs::new(user, Duration::from_secs(2), Search))
///     .unwrap();
/// assert_eq!(world.do_after_status(handle), Ok(DoAfterStatus::Running));
/// assert!(world.cancel_do_after(handle));
/// assert_eq!(world.do_after_status(handle), Ok(DoAfterStatus::Cancelled));
/// ```
pub trait DoAfterWorldExt {
    /// Validates `args` and starts tracking a do-after for `args.user`.
    ///
    /// Instant do-afters (zero delay, or a user carrying
    /// [`InstantDoAfters`]) complete inside this call and are not stored.
    ///
    /// # Errors
    /// Returns a [`StartError`] and leaves every registry untouched when a
    /// participant is missing, a duplicate blocks, hands are required but
    /// absent, a cancellation check already fails, the start attempt is
    /// vetoed, or the user's id space is exhausted.
    fn start_do_after(&mut self, args: DoAfterArgs) -> Result<DoAfterHandle, StartError>;

    /// Cancels a running do-after and raises its terminal event.
    ///
    /// Returns `false` without side effects when the handle is unknown or
    /// already terminal.
    fn cancel_do_after(&mut self, handle: DoAfterHandle) -> bool;

    /// Cancels every running do-after of `actor`, returning how many stopped.
    fn cancel_all_do_afters(&mut self, actor: Entity) -> usize;

    /// Looks up a do-after that is running or inside its grace window.
    ///
    /// # Errors
    /// Returns [`UnknownHandle`] for handles never issued, purged, or past
    /// their grace window.
    fn do_after(&self, handle: DoAfterHandle) -> Result<&DoAfter, UnknownHandle>;

    /// Status of a do-after that is running or inside its grace window.
    ///
    /// # Errors
    /// As [`Self::do_after`].
    fn do_after_status(&self, handle: DoAfterHandle) -> Result<DoAfterStatus, UnknownHandle> {
        self.do_after(handle).map(DoAfter::status)
    }
}

impl DoAfterWorldExt for World {
    fn start_do_after(&mut self, args: DoAfterArgs) -> Result<DoAfterHandle, StartError> {
        start(self, args)
    }

    fn cancel_do_after(&mut self, handle: DoAfterHandle) -> bool {
        cancel(self, handle, CancelReason::External)
    }

    fn cancel_all_do_afters(&mut self, actor: Entity) -> usize {
        cancel_all(self, actor, CancelReason::External)
    }

    fn do_after(&self, handle: DoAfterHandle) -> Result<&DoAfter, UnknownHandle> {
        let excess = excess_time(self);
        let now = clock::now(self);
        self.get::<DoAfterRegistry>(handle.actor)
            .and_then(|registry| registry.get(handle.id))
            .filter(|entry| !entry.grace_expired(now, excess))
            .ok_or(UnknownHandle(handle))
    }
}

/// Deferred do-after operations for systems holding [`Commands`].
pub trait DoAfterCommandsExt {
    /// Queues a start. Failures trigger [`DoAfterStartRejected`].
    fn start_do_after(&mut self, args: DoAfterArgs);

    /// Queues a cancellation.
    fn cancel_do_after(&mut self, handle: DoAfterHandle);
}

impl DoAfterCommandsExt for Commands<'_, '_> {
    fn start_do_after(&mut self, args: DoAfterArgs) {
        self.queue(move |world: &mut World| {
            let user = args.user;
            if let Err(error) = start(world, args) {
                world.trigger(DoAfterStartRejected { user, error });
            }
        });
    }

    fn cancel_do_after(&mut self, handle: DoAfterHandle) {
        self.queue(move |world: &mut World| {
            cancel(world, handle, CancelReason::External);
        });
    }
}

pub(crate) fn excess_time(world: &World) -> Duration {
    world
        .get_resource::<DoAfterSettings>()
        .map_or_else(|| DoAfterSettings::default().excess_time, |settings| settings.excess_time)
}

fn start(world: &mut World, args: DoAfterArgs) -> Result<DoAfterHandle, StartError> {
    require_participants(world, &args)?;
    let actor = args.user;
    let registry = world.get::<DoAfterRegistry>(actor);
    resolve_duplicates(registry, &args)?;
    let Some(provisional_id) = registry.map_or(Some(DoAfterId(0)), DoAfterRegistry::peek_next_id)
    else {
        warn!("{actor} has no free do-after ids left");
        return Err(StartError::RegistryFull { actor });
    };
    let snapshot = StartSnapshot::capture(world, &args)?;
    let mut entry = DoAfter::new(provisional_id, args, clock::now(world), snapshot);
    let mut handle = DoAfterHandle::new(actor, provisional_id);

    if let Some(reason) = evaluator::should_cancel(world, &entry, handle) {
        debug!("do-after {handle} interrupted before starting: {reason}");
        return Err(StartError::Interrupted(reason));
    }
    if entry.args().attempt_frequency == AttemptFrequency::StartAndEnd
        && !evaluator::try_attempt(world, entry.args(), handle)
    {
        debug!("do-after {handle} vetoed before starting");
        return Err(StartError::AttemptVetoed);
    }
    // Observers ran; apply what they queued. The user may be gone and the
    // registry may have changed.
    world.flush();
    require_participants(world, entry.args())?;
    let supersede = resolve_duplicates(world.get::<DoAfterRegistry>(actor), entry.args())?;

    for id in supersede {
        cancel(world, DoAfterHandle::new(actor, id), CancelReason::Superseded);
        if world.get_entity(actor).is_err() {
            // Earlier supersessions stay cancelled; their events are out.
            break;
        }
    }

    let instant = entry.args().delay.is_zero() || world.get::<InstantDoAfters>(actor).is_some();
    let Ok(mut actor_ref) = world.get_entity_mut(actor) else {
        return Err(StartError::InvalidParticipants {
            role: Participant::User,
            entity: actor,
        });
    };
    if !actor_ref.contains::<DoAfterRegistry>() {
        actor_ref.insert(DoAfterRegistry::default());
    }
    let id = actor_ref
        .get_mut::<DoAfterRegistry>()
        .and_then(|mut registry| registry.allocate_id())
        .ok_or(StartError::RegistryFull { actor })?;
    if id != handle.id {
        trace!("do-after {handle} renumbered to {id} after observers started others");
        entry.set_id(id);
        handle = DoAfterHandle::new(actor, id);
    }

    if !instant {
        debug!(
            "do-after {handle} started: {} for {:?}",
            entry.args().payload_type_name(),
            entry.args().delay
        );
        if let Some(mut registry) = actor_ref.get_mut::<DoAfterRegistry>() {
            registry.insert(entry);
        }
        actor_ref.insert(ActiveDoAfters);
        return Ok(handle);
    }

    debug!("do-after {handle} completed instantly");
    let finished = entry.args().clone();
    finished.event().raise_finished(world, handle, &finished, false);
    Ok(handle)
}

/// Fails when a running duplicate blocks the start; otherwise returns the
/// entries the start would supersede.
fn resolve_duplicates(
    registry: Option<&DoAfterRegistry>,
    args: &DoAfterArgs,
) -> Result<Vec<DoAfterId>, StartError> {
    match duplicate::resolve(registry, args) {
        Resolution::Blocked { existing } => {
            let blocker = DoAfterHandle::new(args.user, existing);
            debug!("do-after for {} blocked by running duplicate {blocker}", args.user);
            Err(StartError::DuplicateBlocked { existing: blocker })
        }
        Resolution::Proceed { supersede } => Ok(supersede),
    }
}

fn require_participants(world: &World, args: &DoAfterArgs) -> Result<(), StartError> {
    match args
        .participants()
        .find(|(_, entity)| world.get_entity(*entity).is_err())
    {
        Some((role, entity)) => Err(StartError::InvalidParticipants { role, entity }),
        None => Ok(()),
    }
}

fn with_entry_mut<R>(
    world: &mut World,
    handle: DoAfterHandle,
    f: impl FnOnce(&mut DoAfter) -> R,
) -> Option<R> {
    let mut registry = world.get_mut::<DoAfterRegistry>(handle.actor)?;
    registry.get_mut(handle.id).map(f)
}

/// Moves a running do-after to `Cancelled` and raises its terminal event.
pub(crate) fn cancel(world: &mut World, handle: DoAfterHandle, reason: CancelReason) -> bool {
    let now = clock::now(world);
    let Some(args) = with_entry_mut(world, handle, |entry| {
        entry
            .mark_cancelled(now, reason)
            .then(|| entry.args().clone())
    })
    .flatten() else {
        return false;
    };
    debug!("do-after {handle} cancelled: {reason}");
    args.event().raise_finished(world, handle, &args, true);
    true
}

pub(crate) fn cancel_all(world: &mut World, actor: Entity, reason: CancelReason) -> usize {
    let ids = world
        .get::<DoAfterRegistry>(actor)
        .map(DoAfterRegistry::running_ids)
        .unwrap_or_default();
    ids.into_iter()
        .filter(|id| cancel(world, DoAfterHandle::new(actor, *id), reason))
        .count()
}

/// Finishes a running do-after whose delay has elapsed.
///
/// `StartAndEnd` do-afters get one last attempt first; a veto cancels
/// instead. Observers may request a repeat, which restarts the entry from
/// `now` with its original snapshot.
pub(crate) fn complete(world: &mut World, handle: DoAfterHandle, now: Duration) {
    let Some(args) = world
        .get::<DoAfterRegistry>(handle.actor)
        .and_then(|registry| registry.get(handle.id))
        .filter(|entry| entry.is_running())
        .map(|entry| entry.args().clone())
    else {
        return;
    };
    if args.attempt_frequency == AttemptFrequency::StartAndEnd
        && !evaluator::try_attempt(world, &args, handle)
    {
        cancel(world, handle, CancelReason::AttemptVetoed);
        return;
    }
    if !with_entry_mut(world, handle, |entry| entry.mark_completed(now)).unwrap_or(false) {
        return;
    }
    debug!("do-after {handle} completed");
    if args.event().raise_finished(world, handle, &args, false)
        && with_entry_mut(world, handle, |entry| entry.restart(now)).unwrap_or(false)
    {
        debug!("do-after {handle} repeating");
    }
}

/// Removes a terminal entry from its registry.
pub(crate) fn purge(world: &mut World, handle: DoAfterHandle) {
    if let Some(mut registry) = world.get_mut::<DoAfterRegistry>(handle.actor) {
        if registry.remove(handle.id).is_some() {
            trace!("do-after {handle} purged");
        }
    }
}

/// Copy of a stored entry after refreshing its elapsed time.
pub(crate) fn refreshed(world: &mut World, handle: DoAfterHandle, now: Duration) -> Option<DoAfter> {
    with_entry_mut(world, handle, |entry| {
        if entry.is_running() {
            entry.refresh_elapsed(now);
        }
        entry.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DoAfterAttempt, DoAfterClock, DoAfterEvent, DoAfterFinished, Hands};
    use rstest::{fixture, rstest};

    #[derive(Clone, Debug)]
    struct Pick;

    impl DoAfterEvent for Pick {}

    #[derive(Resource, Default)]
    struct Finished(Vec<(DoAfterHandle, bool)>);

    #[fixture]
    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<DoAfterClock>();
        world.init_resource::<DoAfterSettings>();
        world.init_resource::<Finished>();
        world.add_observer(
            |finished: On<DoAfterFinished<Pick>>, mut log: ResMut<Finished>| {
                log.0.push((finished.handle, finished.cancelled));
            },
        );
        world
    }

    fn pick(user: Entity) -> DoAfterArgs {
        DoAfterArgs::new(user, Duration::from_secs(1), Pick)
    }

    #[rstest]
    fn start_stores_and_marks_actor(mut world: World) {
        let user = world.spawn_empty().id();
        let handle = world.start_do_after(pick(user)).expect("start");
        assert_eq!(handle.id, DoAfterId(0));
        assert!(world.get::<ActiveDoAfters>(user).is_some());
        assert_eq!(world.do_after_status(handle), Ok(DoAfterStatus::Running));
    }

    #[rstest]
    fn missing_target_is_rejected(mut world: World) {
        let user = world.spawn_empty().id();
        let gone = world.spawn_empty().id();
        world.despawn(gone);
        let err = world
            .start_do_after(pick(user).with_target(gone))
            .expect_err("target is gone");
        assert_eq!(
            err,
            StartError::InvalidParticipants {
                role: Participant::Target,
                entity: gone
            }
        );
        assert!(world.get::<DoAfterRegistry>(user).is_none());
    }

    #[rstest]
    fn handless_user_cannot_start_hand_work(mut world: World) {
        let user = world.spawn_empty().id();
        let mut args = pick(user);
        args.need_hand = true;
        assert_eq!(
            world.start_do_after(args),
            Err(StartError::MissingHands { user })
        );
        world.entity_mut(user).insert(Hands::with_slots(["left"]));
        let mut args = pick(user);
        args.need_hand = true;
        assert!(world.start_do_after(args).is_ok());
    }

    #[rstest]
    fn duplicate_started_by_attempt_observer_blocks(mut world: World) {
        let user = world.spawn_empty().id();
        world.add_observer(
            |attempt: On<DoAfterAttempt<Pick>>, mut commands: Commands| {
                commands.start_do_after(pick(attempt.user));
            },
        );
        let mut args = pick(user);
        args.attempt_frequency = AttemptFrequency::StartAndEnd;
        assert_eq!(
            world.start_do_after(args),
            Err(StartError::DuplicateBlocked {
                existing: DoAfterHandle::new(user, DoAfterId(0))
            })
        );
        let registry = world.get::<DoAfterRegistry>(user).expect("observer's start");
        assert_eq!(registry.running().count(), 1);
    }

    #[rstest]
    fn handless_user_without_break_flags_is_interrupted(mut world: World) {
        let user = world.spawn_empty().id();
        let mut args = pick(user);
        args.need_hand = true;
        args.break_on_hand_change = false;
        args.break_on_drop_item = false;
        assert_eq!(
            world.start_do_after(args),
            Err(StartError::Interrupted(CancelReason::HandsLost))
        );
        assert!(world.get::<DoAfterRegistry>(user).is_none());
    }

    #[rstest]
    fn cancel_is_idempotent(mut world: World) {
        let user = world.spawn_empty().id();
        let handle = world.start_do_after(pick(user)).expect("start");
        assert!(world.cancel_do_after(handle));
        assert!(!world.cancel_do_after(handle));
        assert_eq!(world.resource::<Finished>().0, vec![(handle, true)]);
        assert_eq!(
            world.do_after(handle).map(DoAfter::cancel_reason),
            Ok(Some(CancelReason::External))
        );
    }

    #[rstest]
    fn blocked_start_changes_nothing(mut world: World) {
        let user = world.spawn_empty().id();
        let first = world.start_do_after(pick(user)).expect("start");
        assert_eq!(
            world.start_do_after(pick(user)),
            Err(StartError::DuplicateBlocked { existing: first })
        );
        assert_eq!(world.get::<DoAfterRegistry>(user).map(DoAfterRegistry::len), Some(1));
        assert!(world.resource::<Finished>().0.is_empty());
    }

    #[rstest]
    fn zero_delay_completes_without_storing(mut world: World) {
        let user = world.spawn_empty().id();
        let handle = world
            .start_do_after(DoAfterArgs::new(user, Duration::ZERO, Pick))
            .expect("instant");
        assert_eq!(world.resource::<Finished>().0, vec![(handle, false)]);
        assert_eq!(world.do_after(handle).err(), Some(UnknownHandle(handle)));
        let next = world.start_do_after(pick(user)).expect("start");
        assert_ne!(next.id, handle.id);
    }

    #[rstest]
    fn cancel_all_only_touches_running(mut world: World) {
        let user = world.spawn_empty().id();
        let mut first = pick(user);
        first.block_duplicate = false;
        first.cancel_duplicate = false;
        let second = first.clone();
        let a = world.start_do_after(first).expect("first");
        let b = world.start_do_after(second).expect("second");
        world.cancel_do_after(a);
        assert_eq!(world.cancel_all_do_afters(user), 1);
        assert_eq!(world.do_after_status(b), Ok(DoAfterStatus::Cancelled));
    }

    #[rstest]
    fn expired_entries_read_as_unknown(mut world: World) {
        let user = world.spawn_empty().id();
        let handle = world.start_do_after(pick(user)).expect("start");
        world.cancel_do_after(handle);
        world
            .resource_mut::<DoAfterClock>()
            .advance(Duration::from_millis(600));
        assert_eq!(world.do_after_status(handle), Err(UnknownHandle(handle)));
    }

    #[rstest]
    fn commands_report_rejected_starts(mut world: World) {
        #[derive(Resource, Default)]
        struct Rejected(Vec<StartError>);

        world.init_resource::<Rejected>();
        world.add_observer(
            |rejected: On<DoAfterStartRejected>, mut log: ResMut<Rejected>| {
                log.0.push(rejected.error.clone());
            },
        );
        let user = world.spawn_empty().id();
        world.start_do_after(pick(user)).expect("start");
        let mut queue = bevy::ecs::world::CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        commands.start_do_after(pick(user));
        queue.apply(&mut world);
        assert!(matches!(
            world.resource::<Rejected>().0.as_slice(),
            [StartError::DuplicateBlocked { .. }]
        ));
    }
}
