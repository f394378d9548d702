//! Per-tick interruption checks.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. every participant still exists
//! 2. movement, unless the user is weightless and weightless movement is allowed
//! 3. target reach
//! 4. tool reach
//! 5. the attempt event, for `EveryTick` do-afters
//! 6. hands, when needed
//! 7. interaction capability

use bevy::prelude::*;

use super::{AttemptFrequency, CancelReason, DoAfter, DoAfterArgs, DoAfterHandle, StartSnapshot};
use crate::components::Hands;
use crate::interaction::{distance, position, rules, InteractionRules};
use crate::DoAfterSettings;

/// Returns why `do_after` should stop, or `None` to keep it running.
///
/// Takes the world mutably because `EveryTick` attempts trigger observers.
pub(crate) fn should_cancel(
    world: &mut World,
    do_after: &DoAfter,
    handle: DoAfterHandle,
) -> Option<CancelReason> {
    let args = do_after.args();
    if let Some(reason) = spatial_checks(world, args, do_after.snapshot()) {
        return Some(reason);
    }
    if args.attempt_frequency == AttemptFrequency::EveryTick && !try_attempt(world, args, handle) {
        return Some(CancelReason::AttemptVetoed);
    }
    capability_checks(world, args, do_after.snapshot())
}

/// Runs the extra check, then raises the attempt event. `false` means veto.
pub(crate) fn try_attempt(world: &mut World, args: &DoAfterArgs, handle: DoAfterHandle) -> bool {
    if let Some(check) = args.extra_check() {
        if !check(world) {
            return false;
        }
    }
    args.event().raise_attempt(world, handle, args)
}

fn spatial_checks(world: &World, args: &DoAfterArgs, snapshot: &StartSnapshot) -> Option<CancelReason> {
    if args
        .participants()
        .any(|(_, entity)| world.get_entity(entity).is_err())
    {
        return Some(CancelReason::ParticipantMissing);
    }
    let rules = rules(world);
    if moved_too_far(world, rules, args, snapshot) {
        return Some(CancelReason::Moved);
    }
    let range = args.distance_threshold.unwrap_or_else(|| {
        world
            .get_resource::<DoAfterSettings>()
            .map_or(crate::INTERACTION_RANGE, |settings| settings.interaction_range)
    });
    let out_of_reach = |other: Option<Entity>| {
        other.is_some_and(|other| {
            other != args.user && !rules.in_range_unobstructed(world, args.user, other, range)
        })
    };
    if out_of_reach(args.target) || out_of_reach(args.used) {
        return Some(CancelReason::OutOfReach);
    }
    None
}

fn moved_too_far(
    world: &World,
    rules: &dyn InteractionRules,
    args: &DoAfterArgs,
    snapshot: &StartSnapshot,
) -> bool {
    if !args.break_on_move {
        return false;
    }
    if !args.break_on_weightless_move && rules.is_weightless(world, args.user) {
        return false;
    }
    let Some(start) = snapshot.user_position else {
        return false;
    };
    let Some(current) = position(world, args.user) else {
        return true;
    };
    if current.distance(start) > args.movement_threshold {
        return true;
    }
    let (Some(target), Some(start_gap)) = (args.target, snapshot.target_distance) else {
        return false;
    };
    distance(world, args.user, target)
        .is_some_and(|gap| (gap - start_gap).abs() > args.movement_threshold)
}

fn capability_checks(world: &World, args: &DoAfterArgs, snapshot: &StartSnapshot) -> Option<CancelReason> {
    if args.need_hand {
        if let Some(reason) = hand_checks(world, args, snapshot) {
            return Some(reason);
        }
    }
    if args.require_can_interact && !rules(world).can_interact(world, args.user, args.target) {
        return Some(CancelReason::CannotInteract);
    }
    None
}

fn hand_checks(world: &World, args: &DoAfterArgs, snapshot: &StartSnapshot) -> Option<CancelReason> {
    let Some(hands) = world.get::<Hands>(args.user).filter(|hands| hands.count() > 0) else {
        return Some(CancelReason::HandsLost);
    };
    if args.break_on_drop_item {
        if let Some(item) = snapshot.initial_item {
            if !hands.is_holding(item) {
                return Some(CancelReason::ItemDropped);
            }
        }
    }
    if args.break_on_hand_change
        && (hands.active_hand() != snapshot.initial_hand.as_deref()
            || hands.active_held() != snapshot.initial_item)
    {
        return Some(CancelReason::HandChanged);
    }
    None
}
