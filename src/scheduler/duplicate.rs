//! Detects running do-afters that a new start duplicates.

use super::{DoAfterArgs, DoAfterId, DoAfterRegistry, DuplicateConditions};

/// Outcome of checking a new start against running do-afters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Start may proceed, superseding these ids once it commits.
    Proceed { supersede: Vec<DoAfterId> },
    /// A running duplicate blocks the start.
    Blocked { existing: DoAfterId },
}

/// Block takes precedence over cancel: a blocked start supersedes nothing.
pub(crate) fn resolve(registry: Option<&DoAfterRegistry>, args: &DoAfterArgs) -> Resolution {
    let duplicates: Vec<DoAfterId> = registry.map_or_else(Vec::new, |registry| {
        let mut ids: Vec<DoAfterId> = registry
            .running()
            .filter(|entry| is_duplicate(args, entry.args()))
            .map(|entry| entry.id())
            .collect();
        ids.sort_unstable();
        ids
    });
    match duplicates.first() {
        Some(&existing) if args.block_duplicate => Resolution::Blocked { existing },
        Some(_) if args.cancel_duplicate => Resolution::Proceed {
            supersede: duplicates,
        },
        _ => Resolution::Proceed {
            supersede: Vec::new(),
        },
    }
}

/// Two do-afters are duplicates when they match under either one's
/// conditions.
pub(crate) fn is_duplicate(new: &DoAfterArgs, existing: &DoAfterArgs) -> bool {
    new.user == existing.user
        && (matches_under(new, existing, new.duplicate_condition)
            || matches_under(new, existing, existing.duplicate_condition))
}

fn matches_under(a: &DoAfterArgs, b: &DoAfterArgs, conditions: DuplicateConditions) -> bool {
    (!conditions.contains(DuplicateConditions::SAME_TOOL) || a.used == b.used)
        && (!conditions.contains(DuplicateConditions::SAME_TARGET) || a.target == b.target)
        && (!conditions.contains(DuplicateConditions::SAME_EVENT) || a.same_event(b))
}
