//! Per-actor storage of do-afters.

use bevy::prelude::*;
use hashbrown::HashMap;

use super::{DoAfter, DoAfterId, DoAfterSnapshot};

/// Every do-after an actor owns, keyed by id.
///
/// Running and recently finished entries live here. Terminal entries stay
/// until their grace window passes, then the tick system removes them.
#[derive(Component, Debug, Default)]
pub struct DoAfterRegistry {
    next_id: u16,
    entries: HashMap<DoAfterId, DoAfter>,
}

/// Marker for actors whose registry holds at least one entry. The tick system
/// visits only these.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ActiveDoAfters;

impl DoAfterRegistry {
    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, id: DoAfterId) -> Option<&DoAfter> {
        self.entries.get(&id)
    }

    /// Number of stored entries, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All stored entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &DoAfter> {
        self.entries.values()
    }

    /// Entries still counting down.
    pub fn running(&self) -> impl Iterator<Item = &DoAfter> {
        self.entries.values().filter(|entry| entry.is_running())
    }

    /// Progress data for every running entry, ordered by id. Hidden entries
    /// are included with [`DoAfterSnapshot::hidden`] set.
    #[must_use]
    pub fn replication_snapshots(&self) -> Vec<DoAfterSnapshot> {
        let mut snapshots: Vec<DoAfterSnapshot> =
            self.running().map(DoAfterSnapshot::from).collect();
        snapshots.sort_unstable_by_key(|snapshot| snapshot.id);
        snapshots
    }

    /// Stored ids in ascending order, detached from the map so callers may
    /// mutate the registry while walking them.
    pub(crate) fn ids(&self) -> Vec<DoAfterId> {
        let mut ids: Vec<DoAfterId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of running entries that a `delta` of interrupting damage breaks.
    pub(crate) fn broken_by_damage(&self, delta: f32) -> Vec<DoAfterId> {
        let mut ids: Vec<DoAfterId> = self
            .running()
            .filter(|entry| entry.args().break_on_damage && delta >= entry.args().damage_threshold)
            .map(DoAfter::id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of running entries, ascending.
    pub(crate) fn running_ids(&self) -> Vec<DoAfterId> {
        let mut ids: Vec<DoAfterId> = self.running().map(DoAfter::id).collect();
        ids.sort_unstable();
        ids
    }

    /// The id the next insertion will receive, skipping ids still in use.
    pub(crate) fn peek_next_id(&self) -> Option<DoAfterId> {
        let mut candidate = self.next_id;
        for _ in 0..=u16::MAX {
            if !self.entries.contains_key(&DoAfterId(candidate)) {
                return Some(DoAfterId(candidate));
            }
            candidate = candidate.wrapping_add(1);
        }
        None
    }

    /// Reserves the next free id.
    pub(crate) fn allocate_id(&mut self) -> Option<DoAfterId> {
        let id = self.peek_next_id()?;
        self.next_id = id.0.wrapping_add(1);
        Some(id)
    }

    pub(crate) fn insert(&mut self, entry: DoAfter) {
        self.entries.insert(entry.id(), entry);
    }

    pub(crate) fn get_mut(&mut self, id: DoAfterId) -> Option<&mut DoAfter> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: DoAfterId) -> Option<DoAfter> {
        self.entries.remove(&id)
    }
}
