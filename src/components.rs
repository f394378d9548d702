//! ECS components the scheduler reads from actors and participants.
//! Includes hands, mob state and the markers that alter interruption rules.
use bevy::prelude::*;
use hashbrown::HashMap;
use serde::Serialize;

/// Named hand slots held by an actor and which one is active.
///
/// # Examples
/// ```
/// use bevy::prelude::World;
/// use do_after::Hands;
///
/// let wrench = World::new().spawn_empty().id();
/// let hands = Hands::with_slots(["left", "right"])
///     .holding("right", wrench)
///     .activating("right");
/// assert_eq!(hands.active_held(), Some(wrench));
/// assert!(hands.is_holding(wrench));
/// ```
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct Hands {
    slots: HashMap<String, Option<Entity>>,
    active: Option<String>,
}

impl Hands {
    /// Creates empty hands with the given slot names and no active hand.
    pub fn with_slots<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: names.into_iter().map(|name| (name.into(), None)).collect(),
            active: None,
        }
    }

    /// Builder form of [`Self::hold`].
    #[must_use]
    pub fn holding(mut self, hand: &str, item: Entity) -> Self {
        self.hold(hand, item);
        self
    }

    /// Builder form of [`Self::set_active`].
    #[must_use]
    pub fn activating(mut self, hand: &str) -> Self {
        self.set_active(hand);
        self
    }

    /// Places `item` in `hand`, returning whatever it displaced.
    ///
    /// Unknown hands are ignored.
    pub fn hold(&mut self, hand: &str, item: Entity) -> Option<Entity> {
        self.slots.get_mut(hand).and_then(|slot| slot.replace(item))
    }

    /// Empties `hand`, returning the entity it held.
    pub fn drop_from(&mut self, hand: &str) -> Option<Entity> {
        self.slots.get_mut(hand).and_then(Option::take)
    }

    /// Switches the active hand. Unknown names leave the selection unchanged.
    pub fn set_active(&mut self, hand: &str) {
        if self.slots.contains_key(hand) {
            self.active = Some(hand.to_owned());
        }
    }

    /// Number of hand slots.
    #[must_use]
    pub fn count(&self) -> usize {
        self.slots.len()
    }

    /// Name of the active hand, if one is selected.
    #[must_use]
    pub fn active_hand(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Entity held in the active hand.
    #[must_use]
    pub fn active_held(&self) -> Option<Entity> {
        self.active
            .as_ref()
            .and_then(|name| self.slots.get(name))
            .copied()
            .flatten()
    }

    /// Whether any hand holds `item`.
    #[must_use]
    pub fn is_holding(&self, item: Entity) -> bool {
        self.slots.values().any(|held| *held == Some(item))
    }
}

/// Marker for actors currently without gravity.
///
/// Movement checks are skipped for weightless users unless the do-after sets
/// `break_on_weightless_move`.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Weightless;

/// Marker making every do-after started by this actor complete immediately.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct InstantDoAfters;

/// Coarse health state of a mob.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum MobState {
    /// Conscious and able to act.
    #[default]
    Alive,
    /// Downed but not dead.
    Critical,
    /// Dead.
    Dead,
}

impl MobState {
    /// Whether the mob can still carry out actions.
    #[must_use]
    pub const fn is_incapacitated(self) -> bool {
        matches!(self, Self::Critical | Self::Dead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn dropping_clears_active_held_item() {
        let item = World::new().spawn_empty().id();
        let mut hands = Hands::with_slots(["left"])
            .holding("left", item)
            .activating("left");
        assert_eq!(hands.drop_from("left"), Some(item));
        assert_eq!(hands.active_held(), None);
        assert!(!hands.is_holding(item));
    }

    #[rstest]
    fn unknown_hands_are_ignored() {
        let item = World::new().spawn_empty().id();
        let mut hands = Hands::with_slots(["left"]);
        assert_eq!(hands.hold("tentacle", item), None);
        hands.set_active("tentacle");
        assert_eq!(hands.active_hand(), None);
        assert_eq!(hands.count(), 1);
    }

    #[rstest]
    #[case(MobState::Alive, false)]
    #[case(MobState::Critical, true)]
    #[case(MobState::Dead, true)]
    fn incapacitation_follows_state(#[case] state: MobState, #[case] expected: bool) {
        assert_eq!(state.is_incapacitated(), expected);
    }
}
