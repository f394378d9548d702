//! Spatial and capability queries consumed by the cancellation checks.
//!
//! Games plug their own reach, obstruction and action-blocking rules in by
//! inserting an [`Interactions`] resource wrapping an [`InteractionRules`]
//! implementation. Without one, [`DefaultInteractionRules`] applies plain
//! distance checks against `Transform` translations.

use bevy::prelude::*;

use crate::components::{MobState, Weightless};

/// Queries the scheduler delegates to the host game.
#[cfg_attr(test, mockall::automock)]
pub trait InteractionRules: Send + Sync + 'static {
    /// Whether `user` can reach `other` within `range`, accounting for
    /// anything that blocks the way.
    fn in_range_unobstructed(&self, world: &World, user: Entity, other: Entity, range: f32)
        -> bool;

    /// Whether `user` is currently able to interact with `target` (or with
    /// the world at large when `target` is `None`).
    fn can_interact(&self, world: &World, user: Entity, target: Option<Entity>) -> bool;

    /// Whether `entity` is floating without gravity.
    fn is_weightless(&self, world: &World, entity: Entity) -> bool;
}

/// Reach and capability rules derived from core components only.
///
/// - Range is Euclidean distance between `Transform` translations. An entity
///   without a `Transform` (an item tucked inside a container, for instance)
///   counts as co-located with whoever reaches for it.
/// - Only an incapacitating [`MobState`] prevents interaction.
/// - Weightlessness is the [`Weightless`] marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInteractionRules;

impl InteractionRules for DefaultInteractionRules {
    fn in_range_unobstructed(
        &self,
        world: &World,
        user: Entity,
        other: Entity,
        range: f32,
    ) -> bool {
        distance(world, user, other).is_none_or(|d| d <= range)
    }

    fn can_interact(&self, world: &World, user: Entity, _target: Option<Entity>) -> bool {
        world
            .get::<MobState>(user)
            .is_none_or(|state| !state.is_incapacitated())
    }

    fn is_weightless(&self, world: &World, entity: Entity) -> bool {
        world.get::<Weightless>(entity).is_some()
    }
}

/// Resource holding the active [`InteractionRules`].
#[derive(Resource)]
pub struct Interactions(Box<dyn InteractionRules>);

impl Interactions {
    /// Wraps a rules implementation for insertion as a resource.
    pub fn new(rules: impl InteractionRules) -> Self {
        Self(Box::new(rules))
    }

    /// Borrows the wrapped rules.
    #[must_use]
    pub fn rules(&self) -> &dyn InteractionRules {
        self.0.as_ref()
    }
}

impl Default for Interactions {
    fn default() -> Self {
        Self::new(DefaultInteractionRules)
    }
}

static FALLBACK_RULES: DefaultInteractionRules = DefaultInteractionRules;

/// Returns the installed rules, falling back to [`DefaultInteractionRules`].
pub(crate) fn rules(world: &World) -> &dyn InteractionRules {
    match world.get_resource::<Interactions>() {
        Some(interactions) => interactions.rules(),
        None => &FALLBACK_RULES,
    }
}

/// World-space position of `entity`, if it has a `Transform`.
#[must_use]
pub fn position(world: &World, entity: Entity) -> Option<Vec3> {
    world
        .get::<Transform>(entity)
        .map(|transform| transform.translation)
}

/// Distance between two entities that both carry a `Transform`.
#[must_use]
pub fn distance(world: &World, a: Entity, b: Entity) -> Option<f32> {
    Some(position(world, a)?.distance(position(world, b)?))
}
