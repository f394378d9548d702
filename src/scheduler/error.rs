//! Error types for do-after operations.
use std::fmt;

use bevy::prelude::*;
use thiserror::Error;

use super::{CancelReason, DoAfterHandle};

/// Role an entity plays in a do-after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    /// The acting entity.
    User,
    /// The entity acted upon.
    Target,
    /// The tool in use.
    Used,
    /// The entity receiving attempt events.
    EventTarget,
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Target => "target",
            Self::Used => "used entity",
            Self::EventTarget => "event target",
        })
    }
}

/// Why a do-after did not start.
///
/// A failed start leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// A named participant does not exist.
    #[error("{role} {entity} does not exist")]
    InvalidParticipants {
        /// Which participant is missing.
        role: Participant,
        /// The missing entity.
        entity: Entity,
    },
    /// A running duplicate blocks this one.
    #[error("blocked by running duplicate {existing}")]
    DuplicateBlocked {
        /// The duplicate that is still running.
        existing: DoAfterHandle,
    },
    /// The do-after needs hands and the user has none.
    #[error("user {user} has no hands")]
    MissingHands {
        /// The handless user.
        user: Entity,
    },
    /// A cancellation check already fails at start time.
    #[error("interrupted before starting: {0}")]
    Interrupted(CancelReason),
    /// The start-time attempt was vetoed.
    #[error("attempt vetoed before starting")]
    AttemptVetoed,
    /// Every id of the user's registry is in use.
    #[error("actor {actor} has no free do-after ids")]
    RegistryFull {
        /// The saturated actor.
        actor: Entity,
    },
}

/// A handle that names nothing the registry still exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown do-after {0}")]
pub struct UnknownHandle(pub DoAfterHandle);
