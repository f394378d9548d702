//! Deferred actions that complete after a delay unless interrupted.
//!
//! A do-after belongs to the entity performing it. Each tick the scheduler
//! re-checks the conditions the action was started under (position, reach,
//! hands, ability to interact) and either cancels it, completes it once the
//! delay has elapsed, or leaves it running. Outcomes are reported through
//! [`DoAfterFinished`] observers; cancellable checks go through
//! [`DoAfterAttempt`].

mod args;
mod duplicate;
mod error;
mod evaluator;
mod events;
mod instance;
mod lifecycle;
mod plugin;
mod registry;
mod replication;
mod systems;

pub use args::{AttemptFrequency, DoAfterArgs, DuplicateConditions, ExtraCheck};
pub use error::{Participant, StartError, UnknownHandle};
pub use events::{DoAfterAttempt, DoAfterEvent, DoAfterFinished, Recipient};
pub use instance::{
    CancelReason, DoAfter, DoAfterHandle, DoAfterId, DoAfterStatus, StartSnapshot,
};
pub use lifecycle::{DoAfterCommandsExt, DoAfterStartRejected, DoAfterWorldExt};
pub use plugin::{DoAfterPlugin, DoAfterSystems};
pub use registry::{ActiveDoAfters, DoAfterRegistry};
pub use replication::DoAfterSnapshot;
pub use systems::{tick_do_afters_system, DamageChanged, MobStateChanged};
