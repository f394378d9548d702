#![cfg_attr(docsrs, feature(doc_cfg))]
//! Timed, interruptible actions for Bevy games.
//!
//! A *do-after* is an action that completes only after a delay, provided its
//! user keeps still, stays in reach, keeps hold of the right item and is not
//! hurt or downed in the meantime. Add [`DoAfterPlugin`], start actions with
//! [`DoAfterWorldExt::start_do_after`] or [`DoAfterCommandsExt`], and observe
//! [`DoAfterFinished`] for the outcome.
pub mod clock;
pub mod components;
pub mod constants;
pub mod interaction;
pub mod logging;
pub mod scheduler;
pub mod settings;
pub use constants::*;

// Re-export commonly used items
pub use clock::{advance_do_after_clock, DoAfterClock};
pub use components::{Hands, InstantDoAfters, MobState, Weightless};
pub use interaction::{DefaultInteractionRules, InteractionRules, Interactions};
pub use logging::init as init_logging;
pub use scheduler::{
    tick_do_afters_system, ActiveDoAfters, AttemptFrequency, CancelReason, DamageChanged,
    DoAfter, DoAfterArgs, DoAfterAttempt, DoAfterCommandsExt, DoAfterEvent, DoAfterFinished,
    DoAfterHandle, DoAfterId, DoAfterPlugin, DoAfterRegistry, DoAfterSnapshot,
    DoAfterStartRejected, DoAfterStatus, DoAfterSystems, DoAfterWorldExt, DuplicateConditions,
    ExtraCheck, MobStateChanged, Participant, Recipient, StartError, StartSnapshot,
    UnknownHandle,
};
pub use settings::{DoAfterSettings, SettingsError};

pub mod prelude {
    //! Prelude exports used in documentation examples.
    //!
    //! ```rust,no_run
    //! use do_after::prelude::*;
    //! ```

    pub use crate::AttemptFrequency;
    pub use crate::DoAfterArgs;
    pub use crate::DoAfterAttempt;
    pub use crate::DoAfterCommandsExt;
    pub use crate::DoAfterEvent;
    pub use crate::DoAfterFinished;
    pub use crate::DoAfterPlugin;
    pub use crate::DoAfterWorldExt;
    pub use crate::DuplicateConditions;
}
