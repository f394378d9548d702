//! Observers capturing terminal events and rejected starts.
use bevy::ecs::prelude::On;
use bevy::prelude::*;
use do_after::{
    DoAfterEvent, DoAfterFinished, DoAfterHandle, DoAfterStartRejected, Recipient, StartError,
};

/// One delivery of a [`DoAfterFinished`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// The finished do-after.
    pub handle: DoAfterHandle,
    /// Role of the receiving entity.
    pub recipient: Recipient,
    /// Receiving entity.
    pub entity: Entity,
    /// Whether it was a cancellation.
    pub cancelled: bool,
}

/// Every terminal delivery seen since the recorder was installed.
#[derive(Resource, Default, Debug)]
pub struct Outcomes(pub Vec<Outcome>);

impl Outcomes {
    /// Deliveries for `handle`, in order.
    #[must_use]
    pub fn for_handle(&self, handle: DoAfterHandle) -> Vec<Outcome> {
        self.0
            .iter()
            .filter(|outcome| outcome.handle == handle)
            .copied()
            .collect()
    }

    /// Deliveries to the user only, so each terminal transition counts once.
    #[must_use]
    pub fn user_deliveries(&self, handle: DoAfterHandle) -> Vec<Outcome> {
        self.for_handle(handle)
            .into_iter()
            .filter(|outcome| outcome.recipient == Recipient::User)
            .collect()
    }
}

/// Starts queued through commands that failed.
#[derive(Resource, Default, Debug)]
pub struct Rejections(pub Vec<(Entity, StartError)>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_outcome<P: DoAfterEvent>(
    finished: On<DoAfterFinished<P>>,
    mut outcomes: ResMut<Outcomes>,
) {
    let event = finished.event();
    outcomes.0.push(Outcome {
        handle: event.handle,
        recipient: event.recipient,
        entity: event.entity,
        cancelled: event.cancelled,
    });
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_rejection(rejected: On<DoAfterStartRejected>, mut rejections: ResMut<Rejections>) {
    let event = rejected.event();
    rejections.0.push((event.user, event.error.clone()));
}

/// Installs an [`Outcomes`] resource and an observer recording every
/// `DoAfterFinished<P>`.
pub fn install_outcome_recorder<P: DoAfterEvent>(app: &mut App) {
    app.init_resource::<Outcomes>();
    app.world_mut().add_observer(record_outcome::<P>);
}

/// Installs a [`Rejections`] resource and its observer.
pub fn install_rejection_recorder(app: &mut App) {
    app.insert_resource(Rejections::default());
    app.world_mut().add_observer(record_rejection);
}
