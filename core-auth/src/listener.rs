//! One-shot redirect callback listener.
//!
//! Each login attempt owns exactly one listener task. The task races the
//! first delivered callback URI against the attempt's deadline and against
//! cancellation by a superseding attempt. Whichever branch loses has no
//! effect on the vault or the flow state.

use crate::error::Result;
use crate::oauth::OAuthFlowController;
use crate::types::{CallbackOutcome, PendingAuthorization};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// A callback URI handed to the listener together with the channel the
/// outcome is reported on.
pub(crate) struct Delivery {
    uri: String,
    reply: oneshot::Sender<Result<CallbackOutcome>>,
}

/// Handle held by the flow controller while an attempt is outstanding.
///
/// Taking the handle out of the controller's slot is what consumes the
/// listener; a second delivery or a late timeout finds the slot empty.
pub(crate) struct ListenerHandle {
    pending: PendingAuthorization,
    deliveries: oneshot::Sender<Delivery>,
    cancel: CancellationToken,
}

impl ListenerHandle {
    pub(crate) fn attempt_id(&self) -> Uuid {
        self.pending.attempt_id
    }

    pub(crate) fn pending(&self) -> &PendingAuthorization {
        &self.pending
    }

    /// Stop the listener task without running any of its branches.
    pub(crate) fn cancel(self) {
        self.cancel.cancel();
    }

    /// Forward a callback URI to the listener task.
    ///
    /// Returns `None` if the task has already exited.
    pub(crate) fn deliver(
        self,
        uri: String,
    ) -> Option<oneshot::Receiver<Result<CallbackOutcome>>> {
        let (reply, outcome) = oneshot::channel();
        self.deliveries.send(Delivery { uri, reply }).ok()?;
        Some(outcome)
    }
}

/// Spawn the listener task for `pending` and return its handle.
pub(crate) fn spawn(
    controller: OAuthFlowController,
    pending: PendingAuthorization,
    timeout: Duration,
) -> ListenerHandle {
    let (deliveries, mut inbox) = oneshot::channel::<Delivery>();
    let cancel = CancellationToken::new();
    let cancelled = cancel.clone();
    let attempt_id = pending.attempt_id;

    tokio::spawn(async move {
        let delivery = tokio::select! {
            _ = cancelled.cancelled() => {
                debug!(%attempt_id, "Callback listener cancelled");
                return;
            }
            delivery = &mut inbox => delivery,
            _ = tokio::time::sleep(timeout) => {
                if controller.expire_attempt(attempt_id).await {
                    return;
                }
                // A delivery claimed the handle just before the deadline.
                inbox.await
            }
        };

        match delivery {
            Ok(Delivery { uri, reply }) => {
                let outcome = controller.process_callback(Some(attempt_id), &uri).await;
                let _ = reply.send(outcome);
            }
            Err(_) => debug!(%attempt_id, "Callback listener dropped"),
        }
    });

    ListenerHandle {
        pending,
        deliveries,
        cancel,
    }
}
