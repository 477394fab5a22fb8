//! Delayed automatic return to scanning
//!
//! After a result is shown, one timer per scan session posts a message back to
//! the flow controller. The timer is a cancellable task owned by the
//! scheduler: scheduling again, cancelling, or dropping the scheduler all stop
//! the previous timer.
//!
//! Cancellation cannot recall a message the timer already sent. The flow
//! machine therefore also checks the session id carried by the message.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug)]
struct PendingReset {
    session_id: Uuid,
    token: CancellationToken,
}

/// Owner of the single pending auto-reset timer
#[derive(Debug, Default)]
pub struct ResetScheduler {
    pending: Option<PendingReset>,
}

impl ResetScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the timer for `session_id`, replacing any pending one
    ///
    /// After `delay`, `message` is sent on `tx` unless the timer was
    /// cancelled first. Must be called from within a tokio runtime.
    pub fn schedule<M>(
        &mut self,
        session_id: Uuid,
        delay: Duration,
        tx: mpsc::UnboundedSender<M>,
        message: M,
    ) where
        M: Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::debug!(session_id = %session_id, "Auto-reset cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    tracing::debug!(session_id = %session_id, "Auto-reset timer fired");
                    if tx.send(message).is_err() {
                        tracing::debug!(session_id = %session_id, "Flow controller gone, auto-reset dropped");
                    }
                }
            }
        });

        tracing::debug!(session_id = %session_id, delay_ms = delay.as_millis() as u64, "Auto-reset scheduled");
        self.pending = Some(PendingReset { session_id, token });
    }

    /// Cancel the pending timer, returning the session it belonged to
    pub fn cancel(&mut self) -> Option<Uuid> {
        self.pending.take().map(|pending| {
            pending.token.cancel();
            pending.session_id
        })
    }

    /// Session whose timer is pending, if any
    pub fn pending_session(&self) -> Option<Uuid> {
        self.pending.as_ref().map(|p| p.session_id)
    }

    /// Forget the timer for `session_id` once its message has been consumed
    pub fn clear(&mut self, session_id: Uuid) {
        if self.pending_session() == Some(session_id) {
            self.pending = None;
        }
    }
}

impl Drop for ResetScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
