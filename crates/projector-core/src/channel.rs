use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use crate::types::SequenceChange;

/// Broadcast stream type used by sequence observers.
pub type ChangeStream = broadcast::Receiver<SequenceChange>;

/// Errors returned while reading a change stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeChannelError {
    /// The projector side of the channel was dropped.
    #[error("change channel is closed")]
    Closed,
}

/// Fan-out channel carrying sequence changes to any number of observers.
#[derive(Clone, Debug)]
pub struct ChangeChannel {
    change_tx: broadcast::Sender<SequenceChange>,
}

impl ChangeChannel {
    /// Create a channel retaining up to `buffer` undelivered changes per observer.
    pub fn new(buffer: usize) -> Self {
        let (change_tx, _) = broadcast::channel(buffer.max(1));
        Self { change_tx }
    }

    /// Subscribe to changes emitted from now on.
    pub fn subscribe(&self) -> ChangeStream {
        self.change_tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.change_tx.receiver_count()
    }

    /// Emit a change to all observers.
    ///
    /// Emission is best-effort; having no observers is not an error.
    pub fn emit(&self, change: SequenceChange) {
        let _ = self.change_tx.send(change);
    }
}

/// Receive the next change, skipping over lag gaps.
///
/// An observer that lagged should re-read the projector snapshot; the gap is
/// logged so it is visible.
pub async fn recv_change(stream: &mut ChangeStream) -> Result<SequenceChange, ChangeChannelError> {
    loop {
        match stream.recv().await {
            Ok(change) => return Ok(change),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "sequence observer lagged; changes dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return Err(ChangeChannelError::Closed),
        }
    }
}
