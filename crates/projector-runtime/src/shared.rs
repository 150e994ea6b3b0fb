//! State reachable from SDK listener callbacks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use projector_core::{
    ChangeChannel, LocalSequence, MessageId, MessageListener, MessageRecord, SequenceChange,
};
use tracing::trace;

/// Sequence and title as last published to observers.
#[derive(Debug, Default)]
pub(crate) struct ProjectedState {
    pub(crate) sequence: LocalSequence,
    pub(crate) title: String,
    /// Load generation whose listeners may mutate the sequence.
    pub(crate) generation: u64,
}

/// Projection state plus the channel its changes are published on.
///
/// Every mutation happens under the state lock and is emitted before the lock
/// is released, so observers see changes in the order they were applied.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<ProjectedState>,
    changes: ChangeChannel,
}

impl Shared {
    pub(crate) fn new(change_buffer: usize) -> Self {
        Self {
            state: Mutex::new(ProjectedState::default()),
            changes: ChangeChannel::new(change_buffer),
        }
    }

    pub(crate) fn changes(&self) -> &ChangeChannel {
        &self.changes
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, ProjectedState> {
        lock(&self.state)
    }

    /// Build the three listeners for one subscription generation.
    ///
    /// Listeners hold the state weakly; once the projector is gone they do nothing.
    pub(crate) fn listeners(self: &Arc<Self>, generation: u64) -> [MessageListener; 3] {
        let on_received = Arc::downgrade(self);
        let on_updated = Arc::downgrade(self);
        let on_deleted = Arc::downgrade(self);

        [
            MessageListener::Received(Arc::new(move |record: &MessageRecord| {
                with_shared(&on_received, |shared| shared.on_received(generation, record));
            })),
            MessageListener::Updated(Arc::new(move |record: &MessageRecord| {
                with_shared(&on_updated, |shared| shared.on_updated(generation, record));
            })),
            MessageListener::Deleted(Arc::new(move |record: &MessageRecord, hard: bool| {
                with_shared(&on_deleted, |shared| {
                    shared.on_deleted(generation, record, hard);
                });
            })),
        ]
    }

    pub(crate) fn on_received(&self, generation: u64, record: &MessageRecord) {
        self.apply(generation, "received", &record.id, |sequence| {
            Some(sequence.push(record))
        });
    }

    pub(crate) fn on_updated(&self, generation: u64, record: &MessageRecord) {
        self.apply(generation, "updated", &record.id, |sequence| {
            sequence.refresh(record)
        });
    }

    // Hard and soft deletes both drop the local view.
    pub(crate) fn on_deleted(&self, generation: u64, record: &MessageRecord, hard: bool) {
        trace!(message = %record.id, hard, "delete event");
        self.apply(generation, "deleted", &record.id, |sequence| {
            sequence.remove(&record.id)
        });
    }

    fn apply(
        &self,
        generation: u64,
        event: &'static str,
        id: &MessageId,
        mutate: impl FnOnce(&mut LocalSequence) -> Option<SequenceChange>,
    ) {
        let mut state = self.state();
        if state.generation != generation {
            trace!(
                event,
                message = %id,
                generation,
                current = state.generation,
                "ignoring event from stale subscription"
            );
            return;
        }

        match mutate(&mut state.sequence) {
            Some(change) => {
                trace!(event, message = %id, change = change.kind(), "applied channel event");
                self.changes.emit(change);
            }
            None => trace!(event, message = %id, "message not in sequence; ignoring"),
        }
    }
}

fn with_shared(shared: &Weak<Shared>, f: impl FnOnce(&Shared)) {
    if let Some(shared) = shared.upgrade() {
        f(&shared);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            author: "bob".to_owned(),
            text: text.to_owned(),
            created_at_ms: 1_731_000_000,
            edited_at_ms: None,
        }
    }

    #[test]
    fn stale_generation_events_are_ignored() {
        let shared = Shared::new(8);
        shared.state().generation = 2;

        shared.on_received(1, &record("a", "late"));
        assert!(shared.state().sequence.is_empty());

        shared.on_received(2, &record("a", "current"));
        assert_eq!(shared.state().sequence.len(), 1);
    }

    #[test]
    fn listeners_do_nothing_after_state_is_dropped() {
        let shared = Arc::new(Shared::new(8));
        let [received, _, _] = shared.listeners(0);
        drop(shared);

        let MessageListener::Received(cb) = received else {
            panic!("first listener should be Received");
        };
        cb(&record("a", "orphan"));
    }

    #[tokio::test]
    async fn emits_change_for_each_applied_event() {
        let shared = Shared::new(8);
        let mut changes = shared.changes().subscribe();

        shared.on_received(0, &record("a", "hello"));
        shared.on_deleted(0, &record("zzz", ""), true);
        shared.on_deleted(0, &record("a", ""), false);

        let first = changes.recv().await.expect("inserted change");
        assert!(matches!(first, SequenceChange::Inserted { index: 0, .. }));
        let second = changes.recv().await.expect("removed change");
        assert_eq!(
            second,
            SequenceChange::Removed {
                index: 0,
                id: MessageId::new("a"),
            }
        );
        assert!(changes.try_recv().is_err());
    }
}
