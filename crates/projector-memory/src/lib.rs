//! In-memory chat SDK used by tests and the smoke app.
//!
//! Implements the projector collaborator traits with a readiness gate,
//! get-or-create channels, server echo on send, remote edits/deletes, and
//! failure/latency injection hooks.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use projector_core::{
    ChannelKey, ChatChannel, ChatClient, ClientProvider, ListenerId, MessageId, MessageListener,
    MessageRecord, ProjectorError,
};
use tokio::sync::{Notify, watch};
use tracing::{debug, trace};
use uuid::Uuid;

/// Connection state driving the readiness gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not ready yet; `ready_client` waits.
    Connecting,
    /// Connected and authenticated.
    Ready,
    /// Connection attempt failed permanently.
    Failed(String),
}

/// Client provider with a controllable readiness gate.
#[derive(Clone)]
pub struct MemoryChatService {
    state_tx: Arc<watch::Sender<ConnectionState>>,
    client: Arc<MemoryChatClient>,
    ready_calls: Arc<AtomicUsize>,
}

impl MemoryChatService {
    /// Create a service that is still connecting.
    pub fn new(user_id: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            state_tx: Arc::new(state_tx),
            client: Arc::new(MemoryChatClient::new(user_id)),
            ready_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a service that is already connected.
    pub fn connected(user_id: impl Into<String>) -> Self {
        let service = Self::new(user_id);
        service.set_state(ConnectionState::Ready);
        service
    }

    pub fn client(&self) -> &Arc<MemoryChatClient> {
        &self.client
    }

    pub fn set_state(&self, state: ConnectionState) {
        debug!(?state, "memory chat connection state changed");
        self.state_tx.send_replace(state);
    }

    /// Number of `ready_client` calls made so far.
    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

impl ClientProvider for MemoryChatService {
    type Client = MemoryChatClient;

    async fn ready_client(&self) -> Result<Arc<MemoryChatClient>, ProjectorError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        let mut state_rx = self.state_tx.subscribe();
        loop {
            let state = state_rx.borrow_and_update().clone();
            match state {
                ConnectionState::Ready => return Ok(Arc::clone(&self.client)),
                ConnectionState::Failed(reason) => {
                    return Err(ProjectorError::connectivity(reason));
                }
                ConnectionState::Connecting => {}
            }
            if state_rx.changed().await.is_err() {
                return Err(ProjectorError::connectivity("connection state source dropped"));
            }
        }
    }
}

/// Chat client holding every channel it has created.
pub struct MemoryChatClient {
    user_id: String,
    channels: Mutex<HashMap<ChannelKey, Arc<MemoryChannel>>>,
    resolution_failure: Mutex<Option<ProjectorError>>,
    resolution_blockers: Mutex<HashMap<ChannelKey, Arc<Notify>>>,
    resolve_calls: AtomicUsize,
}

impl MemoryChatClient {
    fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            channels: Mutex::new(HashMap::new()),
            resolution_failure: Mutex::new(None),
            resolution_blockers: Mutex::new(HashMap::new()),
            resolve_calls: AtomicUsize::new(0),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Create (or replace) a channel with a name and existing history.
    pub fn create_channel(
        &self,
        key: ChannelKey,
        display_name: Option<&str>,
        history: Vec<MessageRecord>,
    ) -> Arc<MemoryChannel> {
        let channel = Arc::new(MemoryChannel::new(
            key.clone(),
            self.user_id.clone(),
            display_name.map(str::to_owned),
            history,
        ));
        lock(&self.channels).insert(key, Arc::clone(&channel));
        channel
    }

    pub fn channel(&self, key: &ChannelKey) -> Option<Arc<MemoryChannel>> {
        lock(&self.channels).get(key).cloned()
    }

    /// Fail the next `get_or_create_channel` call with `error`.
    pub fn fail_next_resolution(&self, error: ProjectorError) {
        *lock(&self.resolution_failure) = Some(error);
    }

    /// Hold the next resolution of `key` until the returned notify fires.
    pub fn block_resolution(&self, key: &ChannelKey) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        lock(&self.resolution_blockers).insert(key.clone(), Arc::clone(&notify));
        notify
    }

    /// Number of `get_or_create_channel` calls made so far.
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

impl ChatClient for MemoryChatClient {
    type Channel = MemoryChannel;

    async fn get_or_create_channel(
        &self,
        key: &ChannelKey,
    ) -> Result<Arc<MemoryChannel>, ProjectorError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        let blocker = lock(&self.resolution_blockers).remove(key);
        if let Some(blocker) = blocker {
            trace!(channel = %key, "channel resolution held");
            blocker.notified().await;
        }

        if let Some(err) = lock(&self.resolution_failure).take() {
            return Err(err.with_channel(key));
        }

        let mut channels = lock(&self.channels);
        let channel = channels.entry(key.clone()).or_insert_with(|| {
            debug!(channel = %key, "creating channel on first access");
            Arc::new(MemoryChannel::new(
                key.clone(),
                self.user_id.clone(),
                None,
                Vec::new(),
            ))
        });
        Ok(Arc::clone(channel))
    }
}

/// One conversation with its history and attached listeners.
pub struct MemoryChannel {
    key: ChannelKey,
    user_id: String,
    display_name: Option<String>,
    messages: Mutex<Vec<MessageRecord>>,
    listeners: Mutex<BTreeMap<ListenerId, MessageListener>>,
    next_listener_id: AtomicU64,
    send_failure: Mutex<Option<ProjectorError>>,
    send_blocker: Mutex<Option<Arc<Notify>>>,
    send_calls: AtomicUsize,
}

impl MemoryChannel {
    fn new(
        key: ChannelKey,
        user_id: String,
        display_name: Option<String>,
        history: Vec<MessageRecord>,
    ) -> Self {
        Self {
            key,
            user_id,
            display_name,
            messages: Mutex::new(history),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener_id: AtomicU64::new(1),
            send_failure: Mutex::new(None),
            send_blocker: Mutex::new(None),
            send_calls: AtomicUsize::new(0),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Number of `send_message` calls made so far, including failed ones.
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Fail the next `send_message` call with `error`.
    pub fn fail_next_send(&self, error: ProjectorError) {
        *lock(&self.send_failure) = Some(error);
    }

    /// Hold the next `send_message` call until the returned notify fires.
    pub fn block_next_send(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *lock(&self.send_blocker) = Some(Arc::clone(&notify));
        notify
    }

    /// Simulate a message from another member arriving.
    pub fn receive_remote(&self, author: &str, text: &str) -> MessageRecord {
        let record = new_record(author, text);
        lock(&self.messages).push(record.clone());
        self.emit_received(&record);
        record
    }

    /// Deliver a `Received` event for an arbitrary record, e.g. a duplicate.
    pub fn redeliver(&self, record: &MessageRecord) {
        self.emit_received(record);
    }

    /// Edit a message in place and notify `Updated` listeners.
    ///
    /// Unknown ids still notify listeners with a synthetic record, which
    /// mimics an update racing ahead of the initial history load.
    pub fn edit_message(&self, id: &MessageId, text: &str) -> MessageRecord {
        let record = {
            let mut messages = lock(&self.messages);
            match messages.iter_mut().find(|m| &m.id == id) {
                Some(message) => {
                    message.text = text.to_owned();
                    message.edited_at_ms = Some(now_millis());
                    message.clone()
                }
                None => MessageRecord {
                    id: id.clone(),
                    author: self.user_id.clone(),
                    text: text.to_owned(),
                    created_at_ms: now_millis(),
                    edited_at_ms: Some(now_millis()),
                },
            }
        };

        let callbacks = self.callbacks(|listener| match listener {
            MessageListener::Updated(cb) => Some(Arc::clone(cb)),
            _ => None,
        });
        for cb in callbacks {
            cb(&record);
        }
        record
    }

    /// Delete a message and notify `Deleted` listeners.
    ///
    /// Soft deletes keep the record in history with its text cleared. Unknown
    /// ids still notify listeners with a synthetic record.
    pub fn delete_message(&self, id: &MessageId, hard: bool) -> MessageRecord {
        let record = {
            let mut messages = lock(&self.messages);
            match messages.iter().position(|m| &m.id == id) {
                Some(idx) if hard => messages.remove(idx),
                Some(idx) => {
                    messages[idx].text.clear();
                    messages[idx].clone()
                }
                None => MessageRecord {
                    id: id.clone(),
                    author: self.user_id.clone(),
                    text: String::new(),
                    created_at_ms: now_millis(),
                    edited_at_ms: None,
                },
            }
        };

        let callbacks = self.callbacks(|listener| match listener {
            MessageListener::Deleted(cb) => Some(Arc::clone(cb)),
            _ => None,
        });
        for cb in callbacks {
            cb(&record, hard);
        }
        record
    }

    fn emit_received(&self, record: &MessageRecord) {
        let callbacks = self.callbacks(|listener| match listener {
            MessageListener::Received(cb) => Some(Arc::clone(cb)),
            _ => None,
        });
        trace!(channel = %self.key, message = %record.id, listeners = callbacks.len(), "emit received");
        for cb in callbacks {
            cb(record);
        }
    }

    // Callbacks run after the listener lock is released so they may call back in.
    fn callbacks<T>(&self, select: impl Fn(&MessageListener) -> Option<T>) -> Vec<T> {
        lock(&self.listeners).values().filter_map(select).collect()
    }
}

impl ChatChannel for MemoryChannel {
    fn key(&self) -> &ChannelKey {
        &self.key
    }

    fn display_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    fn messages(&self) -> Vec<MessageRecord> {
        lock(&self.messages).clone()
    }

    async fn send_message(&self, text: &str) -> Result<MessageId, ProjectorError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);

        let blocker = lock(&self.send_blocker).take();
        if let Some(blocker) = blocker {
            blocker.notified().await;
        }

        if let Some(err) = lock(&self.send_failure).take() {
            return Err(err.with_channel(&self.key));
        }

        let record = new_record(&self.user_id, text);
        lock(&self.messages).push(record.clone());
        self.emit_received(&record);
        Ok(record.id)
    }

    fn add_listener(&self, listener: MessageListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        trace!(channel = %self.key, listener = id.0, kind = ?listener.kind(), "listener added");
        lock(&self.listeners).insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        lock(&self.listeners).remove(&id).is_some()
    }
}

/// Build a record with a fresh id, as the server would on accept.
pub fn new_record(author: &str, text: &str) -> MessageRecord {
    MessageRecord {
        id: MessageId::new(Uuid::new_v4().to_string()),
        author: author.to_owned(),
        text: text.to_owned(),
        created_at_ms: now_millis(),
        edited_at_ms: None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
