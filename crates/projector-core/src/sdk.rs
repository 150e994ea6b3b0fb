//! Collaborator contract for the external chat SDK.
//!
//! The projector only talks to the SDK through these traits. Implementations
//! own connection management, persistence and event delivery.

use std::{fmt, future::Future, sync::Arc};

use crate::{
    error::ProjectorError,
    types::{ChannelKey, MessageId, MessageRecord},
};

/// Callback invoked with a received or updated record.
pub type RecordCallback = Arc<dyn Fn(&MessageRecord) + Send + Sync + 'static>;

/// Callback invoked with a deleted record and its hard-delete flag.
pub type DeleteCallback = Arc<dyn Fn(&MessageRecord, bool) + Send + Sync + 'static>;

/// Handle returned by [`ChatChannel::add_listener`], used to detach it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Which channel event a listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Received,
    Updated,
    Deleted,
}

/// One event listener to attach to a channel.
#[derive(Clone)]
pub enum MessageListener {
    /// A new message arrived (including echoes of our own sends).
    Received(RecordCallback),
    /// An existing message was edited in place.
    Updated(RecordCallback),
    /// A message was deleted; the flag is `true` for hard deletes.
    Deleted(DeleteCallback),
}

impl MessageListener {
    pub fn kind(&self) -> ListenerKind {
        match self {
            Self::Received(_) => ListenerKind::Received,
            Self::Updated(_) => ListenerKind::Updated,
            Self::Deleted(_) => ListenerKind::Deleted,
        }
    }
}

impl fmt::Debug for MessageListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageListener").field(&self.kind()).finish()
    }
}

/// Remote conversation handle owned by the SDK.
pub trait ChatChannel: Send + Sync + 'static {
    /// Address of this channel.
    fn key(&self) -> &ChannelKey;

    /// Display name, when the channel has one.
    fn display_name(&self) -> Option<String>;

    /// Snapshot of the channel's message history in display order.
    fn messages(&self) -> Vec<MessageRecord>;

    /// Dispatch a new message. It is echoed back through `Received` listeners.
    fn send_message(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<MessageId, ProjectorError>> + Send;

    /// Attach a listener; events are delivered until it is removed.
    fn add_listener(&self, listener: MessageListener) -> ListenerId;

    /// Detach a listener. Returns `false` when the id was unknown.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Connected chat client.
pub trait ChatClient: Send + Sync + 'static {
    type Channel: ChatChannel;

    /// Fetch a channel, creating it remotely when it does not exist yet.
    fn get_or_create_channel(
        &self,
        key: &ChannelKey,
    ) -> impl Future<Output = Result<Arc<Self::Channel>, ProjectorError>> + Send;
}

/// Source of a ready (connected and authenticated) chat client.
pub trait ClientProvider: Send + Sync + 'static {
    type Client: ChatClient;

    /// Wait until the client is ready. May suspend indefinitely while offline.
    fn ready_client(&self)
    -> impl Future<Output = Result<Arc<Self::Client>, ProjectorError>> + Send;
}
