//! Core contract for the channel projector.
//!
//! This crate defines the chat SDK collaborator traits, the message data model,
//! the ordered local sequence, the subscription lifecycle and the
//! change-notification channel shared by the runtime and its observers.

/// Change-notification fan-out for sequence observers.
pub mod channel;
/// Projector tuning values.
pub mod config;
/// Stable projector error types.
pub mod error;
/// Single-flight send guard.
pub mod gate;
/// Collaborator traits implemented by chat SDK adapters.
pub mod sdk;
/// Ordered, identity-indexed message view list.
pub mod sequence;
/// Channel subscription lifecycle.
pub mod subscription;
/// Channel title policy.
pub mod title;
/// Data model and change payloads.
pub mod types;

pub use channel::{ChangeChannel, ChangeChannelError, ChangeStream, recv_change};
pub use config::ProjectorConfig;
pub use error::{ProjectorError, ProjectorErrorCategory};
pub use gate::{SendGate, SendPermit};
pub use sdk::{
    ChatChannel, ChatClient, ClientProvider, DeleteCallback, ListenerId, ListenerKind,
    MessageListener, RecordCallback,
};
pub use sequence::LocalSequence;
pub use subscription::{ActiveSubscription, SubscriptionState};
pub use title::{channel_title, truncate_title};
pub use types::{
    ChannelId, ChannelKey, ChannelType, LoadOutcome, MessageId, MessageRecord, MessageView,
    SendOutcome, SendRejection, SequenceChange,
};
