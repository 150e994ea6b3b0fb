use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProjectorError;

/// Channel type tag, for example `messaging` or `livestream`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChannelType(String);

impl ChannelType {
    /// Wrap a raw channel type tag.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel identifier, unique within one channel type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wrap a raw channel identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified channel address used for lookups and log context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Channel type tag.
    pub channel_type: ChannelType,
    /// Channel identifier.
    pub channel_id: ChannelId,
}

impl ChannelKey {
    pub fn new(channel_type: ChannelType, channel_id: ChannelId) -> Self {
        Self {
            channel_type,
            channel_id,
        }
    }

    /// Build a key from raw inputs, returning `None` when either part is blank.
    ///
    /// Non-blank parts are kept verbatim; identifiers are opaque to the projector.
    pub fn from_parts(channel_type: Option<&str>, channel_id: Option<&str>) -> Option<Self> {
        let channel_type = channel_type.filter(|v| !v.trim().is_empty())?;
        let channel_id = channel_id.filter(|v| !v.trim().is_empty())?;
        Some(Self::new(
            ChannelType::new(channel_type),
            ChannelId::new(channel_id),
        ))
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel_type, self.channel_id)
    }
}

/// Stable message identity assigned by the chat SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of one SDK-owned message as delivered by the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    /// Stable message identity.
    pub id: MessageId,
    /// Author user ID.
    pub author: String,
    /// Current message text.
    pub text: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at_ms: u64,
    /// Last edit timestamp, `None` when never edited.
    pub edited_at_ms: Option<u64>,
}

impl MessageRecord {
    pub fn is_edited(&self) -> bool {
        self.edited_at_ms.is_some()
    }
}

/// Presentation wrapper for exactly one [`MessageRecord`].
///
/// Identity is the wrapped record's [`MessageId`]; the remaining fields are
/// display state copied from the record and refreshed in place on updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageView {
    /// Identity of the wrapped record.
    pub id: MessageId,
    /// Author shown next to the message.
    pub author: String,
    /// Display text.
    pub text: String,
    /// Timestamp used for display, in milliseconds since Unix epoch.
    pub timestamp_ms: u64,
    /// Whether the message has been edited.
    pub edited: bool,
}

impl MessageView {
    /// Build a view for a freshly seeded or received record.
    pub fn from_record(record: &MessageRecord) -> Self {
        Self {
            id: record.id.clone(),
            author: record.author.clone(),
            text: record.text.clone(),
            timestamp_ms: record.created_at_ms,
            edited: record.is_edited(),
        }
    }

    /// Refresh display fields from the latest state of the wrapped record.
    ///
    /// Identity never changes; a record with a different id is ignored.
    pub fn refresh(&mut self, record: &MessageRecord) -> bool {
        if record.id != self.id {
            return false;
        }
        self.author.clone_from(&record.author);
        self.text.clone_from(&record.text);
        self.timestamp_ms = record.created_at_ms;
        self.edited = record.is_edited();
        true
    }
}

/// Why a send request was not dispatched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SendRejection {
    /// Another send is still in flight.
    Busy,
    /// Input text is empty.
    EmptyInput,
    /// No channel is loaded yet.
    NoChannel,
}

/// Result of a send request that did not fail at the SDK level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message accepted by the channel; it appears once echoed back.
    Sent { message_id: MessageId },
    /// Request rejected locally; nothing was dispatched.
    Rejected(SendRejection),
}

/// Result of a load request that did not fail at the SDK level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Channel type or id is missing; nothing happened.
    Skipped,
    /// Channel loaded and subscribed.
    Loaded {
        /// Loaded channel.
        channel: ChannelKey,
        /// Number of seeded messages.
        seeded: usize,
    },
    /// A newer load started while this one was awaiting the SDK.
    Superseded,
}

/// Change notification published to sequence observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SequenceChange {
    /// Sequence replaced wholesale (new channel seeded).
    Reset {
        /// Newly subscribed channel.
        channel: ChannelKey,
        /// Seeded views in display order.
        items: Vec<MessageView>,
    },
    /// View inserted at `index`.
    Inserted { index: usize, view: MessageView },
    /// View at `index` refreshed in place.
    Updated { index: usize, view: MessageView },
    /// View removed from `index`.
    Removed { index: usize, id: MessageId },
    /// Display title changed.
    TitleChanged { title: String },
    /// A send failed; input was kept so the user may retry.
    SendFailed { error: ProjectorError },
}

impl SequenceChange {
    /// Short variant name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reset { .. } => "Reset",
            Self::Inserted { .. } => "Inserted",
            Self::Updated { .. } => "Updated",
            Self::Removed { .. } => "Removed",
            Self::TitleChanged { .. } => "TitleChanged",
            Self::SendFailed { .. } => "SendFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            author: "alice".to_owned(),
            text: text.to_owned(),
            created_at_ms: 1_731_000_000,
            edited_at_ms: None,
        }
    }

    #[test]
    fn channel_key_requires_both_parts() {
        assert_eq!(ChannelKey::from_parts(Some("messaging"), None), None);
        assert_eq!(ChannelKey::from_parts(None, Some("general")), None);
        assert_eq!(ChannelKey::from_parts(Some("  "), Some("general")), None);
        assert_eq!(ChannelKey::from_parts(Some("messaging"), Some("\t")), None);

        let key = ChannelKey::from_parts(Some("messaging"), Some("general"))
            .expect("both parts present");
        assert_eq!(key.to_string(), "messaging:general");
    }

    #[test]
    fn channel_key_keeps_padded_parts_verbatim() {
        let key = ChannelKey::from_parts(Some("messaging"), Some(" padded "))
            .expect("padded id is not blank");
        assert_eq!(key.channel_id.as_str(), " padded ");
        assert_eq!(key.channel_type.as_str(), "messaging");
    }

    #[test]
    fn refresh_copies_display_fields_only_for_same_identity() {
        let mut view = MessageView::from_record(&record("m1", "hello"));

        let mut edited = record("m1", "hello!");
        edited.edited_at_ms = Some(1_731_000_500);
        assert!(view.refresh(&edited));
        assert_eq!(view.text, "hello!");
        assert!(view.edited);

        assert!(!view.refresh(&record("m2", "other")));
        assert_eq!(view.id, MessageId::new("m1"));
        assert_eq!(view.text, "hello!");
    }

    #[test]
    fn sequence_change_serializes_with_variant_tag() {
        let change = SequenceChange::TitleChanged {
            title: "general".into(),
        };
        let json = serde_json::to_string(&change).expect("change should serialize");
        assert_eq!(json, r#"{"TitleChanged":{"title":"general"}}"#);
    }
}
