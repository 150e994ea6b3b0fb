use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ChannelKey;

/// Broad error category used for logging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectorErrorCategory {
    /// The chat client never became ready (not connected or not authenticated).
    Connectivity,
    /// The channel could not be fetched or created.
    ChannelResolution,
    /// A message could not be dispatched.
    Send,
}

/// Stable projector error payload, also published to observers on send failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct ProjectorError {
    /// High-level error category.
    pub category: ProjectorErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Channel the failure relates to, when known.
    pub channel: Option<ChannelKey>,
}

impl ProjectorError {
    /// Construct a new projector error.
    pub fn new(
        category: ProjectorErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            channel: None,
        }
    }

    /// Attach channel context unless the error already carries one.
    pub fn with_channel(mut self, channel: &ChannelKey) -> Self {
        if self.channel.is_none() {
            self.channel = Some(channel.clone());
        }
        self
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(
            ProjectorErrorCategory::Connectivity,
            "client_not_ready",
            message,
        )
    }

    pub fn channel_resolution(message: impl Into<String>) -> Self {
        Self::new(
            ProjectorErrorCategory::ChannelResolution,
            "channel_resolution_failed",
            message,
        )
    }

    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::new(ProjectorErrorCategory::Send, "send_failed", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelId, ChannelType};

    #[test]
    fn keeps_error_codes_stable() {
        assert_eq!(
            ProjectorError::connectivity("offline").code,
            "client_not_ready"
        );
        assert_eq!(
            ProjectorError::channel_resolution("denied").code,
            "channel_resolution_failed"
        );
        assert_eq!(ProjectorError::send_failed("timeout").code, "send_failed");
    }

    #[test]
    fn first_channel_context_wins() {
        let general = ChannelKey::new(ChannelType::new("messaging"), ChannelId::new("general"));
        let random = ChannelKey::new(ChannelType::new("messaging"), ChannelId::new("random"));

        let err = ProjectorError::send_failed("timeout")
            .with_channel(&general)
            .with_channel(&random);
        assert_eq!(err.channel, Some(general));
    }

    #[test]
    fn display_includes_category_and_code() {
        let err = ProjectorError::send_failed("network down");
        assert_eq!(err.to_string(), "Send:send_failed: network down");
    }
}
