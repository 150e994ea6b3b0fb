use serde::{Deserialize, Serialize};

/// Default character cap for channel titles.
pub const DEFAULT_TITLE_MAX_CHARS: usize = 30;
/// Default per-observer change buffer.
pub const DEFAULT_CHANGE_BUFFER: usize = 256;

/// Runtime tuning for a channel projector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// Maximum characters kept from the channel display name.
    pub title_max_chars: usize,
    /// Undelivered changes retained per observer before it lags.
    pub change_buffer: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
            change_buffer: DEFAULT_CHANGE_BUFFER,
        }
    }
}

impl ProjectorConfig {
    pub fn with_title_max_chars(mut self, title_max_chars: usize) -> Self {
        self.title_max_chars = title_max_chars;
        self
    }

    pub fn with_change_buffer(mut self, change_buffer: usize) -> Self {
        self.change_buffer = change_buffer.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ProjectorConfig::default();
        assert_eq!(config.title_max_chars, 30);
        assert_eq!(config.change_buffer, 256);
    }

    #[test]
    fn change_buffer_is_at_least_one() {
        let config = ProjectorConfig::default().with_change_buffer(0);
        assert_eq!(config.change_buffer, 1);
    }
}
