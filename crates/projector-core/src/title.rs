use crate::types::ChannelKey;

/// Truncate `name` to at most `max_chars` characters.
///
/// Counts chars, not bytes, so multi-byte names are never split mid-codepoint.
/// Shorter names come back unchanged: no padding and no truncation marker.
pub fn truncate_title(name: &str, max_chars: usize) -> String {
    match name.char_indices().nth(max_chars) {
        Some((cut, _)) => name[..cut].to_owned(),
        None => name.to_owned(),
    }
}

/// Display title for a channel: its name, or the channel id when unnamed.
pub fn channel_title(display_name: Option<&str>, key: &ChannelKey, max_chars: usize) -> String {
    let name = display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| key.channel_id.as_str());
    truncate_title(name, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelId, ChannelType};

    #[test]
    fn short_names_are_unchanged() {
        assert_eq!(truncate_title("hello", 30), "hello");
        assert_eq!(truncate_title("", 30), "");
    }

    #[test]
    fn long_names_are_cut_at_char_boundary() {
        assert_eq!(truncate_title("abcdefgh", 5), "abcde");
        assert_eq!(truncate_title("żółć gęślą", 4), "żółć");
        assert_eq!(truncate_title("exactly5", 8), "exactly5");
    }

    #[test]
    fn zero_limit_yields_empty_title() {
        assert_eq!(truncate_title("general", 0), "");
    }

    #[test]
    fn falls_back_to_channel_id_when_unnamed() {
        let key = ChannelKey::new(ChannelType::new("messaging"), ChannelId::new("support-42"));
        assert_eq!(channel_title(None, &key, 30), "support-42");
        assert_eq!(channel_title(Some("   "), &key, 30), "support-42");
        assert_eq!(channel_title(Some("Support desk"), &key, 7), "Support");
    }

    #[test]
    fn padded_names_are_not_trimmed() {
        let key = ChannelKey::new(ChannelType::new("messaging"), ChannelId::new("support-42"));
        assert_eq!(channel_title(Some("  hi  "), &key, 30), "  hi  ");
        assert_eq!(channel_title(Some("  hello"), &key, 4), "  he");
    }
}
