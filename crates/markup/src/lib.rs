//! Note text parsing and HTML rendering.
//!
//! Notes are written as plain text with three inline constructs:
//! markdown-style links `[label](https://...)`, `#hashtags` and
//! `@user` / `@user@domain` mentions. This crate extracts those entities
//! and renders the federated HTML representation as a pure function; it
//! knows nothing about storage or HTTP.

mod render;

pub use render::{MentionLink, html_escape, plain_preview, render_html};

use once_cell::sync::Lazy;
use regex::Regex;

/// A mention reference found in note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionRef {
    /// Username without the leading `@`.
    pub username: String,
    /// Domain part, absent for local mentions.
    pub domain: Option<String>,
}

impl MentionRef {
    /// The `user@domain` form used for display and lookups.
    #[must_use]
    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{}", self.username, domain),
            None => self.username.clone(),
        }
    }
}

pub(crate) static MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\((https?://[^)\s]+)\)").expect("valid regex"));

pub(crate) static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@([A-Za-z0-9_]+)(?:@([A-Za-z0-9][A-Za-z0-9.\-]*))?").expect("valid regex")
});

pub(crate) static HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([A-Za-z0-9_]+)").expect("valid regex"));

/// Extract all mentions from note text, in order of appearance.
#[must_use]
pub fn extract_mentions(text: &str) -> Vec<MentionRef> {
    let mut seen = Vec::new();
    for caps in MENTION.captures_iter(text) {
        let mention = MentionRef {
            username: caps[1].to_string(),
            domain: caps.get(2).map(|m| m.as_str().to_string()),
        };
        if !seen.contains(&mention) {
            seen.push(mention);
        }
    }
    seen
}

/// Extract all hashtags from note text, lowercased, in order of appearance.
#[must_use]
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in HASHTAG.captures_iter(text) {
        let tag = caps[1].to_lowercase();
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

/// Count the characters a reader sees: markdown links count their label
/// only, everything else counts as written.
#[must_use]
pub fn visible_length(text: &str) -> usize {
    let mut len = 0;
    let mut last = 0;
    for caps in MD_LINK.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        len += text[last..whole.start()].chars().count();
        len += caps[1].chars().count();
        last = whole.end();
    }
    len + text[last..].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_mentions() {
        let mentions = extract_mentions("hi @bob@m.example and @alice, hello @bob@m.example");
        assert_eq!(
            mentions,
            vec![
                MentionRef {
                    username: "bob".into(),
                    domain: Some("m.example".into())
                },
                MentionRef {
                    username: "alice".into(),
                    domain: None
                },
            ]
        );
        assert_eq!(mentions[0].acct(), "bob@m.example");
    }

    #[test]
    fn test_extract_hashtags() {
        assert_eq!(
            extract_hashtags("listening to #Music tonight #music #jazz"),
            vec!["music".to_string(), "jazz".to_string()]
        );
    }

    #[test]
    fn test_no_entities() {
        assert!(extract_mentions("a plain note").is_empty());
        assert!(extract_hashtags("a plain note").is_empty());
    }

    #[test]
    fn test_visible_length_counts_link_label_only() {
        assert_eq!(visible_length("read [this](https://example.com/a/very/long/path)"), 9);
        assert_eq!(visible_length("no links here"), 13);
    }
}
