//! HTML rendering of note text.

use crate::{HASHTAG, MD_LINK, MENTION};

/// Resolved target for a mention anchor.
#[derive(Debug, Clone)]
pub struct MentionLink {
    /// The `user@domain` form as written in the note (domain optional).
    pub acct: String,
    /// The actor's profile URL the anchor points at.
    pub href: String,
}

/// Escape text for inclusion in HTML.
#[must_use]
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Link { label: &'a str, url: &'a str },
    Mention { username: &'a str, domain: Option<&'a str> },
    Hashtag(&'a str),
}

/// Split note text into inline tokens. Markdown links win over mentions
/// and hashtags that happen to sit inside their label or URL.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    #[derive(Debug)]
    struct Span<'a> {
        start: usize,
        end: usize,
        token: Token<'a>,
    }

    let mut spans: Vec<Span> = Vec::new();

    for caps in MD_LINK.captures_iter(text) {
        let (Some(whole), Some(label), Some(url)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        spans.push(Span {
            start: whole.start(),
            end: whole.end(),
            token: Token::Link {
                label: label.as_str(),
                url: url.as_str(),
            },
        });
    }

    for caps in MENTION.captures_iter(text) {
        let (Some(whole), Some(username)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if spans.iter().any(|s| whole.start() < s.end && s.start < whole.end()) {
            continue;
        }
        spans.push(Span {
            start: whole.start(),
            end: whole.end(),
            token: Token::Mention {
                username: username.as_str(),
                domain: caps.get(2).map(|m| m.as_str()),
            },
        });
    }

    for caps in HASHTAG.captures_iter(text) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if spans.iter().any(|s| whole.start() < s.end && s.start < whole.end()) {
            continue;
        }
        spans.push(Span {
            start: whole.start(),
            end: whole.end(),
            token: Token::Hashtag(tag.as_str()),
        });
    }

    spans.sort_by_key(|s| s.start);

    let mut tokens = Vec::new();
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            tokens.push(Token::Text(&text[cursor..span.start]));
        }
        tokens.push(span.token);
        cursor = span.end;
    }
    if cursor < text.len() {
        tokens.push(Token::Text(&text[cursor..]));
    }
    tokens
}

/// Render note text as the HTML served in federated objects.
///
/// - markdown links become plain anchors,
/// - hashtags become tag anchors pointing at the local tag page,
/// - mentions with a resolved target become microformat `h-card` anchors;
///   unresolved mentions stay as text.
#[must_use]
pub fn render_html(text: &str, local_domain: &str, mentions: &[MentionLink]) -> String {
    let mut out = String::from("<p>");

    for token in tokenize(text) {
        match token {
            Token::Text(t) => {
                out.push_str(&html_escape(t).replace('\n', "<br>"));
            }
            Token::Link { label, url } => {
                out.push_str(&format!(
                    r#"<a href="{}" rel="nofollow noopener" target="_blank">{}</a>"#,
                    html_escape(url),
                    html_escape(label)
                ));
            }
            Token::Hashtag(tag) => {
                out.push_str(&format!(
                    r##"<a href="https://{}/tags/{}" class="mention hashtag" rel="tag">#<span>{}</span></a>"##,
                    html_escape(local_domain),
                    html_escape(&tag.to_lowercase()),
                    html_escape(tag)
                ));
            }
            Token::Mention { username, domain } => {
                let acct = match domain {
                    Some(d) => format!("{username}@{d}"),
                    None => username.to_string(),
                };
                if let Some(link) = mentions.iter().find(|m| m.acct == acct) {
                    out.push_str(&format!(
                        r#"<span class="h-card"><a href="{}" class="u-url mention">@<span>{}</span></a></span>"#,
                        html_escape(&link.href),
                        html_escape(username)
                    ));
                } else {
                    out.push('@');
                    out.push_str(&html_escape(&acct));
                }
            }
        }
    }

    out.push_str("</p>");
    out
}

/// A plain-text preview of note text, truncated on a character boundary.
/// Used for denormalized notification snippets.
#[must_use]
pub fn plain_preview(text: &str, max_chars: usize) -> String {
    let flattened = MD_LINK.replace_all(text, "$1");
    let flattened = flattened.replace('\n', " ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let truncated: String = flattened.chars().take(max_chars).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain_text_escaped() {
        let html = render_html("1 < 2 & 2 > 1", "social.example", &[]);
        assert_eq!(html, "<p>1 &lt; 2 &amp; 2 &gt; 1</p>");
    }

    #[test]
    fn test_render_markdown_link() {
        let html = render_html("read [this](https://example.com/p?a=1&b=2)", "social.example", &[]);
        assert!(html.contains(
            r#"<a href="https://example.com/p?a=1&amp;b=2" rel="nofollow noopener" target="_blank">this</a>"#
        ));
    }

    #[test]
    fn test_render_hashtag() {
        let html = render_html("new song #Music", "social.example", &[]);
        assert!(html.contains(
            r##"<a href="https://social.example/tags/music" class="mention hashtag" rel="tag">#<span>Music</span></a>"##
        ));
    }

    #[test]
    fn test_render_mention_with_link() {
        let links = vec![MentionLink {
            acct: "bob@m.example".into(),
            href: "https://m.example/users/bob".into(),
        }];
        let html = render_html("hi @bob@m.example", "social.example", &links);
        assert!(html.contains(
            r#"<span class="h-card"><a href="https://m.example/users/bob" class="u-url mention">@<span>bob</span></a></span>"#
        ));
    }

    #[test]
    fn test_render_unresolved_mention_stays_text() {
        let html = render_html("hi @ghost@gone.example", "social.example", &[]);
        assert_eq!(html, "<p>hi @ghost@gone.example</p>");
    }

    #[test]
    fn test_hashtag_inside_link_not_doubly_rendered() {
        let html = render_html(
            "[#music on here](https://example.com/tags/music)",
            "social.example",
            &[],
        );
        assert!(html.contains(">#music on here</a>"));
        assert!(!html.contains("class=\"mention hashtag\""));
    }

    #[test]
    fn test_newlines_become_breaks() {
        let html = render_html("one\ntwo", "social.example", &[]);
        assert_eq!(html, "<p>one<br>two</p>");
    }

    #[test]
    fn test_plain_preview_truncates() {
        let preview = plain_preview("read [docs](https://example.com) now", 100);
        assert_eq!(preview, "read docs now");

        let long = "a".repeat(120);
        let preview = plain_preview(&long, 100);
        assert_eq!(preview.chars().count(), 101); // 100 chars + ellipsis
    }
}
