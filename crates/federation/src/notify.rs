//! Notification emission.
//!
//! Notifications denormalize the triggering actor and note so they stay
//! renderable independently of cache eviction and deletions.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use starling_common::{AppResult, IdGenerator};
use starling_db::entities::notification::{self, NotificationKind};
use starling_db::entities::{account, remote_actor};
use starling_db::repositories::NotificationRepository;

const PREVIEW_CHARS: usize = 100;

/// The denormalized identity of the actor a notification is about.
#[derive(Debug, Clone)]
pub struct NotifyActor {
    pub id: String,
    pub username: String,
    pub domain: Option<String>,
}

impl From<&remote_actor::Model> for NotifyActor {
    fn from(actor: &remote_actor::Model) -> Self {
        Self {
            id: actor.id.clone(),
            username: actor.username.clone(),
            domain: Some(actor.domain.clone()),
        }
    }
}

impl From<&account::Model> for NotifyActor {
    fn from(account: &account::Model) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            domain: None,
        }
    }
}

/// The note context attached to like/reply/mention/boost notifications.
#[derive(Debug, Clone, Default)]
pub struct NotifyNote {
    pub note_id: Option<String>,
    pub note_uri: Option<String>,
    pub preview: Option<String>,
}

impl NotifyNote {
    /// Context for a local note.
    #[must_use]
    pub fn local(note_id: &str, object_uri: &str, body: &str) -> Self {
        Self {
            note_id: Some(note_id.to_string()),
            note_uri: Some(object_uri.to_string()),
            preview: Some(starling_markup::plain_preview(body, PREVIEW_CHARS)),
        }
    }

    /// Context for federated content; the HTML is flattened for preview.
    #[must_use]
    pub fn remote(object_uri: &str, content_html: Option<&str>) -> Self {
        Self {
            note_id: None,
            note_uri: Some(object_uri.to_string()),
            preview: content_html
                .map(|html| starling_markup::plain_preview(&strip_html(html), PREVIEW_CHARS)),
        }
    }
}

/// Emits notifications for local recipients.
#[derive(Clone)]
pub struct Notifier {
    notifications: NotificationRepository,
    id_gen: IdGenerator,
}

impl Notifier {
    #[must_use]
    pub fn new(notifications: NotificationRepository) -> Self {
        Self {
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn notify(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        actor: &NotifyActor,
        note: NotifyNote,
    ) -> AppResult<()> {
        self.notifications
            .create(notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipient_id: Set(recipient_id.to_string()),
                kind: Set(kind),
                actor_id: Set(actor.id.clone()),
                actor_username: Set(actor.username.clone()),
                actor_domain: Set(actor.domain.clone()),
                note_id: Set(note.note_id),
                note_uri: Set(note.note_uri),
                note_preview: Set(note.preview),
                read: Set(false),
                created_at: Set(Utc::now()),
            })
            .await?;
        Ok(())
    }
}

/// Flatten HTML content to text for preview snippets.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>hi <a href=\"x\">@bob</a> &amp; co</p>"),
            "hi @bob & co"
        );
    }

    #[test]
    fn test_remote_note_preview() {
        let note = NotifyNote::remote("https://m.example/notes/7", Some("<p>#music</p>"));
        assert_eq!(note.preview.as_deref(), Some("#music"));
        assert_eq!(note.note_uri.as_deref(), Some("https://m.example/notes/7"));
        assert!(note.note_id.is_none());
    }
}
