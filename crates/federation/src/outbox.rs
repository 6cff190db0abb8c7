//! Outbox assembly.
//!
//! Every local action enters here: the activity envelope is built, the
//! recipient inbox set collected, and one delivery item enqueued per
//! inbox. Individual unresolvable recipients are skipped with a warning;
//! nothing here ever blocks publishing.

use std::collections::BTreeSet;

use chrono::{SecondsFormat, Utc};
use sea_orm::ActiveValue::Set;
use serde_json::{Value, json};
use starling_common::{AppError, AppResult, IdGenerator, config::FederationConfig};
use starling_db::entities::note::{self, Visibility};
use starling_db::entities::notification::NotificationKind;
use starling_db::entities::{account, delivery_item, follow, remote_actor};
use starling_db::repositories::{
    AccountRepository, ActivityRepository, DeliveryRepository, EngagementRepository,
    EngagementTarget, FollowRepository, NoteRepository, RelayRepository, RemoteActorRepository,
};
use starling_markup::{MentionLink, MentionRef};
use tracing::{debug, info, warn};

use crate::notify::{Notifier, NotifyActor, NotifyNote};
use crate::objects::{ACTIVITYSTREAMS_CONTEXT, PUBLIC};
use crate::resolver::ActorResolver;

/// A mention resolved to a deliverable target.
struct ResolvedMention {
    acct: String,
    href: String,
    inbox: Option<String>,
    local_account: Option<account::Model>,
}

/// Assembles activities for local actions and enqueues deliveries.
#[derive(Clone)]
pub struct OutboxService {
    config: FederationConfig,
    accounts: AccountRepository,
    remote_actors: RemoteActorRepository,
    notes: NoteRepository,
    activities: ActivityRepository,
    follows: FollowRepository,
    engagement: EngagementRepository,
    relays: RelayRepository,
    deliveries: DeliveryRepository,
    resolver: ActorResolver,
    notifier: Notifier,
    id_gen: IdGenerator,
}

impl OutboxService {
    #[must_use]
    pub fn new(
        config: FederationConfig,
        accounts: AccountRepository,
        remote_actors: RemoteActorRepository,
        notes: NoteRepository,
        activities: ActivityRepository,
        follows: FollowRepository,
        engagement: EngagementRepository,
        relays: RelayRepository,
        deliveries: DeliveryRepository,
        resolver: ActorResolver,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            accounts,
            remote_actors,
            notes,
            activities,
            follows,
            engagement,
            relays,
            deliveries,
            resolver,
            notifier,
            id_gen: IdGenerator::new(),
        }
    }

    // === URI construction ===

    #[must_use]
    pub fn actor_uri(&self, username: &str) -> String {
        format!("https://{}/users/{username}", self.config.local_domain)
    }

    #[must_use]
    pub fn followers_uri(&self, username: &str) -> String {
        format!("{}/followers", self.actor_uri(username))
    }

    fn mint_activity_uri(&self) -> String {
        format!(
            "https://{}/activities/{}",
            self.config.local_domain,
            self.id_gen.generate()
        )
    }

    // === Publishing ===

    /// Publish a new note: persist it, then fan a Create out to
    /// followers, the reply target's author, mentioned actors and (for
    /// public notes) active relays.
    pub async fn publish_create(
        &self,
        author: &account::Model,
        body: &str,
        visibility: Visibility,
        in_reply_to_uri: Option<String>,
    ) -> AppResult<note::Model> {
        let limit = self.config.note_char_limit();
        let visible = starling_markup::visible_length(body);
        if visible == 0 {
            return Err(AppError::Validation("note body is empty".to_string()));
        }
        if visible > limit {
            return Err(AppError::Validation(format!(
                "note body is {visible} characters; the limit is {limit}"
            )));
        }

        let mentions = self.resolve_mentions(body).await;

        let note_id = self.id_gen.generate();
        let object_uri = format!("https://{}/notes/{note_id}", self.config.local_domain);
        let note = self
            .notes
            .create(note::ActiveModel {
                id: Set(note_id),
                author_id: Set(author.id.clone()),
                body: Set(body.to_string()),
                visibility: Set(visibility),
                in_reply_to_uri: Set(in_reply_to_uri.clone()),
                object_uri: Set(object_uri),
                reply_count: Set(0),
                like_count: Set(0),
                boost_count: Set(0),
                created_at: Set(Utc::now()),
                edited_at: Set(None),
            })
            .await?;

        // A local reply counts against its parent and notifies a local
        // parent author.
        if let Some(parent_uri) = &in_reply_to_uri {
            self.engagement.increment_reply_count(parent_uri).await?;
            if let Some(parent) = self.notes.find_by_uri(parent_uri).await?
                && parent.author_id != author.id
            {
                self.notifier
                    .notify(
                        &parent.author_id,
                        NotificationKind::Reply,
                        &NotifyActor::from(author),
                        NotifyNote::local(&note.id, &note.object_uri, &note.body),
                    )
                    .await?;
            }
        }

        // Local mentions notify even when federation is off.
        for mention in &mentions {
            if let Some(local) = &mention.local_account
                && local.id != author.id
            {
                self.notifier
                    .notify(
                        &local.id,
                        NotificationKind::Mention,
                        &NotifyActor::from(author),
                        NotifyNote::local(&note.id, &note.object_uri, &note.body),
                    )
                    .await?;
            }
        }

        if !self.config.enabled {
            debug!("Federation disabled; note stored without deliveries");
            return Ok(note);
        }

        let activity = self.build_create_activity(author, &note, &mentions);
        let recipients = self
            .collect_recipients(author, visibility, in_reply_to_uri.as_deref(), &mentions)
            .await?;
        self.enqueue_all(&recipients, &activity).await?;

        info!(
            note = %note.id,
            recipients = recipients.len(),
            "Note published"
        );
        Ok(note)
    }

    /// Federate an edit of an existing note.
    pub async fn publish_update(
        &self,
        author: &account::Model,
        note_id: &str,
        new_body: &str,
    ) -> AppResult<note::Model> {
        let existing = self.notes.get_by_id(note_id).await?;
        if existing.author_id != author.id {
            return Err(AppError::AuthorizationDenied(
                "note belongs to another account".to_string(),
            ));
        }

        let limit = self.config.note_char_limit();
        let visible = starling_markup::visible_length(new_body);
        if visible == 0 || visible > limit {
            return Err(AppError::Validation(format!(
                "note body is {visible} characters; the limit is {limit}"
            )));
        }

        let note = self
            .notes
            .update_body(note_id, new_body.to_string(), Utc::now())
            .await?;

        if !self.config.enabled {
            return Ok(note);
        }

        let mentions = self.resolve_mentions(&note.body).await;
        let object = self.build_note_object(author, &note, &mentions);
        let (to, cc) = self.addressing(author, note.visibility, &mentions);
        let activity = json!({
            "@context": self.context_for(&note.body),
            "id": self.mint_activity_uri(),
            "type": "Update",
            "actor": self.actor_uri(&author.username),
            "published": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": to,
            "cc": cc,
            "object": object,
        });

        let recipients = self
            .collect_recipients(author, note.visibility, note.in_reply_to_uri.as_deref(), &mentions)
            .await?;
        self.enqueue_all(&recipients, &activity).await?;
        Ok(note)
    }

    /// Delete a note and federate a Tombstone to its audience.
    pub async fn publish_delete(&self, author: &account::Model, note_id: &str) -> AppResult<()> {
        let note = self.notes.get_by_id(note_id).await?;
        if note.author_id != author.id {
            return Err(AppError::AuthorizationDenied(
                "note belongs to another account".to_string(),
            ));
        }

        if let Some(parent_uri) = &note.in_reply_to_uri {
            self.engagement.decrement_reply_count(parent_uri).await?;
        }
        self.notes.delete(note_id).await?;

        if !self.config.enabled {
            return Ok(());
        }

        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": self.mint_activity_uri(),
            "type": "Delete",
            "actor": self.actor_uri(&author.username),
            "to": [PUBLIC],
            "object": {
                "id": note.object_uri,
                "type": "Tombstone",
            },
        });

        let recipients = self
            .collect_recipients(author, note.visibility, None, &[])
            .await?;
        self.enqueue_all(&recipients, &activity).await?;
        Ok(())
    }

    // === Follows ===

    /// Follow a remote actor. The edge stays `accepted = false` until the
    /// remote Accept arrives.
    pub async fn send_follow(
        &self,
        local: &account::Model,
        target: &remote_actor::Model,
    ) -> AppResult<follow::Model> {
        if target.actor_uri == self.actor_uri(&local.username) {
            return Err(AppError::SelfFollowNotAllowed);
        }

        if let Some(existing) = self.follows.find_by_pair(&local.id, &target.id).await? {
            return Err(if existing.accepted {
                AppError::AlreadyFollowing
            } else {
                AppError::FollowPending
            });
        }

        let follow_uri = self.mint_activity_uri();
        let edge = self
            .follows
            .create(follow::ActiveModel {
                id: Set(self.id_gen.generate()),
                follower_id: Set(local.id.clone()),
                target_id: Set(target.id.clone()),
                uri: Set(follow_uri.clone()),
                accepted: Set(false),
                is_local: Set(true),
                created_at: Set(Utc::now()),
            })
            .await?;

        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": follow_uri,
            "type": "Follow",
            "actor": self.actor_uri(&local.username),
            "object": target.actor_uri,
        });
        self.enqueue_one(&target.inbox_uri, &activity).await?;

        Ok(edge)
    }

    /// Retract a follow; the Undo references the original Follow URI.
    pub async fn send_undo_follow(
        &self,
        local: &account::Model,
        target: &remote_actor::Model,
    ) -> AppResult<()> {
        let edge = self
            .follows
            .find_by_pair(&local.id, &target.id)
            .await?
            .ok_or_else(|| AppError::NotFound("follow".to_string()))?;

        let actor_uri = self.actor_uri(&local.username);
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": self.mint_activity_uri(),
            "type": "Undo",
            "actor": actor_uri,
            "object": {
                "id": edge.uri,
                "type": "Follow",
                "actor": actor_uri,
                "object": target.actor_uri,
            },
        });
        self.enqueue_one(&target.inbox_uri, &activity).await?;
        self.follows.delete_by_pair(&local.id, &target.id).await?;
        Ok(())
    }

    /// Answer an incoming Follow with an Accept referencing it verbatim.
    pub async fn send_accept(
        &self,
        local: &account::Model,
        follower: &remote_actor::Model,
        follow_activity: &Value,
    ) -> AppResult<()> {
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": self.mint_activity_uri(),
            "type": "Accept",
            "actor": self.actor_uri(&local.username),
            "object": follow_activity,
        });
        self.enqueue_one(&follower.inbox_uri, &activity).await
    }

    // === Likes ===

    /// Like a note. Likes on locally authored notes stay local; likes on
    /// federated content are delivered to the content's author.
    pub async fn send_like(&self, local: &account::Model, object_uri: &str) -> AppResult<()> {
        let like_uri = self.mint_activity_uri();

        if let Some(note) = self.notes.find_by_uri(object_uri).await? {
            let inserted = self
                .engagement
                .add_like(
                    &local.id,
                    &EngagementTarget::Note(note.id.clone()),
                    &like_uri,
                    Utc::now(),
                )
                .await?;
            if inserted && note.author_id != local.id {
                self.notifier
                    .notify(
                        &note.author_id,
                        NotificationKind::Like,
                        &NotifyActor::from(local),
                        NotifyNote::local(&note.id, &note.object_uri, &note.body),
                    )
                    .await?;
            }
            return Ok(());
        }

        let inserted = self
            .engagement
            .add_like(
                &local.id,
                &EngagementTarget::Object(object_uri.to_string()),
                &like_uri,
                Utc::now(),
            )
            .await?;
        if !inserted || !self.config.enabled {
            return Ok(());
        }

        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": like_uri,
            "type": "Like",
            "actor": self.actor_uri(&local.username),
            "object": object_uri,
        });
        if let Some(inbox) = self.content_author_inbox(object_uri).await? {
            self.enqueue_one(&inbox, &activity).await?;
        }
        Ok(())
    }

    /// Retract a like; the Undo references the original Like URI.
    pub async fn send_undo_like(&self, local: &account::Model, object_uri: &str) -> AppResult<()> {
        let target = match self.notes.find_by_uri(object_uri).await? {
            Some(note) => EngagementTarget::Note(note.id),
            None => EngagementTarget::Object(object_uri.to_string()),
        };
        let row = self
            .engagement
            .find_like(&local.id, &target)
            .await?
            .ok_or_else(|| AppError::NotFound("like".to_string()))?;
        let like_uri = row.uri.clone();
        let was_remote = row.object_uri.is_some();
        self.engagement.remove_like(row).await?;

        if !was_remote || !self.config.enabled {
            return Ok(());
        }

        let actor_uri = self.actor_uri(&local.username);
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": self.mint_activity_uri(),
            "type": "Undo",
            "actor": actor_uri,
            "object": {
                "id": like_uri,
                "type": "Like",
                "actor": actor_uri,
                "object": object_uri,
            },
        });
        if let Some(inbox) = self.content_author_inbox(object_uri).await? {
            self.enqueue_one(&inbox, &activity).await?;
        }
        Ok(())
    }

    // === Boosts ===

    /// Boost a note: persist the row, then Announce to followers and (for
    /// federated content) the content's author.
    pub async fn send_boost(&self, local: &account::Model, object_uri: &str) -> AppResult<()> {
        let boost_uri = self.mint_activity_uri();
        let (target, local_note) = match self.notes.find_by_uri(object_uri).await? {
            Some(note) => (EngagementTarget::Note(note.id.clone()), Some(note)),
            None => (EngagementTarget::Object(object_uri.to_string()), None),
        };

        let inserted = self
            .engagement
            .add_boost(&local.id, &target, &boost_uri, Utc::now())
            .await?;
        if !inserted {
            return Ok(());
        }

        if let Some(note) = &local_note
            && note.author_id != local.id
        {
            self.notifier
                .notify(
                    &note.author_id,
                    NotificationKind::Boost,
                    &NotifyActor::from(local),
                    NotifyNote::local(&note.id, &note.object_uri, &note.body),
                )
                .await?;
        }

        if !self.config.enabled {
            return Ok(());
        }

        let actor_uri = self.actor_uri(&local.username);
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": boost_uri,
            "type": "Announce",
            "actor": actor_uri,
            "published": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": [PUBLIC],
            "cc": [self.followers_uri(&local.username)],
            "object": object_uri,
        });

        let mut inboxes = self.follower_inboxes(local).await?;
        if local_note.is_none()
            && let Some(inbox) = self.content_author_inbox(object_uri).await?
        {
            inboxes.insert(inbox);
        }
        self.enqueue_all(&inboxes, &activity).await?;
        Ok(())
    }

    /// Retract a boost; the Undo references the original Announce URI.
    pub async fn send_undo_boost(&self, local: &account::Model, object_uri: &str) -> AppResult<()> {
        let (target, local_note) = match self.notes.find_by_uri(object_uri).await? {
            Some(note) => (EngagementTarget::Note(note.id.clone()), Some(note)),
            None => (EngagementTarget::Object(object_uri.to_string()), None),
        };
        let row = self
            .engagement
            .find_boost(&local.id, &target)
            .await?
            .ok_or_else(|| AppError::NotFound("boost".to_string()))?;
        let boost_uri = row.uri.clone();
        self.engagement.remove_boost(row).await?;

        if !self.config.enabled {
            return Ok(());
        }

        let actor_uri = self.actor_uri(&local.username);
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": self.mint_activity_uri(),
            "type": "Undo",
            "actor": actor_uri,
            "object": {
                "id": boost_uri,
                "type": "Announce",
                "actor": actor_uri,
                "object": object_uri,
            },
        });

        let mut inboxes = self.follower_inboxes(local).await?;
        if local_note.is_none()
            && let Some(inbox) = self.content_author_inbox(object_uri).await?
        {
            inboxes.insert(inbox);
        }
        self.enqueue_all(&inboxes, &activity).await?;
        Ok(())
    }

    // === Delivery enqueueing ===

    /// Enqueue one activity to one inbox.
    pub async fn enqueue_one(&self, inbox_uri: &str, activity: &Value) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let mut set = BTreeSet::new();
        set.insert(inbox_uri.to_string());
        self.enqueue_all(&set, activity).await
    }

    async fn enqueue_all(&self, inboxes: &BTreeSet<String>, activity: &Value) -> AppResult<()> {
        if inboxes.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let items = inboxes
            .iter()
            .map(|inbox| delivery_item::ActiveModel {
                id: Set(self.id_gen.generate()),
                inbox_uri: Set(inbox.clone()),
                activity_json: Set(activity.clone()),
                attempts: Set(0),
                next_retry_at: Set(now),
                created_at: Set(now),
            })
            .collect();
        self.deliveries.enqueue_many(items).await
    }

    // === Assembly helpers ===

    fn context_for(&self, body: &str) -> Value {
        if starling_markup::extract_hashtags(body).is_empty() {
            json!(ACTIVITYSTREAMS_CONTEXT)
        } else {
            json!([ACTIVITYSTREAMS_CONTEXT, {"Hashtag": "as:Hashtag"}])
        }
    }

    fn build_note_object(
        &self,
        author: &account::Model,
        note: &note::Model,
        mentions: &[ResolvedMention],
    ) -> Value {
        let mention_links: Vec<MentionLink> = mentions
            .iter()
            .map(|m| MentionLink {
                acct: m.acct.clone(),
                href: m.href.clone(),
            })
            .collect();
        let content =
            starling_markup::render_html(&note.body, &self.config.local_domain, &mention_links);

        let mut tags: Vec<Value> = mentions
            .iter()
            .map(|m| {
                json!({
                    "type": "Mention",
                    "href": m.href,
                    "name": format!("@{}", m.acct),
                })
            })
            .collect();
        for tag in starling_markup::extract_hashtags(&note.body) {
            tags.push(json!({
                "type": "Hashtag",
                "href": format!("https://{}/tags/{tag}", self.config.local_domain),
                "name": format!("#{tag}"),
            }));
        }

        let (to, cc) = self.addressing(author, note.visibility, mentions);
        let mut object = json!({
            "id": note.object_uri,
            "type": "Note",
            "attributedTo": self.actor_uri(&author.username),
            "content": content,
            "mediaType": "text/html",
            "published": note.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": to,
            "cc": cc,
            "tag": tags,
        });
        if let Some(parent) = &note.in_reply_to_uri {
            object["inReplyTo"] = json!(parent);
        }
        if let Some(edited) = &note.edited_at {
            object["updated"] = json!(edited.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        object
    }

    fn build_create_activity(
        &self,
        author: &account::Model,
        note: &note::Model,
        mentions: &[ResolvedMention],
    ) -> Value {
        let object = self.build_note_object(author, note, mentions);
        let (to, cc) = self.addressing(author, note.visibility, mentions);
        json!({
            "@context": self.context_for(&note.body),
            "id": self.mint_activity_uri(),
            "type": "Create",
            "actor": self.actor_uri(&author.username),
            "published": note.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": to,
            "cc": cc,
            "object": object,
        })
    }

    /// `to`/`cc` per visibility. Mentioned actors ride in `cc` except for
    /// direct notes, where they are the only `to`.
    fn addressing(
        &self,
        author: &account::Model,
        visibility: Visibility,
        mentions: &[ResolvedMention],
    ) -> (Vec<String>, Vec<String>) {
        let followers = self.followers_uri(&author.username);
        let mention_uris: Vec<String> = mentions.iter().map(|m| m.href.clone()).collect();

        match visibility {
            Visibility::Public => {
                let mut cc = vec![followers];
                cc.extend(mention_uris);
                (vec![PUBLIC.to_string()], cc)
            }
            Visibility::Unlisted => {
                let mut cc = vec![PUBLIC.to_string()];
                cc.extend(mention_uris);
                (vec![followers], cc)
            }
            Visibility::Followers => (vec![followers], mention_uris),
            Visibility::Direct => (mention_uris, vec![]),
        }
    }

    /// Rebuild a note's object for display (actor document, outbox pages,
    /// `/notes/{id}`). Mentions resolve against local accounts and the
    /// actor cache only; nothing here touches the network.
    pub async fn note_object_for_display(
        &self,
        author: &account::Model,
        note: &note::Model,
    ) -> AppResult<Value> {
        let mut mentions = Vec::new();
        for mention in starling_markup::extract_mentions(&note.body) {
            match &mention.domain {
                None => {
                    if let Some(local) = self.accounts.find_by_username(&mention.username).await? {
                        mentions.push(ResolvedMention {
                            acct: mention.acct(),
                            href: self.actor_uri(&local.username),
                            inbox: None,
                            local_account: Some(local),
                        });
                    }
                }
                Some(domain) => {
                    if let Some(cached) = self
                        .remote_actors
                        .find_by_username_domain(&mention.username, domain)
                        .await?
                    {
                        mentions.push(ResolvedMention {
                            acct: mention.acct(),
                            href: cached.actor_uri,
                            inbox: None,
                            local_account: None,
                        });
                    }
                }
            }
        }
        Ok(self.build_note_object(author, note, &mentions))
    }

    /// Wrap a note object in the Create activity shown on outbox pages.
    #[must_use]
    pub fn wrap_in_create(
        &self,
        author: &account::Model,
        note: &note::Model,
        object: Value,
    ) -> Value {
        let (to, cc) = self.addressing(author, note.visibility, &[]);
        json!({
            "id": format!("{}/activity", note.object_uri),
            "type": "Create",
            "actor": self.actor_uri(&author.username),
            "published": note.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "to": to,
            "cc": cc,
            "object": object,
        })
    }

    /// Resolve mentions in a body to deliverable targets. Failures skip
    /// the mention; publishing never fails on an unresolvable recipient.
    async fn resolve_mentions(&self, body: &str) -> Vec<ResolvedMention> {
        let mut resolved = Vec::new();
        for mention in starling_markup::extract_mentions(body) {
            match self.resolve_mention(&mention).await {
                Ok(Some(target)) => resolved.push(target),
                Ok(None) => debug!(acct = %mention.acct(), "Mention does not resolve locally"),
                Err(err) => {
                    warn!(acct = %mention.acct(), error = %err, "Skipping unresolvable mention");
                }
            }
        }
        resolved
    }

    async fn resolve_mention(&self, mention: &MentionRef) -> AppResult<Option<ResolvedMention>> {
        match &mention.domain {
            None => {
                let Some(local) = self.accounts.find_by_username(&mention.username).await? else {
                    return Ok(None);
                };
                Ok(Some(ResolvedMention {
                    acct: mention.acct(),
                    href: self.actor_uri(&local.username),
                    inbox: None,
                    local_account: Some(local),
                }))
            }
            Some(domain) if *domain == self.config.local_domain => {
                let Some(local) = self.accounts.find_by_username(&mention.username).await? else {
                    return Ok(None);
                };
                Ok(Some(ResolvedMention {
                    acct: mention.acct(),
                    href: self.actor_uri(&local.username),
                    inbox: None,
                    local_account: Some(local),
                }))
            }
            Some(domain) => {
                let actor = self.resolver.resolve_actor(&mention.username, domain).await?;
                Ok(Some(ResolvedMention {
                    acct: mention.acct(),
                    href: actor.actor_uri.clone(),
                    inbox: Some(
                        actor
                            .shared_inbox_uri
                            .clone()
                            .unwrap_or_else(|| actor.inbox_uri.clone()),
                    ),
                    local_account: None,
                }))
            }
        }
    }

    /// Inboxes of all remote followers, shared inbox preferred.
    async fn follower_inboxes(&self, author: &account::Model) -> AppResult<BTreeSet<String>> {
        let edges = self.follows.followers_of(&author.id).await?;
        let follower_ids: Vec<String> = edges.into_iter().map(|e| e.follower_id).collect();
        let actors = self.remote_actors.find_by_ids(&follower_ids).await?;
        Ok(actors
            .into_iter()
            .map(|actor| actor.shared_inbox_uri.unwrap_or(actor.inbox_uri))
            .collect())
    }

    /// The inbox of whoever authored the federated content at
    /// `object_uri`, when we can determine it.
    async fn content_author_inbox(&self, object_uri: &str) -> AppResult<Option<String>> {
        let Some(activity) = self.activities.find_create_by_object_uri(object_uri).await? else {
            debug!(object_uri, "No cached content for engagement target");
            return Ok(None);
        };
        let author_uri = activity
            .raw_json
            .get("attributedTo")
            .and_then(Value::as_str)
            .map_or_else(|| activity.actor_uri.clone(), String::from);
        match self.resolver.get_or_fetch(&author_uri).await {
            Ok(actor) => Ok(Some(actor.inbox_uri)),
            Err(err) => {
                warn!(object_uri, error = %err, "Skipping unresolvable content author");
                Ok(None)
            }
        }
    }

    /// The full recipient set for a note activity.
    async fn collect_recipients(
        &self,
        author: &account::Model,
        visibility: Visibility,
        in_reply_to_uri: Option<&str>,
        mentions: &[ResolvedMention],
    ) -> AppResult<BTreeSet<String>> {
        let mut inboxes = BTreeSet::new();

        if visibility == Visibility::Direct {
            // Direct notes go to mentioned actors only.
            for mention in mentions {
                if let Some(inbox) = &mention.inbox {
                    inboxes.insert(inbox.clone());
                }
            }
            return Ok(inboxes);
        }

        inboxes.extend(self.follower_inboxes(author).await?);

        if let Some(parent_uri) = in_reply_to_uri
            && self.notes.find_by_uri(parent_uri).await?.is_none()
            && let Some(inbox) = self.content_author_inbox(parent_uri).await?
        {
            inboxes.insert(inbox);
        }

        for mention in mentions {
            if let Some(inbox) = &mention.inbox {
                inboxes.insert(inbox.clone());
            }
        }

        if visibility == Visibility::Public {
            for relay in self.relays.list_active().await? {
                if !relay.paused {
                    inboxes.insert(relay.inbox_uri);
                }
            }
        }

        Ok(inboxes)
    }
}
