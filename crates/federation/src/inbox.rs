//! The inbox pipeline.
//!
//! Every incoming POST runs the same phases: size cap, signature
//! presence, envelope parse, signer resolution, signature verification,
//! relay gating, deduplicating persistence, dispatch, and processed
//! marking. Duplicate deliveries and denied mutations are answered 202
//! without side effects.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use serde_json::Value;
use starling_common::{
    AppError, AppResult, HttpSignature, IdGenerator, actor_uri_from_key_id,
    config::FederationConfig, verify_date_skew, verify_digest, verify_signature,
};
use starling_db::entities::{activity, remote_actor};
use starling_db::repositories::{
    AccountRepository, ActivityRepository, EngagementRepository, FollowRepository, NoteRepository,
    RemoteActorRepository,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::IncomingActivity;
use crate::client::ApClient;
use crate::notify::Notifier;
use crate::outbox::OutboxService;
use crate::processor::{
    AcceptProcessor, AnnounceProcessor, CreateProcessor, DeleteProcessor, FollowProcessor,
    LikeProcessor, UndoProcessor, UpdateProcessor,
};
use crate::relay::RelayController;
use crate::resolver::ActorResolver;

/// Inbox request bodies above this size are rejected with 413.
pub const MAX_INBOX_BODY_BYTES: usize = 1_048_576;

/// What the pipeline did with a delivery. Every variant answers 202.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxOutcome {
    /// Dispatched and marked processed.
    Processed,
    /// Replay of an already-processed activity; no side effects.
    Duplicate,
    /// Dropped by relay gating; no side effects.
    Dropped,
    /// The signer was not authorized for the mutation; nothing applied.
    Rejected,
}

/// The inbox processor and its collaborators.
#[derive(Clone)]
pub struct InboxService {
    config: FederationConfig,
    accounts: AccountRepository,
    remote_actors: RemoteActorRepository,
    notes: NoteRepository,
    activities: ActivityRepository,
    follows: FollowRepository,
    engagement: EngagementRepository,
    relays: RelayController,
    resolver: ActorResolver,
    outbox: OutboxService,
    notifier: Notifier,
    client: ApClient,
    id_gen: IdGenerator,
}

impl InboxService {
    #[must_use]
    pub fn new(
        config: FederationConfig,
        accounts: AccountRepository,
        remote_actors: RemoteActorRepository,
        notes: NoteRepository,
        activities: ActivityRepository,
        follows: FollowRepository,
        engagement: EngagementRepository,
        relays: RelayController,
        resolver: ActorResolver,
        outbox: OutboxService,
        notifier: Notifier,
        client: ApClient,
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
            resolver,
            outbox,
            notifier,
            client,
            id_gen: IdGenerator::new(),
        }
    }

    /// Process one inbox delivery.
    ///
    /// `path` is the request path the signature covers; `headers` carries
    /// the request headers with lowercased names; `target_username` is
    /// set for per-user inboxes and absent for the shared inbox.
    pub async fn handle(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
        target_username: Option<&str>,
    ) -> AppResult<InboxOutcome> {
        // Phase 1: size cap.
        if body.len() > MAX_INBOX_BODY_BYTES {
            return Err(AppError::PayloadTooLarge);
        }

        // Phase 2: signature presence.
        let signature_header = headers
            .get("signature")
            .ok_or(AppError::SignatureMissing)?;

        // Phase 3: parse.
        let raw: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Protocol(format!("invalid JSON: {e}")))?;
        let incoming = IncomingActivity::parse(&raw)?;

        info!(
            kind = incoming.kind(),
            actor = %incoming.actor(),
            target = target_username.unwrap_or("(shared)"),
            "Received activity"
        );

        // Phase 4: signer resolution via the key id.
        let signature = HttpSignature::parse(signature_header)?;
        let signer_uri = actor_uri_from_key_id(&signature.key_id);
        let signer = self.resolver.get_or_fetch(&signer_uri).await?;

        // Phase 5: signature verification.
        self.verify_request(&signature, &signer, path, headers, body)?;
        let relay_forward = signer.actor_uri != incoming.actor().as_str();

        // Phase 6: relay gating. Content forwarded by a paused relay is
        // dropped without side effects.
        let signer_url = Url::parse(&signer.actor_uri)
            .map_err(|e| AppError::Protocol(format!("bad signer URI: {e}")))?;
        if relay_forward
            && let Some(relay) = self.relays.find_matching(&signer_url).await?
            && relay.paused
        {
            debug!(relay = %relay.actor_uri, "Paused relay content dropped");
            return Ok(InboxOutcome::Dropped);
        }

        let matched_relay = self.relays.find_subscribed(&signer_url).await?;
        let from_relay = relay_forward && matched_relay.is_some();

        // Phase 7: deduplicating persistence.
        let row = match self
            .activities
            .insert(activity::ActiveModel {
                id: Set(self.id_gen.generate()),
                activity_uri: Set(incoming.id().to_string()),
                activity_type: Set(incoming.kind().to_string()),
                actor_uri: Set(incoming.actor().to_string()),
                object_uri: Set(incoming.object_uri().map(|u| u.to_string())),
                raw_json: Set(raw.clone()),
                received_at: Set(Utc::now()),
                processed: Set(false),
                from_relay: Set(from_relay),
                reply_count: Set(0),
                like_count: Set(0),
                boost_count: Set(0),
            })
            .await
        {
            Ok(row) => row,
            Err(AppError::DuplicateKey(_)) => {
                debug!(activity = %incoming.id(), "Replay of known activity");
                return Ok(InboxOutcome::Duplicate);
            }
            Err(err) => return Err(err),
        };

        // Phase 8: dispatch.
        let dispatched = self
            .dispatch(&incoming, &raw, &signer, relay_forward, matched_relay.as_ref(), &row.id)
            .await;

        match dispatched {
            Ok(()) => {
                // Phase 9: mark processed.
                self.activities.mark_processed(&row.id).await?;
                Ok(InboxOutcome::Processed)
            }
            Err(AppError::AuthorizationDenied(reason)) => {
                // Do not leak the denial; answer as accepted, apply nothing.
                warn!(
                    activity = %incoming.id(),
                    signer = %signer.actor_uri,
                    reason,
                    "Unauthorized activity ignored"
                );
                self.activities.mark_processed(&row.id).await?;
                Ok(InboxOutcome::Rejected)
            }
            Err(err) => Err(err),
        }
    }

    fn verify_request(
        &self,
        signature: &HttpSignature,
        signer: &remote_actor::Model,
        path: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> AppResult<()> {
        let digest = headers
            .get("digest")
            .ok_or_else(|| AppError::SignatureInvalid("missing Digest header".to_string()))?;
        if !verify_digest(body, digest) {
            return Err(AppError::SignatureInvalid("Digest mismatch".to_string()));
        }

        let date = headers
            .get("date")
            .ok_or_else(|| AppError::SignatureInvalid("missing Date header".to_string()))?;
        verify_date_skew(date, Utc::now())?;

        verify_signature(signature, &signer.public_key_pem, "POST", path, headers)?;
        Ok(())
    }

    async fn dispatch(
        &self,
        incoming: &IncomingActivity,
        raw: &Value,
        signer: &remote_actor::Model,
        relay_forward: bool,
        matched_relay: Option<&starling_db::entities::relay::Model>,
        activity_row_id: &str,
    ) -> AppResult<()> {
        match incoming {
            IncomingActivity::Follow(follow) => {
                FollowProcessor::new(
                    self.config.clone(),
                    self.accounts.clone(),
                    self.follows.clone(),
                    self.outbox.clone(),
                    self.notifier.clone(),
                )
                .process(follow, signer, raw)
                .await
            }
            IncomingActivity::Accept(accept) => {
                AcceptProcessor::new(self.follows.clone(), self.relays.clone())
                    .process(accept, signer)
                    .await
            }
            IncomingActivity::Undo(undo) => {
                UndoProcessor::new(self.follows.clone(), self.engagement.clone())
                    .process(undo, signer)
                    .await
            }
            IncomingActivity::Create(create) => {
                CreateProcessor::new(
                    self.config.clone(),
                    self.accounts.clone(),
                    self.notes.clone(),
                    self.activities.clone(),
                    self.follows.clone(),
                    self.engagement.clone(),
                    self.notifier.clone(),
                )
                .process(create, signer, relay_forward, activity_row_id)
                .await
            }
            IncomingActivity::Like(like) => {
                LikeProcessor::new(
                    self.notes.clone(),
                    self.engagement.clone(),
                    self.notifier.clone(),
                )
                .process(like, signer)
                .await
            }
            IncomingActivity::Announce(announce) => {
                AnnounceProcessor::new(
                    self.notes.clone(),
                    self.activities.clone(),
                    self.engagement.clone(),
                    self.notifier.clone(),
                    self.client.clone(),
                )
                .process(announce, signer, matched_relay, activity_row_id)
                .await
            }
            IncomingActivity::Update(update) => {
                UpdateProcessor::new(self.activities.clone(), self.resolver.clone())
                    .process(update, signer, activity_row_id)
                    .await
            }
            IncomingActivity::Delete(delete) => {
                DeleteProcessor::new(self.remote_actors.clone(), self.activities.clone())
                    .process(delete, signer)
                    .await
            }
            IncomingActivity::Unknown { kind, .. } => {
                debug!(kind, "Unknown activity type; accepted and dropped");
                Ok(())
            }
        }
    }
}
