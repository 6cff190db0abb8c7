//! Outbox assembly tests: addressing, recipient collection, delivery
//! enqueueing.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Utc;
use common::{LOCAL_DOMAIN, TestServer, default_config, test_keypair};
use sea_orm::ActiveValue::Set;
use serde_json::Value;
use starling_common::AppError;
use starling_db::entities::note::Visibility;
use starling_db::entities::{follow, relay};
use starling_federation::PUBLIC;

/// Wire up a remote follower for the account, returning its inbox.
async fn add_remote_follower(
    server: &TestServer,
    target_account_id: &str,
    username: &str,
    domain: &str,
    shared_inbox: bool,
) -> String {
    let key = test_keypair();
    let uri = server.install_remote_actor(username, domain, &key.public_pem, shared_inbox);
    let actor = server.resolver.get_or_fetch(&uri).await.unwrap();
    server
        .follows
        .create(follow::ActiveModel {
            id: Set(format!("edge-{username}-{domain}")),
            follower_id: Set(actor.id.clone()),
            target_id: Set(target_account_id.to_string()),
            uri: Set(format!("https://{domain}/activities/follow-{username}")),
            accepted: Set(true),
            is_local: Set(false),
            created_at: Set(Utc::now()),
        })
        .await
        .unwrap();
    actor.shared_inbox_uri.unwrap_or(actor.inbox_uri)
}

async fn add_active_relay(server: &TestServer, domain: &str, paused: bool) -> relay::Model {
    server
        .relays
        .create(relay::ActiveModel {
            id: Set(format!("relay-{domain}")),
            actor_uri: Set(format!("https://{domain}/actor")),
            inbox_uri: Set(format!("https://{domain}/inbox")),
            follow_uri: Set(format!("https://{LOCAL_DOMAIN}/activities/rf-{domain}")),
            name: Set(domain.to_string()),
            status: Set(relay::RelayStatus::Active),
            paused: Set(paused),
            created_at: Set(Utc::now()),
            accepted_at: Set(Some(Utc::now())),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn public_note_with_mention_reaches_followers_mention_and_relays() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let carol_inbox = add_remote_follower(&server, &alice.id, "carol", "m.example", true).await;
    add_active_relay(&server, "relay.fedi.example", false).await;
    add_active_relay(&server, "paused.relay.example", true).await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    let note = server
        .outbox
        .publish_create(&alice, "hi @bob@m.example", Visibility::Public, None)
        .await
        .unwrap();

    assert_eq!(note.visibility, Visibility::Public);
    assert!(note
        .object_uri
        .starts_with(&format!("https://{LOCAL_DOMAIN}/notes/")));

    let queued = server.deliveries.list_all().await.unwrap();
    let inboxes: Vec<&str> = queued.iter().map(|i| i.inbox_uri.as_str()).collect();

    // Follower (shared inbox), mentioned actor, active relay. The paused
    // relay is excluded.
    assert!(inboxes.contains(&carol_inbox.as_str()));
    assert!(inboxes.contains(&format!("{bob_uri}/inbox").as_str()));
    assert!(inboxes.contains(&"https://relay.fedi.example/inbox"));
    assert!(!inboxes.contains(&"https://paused.relay.example/inbox"));
    assert_eq!(queued.len(), 3);

    // All items carry the same Create envelope.
    let activity = &queued[0].activity_json;
    assert_eq!(activity["type"], "Create");
    assert_eq!(activity["to"], serde_json::json!([PUBLIC]));
    let cc: Vec<String> = activity["cc"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(cc.contains(&format!("https://{LOCAL_DOMAIN}/users/alice/followers")));
    assert!(cc.contains(&bob_uri));

    // The object carries the mention tag and h-card content.
    let tags = activity["object"]["tag"].as_array().unwrap();
    assert!(tags.iter().any(|tag| {
        tag["type"] == "Mention" && tag["href"] == Value::String(bob_uri.clone())
    }));
    let content = activity["object"]["content"].as_str().unwrap();
    assert!(content.contains("class=\"u-url mention\""));
}

#[tokio::test]
async fn direct_note_reaches_mentioned_actor_only() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    add_remote_follower(&server, &alice.id, "carol", "m.example", true).await;
    add_active_relay(&server, "relay.fedi.example", false).await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    server
        .outbox
        .publish_create(&alice, "psst @bob@m.example", Visibility::Direct, None)
        .await
        .unwrap();

    let queued = server.deliveries.list_all().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].inbox_uri, format!("{bob_uri}/inbox"));

    let activity = &queued[0].activity_json;
    assert_eq!(activity["to"], serde_json::json!([bob_uri]));
    assert_eq!(activity["cc"], serde_json::json!([]));
}

#[tokio::test]
async fn followers_note_skips_relays() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let carol_inbox = add_remote_follower(&server, &alice.id, "carol", "m.example", true).await;
    add_active_relay(&server, "relay.fedi.example", false).await;

    server
        .outbox
        .publish_create(&alice, "followers only", Visibility::Followers, None)
        .await
        .unwrap();

    let queued = server.deliveries.list_all().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].inbox_uri, carol_inbox);
    assert_eq!(
        queued[0].activity_json["to"],
        serde_json::json!([format!("https://{LOCAL_DOMAIN}/users/alice/followers")])
    );
}

#[tokio::test]
async fn reply_to_remote_note_reaches_parent_author() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    // Cache bob's note as received content.
    server
        .activities
        .insert(starling_db::entities::activity::ActiveModel {
            id: Set("cached-1".to_string()),
            activity_uri: Set("https://m.example/activities/c-1".to_string()),
            activity_type: Set("Create".to_string()),
            actor_uri: Set(bob_uri.clone()),
            object_uri: Set(Some("https://m.example/notes/1".to_string())),
            raw_json: Set(serde_json::json!({
                "id": "https://m.example/notes/1",
                "attributedTo": bob_uri,
            })),
            received_at: Set(Utc::now()),
            processed: Set(true),
            from_relay: Set(false),
            reply_count: Set(0),
            like_count: Set(0),
            boost_count: Set(0),
        })
        .await
        .unwrap();

    server
        .outbox
        .publish_create(
            &alice,
            "replying to you",
            Visibility::Public,
            Some("https://m.example/notes/1".to_string()),
        )
        .await
        .unwrap();

    // Parent's cached counter incremented.
    let cached = server.activities.find_by_id("cached-1").await.unwrap().unwrap();
    assert_eq!(cached.reply_count, 1);

    // Delivery addressed to bob's inbox, object carries inReplyTo.
    let queued = server.deliveries.list_all().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].inbox_uri, format!("{bob_uri}/inbox"));
    assert_eq!(
        queued[0].activity_json["object"]["inReplyTo"],
        "https://m.example/notes/1"
    );
}

#[tokio::test]
async fn note_length_is_validated() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let too_long = "x".repeat(151);
    let err = server
        .outbox
        .publish_create(&alice, &too_long, Visibility::Public, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Link URLs do not count against the limit.
    let with_link = format!(
        "{} [link]({})",
        "x".repeat(140),
        "https://example.com/a/very/long/path/that/would/exceed/the/limit"
    );
    server
        .outbox
        .publish_create(&alice, &with_link, Visibility::Public, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    // A remote actor record that is actually alice herself.
    let key = test_keypair();
    let uri = format!("https://{LOCAL_DOMAIN}/users/alice");
    server.transport.insert_response(
        &uri,
        serde_json::json!({
            "id": uri,
            "type": "Person",
            "preferredUsername": "alice",
            "inbox": format!("{uri}/inbox"),
            "publicKey": {"publicKeyPem": key.public_pem},
        }),
    );
    let self_actor = server.resolver.get_or_fetch(&uri).await.unwrap();

    let err = server.outbox.send_follow(&alice, &self_actor).await.unwrap_err();
    assert!(matches!(err, AppError::SelfFollowNotAllowed));
}

#[tokio::test]
async fn follow_twice_reports_state() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);
    let bob = server.resolver.get_or_fetch(&bob_uri).await.unwrap();

    let edge = server.outbox.send_follow(&alice, &bob).await.unwrap();

    // Still pending: FollowPending.
    let err = server.outbox.send_follow(&alice, &bob).await.unwrap_err();
    assert!(matches!(err, AppError::FollowPending));

    server.follows.accept_by_uri(&edge.uri).await.unwrap();
    let err = server.outbox.send_follow(&alice, &bob).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyFollowing));
}

#[tokio::test]
async fn undo_follow_references_original_uri() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);
    let bob = server.resolver.get_or_fetch(&bob_uri).await.unwrap();

    let edge = server.outbox.send_follow(&alice, &bob).await.unwrap();
    server.outbox.send_undo_follow(&alice, &bob).await.unwrap();

    let queued = server.deliveries.list_all().await.unwrap();
    let undo = queued
        .iter()
        .find(|item| item.activity_json["type"] == "Undo")
        .unwrap();
    assert_eq!(undo.activity_json["object"]["id"], Value::String(edge.uri.clone()));
    assert!(
        server
            .follows
            .find_by_uri(&edge.uri)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn local_likes_are_not_federated() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;
    let carol = server.create_account("carol").await;

    let note = server
        .outbox
        .publish_create(&alice, "like me", Visibility::Public, None)
        .await
        .unwrap();
    server.transport.clear_posts();

    server.outbox.send_like(&carol, &note.object_uri).await.unwrap();

    // Counter moved, author notified, nothing queued.
    assert_eq!(server.notes.get_by_id(&note.id).await.unwrap().like_count, 1);
    let notifications = server
        .notifications
        .list_for_recipient(&alice.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(server.deliveries.list_all().await.unwrap().len(), 0);
}

#[tokio::test]
async fn federation_disabled_stores_but_never_queues() {
    let mut config = default_config();
    config.enabled = false;
    let server = TestServer::with_config(config).await;
    let alice = server.create_account("alice").await;

    add_remote_follower(&server, &alice.id, "carol", "m.example", true).await;

    server
        .outbox
        .publish_create(&alice, "quiet note", Visibility::Public, None)
        .await
        .unwrap();

    assert_eq!(server.notes.count_public_by_author(&alice.id).await.unwrap(), 1);
    assert_eq!(server.deliveries.list_all().await.unwrap().len(), 0);
}
