//! End-to-end inbox pipeline tests: signed requests against in-memory
//! storage with a fake transport.

#![allow(clippy::unwrap_used)]

mod common;

use common::{LOCAL_DOMAIN, TestServer, test_keypair};
use serde_json::json;
use starling_common::AppError;
use starling_db::entities::note::Visibility;
use starling_db::entities::notification::NotificationKind;
use starling_federation::inbox::{InboxOutcome, MAX_INBOX_BODY_BYTES};

#[tokio::test]
async fn remote_follow_creates_edge_notification_and_accept() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    let follow = json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": "https://m.example/activities/follow-1",
        "type": "Follow",
        "actor": bob_uri,
        "object": format!("https://{LOCAL_DOMAIN}/users/alice"),
    });

    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &follow,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);

    // The follow edge exists, auto-accepted, keyed by the cached actor.
    let bob = server.remote_actors.find_by_uri(&bob_uri).await.unwrap().unwrap();
    let edge = server
        .follows
        .find_by_pair(&bob.id, &alice.id)
        .await
        .unwrap()
        .unwrap();
    assert!(edge.accepted);
    assert!(!edge.is_local);
    assert_eq!(edge.uri, "https://m.example/activities/follow-1");

    // One follow notification for alice.
    let notifications = server
        .notifications
        .list_for_recipient(&alice.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Follow);
    assert_eq!(notifications[0].actor_username, "bob");
    assert_eq!(notifications[0].actor_domain.as_deref(), Some("m.example"));

    // One queued Accept addressed to bob's inbox, referencing the Follow.
    let queued = server.deliveries.list_all().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].inbox_uri, format!("{bob_uri}/inbox"));
    assert_eq!(queued[0].activity_json["type"], "Accept");
    assert_eq!(
        queued[0].activity_json["object"]["id"],
        "https://m.example/activities/follow-1"
    );
    assert_eq!(
        queued[0].activity_json["actor"],
        format!("https://{LOCAL_DOMAIN}/users/alice")
    );
}

#[tokio::test]
async fn duplicate_inbox_replay_has_no_side_effects() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    let follow = json!({
        "id": "https://m.example/activities/follow-1",
        "type": "Follow",
        "actor": bob_uri,
        "object": format!("https://{LOCAL_DOMAIN}/users/alice"),
    });
    let key_id = format!("{bob_uri}#main-key");

    let first = server
        .signed_inbox_post("/users/alice/inbox", Some("alice"), &follow, &bob_key.private_pem, &key_id)
        .await
        .unwrap();
    assert_eq!(first, InboxOutcome::Processed);

    let replay = server
        .signed_inbox_post("/users/alice/inbox", Some("alice"), &follow, &bob_key.private_pem, &key_id)
        .await
        .unwrap();
    assert_eq!(replay, InboxOutcome::Duplicate);

    // Exactly one of everything.
    let notifications = server
        .notifications
        .list_for_recipient(&alice.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(server.deliveries.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn like_notifies_and_undo_respects_ownership() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;
    let note = server
        .outbox
        .publish_create(&alice, "hello world", Visibility::Public, None)
        .await
        .unwrap();

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);
    let carol_key = test_keypair();
    let carol_uri = server.install_remote_actor("carol", "m.example", &carol_key.public_pem, false);

    let like = json!({
        "id": "https://m.example/activities/like-1",
        "type": "Like",
        "actor": bob_uri,
        "object": note.object_uri,
    });
    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &like,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);
    assert_eq!(server.notes.get_by_id(&note.id).await.unwrap().like_count, 1);

    // Carol cannot undo bob's like.
    let forged_undo = json!({
        "id": "https://m.example/activities/undo-forged",
        "type": "Undo",
        "actor": carol_uri,
        "object": {
            "id": "https://m.example/activities/like-1",
            "type": "Like",
            "actor": bob_uri,
            "object": note.object_uri,
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &forged_undo,
            &carol_key.private_pem,
            &format!("{carol_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Rejected);
    assert_eq!(server.notes.get_by_id(&note.id).await.unwrap().like_count, 1);

    // Bob can.
    let undo = json!({
        "id": "https://m.example/activities/undo-1",
        "type": "Undo",
        "actor": bob_uri,
        "object": {
            "id": "https://m.example/activities/like-1",
            "type": "Like",
            "actor": bob_uri,
            "object": note.object_uri,
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &undo,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);
    assert_eq!(server.notes.get_by_id(&note.id).await.unwrap().like_count, 0);
}

#[tokio::test]
async fn relay_announce_stored_as_create_and_paused_relay_drops() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;

    let relay_key = test_keypair();
    let relay_uri = server.install_relay_actor("relay.fedi.example", &relay_key.public_pem);

    let record = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();
    server
        .relay_controller
        .accept_from_relay(&url::Url::parse(&relay_uri).unwrap())
        .await
        .unwrap();

    // Announce signed by the relay, acting as a per-tag sub-actor, with
    // an embedded note by a third party.
    let announce = json!({
        "id": "https://relay.fedi.example/activities/a-1",
        "type": "Announce",
        "actor": "https://relay.fedi.example/tag/music",
        "object": {
            "id": "https://m.example/notes/7",
            "type": "Note",
            "attributedTo": "https://m.example/users/alice",
            "content": "<p>#music</p>",
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/inbox",
            None,
            &announce,
            &relay_key.private_pem,
            &format!("{relay_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);

    let stored = server
        .activities
        .find_by_uri("https://relay.fedi.example/activities/a-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.activity_type, "Create");
    assert_eq!(stored.object_uri.as_deref(), Some("https://m.example/notes/7"));
    assert!(stored.from_relay);

    // Paused relay: the same shape is dropped before any row is written.
    server.relay_controller.pause(&record.id).await.unwrap();
    let announce2 = json!({
        "id": "https://relay.fedi.example/activities/a-2",
        "type": "Announce",
        "actor": "https://relay.fedi.example/tag/music",
        "object": {
            "id": "https://m.example/notes/8",
            "type": "Note",
            "attributedTo": "https://m.example/users/alice",
            "content": "<p>#music</p>",
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/inbox",
            None,
            &announce2,
            &relay_key.private_pem,
            &format!("{relay_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Dropped);
    assert!(
        server
            .activities
            .find_by_uri("https://relay.fedi.example/activities/a-2")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn unauthorized_delete_leaves_content_untouched() {
    let server = TestServer::new().await;
    server.create_account("alice").await;

    // Cache a Create by alice@m via a followed author path: store directly.
    let author_key = test_keypair();
    let author_uri = server.install_remote_actor("alice", "m.example", &author_key.public_pem, false);
    let evil_key = test_keypair();
    let evil_uri = server.install_remote_actor("x", "evil.example", &evil_key.public_pem, false);

    use chrono::Utc;
    use sea_orm::ActiveValue::Set;
    server
        .activities
        .insert(starling_db::entities::activity::ActiveModel {
            id: Set("cached-create".to_string()),
            activity_uri: Set("https://m.example/activities/c-7".to_string()),
            activity_type: Set("Create".to_string()),
            actor_uri: Set(author_uri.clone()),
            object_uri: Set(Some("https://m.example/notes/7".to_string())),
            raw_json: Set(json!({"id": "https://m.example/notes/7"})),
            received_at: Set(Utc::now()),
            processed: Set(true),
            from_relay: Set(false),
            reply_count: Set(0),
            like_count: Set(0),
            boost_count: Set(0),
        })
        .await
        .unwrap();

    let delete = json!({
        "id": "https://evil.example/activities/d-1",
        "type": "Delete",
        "actor": evil_uri,
        "object": "https://m.example/notes/7",
    });
    let outcome = server
        .signed_inbox_post(
            "/inbox",
            None,
            &delete,
            &evil_key.private_pem,
            &format!("{evil_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Rejected);

    // Still there.
    assert!(
        server
            .activities
            .find_create_by_object_uri("https://m.example/notes/7")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn reply_from_stranger_accepted_and_counted() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;
    let note = server
        .outbox
        .publish_create(&alice, "original post", Visibility::Public, None)
        .await
        .unwrap();

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    // Bob is a stranger (no follow edge), but the reply targets a locally
    // owned note, so it is kept.
    let create = json!({
        "id": "https://m.example/activities/c-1",
        "type": "Create",
        "actor": bob_uri,
        "object": {
            "id": "https://m.example/notes/reply-1",
            "type": "Note",
            "attributedTo": bob_uri,
            "content": "<p>nice post</p>",
            "inReplyTo": note.object_uri,
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &create,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);

    assert_eq!(server.notes.get_by_id(&note.id).await.unwrap().reply_count, 1);

    let notifications = server
        .notifications
        .list_for_recipient(&alice.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Reply);
    assert_eq!(notifications[0].note_preview.as_deref(), Some("nice post"));
}

#[tokio::test]
async fn mention_in_followed_create_notifies_local_actor() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    // Alice follows bob so his notes are accepted.
    let bob = server.resolver.get_or_fetch(&bob_uri).await.unwrap();
    use chrono::Utc;
    use sea_orm::ActiveValue::Set;
    server
        .follows
        .create(starling_db::entities::follow::ActiveModel {
            id: Set("edge-1".to_string()),
            follower_id: Set(alice.id.clone()),
            target_id: Set(bob.id.clone()),
            uri: Set(format!("https://{LOCAL_DOMAIN}/activities/f-1")),
            accepted: Set(true),
            is_local: Set(true),
            created_at: Set(Utc::now()),
        })
        .await
        .unwrap();

    let create = json!({
        "id": "https://m.example/activities/c-2",
        "type": "Create",
        "actor": bob_uri,
        "object": {
            "id": "https://m.example/notes/2",
            "type": "Note",
            "attributedTo": bob_uri,
            "content": "<p>hi alice</p>",
            "tag": [{
                "type": "Mention",
                "href": format!("https://{LOCAL_DOMAIN}/users/alice"),
                "name": "@alice@local.example",
            }],
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/inbox",
            None,
            &create,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);

    let notifications = server
        .notifications
        .list_for_recipient(&alice.id, 10, 0)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Mention);
}

#[tokio::test]
async fn create_from_stranger_is_dropped() {
    let server = TestServer::new().await;
    server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    let create = json!({
        "id": "https://m.example/activities/c-3",
        "type": "Create",
        "actor": bob_uri,
        "object": {
            "id": "https://m.example/notes/3",
            "type": "Note",
            "attributedTo": bob_uri,
            "content": "<p>unsolicited</p>",
        },
    });
    server
        .signed_inbox_post(
            "/inbox",
            None,
            &create,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();

    // Nothing kept.
    assert!(
        server
            .activities
            .find_by_uri("https://m.example/activities/c-3")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn oversized_body_and_missing_signature_are_rejected() {
    let server = TestServer::new().await;
    server.create_account("alice").await;

    // One byte over the cap.
    let oversized = vec![b' '; MAX_INBOX_BODY_BYTES + 1];
    let err = server
        .inbox
        .handle("/inbox", &std::collections::HashMap::new(), &oversized, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge));

    // No Signature header.
    let body = serde_json::to_vec(&json!({"type": "Follow"})).unwrap();
    let err = server
        .inbox
        .handle("/inbox", &std::collections::HashMap::new(), &body, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SignatureMissing));
}

#[tokio::test]
async fn stale_date_header_is_rejected() {
    let server = TestServer::new().await;
    server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    let follow = json!({
        "id": "https://m.example/activities/follow-2",
        "type": "Follow",
        "actor": bob_uri,
        "object": format!("https://{LOCAL_DOMAIN}/users/alice"),
    });
    let bytes = serde_json::to_vec(&follow).unwrap();

    // Sign with a Date six minutes in the past.
    let stale = std::time::SystemTime::now() - std::time::Duration::from_secs(6 * 60);
    let mut headers = std::collections::HashMap::new();
    headers.insert("host".to_string(), LOCAL_DOMAIN.to_string());
    headers.insert("date".to_string(), httpdate::fmt_http_date(stale));
    headers.insert(
        "digest".to_string(),
        starling_common::calculate_digest(&bytes),
    );
    let key = starling_common::parse_private_key(&bob_key.private_pem).unwrap();
    let signature = starling_common::sign_request(
        &key,
        &format!("{bob_uri}#main-key"),
        "POST",
        "/inbox",
        &headers,
        &["(request-target)", "host", "date", "digest"],
    )
    .unwrap();
    headers.insert("signature".to_string(), signature);

    let err = server
        .inbox
        .handle("/inbox", &headers, &bytes, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SignatureInvalid(_)));
}

#[tokio::test]
async fn accept_flips_outgoing_follow_once() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);
    let bob = server.resolver.get_or_fetch(&bob_uri).await.unwrap();

    let edge = server.outbox.send_follow(&alice, &bob).await.unwrap();
    assert!(!edge.accepted);

    let accept = json!({
        "id": "https://m.example/activities/accept-1",
        "type": "Accept",
        "actor": bob_uri,
        "object": {
            "id": edge.uri,
            "type": "Follow",
            "actor": format!("https://{LOCAL_DOMAIN}/users/alice"),
            "object": bob_uri,
        },
    });
    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &accept,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);

    let edge = server.follows.find_by_uri(&edge.uri).await.unwrap().unwrap();
    assert!(edge.accepted);

    // A duplicate Accept (different activity id) is a no-op.
    let duplicate = json!({
        "id": "https://m.example/activities/accept-2",
        "type": "Accept",
        "actor": bob_uri,
        "object": edge.uri,
    });
    let outcome = server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &duplicate,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);
}

#[tokio::test]
async fn actor_self_delete_cascades_follows() {
    let server = TestServer::new().await;
    let alice = server.create_account("alice").await;

    let bob_key = test_keypair();
    let bob_uri = server.install_remote_actor("bob", "m.example", &bob_key.public_pem, false);

    // Bob follows alice first.
    let follow = json!({
        "id": "https://m.example/activities/follow-3",
        "type": "Follow",
        "actor": bob_uri,
        "object": format!("https://{LOCAL_DOMAIN}/users/alice"),
    });
    server
        .signed_inbox_post(
            "/users/alice/inbox",
            Some("alice"),
            &follow,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();

    let bob = server.remote_actors.find_by_uri(&bob_uri).await.unwrap().unwrap();
    assert!(server.follows.find_by_pair(&bob.id, &alice.id).await.unwrap().is_some());

    let delete = json!({
        "id": "https://m.example/activities/delete-self",
        "type": "Delete",
        "actor": bob_uri,
        "object": bob_uri,
    });
    let outcome = server
        .signed_inbox_post(
            "/inbox",
            None,
            &delete,
            &bob_key.private_pem,
            &format!("{bob_uri}#main-key"),
        )
        .await
        .unwrap();
    assert_eq!(outcome, InboxOutcome::Processed);

    assert!(server.remote_actors.find_by_uri(&bob_uri).await.unwrap().is_none());
    assert!(server.follows.find_by_pair(&bob.id, &alice.id).await.unwrap().is_none());
}
