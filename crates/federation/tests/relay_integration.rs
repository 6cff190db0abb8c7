//! Relay subscription state machine tests.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Utc;
use common::{TestServer, test_keypair};
use sea_orm::ActiveValue::Set;
use serde_json::json;
use starling_common::AppError;
use starling_db::entities::relay::RelayStatus;
use starling_federation::PUBLIC;
use url::Url;

#[tokio::test]
async fn subscribe_creates_pending_record_and_follow_of_public() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    let relay_uri = server.install_relay_actor("relay.fedi.example", &key.public_pem);

    let record = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();

    assert_eq!(record.actor_uri, relay_uri);
    assert_eq!(record.status, RelayStatus::Pending);
    assert!(!record.paused);
    assert!(record.accepted_at.is_none());

    let queued = server.deliveries.list_all().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].inbox_uri, "https://relay.fedi.example/inbox");
    let follow = &queued[0].activity_json;
    assert_eq!(follow["type"], "Follow");
    assert_eq!(follow["id"], record.follow_uri);
    assert_eq!(follow["object"], PUBLIC);
    assert_eq!(
        follow["actor"],
        format!("https://{}/users/admin", common::LOCAL_DOMAIN)
    );
}

#[tokio::test]
async fn duplicate_subscribe_reports_state() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    let relay_uri = server.install_relay_actor("relay.fedi.example", &key.public_pem);

    server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();

    let err = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SubscriptionPending));

    server
        .relay_controller
        .accept_from_relay(&Url::parse(&relay_uri).unwrap())
        .await
        .unwrap();

    let err = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadySubscribed));
}

#[tokio::test]
async fn failed_record_is_replaced_on_resubscribe() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    server.install_relay_actor("relay.fedi.example", &key.public_pem);

    let record = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();
    server.relay_controller.mark_failed(&record.id).await.unwrap();

    let replacement = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();
    assert_ne!(replacement.id, record.id);
    assert_eq!(replacement.status, RelayStatus::Pending);
    assert!(server.relays.find_by_id(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn accept_promotes_even_when_paused() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    let relay_uri = server.install_relay_actor("relay.fedi.example", &key.public_pem);

    let record = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();
    server.relay_controller.pause(&record.id).await.unwrap();

    let matched = server
        .relay_controller
        .accept_from_relay(&Url::parse(&relay_uri).unwrap())
        .await
        .unwrap();
    assert!(matched);

    let record = server.relays.get_by_id(&record.id).await.unwrap();
    assert_eq!(record.status, RelayStatus::Active);
    assert!(record.paused);
    assert!(record.accepted_at.is_some());
}

#[tokio::test]
async fn domain_matching_covers_sub_actors() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    let relay_uri = server.install_relay_actor("relay.fedi.example", &key.public_pem);

    server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();
    server
        .relay_controller
        .accept_from_relay(&Url::parse(&relay_uri).unwrap())
        .await
        .unwrap();

    let sub_actor = Url::parse("https://relay.fedi.example/tag/music").unwrap();
    let matched = server.relay_controller.find_subscribed(&sub_actor).await.unwrap();
    assert!(matched.is_some());

    let stranger = Url::parse("https://other.example/actor").unwrap();
    assert!(server.relay_controller.find_subscribed(&stranger).await.unwrap().is_none());
}

#[tokio::test]
async fn unsubscribe_sends_undo_referencing_follow_and_deletes() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    server.install_relay_actor("relay.fedi.example", &key.public_pem);

    let record = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();

    server
        .relay_controller
        .unsubscribe(&admin, &record.id)
        .await
        .unwrap();

    let queued = server.deliveries.list_all().await.unwrap();
    let undo = queued
        .iter()
        .find(|item| item.activity_json["type"] == "Undo")
        .unwrap();
    assert_eq!(undo.activity_json["object"]["id"], record.follow_uri);
    assert_eq!(undo.activity_json["object"]["object"], PUBLIC);

    assert!(server.relays.find_by_id(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn purge_removes_relay_content_by_uri_and_domain() {
    let server = TestServer::new().await;
    let admin = server.create_account("admin").await;
    let key = test_keypair();
    server.install_relay_actor("relay.fedi.example", &key.public_pem);

    let record = server
        .relay_controller
        .subscribe(&admin, "relay.fedi.example")
        .await
        .unwrap();

    for (idx, actor) in [
        "https://relay.fedi.example/actor",
        "https://relay.fedi.example/tag/music",
    ]
    .iter()
    .enumerate()
    {
        server
            .activities
            .insert(starling_db::entities::activity::ActiveModel {
                id: Set(format!("relayed-{idx}")),
                activity_uri: Set(format!("https://relay.fedi.example/activities/{idx}")),
                activity_type: Set("Create".to_string()),
                actor_uri: Set((*actor).to_string()),
                object_uri: Set(Some(format!("https://m.example/notes/{idx}"))),
                raw_json: Set(json!({})),
                received_at: Set(Utc::now()),
                processed: Set(true),
                from_relay: Set(true),
                reply_count: Set(0),
                like_count: Set(0),
                boost_count: Set(0),
            })
            .await
            .unwrap();
    }

    let purged = server.relay_controller.purge_content(&record.id).await.unwrap();
    assert_eq!(purged, 2);
}
