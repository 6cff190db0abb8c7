//! Actor resolution and cache tests.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::{Duration, Utc};
use common::{TestServer, test_keypair};
use sea_orm::ActiveValue::Set;
use serde_json::json;
use starling_common::AppError;

#[tokio::test]
async fn webfinger_and_fetch_reproduce_remote_fields() {
    let server = TestServer::new().await;
    let key = test_keypair();
    let actor_uri = server.install_remote_actor("bob", "m.example", &key.public_pem, true);

    let resolved_uri = server.resolver.resolve_handle("bob", "m.example").await.unwrap();
    assert_eq!(resolved_uri, actor_uri);

    let actor = server.resolver.get_or_fetch(&resolved_uri).await.unwrap();
    assert_eq!(actor.username, "bob");
    assert_eq!(actor.domain, "m.example");
    assert_eq!(actor.actor_uri, actor_uri);
    assert_eq!(actor.inbox_uri, format!("{actor_uri}/inbox"));
    assert_eq!(
        actor.shared_inbox_uri.as_deref(),
        Some("https://m.example/inbox")
    );
    assert_eq!(actor.public_key_pem, key.public_pem);
}

#[tokio::test]
async fn fresh_cache_is_served_without_fetch() {
    let server = TestServer::new().await;
    let key = test_keypair();
    let actor_uri = server.install_remote_actor("bob", "m.example", &key.public_pem, false);

    let first = server.resolver.get_or_fetch(&actor_uri).await.unwrap();

    // Change the remote document; a fresh cache row masks it.
    server.transport.insert_response(
        &actor_uri,
        json!({
            "id": actor_uri,
            "preferredUsername": "bob",
            "name": "Renamed",
            "inbox": format!("{actor_uri}/inbox"),
            "publicKey": {"publicKeyPem": key.public_pem},
        }),
    );

    let second = server.resolver.get_or_fetch(&actor_uri).await.unwrap();
    assert_eq!(second.display_name, first.display_name);
    assert!(second.display_name.is_none());
}

#[tokio::test]
async fn expired_cache_refreshes_preserving_the_row_id() {
    let server = TestServer::new().await;
    let key = test_keypair();
    let actor_uri = server.install_remote_actor("bob", "m.example", &key.public_pem, false);

    let first = server.resolver.get_or_fetch(&actor_uri).await.unwrap();

    // Age the row past the TTL.
    let mut stale: starling_db::entities::remote_actor::ActiveModel = first.clone().into();
    stale.last_fetched_at = Set(Utc::now() - Duration::hours(25));
    server.remote_actors.update(stale).await.unwrap();

    server.transport.insert_response(
        &actor_uri,
        json!({
            "id": actor_uri,
            "preferredUsername": "bob",
            "name": "Renamed",
            "inbox": format!("{actor_uri}/inbox"),
            "publicKey": {"publicKeyPem": key.public_pem},
        }),
    );

    let refreshed = server.resolver.get_or_fetch(&actor_uri).await.unwrap();
    assert_eq!(refreshed.id, first.id);
    assert_eq!(refreshed.display_name.as_deref(), Some("Renamed"));
}

#[tokio::test]
async fn stale_row_is_served_when_refresh_fails() {
    let server = TestServer::new().await;
    let key = test_keypair();
    let actor_uri = server.install_remote_actor("ghost", "gone.example", &key.public_pem, false);

    let first = server.resolver.get_or_fetch(&actor_uri).await.unwrap();

    let mut stale: starling_db::entities::remote_actor::ActiveModel = first.clone().into();
    stale.last_fetched_at = Set(Utc::now() - Duration::hours(25));
    server.remote_actors.update(stale).await.unwrap();

    // The remote server no longer returns a usable document.
    server.transport.insert_response(&actor_uri, serde_json::Value::Null);

    let served = server.resolver.get_or_fetch(&actor_uri).await.unwrap();
    assert_eq!(served.id, first.id);
    assert_eq!(served.username, "ghost");
}

#[tokio::test]
async fn unknown_actor_without_cache_fails() {
    let server = TestServer::new().await;
    let err = server
        .resolver
        .get_or_fetch("https://nowhere.example/users/nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ActorResolveFailed(_)));
}

#[tokio::test]
async fn invalid_actor_document_is_rejected() {
    let server = TestServer::new().await;
    // Document with an empty public key.
    server.transport.insert_response(
        "https://m.example/users/broken",
        json!({
            "id": "https://m.example/users/broken",
            "inbox": "https://m.example/users/broken/inbox",
            "publicKey": {"publicKeyPem": ""},
        }),
    );

    let err = server
        .resolver
        .get_or_fetch("https://m.example/users/broken")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ActorInvalid(_)));
}
