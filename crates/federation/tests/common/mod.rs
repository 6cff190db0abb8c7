//! Shared harness for federation integration tests: in-memory storage,
//! fake transport, real keys and real signatures.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use starling_common::config::FederationConfig;
use starling_common::{AppResult, calculate_digest, parse_private_key, sign_request};
use starling_db::entities::account;
use starling_db::repositories::{
    AccountRepository, ActivityRepository, DeliveryRepository, EngagementRepository,
    FollowRepository, NoteRepository, NotificationRepository, RelayRepository,
    RemoteActorRepository,
};
use starling_db::test_utils::TestDb;
use starling_federation::testing::FakeTransport;
use starling_federation::{
    ApClient, ActorResolver, InboxService, Notifier, OutboxService, RelayController,
    inbox::InboxOutcome,
};

pub const LOCAL_DOMAIN: &str = "local.example";

/// A PEM-encoded RSA keypair for a test actor.
pub struct TestKeypair {
    pub private_pem: String,
    pub public_pem: String,
}

/// Generate a 2048-bit keypair; big enough to sign, fast enough for tests.
pub fn test_keypair() -> TestKeypair {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let public = RsaPublicKey::from(&private);
    TestKeypair {
        private_pem: private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string(),
        public_pem: public.to_public_key_pem(LineEnding::LF).unwrap(),
    }
}

/// Everything a federation test needs, wired the way the server wires it.
pub struct TestServer {
    pub db: TestDb,
    pub config: FederationConfig,
    pub transport: FakeTransport,
    pub client: ApClient,
    pub accounts: AccountRepository,
    pub remote_actors: RemoteActorRepository,
    pub notes: NoteRepository,
    pub activities: ActivityRepository,
    pub follows: FollowRepository,
    pub engagement: EngagementRepository,
    pub relays: RelayRepository,
    pub deliveries: DeliveryRepository,
    pub notifications: NotificationRepository,
    pub resolver: ActorResolver,
    pub outbox: OutboxService,
    pub relay_controller: RelayController,
    pub inbox: InboxService,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(default_config()).await
    }

    pub async fn with_config(config: FederationConfig) -> Self {
        let db = TestDb::new().await.unwrap();
        let transport = FakeTransport::new();
        let client = ApClient::new(Arc::new(transport.clone()));

        let accounts = AccountRepository::new(db.conn());
        let remote_actors = RemoteActorRepository::new(db.conn());
        let notes = NoteRepository::new(db.conn());
        let activities = ActivityRepository::new(db.conn());
        let follows = FollowRepository::new(db.conn());
        let engagement = EngagementRepository::new(db.conn());
        let relays = RelayRepository::new(db.conn());
        let deliveries = DeliveryRepository::new(db.conn());
        let notifications = NotificationRepository::new(db.conn());

        let resolver = ActorResolver::new(remote_actors.clone(), client.clone());
        let notifier = Notifier::new(notifications.clone());
        let outbox = OutboxService::new(
            config.clone(),
            accounts.clone(),
            remote_actors.clone(),
            notes.clone(),
            activities.clone(),
            follows.clone(),
            engagement.clone(),
            relays.clone(),
            deliveries.clone(),
            resolver.clone(),
            notifier.clone(),
        );
        let relay_controller = RelayController::new(
            config.clone(),
            relays.clone(),
            activities.clone(),
            resolver.clone(),
            outbox.clone(),
        );
        let inbox = InboxService::new(
            config.clone(),
            accounts.clone(),
            remote_actors.clone(),
            notes.clone(),
            activities.clone(),
            follows.clone(),
            engagement.clone(),
            relay_controller.clone(),
            resolver.clone(),
            outbox.clone(),
            notifier,
            client.clone(),
        );

        Self {
            db,
            config,
            transport,
            client,
            accounts,
            remote_actors,
            notes,
            activities,
            follows,
            engagement,
            relays,
            deliveries,
            notifications,
            resolver,
            outbox,
            relay_controller,
            inbox,
        }
    }

    /// Create a local account with a real signing keypair.
    pub async fn create_account(&self, username: &str) -> account::Model {
        use chrono::Utc;
        use sea_orm::ActiveValue::Set;
        use uuid::Uuid;

        let keypair = test_keypair();
        self.accounts
            .create(account::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                username: Set(username.to_string()),
                username_lower: Set(username.to_lowercase()),
                private_key_pem: Set(keypair.private_pem),
                public_key_pem: Set(keypair.public_pem),
                display_name: Set(None),
                summary: Set(None),
                is_admin: Set(false),
                muted: Set(false),
                created_at: Set(Utc::now()),
            })
            .await
            .unwrap()
    }

    /// Install a remote actor document (and its WebFinger record) into
    /// the fake transport. Returns the actor URI.
    pub fn install_remote_actor(
        &self,
        username: &str,
        domain: &str,
        public_pem: &str,
        shared_inbox: bool,
    ) -> String {
        let actor_uri = format!("https://{domain}/users/{username}");
        let mut document = json!({
            "id": actor_uri,
            "type": "Person",
            "preferredUsername": username,
            "inbox": format!("{actor_uri}/inbox"),
            "publicKey": {
                "id": format!("{actor_uri}#main-key"),
                "owner": actor_uri,
                "publicKeyPem": public_pem,
            },
        });
        if shared_inbox {
            document["endpoints"] = json!({"sharedInbox": format!("https://{domain}/inbox")});
        }
        self.transport.insert_response(&actor_uri, document);

        let webfinger_url = format!(
            "https://{domain}/.well-known/webfinger?resource=acct:{username}@{domain}"
        );
        self.transport.insert_response(
            &webfinger_url,
            json!({
                "subject": format!("acct:{username}@{domain}"),
                "links": [{
                    "rel": "self",
                    "type": "application/activity+json",
                    "href": actor_uri,
                }],
            }),
        );

        actor_uri
    }

    /// Install a relay actor document (Application type, no
    /// preferredUsername) into the fake transport. Returns the actor URI.
    pub fn install_relay_actor(&self, domain: &str, public_pem: &str) -> String {
        let actor_uri = format!("https://{domain}/actor");
        self.transport.insert_response(
            &actor_uri,
            json!({
                "id": actor_uri,
                "type": "Application",
                "name": "Test Relay",
                "inbox": format!("https://{domain}/inbox"),
                "publicKey": {
                    "id": format!("{actor_uri}#main-key"),
                    "owner": actor_uri,
                    "publicKeyPem": public_pem,
                },
            }),
        );
        actor_uri
    }

    /// POST a signed activity to an inbox path, the way a remote server
    /// would.
    pub async fn signed_inbox_post(
        &self,
        path: &str,
        target: Option<&str>,
        body: &Value,
        private_pem: &str,
        key_id: &str,
    ) -> AppResult<InboxOutcome> {
        let bytes = serde_json::to_vec(body).unwrap();
        let headers = self.sign_headers(path, &bytes, private_pem, key_id);
        self.inbox.handle(path, &headers, &bytes, target).await
    }

    /// Build signed request headers for an inbox POST.
    pub fn sign_headers(
        &self,
        path: &str,
        body: &[u8],
        private_pem: &str,
        key_id: &str,
    ) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("host".to_string(), LOCAL_DOMAIN.to_string());
        headers.insert(
            "date".to_string(),
            httpdate::fmt_http_date(SystemTime::now()),
        );
        headers.insert("digest".to_string(), calculate_digest(body));

        let key = parse_private_key(private_pem).unwrap();
        let signature = sign_request(
            &key,
            key_id,
            "POST",
            path,
            &headers,
            &["(request-target)", "host", "date", "digest"],
        )
        .unwrap();
        headers.insert("signature".to_string(), signature);
        headers
    }
}

pub fn default_config() -> FederationConfig {
    FederationConfig {
        local_domain: LOCAL_DOMAIN.to_string(),
        enabled: true,
        single_user: false,
        closed_registration: false,
        max_note_visible_chars: 150,
        node_description: None,
    }
}
