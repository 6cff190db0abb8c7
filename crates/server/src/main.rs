//! starling server entry point.

mod provision;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use starling_common::Config;
use starling_db::repositories::{
    AccountRepository, ActivityRepository, DeliveryRepository, EngagementRepository,
    FollowRepository, NoteRepository, NotificationRepository, RelayRepository,
    RemoteActorRepository,
};
use starling_federation::{
    ApClient, ActorResolver, InboxService, Notifier, OutboxService, RelayController,
    ReqwestTransport,
    handler::{
        FederationState, actor_handler, followers_handler, following_handler, note_handler,
        outbox_handler, shared_inbox_handler, user_inbox_handler, webfinger_handler,
    },
    inbox::MAX_INBOX_BODY_BYTES,
};
use starling_queue::DeliveryWorker;
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rate_limit::{RateLimiter, rate_limit_middleware};

/// Window allowed for in-flight work during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "starling=debug,tower_http=info".into()),
        )
        .init();

    info!("Starting starling server...");

    let config = Config::load()?;

    let db = starling_db::init(&config).await?;
    info!("Connected to database");

    starling_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let accounts = AccountRepository::new(Arc::clone(&db));
    let remote_actors = RemoteActorRepository::new(Arc::clone(&db));
    let notes = NoteRepository::new(Arc::clone(&db));
    let activities = ActivityRepository::new(Arc::clone(&db));
    let follows = FollowRepository::new(Arc::clone(&db));
    let engagement = EngagementRepository::new(Arc::clone(&db));
    let relays = RelayRepository::new(Arc::clone(&db));
    let deliveries = DeliveryRepository::new(Arc::clone(&db));
    let notifications = NotificationRepository::new(Arc::clone(&db));

    let federation = config.federation.clone();
    let transport = Arc::new(ReqwestTransport::new(ApClient::user_agent(
        &federation.local_domain,
    ))?);
    let client = ApClient::new(transport);
    let resolver = ActorResolver::new(remote_actors.clone(), client.clone());
    let notifier = Notifier::new(notifications.clone());

    let outbox = OutboxService::new(
        federation.clone(),
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
        federation.clone(),
        relays.clone(),
        activities.clone(),
        resolver.clone(),
        outbox.clone(),
    );
    let inbox = InboxService::new(
        federation.clone(),
        accounts.clone(),
        remote_actors.clone(),
        notes.clone(),
        activities.clone(),
        follows.clone(),
        engagement.clone(),
        relay_controller,
        resolver.clone(),
        outbox.clone(),
        notifier.clone(),
        client.clone(),
    );

    // First-run provisioning: STARLING_ADMIN_USER bootstraps the admin
    // account when it does not exist yet.
    if let Ok(admin) = std::env::var("STARLING_ADMIN_USER") {
        if accounts.find_by_username(&admin).await?.is_none() {
            provision::create_account(&accounts, &federation, &admin, true).await?;
        }
    }

    let state = FederationState {
        config: federation.clone(),
        accounts: accounts.clone(),
        notes,
        follows,
        remote_actors,
        inbox,
        outbox,
    };

    // Inbox endpoints carry their own, stricter per-IP limit.
    let inbox_routes = Router::new()
        .route("/inbox", post(shared_inbox_handler))
        .route("/users/{username}/inbox", post(user_inbox_handler))
        .layer(middleware::from_fn_with_state(
            RateLimiter::inbox(),
            rate_limit_middleware,
        ));

    let app = Router::new()
        .route("/users/{username}", get(actor_handler))
        .route("/users/{username}/outbox", get(outbox_handler))
        .route("/users/{username}/followers", get(followers_handler))
        .route("/users/{username}/following", get(following_handler))
        .route("/notes/{id}", get(note_handler))
        .route("/.well-known/webfinger", get(webfinger_handler))
        .merge(inbox_routes)
        .layer(middleware::from_fn_with_state(
            RateLimiter::global(),
            rate_limit_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_INBOX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let worker = DeliveryWorker::new(federation, deliveries, accounts, client);
    let worker_handle = worker.spawn();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The worker finishes its in-flight delivery inside the grace window.
    if tokio::time::timeout(SHUTDOWN_GRACE, worker_handle.stop())
        .await
        .is_err()
    {
        warn!("Delivery worker did not stop within the grace window");
    }

    info!("Shutdown complete");
    Ok(())
}
