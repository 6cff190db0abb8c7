//! The delivery worker.
//!
//! One worker per process wakes on a fixed period, claims due items
//! oldest-deadline-first, and attempts each delivery sequentially; item
//! serialization follows from there being exactly one worker. Tests call
//! [`DeliveryWorker::run_cycle`] directly instead of sleeping.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use starling_common::{AppError, AppResult, config::FederationConfig};
use starling_db::entities::delivery_item;
use starling_db::repositories::{AccountRepository, DeliveryRepository};
use starling_federation::client::ApClient;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// Seconds between worker cycles.
pub const CYCLE_PERIOD: Duration = Duration::from_secs(10);

/// Items claimed per cycle.
pub const BATCH_SIZE: u64 = 50;

/// Items reaching this many failed attempts are abandoned.
pub const MAX_ATTEMPTS: i32 = 10;

/// Retry delay after the given number of failed attempts: the schedule
/// `[1m, 5m, 15m, 1h, 4h, 24h]`, saturating at the last entry.
#[must_use]
pub fn backoff_for(attempts: i32) -> ChronoDuration {
    match attempts {
        i32::MIN..=1 => ChronoDuration::minutes(1),
        2 => ChronoDuration::minutes(5),
        3 => ChronoDuration::minutes(15),
        4 => ChronoDuration::hours(1),
        5 => ChronoDuration::hours(4),
        _ => ChronoDuration::hours(24),
    }
}

/// Outcome counts of one worker cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub claimed: usize,
    pub delivered: usize,
    pub rescheduled: usize,
    pub abandoned: usize,
}

/// The delivery worker and its collaborators.
#[derive(Clone)]
pub struct DeliveryWorker {
    config: FederationConfig,
    deliveries: DeliveryRepository,
    accounts: AccountRepository,
    client: ApClient,
}

impl DeliveryWorker {
    #[must_use]
    pub const fn new(
        config: FederationConfig,
        deliveries: DeliveryRepository,
        accounts: AccountRepository,
        client: ApClient,
    ) -> Self {
        Self {
            config,
            deliveries,
            accounts,
            client,
        }
    }

    /// Spawn the supervised worker loop. The returned handle stops it;
    /// an in-flight cycle always completes before the task exits.
    #[must_use]
    pub fn spawn(self) -> WorkerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(CYCLE_PERIOD);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!("Delivery worker started");

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        info!("Delivery worker stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.run_cycle(Utc::now()).await {
                            Ok(stats) if stats.claimed > 0 => {
                                debug!(?stats, "Delivery cycle finished");
                            }
                            Ok(_) => {}
                            Err(err) => error!(error = %err, "Delivery cycle failed"),
                        }
                    }
                }
            }
        });

        WorkerHandle { stop_tx, handle }
    }

    /// Run one cycle at `now`: claim due items and attempt each. Every
    /// failure is confined to its item.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> AppResult<CycleStats> {
        if !self.config.enabled {
            return Ok(CycleStats::default());
        }

        let due = self.deliveries.claim_due(now, BATCH_SIZE).await?;
        let mut stats = CycleStats {
            claimed: due.len(),
            ..CycleStats::default()
        };

        for item in due {
            match self.attempt(&item).await {
                Ok(()) => {
                    self.deliveries.delete(&item.id).await?;
                    stats.delivered += 1;
                }
                Err(err) => {
                    let attempts = item.attempts + 1;
                    if attempts >= MAX_ATTEMPTS {
                        warn!(
                            inbox = %item.inbox_uri,
                            attempts,
                            error = %err,
                            "Delivery abandoned"
                        );
                        self.deliveries.delete(&item.id).await?;
                        stats.abandoned += 1;
                    } else {
                        let backoff = backoff_for(attempts);
                        debug!(
                            inbox = %item.inbox_uri,
                            attempts,
                            retry_in = %backoff,
                            error = %err,
                            "Delivery failed; rescheduled"
                        );
                        self.deliveries
                            .reschedule(&item.id, attempts, now + backoff)
                            .await?;
                        stats.rescheduled += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Attempt one delivery: resolve the signing actor from the
    /// activity's `actor` field, sign, POST.
    async fn attempt(&self, item: &delivery_item::Model) -> AppResult<()> {
        let actor_uri = item
            .activity_json
            .get("actor")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Protocol("queued activity without actor".to_string()))?;

        let username = local_username(&self.config, actor_uri).ok_or_else(|| {
            AppError::Protocol(format!("queued activity from non-local actor {actor_uri}"))
        })?;

        let account = self
            .accounts
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("signing account {username}")))?;

        let key_id = format!(
            "https://{}/users/{}#main-key",
            self.config.local_domain, account.username
        );

        self.client
            .deliver(
                &item.inbox_uri,
                &item.activity_json,
                &account.private_key_pem,
                &key_id,
            )
            .await
    }
}

fn local_username(config: &FederationConfig, actor_uri: &str) -> Option<String> {
    let url = Url::parse(actor_uri).ok()?;
    if url.host_str() != Some(config.local_domain.as_str()) {
        return None;
    }
    url.path()
        .strip_prefix("/users/")
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(std::string::ToString::to_string)
}

/// Stop handle for the worker task.
pub struct WorkerHandle {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop and wait for it to exit. The current
    /// delivery, if any, completes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.handle.await {
            error!(error = %err, "Delivery worker task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_caps_at_last_entry() {
        assert_eq!(backoff_for(1), ChronoDuration::minutes(1));
        assert_eq!(backoff_for(2), ChronoDuration::minutes(5));
        assert_eq!(backoff_for(5), ChronoDuration::hours(4));
        assert_eq!(backoff_for(6), ChronoDuration::hours(24));
        assert_eq!(backoff_for(9), ChronoDuration::hours(24));
    }

    #[test]
    fn test_local_username() {
        let config = FederationConfig {
            local_domain: "local.example".to_string(),
            enabled: true,
            single_user: false,
            closed_registration: false,
            max_note_visible_chars: 150,
            node_description: None,
        };
        assert_eq!(
            local_username(&config, "https://local.example/users/alice").as_deref(),
            Some("alice")
        );
        assert!(local_username(&config, "https://m.example/users/alice").is_none());
        assert!(local_username(&config, "https://local.example/notes/1").is_none());
    }
}
