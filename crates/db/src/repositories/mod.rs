//! Repositories for database operations.
//!
//! Each repository wraps the shared connection. Single-row reads go
//! straight to the pool; every write that touches more than one row (or a
//! row plus a denormalized counter) runs inside [`with_retry`], which
//! serializes it in a transaction and absorbs transient writer contention.

mod account;
mod activity;
mod delivery;
mod engagement;
mod follow;
mod note;
mod notification;
mod relay;
mod remote_actor;

pub use account::AccountRepository;
pub use activity::ActivityRepository;
pub use delivery::DeliveryRepository;
pub use engagement::{EngagementRepository, EngagementTarget};
pub use follow::FollowRepository;
pub use note::NoteRepository;
pub use notification::NotificationRepository;
pub use relay::RelayRepository;
pub use remote_actor::RemoteActorRepository;

use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait};
use starling_common::{AppError, AppResult};
use tracing::debug;

/// Bounded retries for transient writer contention; avoids livelock.
const MAX_TXN_ATTEMPTS: u32 = 3;

/// Map a database error, surfacing unique-constraint violations as the
/// distinct [`AppError::DuplicateKey`] so callers can treat replays as
/// no-ops.
pub(crate) fn map_db_err(err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
        return AppError::DuplicateKey(msg);
    }
    AppError::Database(err.to_string())
}

/// Run `op` inside a transaction, retrying on transient contention.
///
/// The closure may be invoked multiple times; it must not hold side
/// effects outside the transaction.
pub async fn with_retry<T, F>(db: &DatabaseConnection, mut op: F) -> AppResult<T>
where
    F: for<'t> FnMut(&'t DatabaseTransaction) -> BoxFuture<'t, AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let txn = db.begin().await.map_err(map_db_err)?;
        match op(&txn).await {
            Ok(value) => match txn.commit().await.map_err(map_db_err) {
                Ok(()) => return Ok(value),
                Err(err) if err.is_transient() && attempt < MAX_TXN_ATTEMPTS => {
                    debug!(attempt, error = %err, "Retrying transaction after commit contention");
                }
                Err(err) => return Err(err),
            },
            Err(err) => {
                let _ = txn.rollback().await;
                if err.is_transient() && attempt < MAX_TXN_ATTEMPTS {
                    debug!(attempt, error = %err, "Retrying transaction after contention");
                    continue;
                }
                return Err(err);
            }
        }
    }
}
