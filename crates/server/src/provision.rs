//! Local account provisioning.
//!
//! Registration itself happens outside the core (SSH); this applies the
//! registration policy and mints the signing key pair.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use starling_common::{AppError, AppResult, IdGenerator, config::FederationConfig};
use starling_common::generate_rsa_keypair;
use starling_db::entities::account;
use starling_db::repositories::AccountRepository;
use tracing::info;

/// Create a local account, enforcing the registration policy:
/// `closed_registration` rejects everything, `single_user` rejects once
/// one local actor exists.
pub async fn create_account(
    accounts: &AccountRepository,
    config: &FederationConfig,
    username: &str,
    is_admin: bool,
) -> AppResult<account::Model> {
    if config.closed_registration {
        return Err(AppError::Validation("registration is closed".to_string()));
    }
    if config.single_user && accounts.count().await? > 0 {
        return Err(AppError::Validation(
            "this instance is single-user".to_string(),
        ));
    }
    if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::Validation(format!(
            "invalid username: {username}"
        )));
    }

    let keypair = generate_rsa_keypair()?;
    let account = accounts
        .create(account::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            username: Set(username.to_string()),
            username_lower: Set(username.to_lowercase()),
            private_key_pem: Set(keypair.private_key_pem),
            public_key_pem: Set(keypair.public_key_pem),
            display_name: Set(None),
            summary: Set(None),
            is_admin: Set(is_admin),
            muted: Set(false),
            created_at: Set(Utc::now()),
        })
        .await?;

    info!(username = %account.username, is_admin, "Local account created");
    Ok(account)
}
