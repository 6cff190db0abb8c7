//! Common utilities and shared types for starling.

pub mod config;
pub mod crypto;
pub mod error;
pub mod http_signature;
pub mod id;

pub use config::Config;
pub use crypto::{RsaKeypair, generate_rsa_keypair, parse_private_key, parse_public_key};
pub use error::{AppError, AppResult};
pub use http_signature::{
    HttpSignature, actor_uri_from_key_id, build_signing_string, calculate_digest, sign_request,
    verify_date_skew, verify_digest, verify_signature,
};
pub use id::IdGenerator;
