//! Cryptographic utilities for `ActivityPub` signatures.

use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
};

use crate::{AppError, AppResult};

/// RSA key pair for `ActivityPub` HTTP Signatures.
#[derive(Debug, Clone)]
pub struct RsaKeypair {
    /// Public key in PKIX PEM format.
    pub public_key_pem: String,
    /// Private key in PKCS#8 PEM format.
    pub private_key_pem: String,
}

/// RSA key size used for newly generated actor keys.
const RSA_KEY_SIZE: usize = 4096;

/// Generate a new RSA key pair.
///
/// Keys are persistent per actor; regenerating them breaks all in-flight
/// federation with servers that cached the previous public key.
///
/// # Errors
/// Returns an error if key generation fails.
pub fn generate_rsa_keypair() -> AppResult<RsaKeypair> {
    let mut rng = rand::thread_rng();

    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE)
        .map_err(|e| AppError::Internal(format!("Failed to generate RSA key: {e}")))?;

    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode private key: {e}")))?
        .to_string();

    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode public key: {e}")))?;

    Ok(RsaKeypair {
        public_key_pem,
        private_key_pem,
    })
}

/// Parse a private key from PEM format.
///
/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and, for keys generated by older
/// deployments, legacy PKCS#1 (`BEGIN RSA PRIVATE KEY`).
pub fn parse_private_key(pem: &str) -> AppResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| AppError::KeyParse(format!("Failed to parse private key: {e}")))
}

/// Parse a public key from PEM format.
///
/// Accepts PKIX/SPKI (`BEGIN PUBLIC KEY`) with a PKCS#1
/// (`BEGIN RSA PUBLIC KEY`) fallback; some fediverse software still
/// publishes the latter.
pub fn parse_public_key(pem: &str) -> AppResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| AppError::KeyParse(format!("Failed to parse public key: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};

    // Key generation at 4096 bits is slow in debug builds; tests that only
    // need a valid key use a smaller one.
    fn small_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    #[test]
    fn test_parse_pkcs8_roundtrip() {
        let (private, public) = small_keypair();
        let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = public.to_public_key_pem(LineEnding::LF).unwrap();

        assert!(private_pem.contains("BEGIN PRIVATE KEY"));
        assert!(public_pem.contains("BEGIN PUBLIC KEY"));

        parse_private_key(&private_pem).unwrap();
        parse_public_key(&public_pem).unwrap();
    }

    #[test]
    fn test_parse_legacy_pkcs1() {
        let (private, public) = small_keypair();
        let private_pem = private.to_pkcs1_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = public.to_pkcs1_pem(LineEnding::LF).unwrap();

        assert!(private_pem.contains("BEGIN RSA PRIVATE KEY"));
        assert!(public_pem.contains("BEGIN RSA PUBLIC KEY"));

        parse_private_key(&private_pem).unwrap();
        parse_public_key(&public_pem).unwrap();
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_private_key("not a key").is_err());
        assert!(parse_public_key("not a key").is_err());
    }
}
