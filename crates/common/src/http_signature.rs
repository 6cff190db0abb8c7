//! HTTP Signature utilities for `ActivityPub`.
//!
//! Implements HTTP Signatures as used by `ActivityPub` for request
//! authentication, covering `(request-target) host date digest`.
//! See: <https://datatracker.ietf.org/doc/html/draft-cavage-http-signatures>

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use rsa::{
    RsaPrivateKey,
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    sha2::Sha256,
    signature::{SignatureEncoding, Signer, Verifier},
};
use sha2::{Digest, Sha256 as Sha256Hasher};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::{AppError, AppResult, crypto::parse_public_key};

/// Maximum tolerated difference between the request `Date` header and the
/// local clock.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Parsed HTTP Signature header.
#[derive(Debug, Clone)]
pub struct HttpSignature {
    /// Key ID, `{actorURI}#main-key` by convention.
    pub key_id: String,
    /// Algorithm used (typically "rsa-sha256").
    pub algorithm: String,
    /// Headers included in the signature.
    pub headers: Vec<String>,
    /// The signature itself (base64 encoded).
    pub signature: String,
}

impl HttpSignature {
    /// Parse an HTTP Signature header value.
    ///
    /// Format: `keyId="...",algorithm="...",headers="...",signature="..."`
    pub fn parse(header: &str) -> AppResult<Self> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;

        for part in header.split(',') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                let value = value.trim_matches('"');
                match key.trim() {
                    "keyId" => key_id = Some(value.to_string()),
                    "algorithm" => algorithm = Some(value.to_string()),
                    "headers" => headers = Some(value.to_string()),
                    "signature" => signature = Some(value.to_string()),
                    _ => {} // Ignore unknown fields
                }
            }
        }

        Ok(Self {
            key_id: key_id
                .ok_or_else(|| AppError::SignatureInvalid("Missing keyId".to_string()))?,
            algorithm: algorithm.unwrap_or_else(|| "rsa-sha256".to_string()),
            headers: headers
                .unwrap_or_else(|| "date".to_string())
                .split(' ')
                .map(std::string::ToString::to_string)
                .collect(),
            signature: signature
                .ok_or_else(|| AppError::SignatureInvalid("Missing signature".to_string()))?,
        })
    }
}

/// Derive the signer's actor URI from a `keyId` by stripping the fragment.
#[must_use]
pub fn actor_uri_from_key_id(key_id: &str) -> String {
    key_id.split('#').next().unwrap_or(key_id).to_string()
}

/// Build the signing string from request components.
pub fn build_signing_string(
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    signed_headers: &[String],
) -> AppResult<String> {
    let mut parts = Vec::new();

    for header_name in signed_headers {
        let value = if header_name == "(request-target)" {
            format!("{} {}", method.to_lowercase(), path)
        } else {
            headers
                .get(&header_name.to_lowercase())
                .cloned()
                .ok_or_else(|| {
                    AppError::SignatureInvalid(format!("Missing header: {header_name}"))
                })?
        };

        parts.push(format!("{header_name}: {value}"));
    }

    Ok(parts.join("\n"))
}

/// Sign an HTTP request, returning the `Signature` header value.
///
/// The caller supplies the headers it is about to send; `Host`, `Date` and
/// `Digest` must already be present when named in `signed_header_names`.
pub fn sign_request(
    private_key: &RsaPrivateKey,
    key_id: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    signed_header_names: &[&str],
) -> AppResult<String> {
    let header_names: Vec<String> = signed_header_names
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    let signing_string = build_signing_string(method, path, headers, &header_names)?;

    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key.sign(signing_string.as_bytes());
    let sig_base64 = BASE64.encode(signature.to_bytes());

    Ok(format!(
        r#"keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
        key_id,
        signed_header_names.join(" "),
        sig_base64
    ))
}

/// Verify an HTTP signature against the signer's advertised public key.
///
/// Returns the signer's actor URI (the `keyId` minus its fragment) on
/// success. Fails with [`AppError::SignatureInvalid`] on any mismatch and
/// [`AppError::KeyParse`] if the PEM cannot be read.
pub fn verify_signature(
    signature: &HttpSignature,
    public_key_pem: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
) -> AppResult<String> {
    let signing_string = build_signing_string(method, path, headers, &signature.headers)?;

    let sig_bytes = BASE64
        .decode(&signature.signature)
        .map_err(|e| AppError::SignatureInvalid(format!("Invalid signature encoding: {e}")))?;

    let public_key = parse_public_key(public_key_pem)?;

    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signature_obj = Signature::try_from(sig_bytes.as_slice())
        .map_err(|e| AppError::SignatureInvalid(format!("Invalid signature format: {e}")))?;

    verifying_key
        .verify(signing_string.as_bytes(), &signature_obj)
        .map_err(|_| AppError::SignatureInvalid("Signature mismatch".to_string()))?;

    Ok(actor_uri_from_key_id(&signature.key_id))
}

/// Calculate the SHA-256 digest header value of a body.
#[must_use]
pub fn calculate_digest(body: &[u8]) -> String {
    let mut hasher = Sha256Hasher::new();
    hasher.update(body);
    let hash = hasher.finalize();
    format!("SHA-256={}", BASE64.encode(hash))
}

/// Verify that a `Digest` header matches the request body.
#[must_use]
pub fn verify_digest(body: &[u8], digest_header: &str) -> bool {
    calculate_digest(body) == digest_header
}

/// Check that a `Date` header is within the tolerated clock skew of `now`.
pub fn verify_date_skew(date_header: &str, now: DateTime<Utc>) -> AppResult<()> {
    let parsed: SystemTime = httpdate::parse_http_date(date_header)
        .map_err(|e| AppError::SignatureInvalid(format!("Invalid Date header: {e}")))?;
    let date: DateTime<Utc> = parsed.into();

    let skew = (now - date).abs();
    if skew.to_std().unwrap_or(Duration::MAX) > MAX_CLOCK_SKEW {
        return Err(AppError::SignatureInvalid(format!(
            "Date header outside clock skew window: {date_header}"
        )));
    }
    Ok(())
}
