//! `ActivityPub` HTTP client.
//!
//! All outbound federation traffic (actor fetch, WebFinger, signed inbox
//! POST) goes through [`ApClient`], which talks to the wire via the
//! [`HttpTransport`] trait so tests can swap the network out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use starling_common::{AppError, AppResult, calculate_digest, parse_private_key, sign_request};
use tracing::{debug, info, warn};
use url::Url;

/// Hard timeout for every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ACTIVITY_JSON: &str = "application/activity+json";
const ACTIVITY_ACCEPT: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";
const JRD_ACCEPT: &str = "application/jrd+json, application/json";

/// A raw HTTP response as the transport saw it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// The wire seam. The production implementation wraps `reqwest`; tests
/// substitute canned responses and record outgoing posts.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET a JSON document.
    async fn get(&self, url: &str, accept: &str) -> AppResult<HttpResponse>;

    /// POST a signed body; returns the response status.
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> AppResult<u16>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestTransport {
    /// Create the production transport.
    pub fn new(user_agent: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, user_agent })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, accept: &str) -> AppResult<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", accept)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("GET {url}: {e}")))?;

        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok(HttpResponse { status, body })
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> AppResult<u16> {
        let mut request = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("POST {url}: {e}")))?;
        Ok(response.status().as_u16())
    }
}

/// High-level `ActivityPub` client.
#[derive(Clone)]
pub struct ApClient {
    transport: Arc<dyn HttpTransport>,
}

impl ApClient {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// The user-agent string sent with every outbound request.
    #[must_use]
    pub fn user_agent(local_domain: &str) -> String {
        format!(
            "starling/{} (+https://{local_domain})",
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Fetch a remote actor document.
    pub async fn fetch_actor(&self, actor_uri: &str) -> AppResult<Value> {
        debug!(actor_uri, "Fetching remote actor");
        let response = self.transport.get(actor_uri, ACTIVITY_ACCEPT).await?;
        if !response.is_success() {
            return Err(AppError::ActorResolveFailed(format!(
                "GET {actor_uri} returned {}",
                response.status
            )));
        }
        Ok(response.body)
    }

    /// Fetch a remote object (note, activity).
    pub async fn fetch_object(&self, object_uri: &str) -> AppResult<Value> {
        debug!(object_uri, "Fetching remote object");
        let response = self.transport.get(object_uri, ACTIVITY_ACCEPT).await?;
        if !response.is_success() {
            return Err(AppError::Transport(format!(
                "GET {object_uri} returned {}",
                response.status
            )));
        }
        Ok(response.body)
    }

    /// Resolve a `user@domain` handle to an actor URI via WebFinger.
    pub async fn webfinger(&self, user: &str, domain: &str) -> AppResult<String> {
        let url =
            format!("https://{domain}/.well-known/webfinger?resource=acct:{user}@{domain}");
        debug!(user, domain, "WebFinger lookup");

        let response = self.transport.get(&url, JRD_ACCEPT).await?;
        if !response.is_success() {
            return Err(AppError::ActorResolveFailed(format!(
                "WebFinger for {user}@{domain} returned {}",
                response.status
            )));
        }

        let links = response
            .body
            .get("links")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::ActorResolveFailed(format!("WebFinger for {user}@{domain}: no links"))
            })?;

        links
            .iter()
            .find(|link| {
                link.get("rel").and_then(Value::as_str) == Some("self")
                    && link
                        .get("type")
                        .and_then(Value::as_str)
                        .is_some_and(|t| t.starts_with(ACTIVITY_JSON) || t.contains("ld+json"))
            })
            .and_then(|link| link.get("href").and_then(Value::as_str))
            .map(std::string::ToString::to_string)
            .ok_or_else(|| {
                AppError::ActorResolveFailed(format!(
                    "WebFinger for {user}@{domain}: no self link"
                ))
            })
    }

    /// Deliver an activity to a remote inbox with an HTTP signature over
    /// `(request-target) host date digest`. Success is any 2xx.
    pub async fn deliver(
        &self,
        inbox_uri: &str,
        activity: &Value,
        private_key_pem: &str,
        key_id: &str,
    ) -> AppResult<()> {
        let url = Url::parse(inbox_uri)
            .map_err(|e| AppError::Transport(format!("invalid inbox URI {inbox_uri}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::Transport(format!("inbox URI without host: {inbox_uri}")))?
            .to_string();
        let path = url.path().to_string();

        let body = serde_json::to_vec(activity)
            .map_err(|e| AppError::Internal(format!("serialize activity: {e}")))?;
        let digest = calculate_digest(&body);
        let date = httpdate::fmt_http_date(SystemTime::now());

        let mut signed_headers = HashMap::new();
        signed_headers.insert("host".to_string(), host.clone());
        signed_headers.insert("date".to_string(), date.clone());
        signed_headers.insert("digest".to_string(), digest.clone());

        let private_key = parse_private_key(private_key_pem)?;
        let signature = sign_request(
            &private_key,
            key_id,
            "POST",
            &path,
            &signed_headers,
            &["(request-target)", "host", "date", "digest"],
        )?;

        let headers = vec![
            ("Host".to_string(), host),
            ("Date".to_string(), date),
            ("Digest".to_string(), digest),
            ("Signature".to_string(), signature),
            ("Content-Type".to_string(), ACTIVITY_JSON.to_string()),
            ("Accept".to_string(), ACTIVITY_JSON.to_string()),
        ];

        let status = self.transport.post(inbox_uri, &headers, body).await?;

        if (200..300).contains(&status) {
            info!(inbox = inbox_uri, status, "Activity delivered");
            Ok(())
        } else {
            warn!(inbox = inbox_uri, status, "Activity delivery failed");
            Err(AppError::Transport(format!(
                "POST {inbox_uri} returned {status}"
            )))
        }
    }
}
