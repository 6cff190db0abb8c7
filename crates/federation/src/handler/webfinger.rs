//! `WebFinger` endpoint for actor discovery.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::FederationState;

/// `WebFinger` query parameters.
#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: String,
}

/// `WebFinger` JRD response.
#[derive(Debug, Serialize)]
struct WebfingerResponse {
    subject: String,
    aliases: Vec<String>,
    links: Vec<WebfingerLink>,
}

#[derive(Debug, Serialize)]
struct WebfingerLink {
    rel: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    href: Option<String>,
}

/// Parse `acct:user@domain` into its parts.
fn parse_resource(resource: &str) -> Option<(String, String)> {
    let rest = resource.strip_prefix("acct:")?;
    let (user, domain) = rest.split_once('@')?;
    if user.is_empty() || domain.is_empty() {
        return None;
    }
    Some((user.to_string(), domain.to_string()))
}

/// `GET /.well-known/webfinger?resource=acct:{user}@{host}` — maps a
/// handle to the actor URI via a `rel=self` link.
pub async fn webfinger_handler(
    State(state): State<FederationState>,
    Query(query): Query<WebfingerQuery>,
) -> Response {
    info!(resource = %query.resource, "WebFinger lookup");

    let Some((username, domain)) = parse_resource(&query.resource) else {
        return (StatusCode::BAD_REQUEST, "Invalid resource format").into_response();
    };

    if domain != state.config.local_domain {
        return (StatusCode::NOT_FOUND, "Unknown domain").into_response();
    }

    let account = match state.accounts.find_by_username(&username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!(username, "User not found for WebFinger");
            return (StatusCode::NOT_FOUND, "User not found").into_response();
        }
        Err(err) => return err.into_response(),
    };

    let actor_uri = state.outbox.actor_uri(&account.username);
    let response = WebfingerResponse {
        subject: format!("acct:{}@{}", account.username, state.config.local_domain),
        aliases: vec![actor_uri.clone()],
        links: vec![
            WebfingerLink {
                rel: "self".to_string(),
                link_type: Some("application/activity+json".to_string()),
                href: Some(actor_uri.clone()),
            },
            WebfingerLink {
                rel: "http://webfinger.net/rel/profile-page".to_string(),
                link_type: Some("text/html".to_string()),
                href: Some(actor_uri),
            },
        ],
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/jrd+json; charset=utf-8")],
        Json(response),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource() {
        assert_eq!(
            parse_resource("acct:alice@social.example"),
            Some(("alice".to_string(), "social.example".to_string()))
        );
        assert!(parse_resource("alice@social.example").is_none());
        assert!(parse_resource("acct:alice").is_none());
    }
}
