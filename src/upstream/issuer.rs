use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::cache::models::token::{DEFAULT_LIFETIME, IssuedToken, MAX_LIFETIME};
use crate::cache::operations::token::TokenIssuer;
use crate::config::Credentials;
use crate::error::ProxyError;

/// Field names tried, in order, for the access token in a token response.
const TOKEN_FIELDS: [&str; 3] = ["access_token", "token", "accessToken"];

/// Client-credentials grant against the Prokerala token endpoint.
pub struct HttpTokenIssuer {
    client: Client,
    token_url: String,
    credentials: Option<Credentials>,
}

impl HttpTokenIssuer {
    pub fn new(client: Client, token_url: String, credentials: Option<Credentials>) -> Self {
        HttpTokenIssuer {
            client,
            token_url,
            credentials,
        }
    }
}

#[async_trait::async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self) -> Result<IssuedToken, ProxyError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ProxyError::MissingCredentials)?;

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Token endpoint unreachable: {}", e);
                ProxyError::UpstreamUnavailable(e)
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(ProxyError::UpstreamUnavailable)?;

        if !status.is_success() {
            tracing::warn!("Token endpoint answered {}", status);
            return Err(ProxyError::UpstreamAuth {
                reason: "Failed to fetch token from Prokerala",
                status: Some(status.as_u16()),
                body: Value::String(text),
            });
        }

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        parse_token_response(&body).ok_or_else(|| {
            tracing::warn!("Token response did not include an access token");
            ProxyError::UpstreamAuth {
                reason: "Token response did not include access_token",
                status: Some(status.as_u16()),
                body,
            }
        })
    }
}

/// Pulls the access token and its lifetime out of a token response.
///
/// `expires_in` may be a number or a numeric string; anything else means
/// [`DEFAULT_LIFETIME`]. Values above [`MAX_LIFETIME`] are capped.
pub fn parse_token_response(body: &Value) -> Option<IssuedToken> {
    let access_token = TOKEN_FIELDS
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find(|token| !token.is_empty())?
        .to_string();

    let lifetime = match body.get("expires_in") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|secs| *secs > 0)
    .map(Duration::from_secs)
    .map(|lifetime| lifetime.min(MAX_LIFETIME))
    .unwrap_or(DEFAULT_LIFETIME);

    Some(IssuedToken {
        access_token,
        lifetime,
    })
}
