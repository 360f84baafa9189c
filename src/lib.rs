use std::sync::Arc;

use config::Config;
use error::SetupError;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod upstream;

use cache::TokenManager;
use upstream::{Forwarder, HttpTokenIssuer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forwarder: Arc<Forwarder>,
}

impl AppState {
    /// Builds the shared HTTP client, token cache and forwarder from `config`.
    pub fn new(config: Config) -> Result<Self, SetupError> {
        let base_url = reqwest::Url::parse(&config.base_url).map_err(|e| SetupError::BaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let issuer = HttpTokenIssuer::new(
            client.clone(),
            config.token_url(),
            config.credentials.clone(),
        );
        let tokens = Arc::new(TokenManager::new(Arc::new(issuer)));

        let defaults = vec![
            ("ayanamsa".to_string(), config.ayanamsa.clone()),
            ("la".to_string(), config.locale.clone()),
        ];
        let forwarder = Forwarder::new(client, base_url, defaults, tokens);

        Ok(AppState {
            config: Arc::new(config),
            forwarder: Arc::new(forwarder),
        })
    }
}
