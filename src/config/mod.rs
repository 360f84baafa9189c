use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.prokerala.com";

/// Client identity used for the client-credentials grant.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[censored]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when either variable is unset or blank. The server still starts;
    /// proxied requests are then answered with a 500.
    pub credentials: Option<Credentials>,
    pub base_url: String,
    pub token_path: String,
    pub ayanamsa: String,
    pub locale: String,
    pub request_timeout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = match (
            non_blank("PROKERALA_CLIENT_ID"),
            non_blank("PROKERALA_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(Credentials {
                client_id,
                client_secret,
            }),
            _ => {
                tracing::warn!(
                    "PROKERALA_CLIENT_ID / PROKERALA_CLIENT_SECRET not set, proxied requests will fail"
                );
                None
            }
        };

        Config {
            credentials,
            base_url: non_blank("PROKERALA_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            token_path: non_blank("PROKERALA_TOKEN_PATH").unwrap_or_else(|| "/token".into()),
            ayanamsa: non_blank("PROKERALA_AYANAMSA").unwrap_or_else(|| "1".into()),
            locale: non_blank("PROKERALA_LOCALE").unwrap_or_else(|| "en".into()),
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30, |secs: &u64| {
                *secs > 0
            }),
            server_host: non_blank("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000, |_: &u16| true),
            api_base_uri: non_blank("API_BASE_URI").unwrap_or_else(|| "/api".into()),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, self.token_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parses `key`, falling back to `default` when it is unset, unparsable or
/// rejected by `accept`.
fn parse_or<F, T>(lookup: &F, key: &str, default: T, accept: fn(&T) -> bool) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) if accept(&value) => value,
        _ => {
            tracing::warn!("Invalid {}={:?}, using {}", key, raw, default);
            default
        }
    }
}
