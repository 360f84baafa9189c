use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ProxyError;
use crate::upstream::ForwardRequest;

/// Inbound body: `{ "path": "/v2/...", "method": "GET", "payload": {...} }`.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyRequest {
    pub path: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl ProxyRequest {
    /// An empty body reads as `{}`.
    pub fn parse(body: &[u8]) -> Result<Self, ProxyError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ProxyRequest::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ProxyError::Validation(format!("Request body must be a JSON object: {e}")))
    }

    pub fn validate(self) -> Result<ForwardRequest, ProxyError> {
        let target_path = self
            .path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ProxyError::missing("path"))?;
        if !target_path.starts_with('/') || target_path.starts_with("//") {
            return Err(ProxyError::Validation(format!(
                "\"path\" must be an absolute API path such as /v2/astrology/natal, got {target_path}"
            )));
        }

        let method = self
            .method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ProxyError::missing("method"))
            .and_then(parse_method)?;

        let payload = match self.payload {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(ProxyError::Validation(
                    "\"payload\" must be a JSON object".into(),
                ));
            }
        };

        Ok(ForwardRequest {
            target_path,
            method,
            payload,
        })
    }
}

fn parse_method(raw: &str) -> Result<Method, ProxyError> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => Err(ProxyError::Validation(format!(
            "Unsupported \"method\": {raw}. Use GET, POST, PUT, PATCH or DELETE"
        ))),
    }
}
