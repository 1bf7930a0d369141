//! HTTP client for the external save API and the folio API

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::DeliveryConfig;
use crate::constants::SUCCESS_FALLBACK_STATUS;
use crate::error::{FormsError, Result};
use crate::types::{ApiConfiguration, Authentication, FolioApiConfig, HttpMethod};

/// Everything needed to call one external endpoint
#[derive(Debug, Clone)]
pub struct DeliveryTarget {
    pub endpoint: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub authentication: Authentication,
    /// Falls back to the client default when `None`
    pub timeout_ms: Option<u64>,
}

impl From<&ApiConfiguration> for DeliveryTarget {
    fn from(api: &ApiConfiguration) -> Self {
        Self {
            endpoint: api.endpoint.clone(),
            method: api.method,
            headers: api.headers.clone(),
            authentication: api.authentication.clone(),
            timeout_ms: api.timeout,
        }
    }
}

impl From<&FolioApiConfig> for DeliveryTarget {
    fn from(api: &FolioApiConfig) -> Self {
        Self {
            endpoint: api.endpoint.clone(),
            method: api.method,
            headers: api.headers.clone(),
            authentication: api.authentication.clone(),
            timeout_ms: api.timeout_ms,
        }
    }
}

/// Sends JSON to an external endpoint and returns its decoded response
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// `DeliveryHttp` for non-2xx answers, `DeliveryTimeout` when the deadline passes
    async fn send(&self, target: &DeliveryTarget, payload: Option<&Value>) -> Result<Value>;
}

pub struct HttpDeliveryClient {
    http_client: HttpClient,
    default_timeout_ms: u64,
}

impl HttpDeliveryClient {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http_client,
            default_timeout_ms: config.default_timeout_ms,
        })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn send(&self, target: &DeliveryTarget, payload: Option<&Value>) -> Result<Value> {
        let timeout_ms = target.timeout_ms.unwrap_or(self.default_timeout_ms);
        let method = Method::from_bytes(target.method.as_str().as_bytes())
            .map_err(|e| FormsError::InvalidRequest(e.to_string()))?;

        let mut request = self
            .http_client
            .request(method, &target.endpoint)
            .headers(build_headers(target)?);

        if let Some(payload) = payload {
            request = request.body(serde_json::to_vec(payload)?);
        }

        info!("{} {} (timeout {} ms)", target.method, target.endpoint, timeout_ms);

        // Dropping the exchange on timeout aborts the in-flight request
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, FormsError>((status, body))
        };

        let (status, body) = tokio::time::timeout(Duration::from_millis(timeout_ms), exchange)
            .await
            .map_err(|_| {
                warn!("{} did not answer within {} ms", target.endpoint, timeout_ms);
                FormsError::DeliveryTimeout { timeout_ms }
            })??;

        debug!("{} answered {}: {}", target.endpoint, status, body);

        if !status.is_success() {
            return Err(FormsError::DeliveryHttp {
                status: status.as_u16(),
                body,
            });
        }

        Ok(parse_success_body(&body))
    }
}

/// Decode a 2xx body; empty or non-JSON bodies count as a plain success
pub fn parse_success_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::json!({ "status": SUCCESS_FALLBACK_STATUS }))
}

/// Content type, then custom headers (later keys win), then authentication
pub fn build_headers(target: &DeliveryTarget) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &target.headers {
        headers.insert(header_name(name)?, header_value(value)?);
    }

    // Incomplete credentials send no auth header
    match &target.authentication {
        Authentication::None => {}
        Authentication::Bearer { token } if token.is_empty() => {}
        Authentication::Bearer { token } => {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
        }
        Authentication::ApiKey { api_key, header } if api_key.is_empty() || header.is_empty() => {}
        Authentication::ApiKey { api_key, header } => {
            headers.insert(header_name(header)?, header_value(api_key)?);
        }
        Authentication::Basic { username, password } if username.is_empty() || password.is_empty() => {}
        Authentication::Basic { username, password } => {
            let credentials = general_purpose::STANDARD.encode(format!("{}:{}", username, password));
            headers.insert(AUTHORIZATION, header_value(&format!("Basic {}", credentials))?);
        }
    }

    Ok(headers)
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| FormsError::InvalidRequest(format!("invalid header name {:?}: {}", name, e)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| FormsError::InvalidRequest(format!("invalid header value: {}", e)))
}
