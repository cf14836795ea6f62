//! HTTP client for the provisioning endpoint
//!
//! Request contract:
//! - `POST <endpoint>` with `Content-Type: application/json`
//! - `Authorization: Api-Key <credential>`
//! - body `{public_key, os_version, app_version, uuid}`
//!
//! A 2xx response must carry `{"config": "<encoded>"}`.

use crate::config::ClientConfig;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const AUTH_SCHEME: &str = "Api-Key ";

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected request with status {status}: {body}")]
    ServerRejected { status: u16, body: String },

    #[error("Malformed server response: {0}")]
    MalformedResponse(String),
}

/// Body of the provisioning POST
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningRequest {
    pub public_key: String,
    pub os_version: String,
    pub app_version: String,
    pub uuid: String,
}

/// Successful provisioning response; `config` is still link-encoded
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningResponse {
    pub config: String,
}

pub struct ProvisioningClient {
    http: Client,
    os_version: String,
    app_version: String,
}

impl ProvisioningClient {
    pub fn new(config: &ClientConfig) -> Result<Self, RequestError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            os_version: config.os_version.clone(),
            app_version: config.app_version.clone(),
        })
    }

    /// Build a request body with a fresh request identifier
    pub fn request_for(&self, public_key: &str) -> ProvisioningRequest {
        ProvisioningRequest {
            public_key: public_key.to_string(),
            os_version: self.os_version.clone(),
            app_version: self.app_version.clone(),
            uuid: Uuid::new_v4().to_string(),
        }
    }

    /// Perform the provisioning exchange. Exactly one attempt is made.
    ///
    /// # Arguments
    /// * `endpoint` - Provisioning URL decoded from the subscription link
    /// * `credential` - API key decoded from the subscription link
    /// * `public_key` - Base64 X25519 public key to register
    pub async fn provision(
        &self,
        endpoint: &str,
        credential: &str,
        public_key: &str,
    ) -> Result<ProvisioningResponse, RequestError> {
        let url = validate_endpoint(endpoint)?;
        let auth = authorization_header(credential)?;
        if public_key.is_empty() {
            return Err(RequestError::InvalidInput("public key cannot be empty".to_string()));
        }

        let body = self.request_for(public_key);
        info!("Requesting configuration from {}", url.host_str().unwrap_or("endpoint"));
        debug!("Request id {}, public key {}", body.uuid, body.public_key);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| {
                if e.is_timeout() {
                    warn!("Provisioning request timed out");
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Provisioning rejected with status {}", status);
            return Err(RequestError::ServerRejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        debug!("Provisioning response: {} bytes", bytes.len());

        serde_json::from_slice(&bytes).map_err(|e| RequestError::MalformedResponse(e.to_string()))
    }
}

fn validate_endpoint(endpoint: &str) -> Result<Url, RequestError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(RequestError::InvalidInput("endpoint cannot be empty".to_string()));
    }

    let url = Url::parse(endpoint)
        .map_err(|e| RequestError::InvalidInput(format!("invalid endpoint {}: {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RequestError::InvalidInput(format!(
            "unsupported endpoint scheme: {}",
            other
        ))),
    }
}

fn authorization_header(credential: &str) -> Result<HeaderValue, RequestError> {
    if credential.is_empty() {
        return Err(RequestError::InvalidInput("credential cannot be empty".to_string()));
    }

    let mut value = HeaderValue::from_str(&format!("{}{}", AUTH_SCHEME, credential)).map_err(
        |_| RequestError::InvalidInput("credential is not a valid header value".to_string()),
    )?;
    value.set_sensitive(true);
    Ok(value)
}
