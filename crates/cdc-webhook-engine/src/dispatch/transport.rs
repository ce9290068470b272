//! Webhook transport
//!
//! A transport performs exactly one POST. Deadlines and retries are applied
//! by the dispatcher around it.

use async_trait::async_trait;
use cdc_webhook_core::config::DispatchConfig;
use cdc_webhook_core::types::WebhookEndpoint;
use cdc_webhook_core::{Error, Result};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::error::DeliveryError;

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST `body` to the endpoint. Only a 2xx response is `Ok`.
    async fn post(&self, endpoint: &WebhookEndpoint, body: &[u8]) -> std::result::Result<(), DeliveryError>;
}

/// reqwest-backed transport with a pooled client
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    fn headers(endpoint: &WebhookEndpoint) -> std::result::Result<HeaderMap, DeliveryError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &endpoint.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DeliveryError::InvalidRequest(format!("bad header name {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| DeliveryError::InvalidRequest(format!("bad value for header {}", name)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(&self, endpoint: &WebhookEndpoint, body: &[u8]) -> std::result::Result<(), DeliveryError> {
        let headers = Self::headers(endpoint)?;

        let response = self
            .client
            .post(endpoint.url.as_str())
            .headers(headers)
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
