//! reqwest-backed transport session for an authenticated Commcell.

use crate::config::CommcellConfig;
use crate::domain::ports::Session;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// One authenticated HTTP channel to a Commcell webservice. Holds the
/// auth token issued at login; token acquisition and renewal happen
/// elsewhere.
pub struct CommcellSession {
    client: reqwest_middleware::ClientWithMiddleware,
    auth_token: String,
}

impl CommcellSession {
    pub fn new(config: &CommcellConfig) -> Self {
        let client =
            HttpClientFactory::create_client(Duration::from_secs(config.request_timeout_secs));
        Self {
            client,
            auth_token: config.auth_token.clone(),
        }
    }
}

#[async_trait]
impl Session for CommcellSession {
    async fn get(&self, endpoint: &str) -> Result<Value> {
        debug!("GET {}", endpoint);
        let response = self
            .client
            .get(endpoint)
            .header("Authtoken", &self.auth_token)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Commcell returned {} for GET {}: {}", status, endpoint, text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode JSON body from {}", endpoint))
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        debug!("POST {}", endpoint);
        let response = self
            .client
            .post(endpoint)
            .header("Authtoken", &self.auth_token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(body).context("Failed to serialize request body")?)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Commcell returned {} for POST {}: {}",
                status,
                endpoint,
                text
            );
        }

        // Some configuration endpoints answer with an empty body on success.
        let text = response.text().await.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to decode JSON body from {}", endpoint))
    }
}
