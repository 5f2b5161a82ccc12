//! REST-backed client group directory.

use crate::domain::ports::{ClientGroupDirectory, Session};
use crate::infrastructure::commcell::services::ServiceRegistry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ClientGroupListResponse {
    #[serde(default)]
    groups: Vec<ClientGroupRecord>,
}

#[derive(Debug, Deserialize)]
struct ClientGroupRecord {
    #[serde(rename = "Id")]
    id: i64,
    name: String,
}

/// Resolves client group names against the Commcell's group listing.
/// Names are matched case-insensitively, the way the server treats them.
pub struct CommcellClientGroups {
    session: Arc<dyn Session>,
    endpoints: ServiceRegistry,
}

impl CommcellClientGroups {
    pub fn new(session: Arc<dyn Session>, endpoints: ServiceRegistry) -> Self {
        Self { session, endpoints }
    }
}

#[async_trait]
impl ClientGroupDirectory for CommcellClientGroups {
    async fn resolve(&self, name: &str) -> Result<Option<i64>> {
        let raw = self.session.get(&self.endpoints.client_groups()).await?;
        let listing: ClientGroupListResponse =
            serde_json::from_value(raw).context("Failed to decode client group listing")?;

        let wanted = name.to_lowercase();
        Ok(listing
            .groups
            .iter()
            .find(|group| group.name.to_lowercase() == wanted)
            .map(|group| group.id))
    }
}
