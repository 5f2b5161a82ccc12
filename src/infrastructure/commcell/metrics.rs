//! Metrics reporting configuration manager.
//!
//! `MetricsReporting` is a fetch-mutate-commit session object: one GET at
//! construction, any number of in-memory mutations, then `save_config()`
//! (or `upload_now()`) to POST the whole document back. It never refetches
//! after a commit; the in-memory document is the assumed-authoritative
//! state for the rest of the session.

use crate::domain::errors::MetricsError;
use crate::domain::metrics::{ClientGroupEntry, MetricsConfig, MetricsService, MetricsVariant};
use crate::domain::ports::{ClientGroupDirectory, Session};
use crate::infrastructure::commcell::services::ServiceRegistry;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

pub struct MetricsReporting {
    session: Arc<dyn Session>,
    endpoints: ServiceRegistry,
    config: MetricsConfig,
}

impl MetricsReporting {
    /// Loads the private (on-premises reporting target) configuration.
    pub async fn private(
        session: Arc<dyn Session>,
        endpoints: ServiceRegistry,
    ) -> Result<Self, MetricsError> {
        Self::new(session, endpoints, MetricsVariant::Private).await
    }

    /// Loads the cloud (vendor-hosted reporting target) configuration.
    pub async fn cloud(
        session: Arc<dyn Session>,
        endpoints: ServiceRegistry,
    ) -> Result<Self, MetricsError> {
        Self::new(session, endpoints, MetricsVariant::Cloud).await
    }

    pub async fn new(
        session: Arc<dyn Session>,
        endpoints: ServiceRegistry,
        variant: MetricsVariant,
    ) -> Result<Self, MetricsError> {
        let raw = session
            .get(&endpoints.get_metrics(variant))
            .await
            .map_err(|e| MetricsError::Transport {
                text: e.to_string(),
            })?;
        let config = MetricsConfig::from_response(raw, variant)?;
        info!(
            "Loaded {} metrics configuration with {} services",
            variant,
            config.service_states().len()
        );
        Ok(Self {
            session,
            endpoints,
            config,
        })
    }

    pub fn variant(&self) -> MetricsVariant {
        self.config.variant()
    }

    /// The typed in-memory configuration, for read access.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    // ===== Service toggles =====

    pub fn enable_health(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::HealthCheck)
    }

    pub fn disable_health(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::HealthCheck)
    }

    pub fn enable_activity(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::Activity)
    }

    pub fn disable_activity(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::Activity)
    }

    pub fn enable_audit(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::Audit)
    }

    pub fn disable_audit(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::Audit)
    }

    pub fn enable_post_upgrade_check(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::PostUpgradeCheck)
    }

    pub fn disable_post_upgrade_check(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::PostUpgradeCheck)
    }

    /// Enables Charge Back without touching its periodicity flags.
    pub fn enable_chargeback(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::ChargeBack)
    }

    pub fn disable_chargeback(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::ChargeBack)
    }

    /// Private metrics only: enables Charge Back and stores which of the
    /// daily/weekly/monthly reports to produce.
    pub fn set_chargeback_periodicity(
        &mut self,
        daily: bool,
        weekly: bool,
        monthly: bool,
    ) -> Result<(), MetricsError> {
        self.config.set_chargeback_periodicity(daily, weekly, monthly)
    }

    pub fn enable_upgrade_readiness(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::UpgradeReadiness)
    }

    pub fn disable_upgrade_readiness(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::UpgradeReadiness)
    }

    pub fn enable_proactive_support(&mut self) -> Result<(), MetricsError> {
        self.config.enable(MetricsService::ProactiveSupport)
    }

    pub fn disable_proactive_support(&mut self) -> Result<(), MetricsError> {
        self.config.disable(MetricsService::ProactiveSupport)
    }

    /// Cloud metrics only: enables Cloud Assist, switching on its
    /// Proactive Support prerequisite first when needed.
    pub fn enable_cloud_assist(&mut self) -> Result<(), MetricsError> {
        self.config.enable_cloud_assist()
    }

    pub fn disable_cloud_assist(&mut self) -> Result<(), MetricsError> {
        self.config.disable_cloud_assist()
    }

    pub fn enable_all_services(&mut self) {
        self.config.set_all_services(true);
    }

    pub fn disable_all_services(&mut self) {
        self.config.set_all_services(false);
    }

    // ===== Feature switch and schedule =====

    pub fn enable_metrics(&mut self) {
        self.config.set_metrics_enabled(true);
    }

    pub fn disable_metrics(&mut self) {
        self.config.set_metrics_enabled(false);
    }

    pub fn metrics_enabled(&self) -> bool {
        self.config.metrics_enabled()
    }

    pub fn set_upload_frequency(&mut self, days: u32) -> Result<(), MetricsError> {
        self.config.set_upload_frequency(days)
    }

    pub fn upload_frequency(&self) -> u32 {
        self.config.upload_frequency()
    }

    pub fn set_data_collection_window(&mut self, seconds: u32) -> Result<(), MetricsError> {
        self.config.set_data_collection_window(seconds)
    }

    pub fn remove_data_collection_window(&mut self) {
        self.config.remove_data_collection_window();
    }

    pub fn data_collection_window(&self) -> Option<u32> {
        self.config.data_collection_window()
    }

    // ===== Scope =====

    /// Restricts reporting to the named client groups, or to every group
    /// when `names` is `None`. All names are resolved before anything is
    /// applied, so a bad name leaves the scope untouched.
    pub async fn set_client_groups(
        &mut self,
        directory: &dyn ClientGroupDirectory,
        names: Option<&[String]>,
    ) -> Result<(), MetricsError> {
        let Some(names) = names else {
            self.config.set_all_client_groups();
            return Ok(());
        };

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = directory
                .resolve(name)
                .await
                .map_err(|e| MetricsError::Transport {
                    text: e.to_string(),
                })?
                .ok_or_else(|| MetricsError::ClientGroupNotFound { name: name.clone() })?;
            ids.push(id);
        }
        self.config.set_client_groups(&ids);
        Ok(())
    }

    pub fn set_all_client_groups(&mut self) {
        self.config.set_all_client_groups();
    }

    pub fn client_groups(&self) -> &[ClientGroupEntry] {
        self.config.client_groups()
    }

    // ===== Private reporting URLs =====

    /// Private metrics only: points both reporting URLs at one host.
    /// Typical values are port 80 with "http" or 443 with "https".
    pub fn update_url(
        &mut self,
        hostname: &str,
        port: u16,
        scheme: &str,
    ) -> Result<(), MetricsError> {
        self.config.update_url(hostname, port, scheme)
    }

    pub fn download_url(&self) -> Option<&str> {
        self.config.download_url()
    }

    pub fn upload_url(&self) -> Option<&str> {
        self.config.upload_url()
    }

    // ===== Read-only schedule state =====

    pub fn service_states(&self) -> &HashMap<String, bool> {
        self.config.service_states()
    }

    pub fn service_enabled(&self, service: MetricsService) -> Result<bool, MetricsError> {
        self.config.service_enabled(service)
    }

    pub fn last_collection_time(&self) -> Option<DateTime<Utc>> {
        self.config.last_collection_time()
    }

    pub fn last_upload_time(&self) -> Option<DateTime<Utc>> {
        self.config.last_upload_time()
    }

    pub fn next_upload_time(&self) -> Option<DateTime<Utc>> {
        self.config.next_upload_time()
    }

    // ===== Commit =====

    async fn post_config(&self, body: &Value) -> Result<(), MetricsError> {
        self.session
            .post(&self.endpoints.metrics(), body)
            .await
            .map_err(|e| {
                error!("Metrics configuration POST failed: {}", e);
                MetricsError::Transport {
                    text: e.to_string(),
                }
            })?;
        Ok(())
    }

    /// Persists every batched in-memory change in one POST. On failure the
    /// in-memory document is left exactly as it was, ready for a retry by
    /// the caller.
    pub async fn save_config(&self) -> Result<(), MetricsError> {
        let body = serde_json::to_value(self.config.document())?;
        self.post_config(&body).await?;
        info!("Saved {} metrics configuration", self.variant());
        Ok(())
    }

    /// Commits the configuration with the transient `uploadNow` flag set,
    /// asking the server to collect and upload immediately.
    ///
    /// The in-memory flag is cleared as soon as the request body is built,
    /// before the POST outcome is known, so a later `save_config()` can
    /// never re-trigger an upload after a failed attempt.
    pub async fn upload_now(&mut self) -> Result<(), MetricsError> {
        self.config.set_upload_now(true);
        let body = serde_json::to_value(self.config.document());
        self.config.set_upload_now(false);

        self.post_config(&body?).await?;
        info!("Triggered immediate {} metrics upload", self.variant());
        Ok(())
    }
}

impl fmt::Debug for MetricsReporting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsReporting")
            .field("endpoints", &self.endpoints)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MetricsReporting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} metrics configuration ({} services)",
            self.variant(),
            self.config.service_states().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockSession;
    use serde_json::json;
    use tokio_test::block_on;

    fn endpoints() -> ServiceRegistry {
        ServiceRegistry::new("http://cs.example.com/api")
    }

    fn private_response() -> Value {
        json!({
            "config": {
                "uploadFrequency": 1,
                "dataCollectionTime": -1,
                "commcellDiagUsage": 1,
                "uploadNow": 0,
                "clientGroupList": [{"_type_": 28, "clientGroupId": -1}],
                "cloud": {
                    "downloadURL": "http://metrics.internal:80/downloads/sqlscripts/",
                    "uploadURL": "http://metrics.internal:80/webconsole/",
                    "serviceList": [
                        {"service": {"name": "Health Check"}, "enabled": false, "flags": 0},
                        {"service": {"name": "Activity"}, "enabled": false, "flags": 0},
                        {"service": {"name": "Audit"}, "enabled": false, "flags": 0},
                        {"service": {"name": "Post Upgrade Check"}, "enabled": false, "flags": 0},
                        {"service": {"name": "Charge Back"}, "enabled": false, "flags": 0}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_construction_fetches_and_indexes() {
        let session = Arc::new(MockSession::new(private_response()));

        let metrics = block_on(MetricsReporting::private(session, endpoints())).unwrap();

        assert_eq!(metrics.variant(), MetricsVariant::Private);
        assert_eq!(metrics.service_states().len(), 5);
        assert_eq!(metrics.upload_frequency(), 1);
    }

    #[test]
    fn test_construction_fails_on_transport_error() {
        let session = Arc::new(MockSession::new(private_response()));
        session.fail_gets(true);

        let err = block_on(MetricsReporting::private(session, endpoints())).unwrap_err();
        assert!(matches!(err, MetricsError::Transport { .. }));
    }

    #[test]
    fn test_construction_fails_on_missing_config_section() {
        let session = Arc::new(MockSession::new(json!({"errorCode": 0})));

        let err = block_on(MetricsReporting::private(session, endpoints())).unwrap_err();
        assert!(matches!(err, MetricsError::MalformedResponse));
    }

    #[test]
    fn test_save_config_posts_full_document() {
        let session = Arc::new(MockSession::new(private_response()));
        let mut metrics =
            block_on(MetricsReporting::private(session.clone(), endpoints())).unwrap();

        metrics.enable_health().unwrap();
        metrics.set_upload_frequency(3).unwrap();
        block_on(metrics.save_config()).unwrap();

        let posted = session.posted();
        assert_eq!(posted.len(), 1);
        let (endpoint, body) = &posted[0];
        assert_eq!(endpoint, "http://cs.example.com/api/CommServ/MetricsReporting");
        assert_eq!(body["config"]["uploadFrequency"], 3);
        assert_eq!(body["config"]["uploadNow"], 0);
        let health = &body["config"]["cloud"]["serviceList"][0];
        assert_eq!(health["service"]["name"], "Health Check");
        assert_eq!(health["enabled"], true);
    }

    #[test]
    fn test_failed_commit_keeps_mutations_in_memory() {
        let session = Arc::new(MockSession::new(private_response()));
        let mut metrics =
            block_on(MetricsReporting::private(session.clone(), endpoints())).unwrap();

        metrics.enable_audit().unwrap();
        session.fail_posts(true);

        let err = block_on(metrics.save_config()).unwrap_err();
        assert!(matches!(err, MetricsError::Transport { .. }));
        assert!(metrics.service_enabled(MetricsService::Audit).unwrap());
        assert!(session.posted().is_empty());
    }

    #[test]
    fn test_upload_now_sets_and_resets_flag() {
        let session = Arc::new(MockSession::new(private_response()));
        let mut metrics =
            block_on(MetricsReporting::private(session.clone(), endpoints())).unwrap();

        block_on(metrics.upload_now()).unwrap();

        let posted = session.posted();
        assert_eq!(posted[0].1["config"]["uploadNow"], 1);
        // flag already cleared in memory
        assert_eq!(metrics.config().document().config.upload_now, 0);

        block_on(metrics.save_config()).unwrap();
        assert_eq!(session.posted()[1].1["config"]["uploadNow"], 0);
    }

    #[test]
    fn test_upload_now_flag_cleared_even_when_post_fails() {
        let session = Arc::new(MockSession::new(private_response()));
        let mut metrics =
            block_on(MetricsReporting::private(session.clone(), endpoints())).unwrap();
        session.fail_posts(true);

        let err = block_on(metrics.upload_now()).unwrap_err();
        assert!(matches!(err, MetricsError::Transport { .. }));
        assert_eq!(metrics.config().document().config.upload_now, 0);
    }
}
