//! Telemetry/metrics reporting configuration for a Commcell.
//!
//! The server hands out one JSON document describing the whole metrics
//! reporting setup (enabled services, upload schedule, client group scope,
//! reporting URLs). This module holds the typed mirror of that document and
//! every in-memory mutation; nothing here talks to the network. Unknown
//! server fields are carried through untouched so a later commit posts back
//! the full document, not just the fields this SDK knows about.

use crate::domain::errors::MetricsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

// ===== Wire constants =====

/// Type discriminator the remote schema uses for client group rows.
pub const CLIENT_GROUP_ENTRY_TYPE: i32 = 28;

/// Sentinel group id meaning "every current and future client group".
pub const ALL_CLIENT_GROUPS: i64 = -1;

/// Sentinel for "no data collection window configured".
pub const NO_COLLECTION_WINDOW: i64 = -1;

/// Earliest allowed collection window: 5 minutes after local midnight.
pub const MIN_COLLECTION_WINDOW_SECS: u32 = 300;

const CHARGEBACK_DAILY: i32 = 4;
const CHARGEBACK_WEEKLY: i32 = 8;
const CHARGEBACK_MONTHLY: i32 = 16;

// ===== Variant and service names =====

/// Which reporting target this configuration addresses: an on-premises
/// metrics server (Private) or the vendor-hosted cloud (Cloud).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsVariant {
    Private,
    Cloud,
}

impl MetricsVariant {
    /// Value of the `isPrivateCloud` query flag on the fetch endpoint.
    pub fn wire_flag(self) -> u8 {
        match self {
            MetricsVariant::Private => 1,
            MetricsVariant::Cloud => 0,
        }
    }

    pub fn is_private(self) -> bool {
        matches!(self, MetricsVariant::Private)
    }
}

impl fmt::Display for MetricsVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsVariant::Private => write!(f, "Private"),
            MetricsVariant::Cloud => write!(f, "Cloud"),
        }
    }
}

/// Named sub-services of the metrics reporting subsystem. The last three
/// only appear in cloud configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsService {
    HealthCheck,
    Activity,
    Audit,
    PostUpgradeCheck,
    ChargeBack,
    UpgradeReadiness,
    ProactiveSupport,
    CloudAssist,
}

impl MetricsService {
    /// Service name exactly as it appears in `cloud.serviceList`.
    pub fn wire_name(self) -> &'static str {
        match self {
            MetricsService::HealthCheck => "Health Check",
            MetricsService::Activity => "Activity",
            MetricsService::Audit => "Audit",
            MetricsService::PostUpgradeCheck => "Post Upgrade Check",
            MetricsService::ChargeBack => "Charge Back",
            MetricsService::UpgradeReadiness => "Upgrade Readiness",
            MetricsService::ProactiveSupport => "Proactive Support",
            MetricsService::CloudAssist => "Cloud Assist",
        }
    }
}

// ===== Wire document =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub config: ConfigSection,
    #[serde(rename = "isPrivateCloud", default)]
    pub is_private_cloud: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSection {
    #[serde(default)]
    pub last_collection_time: i64,
    #[serde(default)]
    pub last_upload_time: i64,
    #[serde(default)]
    pub next_upload_time: i64,
    #[serde(default)]
    pub upload_frequency: u32,
    #[serde(default = "no_window")]
    pub data_collection_time: i64,
    #[serde(default)]
    pub client_group_list: Vec<ClientGroupEntry>,
    #[serde(default)]
    pub commcell_diag_usage: i32,
    #[serde(default)]
    pub upload_now: i32,
    pub cloud: CloudSection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudSection {
    #[serde(rename = "serviceList", default)]
    pub service_list: Vec<ServiceEntry>,
    #[serde(rename = "downloadURL", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(rename = "uploadURL", skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub service: ServiceRef,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub flags: i32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientGroupEntry {
    #[serde(rename = "_type_")]
    pub entry_type: i32,
    #[serde(rename = "clientGroupId")]
    pub client_group_id: i64,
    #[serde(rename = "clientGroupName", skip_serializing_if = "Option::is_none")]
    pub client_group_name: Option<String>,
}

impl ClientGroupEntry {
    pub fn all_groups() -> Self {
        Self {
            entry_type: CLIENT_GROUP_ENTRY_TYPE,
            client_group_id: ALL_CLIENT_GROUPS,
            client_group_name: None,
        }
    }

    pub fn for_group(client_group_id: i64) -> Self {
        Self {
            entry_type: CLIENT_GROUP_ENTRY_TYPE,
            client_group_id,
            client_group_name: Some(String::new()),
        }
    }
}

fn no_window() -> i64 {
    NO_COLLECTION_WINDOW
}

/// Bitmask stored in the Charge Back entry's `flags` field. All-false is a
/// legal value: the service row exists with no periodicity requested.
pub fn chargeback_flags(daily: bool, weekly: bool, monthly: bool) -> i32 {
    let mut flags = 0;
    if daily {
        flags |= CHARGEBACK_DAILY;
    }
    if weekly {
        flags |= CHARGEBACK_WEEKLY;
    }
    if monthly {
        flags |= CHARGEBACK_MONTHLY;
    }
    flags
}

// ===== In-memory configuration state =====

/// One fetch-mutate-commit session over the metrics configuration.
///
/// Every mutation applies to the in-memory document only; the service
/// state index and `serviceList` are updated as a pair, never one without
/// the other. Persisting the result is the transport layer's job.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    variant: MetricsVariant,
    document: MetricsDocument,
    // name -> enabled, kept in lockstep with document.config.cloud.service_list
    services: HashMap<String, bool>,
}

impl MetricsConfig {
    /// Builds the typed configuration from a raw fetch response.
    pub fn from_response(raw: Value, variant: MetricsVariant) -> Result<Self, MetricsError> {
        if raw.get("config").is_none() {
            return Err(MetricsError::MalformedResponse);
        }

        let mut document: MetricsDocument = serde_json::from_value(raw)?;
        document.is_private_cloud = variant.is_private();

        let services = document
            .config
            .cloud
            .service_list
            .iter()
            .map(|entry| (entry.service.name.clone(), entry.enabled))
            .collect();

        Ok(Self {
            variant,
            document,
            services,
        })
    }

    pub fn variant(&self) -> MetricsVariant {
        self.variant
    }

    pub fn document(&self) -> &MetricsDocument {
        &self.document
    }

    /// Current enabled state per service name.
    pub fn service_states(&self) -> &HashMap<String, bool> {
        &self.services
    }

    pub fn service_enabled(&self, service: MetricsService) -> Result<bool, MetricsError> {
        let name = service.wire_name();
        self.services
            .get(name)
            .copied()
            .ok_or_else(|| MetricsError::ServiceNotFound {
                name: name.to_string(),
            })
    }

    fn service_entry_mut(
        &mut self,
        service: MetricsService,
    ) -> Result<&mut ServiceEntry, MetricsError> {
        let name = service.wire_name();
        self.document
            .config
            .cloud
            .service_list
            .iter_mut()
            .find(|entry| entry.service.name == name)
            .ok_or_else(|| MetricsError::ServiceNotFound {
                name: name.to_string(),
            })
    }

    /// Applies the desired state to the named service. Returns whether a
    /// transition actually happened (repeat calls are no-ops).
    fn set_service_state(
        &mut self,
        service: MetricsService,
        state: bool,
    ) -> Result<bool, MetricsError> {
        let entry = self.service_entry_mut(service)?;
        if entry.enabled == state {
            return Ok(false);
        }
        entry.enabled = state;
        self.services.insert(service.wire_name().to_string(), state);
        Ok(true)
    }

    pub fn enable(&mut self, service: MetricsService) -> Result<(), MetricsError> {
        self.set_service_state(service, true).map(|_| ())
    }

    pub fn disable(&mut self, service: MetricsService) -> Result<(), MetricsError> {
        self.set_service_state(service, false).map(|_| ())
    }

    /// Rewrites every entry unconditionally, unlike the per-service toggles.
    pub fn set_all_services(&mut self, state: bool) {
        for entry in &mut self.document.config.cloud.service_list {
            entry.enabled = state;
            self.services.insert(entry.service.name.clone(), state);
        }
    }

    /// Enabling Cloud Assist requires Proactive Support on the server side;
    /// it is switched on first when currently disabled.
    pub fn enable_cloud_assist(&mut self) -> Result<(), MetricsError> {
        if !self.service_enabled(MetricsService::ProactiveSupport)? {
            tracing::debug!("Enabling Proactive Support as a prerequisite of Cloud Assist");
            self.set_service_state(MetricsService::ProactiveSupport, true)?;
        }
        self.set_service_state(MetricsService::CloudAssist, true)?;
        Ok(())
    }

    /// Disabling Cloud Assist never touches Proactive Support.
    pub fn disable_cloud_assist(&mut self) -> Result<(), MetricsError> {
        self.disable(MetricsService::CloudAssist)
    }

    /// Enables Charge Back and stores its daily/weekly/monthly periodicity
    /// bitmask. Only meaningful for private metrics.
    pub fn set_chargeback_periodicity(
        &mut self,
        daily: bool,
        weekly: bool,
        monthly: bool,
    ) -> Result<(), MetricsError> {
        if !self.variant.is_private() {
            return Err(MetricsError::WrongVariant {
                required: MetricsVariant::Private,
            });
        }
        self.set_service_state(MetricsService::ChargeBack, true)?;
        let entry = self.service_entry_mut(MetricsService::ChargeBack)?;
        entry.flags = chargeback_flags(daily, weekly, monthly);
        Ok(())
    }

    /// Whole-feature switch (`commcellDiagUsage`).
    pub fn set_metrics_enabled(&mut self, state: bool) {
        self.document.config.commcell_diag_usage = i32::from(state);
    }

    pub fn metrics_enabled(&self) -> bool {
        self.document.config.commcell_diag_usage != 0
    }

    /// Upload frequency in days. Only the lower bound is enforced; the
    /// server documentation mentions a 1-7 range but the wire contract
    /// accepts any positive count.
    pub fn set_upload_frequency(&mut self, days: u32) -> Result<(), MetricsError> {
        if days < 1 {
            return Err(MetricsError::Validation {
                reason: format!("upload frequency must be at least 1 day, got {days}"),
            });
        }
        self.document.config.upload_frequency = days;
        Ok(())
    }

    pub fn upload_frequency(&self) -> u32 {
        self.document.config.upload_frequency
    }

    /// Start of the data collection window, in seconds after local
    /// midnight. Anything before 00:05 is rejected.
    pub fn set_data_collection_window(&mut self, seconds: u32) -> Result<(), MetricsError> {
        if seconds < MIN_COLLECTION_WINDOW_SECS {
            return Err(MetricsError::Validation {
                reason: format!(
                    "data collection window must start at least {MIN_COLLECTION_WINDOW_SECS} \
                     seconds after midnight, got {seconds}"
                ),
            });
        }
        self.document.config.data_collection_time = i64::from(seconds);
        Ok(())
    }

    /// Clears the window by writing the sentinel, bypassing the floor.
    pub fn remove_data_collection_window(&mut self) {
        self.document.config.data_collection_time = NO_COLLECTION_WINDOW;
    }

    pub fn data_collection_window(&self) -> Option<u32> {
        u32::try_from(self.document.config.data_collection_time).ok()
    }

    /// Restricts reporting scope to the given resolved group ids.
    pub fn set_client_groups(&mut self, client_group_ids: &[i64]) {
        self.document.config.client_group_list = client_group_ids
            .iter()
            .map(|&id| ClientGroupEntry::for_group(id))
            .collect();
    }

    /// Scopes reporting to every current and future client group.
    pub fn set_all_client_groups(&mut self) {
        self.document.config.client_group_list = vec![ClientGroupEntry::all_groups()];
    }

    pub fn client_groups(&self) -> &[ClientGroupEntry] {
        &self.document.config.client_group_list
    }

    /// Derives both reporting URLs from one host. Only private metrics
    /// carry URLs; no validation is applied to the host or port.
    pub fn update_url(
        &mut self,
        hostname: &str,
        port: u16,
        scheme: &str,
    ) -> Result<(), MetricsError> {
        if !self.variant.is_private() {
            return Err(MetricsError::WrongVariant {
                required: MetricsVariant::Private,
            });
        }
        let cloud = &mut self.document.config.cloud;
        cloud.download_url = Some(format!("{scheme}://{hostname}:{port}/downloads/sqlscripts/"));
        cloud.upload_url = Some(format!("{scheme}://{hostname}:{port}/webconsole/"));
        Ok(())
    }

    pub fn download_url(&self) -> Option<&str> {
        self.document.config.cloud.download_url.as_deref()
    }

    pub fn upload_url(&self) -> Option<&str> {
        self.document.config.cloud.upload_url.as_deref()
    }

    pub(crate) fn set_upload_now(&mut self, on: bool) {
        self.document.config.upload_now = i32::from(on);
    }

    pub fn last_collection_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.document.config.last_collection_time, 0)
    }

    pub fn last_upload_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.document.config.last_upload_time, 0)
    }

    pub fn next_upload_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.document.config.next_upload_time, 0)
    }
}
