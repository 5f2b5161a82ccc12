//! Resolution of logical Commcell endpoint names to concrete URLs.

use crate::domain::metrics::MetricsVariant;
use crate::infrastructure::core::http_client_factory::build_url_with_query;

/// Maps the handful of named endpoints this SDK calls onto the webservice
/// base URL. Holds no connection state.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    base: String,
}

impl ServiceRegistry {
    pub fn new(webservice_url: &str) -> Self {
        Self {
            base: webservice_url.trim_end_matches('/').to_string(),
        }
    }

    /// POST target for both commit and immediate upload.
    pub fn metrics(&self) -> String {
        format!("{}/CommServ/MetricsReporting", self.base)
    }

    /// GET endpoint for the configuration document of one variant.
    pub fn get_metrics(&self, variant: MetricsVariant) -> String {
        build_url_with_query(
            &format!("{}/CommServ/MetricsReporting", self.base),
            &[("isPrivateCloud", variant.wire_flag().to_string().as_str())],
        )
    }

    /// GET endpoint listing all client groups.
    pub fn client_groups(&self) -> String {
        format!("{}/ClientGroup", self.base)
    }
}
