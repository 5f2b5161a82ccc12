pub mod client_groups;
pub mod metrics;
pub mod services;
pub mod session;

pub use client_groups::CommcellClientGroups;
pub use metrics::MetricsReporting;
pub use services::ServiceRegistry;
pub use session::CommcellSession;
