pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::CommcellConfig;
pub use domain::errors::MetricsError;
pub use domain::metrics::{MetricsConfig, MetricsService, MetricsVariant};
pub use infrastructure::commcell::{CommcellSession, MetricsReporting, ServiceRegistry};
