use crate::domain::metrics::MetricsVariant;
use thiserror::Error;

/// Errors related to metrics configuration operations
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metrics request failed: {text}")]
    Transport { text: String },

    #[error("Metrics response has no 'config' section")]
    MalformedResponse,

    #[error("Invalid parameter: {reason}")]
    Validation { reason: String },

    #[error("Service '{name}' not present in metrics configuration")]
    ServiceNotFound { name: String },

    #[error("Client group '{name}' does not exist on this Commcell")]
    ClientGroupNotFound { name: String },

    #[error("Operation is only valid for {required} metrics")]
    WrongVariant { required: MetricsVariant },

    #[error("Metrics document did not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_carries_response_text() {
        let err = MetricsError::Transport {
            text: "503 Service Unavailable".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("503 Service Unavailable"));
    }

    #[test]
    fn test_wrong_variant_formatting() {
        let err = MetricsError::WrongVariant {
            required: MetricsVariant::Private,
        };

        assert!(err.to_string().contains("Private"));
    }
}
