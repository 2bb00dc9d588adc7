//! Unified error type for the dashboard crate.

use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Top-level error for dashboard operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Commerce API request failed.
    #[error("Commerce API error: {0}")]
    Gateway(#[from] GatewayError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Output could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input from the caller.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_error_display() {
        let err = DashboardError::NotFound("member 4211".to_string());
        assert_eq!(err.to_string(), "Not found: member 4211");

        let err = DashboardError::from(GatewayError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(err.to_string(), "Commerce API error: API error: 500 - boom");

        let err =
            DashboardError::from(ConfigError::MissingEnvVar("SG_COMMERCE_API_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: SG_COMMERCE_API_URL"
        );
    }
}
