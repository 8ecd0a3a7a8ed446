use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error taxonomy for lazy construction and configuration
// =============================================================================

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to construct shared instance: {reason}")]
    ConstructionFailed { reason: String },

    #[error("timed out after {waited:?} waiting for the initialization lock")]
    LockTimeout { waited: Duration },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read configuration file {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistryError {
    pub fn construction_failed(reason: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether a later call may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::ConstructionFailed { .. } | RegistryError::LockTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RegistryError::construction_failed("no servers");
        assert_eq!(err.to_string(), "failed to construct shared instance: no servers");

        let err = RegistryError::invalid_config("empty server list");
        assert_eq!(err.to_string(), "invalid configuration: empty server list");

        let err = RegistryError::LockTimeout {
            waited: Duration::from_millis(20),
        };
        assert!(err.to_string().contains("20ms"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RegistryError::construction_failed("boom").is_retryable());
        assert!(RegistryError::LockTimeout {
            waited: Duration::from_millis(1)
        }
        .is_retryable());
        assert!(!RegistryError::invalid_config("bad").is_retryable());
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse_err = toml::from_str::<toml::Value>("servers = [").unwrap_err();
        let err: RegistryError = parse_err.into();
        assert!(matches!(err, RegistryError::ConfigParse(_)));
    }
}
