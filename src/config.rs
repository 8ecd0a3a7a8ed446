use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a TOML file for the global load balancer.
pub const CONFIG_ENV_VAR: &str = "LOAD_BALANCER_CONFIG";

pub const DEFAULT_SERVERS: [&str; 5] = ["Server I", "Server II", "Server III", "Server IV", "Server V"];

// =============================================================================
// Load balancer configuration (TOML)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerConfig {
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Upper bound on waiting for the initialization lock. `None` waits forever.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,
}

fn default_servers() -> Vec<String> {
    DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect()
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        LoadBalancerConfig {
            servers: default_servers(),
            lock_timeout_ms: None,
        }
    }
}

impl LoadBalancerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        let config: LoadBalancerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path).map_err(|source| RegistryError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reads the file named by `LOAD_BALANCER_CONFIG`, falling back to defaults.
    pub fn load() -> Result<Self, RegistryError> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.servers.is_empty() {
            return Err(RegistryError::invalid_config("server list must not be empty"));
        }
        if let Some(pos) = self.servers.iter().position(|s| s.trim().is_empty()) {
            return Err(RegistryError::invalid_config(format!(
                "server name at index {pos} is blank"
            )));
        }
        if self.lock_timeout_ms == Some(0) {
            return Err(RegistryError::invalid_config("lock_timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
