//! Centralized server configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables (separator `__`, e.g. `SCHEDULER__MAX_ACTIVE_USERS`).

use fairway_scheduler::SchedulerConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Redis connection URL. When unset, the server runs on the in-process
    /// store (single-node deployments and local development).
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Scheduling runtime tunables.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            redis_url: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if present configuration values are invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_shape() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert!(config.redis_url.is_none());
        assert_eq!(config.scheduler.max_active_users, 3);
    }
}
