//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via FILLBUS_CONFIG)
//! 3. Environment variables
//!
//! The `tags` section provisions the tag table at startup; tags and their
//! types are not discoverable over the wire, so the config file is where a
//! line integrator declares them.

use crate::server::ServerConfig;
use fillbus_registry::{Access, Tag, TagValue};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
}

/// Server configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Tags provisioned at startup.
    pub tags: Vec<TagSpec>,
}

impl Config {
    /// Loads configuration from file, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("FILLBUS_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
    }

    /// Returns the network section as a [`ServerConfig`].
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.network.bind_addr,
            max_connections: self.network.max_connections,
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind_addr: defaults.bind_addr,
            max_connections: defaults.max_connections,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("FILLBUS_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(max) = std::env::var("FILLBUS_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }
}

/// One provisioned tag.
///
/// ```yaml
/// tags:
///   - id: 1001
///     name: line_speed
///     access: read_write
///     type: integer
///     value: 42
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSpec {
    pub id: u16,
    pub name: String,
    pub access: Access,
    #[serde(flatten)]
    pub value: TagValue,
}

impl From<TagSpec> for Tag {
    fn from(spec: TagSpec) -> Self {
        Tag::new(spec.id, spec.name, spec.value, spec.access)
    }
}
