mod logging;
mod routing;
mod server;
mod upstream;

pub use logging::LoggingConfig;
pub use routing::{AnswerNonePolicy, RoutingConfig};
pub use server::ServerConfig;
pub use upstream::{EdnsConfig, EdnsPolicy, Protocol, TcpPoolConfig, UpstreamConfig};

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Domain list files, one per upstream group, plus the matching algorithm
/// used for both.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainFileConfig {
    #[serde(default)]
    pub primary: Option<String>,

    #[serde(default)]
    pub alternative: Option<String>,

    /// One of: full-list, full-map, regex-list, mix-list, suffix-tree,
    /// gfwlist, final.
    #[serde(default = "default_matcher")]
    pub matcher: String,
}

impl Default for DomainFileConfig {
    fn default() -> Self {
        Self {
            primary: None,
            alternative: None,
            matcher: default_matcher(),
        }
    }
}

/// CIDR list files, one per upstream group.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IpNetworkFileConfig {
    #[serde(default)]
    pub primary: Option<String>,

    #[serde(default)]
    pub alternative: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilesConfig {
    #[serde(default)]
    pub domain_file: DomainFileConfig,

    #[serde(default)]
    pub ip_network_file: IpNetworkFileConfig,

    #[serde(default)]
    pub hosts_file: Option<String>,

    /// Lines of `pattern seconds`, overriding answer TTLs per domain suffix.
    #[serde(default)]
    pub domain_ttl_file: Option<String>,
}

/// Main configuration for the forwarder.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub primary_upstreams: Vec<UpstreamConfig>,

    #[serde(default)]
    pub alternative_upstreams: Vec<UpstreamConfig>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::Validation(
                "bind_address cannot be empty".to_string(),
            ));
        }

        if self.primary_upstreams.is_empty() {
            return Err(ConfigError::Validation(
                "No primary upstreams configured".to_string(),
            ));
        }

        for upstream in self
            .primary_upstreams
            .iter()
            .chain(self.alternative_upstreams.iter())
        {
            upstream.validate()?;
        }

        Ok(())
    }
}

fn default_matcher() -> String {
    "suffix-tree".to_string()
}
