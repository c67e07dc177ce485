use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
    Tls,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Https => "https",
        }
    }
}

/// EDNS-client-subnet annotation policy for one upstream.
///
/// `auto` forwards the inbound client address unless it is from a reserved
/// network, in which case the configured external IP stands in. `manual`
/// always uses the external IP. `disable` annotates nothing.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdnsPolicy {
    Auto,
    Manual,
    #[default]
    Disable,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EdnsConfig {
    #[serde(default)]
    pub policy: EdnsPolicy,

    #[serde(default)]
    pub external_ip: Option<String>,
}

/// Idle-connection pool tuning for stream transports (TCP, DoT).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TcpPoolConfig {
    #[serde(default = "default_pool_initial")]
    pub initial: usize,

    #[serde(default = "default_pool_max")]
    pub max: usize,

    #[serde(default = "default_pool_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for TcpPoolConfig {
    fn default() -> Self {
        Self {
            initial: default_pool_initial(),
            max: default_pool_max(),
            idle_timeout_secs: default_pool_idle_timeout(),
        }
    }
}

/// One configured remote DNS server.
///
/// `address` is `ip:port` for udp/tcp, `hostname:port` or `hostname@ip:port`
/// for tls (the hostname part becomes the SNI), and a full URL for https.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    pub name: String,

    pub address: String,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional SOCKS5 proxy, `host:port`.
    #[serde(default)]
    pub socks5: Option<String>,

    #[serde(default)]
    pub edns: EdnsConfig,

    #[serde(default)]
    pub tcp_pool: TcpPoolConfig,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation(
                "upstream name cannot be empty".to_string(),
            ));
        }
        if self.address.is_empty() {
            return Err(ConfigError::Validation(format!(
                "upstream '{}' has no address",
                self.name
            )));
        }
        match self.protocol {
            Protocol::Https => {
                if !self.address.starts_with("https://") {
                    return Err(ConfigError::Validation(format!(
                        "upstream '{}': https protocol requires an https:// URL",
                        self.name
                    )));
                }
            }
            _ => {
                if !self.address.contains(':') {
                    return Err(ConfigError::Validation(format!(
                        "upstream '{}': address must include a port",
                        self.name
                    )));
                }
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "upstream '{}': timeout must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    6
}

fn default_pool_initial() -> usize {
    1
}

fn default_pool_max() -> usize {
    4
}

fn default_pool_idle_timeout() -> u64 {
    30
}
