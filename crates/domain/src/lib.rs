//! Horizon DNS domain layer: configuration model and error taxonomy.

pub mod config;
pub mod errors;

pub use config::{
    AnswerNonePolicy, Config, DomainFileConfig, EdnsConfig, EdnsPolicy, FilesConfig,
    IpNetworkFileConfig, LoggingConfig, Protocol, RoutingConfig, ServerConfig, TcpPoolConfig,
    UpstreamConfig,
};
pub use errors::{ConfigError, DnsError, PatternError};
