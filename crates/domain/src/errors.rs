use thiserror::Error;

/// Fatal configuration problems. These abort startup; nothing here is
/// recoverable at query time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Unknown domain matcher '{0}'")]
    UnknownMatcher(String),
}

/// A pattern that could not be turned into a matcher entry. Never fatal:
/// loaders log and skip the line.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid regex '{0}': {1}")]
    Regex(String, String),

    #[error("Invalid mix entry '{0}'")]
    MixFormat(String),

    #[error("Unknown mix tag '{0}'")]
    MixTag(String),

    #[error("Empty pattern")]
    Empty,
}

/// Per-query failures. A `DnsError` never outlives the upstream exchange
/// that produced it: the owning client downgrades it to "no response".
#[derive(Debug, Error)]
pub enum DnsError {
    #[error("Invalid upstream address '{0}': {1}")]
    InvalidAddress(String, String),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Transport error for {0}: {1}")]
    Transport(String, String),

    #[error("Failed to decode DNS message: {0}")]
    Codec(String),

    #[error("SOCKS5 proxy is not supported for the {0} protocol")]
    ProxyUnsupported(&'static str),
}
