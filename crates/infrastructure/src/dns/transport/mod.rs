pub mod tcp;
pub mod udp;

#[cfg(feature = "dns-over-https")]
pub mod https;
#[cfg(feature = "dns-over-rustls")]
pub mod tls;

use async_trait::async_trait;
use hickory_proto::op::Message;
use horizon_dns_domain::{ConfigError, DnsError, Protocol, UpstreamConfig};
use std::time::Duration;
use tracing::warn;

/// One remote exchange: hand a query message to an upstream, get its
/// response back. Implementations own every wire-level detail, including
/// their own timeouts; the engine only sees `Ok(response)` or an error that
/// downgrades this upstream to "no response" for the current query.
#[async_trait]
pub trait RemoteResolver: Send + Sync {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError>;

    fn protocol_name(&self) -> &'static str;
}

/// Enum-dispatched transport, one variant per upstream protocol.
pub enum Transport {
    Udp(udp::UdpTransport),
    Tcp(tcp::TcpTransport),
    #[cfg(feature = "dns-over-rustls")]
    Tls(tls::TlsTransport),
    #[cfg(feature = "dns-over-https")]
    Https(https::HttpsTransport),
}

#[async_trait]
impl RemoteResolver for Transport {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError> {
        match self {
            Self::Udp(t) => t.exchange(query).await,
            Self::Tcp(t) => t.exchange(query).await,
            #[cfg(feature = "dns-over-rustls")]
            Self::Tls(t) => t.exchange(query).await,
            #[cfg(feature = "dns-over-https")]
            Self::Https(t) => t.exchange(query).await,
        }
    }

    fn protocol_name(&self) -> &'static str {
        match self {
            Self::Udp(_) => "udp",
            Self::Tcp(_) => "tcp",
            #[cfg(feature = "dns-over-rustls")]
            Self::Tls(_) => "tls",
            #[cfg(feature = "dns-over-https")]
            Self::Https(_) => "https",
        }
    }
}

/// Build the transport for one configured upstream.
pub fn create_transport(config: &UpstreamConfig) -> Result<Transport, ConfigError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    if config.socks5.is_some() && config.protocol != Protocol::Https {
        warn!(
            upstream = %config.name,
            protocol = config.protocol.as_str(),
            "SOCKS5 proxy is only supported for https upstreams; exchanges will fail"
        );
    }

    Ok(match config.protocol {
        Protocol::Udp => Transport::Udp(udp::UdpTransport::new(
            config.address.clone(),
            timeout,
            config.socks5.is_some(),
        )),
        Protocol::Tcp => Transport::Tcp(tcp::TcpTransport::new(
            config.address.clone(),
            timeout,
            config.tcp_pool.clone(),
            config.socks5.is_some(),
        )),
        #[cfg(feature = "dns-over-rustls")]
        Protocol::Tls => Transport::Tls(tls::TlsTransport::new(
            &config.address,
            timeout,
            config.tcp_pool.clone(),
            config.socks5.is_some(),
        )),
        #[cfg(not(feature = "dns-over-rustls"))]
        Protocol::Tls => {
            return Err(ConfigError::Validation(format!(
                "upstream '{}': built without dns-over-rustls support",
                config.name
            )))
        }
        #[cfg(feature = "dns-over-https")]
        Protocol::Https => Transport::Https(https::HttpsTransport::new(
            config.address.clone(),
            timeout,
            config.socks5.as_deref(),
        )?),
        #[cfg(not(feature = "dns-over-https"))]
        Protocol::Https => {
            return Err(ConfigError::Validation(format!(
                "upstream '{}': built without dns-over-https support",
                config.name
            )))
        }
    })
}

pub(crate) fn encode(query: &Message) -> Result<Vec<u8>, DnsError> {
    query.to_vec().map_err(|e| DnsError::Codec(e.to_string()))
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Message, DnsError> {
    Message::from_vec(bytes).map_err(|e| DnsError::Codec(e.to_string()))
}
