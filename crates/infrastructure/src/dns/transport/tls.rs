//! DNS-over-TLS transport (RFC 7858).
//!
//! One shared rustls `ClientConfig` with webpki roots; idle connections are
//! pooled per (dial address, SNI hostname) so repeat queries skip the
//! TCP+TLS handshake.

use super::tcp::{read_with_length_prefix, send_with_length_prefix};
use super::{decode, encode, RemoteResolver};
use async_trait::async_trait;
use dashmap::DashMap;
use hickory_proto::op::Message;
use horizon_dns_domain::{DnsError, TcpPoolConfig};
use rustls::pki_types::ServerName;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

static SHARED_TLS_CONFIG: LazyLock<Arc<rustls::ClientConfig>> = LazyLock::new(|| {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
});

static TLS_POOL: LazyLock<DashMap<(String, String), Vec<(TlsStream<TcpStream>, Instant)>>> =
    LazyLock::new(DashMap::new);

/// DNS-over-TLS transport. The configured address is `hostname:port`
/// (hostname doubles as dial target and SNI) or `hostname@ip:port`
/// (dial the ip, verify against the hostname).
pub struct TlsTransport {
    dial_addr: String,
    hostname: String,
    timeout: Duration,
    pool: TcpPoolConfig,
    proxied: bool,
}

impl TlsTransport {
    pub fn new(address: &str, timeout: Duration, pool: TcpPoolConfig, proxied: bool) -> Self {
        let (hostname, dial_addr) = split_tls_address(address);
        Self {
            dial_addr,
            hostname,
            timeout,
            pool,
            proxied,
        }
    }

    fn pool_key(&self) -> (String, String) {
        (self.dial_addr.clone(), self.hostname.clone())
    }

    fn take_pooled(&self) -> Option<TlsStream<TcpStream>> {
        let mut entry = TLS_POOL.get_mut(&self.pool_key())?;
        let idle_limit = Duration::from_secs(self.pool.idle_timeout_secs);
        while let Some((stream, parked_at)) = entry.pop() {
            if parked_at.elapsed() < idle_limit {
                return Some(stream);
            }
        }
        None
    }

    fn return_to_pool(&self, stream: TlsStream<TcpStream>) {
        let mut entry = TLS_POOL.entry(self.pool_key()).or_default();
        if entry.len() < self.pool.max {
            entry.push((stream, Instant::now()));
        }
    }

    async fn connect_new(&self) -> Result<TlsStream<TcpStream>, DnsError> {
        let connector = tokio_rustls::TlsConnector::from(SHARED_TLS_CONFIG.clone());
        let server_name = ServerName::try_from(self.hostname.clone())
            .map_err(|e| DnsError::InvalidAddress(self.hostname.clone(), e.to_string()))?;

        let tcp_stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.dial_addr))
            .await
            .map_err(|_| DnsError::Timeout(self.dial_addr.clone()))?
            .map_err(|e| DnsError::Transport(self.dial_addr.clone(), e.to_string()))?;

        let tls_stream =
            tokio::time::timeout(self.timeout, connector.connect(server_name, tcp_stream))
                .await
                .map_err(|_| DnsError::Timeout(self.dial_addr.clone()))?
                .map_err(|e| DnsError::Transport(self.dial_addr.clone(), e.to_string()))?;

        debug!(server = %self.dial_addr, sni = %self.hostname, "TLS connection established");
        Ok(tls_stream)
    }
}

#[async_trait]
impl RemoteResolver for TlsTransport {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError> {
        if self.proxied {
            return Err(DnsError::ProxyUnsupported("tls"));
        }

        let message_bytes = encode(query)?;

        let mut stream = match self.take_pooled() {
            Some(mut pooled) => {
                match tokio::time::timeout(
                    self.timeout,
                    send_with_length_prefix(&mut pooled, &message_bytes),
                )
                .await
                {
                    Ok(Ok(())) => pooled,
                    _ => {
                        let mut fresh = self.connect_new().await?;
                        tokio::time::timeout(
                            self.timeout,
                            send_with_length_prefix(&mut fresh, &message_bytes),
                        )
                        .await
                        .map_err(|_| DnsError::Timeout(self.dial_addr.clone()))?
                        .map_err(|e| DnsError::Transport(self.dial_addr.clone(), e.to_string()))?;
                        fresh
                    }
                }
            }
            None => {
                let mut fresh = self.connect_new().await?;
                tokio::time::timeout(
                    self.timeout,
                    send_with_length_prefix(&mut fresh, &message_bytes),
                )
                .await
                .map_err(|_| DnsError::Timeout(self.dial_addr.clone()))?
                .map_err(|e| DnsError::Transport(self.dial_addr.clone(), e.to_string()))?;
                fresh
            }
        };

        let response_bytes =
            tokio::time::timeout(self.timeout, read_with_length_prefix(&mut stream))
                .await
                .map_err(|_| DnsError::Timeout(self.dial_addr.clone()))?
                .map_err(|e| DnsError::Transport(self.dial_addr.clone(), e.to_string()))?;

        self.return_to_pool(stream);
        decode(&response_bytes)
    }

    fn protocol_name(&self) -> &'static str {
        "tls"
    }
}

/// `dns.example@9.9.9.9:853` → SNI `dns.example`, dial `9.9.9.9:853`.
/// `dns.example:853` → SNI `dns.example`, dial `dns.example:853`.
fn split_tls_address(address: &str) -> (String, String) {
    if let Some((hostname, dial)) = address.split_once('@') {
        return (hostname.to_string(), dial.to_string());
    }
    let hostname = address.rsplit_once(':').map_or(address, |(host, _)| host);
    (hostname.to_string(), address.to_string())
}
