use super::{decode, encode, RemoteResolver};
use async_trait::async_trait;
use dashmap::DashMap;
use hickory_proto::op::Message;
use horizon_dns_domain::{DnsError, TcpPoolConfig};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// Idle connections per upstream address, stamped with their checkout-in
/// time so stale ones can be dropped.
static TCP_POOL: LazyLock<DashMap<String, Vec<(TcpStream, Instant)>>> = LazyLock::new(DashMap::new);

/// TCP transport with a 2-byte length prefix and an idle-connection pool.
pub struct TcpTransport {
    address: String,
    timeout: Duration,
    pool: TcpPoolConfig,
    proxied: bool,
}

impl TcpTransport {
    pub fn new(address: String, timeout: Duration, pool: TcpPoolConfig, proxied: bool) -> Self {
        Self {
            address,
            timeout,
            pool,
            proxied,
        }
    }

    fn take_pooled(&self) -> Option<TcpStream> {
        let mut entry = TCP_POOL.get_mut(&self.address)?;
        let idle_limit = Duration::from_secs(self.pool.idle_timeout_secs);
        while let Some((stream, parked_at)) = entry.pop() {
            if parked_at.elapsed() < idle_limit {
                return Some(stream);
            }
            // Stale: drop it and keep looking.
        }
        None
    }

    fn return_to_pool(&self, stream: TcpStream) {
        let mut entry = TCP_POOL.entry(self.address.clone()).or_default();
        if entry.len() < self.pool.max {
            entry.push((stream, Instant::now()));
        }
    }

    async fn connect_new(&self) -> Result<TcpStream, DnsError> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| DnsError::Timeout(self.address.clone()))?
            .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;
        Ok(stream)
    }
}

#[async_trait]
impl RemoteResolver for TcpTransport {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError> {
        if self.proxied {
            return Err(DnsError::ProxyUnsupported("tcp"));
        }

        let message_bytes = encode(query)?;

        // A pooled connection may have been closed by the peer; retry the
        // write once on a fresh one before giving up.
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
                        .map_err(|_| DnsError::Timeout(self.address.clone()))?
                        .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;
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
                .map_err(|_| DnsError::Timeout(self.address.clone()))?
                .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;
                fresh
            }
        };

        let response_bytes =
            tokio::time::timeout(self.timeout, read_with_length_prefix(&mut stream))
                .await
                .map_err(|_| DnsError::Timeout(self.address.clone()))?
                .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;

        debug!(server = %self.address, bytes = response_bytes.len(), "TCP response received");
        self.return_to_pool(stream);
        decode(&response_bytes)
    }

    fn protocol_name(&self) -> &'static str {
        "tcp"
    }
}

/// Write `message` framed with the RFC 1035 2-byte length prefix.
pub(crate) async fn send_with_length_prefix<S>(
    stream: &mut S,
    message: &[u8],
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let len = (message.len().min(MAX_TCP_MESSAGE_SIZE)) as u16;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&message[..len as usize]).await?;
    stream.flush().await
}

/// Read one length-prefixed DNS message.
pub(crate) async fn read_with_length_prefix<S>(stream: &mut S) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut message = vec![0u8; len];
    stream.read_exact(&mut message).await?;
    Ok(message)
}
