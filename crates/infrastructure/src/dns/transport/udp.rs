use super::{decode, encode, RemoteResolver};
use async_trait::async_trait;
use hickory_proto::op::Message;
use horizon_dns_domain::DnsError;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0).
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Plain UDP transport: one ephemeral socket per exchange.
pub struct UdpTransport {
    address: String,
    timeout: Duration,
    proxied: bool,
}

impl UdpTransport {
    pub fn new(address: String, timeout: Duration, proxied: bool) -> Self {
        Self {
            address,
            timeout,
            proxied,
        }
    }
}

#[async_trait]
impl RemoteResolver for UdpTransport {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError> {
        if self.proxied {
            return Err(DnsError::ProxyUnsupported("udp"));
        }

        let message_bytes = encode(query)?;

        let bind_addr = if self.address.starts_with('[') {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;

        tokio::time::timeout(self.timeout, socket.send_to(&message_bytes, &self.address))
            .await
            .map_err(|_| DnsError::Timeout(self.address.clone()))?
            .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (received, from_addr) =
            tokio::time::timeout(self.timeout, socket.recv_from(&mut recv_buf))
                .await
                .map_err(|_| DnsError::Timeout(self.address.clone()))?
                .map_err(|e| DnsError::Transport(self.address.clone(), e.to_string()))?;

        debug!(server = %self.address, bytes = received, "UDP response received");
        if from_addr.to_string() != self.address {
            warn!(
                expected = %self.address,
                received_from = %from_addr,
                "UDP response from unexpected source"
            );
        }

        recv_buf.truncate(received);
        decode(&recv_buf)
    }

    fn protocol_name(&self) -> &'static str {
        "udp"
    }
}
