//! DNS-over-HTTPS transport (RFC 8484): POST the wire-format query over a
//! pooled HTTP/2 connection.

use super::{decode, encode, RemoteResolver};
use async_trait::async_trait;
use hickory_proto::op::Message;
use horizon_dns_domain::{ConfigError, DnsError};
use std::time::Duration;
use tracing::debug;

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

pub struct HttpsTransport {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(url: String, timeout: Duration, socks5: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .pool_max_idle_per_host(4);

        if let Some(proxy_addr) = socks5 {
            let proxy = reqwest::Proxy::all(format!("socks5h://{proxy_addr}"))
                .map_err(|e| ConfigError::Validation(format!("bad SOCKS5 proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::Validation(format!("building DoH client failed: {e}")))?;

        Ok(Self {
            url,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl RemoteResolver for HttpsTransport {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError> {
        let message_bytes = encode(query)?;

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&self.url)
                .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
                .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
                .body(message_bytes)
                .send(),
        )
        .await
        .map_err(|_| DnsError::Timeout(self.url.clone()))?
        .map_err(|e| DnsError::Transport(self.url.clone(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DnsError::Transport(
                self.url.clone(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let response_bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| DnsError::Timeout(self.url.clone()))?
            .map_err(|e| DnsError::Transport(self.url.clone(), e.to_string()))?;

        debug!(url = %self.url, bytes = response_bytes.len(), "DoH response received");
        decode(&response_bytes)
    }

    fn protocol_name(&self) -> &'static str {
        "https"
    }
}
