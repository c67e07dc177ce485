use super::cache::{CacheKey, MessageCache};
use super::edns;
use super::transport::RemoteResolver;
use hickory_proto::op::Message;
use horizon_dns_domain::UpstreamConfig;
use std::sync::Arc;
use tracing::debug;

/// One configured upstream paired with its transport. Built once per
/// runtime snapshot and shared by every query.
#[derive(Clone)]
pub struct Upstream {
    pub config: Arc<UpstreamConfig>,
    pub resolver: Arc<dyn RemoteResolver>,
}

impl Upstream {
    pub fn new(config: UpstreamConfig, resolver: Arc<dyn RemoteResolver>) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
        }
    }
}

/// What one upstream produced for a query, plus the key its bundle would
/// cache the response under.
pub struct ClientReply {
    pub response: Message,
    pub cache_key: Option<CacheKey>,
    pub upstream_name: Arc<str>,
}

/// Ephemeral per-query view of one upstream: the question copy, the subnet
/// address this upstream's policy selects, and the shared cache handle.
#[derive(Clone)]
pub struct RemoteClient {
    question: Message,
    upstream: Upstream,
    subnet_ip: String,
    cache: Arc<MessageCache>,
}

impl RemoteClient {
    pub fn new(
        query: &Message,
        upstream: Upstream,
        inbound_ip: &str,
        cache: Arc<MessageCache>,
    ) -> Self {
        let subnet_ip = edns::resolve_subnet_ip(&upstream.config.edns, inbound_ip);
        Self {
            question: query.clone(),
            upstream,
            subnet_ip,
            cache,
        }
    }

    pub fn cache_key(&self) -> Option<CacheKey> {
        CacheKey::from_question(&self.question, &self.subnet_ip)
    }

    /// Probe the cache under this client's subnet-specific key.
    pub fn exchange_from_cache(&self) -> Option<Message> {
        let key = self.cache_key()?;
        let message = self.cache.hit(&key, self.question.id())?;
        debug!(key = %key, "Cache hit");
        Some(message)
    }

    /// One remote exchange with this client's own EDNS-annotated question
    /// copy. A transport failure is logged and becomes "no reply" for this
    /// upstream alone; siblings keep racing.
    pub async fn exchange(&self) -> Option<ClientReply> {
        let mut question = self.question.clone();
        edns::append_subnet(&mut question, &self.subnet_ip);

        match self.upstream.resolver.exchange(&question).await {
            Ok(response) => Some(ClientReply {
                response,
                cache_key: self.cache_key(),
                upstream_name: Arc::from(self.upstream.config.name.as_str()),
            }),
            Err(e) => {
                debug!(upstream = %self.upstream.config.name, error = %e, "Upstream exchange failed");
                None
            }
        }
    }
}
