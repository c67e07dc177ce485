//! Per-query fan-out across one upstream group.
//!
//! Every configured upstream gets its own EDNS-annotated copy of the
//! question, all exchanges run concurrently, and results fan in over a
//! channel sized to the upstream count so a straggler's send never blocks
//! after the bundle has already settled. Stragglers run to completion in
//! the background; their replies land in the buffer and are dropped with it.

use super::cache::{CacheKey, MessageCache};
use super::client::{ClientReply, RemoteClient, Upstream};
use super::ttl;
use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct ClientBundle {
    name: &'static str,
    clients: Vec<RemoteClient>,
    response: Option<Message>,
    winner_key: Option<CacheKey>,
    minimum_ttl: u32,
    ttl_overrides: Arc<FxHashMap<String, u32>>,
    cache: Arc<MessageCache>,
}

impl ClientBundle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        query: &Message,
        upstreams: &[Upstream],
        inbound_ip: &str,
        minimum_ttl: u32,
        ttl_overrides: Arc<FxHashMap<String, u32>>,
        cache: Arc<MessageCache>,
    ) -> Self {
        let clients = upstreams
            .iter()
            .map(|u| RemoteClient::new(query, u.clone(), inbound_ip, Arc::clone(&cache)))
            .collect();
        Self {
            name,
            clients,
            response: None,
            winner_key: None,
            minimum_ttl,
            ttl_overrides,
            cache,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }

    /// Probe the cache under each client's subnet-specific key; the first
    /// live entry wins.
    pub fn exchange_from_cache(&mut self) -> Option<Message> {
        for client in &self.clients {
            if let Some(message) = client.exchange_from_cache() {
                self.response = Some(message.clone());
                return Some(message);
            }
        }
        None
    }

    /// Race every upstream. The first response with answers wins
    /// immediately; when every upstream responds but none carries an
    /// answer, the last answer-empty response stands in, distinguishing
    /// "reachable but empty" from "unreachable". Zero upstreams yield
    /// nothing.
    pub async fn exchange(&mut self, cache_result: bool) -> Option<Message> {
        if self.clients.is_empty() {
            return None;
        }

        let (tx, mut rx) = mpsc::channel(self.clients.len());
        for client in &self.clients {
            let client = client.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(client.exchange().await).await;
            });
        }
        drop(tx);

        let mut winner: Option<ClientReply> = None;
        let mut last_empty: Option<ClientReply> = None;
        while let Some(result) = rx.recv().await {
            if let Some(reply) = result {
                if reply.response.answers().is_empty() {
                    last_empty = Some(reply);
                } else {
                    winner = Some(reply);
                    break;
                }
            }
        }

        let reply = winner.or(last_empty)?;
        debug!(
            bundle = self.name,
            upstream = %reply.upstream_name,
            answers = reply.response.answers().len(),
            "Upstream response selected"
        );

        let mut response = reply.response;
        ttl::set_minimum_ttl(&mut response, self.minimum_ttl);
        ttl::set_ttl_by_map(&mut response, &self.ttl_overrides);

        self.winner_key = reply.cache_key;
        self.response = Some(response);
        if cache_result {
            self.cache_result_if_needed();
        }
        self.response.clone()
    }

    /// Store the settled response under the winner's key. The cache's
    /// first-writer-wins rule makes this a no-op for keys already present.
    pub fn cache_result_if_needed(&self) {
        if let (Some(response), Some(key)) = (&self.response, &self.winner_key) {
            self.cache.insert(key.clone(), response, self.minimum_ttl);
        }
    }
}
