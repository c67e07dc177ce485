//! The per-query dispatch state machine.
//!
//! local → cache → policy routing → race-and-classify. A `Dispatcher` is an
//! immutable snapshot: reload builds a fresh one and swaps it in wholesale,
//! so a query in flight keeps the classifiers it started with.

use super::bundle::ClientBundle;
use super::cache::MessageCache;
use super::client::Upstream;
use super::hosts::HostsTable;
use super::ip_set::{self, IpSet};
use super::local::LocalClient;
use super::matcher::DomainMatcher;
use hickory_proto::op::Message;
use hickory_proto::rr::{RData, RecordType};
use horizon_dns_domain::AnswerNonePolicy;
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct Dispatcher {
    pub primary_upstreams: Vec<Upstream>,
    pub alternative_upstreams: Vec<Upstream>,

    pub only_primary: bool,
    pub ipv6_use_alternative: bool,
    pub alternative_concurrent: bool,
    pub when_primary_answer_none: AnswerNonePolicy,

    pub minimum_ttl: u32,
    pub ttl_overrides: Arc<FxHashMap<String, u32>>,
    pub reject_qtypes: Vec<u16>,

    pub primary_matcher: Arc<DomainMatcher>,
    pub alternative_matcher: Arc<DomainMatcher>,
    pub primary_ip_set: Option<Arc<IpSet>>,
    pub alternative_ip_set: Option<Arc<IpSet>>,

    pub hosts: Option<Arc<HostsTable>>,
    pub cache: Arc<MessageCache>,
}

enum Selection {
    Primary,
    Alternative,
}

/// The alternative bundle during race-and-classify: either already racing
/// on its own task (eager-concurrent mode) or still parked.
enum AltState {
    Eager(JoinHandle<ClientBundle>),
    Lazy(ClientBundle),
}

impl Dispatcher {
    /// Resolve one query. `None` means total dispatch failure; the boundary
    /// maps it to a protocol-level failure response.
    pub async fn exchange(&self, query: &Message, inbound_ip: &str) -> Option<Message> {
        let question = match query.queries().first() {
            Some(q) => q,
            None => {
                warn!("Query without a question section");
                return None;
            }
        };
        let domain_owned = question.name().to_utf8();
        let domain = domain_owned.trim_end_matches('.');
        let qtype = question.query_type();

        let local = LocalClient::new(
            query,
            self.hosts.as_deref(),
            self.minimum_ttl,
            &self.ttl_overrides,
        );
        if let Some(response) = local.exchange() {
            debug!(domain = %domain, "Resolved locally");
            return Some(response);
        }

        let mut primary = self.bundle("Primary", &self.primary_upstreams, query, inbound_ip);
        let mut alternative =
            self.bundle("Alternative", &self.alternative_upstreams, query, inbound_ip);

        for bundle in [&mut primary, &mut alternative] {
            if let Some(response) = bundle.exchange_from_cache() {
                debug!(domain = %domain, bundle = bundle.name(), "Resolved from cache");
                return Some(response);
            }
        }

        if self.only_primary || self.matches_list(&self.primary_matcher, domain, "Primary") {
            debug!(domain = %domain, "Finally using primary");
            return primary.exchange(true).await;
        }

        if (qtype == RecordType::AAAA && self.ipv6_use_alternative)
            || self.matches_list(&self.alternative_matcher, domain, "Alternative")
        {
            debug!(domain = %domain, "Finally using alternative");
            return alternative.exchange(true).await;
        }

        self.race_and_classify(primary, alternative).await
    }

    fn bundle(
        &self,
        name: &'static str,
        upstreams: &[Upstream],
        query: &Message,
        inbound_ip: &str,
    ) -> ClientBundle {
        ClientBundle::new(
            name,
            query,
            upstreams,
            inbound_ip,
            self.minimum_ttl,
            Arc::clone(&self.ttl_overrides),
            Arc::clone(&self.cache),
        )
    }

    fn matches_list(&self, matcher: &DomainMatcher, domain: &str, side: &str) -> bool {
        if matcher.has(domain) {
            debug!(domain = %domain, list = side, matcher = matcher.name(), "Domain list matched");
            return true;
        }
        false
    }

    /// Exchange with the primary group and pick a side from its result.
    /// The alternative exchange may be pre-issued purely to save latency;
    /// its result is only ever used if the alternative side is selected.
    async fn race_and_classify(
        &self,
        mut primary: ClientBundle,
        alternative: ClientBundle,
    ) -> Option<Message> {
        let alt_state = if self.alternative_concurrent {
            AltState::Eager(tokio::spawn(async move {
                let mut alternative = alternative;
                alternative.exchange(false).await;
                alternative
            }))
        } else {
            AltState::Lazy(alternative)
        };

        let primary_response = primary.exchange(false).await;

        let selection = match &primary_response {
            None => {
                debug!("Primary returned nothing, falling back to alternative");
                Selection::Alternative
            }
            Some(response) if response.answers().is_empty() => {
                match self.when_primary_answer_none {
                    AnswerNonePolicy::Alternative => {
                        debug!("Primary answer section is empty, policy picks alternative");
                        Selection::Alternative
                    }
                    AnswerNonePolicy::Primary => {
                        debug!("Primary answer section is empty, policy keeps primary");
                        Selection::Primary
                    }
                }
            }
            Some(response) => self.classify_answers(response),
        };

        match selection {
            Selection::Primary => {
                primary.cache_result_if_needed();
                primary_response
            }
            Selection::Alternative => Self::finish_alternative(alt_state).await,
        }
    }

    /// Test each A/AAAA answer address against the primary set, then the
    /// alternative set; the first containment decides. No containment at
    /// all defaults to the alternative side.
    fn classify_answers(&self, response: &Message) -> Selection {
        for answer in response.answers() {
            let ip: IpAddr = match answer.data() {
                RData::A(a) => IpAddr::V4(a.0),
                RData::AAAA(aaaa) => IpAddr::V6(aaaa.0),
                _ => continue,
            };
            if ip_set::contains(self.primary_ip_set.as_deref(), ip, true, "primary") {
                debug!(ip = %ip, "Finally using primary");
                return Selection::Primary;
            }
            if ip_set::contains(self.alternative_ip_set.as_deref(), ip, true, "alternative") {
                debug!(ip = %ip, "Finally using alternative");
                return Selection::Alternative;
            }
        }
        debug!("No IP network matched, finally using alternative");
        Selection::Alternative
    }

    async fn finish_alternative(alt_state: AltState) -> Option<Message> {
        match alt_state {
            AltState::Lazy(mut alternative) => alternative.exchange(true).await,
            AltState::Eager(handle) => match handle.await {
                Ok(alternative) => {
                    alternative.cache_result_if_needed();
                    alternative.response().cloned()
                }
                Err(e) => {
                    warn!(error = %e, "Pre-issued alternative exchange failed");
                    None
                }
            },
        }
    }
}
