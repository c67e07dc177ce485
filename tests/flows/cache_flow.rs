//! Cache round-trips through the whole dispatcher, including
//! subnet-distinct entries for clients behind different networks.

#[path = "../common/mock.rs"]
mod mock;

use horizon_dns_domain::{AnswerNonePolicy, EdnsConfig, EdnsPolicy};
use horizon_dns_infrastructure::dns::cache::MessageCache;
use horizon_dns_infrastructure::dns::dispatcher::Dispatcher;
use horizon_dns_infrastructure::dns::matcher::DomainMatcher;
use mock::{a_query, answer_addrs, scripted_upstream, ScriptedUpstream};
use rustc_hash::FxHashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn dispatcher(primary: &ScriptedUpstream, cache_capacity: usize) -> Dispatcher {
    Dispatcher {
        primary_upstreams: vec![primary.upstream.clone()],
        alternative_upstreams: Vec::new(),
        only_primary: true,
        ipv6_use_alternative: false,
        alternative_concurrent: false,
        when_primary_answer_none: AnswerNonePolicy::Primary,
        minimum_ttl: 0,
        ttl_overrides: Arc::new(FxHashMap::default()),
        reject_qtypes: Vec::new(),
        primary_matcher: Arc::new(DomainMatcher::from_kind("suffix-tree").unwrap()),
        alternative_matcher: Arc::new(DomainMatcher::from_kind("suffix-tree").unwrap()),
        primary_ip_set: None,
        alternative_ip_set: None,
        hosts: None,
        cache: Arc::new(MessageCache::new(cache_capacity)),
    }
}

#[tokio::test]
async fn repeat_query_is_served_from_cache() {
    let primary = scripted_upstream("clean", Some(("93.184.216.34", 300)), EdnsConfig::default());
    let d = dispatcher(&primary, 64);

    let first = d
        .exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();
    assert_eq!(answer_addrs(&first), vec!["93.184.216.34"]);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);

    let repeat_query = a_query("www.example.com.");
    let repeat = d.exchange(&repeat_query, "203.0.113.5").await.unwrap();

    assert_eq!(primary.calls.load(Ordering::SeqCst), 1, "no new exchange");
    assert_eq!(answer_addrs(&repeat), vec!["93.184.216.34"]);
    assert_eq!(repeat.id(), repeat_query.id());
    assert!(!repeat.truncated());
    // Remaining TTL, not the stored one, is advertised.
    assert!(repeat.answers()[0].ttl() <= 300);
    assert!(repeat.answers()[0].ttl() >= 298);
}

#[tokio::test]
async fn different_subnets_get_distinct_entries() {
    // Auto policy annotates each public client address, so the two clients
    // key different cache slots and each triggers its own exchange.
    let edns = EdnsConfig {
        policy: EdnsPolicy::Auto,
        external_ip: None,
    };
    let primary = scripted_upstream("clean", Some(("93.184.216.34", 300)), edns);
    let d = dispatcher(&primary, 64);

    d.exchange(&a_query("www.example.com."), "198.51.100.4")
        .await
        .unwrap();
    d.exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    assert_eq!(d.cache.len(), 2);

    // Repeats from both clients now hit their own entries.
    d.exchange(&a_query("www.example.com."), "198.51.100.4")
        .await
        .unwrap();
    d.exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn disabled_cache_always_exchanges() {
    let primary = scripted_upstream("clean", Some(("93.184.216.34", 300)), EdnsConfig::default());
    let d = dispatcher(&primary, 0);

    d.exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();
    d.exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_responses_are_cached_with_fallback_ttl() {
    let primary = scripted_upstream("clean", None, EdnsConfig::default());
    let mut d = dispatcher(&primary, 64);
    d.minimum_ttl = 30;

    let response = d
        .exchange(&a_query("nothing.example."), "203.0.113.5")
        .await
        .unwrap();
    assert!(response.answers().is_empty());
    assert_eq!(d.cache.len(), 1);

    d.exchange(&a_query("nothing.example."), "203.0.113.5")
        .await
        .unwrap();
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
}
