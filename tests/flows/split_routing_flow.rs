//! End-to-end split routing: domain lists, IP-network classification and
//! TTL normalization working together on one dispatcher snapshot.

#[path = "../common/mock.rs"]
mod mock;

use hickory_proto::rr::RecordType;
use horizon_dns_domain::{AnswerNonePolicy, EdnsConfig};
use horizon_dns_infrastructure::dns::cache::MessageCache;
use horizon_dns_infrastructure::dns::dispatcher::Dispatcher;
use horizon_dns_infrastructure::dns::hosts::HostsTable;
use horizon_dns_infrastructure::dns::ip_set::IpSet;
use horizon_dns_infrastructure::dns::matcher::DomainMatcher;
use horizon_dns_infrastructure::dns::ttl;
use mock::{a_query, answer_addrs, scripted_upstream, typed_query, ScriptedUpstream};
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct World {
    dispatcher: Dispatcher,
    primary: ScriptedUpstream,
    alternative: ScriptedUpstream,
}

/// Primary serves "domestic" space 93.184.0.0/16 and carries bank.example
/// in its domain list; alternative handles the rest.
fn world() -> World {
    let primary = scripted_upstream("domestic", Some(("93.184.216.34", 4)), EdnsConfig::default());
    let alternative =
        scripted_upstream("foreign", Some(("203.0.113.80", 600)), EdnsConfig::default());

    let mut primary_matcher = DomainMatcher::from_kind("suffix-tree").unwrap();
    primary_matcher.insert("bank.example").unwrap();

    let dispatcher = Dispatcher {
        primary_upstreams: vec![primary.upstream.clone()],
        alternative_upstreams: vec![alternative.upstream.clone()],
        only_primary: false,
        ipv6_use_alternative: true,
        alternative_concurrent: false,
        when_primary_answer_none: AnswerNonePolicy::Primary,
        minimum_ttl: 60,
        ttl_overrides: Arc::new(ttl::overrides_from_lines(["pinned.example 15"])),
        reject_qtypes: Vec::new(),
        primary_matcher: Arc::new(primary_matcher),
        alternative_matcher: Arc::new(DomainMatcher::from_kind("suffix-tree").unwrap()),
        primary_ip_set: IpSet::from_lines(["93.184.0.0/16"]).map(Arc::new),
        alternative_ip_set: None,
        hosts: Some(Arc::new(HostsTable::from_lines(["10.0.0.9 printer.lan"]))),
        cache: Arc::new(MessageCache::new(128)),
    };

    World {
        dispatcher,
        primary,
        alternative,
    }
}

#[tokio::test]
async fn hosts_entry_short_circuits_upstreams() {
    let w = world();
    let response = w
        .dispatcher
        .exchange(&a_query("printer.lan."), "203.0.113.5")
        .await
        .unwrap();

    assert_eq!(answer_addrs(&response), vec!["10.0.0.9"]);
    assert_eq!(w.primary.calls.load(Ordering::SeqCst), 0);
    assert_eq!(w.alternative.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn primary_list_domain_never_reaches_alternative() {
    let w = world();
    let response = w
        .dispatcher
        .exchange(&a_query("secure.bank.example."), "203.0.113.5")
        .await
        .unwrap();

    assert_eq!(answer_addrs(&response), vec!["93.184.216.34"]);
    assert_eq!(w.alternative.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn aaaa_redirect_wins_over_classification() {
    let w = world();
    let response = w
        .dispatcher
        .exchange(&typed_query("www.example.com.", RecordType::AAAA), "203.0.113.5")
        .await
        .unwrap();

    assert_eq!(answer_addrs(&response), vec!["203.0.113.80"]);
    assert_eq!(w.primary.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn domestic_answer_classifies_to_primary_with_ttl_floor() {
    let w = world();
    let response = w
        .dispatcher
        .exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();

    assert_eq!(answer_addrs(&response), vec!["93.184.216.34"]);
    // Upstream said 4 seconds; the minimum-TTL floor raises it.
    assert_eq!(response.answers()[0].ttl(), 60);
}

#[tokio::test]
async fn ttl_override_beats_the_floor() {
    let mut w = world();
    w.dispatcher.primary_matcher = {
        let mut m = DomainMatcher::from_kind("suffix-tree").unwrap();
        m.insert("pinned.example").unwrap();
        Arc::new(m)
    };

    let response = w
        .dispatcher
        .exchange(&a_query("www.pinned.example."), "203.0.113.5")
        .await
        .unwrap();

    assert_eq!(response.answers()[0].ttl(), 15);
}

#[tokio::test]
async fn foreign_answer_falls_through_to_alternative() {
    let w = world();
    // Primary's scripted answer sits outside its own network list here.
    let w2 = World {
        dispatcher: Dispatcher {
            primary_ip_set: IpSet::from_lines(["198.18.0.0/15"]).map(Arc::new),
            ..w.dispatcher
        },
        primary: w.primary,
        alternative: w.alternative,
    };

    let response = w2
        .dispatcher
        .exchange(&a_query("www.example.com."), "203.0.113.5")
        .await
        .unwrap();

    assert_eq!(answer_addrs(&response), vec!["203.0.113.80"]);
    assert_eq!(w2.primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(w2.alternative.calls.load(Ordering::SeqCst), 1);
}
