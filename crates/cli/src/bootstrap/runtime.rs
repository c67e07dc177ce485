//! Build one immutable runtime snapshot from the configuration: classifier
//! files are read here, once, so queries never touch the filesystem.

use anyhow::Context;
use horizon_dns_domain::{Config, UpstreamConfig};
use horizon_dns_infrastructure::dns::cache::MessageCache;
use horizon_dns_infrastructure::dns::client::Upstream;
use horizon_dns_infrastructure::dns::dispatcher::Dispatcher;
use horizon_dns_infrastructure::dns::hosts::HostsTable;
use horizon_dns_infrastructure::dns::ip_set::IpSet;
use horizon_dns_infrastructure::dns::matcher::DomainMatcher;
use horizon_dns_infrastructure::dns::transport::create_transport;
use horizon_dns_infrastructure::dns::ttl;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let files = &config.files;

    let primary_matcher = build_matcher(
        &files.domain_file.matcher,
        files.domain_file.primary.as_deref(),
        "primary",
    )?;
    let alternative_matcher = build_matcher(
        &files.domain_file.matcher,
        files.domain_file.alternative.as_deref(),
        "alternative",
    )?;

    let primary_ip_set = build_ip_set(files.ip_network_file.primary.as_deref(), "primary")?;
    let alternative_ip_set =
        build_ip_set(files.ip_network_file.alternative.as_deref(), "alternative")?;

    let hosts = match files.hosts_file.as_deref() {
        Some(path) => {
            let table = HostsTable::load(Path::new(path))
                .with_context(|| format!("reading hosts file {path}"))?;
            info!(path = %path, "Loaded hosts file");
            Some(Arc::new(table))
        }
        None => None,
    };

    let ttl_overrides = match files.domain_ttl_file.as_deref() {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading TTL override file {path}"))?;
            ttl::overrides_from_lines(contents.lines())
        }
        None => FxHashMap::default(),
    };

    let cache = Arc::new(MessageCache::new(config.routing.cache_capacity));
    if cache.capacity() > 0 {
        info!(capacity = cache.capacity(), "Cache enabled");
    } else {
        info!("Cache disabled");
    }

    Ok(Dispatcher {
        primary_upstreams: build_upstreams(&config.primary_upstreams)?,
        alternative_upstreams: build_upstreams(&config.alternative_upstreams)?,
        only_primary: config.routing.only_primary,
        ipv6_use_alternative: config.routing.ipv6_use_alternative,
        alternative_concurrent: config.routing.alternative_concurrent,
        when_primary_answer_none: config.routing.when_primary_answer_none,
        minimum_ttl: config.routing.minimum_ttl,
        ttl_overrides: Arc::new(ttl_overrides),
        reject_qtypes: config.routing.reject_qtypes.clone(),
        primary_matcher,
        alternative_matcher,
        primary_ip_set,
        alternative_ip_set,
        hosts,
        cache,
    })
}

fn build_matcher(
    kind: &str,
    path: Option<&str>,
    side: &str,
) -> anyhow::Result<Arc<DomainMatcher>> {
    let mut matcher = DomainMatcher::from_kind(kind)?;
    if let Some(path) = path {
        let inserted = matcher
            .load(Path::new(path))
            .with_context(|| format!("reading {side} domain file {path}"))?;
        info!(side = %side, path = %path, patterns = inserted, matcher = matcher.name(), "Loaded domain list");
    }
    Ok(Arc::new(matcher))
}

fn build_ip_set(path: Option<&str>, side: &str) -> anyhow::Result<Option<Arc<IpSet>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let set = IpSet::load(Path::new(path))
        .with_context(|| format!("reading {side} IP network file {path}"))?;
    info!(side = %side, path = %path, "Loaded IP network list");
    Ok(set.map(Arc::new))
}

fn build_upstreams(configs: &[UpstreamConfig]) -> anyhow::Result<Vec<Upstream>> {
    configs
        .iter()
        .map(|config| {
            let transport = create_transport(config)
                .with_context(|| format!("building transport for upstream '{}'", config.name))?;
            Ok(Upstream::new(config.clone(), Arc::new(transport)))
        })
        .collect()
}
