//! EDNS-client-subnet annotation.
//!
//! Upstream resolvers use the option to return topologically closer
//! answers; the annotated address is also part of the cache key so two
//! clients behind different subnets never share an entry.

use super::ip_set::IpSet;
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsCode, EdnsOption};
use horizon_dns_domain::{EdnsConfig, EdnsPolicy};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;

/// Networks that must not leak into a client-subnet option.
pub static RESERVED_NETWORKS: LazyLock<IpSet> = LazyLock::new(|| {
    let cidrs = [
        "127.0.0.0/8",
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "100.64.0.0/10",
    ];
    IpSet::from_lines(cidrs).expect("reserved networks are valid CIDRs")
});

pub fn is_reserved(ip: IpAddr) -> bool {
    RESERVED_NETWORKS.contains(ip, false, "reserved")
}

/// Pick the subnet address one upstream advertises for this query, per its
/// configured policy. Empty string means "annotate nothing".
pub fn resolve_subnet_ip(config: &EdnsConfig, inbound_ip: &str) -> String {
    let external = config.external_ip.as_deref().unwrap_or("");
    match config.policy {
        EdnsPolicy::Auto => match inbound_ip.parse::<IpAddr>() {
            Ok(ip) if !is_reserved(ip) => inbound_ip.to_string(),
            _ => external.to_string(),
        },
        EdnsPolicy::Manual => match external.parse::<IpAddr>() {
            Ok(ip) if !is_reserved(ip) => external.to_string(),
            _ => String::new(),
        },
        EdnsPolicy::Disable => String::new(),
    }
}

/// Add a ClientSubnet option carrying `ip` with a full-length source
/// prefix. A message that already carries one is left alone.
pub fn append_subnet(message: &mut Message, ip: &str) {
    if ip.is_empty() {
        return;
    }
    let Ok(addr) = ip.parse::<IpAddr>() else {
        return;
    };

    let prefix = if addr.is_ipv4() { 32 } else { 128 };
    let Ok(subnet) = ClientSubnet::from_str(&format!("{addr}/{prefix}")) else {
        return;
    };

    let edns = message.extensions_mut().get_or_insert_with(Edns::new);
    if edns.option(EdnsCode::Subnet).is_some() {
        return;
    }
    edns.options_mut().insert(EdnsOption::Subnet(subnet));
}

/// Whether a message already carries a ClientSubnet option.
pub fn has_subnet(message: &Message) -> bool {
    message
        .extensions()
        .as_ref()
        .is_some_and(|edns| edns.option(EdnsCode::Subnet).is_some())
}
