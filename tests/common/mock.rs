//! Scripted upstream resolvers shared by the integration flows.
#![allow(dead_code)]

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use horizon_dns_domain::{DnsError, EdnsConfig, Protocol, TcpPoolConfig, UpstreamConfig};
use horizon_dns_infrastructure::dns::client::Upstream;
use horizon_dns_infrastructure::dns::transport::RemoteResolver;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct ScriptedUpstream {
    pub upstream: Upstream,
    pub calls: Arc<AtomicUsize>,
}

struct ScriptedResolver {
    answer: Option<(&'static str, u32)>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteResolver for ScriptedResolver {
    async fn exchange(&self, query: &Message) -> Result<Message, DnsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let question = query.queries().first().expect("query has a question");

        let mut response = Message::new(query.id(), MessageType::Response, OpCode::Query);
        response.add_query(question.clone());
        if let Some((addr, ttl)) = self.answer {
            let rdata = match addr.parse::<IpAddr>().unwrap() {
                IpAddr::V4(v4) => RData::A(A(v4)),
                IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
            };
            response.add_answer(Record::from_rdata(question.name().clone(), ttl, rdata));
        }
        Ok(response)
    }

    fn protocol_name(&self) -> &'static str {
        "scripted"
    }
}

/// An upstream whose every exchange is counted and answers with one fixed
/// record (or an empty answer section when `answer` is `None`).
pub fn scripted_upstream(
    name: &str,
    answer: Option<(&'static str, u32)>,
    edns: EdnsConfig,
) -> ScriptedUpstream {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = UpstreamConfig {
        name: name.to_string(),
        address: "192.0.2.1:53".to_string(),
        protocol: Protocol::Udp,
        timeout_secs: 2,
        socks5: None,
        edns,
        tcp_pool: TcpPoolConfig::default(),
    };
    ScriptedUpstream {
        upstream: Upstream::new(
            config,
            Arc::new(ScriptedResolver {
                answer,
                calls: Arc::clone(&calls),
            }),
        ),
        calls,
    }
}

pub fn a_query(name: &str) -> Message {
    typed_query(name, RecordType::A)
}

pub fn typed_query(name: &str, qtype: RecordType) -> Message {
    let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    message.add_query(Query::query(Name::from_str(name).unwrap(), qtype));
    message
}

pub fn answer_addrs(message: &Message) -> Vec<String> {
    message
        .answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(a.0.to_string()),
            RData::AAAA(aaaa) => Some(aaaa.0.to_string()),
            _ => None,
        })
        .collect()
}
