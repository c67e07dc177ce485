use super::hosts::HostsTable;
use super::ttl;
use hickory_proto::op::{Message, MessageType, OpCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record, RecordType};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use tracing::debug;

const LOCAL_TTL: u32 = 3600;

/// Resolution that never leaves the process: the hosts table, or a
/// question name that already is a literal address.
pub struct LocalClient<'a> {
    query: &'a Message,
    hosts: Option<&'a HostsTable>,
    minimum_ttl: u32,
    ttl_overrides: &'a FxHashMap<String, u32>,
}

impl<'a> LocalClient<'a> {
    pub fn new(
        query: &'a Message,
        hosts: Option<&'a HostsTable>,
        minimum_ttl: u32,
        ttl_overrides: &'a FxHashMap<String, u32>,
    ) -> Self {
        Self {
            query,
            hosts,
            minimum_ttl,
            ttl_overrides,
        }
    }

    pub fn exchange(&self) -> Option<Message> {
        let mut response = self
            .exchange_from_hosts()
            .or_else(|| self.exchange_from_ip())?;
        ttl::set_minimum_ttl(&mut response, self.minimum_ttl);
        ttl::set_ttl_by_map(&mut response, self.ttl_overrides);
        Some(response)
    }

    fn exchange_from_hosts(&self) -> Option<Message> {
        let hosts = self.hosts?;
        let question = self.query.queries().first()?;
        let name = question.name().to_utf8();
        let (v4, v6) = hosts.find(name.trim_end_matches('.'));

        let records: Vec<Record> = match question.query_type() {
            RecordType::A => v4
                .into_iter()
                .map(|ip| Record::from_rdata(question.name().clone(), LOCAL_TTL, RData::A(A(ip))))
                .collect(),
            RecordType::AAAA => v6
                .into_iter()
                .map(|ip| {
                    Record::from_rdata(question.name().clone(), LOCAL_TTL, RData::AAAA(AAAA(ip)))
                })
                .collect(),
            _ => Vec::new(),
        };

        if records.is_empty() {
            return None;
        }
        debug!(name = %name, records = records.len(), "Resolved from hosts");
        Some(self.build_response(records))
    }

    fn exchange_from_ip(&self) -> Option<Message> {
        let question = self.query.queries().first()?;
        let name = question.name().to_utf8();
        let ip = name.trim_end_matches('.').parse::<IpAddr>().ok()?;

        let record = match (ip, question.query_type()) {
            (IpAddr::V4(v4), RecordType::A) => {
                Record::from_rdata(question.name().clone(), LOCAL_TTL, RData::A(A(v4)))
            }
            (IpAddr::V6(v6), RecordType::AAAA) => {
                Record::from_rdata(question.name().clone(), LOCAL_TTL, RData::AAAA(AAAA(v6)))
            }
            _ => return None,
        };
        Some(self.build_response(vec![record]))
    }

    /// Multiple matching records are shuffled so no single address is
    /// always handed out first.
    fn build_response(&self, mut records: Vec<Record>) -> Message {
        fastrand::shuffle(&mut records);

        let mut response = Message::new(self.query.id(), MessageType::Response, OpCode::Query);
        if let Some(question) = self.query.queries().first() {
            response.add_query(question.clone());
        }
        response.set_recursion_desired(self.query.recursion_desired());
        response.set_recursion_available(true);
        response.insert_answers(records);
        response
    }
}
