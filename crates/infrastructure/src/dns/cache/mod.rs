//! TTL cache of DNS response snapshots.
//!
//! Entries are replaced, never mutated; every read copies the stored
//! message out so no caller can alias another's response. Expiry is lazy:
//! `hit` evicts a dead entry when it finds one, there is no sweeper task.

mod key;

pub use key::CacheKey;

use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    expiration: Instant,
    message: Message,
}

pub struct MessageCache {
    capacity: usize,
    table: RwLock<FxHashMap<CacheKey, CacheEntry>>,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            table: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a response under `key`. The entry lives for the TTL of the
    /// message's first answer, or `fallback_ttl` seconds when the answer
    /// section is empty. First writer wins: an existing key is left alone
    /// until it expires or is removed.
    pub fn insert(&self, key: CacheKey, message: &Message, fallback_ttl: u32) {
        if self.capacity == 0 {
            return;
        }

        let ttl = message
            .answers()
            .first()
            .map(|r| r.ttl())
            .unwrap_or(fallback_ttl);

        let mut table = self.table.write().unwrap();
        if table.contains_key(&key) {
            return;
        }

        debug!(key = %key, ttl = ttl, "Cached");
        table.insert(
            key,
            CacheEntry {
                expiration: Instant::now() + Duration::from_secs(u64::from(ttl)),
                message: message.clone(),
            },
        );

        // Victim selection is deliberately unspecified; only the
        // post-condition `len <= capacity` is part of the contract.
        if table.len() > self.capacity {
            let excess = table.len() - self.capacity;
            let victims: Vec<CacheKey> = table.keys().take(excess).cloned().collect();
            for victim in victims {
                table.remove(&victim);
            }
        }
    }

    /// Copy the stored message and its expiration out, if present.
    pub fn lookup(&self, key: &CacheKey) -> Option<(Message, Instant)> {
        if self.capacity == 0 {
            return None;
        }
        let table = self.table.read().unwrap();
        table
            .get(key)
            .map(|entry| (entry.message.clone(), entry.expiration))
    }

    /// Produce a response for a live entry: the caller's transaction id,
    /// truncation cleared, answer TTLs rewritten to the remaining lifetime.
    /// An expired entry is evicted and misses.
    pub fn hit(&self, key: &CacheKey, request_id: u16) -> Option<Message> {
        let (mut message, expiration) = self.lookup(key)?;

        let now = Instant::now();
        if expiration <= now {
            self.remove(key);
            return None;
        }

        let remaining = (expiration - now).as_secs() as u32;
        let mut header = *message;
        header.set_id(request_id);
        message.set_header(header);
        message.set_truncated(false);
        let mut answers = message.take_answers();
        for answer in &mut answers {
            answer.set_ttl(remaining);
        }
        message.insert_answers(answers);
        Some(message)
    }

    pub fn remove(&self, key: &CacheKey) {
        self.table.write().unwrap().remove(key);
    }

    /// Operational introspection: every key, rendered, with its answers as
    /// `"name TTL class type rdata"` strings when `include_body` is set.
    pub fn dump(&self, include_body: bool) -> (HashMap<String, Vec<String>>, usize) {
        let table = self.table.read().unwrap();
        let count = table.len();

        let mut body = HashMap::new();
        if include_body {
            for (key, entry) in table.iter() {
                let answers = entry
                    .message
                    .answers()
                    .iter()
                    .map(|r| {
                        format!(
                            "{} {} {} {} {}",
                            r.name(),
                            r.ttl(),
                            r.dns_class(),
                            r.record_type(),
                            r.data()
                        )
                    })
                    .collect();
                body.insert(key.to_string(), answers);
            }
        }
        (body, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, OpCode, Query};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData, Record, RecordType};
    use std::str::FromStr;

    fn answer_message(name: &str, ttl: u32, addr: &str) -> Message {
        let name = Name::from_str(name).unwrap();
        let mut message = Message::new(7, MessageType::Response, OpCode::Query);
        message.add_query(Query::query(name.clone(), RecordType::A));
        message.add_answer(Record::from_rdata(
            name,
            ttl,
            RData::A(A(addr.parse().unwrap())),
        ));
        message
    }

    fn key(n: u32) -> CacheKey {
        CacheKey::new(format!("host{n}.example.com."), 1, "")
    }

    #[test]
    fn count_never_exceeds_capacity() {
        let cache = MessageCache::new(3);
        for n in 0..10 {
            cache.insert(key(n), &answer_message("a.example.com.", 300, "1.2.3.4"), 60);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn hit_rewrites_id_truncation_and_ttl() {
        let cache = MessageCache::new(8);
        let mut stored = answer_message("a.example.com.", 300, "1.2.3.4");
        stored.set_truncated(true);
        cache.insert(key(1), &stored, 60);

        let hit = cache.hit(&key(1), 4242).unwrap();
        assert_eq!(hit.id(), 4242);
        assert!(!hit.truncated());
        let ttl = hit.answers()[0].ttl();
        assert!(ttl <= 300 && ttl >= 298, "remaining ttl was {ttl}");
    }

    #[test]
    fn expired_entry_is_lazily_evicted() {
        let cache = MessageCache::new(8);
        // No answers: the zero fallback TTL expires the entry immediately.
        let mut empty = answer_message("a.example.com.", 300, "1.2.3.4");
        empty.take_answers();
        cache.insert(key(1), &empty, 0);

        assert!(cache.hit(&key(1), 1).is_none());
        assert!(cache.lookup(&key(1)).is_none());
    }

    #[test]
    fn first_writer_wins_until_removal() {
        let cache = MessageCache::new(8);
        cache.insert(key(1), &answer_message("a.example.com.", 300, "1.2.3.4"), 60);
        cache.insert(key(1), &answer_message("a.example.com.", 300, "5.6.7.8"), 60);

        let hit = cache.hit(&key(1), 1).unwrap();
        match hit.answers()[0].data() {
            RData::A(a) => assert_eq!(a.0.to_string(), "1.2.3.4"),
            other => panic!("unexpected rdata {other:?}"),
        }

        cache.remove(&key(1));
        cache.insert(key(1), &answer_message("a.example.com.", 300, "5.6.7.8"), 60);
        let hit = cache.hit(&key(1), 1).unwrap();
        match hit.answers()[0].data() {
            RData::A(a) => assert_eq!(a.0.to_string(), "5.6.7.8"),
            other => panic!("unexpected rdata {other:?}"),
        }
    }

    #[test]
    fn zero_capacity_disables_everything() {
        let cache = MessageCache::new(0);
        cache.insert(key(1), &answer_message("a.example.com.", 300, "1.2.3.4"), 60);
        assert_eq!(cache.len(), 0);
        assert!(cache.hit(&key(1), 1).is_none());
    }

    #[test]
    fn subnet_distinguishes_entries() {
        let cache = MessageCache::new(8);
        let a = CacheKey::new("a.example.com.", 1, "192.0.2.1");
        let b = CacheKey::new("a.example.com.", 1, "198.51.100.1");
        cache.insert(a.clone(), &answer_message("a.example.com.", 300, "1.2.3.4"), 60);

        assert!(cache.hit(&a, 1).is_some());
        assert!(cache.hit(&b, 1).is_none());
    }

    #[test]
    fn dump_renders_answers() {
        let cache = MessageCache::new(8);
        cache.insert(key(1), &answer_message("a.example.com.", 300, "1.2.3.4"), 60);

        let (body, count) = cache.dump(true);
        assert_eq!(count, 1);
        let answers = body.values().next().unwrap();
        assert!(answers[0].contains("a.example.com"));
        assert!(answers[0].contains("1.2.3.4"));

        let (empty_body, count) = cache.dump(false);
        assert_eq!(count, 1);
        assert!(empty_body.is_empty());
    }
}
