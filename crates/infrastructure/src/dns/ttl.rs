//! Response TTL normalization: the minimum-TTL floor first, then the
//! per-domain override map.

use hickory_proto::op::Message;
use rustc_hash::FxHashMap;

/// Raise every answer TTL below `minimum` up to it. A zero minimum leaves
/// the response untouched.
pub fn set_minimum_ttl(message: &mut Message, minimum: u32) {
    if minimum == 0 {
        return;
    }
    let mut answers = message.take_answers();
    for answer in &mut answers {
        if answer.ttl() < minimum {
            answer.set_ttl(minimum);
        }
    }
    message.insert_answers(answers);
}

/// Force the TTL of answers whose name falls under an override pattern.
/// Patterns match on label boundaries: `example.com` covers itself and any
/// subdomain, never `notexample.com`.
pub fn set_ttl_by_map(message: &mut Message, overrides: &FxHashMap<String, u32>) {
    if overrides.is_empty() {
        return;
    }
    let mut answers = message.take_answers();
    for answer in &mut answers {
        let name = answer.name().to_utf8();
        let name = name.trim_end_matches('.');
        for (pattern, ttl) in overrides {
            if domain_matches(name, pattern) {
                answer.set_ttl(*ttl);
            }
        }
    }
    message.insert_answers(answers);
}

fn domain_matches(name: &str, pattern: &str) -> bool {
    name == pattern
        || (name.len() > pattern.len()
            && name.ends_with(pattern)
            && name.as_bytes()[name.len() - pattern.len() - 1] == b'.')
}

/// Parse a `pattern seconds` override file; malformed lines warn and are
/// skipped.
pub fn overrides_from_lines<I, S>(lines: I) -> FxHashMap<String, u32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut overrides = FxHashMap::default();
    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next().map(str::parse::<u32>)) {
            (Some(pattern), Some(Ok(ttl))) => {
                overrides.insert(pattern.to_string(), ttl);
            }
            _ => tracing::warn!(line = %line, "Skipping bad TTL override line"),
        }
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, OpCode};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData, Record};
    use std::str::FromStr;

    fn message_with_ttls(entries: &[(&str, u32)]) -> Message {
        let mut message = Message::new(1, MessageType::Response, OpCode::Query);
        for (name, ttl) in entries {
            message.add_answer(Record::from_rdata(
                Name::from_str(name).unwrap(),
                *ttl,
                RData::A(A("1.2.3.4".parse().unwrap())),
            ));
        }
        message
    }

    #[test]
    fn floor_only_raises() {
        let mut message = message_with_ttls(&[("a.example.com.", 5), ("b.example.com.", 900)]);
        set_minimum_ttl(&mut message, 60);
        assert_eq!(message.answers()[0].ttl(), 60);
        assert_eq!(message.answers()[1].ttl(), 900);
    }

    #[test]
    fn zero_floor_is_inert() {
        let mut message = message_with_ttls(&[("a.example.com.", 5)]);
        set_minimum_ttl(&mut message, 0);
        assert_eq!(message.answers()[0].ttl(), 5);
    }

    #[test]
    fn overrides_apply_after_floor() {
        let overrides = overrides_from_lines(["example.com 30"]);
        let mut message = message_with_ttls(&[("www.example.com.", 5), ("other.net.", 5)]);
        set_minimum_ttl(&mut message, 60);
        set_ttl_by_map(&mut message, &overrides);
        // The override wins over the floor for matching names.
        assert_eq!(message.answers()[0].ttl(), 30);
        assert_eq!(message.answers()[1].ttl(), 60);
    }

    #[test]
    fn override_pattern_needs_label_boundary() {
        let overrides = overrides_from_lines(["example.com 30"]);
        let mut message = message_with_ttls(&[("notexample.com.", 5)]);
        set_ttl_by_map(&mut message, &overrides);
        assert_eq!(message.answers()[0].ttl(), 5);
    }

    #[test]
    fn override_file_skips_garbage() {
        let overrides =
            overrides_from_lines(["# comment", "", "example.com notanumber", "ok.example 10"]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.get("ok.example"), Some(&10));
    }
}
