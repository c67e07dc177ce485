use fancy_regex::Regex;
use horizon_dns_domain::PatternError;

enum MixEntry {
    /// Label-boundary suffix: equal, or ends with `.suffix`.
    Domain(String),
    Regex(Regex),
    Keyword(String),
    Full(String),
}

/// `tag:value` entries where the tag picks the match rule. Untagged entries
/// default to `domain`.
#[derive(Default)]
pub struct MixList {
    entries: Vec<MixEntry>,
}

impl MixList {
    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        let parts: Vec<&str> = pattern.split(':').collect();
        let (tag, value) = match parts.as_slice() {
            [value] => ("domain", *value),
            [tag, value] => (*tag, *value),
            _ => return Err(PatternError::MixFormat(pattern.to_string())),
        };

        let value = value.to_ascii_lowercase();
        let entry = match tag.to_ascii_lowercase().as_str() {
            "domain" => MixEntry::Domain(value),
            "regex" => MixEntry::Regex(
                Regex::new(&value)
                    .map_err(|e| PatternError::Regex(value.clone(), e.to_string()))?,
            ),
            "keyword" => MixEntry::Keyword(value),
            "full" => MixEntry::Full(value),
            other => return Err(PatternError::MixTag(other.to_string())),
        };
        self.entries.push(entry);
        Ok(())
    }

    pub fn has(&self, domain: &str) -> bool {
        self.entries.iter().any(|entry| match entry {
            MixEntry::Domain(suffix) => {
                domain == suffix
                    || (domain.len() > suffix.len()
                        && domain.ends_with(suffix)
                        && domain.as_bytes()[domain.len() - suffix.len() - 1] == b'.')
            }
            MixEntry::Regex(regex) => regex.is_match(domain).unwrap_or(false),
            MixEntry::Keyword(keyword) => domain.contains(keyword.as_str()),
            MixEntry::Full(exact) => domain == exact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(patterns: &[&str]) -> MixList {
        let mut m = MixList::default();
        for p in patterns {
            m.insert(p).unwrap();
        }
        m
    }

    #[test]
    fn domain_tag_is_label_boundary_suffix() {
        let m = list(&["domain:example.com"]);
        assert!(m.has("example.com"));
        assert!(m.has("a.b.example.com"));
        assert!(!m.has("notexample.com"));
        assert!(!m.has("com"));
    }

    #[test]
    fn untagged_defaults_to_domain() {
        let m = list(&["example.org"]);
        assert!(m.has("www.example.org"));
        assert!(!m.has("example.org.evil.net"));
    }

    #[test]
    fn keyword_is_substring() {
        let m = list(&["keyword:track"]);
        assert!(m.has("tracker.example.com"));
        assert!(m.has("www.backtrack.net"));
        assert!(!m.has("example.com"));
    }

    #[test]
    fn full_is_equality() {
        let m = list(&["full:example.com"]);
        assert!(m.has("example.com"));
        assert!(!m.has("a.example.com"));
    }

    #[test]
    fn regex_tag_compiles_at_insert() {
        let m = list(&[r"regex:^cdn\d+\."]);
        assert!(m.has("cdn7.example.com"));
        assert!(!m.has("cdn.example.com"));
    }

    #[test]
    fn malformed_entries_error() {
        let mut m = MixList::default();
        assert!(m.insert("a:b:c").is_err());
        assert!(m.insert("glob:*.example.com").is_err());
    }
}
