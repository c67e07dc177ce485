use fancy_regex::Regex;
use horizon_dns_domain::PatternError;

/// Each pattern is a regular expression tested against the full domain.
/// Patterns are compiled once at insert time.
#[derive(Default)]
pub struct RegexList {
    patterns: Vec<Regex>,
}

impl RegexList {
    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        let regex = Regex::new(pattern)
            .map_err(|e| PatternError::Regex(pattern.to_string(), e.to_string()))?;
        self.patterns.push(regex);
        Ok(())
    }

    pub fn has(&self, domain: &str) -> bool {
        self.patterns
            .iter()
            .any(|r| r.is_match(domain).unwrap_or(false))
    }
}
