use horizon_dns_domain::PatternError;
use rustc_hash::FxHashSet;

/// Exact equality against a stored list.
#[derive(Default)]
pub struct FullList {
    patterns: Vec<String>,
}

impl FullList {
    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        self.patterns.push(pattern.to_string());
        Ok(())
    }

    pub fn has(&self, domain: &str) -> bool {
        self.patterns.iter().any(|p| p == domain)
    }
}

/// Exact equality against a hashed set.
#[derive(Default)]
pub struct FullMap {
    patterns: FxHashSet<String>,
}

impl FullMap {
    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        self.patterns.insert(pattern.to_string());
        Ok(())
    }

    pub fn has(&self, domain: &str) -> bool {
        self.patterns.contains(domain)
    }
}
