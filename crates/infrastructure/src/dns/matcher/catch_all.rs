use horizon_dns_domain::PatternError;

/// The trailing catch-all: accepts every domain and ignores every pattern.
pub struct CatchAll;

impl CatchAll {
    pub fn insert(&mut self, _pattern: &str) -> Result<(), PatternError> {
        Ok(())
    }

    pub fn has(&self, _domain: &str) -> bool {
        true
    }
}
