//! Domain classifiers.
//!
//! A closed set of matching algorithms behind one enum; the variant is
//! selected by a configuration string at construction and the chosen
//! matcher is append-only until the whole snapshot is replaced on reload.

mod catch_all;
mod full;
mod gfwlist;
mod mix;
mod regex_list;
mod suffix;

pub use catch_all::CatchAll;
pub use full::{FullList, FullMap};
pub use gfwlist::GfwList;
pub use mix::MixList;
pub use regex_list::RegexList;
pub use suffix::SuffixTree;

use horizon_dns_domain::{ConfigError, PatternError};
use std::path::Path;
use tracing::warn;

pub enum DomainMatcher {
    FullList(FullList),
    FullMap(FullMap),
    RegexList(RegexList),
    MixList(MixList),
    SuffixTree(SuffixTree),
    GfwList(GfwList),
    Final(CatchAll),
}

impl DomainMatcher {
    /// Factory keyed on the configuration string. There is no open
    /// extension point: these seven variants are the whole set.
    pub fn from_kind(kind: &str) -> Result<Self, ConfigError> {
        Ok(match kind {
            "full-list" => Self::FullList(FullList::default()),
            "full-map" => Self::FullMap(FullMap::default()),
            "regex-list" => Self::RegexList(RegexList::default()),
            "mix-list" => Self::MixList(MixList::default()),
            "suffix-tree" => Self::SuffixTree(SuffixTree::default()),
            "gfwlist" => Self::GfwList(GfwList::default()),
            "final" => Self::Final(CatchAll),
            other => return Err(ConfigError::UnknownMatcher(other.to_string())),
        })
    }

    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        match self {
            Self::FullList(m) => m.insert(pattern),
            Self::FullMap(m) => m.insert(pattern),
            Self::RegexList(m) => m.insert(pattern),
            Self::MixList(m) => m.insert(pattern),
            Self::SuffixTree(m) => m.insert(pattern),
            Self::GfwList(m) => m.insert(pattern),
            Self::Final(m) => m.insert(pattern),
        }
    }

    pub fn has(&self, domain: &str) -> bool {
        match self {
            Self::FullList(m) => m.has(domain),
            Self::FullMap(m) => m.has(domain),
            Self::RegexList(m) => m.has(domain),
            Self::MixList(m) => m.has(domain),
            Self::SuffixTree(m) => m.has(domain),
            Self::GfwList(m) => m.has(domain),
            Self::Final(m) => m.has(domain),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FullList(_) => "full-list",
            Self::FullMap(_) => "full-map",
            Self::RegexList(_) => "regex-list",
            Self::MixList(_) => "mix-list",
            Self::SuffixTree(_) => "suffix-tree",
            Self::GfwList(_) => "gfwlist",
            Self::Final(_) => "final",
        }
    }

    /// Insert one pattern per non-blank line. Malformed lines are logged
    /// and skipped; returns how many patterns were inserted.
    pub fn load_lines<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inserted = 0;
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            match self.insert(line) {
                Ok(()) => inserted += 1,
                Err(e) => warn!(matcher = self.name(), line = %line, error = %e, "Skipping bad pattern"),
            }
        }
        inserted
    }

    pub fn load(&mut self, path: &Path) -> std::io::Result<usize> {
        let contents = std::fs::read_to_string(path)?;
        Ok(self.load_lines(contents.lines()))
    }
}
