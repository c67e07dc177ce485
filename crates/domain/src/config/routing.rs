use serde::{Deserialize, Serialize};

/// Which group answers when the primary response exists but carries no
/// answer records.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerNonePolicy {
    #[default]
    Primary,
    Alternative,
}

/// Dispatch policy knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    /// Skip classification entirely and always use the primary group.
    #[serde(default)]
    pub only_primary: bool,

    /// Route every AAAA question to the alternative group.
    #[serde(default)]
    pub ipv6_use_alternative: bool,

    /// Pre-issue the alternative exchange while the primary one runs.
    #[serde(default)]
    pub alternative_concurrent: bool,

    #[serde(default)]
    pub when_primary_answer_none: AnswerNonePolicy,

    /// Floor applied to answer TTLs before caching. 0 disables it.
    #[serde(default)]
    pub minimum_ttl: u32,

    /// Maximum number of cached responses. 0 disables the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Question types (numeric) refused at the boundary.
    #[serde(default)]
    pub reject_qtypes: Vec<u16>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            only_primary: false,
            ipv6_use_alternative: false,
            alternative_concurrent: false,
            when_primary_answer_none: AnswerNonePolicy::default(),
            minimum_ttl: 0,
            cache_capacity: default_cache_capacity(),
            reject_qtypes: Vec::new(),
        }
    }
}

fn default_cache_capacity() -> usize {
    2048
}
