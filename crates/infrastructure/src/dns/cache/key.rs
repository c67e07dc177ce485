use hickory_proto::op::Message;
use std::fmt;

/// Composite cache key: question name, question type, and the
/// EDNS-client-subnet address the query was annotated with. Two queries
/// differing only in subnet are distinct entries by design.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    qtype: u16,
    subnet: String,
}

impl CacheKey {
    pub fn new(name: impl Into<String>, qtype: u16, subnet: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qtype,
            subnet: subnet.into(),
        }
    }

    /// Key for a query message, from its first question.
    pub fn from_question(message: &Message, subnet: &str) -> Option<Self> {
        let query = message.queries().first()?;
        Some(Self::new(
            query.name().to_utf8(),
            u16::from(query.query_type()),
            subnet,
        ))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qtype, self.subnet)
    }
}
