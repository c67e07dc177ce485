//! Static hosts table: `IP name [name...]` lines, `#` comments, optional
//! leading `*.` wildcards.

use rustc_hash::FxHashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::warn;

#[derive(Default)]
pub struct HostsTable {
    exact: FxHashMap<String, Vec<IpAddr>>,
    /// Suffixes of `*.suffix` entries; they match any proper subdomain.
    wildcards: Vec<(String, Vec<IpAddr>)>,
}

impl HostsTable {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for line in lines {
            let line = line.as_ref();
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut words = line.split_whitespace();
            let Some(addr_text) = words.next() else {
                continue;
            };
            let Ok(addr) = addr_text.parse::<IpAddr>() else {
                warn!(line = %line, "Skipping bad hosts line");
                continue;
            };

            let mut any_name = false;
            for name in words {
                any_name = true;
                let name = name.trim_end_matches('.').to_ascii_lowercase();
                if let Some(suffix) = name.strip_prefix("*.") {
                    match table.wildcards.iter_mut().find(|(s, _)| s == suffix) {
                        Some((_, addrs)) => addrs.push(addr),
                        None => table.wildcards.push((suffix.to_string(), vec![addr])),
                    }
                } else {
                    table.exact.entry(name).or_default().push(addr);
                }
            }
            if !any_name {
                warn!(line = %line, "Skipping hosts line without a name");
            }
        }
        table
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(contents.lines()))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcards.is_empty()
    }

    /// All addresses for `name`, split by family.
    pub fn find(&self, name: &str) -> (Vec<Ipv4Addr>, Vec<Ipv6Addr>) {
        let name = name.trim_end_matches('.').to_ascii_lowercase();

        let mut v4 = Vec::new();
        let mut v6 = Vec::new();
        let mut push = |addr: &IpAddr| match addr {
            IpAddr::V4(a) => v4.push(*a),
            IpAddr::V6(a) => v6.push(*a),
        };

        if let Some(addrs) = self.exact.get(&name) {
            addrs.iter().for_each(&mut push);
        }
        for (suffix, addrs) in &self.wildcards {
            if name.len() > suffix.len()
                && name.ends_with(suffix)
                && name.as_bytes()[name.len() - suffix.len() - 1] == b'.'
            {
                addrs.iter().for_each(&mut push);
            }
        }
        (v4, v6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HostsTable {
        HostsTable::from_lines([
            "127.0.0.1 localhost",
            "::1 localhost",
            "10.0.0.5 nas nas.home.lan",
            "192.168.1.1 *.router.lan",
            "# full comment line",
            "10.0.0.9 gateway # trailing comment",
            "not-an-ip broken.example",
        ])
    }

    #[test]
    fn exact_lookup_splits_families() {
        let t = table();
        let (v4, v6) = t.find("localhost");
        assert_eq!(v4, vec!["127.0.0.1".parse::<Ipv4Addr>().unwrap()]);
        assert_eq!(v6, vec!["::1".parse::<Ipv6Addr>().unwrap()]);
    }

    #[test]
    fn lookup_is_case_and_dot_insensitive() {
        let t = table();
        let (v4, _) = t.find("NAS.Home.Lan.");
        assert_eq!(v4.len(), 1);
    }

    #[test]
    fn wildcard_matches_subdomains_only() {
        let t = table();
        assert_eq!(t.find("web.router.lan").0.len(), 1);
        assert_eq!(t.find("a.b.router.lan").0.len(), 1);
        assert!(t.find("router.lan").0.is_empty());
        assert!(t.find("notrouter.lan").0.is_empty());
    }

    #[test]
    fn comments_and_garbage_are_skipped() {
        let t = table();
        assert_eq!(t.find("gateway").0.len(), 1);
        assert!(t.find("broken.example").0.is_empty());
    }

    #[test]
    fn miss_returns_empty_lists() {
        let (v4, v6) = table().find("unknown.example");
        assert!(v4.is_empty() && v6.is_empty());
    }
}
