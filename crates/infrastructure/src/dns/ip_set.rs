//! Immutable IP-network classifier.
//!
//! Input networks are converted to inclusive integer ranges, grouped by
//! address family, sorted and merged once at build time. Lookups are a
//! binary search over the merged ranges.

use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::{debug, warn};

/// Sorted, merged, non-overlapping inclusive ranges for one address family.
#[derive(Debug, Clone, Default)]
struct Ranges<T: Ord + Copy>(Vec<(T, T)>);

impl<T: Ord + Copy> Ranges<T> {
    fn contains(&self, probe: T) -> bool {
        let idx = self.0.partition_point(|&(start, _)| start <= probe);
        if idx == 0 {
            return false;
        }
        probe <= self.0[idx - 1].1
    }
}

/// Merged CIDR set supporting O(log n) containment per family.
#[derive(Debug, Clone)]
pub struct IpSet {
    v4: Ranges<u32>,
    v6: Ranges<u128>,
}

impl IpSet {
    /// Build a set from parsed networks. Returns `None` when no network of
    /// either family is present; a missing set never matches.
    pub fn build(networks: &[IpNetwork]) -> Option<Self> {
        let mut v4: Vec<(u32, u32)> = Vec::new();
        let mut v6: Vec<(u128, u128)> = Vec::new();

        for network in networks {
            match network {
                IpNetwork::V4(n) => {
                    let start = u32::from(n.ip()) & u32::from(n.mask());
                    let end = start | !u32::from(n.mask());
                    v4.push((start, end));
                }
                IpNetwork::V6(n) => {
                    let start = u128::from(n.ip()) & u128::from(n.mask());
                    let end = start | !u128::from(n.mask());
                    v6.push((start, end));
                }
            }
        }

        if v4.is_empty() && v6.is_empty() {
            return None;
        }

        Some(Self {
            v4: Ranges(sort_and_merge(v4, u32::checked_add)),
            v6: Ranges(sort_and_merge(v6, u128::checked_add)),
        })
    }

    /// Parse one CIDR per non-blank line; malformed lines warn and are
    /// skipped.
    pub fn from_lines<I, S>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut networks = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<IpNetwork>() {
                Ok(network) => networks.push(network),
                Err(e) => warn!(line = %line, error = %e, "Skipping bad IP network line"),
            }
        }
        Self::build(&networks)
    }

    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(contents.lines()))
    }

    /// Check the 4-byte form first, then the 16-byte (v4-mapped) form.
    pub fn contains(&self, ip: IpAddr, log: bool, label: &str) -> bool {
        let v4_form = match ip {
            IpAddr::V4(a) => Some(a),
            IpAddr::V6(a) => a.to_ipv4_mapped(),
        };

        let mut matched = v4_form.is_some_and(|a| self.v4.contains(u32::from(a)));
        if !matched {
            let v6_form: Ipv6Addr = match ip {
                IpAddr::V4(a) => a.to_ipv6_mapped(),
                IpAddr::V6(a) => a,
            };
            matched = self.v6.contains(u128::from(v6_form));
        }

        if matched && log {
            debug!(set = %label, ip = %ip, "Matched IP network");
        }
        matched
    }

    #[cfg(test)]
    fn range_counts(&self) -> (usize, usize) {
        (self.v4.0.len(), self.v6.0.len())
    }
}

/// `None` never matches; note that no check ran when asked to log.
pub fn contains(set: Option<&IpSet>, ip: IpAddr, log: bool, label: &str) -> bool {
    match set {
        Some(set) => set.contains(ip, log, label),
        None => {
            if log {
                debug!(set = %label, "IP network list is empty, not checking");
            }
            false
        }
    }
}

/// Merge overlapping or adjacent ranges. An all-ones end has no successor;
/// it already covers everything that sorts after it.
fn sort_and_merge<T: Ord + Copy>(
    mut ranges: Vec<(T, T)>,
    checked_add: fn(T, T) -> Option<T>,
) -> Vec<(T, T)>
where
    T: From<u8>,
{
    if ranges.len() < 2 {
        return ranges;
    }
    ranges.sort_unstable();

    let mut merged = Vec::with_capacity(ranges.len());
    let mut iter = ranges.into_iter();
    let (mut start, mut end) = iter.next().expect("len checked above");

    for (next_start, next_end) in iter {
        let joins = match checked_add(end, T::from(1u8)) {
            None => true,
            Some(succ) => succ >= next_start,
        };
        if joins {
            if end < next_end {
                end = next_end;
            }
        } else {
            merged.push((start, end));
            start = next_start;
            end = next_end;
        }
    }
    merged.push((start, end));
    merged
}
