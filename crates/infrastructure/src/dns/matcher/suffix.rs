use compact_str::CompactString;
use horizon_dns_domain::PatternError;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Default)]
struct TreeNode {
    children: HashMap<CompactString, TreeNode, FxBuildHasher>,
    terminal: bool,
}

/// Dot-separated labels inserted right-to-left into a label-keyed tree.
///
/// A lookup walks top-level-label first and matches when it reaches a
/// terminal node or a node with no deeper labels. Registering `example.com`
/// matches `example.com` and any `*.example.com`, but neither `com` nor
/// `notexample.com`.
#[derive(Default)]
pub struct SuffixTree {
    root: TreeNode,
}

impl SuffixTree {
    pub fn insert(&mut self, pattern: &str) -> Result<(), PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let mut node = &mut self.root;
        for label in pattern.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        node.terminal = true;
        Ok(())
    }

    pub fn has(&self, domain: &str) -> bool {
        if self.root.children.is_empty() {
            return false;
        }

        let labels: SmallVec<[&str; 8]> = domain.split('.').rev().collect();
        let mut node = &self.root;
        for label in labels {
            // Registered suffix reached: everything below it matches.
            if node.terminal || node.children.is_empty() {
                return true;
            }
            match node.children.get(label) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal || node.children.is_empty()
    }
}
