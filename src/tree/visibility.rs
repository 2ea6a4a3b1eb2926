//! Filter visibility over the tree.
//!
//! A node is visible when its name or title contains the filter
//! (case-insensitive, literal), or when it is a directory with a visible
//! descendant. An empty filter shows everything.

use super::node::TreeNode;
use ahash::AHashMap;
use xxhash_rust::xxh3::xxh3_64;

fn matches_self(node: &TreeNode, needle: &str) -> bool {
    node.name.to_lowercase().contains(needle)
        || node
            .title
            .as_deref()
            .is_some_and(|title| title.to_lowercase().contains(needle))
}

fn visible_lowered(node: &TreeNode, needle: &str) -> bool {
    matches_self(node, needle)
        || (node.is_directory && node.children.iter().any(|c| visible_lowered(c, needle)))
}

/// Whether `node` is shown under `filter`.
pub fn is_visible(node: &TreeNode, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    visible_lowered(node, &filter.to_lowercase())
}

/// Per-filter visibility for a whole tree, keyed by node path.
///
/// Recomputed only when the filter's hash changes; each node is evaluated
/// once, bottom-up.
#[derive(Debug, Default)]
pub struct VisibilityMemo {
    filter_hash: Option<u64>,
    visible: AHashMap<String, bool>,
}

impl VisibilityMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the memo current for `filter` over `roots`. Returns `true` if it
    /// was recomputed.
    pub fn refresh(&mut self, roots: &[TreeNode], filter: &str) -> bool {
        let hash = xxh3_64(filter.as_bytes());
        if self.filter_hash == Some(hash) {
            return false;
        }

        self.visible.clear();
        let needle = filter.to_lowercase();
        for node in roots {
            self.fill(node, &needle);
        }
        self.filter_hash = Some(hash);
        tracing::debug!(
            "Recomputed tree visibility for '{}' ({} nodes)",
            filter,
            self.visible.len()
        );
        true
    }

    fn fill(&mut self, node: &TreeNode, needle: &str) -> bool {
        let mut any_child = false;
        for child in &node.children {
            // Every child is visited so the memo covers the whole subtree.
            any_child |= self.fill(child, needle);
        }
        let visible =
            needle.is_empty() || matches_self(node, needle) || (node.is_directory && any_child);
        self.visible.insert(node.path.clone(), visible);
        visible
    }

    /// Memoized visibility of the node at `path`. Unknown paths are hidden.
    pub fn is_visible(&self, path: &str) -> bool {
        self.visible.get(path).copied().unwrap_or(false)
    }
}
