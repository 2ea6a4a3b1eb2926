//! Interactive state of the navigation tree.
//!
//! [`TreeView`] owns the loaded tree, the filter, and the expanded set. Every
//! change to the expanded set or the collapsed flag is written through to
//! [`ClientState`]. Persisted state is read once at mount and merged (union)
//! with the auto-expanded ancestors of the current page.

use super::highlight::highlight_html;
use super::node::{FileTreeData, TreeNode};
use super::visibility::{VisibilityMemo, is_visible};
use crate::store::ClientState;
use std::collections::BTreeSet;

/// Page shown when the location has no path.
const INDEX_PAGE: &str = "index.html";

/// `/guide/intro.html/` -> `guide/intro.html`; `/` -> `index.html`.
pub fn normalize_location(location: &str) -> String {
    let path = location.strip_prefix('/').unwrap_or(location);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        INDEX_PAGE.to_string()
    } else {
        path.to_string()
    }
}

/// Directory paths leading to `page`: `a/b/c.html` -> `a`, `a/b`.
fn ancestor_dirs(page: &str) -> Vec<String> {
    let stem = page.replacen(".html", "", 1);
    let parts: Vec<&str> = stem.split('/').collect();
    let mut dirs = Vec::new();
    let mut current = String::new();
    for part in &parts[..parts.len().saturating_sub(1)] {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        dirs.push(current.clone());
    }
    dirs
}

/// Result of clicking a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    /// A directory was expanded or collapsed.
    Toggle { path: String, expanded: bool },
    /// Full navigation to `url` (site-absolute).
    Navigate { url: String },
    /// Nothing to do (unknown path, or a leaf without a target).
    None,
}

/// One visible row of the flattened tree, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub path: String,
    pub depth: usize,
    /// Display name with filter hits in `<mark>`.
    pub label_html: String,
    pub is_directory: bool,
    pub is_expanded: bool,
    pub is_active: bool,
}

#[derive(Debug)]
pub struct TreeView {
    data: FileTreeData,
    state: ClientState,
    current: String,
    filter: String,
    expanded: BTreeSet<String>,
    collapsed: bool,
    memo: VisibilityMemo,
}

impl TreeView {
    /// Mount the tree for the page at `location`.
    pub fn mount(data: FileTreeData, state: ClientState, location: &str) -> Self {
        let current = normalize_location(location);

        let mut expanded: BTreeSet<String> = ancestor_dirs(&current).into_iter().collect();
        expanded.extend(state.expanded());
        let collapsed = state.collapsed();

        let mut memo = VisibilityMemo::new();
        memo.refresh(&data.root, "");

        let view = Self {
            data,
            state,
            current,
            filter: String::new(),
            expanded,
            collapsed,
            memo,
        };
        view.state.set_expanded(&view.expanded);
        tracing::debug!(
            "Mounted file tree at '{}' with {} expanded nodes",
            view.current,
            view.expanded.len()
        );
        view
    }

    pub fn data(&self) -> &FileTreeData {
        &self.data
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn current_path(&self) -> &str {
        &self.current
    }

    pub fn expanded(&self) -> &BTreeSet<String> {
        &self.expanded
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Apply a new filter. Every directory visible under a non-empty filter is
    /// added to the expanded set; nothing is ever removed here.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        self.memo.refresh(&self.data.root, filter);
        if filter.is_empty() {
            return;
        }

        let before = self.expanded.len();
        for node in &self.data.flat_list {
            if node.is_directory && is_visible(node, filter) {
                self.expanded.insert(node.path.clone());
            }
        }
        if self.expanded.len() != before {
            self.state.set_expanded(&self.expanded);
        }
    }

    /// Flip a directory. Returns the new expanded state.
    pub fn toggle(&mut self, path: &str) -> bool {
        let expanded = if self.expanded.remove(path) {
            false
        } else {
            self.expanded.insert(path.to_string());
            true
        };
        self.state.set_expanded(&self.expanded);
        expanded
    }

    /// Clicking a row: directories toggle, leaves with a target navigate.
    pub fn click(&mut self, path: &str) -> NavAction {
        let Some(node) = self.data.nodes().find(|n| n.path == path) else {
            tracing::debug!("Click on unknown tree path '{}'", path);
            return NavAction::None;
        };
        if node.is_directory {
            let path = node.path.clone();
            let expanded = self.toggle(&path);
            return NavAction::Toggle { path, expanded };
        }
        match node.target_url.as_deref() {
            Some(url) if node.is_navigable() => NavAction::Navigate {
                url: format!("/{}", url.trim_start_matches('/')),
            },
            _ => NavAction::None,
        }
    }

    /// Show or hide the whole panel. Returns the new collapsed state.
    pub fn toggle_collapsed(&mut self) -> bool {
        self.collapsed = !self.collapsed;
        self.state.set_collapsed(self.collapsed);
        self.collapsed
    }

    /// Whether `node` is the page being viewed.
    pub fn is_active(&self, node: &TreeNode) -> bool {
        node.target_url.as_deref() == Some(self.current.as_str())
    }

    /// Visible rows in display order. Children are listed only under
    /// expanded directories.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        for node in &self.data.root {
            self.push_rows(node, &mut rows);
        }
        rows
    }

    fn push_rows(&self, node: &TreeNode, rows: &mut Vec<TreeRow>) {
        if !self.memo.is_visible(&node.path) {
            return;
        }
        let is_expanded = node.is_directory && self.is_expanded(&node.path);
        rows.push(TreeRow {
            path: node.path.clone(),
            depth: node.depth,
            label_html: highlight_html(&node.display_name(), &self.filter),
            is_directory: node.is_directory,
            is_expanded,
            is_active: self.is_active(node),
        });
        if is_expanded {
            for child in &node.children {
                self.push_rows(child, rows);
            }
        }
    }
}
