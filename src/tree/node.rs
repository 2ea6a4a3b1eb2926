//! `filetree.json`: the static navigation tree.

use crate::assets::AssetSource;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};

/// Source-format suffix stripped from node names for display.
const SOURCE_SUFFIX: &str = ".adoc";

/// One file or directory. `path` is unique and keys expand/collapse state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub path: String,
    /// Site-relative page URL. Leaves without one are not navigable.
    #[serde(default, rename = "url")]
    pub target_url: Option<String>,
    pub is_directory: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    #[serde(default, rename = "level")]
    pub depth: usize,
}

impl TreeNode {
    /// Label to show: `title` if set, else `name` without `.adoc`.
    pub fn display_name(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.name.replacen(SOURCE_SUFFIX, "", 1),
        }
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Self> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// A leaf with a target. Directories are toggled, never navigated.
    pub fn is_navigable(&self) -> bool {
        !self.is_directory && self.target_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Tree plus a pre-flattened list of every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeData {
    pub root: Vec<TreeNode>,
    #[serde(default)]
    pub flat_list: Vec<TreeNode>,
}

impl FileTreeData {
    /// Decode `filetree.json`. A missing or empty `flat_list` is derived from `root`.
    pub fn parse(asset: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let mut data: Self = serde_json::from_slice(bytes).map_err(|source| {
            if source.is_data() {
                LoadError::Shape {
                    asset: asset.to_string(),
                    detail: source.to_string(),
                }
            } else {
                LoadError::Parse {
                    asset: asset.to_string(),
                    source,
                }
            }
        })?;
        if data.flat_list.is_empty() {
            data.flat_list = data.root.iter().flat_map(TreeNode::walk).cloned().collect();
        }
        tracing::info!(
            "Loaded file tree from '{}': {} nodes",
            asset,
            data.flat_list.len()
        );
        Ok(data)
    }

    pub async fn load(source: &dyn AssetSource, asset: &str) -> Result<Self, LoadError> {
        let bytes = source.fetch(asset).await?;
        Self::parse(asset, &bytes)
    }

    /// Every node, pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.root.iter().flat_map(TreeNode::walk)
    }
}
