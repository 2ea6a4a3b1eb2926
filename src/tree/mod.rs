//! Navigation tree: loading, filter visibility, highlighting and view state.

pub mod highlight;
pub mod node;
pub mod view;
pub mod visibility;

pub use highlight::{Segment, escape_html, highlight_html, highlight_segments};
pub use node::{FileTreeData, TreeNode};
pub use view::{NavAction, TreeRow, TreeView, normalize_location};
pub use visibility::{VisibilityMemo, is_visible};
