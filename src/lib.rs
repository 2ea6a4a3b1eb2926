//! Client-side search and navigation-tree filtering for generated
//! documentation sites.
//!
//! The crate loads the site's page-summary corpus (`cache.json`), builds a
//! CJK-aware TF-IDF index over it, and answers debounced queries with a
//! latest-wins guarantee. The navigation tree (`filetree.json`) gets filter
//! visibility, highlighting and persisted expand/collapse state.
//!
//! Everything observable is returned as typed values for a presentation layer
//! to render; see [`session::SearchSession`] and [`tree::TreeView`].

pub mod assets;
pub mod config;
pub mod controller;
pub mod corpus;
pub mod error;
pub mod search;
pub mod session;
pub mod store;
pub mod tracing;
pub mod tree;

pub use assets::{AssetSource, DirSource, MemorySource};
pub use config::Config;
pub use controller::{QueryController, SearchView, SequenceGate};
pub use corpus::{Corpus, CorpusRecord};
pub use error::{LoadError, SearchError};
pub use search::{IndexHandle, QueryEngine, QueryOutcome, QueryResult, ResultOrigin};
pub use session::{SearchSession, TreeLoad};
pub use store::{ClientState, FileStore, MemoryStore, StateStore, Theme};
pub use tree::{FileTreeData, NavAction, TreeNode, TreeView};
