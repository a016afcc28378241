//! Hierarchical page tree
//!
//! Pages form a single rooted tree stored in nested-set order. The `tree`
//! module owns the mutation algorithms, `query` builds traversal and
//! publication-aware reads on top of them, and `sql` renders the same bulk
//! updates for SQL-backed stores.

pub mod model;
pub mod query;
pub mod sql;
pub mod tree;

pub use model::{ContentKind, NewPage, Page, PageContent, PageId};
pub use query::PageNode;
pub use tree::{MoveDirection, PageStore, PageTree, SwapOutcome};
