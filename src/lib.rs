//! # Arbor CMS
//!
//! A content-management core built around a hierarchical page tree with
//! publication control. Pages live in a single rooted tree stored in
//! nested-set order: every page owns a `(left, right)` integer interval and
//! interval containment encodes the ancestor/descendant relation. All tree
//! mutations re-number the affected intervals inside one exclusive-locked
//! transaction, so concurrent requests can never observe or produce a
//! half-shifted tree.
//!
//! ## Architecture
//!
//! ```text
//! arbor-cms
//! ├── pages        - Page records, nested-set tree engine, traversal queries
//! │   ├── model    - Page, content kinds, publication fields
//! │   ├── tree     - PageTree, TreeMutationContext, in-memory store
//! │   ├── query    - published filtering, homepage/navigation/breadcrumbs
//! │   └── sql      - sea-query statements for SQL-backed stores
//! ├── publication  - nestable published-only query context + middleware
//! └── admin        - content-type registry, move-page view, sitemap JSON
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use arbor_cms::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let tree = PageTree::new();
//!
//! // The first page ever created becomes the homepage.
//! let home = tree
//! 	.add_page(None, "Home".to_string(), "home".to_string())
//! 	.await
//! 	.unwrap();
//! assert_eq!((home.left, home.right), (1, 2));
//!
//! // Children are appended as the parent's last child.
//! let blog = tree
//! 	.add_page(Some(home.id), "Blog".to_string(), "blog".to_string())
//! 	.await
//! 	.unwrap();
//! assert_eq!((blog.left, blog.right), (2, 3));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

// Module declarations
pub mod admin;
pub mod pages;
pub mod publication;

// Prelude for convenient imports
pub mod prelude {
	//! Convenient re-exports of commonly used items

	// Pages
	pub use crate::pages::model::{ContentKind, NewPage, Page, PageContent, PageId};
	pub use crate::pages::query::PageNode;
	pub use crate::pages::tree::{MoveDirection, PageStore, PageTree, SwapOutcome};

	// Publication
	pub use crate::publication::{
		PublicationManagementError, PublicationManager, PublicationMiddleware,
	};

	// Admin
	pub use crate::admin::{AdminUser, ContentRegistry, PageAdmin, PermissionChecker};

	// Errors
	pub use crate::error::{CmsError, CmsResult};
}

/// CMS error types
pub mod error {
	use thiserror::Error;

	use crate::publication::PublicationManagementError;

	/// CMS-related errors
	#[derive(Error, Debug)]
	pub enum CmsError {
		/// Page not found
		#[error("Page not found: {0}")]
		PageNotFound(String),

		/// Invalid page hierarchy (e.g. moving a page under its own subtree)
		#[error("Invalid page hierarchy: {0}")]
		InvalidHierarchy(String),

		/// A sibling under the same parent already owns this slug
		#[error("Duplicate slug under the same parent: {0}")]
		SlugConflict(String),

		/// Sibling move requested with a direction other than "up"/"down"
		#[error("Direction should be \"up\" or \"down\", got {0:?}")]
		InvalidDirection(String),

		/// Publication context popped more times than it was pushed
		#[error(transparent)]
		PublicationManagement(#[from] PublicationManagementError),

		/// Database error
		#[error("Database error: {0}")]
		Database(String),

		/// Generic error
		#[error("{0}")]
		Generic(String),
	}

	/// Result type for CMS operations
	pub type CmsResult<T> = Result<T, CmsError>;
}
