//! Page records and content kinds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a page
pub type PageId = Uuid;

/// The kind of content a page carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
	/// Regular page content rendered in place
	Content,
	/// A link to another URL, shown in navigation but resolved elsewhere
	Link,
}

impl ContentKind {
	/// Stable identifier used in serialized documents
	pub fn as_str(&self) -> &'static str {
		match self {
			ContentKind::Content => "content",
			ContentKind::Link => "link",
		}
	}
}

/// Content attached to a page, one variant per registered kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageContent {
	/// Plain page body
	Content {
		/// Body text of the page
		body: String,
	},
	/// External or internal link target
	Link {
		/// Absolute or site-relative URL this page points at
		link_url: String,
	},
}

impl PageContent {
	/// The kind tag for this content
	pub fn kind(&self) -> ContentKind {
		match self {
			PageContent::Content { .. } => ContentKind::Content,
			PageContent::Link { .. } => ContentKind::Link,
		}
	}
}

impl Default for PageContent {
	fn default() -> Self {
		PageContent::Content { body: String::new() }
	}
}

/// A page within the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
	/// Identifier
	pub id: PageId,
	/// Parent page; `None` only for the homepage
	pub parent: Option<PageId>,
	/// Nested-set lower bound; 1 for the homepage
	pub left: i64,
	/// Nested-set upper bound; always greater than `left`
	pub right: i64,
	/// Path segment, unique among the children of one parent
	pub slug: String,
	/// Full page title
	pub title: String,
	/// Shorter title used in navigation, falling back to `title`
	pub short_title: Option<String>,
	/// Whether this page appears in its parent's navigation
	pub in_navigation: bool,
	/// Publication switch; offline pages are hidden from published queries
	pub is_online: bool,
	/// When the page starts appearing on the site; `None` publishes immediately
	pub publication_date: Option<DateTime<Utc>>,
	/// When the page stops appearing on the site; `None` never expires
	pub expiry_date: Option<DateTime<Utc>>,
	/// Visitors must be logged in to see this page (inherited by descendants)
	pub requires_authentication: bool,
	/// Hide from navigation for anonymous visitors
	pub hide_from_anonymous: bool,
	/// The content attached to this page
	pub content: PageContent,
}

impl Page {
	/// Title used in navigation and admin listings
	pub fn display_title(&self) -> &str {
		match &self.short_title {
			Some(short) if !short.is_empty() => short,
			_ => &self.title,
		}
	}

	/// Width of this page's interval; twice the number of pages in the subtree
	pub fn branch_width(&self) -> i64 {
		self.right - self.left + 1
	}

	/// Number of pages in this page's subtree, itself included
	pub fn subtree_size(&self) -> i64 {
		self.branch_width() / 2
	}

	/// Whether this page is the site homepage
	pub fn is_homepage(&self) -> bool {
		self.parent.is_none()
	}

	/// Whether this page has any children, answered from the interval alone
	pub fn has_children(&self) -> bool {
		self.right - self.left > 1
	}

	/// Whether `other`'s interval is strictly contained in this page's
	pub fn contains(&self, other: &Page) -> bool {
		self.left < other.left && self.right > other.right
	}
}

/// Field set for a page about to be inserted into the tree
///
/// `left`/`right` are assigned by the tree on insert; everything except the
/// title and slug has a sensible default.
#[derive(Debug, Clone)]
pub struct NewPage {
	/// Full page title
	pub title: String,
	/// Path segment, unique among siblings
	pub slug: String,
	/// Shorter navigation title
	pub short_title: Option<String>,
	/// Show in the parent's navigation
	pub in_navigation: bool,
	/// Publication switch
	pub is_online: bool,
	/// Publication start
	pub publication_date: Option<DateTime<Utc>>,
	/// Publication end
	pub expiry_date: Option<DateTime<Utc>>,
	/// Require a logged-in visitor
	pub requires_authentication: bool,
	/// Hide from anonymous navigation
	pub hide_from_anonymous: bool,
	/// Attached content
	pub content: PageContent,
}

impl NewPage {
	/// Create a new page description with defaults matching a plain online page
	pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			slug: slug.into(),
			short_title: None,
			in_navigation: true,
			is_online: true,
			publication_date: None,
			expiry_date: None,
			requires_authentication: false,
			hide_from_anonymous: false,
			content: PageContent::default(),
		}
	}

	/// Set the navigation title
	pub fn short_title(mut self, short_title: impl Into<String>) -> Self {
		self.short_title = Some(short_title.into());
		self
	}

	/// Toggle navigation visibility
	pub fn in_navigation(mut self, in_navigation: bool) -> Self {
		self.in_navigation = in_navigation;
		self
	}

	/// Toggle the publication switch
	pub fn online(mut self, is_online: bool) -> Self {
		self.is_online = is_online;
		self
	}

	/// Set the publication start date
	pub fn publication_date(mut self, date: DateTime<Utc>) -> Self {
		self.publication_date = Some(date);
		self
	}

	/// Set the publication end date
	pub fn expiry_date(mut self, date: DateTime<Utc>) -> Self {
		self.expiry_date = Some(date);
		self
	}

	/// Require a logged-in visitor
	pub fn requires_authentication(mut self, required: bool) -> Self {
		self.requires_authentication = required;
		self
	}

	/// Hide from navigation for anonymous visitors
	pub fn hide_from_anonymous(mut self, hidden: bool) -> Self {
		self.hide_from_anonymous = hidden;
		self
	}

	/// Attach content
	pub fn content(mut self, content: PageContent) -> Self {
		self.content = content;
		self
	}

	pub(crate) fn into_page(self, id: PageId, parent: Option<PageId>, left: i64, right: i64) -> Page {
		Page {
			id,
			parent,
			left,
			right,
			slug: self.slug,
			title: self.title,
			short_title: self.short_title,
			in_navigation: self.in_navigation,
			is_online: self.is_online,
			publication_date: self.publication_date,
			expiry_date: self.expiry_date,
			requires_authentication: self.requires_authentication,
			hide_from_anonymous: self.hide_from_anonymous,
			content: self.content,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn page(left: i64, right: i64) -> Page {
		NewPage::new("Title", "slug").into_page(Uuid::new_v4(), None, left, right)
	}

	#[test]
	fn display_title_falls_back_to_title() {
		let mut p = page(1, 2);
		assert_eq!(p.display_title(), "Title");
		p.short_title = Some("Short".to_string());
		assert_eq!(p.display_title(), "Short");
		p.short_title = Some(String::new());
		assert_eq!(p.display_title(), "Title");
	}

	#[test]
	fn branch_width_counts_subtree() {
		let p = page(2, 7);
		assert_eq!(p.branch_width(), 6);
		assert_eq!(p.subtree_size(), 3);
		assert!(p.has_children());
		assert!(!page(2, 3).has_children());
	}

	#[test]
	fn interval_containment() {
		let outer = page(1, 8);
		let inner = page(2, 5);
		assert!(outer.contains(&inner));
		assert!(!inner.contains(&outer));
		assert!(!inner.contains(&inner.clone()));
	}
}
