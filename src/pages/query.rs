//! Traversal and publication-aware queries over the page tree
//!
//! Publication filtering follows the tree: a page is publicly visible only
//! when it and every ancestor up to the homepage are currently published.
//! The ancestor test runs over the nested-set intervals (an ancestor is any
//! page whose interval strictly contains this one), mirroring the
//! `NOT EXISTS` subquery a SQL store would use.

use chrono::{DateTime, Timelike, Utc};

use super::model::{Page, PageId};
use super::tree::PageTree;
use crate::error::{CmsError, CmsResult};
use crate::publication::PublicationManager;

/// A page with its children prefetched to some depth
#[derive(Debug, Clone)]
pub struct PageNode {
	/// The page itself
	pub page: Page,
	/// Prefetched children, ordered by `left`; empty past the prefetch depth
	pub children: Vec<PageNode>,
}

/// Whether a page's own publication fields allow it to be shown at `now`.
///
/// `now` is truncated to the minute so that a batch of queries issued while
/// rendering one response agree on what "now" means.
pub fn is_published(page: &Page, now: DateTime<Utc>) -> bool {
	let now = truncate_to_minute(now);
	if !page.is_online {
		return false;
	}
	if let Some(publication_date) = page.publication_date
		&& publication_date > now
	{
		return false;
	}
	if let Some(expiry_date) = page.expiry_date
		&& expiry_date <= now
	{
		return false;
	}
	true
}

/// Whether a page is publicly visible: published itself, with every ancestor
/// published too. `pages` must hold at least all ancestors of `page`.
pub fn is_publicly_visible(page: &Page, pages: &[Page], now: DateTime<Utc>) -> bool {
	if !is_published(page, now) {
		return false;
	}
	pages
		.iter()
		.filter(|candidate| candidate.contains(page))
		.all(|ancestor| is_published(ancestor, now))
}

fn truncate_to_minute(now: DateTime<Utc>) -> DateTime<Utc> {
	now.with_second(0)
		.and_then(|t| t.with_nanosecond(0))
		.unwrap_or(now)
}

impl PageTree {
	/// The site homepage
	pub async fn get_homepage(&self) -> CmsResult<Page> {
		self.all_pages()
			.await
			.into_iter()
			.find(|p| p.is_homepage())
			.ok_or_else(|| CmsError::PageNotFound("homepage".to_string()))
	}

	/// The homepage with children prefetched `depth` levels down, built from
	/// a single store snapshot
	pub async fn get_homepage_with_children(&self, depth: usize) -> CmsResult<PageNode> {
		let pages = self.all_pages().await;
		let home = pages
			.iter()
			.find(|p| p.is_homepage())
			.ok_or_else(|| CmsError::PageNotFound("homepage".to_string()))?
			.clone();
		Ok(build_node(home, &pages, depth))
	}

	/// All pages in preorder, filtered to publicly-visible ones when the
	/// publication context is active
	pub async fn pages_for(&self, publication: &PublicationManager) -> Vec<Page> {
		let pages = self.all_pages().await;
		if !publication.select_published_active() {
			return pages;
		}
		let now = Utc::now();
		pages
			.iter()
			.filter(|p| is_publicly_visible(p, &pages, now))
			.cloned()
			.collect()
	}

	/// Direct children, filtered to publicly-visible ones when the
	/// publication context is active
	pub async fn visible_children(
		&self,
		id: PageId,
		publication: &PublicationManager,
	) -> CmsResult<Vec<Page>> {
		let children = self.get_children(id).await?;
		if !publication.select_published_active() {
			return Ok(children);
		}
		// The children query only runs for pages that exist, so the
		// ancestors of every child are this page and its own ancestors.
		let pages = self.all_pages().await;
		let now = Utc::now();
		Ok(children
			.into_iter()
			.filter(|c| is_publicly_visible(c, &pages, now))
			.collect())
	}

	/// The sub-navigation of a page: visible children flagged for navigation
	pub async fn navigation(
		&self,
		id: PageId,
		publication: &PublicationManager,
	) -> CmsResult<Vec<Page>> {
		Ok(self
			.visible_children(id, publication)
			.await?
			.into_iter()
			.filter(|c| c.in_navigation)
			.collect())
	}

	/// The breadcrumb trail for a page: homepage first, the page itself last
	pub async fn breadcrumbs(&self, id: PageId) -> CmsResult<Vec<Page>> {
		let mut trail = vec![self.get_page(id).await?];
		while let Some(parent_id) = trail.last().and_then(|p| p.parent) {
			trail.push(self.get_page(parent_id).await?);
		}
		trail.reverse();
		Ok(trail)
	}

	/// Whether viewing this page requires a logged-in visitor; inherited
	/// from any ancestor
	pub async fn auth_required(&self, id: PageId) -> CmsResult<bool> {
		Ok(self
			.breadcrumbs(id)
			.await?
			.iter()
			.any(|p| p.requires_authentication))
	}

	/// The absolute URL path of a page: `/` for the homepage, otherwise the
	/// parent's path followed by the slug
	pub async fn url_path(&self, id: PageId) -> CmsResult<String> {
		let trail = self.breadcrumbs(id).await?;
		let mut path = String::from("/");
		for page in trail.iter().skip(1) {
			path.push_str(&page.slug);
			path.push('/');
		}
		Ok(path)
	}
}

fn build_node(page: Page, pages: &[Page], depth: usize) -> PageNode {
	let children = if depth == 0 || !page.has_children() {
		Vec::new()
	} else {
		pages
			.iter()
			.filter(|p| p.parent == Some(page.id))
			.map(|p| build_node(p.clone(), pages, depth - 1))
			.collect()
	};
	PageNode { page, children }
}
