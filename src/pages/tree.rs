//! Nested-set page tree engine
//!
//! Every page owns a `(left, right)` interval; interval containment encodes
//! the ancestor relation and ascending `left` equals preorder traversal.
//! Mutations (insert, move, delete, sibling swap) re-number intervals with a
//! handful of bulk updates, all applied inside one [`TreeMutationContext`]:
//! acquiring the context takes an exclusive lock over the whole page table,
//! so two mutations can never interleave their re-numbering steps, and a
//! context dropped without [`TreeMutationContext::commit`] rolls every update
//! back.
//!
//! Moves and swaps temporarily negate the intervals of the branch being
//! relocated. Parked rows sit outside the positive coordinate space, so the
//! excise and widen passes cannot disturb them; the final update restores
//! them shifted to their new position in one expression.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{NewPage, Page, PageId};
use crate::error::{CmsError, CmsResult};

/// Direction of a sibling move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
	/// Swap with the preceding sibling
	Up,
	/// Swap with the following sibling
	Down,
}

impl FromStr for MoveDirection {
	type Err = CmsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"up" => Ok(MoveDirection::Up),
			"down" => Ok(MoveDirection::Down),
			other => Err(CmsError::InvalidDirection(other.to_string())),
		}
	}
}

/// Outcome of a sibling move
///
/// A page that is already the first (or last) child has nothing to swap with;
/// that is a defined outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
	/// The page exchanged positions with the given sibling
	Moved {
		/// The sibling the page was swapped with
		with: PageId,
	},
	/// The page is already first/last among its siblings
	NothingToSwapWith,
}

/// One row of the locked snapshot a mutation works from
#[derive(Debug, Clone)]
pub(crate) struct TreeEntry {
	pub id: PageId,
	pub parent: Option<PageId>,
	pub left: i64,
	pub right: i64,
	pub slug: String,
}

impl TreeEntry {
	fn branch_width(&self) -> i64 {
		self.right - self.left + 1
	}
}

/// Consistent view of `(id, parent, left, right, slug)` for every page,
/// ordered by ascending `left`, captured under the exclusive lock.
pub(crate) struct TreeSnapshot {
	entries: Vec<TreeEntry>,
}

impl TreeSnapshot {
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[TreeEntry] {
		&self.entries
	}

	pub fn get(&self, id: PageId) -> Option<&TreeEntry> {
		self.entries.iter().find(|e| e.id == id)
	}

	pub fn root(&self) -> Option<&TreeEntry> {
		self.entries.iter().find(|e| e.parent.is_none())
	}

	pub fn slug_in_use(
		&self,
		parent: Option<PageId>,
		slug: &str,
		exclude: Option<PageId>,
	) -> bool {
		self.entries
			.iter()
			.any(|e| e.parent == parent && e.slug == slug && Some(e.id) != exclude)
	}
}

#[derive(Debug, Default)]
struct PageTable {
	rows: HashMap<PageId, Page>,
}

/// Storage for page rows
///
/// An in-process table behind an async mutex. The mutex stands in for the
/// storage layer's `SELECT ... FOR UPDATE` table lock: mutations hold it for
/// their whole transaction via [`TreeMutationContext`], while readers take it
/// only long enough to clone a consistent snapshot. A reader therefore sees
/// either the fully-pre-mutation or fully-post-mutation tree, never an
/// intermediate interval layout.
#[derive(Debug, Clone, Default)]
pub struct PageStore {
	table: Arc<Mutex<PageTable>>,
	children_queries: Arc<AtomicU64>,
}

impl PageStore {
	/// Create an empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// Begin a tree mutation: lock the table and hand out a working copy.
	///
	/// Dropping the returned context without committing leaves the table
	/// exactly as it was.
	pub(crate) async fn begin_mutation(&self) -> TreeMutationContext {
		let guard = self.table.clone().lock_owned().await;
		let work = PageTable {
			rows: guard.rows.clone(),
		};
		TreeMutationContext { guard, work }
	}

	/// All pages, ordered by ascending `left` (preorder)
	pub async fn snapshot(&self) -> Vec<Page> {
		let table = self.table.lock().await;
		let mut pages: Vec<Page> = table.rows.values().cloned().collect();
		pages.sort_by_key(|p| p.left);
		pages
	}

	/// Fetch a single page
	pub async fn get(&self, id: PageId) -> Option<Page> {
		self.table.lock().await.rows.get(&id).cloned()
	}

	/// Direct children of a page, ordered by `left`.
	///
	/// Counts as one children query; [`PageTree::get_children`] avoids the
	/// call entirely for leaf pages.
	pub async fn children_of(&self, id: PageId) -> Vec<Page> {
		self.children_queries.fetch_add(1, Ordering::Relaxed);
		let table = self.table.lock().await;
		let mut children: Vec<Page> = table
			.rows
			.values()
			.filter(|p| p.parent == Some(id))
			.cloned()
			.collect();
		children.sort_by_key(|p| p.left);
		children
	}

	/// Number of pages in the store
	pub async fn len(&self) -> usize {
		self.table.lock().await.rows.len()
	}

	/// Whether the store holds no pages
	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	/// How many children queries have been issued against this store.
	///
	/// Instrumentation for the leaf-page optimization: fetching the children
	/// of a page with `right - left == 1` must not issue a query.
	pub fn children_queries(&self) -> u64 {
		self.children_queries.load(Ordering::Relaxed)
	}
}

/// An exclusive, transactional view of the page table.
///
/// Holds the table lock for its whole lifetime. All bulk updates apply to a
/// working copy; [`commit`](Self::commit) swaps the copy in atomically, and
/// dropping the context without committing discards it.
pub(crate) struct TreeMutationContext {
	guard: OwnedMutexGuard<PageTable>,
	work: PageTable,
}

impl TreeMutationContext {
	/// The locked snapshot this mutation computes its layout from
	pub fn snapshot(&self) -> TreeSnapshot {
		let mut entries: Vec<TreeEntry> = self
			.work
			.rows
			.values()
			.map(|p| TreeEntry {
				id: p.id,
				parent: p.parent,
				left: p.left,
				right: p.right,
				slug: p.slug.clone(),
			})
			.collect();
		entries.sort_by_key(|e| e.left);
		TreeSnapshot { entries }
	}

	/// Widen the tree at `at`: shift every bound at or after it up by `width`
	///
	/// `UPDATE pages SET left = left + width WHERE left >= at` plus the same
	/// for `right`. Parked (negative) rows are never matched.
	pub fn widen(&mut self, at: i64, width: i64) {
		for page in self.work.rows.values_mut() {
			if page.left >= at {
				page.left += width;
			}
			if page.right >= at {
				page.right += width;
			}
		}
	}

	/// Excise `width` units at `cut`: shift every bound at or after it down
	pub fn excise(&mut self, cut: i64, width: i64) {
		for page in self.work.rows.values_mut() {
			if page.left >= cut {
				page.left -= width;
			}
			if page.right >= cut {
				page.right -= width;
			}
		}
	}

	/// Park the strict descendants of the `(left, right)` interval by
	/// negating their bounds, taking them out of positive coordinate space
	pub fn park_descendants(&mut self, left: i64, right: i64) {
		for page in self.work.rows.values_mut() {
			if page.left > left && page.right < right {
				page.left = -page.left;
				page.right = -page.right;
			}
		}
	}

	/// Restore parked descendants of the old `(left, right)` interval,
	/// shifting them by `offset` in the same pass
	pub fn unpark_descendants(&mut self, old_left: i64, old_right: i64, offset: i64) {
		for page in self.work.rows.values_mut() {
			if page.left < -old_left && page.right > -old_right {
				page.left = -page.left + offset;
				page.right = -page.right + offset;
			}
		}
	}

	/// Park a whole branch, bounds included
	pub fn park_branch(&mut self, left: i64, right: i64) {
		for page in self.work.rows.values_mut() {
			if page.left >= left && page.right <= right {
				page.left = -page.left;
				page.right = -page.right;
			}
		}
	}

	/// Shift a whole branch, bounds included, by `delta`
	pub fn shift_branch(&mut self, left: i64, right: i64, delta: i64) {
		for page in self.work.rows.values_mut() {
			if page.left >= left && page.right <= right {
				page.left += delta;
				page.right += delta;
			}
		}
	}

	/// Restore a parked branch, shifted by `offset`
	pub fn unpark_branch(&mut self, left: i64, right: i64, offset: i64) {
		for page in self.work.rows.values_mut() {
			if page.left <= -left && page.right >= -right {
				page.left = -page.left + offset;
				page.right = -page.right + offset;
			}
		}
	}

	/// Insert or replace one row
	pub fn put(&mut self, page: Page) {
		self.work.rows.insert(page.id, page);
	}

	/// Apply an edit to one row; returns false if the row does not exist
	pub fn update(&mut self, id: PageId, edit: impl FnOnce(&mut Page)) -> bool {
		match self.work.rows.get_mut(&id) {
			Some(page) => {
				edit(page);
				true
			}
			None => false,
		}
	}

	/// Delete every row whose interval lies inside `(left, right)`, bounds
	/// included (the cascade half of a subtree delete)
	pub fn remove_branch(&mut self, left: i64, right: i64) -> usize {
		let before = self.work.rows.len();
		self.work
			.rows
			.retain(|_, p| !(p.left >= left && p.right <= right));
		before - self.work.rows.len()
	}

	/// Atomically publish the working copy and release the lock
	pub fn commit(mut self) {
		*self.guard = std::mem::take(&mut self.work);
	}
}

/// The page tree facade
///
/// Wraps a [`PageStore`] with the nested-set mutation algorithms and the
/// basic reads. Cloning is cheap and clones share the same store, so a tree
/// can be handed to concurrent tasks; every mutation serializes on the
/// store's table lock.
#[derive(Debug, Clone, Default)]
pub struct PageTree {
	store: PageStore,
}

impl PageTree {
	/// Create a tree over a fresh empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a tree over an existing store
	pub fn with_store(store: PageStore) -> Self {
		Self { store }
	}

	/// The underlying store
	pub fn store(&self) -> &PageStore {
		&self.store
	}

	/// Insert a new page as the last child of `parent`.
	///
	/// The very first page inserted becomes the homepage; after that, a
	/// missing `parent` attaches the page under the homepage.
	pub async fn add_page(
		&self,
		parent: Option<PageId>,
		title: String,
		slug: String,
	) -> CmsResult<Page> {
		self.add_page_with(parent, NewPage::new(title, slug)).await
	}

	/// Insert a new page with the full field set of [`NewPage`]
	pub async fn add_page_with(&self, parent: Option<PageId>, new_page: NewPage) -> CmsResult<Page> {
		let mut ctx = self.store.begin_mutation().await;
		let snapshot = ctx.snapshot();
		let id = Uuid::new_v4();

		let page = if snapshot.is_empty() {
			// The first page to be created, ever: it is the homepage.
			new_page.into_page(id, None, 1, 2)
		} else {
			let parent_id = match parent {
				Some(parent_id) => parent_id,
				// No parent given - attach under the homepage.
				None => {
					snapshot
						.root()
						.ok_or_else(|| {
							CmsError::InvalidHierarchy("page tree has no root".to_string())
						})?
						.id
				}
			};
			let parent_entry = snapshot
				.get(parent_id)
				.ok_or_else(|| CmsError::PageNotFound(parent_id.to_string()))?;
			if snapshot.slug_in_use(Some(parent_id), &new_page.slug, None) {
				return Err(CmsError::SlugConflict(new_page.slug));
			}

			// The new page becomes the parent's last child: it takes over the
			// parent's right bound and the rest of the tree shifts up by the
			// width of a single-node branch.
			let parent_right = parent_entry.right;
			debug!(at = parent_right, width = 2, "widening tree for insert");
			ctx.widen(parent_right, 2);
			new_page.into_page(id, Some(parent_id), parent_right, parent_right + 1)
		};

		ctx.put(page.clone());
		ctx.commit();
		info!(page_id = %page.id, slug = %page.slug, left = page.left, right = page.right, "page created");
		Ok(page)
	}

	/// Insert a page whose `left`/`right` bounds are already assigned.
	///
	/// Bypasses the re-numbering logic entirely; the caller is responsible
	/// for tree consistency. Intended for fixtures and data imports.
	pub async fn insert_unchecked(&self, page: Page) -> CmsResult<Page> {
		if page.left >= page.right {
			return Err(CmsError::InvalidHierarchy(format!(
				"page interval ({}, {}) is not a valid nested-set interval",
				page.left, page.right
			)));
		}
		let mut ctx = self.store.begin_mutation().await;
		ctx.put(page.clone());
		ctx.commit();
		Ok(page)
	}

	/// Move a page (and its whole subtree) to become the last child of
	/// `new_parent`, preserving the subtree's internal structure.
	///
	/// A missing `new_parent` targets the homepage. Moving a page under its
	/// current parent is a no-op; moving it under itself or one of its own
	/// descendants is an [`CmsError::InvalidHierarchy`] error, as is moving
	/// the homepage.
	pub async fn move_page(&self, id: PageId, new_parent: Option<PageId>) -> CmsResult<Page> {
		let mut ctx = self.store.begin_mutation().await;
		let snapshot = ctx.snapshot();

		let entry = snapshot
			.get(id)
			.ok_or_else(|| CmsError::PageNotFound(id.to_string()))?
			.clone();
		if entry.parent.is_none() {
			return Err(CmsError::InvalidHierarchy(
				"the homepage cannot be moved".to_string(),
			));
		}

		let new_parent_id = match new_parent {
			Some(parent_id) => parent_id,
			None => {
				snapshot
					.root()
					.ok_or_else(|| CmsError::InvalidHierarchy("page tree has no root".to_string()))?
					.id
			}
		};
		if entry.parent == Some(new_parent_id) {
			// Already a child of the target parent - nothing to renumber.
			drop(ctx);
			return self.get_page(id).await;
		}

		let target = snapshot
			.get(new_parent_id)
			.ok_or_else(|| CmsError::PageNotFound(new_parent_id.to_string()))?
			.clone();
		if target.left >= entry.left && target.right <= entry.right {
			return Err(CmsError::InvalidHierarchy(format!(
				"cannot move page {} under its own subtree",
				id
			)));
		}
		if snapshot.slug_in_use(Some(new_parent_id), &entry.slug, Some(id)) {
			return Err(CmsError::SlugConflict(entry.slug));
		}

		let branch_width = entry.branch_width();

		// Park the descendants out of positive interval space so the excise
		// pass cannot touch them.
		if branch_width > 2 {
			ctx.park_descendants(entry.left, entry.right);
		}

		// Close the gap the branch leaves behind.
		ctx.excise(entry.left, branch_width);

		// The target parent's cached right bound was captured before the
		// excision; if the excised branch sat to its left, the bound has
		// shifted down by the branch width.
		let mut parent_right = target.right;
		if parent_right > entry.right {
			parent_right -= branch_width;
		}
		let new_left = parent_right;
		let new_right = new_left + branch_width - 1;

		// Open a gap at the new position and land the branch in it.
		ctx.widen(new_left, branch_width);
		if branch_width > 2 {
			let child_offset = new_left - entry.left;
			ctx.unpark_descendants(entry.left, entry.right, child_offset);
		}
		ctx.update(id, |p| {
			p.parent = Some(new_parent_id);
			p.left = new_left;
			p.right = new_right;
		});

		ctx.commit();
		info!(
			page_id = %id,
			new_parent = %new_parent_id,
			left = new_left,
			right = new_right,
			"page moved"
		);
		self.get_page(id).await
	}

	/// Delete a page and its entire subtree.
	///
	/// Returns the number of pages removed. The remaining intervals close up
	/// over the gap in the same pass.
	pub async fn delete_page(&self, id: PageId) -> CmsResult<usize> {
		let mut ctx = self.store.begin_mutation().await;
		let snapshot = ctx.snapshot();
		let entry = snapshot
			.get(id)
			.ok_or_else(|| CmsError::PageNotFound(id.to_string()))?
			.clone();

		let branch_width = entry.branch_width();
		let removed = ctx.remove_branch(entry.left, entry.right);
		ctx.excise(entry.left, branch_width);
		ctx.commit();
		info!(page_id = %id, removed, "page deleted");
		Ok(removed)
	}

	/// Exchange a page's position with its immediately preceding (`up`) or
	/// following (`down`) sibling, keeping both subtrees' internal structure.
	pub async fn move_sibling(
		&self,
		id: PageId,
		direction: MoveDirection,
	) -> CmsResult<SwapOutcome> {
		let mut ctx = self.store.begin_mutation().await;
		let snapshot = ctx.snapshot();
		let page = snapshot
			.get(id)
			.ok_or_else(|| CmsError::PageNotFound(id.to_string()))?
			.clone();

		// Siblings in tree order; walking the reversed list finds the
		// preceding sibling as "the next one".
		let mut siblings: Vec<&TreeEntry> = snapshot
			.entries()
			.iter()
			.filter(|e| e.parent == page.parent)
			.collect();
		if direction == MoveDirection::Up {
			siblings.reverse();
		}
		let mut sibling_iter = siblings.iter();
		for sibling in sibling_iter.by_ref() {
			if sibling.id == id {
				break;
			}
		}
		let other = match sibling_iter.next() {
			Some(other) => (*other).clone(),
			None => return Ok(SwapOutcome::NothingToSwapWith),
		};

		// Put the two branches in tree order.
		let (first, second) = if page.left < other.left {
			(page, other.clone())
		} else {
			(other.clone(), page)
		};
		let first_width = first.branch_width();
		let second_width = second.branch_width();

		// Excise the first branch into parked space, slide the second branch
		// down into the vacated gap, then land the first branch after it.
		ctx.park_branch(first.left, first.right);
		ctx.shift_branch(second.left, second.right, -first_width);
		ctx.unpark_branch(first.left, first.right, second_width);

		ctx.commit();
		info!(page_id = %id, swapped_with = %other.id, ?direction, "sibling order changed");
		Ok(SwapOutcome::Moved { with: other.id })
	}

	/// Toggle a page's publication switch
	pub async fn set_online(&self, id: PageId, is_online: bool) -> CmsResult<()> {
		let mut ctx = self.store.begin_mutation().await;
		if !ctx.update(id, |p| p.is_online = is_online) {
			return Err(CmsError::PageNotFound(id.to_string()));
		}
		ctx.commit();
		Ok(())
	}

	/// Fetch a single page
	pub async fn get_page(&self, id: PageId) -> CmsResult<Page> {
		self.store
			.get(id)
			.await
			.ok_or_else(|| CmsError::PageNotFound(id.to_string()))
	}

	/// All pages ordered by ascending `left` (preorder)
	pub async fn all_pages(&self) -> Vec<Page> {
		self.store.snapshot().await
	}

	/// Direct children of a page, ordered by `left`.
	///
	/// A leaf page (`right - left == 1`) is answered without touching the
	/// store at all.
	pub async fn get_children(&self, id: PageId) -> CmsResult<Vec<Page>> {
		let page = self.get_page(id).await?;
		// Optimization - don't fetch children we know aren't there!
		if !page.has_children() {
			return Ok(Vec::new());
		}
		Ok(self.store.children_of(id).await)
	}
}
