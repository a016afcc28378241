//! Admin surface for the page tree
//!
//! The admin drives tree mutations through the same engine as everything
//! else; what lives here is the request-facing glue: the content-type
//! registry the editor offers, the move-page view with its three outcomes
//! (forbidden, nothing to swap with, moved), and the sitemap JSON document
//! the tree editor renders from.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use http::{Response, StatusCode, header};
use serde_json::{Value as JsonValue, json};

use crate::error::{CmsError, CmsResult};
use crate::pages::model::{ContentKind, Page, PageId};
use crate::pages::tree::{MoveDirection, PageTree, SwapOutcome};

/// An authenticated admin visitor
#[derive(Debug, Clone)]
pub struct AdminUser {
	/// Username, for audit logging
	pub username: String,
	/// Staff users see the admin at all
	pub is_staff: bool,
}

impl AdminUser {
	/// A staff user
	pub fn staff(username: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			is_staff: true,
		}
	}

	/// A non-staff user
	pub fn anonymous() -> Self {
		Self {
			username: String::new(),
			is_staff: false,
		}
	}
}

/// Decides what an admin user may do to pages
#[async_trait]
pub trait PermissionChecker: Send + Sync {
	/// May the user add pages?
	async fn has_add_permission(&self, user: &AdminUser) -> bool;

	/// May the user change (edit, move, reorder) pages?
	async fn has_change_permission(&self, user: &AdminUser, page: Option<&Page>) -> bool;

	/// May the user delete pages?
	async fn has_delete_permission(&self, user: &AdminUser, page: Option<&Page>) -> bool;
}

/// Default checker: staff users may do everything, nobody else may do
/// anything
pub struct StaffPermissionChecker;

#[async_trait]
impl PermissionChecker for StaffPermissionChecker {
	async fn has_add_permission(&self, user: &AdminUser) -> bool {
		user.is_staff
	}

	async fn has_change_permission(&self, user: &AdminUser, _page: Option<&Page>) -> bool {
		user.is_staff
	}

	async fn has_delete_permission(&self, user: &AdminUser, _page: Option<&Page>) -> bool {
		user.is_staff
	}
}

/// Descriptor for one registered content kind
#[derive(Debug, Clone)]
pub struct ContentTypeDescriptor {
	/// The kind this descriptor describes
	pub kind: ContentKind,
	/// Human-readable label shown in the editor
	pub label: String,
	/// Icon name shown in the page tree
	pub icon: String,
	/// The heading the admin groups this content under
	pub classifier: String,
}

/// Typed registry of content kinds, built once at startup.
///
/// Replaces runtime content-class resolution with a fixed lookup from
/// [`ContentKind`] to its descriptor.
#[derive(Debug, Default)]
pub struct ContentRegistry {
	entries: DashMap<ContentKind, ContentTypeDescriptor>,
}

impl ContentRegistry {
	/// An empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the built-in content kinds
	pub fn with_defaults() -> Self {
		let registry = Self::new();
		registry.register(ContentTypeDescriptor {
			kind: ContentKind::Content,
			label: "Content".to_string(),
			icon: "pages/img/content.png".to_string(),
			classifier: "content".to_string(),
		});
		registry.register(ContentTypeDescriptor {
			kind: ContentKind::Link,
			label: "Link".to_string(),
			icon: "pages/img/link.png".to_string(),
			classifier: "utilities".to_string(),
		});
		registry
	}

	/// Register (or replace) a content kind
	pub fn register(&self, descriptor: ContentTypeDescriptor) {
		self.entries.insert(descriptor.kind, descriptor);
	}

	/// Look up a content kind
	pub fn get(&self, kind: ContentKind) -> Option<ContentTypeDescriptor> {
		self.entries.get(&kind).map(|e| e.value().clone())
	}

	/// All registered kinds
	pub fn kinds(&self) -> Vec<ContentKind> {
		self.entries.iter().map(|e| *e.key()).collect()
	}
}

/// Admin views over a page tree
pub struct PageAdmin {
	tree: PageTree,
	registry: ContentRegistry,
	permissions: Arc<dyn PermissionChecker>,
}

impl PageAdmin {
	/// Create the admin over a tree with the default content kinds and the
	/// given permission checker
	pub fn new(tree: PageTree, permissions: Arc<dyn PermissionChecker>) -> Self {
		Self {
			tree,
			registry: ContentRegistry::with_defaults(),
			permissions,
		}
	}

	/// The content-type registry backing the editor
	pub fn registry(&self) -> &ContentRegistry {
		&self.registry
	}

	/// Moves a page up or down among its siblings.
	///
	/// Outcomes: 403 when the user lacks change permission, 200 with an
	/// explanatory body when the page is already first/last, 302 to
	/// `next_url` on success. An unrecognized `direction` is a caller error
	/// and fails loudly instead of producing a response.
	pub async fn move_page_view(
		&self,
		user: &AdminUser,
		page_id: PageId,
		direction: &str,
		next_url: &str,
	) -> CmsResult<Response<String>> {
		if !self
			.permissions
			.has_change_permission(user, None)
			.await
		{
			return text_response(
				StatusCode::FORBIDDEN,
				"You do not have permission to move this page.",
			);
		}

		let direction: MoveDirection = direction.parse()?;
		match self.tree.move_sibling(page_id, direction).await? {
			SwapOutcome::NothingToSwapWith => text_response(
				StatusCode::OK,
				"Page could not be moved, as nothing to swap with.",
			),
			SwapOutcome::Moved { .. } => Response::builder()
				.status(StatusCode::FOUND)
				.header(header::LOCATION, next_url)
				.body(String::new())
				.map_err(|e| CmsError::Generic(e.to_string())),
		}
	}

	/// Returns a JSON data structure describing the sitemap
	pub async fn sitemap_json_view(&self, user: &AdminUser) -> CmsResult<JsonValue> {
		let can_add = self.permissions.has_add_permission(user).await;
		let entries = match self.tree.get_homepage().await {
			Ok(homepage) => {
				let pages = self.tree.all_pages().await;
				vec![self.sitemap_entry(user, &homepage, &pages).await]
			}
			Err(CmsError::PageNotFound(_)) => Vec::new(),
			Err(other) => return Err(other),
		};
		Ok(json!({
			"canAdd": can_add,
			"entries": entries,
		}))
	}

	fn sitemap_entry<'a>(
		&'a self,
		user: &'a AdminUser,
		page: &'a Page,
		pages: &'a [Page],
	) -> std::pin::Pin<Box<dyn Future<Output = JsonValue> + Send + 'a>> {
		Box::pin(async move {
		let mut children = Vec::new();
		for child in pages.iter().filter(|p| p.parent == Some(page.id)) {
			// Recursion through an explicit future box keeps the async fn
			// object-safe for arbitrary tree depths.
			children.push(self.sitemap_entry(user, child, pages).await);
		}
		let descriptor = self.registry.get(page.content.kind());
		json!({
			"id": page.id,
			"title": page.display_title(),
			"isOnline": page.is_online,
			"icon": descriptor.as_ref().map(|d| d.icon.clone()),
			"canChange": self.permissions.has_change_permission(user, Some(page)).await,
			"canDelete": self.permissions.has_delete_permission(user, Some(page)).await,
			"moveUrl": format!("/admin/pages/page/move-page/{}/", page.id),
			"children": children,
		})
		})
	}
}

fn text_response(status: StatusCode, body: &str) -> CmsResult<Response<String>> {
	Response::builder()
		.status(status)
		.header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
		.body(body.to_string())
		.map_err(|e| CmsError::Generic(e.to_string()))
}
