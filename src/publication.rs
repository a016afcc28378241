//! Publication management context
//!
//! A nestable on/off toggle controlling whether page queries filter down to
//! published content. Requests normally run inside one published-only block;
//! preview mode (staff users) skips the filtering. Blocks nest, so code that
//! needs the unfiltered tree mid-request can open an inner block without
//! caring what the outer one selected.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// Raised by [`PublicationManager::end`] when no block is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Publication management beyond scope of started blocks")]
pub struct PublicationManagementError;

/// Stack of nested published-only blocks.
///
/// Clones share the same stack, so a manager can be handed to middleware and
/// views alike.
#[derive(Debug, Clone, Default)]
pub struct PublicationManager {
	stack: Arc<Mutex<Vec<bool>>>,
}

impl PublicationManager {
	/// Create a manager with no open blocks
	pub fn new() -> Self {
		Self::default()
	}

	/// Open a block; `select_published` decides whether queries inside it
	/// filter to published content
	pub fn begin(&self, select_published: bool) {
		self.stack.lock().push(select_published);
	}

	/// Close the innermost block
	pub fn end(&self) -> Result<(), PublicationManagementError> {
		self.stack
			.lock()
			.pop()
			.map(|_| ())
			.ok_or(PublicationManagementError)
	}

	/// Whether the innermost open block requests published-only filtering;
	/// false when no block is open
	pub fn select_published_active(&self) -> bool {
		self.stack.lock().last().copied().unwrap_or(false)
	}

	/// Close every open block. Tolerates an already-empty stack, so teardown
	/// paths can call it unconditionally.
	pub fn drain(&self) {
		let mut drained = 0usize;
		while self.end().is_ok() {
			drained += 1;
		}
		if drained > 0 {
			debug!(drained, "drained publication blocks");
		}
	}

	/// Open a block for the duration of the returned guard
	pub fn select_published(&self, select_published: bool) -> PublicationScope {
		self.begin(select_published);
		PublicationScope {
			manager: self.clone(),
		}
	}
}

/// Guard closing its publication block on drop
#[must_use = "the publication block ends when the scope is dropped"]
pub struct PublicationScope {
	manager: PublicationManager,
}

impl Drop for PublicationScope {
	fn drop(&mut self) {
		// A teardown path may already have drained the stack.
		let _ = self.manager.end();
	}
}

/// Middleware that wraps each request in a publication block.
///
/// Published-only filtering is on unless the request asks for preview mode
/// and the visitor is a staff user. The response half drains whatever blocks
/// the request left open.
pub struct PublicationMiddleware {
	manager: PublicationManager,
}

impl PublicationMiddleware {
	/// Create a middleware over the given manager
	pub fn new(manager: PublicationManager) -> Self {
		Self { manager }
	}

	/// The manager this middleware drives
	pub fn manager(&self) -> &PublicationManager {
		&self.manager
	}

	/// Starts preview mode, if available
	pub fn process_request(&self, preview_requested: bool, is_staff: bool) {
		let preview_mode = preview_requested && is_staff;
		self.manager.begin(!preview_mode);
	}

	/// Cleans up after preview mode
	pub fn process_response(&self) {
		self.manager.drain();
	}
}
