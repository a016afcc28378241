//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;

use arbor_cms::prelude::*;

/// Assert every nested-set invariant over a preorder snapshot of the tree.
///
/// Panics with a description of the first violated invariant.
pub fn assert_tree_invariants(pages: &[Page]) {
	if pages.is_empty() {
		return;
	}

	// Every interval is non-degenerate.
	for page in pages {
		assert!(
			page.left < page.right,
			"page {} has inverted interval ({}, {})",
			page.slug,
			page.left,
			page.right
		);
	}

	// Intervals are strictly nested or disjoint, never partially overlapping.
	for a in pages {
		for b in pages {
			if a.id == b.id {
				continue;
			}
			let contains = a.left < b.left && a.right > b.right;
			let contained = b.left < a.left && b.right > a.right;
			let disjoint = a.right < b.left || b.right < a.left;
			assert!(
				contains || contained || disjoint,
				"pages {} ({},{}) and {} ({},{}) partially overlap",
				a.slug,
				a.left,
				a.right,
				b.slug,
				b.left,
				b.right
			);
		}
	}

	// Interval width encodes subtree size.
	for page in pages {
		let contained = pages
			.iter()
			.filter(|other| page.left <= other.left && page.right >= other.right)
			.count() as i64;
		assert_eq!(
			contained,
			(page.right - page.left + 1) / 2,
			"page {} interval ({},{}) does not match its subtree size",
			page.slug,
			page.left,
			page.right
		);
	}

	// Exactly one root.
	let roots: Vec<&Page> = pages.iter().filter(|p| p.parent.is_none()).collect();
	assert_eq!(roots.len(), 1, "expected exactly one root page");
	assert_eq!(roots[0].left, 1, "root must start the coordinate space at 1");

	// Ascending-left order is the preorder traversal of the parent relation.
	let mut children: HashMap<Option<PageId>, Vec<&Page>> = HashMap::new();
	for page in pages {
		children.entry(page.parent).or_default().push(page);
	}
	for siblings in children.values_mut() {
		siblings.sort_by_key(|p| p.left);
	}
	let mut preorder = Vec::with_capacity(pages.len());
	let mut stack = vec![roots[0]];
	while let Some(page) = stack.pop() {
		preorder.push(page.id);
		if let Some(kids) = children.get(&Some(page.id)) {
			for child in kids.iter().rev() {
				stack.push(child);
			}
		}
	}
	let mut by_left: Vec<&Page> = pages.iter().collect();
	by_left.sort_by_key(|p| p.left);
	let left_order: Vec<PageId> = by_left.iter().map(|p| p.id).collect();
	assert_eq!(
		preorder, left_order,
		"ascending-left order diverges from preorder traversal"
	);
}

/// Interval layout keyed by slug, for readable scenario assertions
pub fn layout(pages: &[Page]) -> HashMap<String, (i64, i64)> {
	pages
		.iter()
		.map(|p| (p.slug.clone(), (p.left, p.right)))
		.collect()
}

/// A tree with a homepage and the given child slugs under it
pub async fn tree_with_children(slugs: &[&str]) -> (PageTree, Page, Vec<Page>) {
	let tree = PageTree::new();
	let home = tree
		.add_page(None, "Home".to_string(), "home".to_string())
		.await
		.unwrap();
	let mut children = Vec::new();
	for slug in slugs {
		children.push(
			tree.add_page(Some(home.id), slug.to_uppercase(), slug.to_string())
				.await
				.unwrap(),
		);
	}
	(tree, home, children)
}
