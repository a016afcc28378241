//! Property-based tests for the nested-set page tree
//!
//! Random operation sequences (insert, move, delete, sibling swap) against a
//! small tree, with the full interval invariant set checked after every run.

mod common;

use arbor_cms::prelude::*;
use common::assert_tree_invariants;
use proptest::prelude::*;

const MAX_PAGES: usize = 50;

#[derive(Debug, Clone)]
enum Op {
	Insert { parent_index: usize },
	Move { page_index: usize, parent_index: usize },
	Delete { page_index: usize },
	Swap { page_index: usize, up: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		3 => (0usize..MAX_PAGES).prop_map(|parent_index| Op::Insert { parent_index }),
		2 => ((0usize..MAX_PAGES), (0usize..MAX_PAGES))
			.prop_map(|(page_index, parent_index)| Op::Move { page_index, parent_index }),
		1 => (0usize..MAX_PAGES).prop_map(|page_index| Op::Delete { page_index }),
		2 => ((0usize..MAX_PAGES), any::<bool>())
			.prop_map(|(page_index, up)| Op::Swap { page_index, up }),
	]
}

async fn apply_ops(tree: &PageTree, ops: &[Op]) {
	let mut serial = 0usize;
	for op in ops {
		// Pick targets from the live preorder snapshot so indices stay
		// meaningful as the tree changes shape.
		let pages = tree.all_pages().await;
		match op {
			Op::Insert { parent_index } => {
				if pages.len() >= MAX_PAGES {
					continue;
				}
				let parent = pages.get(parent_index % pages.len().max(1)).map(|p| p.id);
				serial += 1;
				let slug = format!("p{serial}");
				tree.add_page(parent, slug.to_uppercase(), slug).await.unwrap();
			}
			Op::Move { page_index, parent_index } => {
				if pages.len() < 2 {
					continue;
				}
				let page = &pages[page_index % pages.len()];
				let parent = &pages[parent_index % pages.len()];
				// Rejected moves (own subtree, the homepage itself) must not
				// change anything; invariants are re-checked below anyway.
				let _ = tree.move_page(page.id, Some(parent.id)).await;
			}
			Op::Delete { page_index } => {
				if pages.len() < 2 {
					continue;
				}
				// Keep the root so the tree survives the whole run.
				let candidates: Vec<&Page> =
					pages.iter().filter(|p| !p.is_homepage()).collect();
				let page = candidates[page_index % candidates.len()];
				tree.delete_page(page.id).await.unwrap();
			}
			Op::Swap { page_index, up } => {
				if pages.is_empty() {
					continue;
				}
				let page = &pages[page_index % pages.len()];
				let direction = if *up { MoveDirection::Up } else { MoveDirection::Down };
				tree.move_sibling(page.id, direction).await.unwrap();
			}
		}
	}
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	#[test]
	fn prop_random_operation_sequences_preserve_invariants(
		ops in proptest::collection::vec(op_strategy(), 1..60),
	) {
		let rt = tokio::runtime::Runtime::new().unwrap();

		let pages = rt.block_on(async {
			let tree = PageTree::new();
			tree.add_page(None, "Home".to_string(), "home".to_string())
				.await
				.unwrap();
			apply_ops(&tree, &ops).await;
			tree.all_pages().await
		});

		assert_tree_invariants(&pages);
		// Total width always accounts for every page exactly once.
		let root = pages.iter().find(|p| p.is_homepage()).unwrap();
		prop_assert_eq!(root.right - root.left + 1, 2 * pages.len() as i64);
	}

	#[test]
	fn prop_insert_then_delete_roundtrips_every_interval(
		ops in proptest::collection::vec(op_strategy(), 1..30),
		parent_index in 0usize..MAX_PAGES,
	) {
		let rt = tokio::runtime::Runtime::new().unwrap();

		rt.block_on(async {
			let tree = PageTree::new();
			tree.add_page(None, "Home".to_string(), "home".to_string())
				.await
				.unwrap();
			apply_ops(&tree, &ops).await;

			let before = common::layout(&tree.all_pages().await);
			let pages = tree.all_pages().await;
			let parent = pages[parent_index % pages.len()].id;
			let extra = tree
				.add_page(Some(parent), "Extra".to_string(), "zz-extra".to_string())
				.await
				.unwrap();
			tree.delete_page(extra.id).await.unwrap();

			assert_eq!(common::layout(&tree.all_pages().await), before);
		});
	}

	#[test]
	fn prop_move_to_current_parent_changes_nothing(
		ops in proptest::collection::vec(op_strategy(), 1..30),
		page_index in 0usize..MAX_PAGES,
	) {
		let rt = tokio::runtime::Runtime::new().unwrap();

		rt.block_on(async {
			let tree = PageTree::new();
			tree.add_page(None, "Home".to_string(), "home".to_string())
				.await
				.unwrap();
			apply_ops(&tree, &ops).await;

			let pages = tree.all_pages().await;
			let page = &pages[page_index % pages.len()];
			let Some(parent) = page.parent else {
				return;
			};

			let before = common::layout(&pages);
			tree.move_page(page.id, Some(parent)).await.unwrap();
			assert_eq!(common::layout(&tree.all_pages().await), before);
		});
	}

	#[test]
	fn prop_swap_twice_restores_the_layout(
		ops in proptest::collection::vec(op_strategy(), 1..30),
		page_index in 0usize..MAX_PAGES,
	) {
		let rt = tokio::runtime::Runtime::new().unwrap();

		rt.block_on(async {
			let tree = PageTree::new();
			tree.add_page(None, "Home".to_string(), "home".to_string())
				.await
				.unwrap();
			apply_ops(&tree, &ops).await;

			let pages = tree.all_pages().await;
			let page = &pages[page_index % pages.len()];
			let before = common::layout(&pages);

			if tree.move_sibling(page.id, MoveDirection::Down).await.unwrap()
				== SwapOutcome::NothingToSwapWith
			{
				return;
			}
			tree.move_sibling(page.id, MoveDirection::Up).await.unwrap();
			assert_eq!(common::layout(&tree.all_pages().await), before);
		});
	}
}
