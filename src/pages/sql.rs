//! SQL statements for tree mutations on a SQL-backed store
//!
//! The in-memory [`super::tree`] engine and a SQL store share the same named
//! operations; this module renders each one as a single bulk statement, so a
//! backend can apply a whole mutation in a handful of round trips. The
//! snapshot select takes `FOR UPDATE` over every row, which is the table
//! lock the engine's transaction discipline relies on.

use sea_query::{
	Alias, Expr, ExprTrait, LockType, Order, PostgresQueryBuilder, Query,
};

fn table() -> Alias {
	Alias::new("pages_page")
}

fn id() -> Alias {
	Alias::new("id")
}

fn parent_id() -> Alias {
	Alias::new("parent_id")
}

fn left() -> Alias {
	Alias::new("left")
}

fn right() -> Alias {
	Alias::new("right")
}

fn slug() -> Alias {
	Alias::new("slug")
}

/// The locked snapshot read every mutation starts from:
/// `SELECT ... ORDER BY left FOR UPDATE` over all rows
pub fn lock_tree() -> String {
	Query::select()
		.columns([id(), parent_id(), left(), right(), slug()])
		.from(table())
		.order_by(left(), Order::Asc)
		.lock(LockType::Update)
		.to_string(PostgresQueryBuilder)
}

/// Widen the tree at `at` by `width`: the two shift-up updates of an insert
pub fn widen_branch(at: i64, width: i64) -> (String, String) {
	let lefts = Query::update()
		.table(table())
		.value(left(), Expr::col(left()).add(width))
		.and_where(Expr::col(left()).gte(at))
		.to_string(PostgresQueryBuilder);
	let rights = Query::update()
		.table(table())
		.value(right(), Expr::col(right()).add(width))
		.and_where(Expr::col(right()).gte(at))
		.to_string(PostgresQueryBuilder);
	(lefts, rights)
}

/// Excise `width` units at `cut`: the two shift-down updates of a delete or
/// the detach half of a move
pub fn excise_branch(cut: i64, width: i64) -> (String, String) {
	let lefts = Query::update()
		.table(table())
		.value(left(), Expr::col(left()).sub(width))
		.and_where(Expr::col(left()).gte(cut))
		.to_string(PostgresQueryBuilder);
	let rights = Query::update()
		.table(table())
		.value(right(), Expr::col(right()).sub(width))
		.and_where(Expr::col(right()).gte(cut))
		.to_string(PostgresQueryBuilder);
	(lefts, rights)
}

/// Park the strict descendants of `(branch_left, branch_right)` by negating
/// their bounds
pub fn park_descendants(branch_left: i64, branch_right: i64) -> String {
	Query::update()
		.table(table())
		.value(left(), Expr::col(left()).mul(-1))
		.value(right(), Expr::col(right()).mul(-1))
		.and_where(Expr::col(left()).gt(branch_left))
		.and_where(Expr::col(right()).lt(branch_right))
		.to_string(PostgresQueryBuilder)
}

/// Restore the parked descendants of the old `(branch_left, branch_right)`
/// interval, shifted by `offset`, in one expression
pub fn unpark_descendants(branch_left: i64, branch_right: i64, offset: i64) -> String {
	Query::update()
		.table(table())
		.value(left(), Expr::col(left()).sub(offset).mul(-1))
		.value(right(), Expr::col(right()).sub(offset).mul(-1))
		.and_where(Expr::col(left()).lt(-branch_left))
		.and_where(Expr::col(right()).gt(-branch_right))
		.to_string(PostgresQueryBuilder)
}

/// Park a whole branch, bounds included (the sibling-swap variant)
pub fn park_branch(branch_left: i64, branch_right: i64) -> String {
	Query::update()
		.table(table())
		.value(left(), Expr::col(left()).mul(-1))
		.value(right(), Expr::col(right()).mul(-1))
		.and_where(Expr::col(left()).gte(branch_left))
		.and_where(Expr::col(right()).lte(branch_right))
		.to_string(PostgresQueryBuilder)
}

/// Shift a whole branch, bounds included, down by `delta`
pub fn shift_branch(branch_left: i64, branch_right: i64, delta: i64) -> String {
	Query::update()
		.table(table())
		.value(left(), Expr::col(left()).sub(delta))
		.value(right(), Expr::col(right()).sub(delta))
		.and_where(Expr::col(left()).gte(branch_left))
		.and_where(Expr::col(right()).lte(branch_right))
		.to_string(PostgresQueryBuilder)
}

/// Restore a parked branch, shifted by `offset`
pub fn unpark_branch(branch_left: i64, branch_right: i64, offset: i64) -> String {
	Query::update()
		.table(table())
		.value(left(), Expr::col(left()).sub(offset).mul(-1))
		.value(right(), Expr::col(right()).sub(offset).mul(-1))
		.and_where(Expr::col(left()).lte(-branch_left))
		.and_where(Expr::col(right()).gte(-branch_right))
		.to_string(PostgresQueryBuilder)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lock_tree_selects_for_update_in_preorder() {
		let sql = lock_tree();
		assert!(sql.contains("\"pages_page\""));
		assert!(sql.contains("ORDER BY \"left\" ASC"));
		assert!(sql.contains("FOR UPDATE"));
	}

	#[test]
	fn widen_shifts_both_bounds_up() {
		let (lefts, rights) = widen_branch(5, 2);
		assert!(lefts.contains("UPDATE \"pages_page\""));
		assert!(lefts.contains("\"left\" + 2"));
		assert!(lefts.contains("\"left\" >= 5"));
		assert!(rights.contains("\"right\" + 2"));
		assert!(rights.contains("\"right\" >= 5"));
	}

	#[test]
	fn excise_shifts_both_bounds_down() {
		let (lefts, rights) = excise_branch(7, 4);
		assert!(lefts.contains("\"left\" - 4"));
		assert!(lefts.contains("\"left\" >= 7"));
		assert!(rights.contains("\"right\" - 4"));
		assert!(rights.contains("\"right\" >= 7"));
	}

	#[test]
	fn park_negates_strict_descendants_only() {
		let sql = park_descendants(2, 7);
		assert!(sql.contains("* -1"));
		assert!(sql.contains("\"left\" > 2"));
		assert!(sql.contains("\"right\" < 7"));
	}

	#[test]
	fn unpark_restores_with_offset_in_one_expression() {
		let sql = unpark_descendants(2, 7, 6);
		assert!(sql.contains("\"left\" - 6"));
		assert!(sql.contains("* -1"));
		assert!(sql.contains("\"left\" < -2"));
		assert!(sql.contains("\"right\" > -7"));
	}

	#[test]
	fn swap_statements_cover_the_whole_branch() {
		let park = park_branch(4, 7);
		assert!(park.contains("\"left\" >= 4"));
		assert!(park.contains("\"right\" <= 7"));

		let shift = shift_branch(8, 11, 4);
		assert!(shift.contains("\"left\" - 4"));
		assert!(shift.contains("\"left\" >= 8"));

		let unpark = unpark_branch(4, 7, 4);
		assert!(unpark.contains("\"left\" <= -4"));
		assert!(unpark.contains("\"right\" >= -7"));
	}
}
