//! Choosing the next comparison set.
//!
//! The pivot is the most-boosted record if any record has `extra_count > 0`,
//! otherwise the least-shown one. Neighbors are the records rated closest to
//! the pivot, so each round compares images of similar rank.

use sqlx::SqlitePool;

use crate::db;
use crate::error::Result;
use crate::model::{Image, Settings};

/// Neighbors returned when the caller does not ask for a count.
pub const DEFAULT_NEIGHBORS: u32 = 2;

/// Select the next comparison set: `count` neighbors followed by the pivot.
///
/// Runs in its own short read transaction. An empty library yields an empty
/// set rather than an error.
pub async fn select_next(pool: &SqlitePool, settings: &Settings, count: u32) -> Result<Vec<Image>> {
    let pref = settings.same_orientation;
    let mut tx = pool.begin().await?;

    let pivot = match db::get_priority_pivot(&mut *tx).await? {
        Some(pivot) => Some(pivot),
        None => db::get_least_shown(&mut *tx, pref).await?,
    };
    let Some(pivot) = pivot else {
        tracing::debug!(target: "selection", "No candidate for selection");
        return Ok(Vec::new());
    };

    let mut selected = db::get_neighbors(&mut *tx, &pivot, pref, count).await?;
    tx.commit().await?;

    tracing::debug!(
        target: "selection",
        pivot = %pivot.path,
        rating = pivot.elo_rating,
        neighbors = selected.len(),
        "Selected comparison set"
    );
    selected.push(pivot);
    Ok(selected)
}
