//! Directory tiers and the transitions between them.
//!
//! A record's tier is encoded in the first directory of its root-relative
//! path. [`TierMachine`] keeps that layout in step with rating and status:
//! every transition moves the file through [`mover::move_into`] and writes
//! the new path back in the caller's transaction.
//!
//! Renames are not transactional, so each transition also records its moves
//! in a [`MoveLog`]. When the transaction does not commit, the log moves the
//! files back and the store and disk stay in step.
//!
//! | Transition | Target |
//! |---|---|
//! | rating changed | `good` (> 1200), `lower`, `bad` (< 1150) |
//! | hide | `hidden` |
//! | restore | `restored` |
//! | top-10 rebuild | `top10` / `other` |

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sqlx::{SqliteConnection, SqlitePool};

use crate::config::TierConfig;
use crate::db;
use crate::error::{Error, Result};
use crate::model::{Image, Tier};
use crate::mover;
use crate::scanner::relative_path;

/// Drives file moves for tier transitions under one managed root.
#[derive(Debug, Clone)]
pub struct TierMachine {
    root: PathBuf,
    layout: TierConfig,
}

/// Outcome of a top-10 rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Top10Report {
    /// Size of the target set
    pub target: usize,
    /// Paths moved into the top-10 directory
    pub added: Vec<String>,
    /// Paths moved out to the `other` directory
    pub removed: Vec<String>,
    /// Members left in place
    pub kept: usize,
}

/// File moves made under one transaction.
#[derive(Debug, Default)]
pub struct MoveLog {
    /// `(original, moved)` absolute paths, oldest first
    moves: Vec<(PathBuf, PathBuf)>,
}

impl MoveLog {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    fn record(&mut self, original: PathBuf, moved: PathBuf) {
        self.moves.push((original, moved));
    }

    /// Take over the moves of a nested unit of work that committed.
    pub fn append(&mut self, mut other: MoveLog) {
        self.moves.append(&mut other.moves);
    }

    /// Move every logged file back to its original directory, newest first.
    ///
    /// Failures are logged and skipped; a later ingest relocates whatever
    /// could not be put back.
    pub fn undo(self) {
        for (original, moved) in self.moves.into_iter().rev() {
            let Some(dir) = original.parent() else {
                continue;
            };
            match mover::move_into(&moved, dir) {
                Ok(back) if back == original => {
                    tracing::debug!(target: "tiers", path = %original.display(), "Move undone");
                }
                Ok(back) => {
                    tracing::warn!(
                        target: "tiers",
                        expected = %original.display(),
                        actual = %back.display(),
                        "Move undone under a different name"
                    );
                }
                Err(e) => {
                    tracing::error!(target: "tiers", path = %moved.display(), error = %e, "Failed to undo move");
                }
            }
        }
    }

    /// Pass `result` through, undoing the logged moves if it is an error.
    pub fn settle<T>(self, result: Result<T>) -> Result<T> {
        if result.is_err() && !self.is_empty() {
            tracing::warn!(target: "tiers", moves = self.len(), "Operation failed, undoing file moves");
            self.undo();
        }
        result
    }
}

impl TierMachine {
    pub fn new(root: PathBuf, layout: TierConfig) -> Self {
        Self { root, layout }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &TierConfig {
        &self.layout
    }

    /// Tier the record currently sits in, if any.
    pub fn current_tier(&self, image: &Image) -> Option<Tier> {
        self.layout.tier_of(&image.path)
    }

    /// Move a record's file into `tier` and persist the new path.
    ///
    /// Returns `false` when the file is already in the tier's directory.
    /// A completed rename is logged in `moves` before the path is written.
    pub async fn move_to(
        &self,
        conn: &mut SqliteConnection,
        image: &mut Image,
        tier: Tier,
        moves: &mut MoveLog,
    ) -> Result<bool> {
        let target_dir = self.root.join(self.layout.dir(tier));
        let current = self.root.join(&image.path);

        if current.parent() == Some(target_dir.as_path()) {
            tracing::debug!(target: "tiers", path = %image.path, %tier, "Already in place");
            return Ok(false);
        }

        let moved = mover::move_into(&current, &target_dir)?;
        moves.record(current, moved.clone());
        let new_path = relative_path(&self.root, &moved).ok_or_else(|| {
            Error::filesystem(
                &moved,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "moved file is outside the managed root",
                ),
            )
        })?;

        db::update_path(&mut *conn, image.id, &new_path).await?;
        tracing::info!(target: "tiers", from = %image.path, to = %new_path, %tier, "Moved");
        image.path = new_path;
        Ok(true)
    }

    /// Bring a record's location in line with its rating band.
    ///
    /// Hidden records stay where they are, and so do members of the top-10
    /// and `other` directories: only [`rebuild_top10`](Self::rebuild_top10)
    /// moves those. A record already in its band's directory is left
    /// untouched.
    pub async fn apply_rating(
        &self,
        conn: &mut SqliteConnection,
        image: &mut Image,
        moves: &mut MoveLog,
    ) -> Result<bool> {
        if image.hidden {
            return Ok(false);
        }

        let band = self.layout.band(image.elo_rating);
        let current = self.current_tier(image);

        if matches!(current, Some(Tier::Top10 | Tier::Other)) || current == Some(band) {
            return Ok(false);
        }

        self.move_to(conn, image, band, moves).await
    }

    /// Exclude a record from rotation and move it into the hidden directory.
    pub async fn hide(
        &self,
        conn: &mut SqliteConnection,
        image: &mut Image,
        moves: &mut MoveLog,
    ) -> Result<()> {
        db::set_hidden(&mut *conn, image.id, true).await?;
        image.hidden = true;
        self.move_to(conn, image, Tier::Hidden, moves).await?;
        Ok(())
    }

    /// Bring a hidden record back and move it into the restored directory.
    pub async fn restore(
        &self,
        conn: &mut SqliteConnection,
        image: &mut Image,
        moves: &mut MoveLog,
    ) -> Result<()> {
        db::set_hidden(&mut *conn, image.id, false).await?;
        image.hidden = false;
        self.move_to(conn, image, Tier::Restored, moves).await?;
        Ok(())
    }

    /// Recompute top-10 membership and move the difference.
    ///
    /// The target set is the `max(visible / 10, min_candidates)` highest-rated
    /// visible records, capped at the visible count. `min_candidates` is a
    /// floor on the set size, not a threshold for running at all: a library
    /// with fewer visible records than the floor puts every visible record in
    /// the top-10 directory.
    ///
    /// Newcomers move into the top-10 directory, former members that no
    /// longer qualify move to `other`.
    pub async fn rebuild_top10(
        &self,
        conn: &mut SqliteConnection,
        min_candidates: u32,
        moves: &mut MoveLog,
    ) -> Result<Top10Report> {
        let visible = db::count_visible(&mut *conn).await?;
        let n = (visible / 10).max(i64::from(min_candidates)).min(visible);

        let target = db::get_top_n(&mut *conn, n).await?;
        let current = db::get_in_dir(&mut *conn, self.layout.dir(Tier::Top10)).await?;

        let target_ids: HashSet<i64> = target.iter().map(|i| i.id).collect();
        let current_ids: HashSet<i64> = current.iter().map(|i| i.id).collect();

        let mut report = Top10Report {
            target: target.len(),
            ..Default::default()
        };

        for mut image in current.into_iter().filter(|i| !target_ids.contains(&i.id)) {
            self.move_to(conn, &mut image, Tier::Other, moves).await?;
            report.removed.push(image.path);
        }

        for mut image in target.into_iter() {
            if current_ids.contains(&image.id) {
                report.kept += 1;
                continue;
            }
            self.move_to(conn, &mut image, Tier::Top10, moves).await?;
            report.added.push(image.path);
        }

        tracing::info!(
            target: "tiers",
            target = report.target,
            added = report.added.len(),
            removed = report.removed.len(),
            kept = report.kept,
            "Rebuilt top 10"
        );
        Ok(report)
    }
}

// ============================================================================
// Single-transaction operations
// ============================================================================

/// Hide the record at `path`. Unknown paths are a no-op (`None`).
pub async fn hide(pool: &SqlitePool, tiers: &TierMachine, path: &str) -> Result<Option<Image>> {
    let mut moves = MoveLog::default();
    let result = hide_logged(pool, tiers, path, &mut moves).await;
    moves.settle(result)
}

async fn hide_logged(
    pool: &SqlitePool,
    tiers: &TierMachine,
    path: &str,
    moves: &mut MoveLog,
) -> Result<Option<Image>> {
    let mut tx = pool.begin().await?;
    let Some(mut image) = db::get_image_by_path(&mut *tx, path).await? else {
        tracing::warn!(target: "tiers", path, "Hide requested for unknown path");
        return Ok(None);
    };

    tiers.hide(&mut tx, &mut image, moves).await?;
    tx.commit().await?;
    Ok(Some(image))
}

/// Restore the most recently updated hidden record, if any.
pub async fn restore_last(pool: &SqlitePool, tiers: &TierMachine) -> Result<Option<Image>> {
    let mut moves = MoveLog::default();
    let result = restore_last_logged(pool, tiers, &mut moves).await;
    moves.settle(result)
}

async fn restore_last_logged(
    pool: &SqlitePool,
    tiers: &TierMachine,
    moves: &mut MoveLog,
) -> Result<Option<Image>> {
    let mut tx = pool.begin().await?;
    let Some(mut image) = db::get_last_hidden(&mut *tx).await? else {
        tracing::debug!(target: "tiers", "Nothing to restore");
        return Ok(None);
    };

    tiers.restore(&mut tx, &mut image, moves).await?;
    tx.commit().await?;
    Ok(Some(image))
}

/// Rebuild top-10 membership in one transaction.
///
/// On failure the transaction rolls back and files already moved are put
/// back where they were.
pub async fn build_top10(
    pool: &SqlitePool,
    tiers: &TierMachine,
    min_candidates: u32,
) -> Result<Top10Report> {
    let mut moves = MoveLog::default();
    let result = build_top10_logged(pool, tiers, min_candidates, &mut moves).await;
    moves.settle(result)
}

async fn build_top10_logged(
    pool: &SqlitePool,
    tiers: &TierMachine,
    min_candidates: u32,
    moves: &mut MoveLog,
) -> Result<Top10Report> {
    let mut tx = pool.begin().await?;
    let report = tiers.rebuild_top10(&mut tx, min_candidates, moves).await?;
    tx.commit().await?;
    Ok(report)
}
