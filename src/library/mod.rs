//! Ingestion: reconcile the files under the managed root with the store.
//!
//! Discovered files are processed in fixed-size batches, one transaction per
//! batch. Fingerprints for a batch are computed in parallel on a blocking
//! thread, then each file is reconciled inside its own savepoint so a failure
//! on one file never discards the rest of the batch.
//!
//! Per file, with `P` its root-relative path:
//!
//! - record at `P` with a hash: unchanged
//! - record at `P` without a hash: backfill the hash only
//! - no record, same hash recorded at a path that is gone: relocate that record
//! - no record, same hash recorded at a path that still exists: insert, then hide
//! - otherwise: insert

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use rayon::prelude::*;
use serde::Serialize;
use sqlx::{Acquire, SqliteConnection, SqlitePool};

use crate::db;
use crate::error::{Error, Result};
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::model::{Image, NewImage};
use crate::scanner::{self, ImageFilter, relative_path};
use crate::tiers::{MoveLog, TierMachine};

/// Outcome for one discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    Added { path: String },
    Backfilled { path: String },
    /// An existing record was retargeted to a file that moved on disk
    Relocated { from: String, to: String },
    /// A byte-identical copy of `original` was recorded and hidden
    Duplicate {
        path: String,
        original: String,
        hidden_path: String,
    },
    Unchanged { path: String },
    Unreadable { path: String, message: String },
    Failed { path: String, message: String },
}

/// Totals over one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub discovered: usize,
    pub added: usize,
    pub backfilled: usize,
    pub relocated: usize,
    pub duplicates: usize,
    pub unchanged: usize,
    pub unreadable: usize,
    pub failed: usize,
}

impl IngestSummary {
    pub fn record(&mut self, event: &IngestEvent) {
        self.discovered += 1;
        match event {
            IngestEvent::Added { .. } => self.added += 1,
            IngestEvent::Backfilled { .. } => self.backfilled += 1,
            IngestEvent::Relocated { .. } => self.relocated += 1,
            IngestEvent::Duplicate { .. } => self.duplicates += 1,
            IngestEvent::Unchanged { .. } => self.unchanged += 1,
            IngestEvent::Unreadable { .. } => self.unreadable += 1,
            IngestEvent::Failed { .. } => self.failed += 1,
        }
    }
}

/// Reconcile every image under `tiers.root()` with the store.
///
/// `on_event` is called once per discovered file, in discovery order.
///
/// # Errors
///
/// Per-file problems are reported as events and never abort the run. Only
/// failures to open or commit a batch transaction are returned; batches
/// committed before the failure stay committed, and a rerun skips them.
pub async fn ingest<F>(
    pool: &SqlitePool,
    tiers: &TierMachine,
    filter: ImageFilter,
    batch_size: usize,
    mut on_event: F,
) -> Result<IngestSummary>
where
    F: FnMut(&IngestEvent),
{
    let root = tiers.root().to_path_buf();
    tracing::info!(target: "ingest", root = %root.display(), batch_size, "Starting ingestion");

    let batches = scanner::scan(root, filter).chunks(batch_size.max(1));
    let mut batches = std::pin::pin!(batches);
    let mut summary = IngestSummary::default();

    while let Some(batch) = batches.next().await {
        let events = ingest_batch(pool, tiers, batch).await?;
        for event in &events {
            summary.record(event);
            on_event(event);
        }
        tracing::debug!(target: "ingest", files = events.len(), "Committed batch");
    }

    tracing::info!(
        target: "ingest",
        discovered = summary.discovered,
        added = summary.added,
        backfilled = summary.backfilled,
        relocated = summary.relocated,
        duplicates = summary.duplicates,
        unreadable = summary.unreadable,
        failed = summary.failed,
        "Ingestion complete"
    );
    Ok(summary)
}

async fn ingest_batch(
    pool: &SqlitePool,
    tiers: &TierMachine,
    paths: Vec<PathBuf>,
) -> Result<Vec<IngestEvent>> {
    let mut events = Vec::with_capacity(paths.len());
    let mut entries: Vec<(String, PathBuf)> = Vec::with_capacity(paths.len());

    for path in paths {
        match relative_path(tiers.root(), &path) {
            Some(rel) => entries.push((rel, path)),
            None => {
                tracing::warn!(target: "ingest", path = %path.display(), "Path is not valid UTF-8, skipping");
                events.push(IngestEvent::Failed {
                    path: path.to_string_lossy().into_owned(),
                    message: "path is not valid UTF-8".to_string(),
                });
            }
        }
    }

    let rel_paths: Vec<String> = entries.iter().map(|(rel, _)| rel.clone()).collect();
    let existing: HashMap<String, Image> = db::get_images_by_paths(pool, &rel_paths)
        .await?
        .into_iter()
        .map(|image| (image.path.clone(), image))
        .collect();

    let pending: Vec<PathBuf> = entries
        .iter()
        .filter(|(rel, _)| existing.get(rel).is_none_or(|image| image.content_hash.is_none()))
        .map(|(_, abs)| abs.clone())
        .collect();
    let fingerprints = fingerprint_all(pending).await?;

    let mut moves = MoveLog::default();
    let result = reconcile_batch(pool, tiers, entries, &existing, fingerprints, &mut events, &mut moves).await;
    moves.settle(result)?;
    Ok(events)
}

/// Reconcile fingerprinted files in one transaction, one savepoint per file.
///
/// Moves of files whose savepoint committed are appended to `moves`, so the
/// caller can put them back if the batch itself fails to commit.
async fn reconcile_batch(
    pool: &SqlitePool,
    tiers: &TierMachine,
    entries: Vec<(String, PathBuf)>,
    existing: &HashMap<String, Image>,
    mut fingerprints: HashMap<PathBuf, Result<Fingerprint>>,
    events: &mut Vec<IngestEvent>,
    moves: &mut MoveLog,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    for (rel, abs) in entries {
        let record = existing.get(&rel);
        if record.is_some_and(|image| image.content_hash.is_some()) {
            events.push(IngestEvent::Unchanged { path: rel });
            continue;
        }

        let fp = match fingerprints.remove(&abs).unwrap_or_else(|| fingerprint(&abs)) {
            Ok(fp) => fp,
            Err(e) if e.is_unreadable() => {
                tracing::warn!(target: "ingest", path = %rel, error = %e, "Unreadable image, skipping");
                events.push(IngestEvent::Unreadable {
                    path: rel,
                    message: e.to_string(),
                });
                continue;
            }
            Err(e) => {
                tracing::warn!(target: "ingest", path = %rel, error = %e, "Failed to fingerprint file");
                events.push(IngestEvent::Failed {
                    path: rel,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let mut file_moves = MoveLog::default();
        let mut savepoint = (&mut *tx).begin().await?;
        match reconcile(&mut savepoint, tiers, record, &rel, fp, &mut file_moves).await {
            Ok(event) => {
                moves.append(file_moves);
                savepoint.commit().await?;
                events.push(event);
            }
            Err(e) => {
                savepoint.rollback().await?;
                file_moves.undo();
                tracing::warn!(target: "ingest", path = %rel, error = %e, "Failed to reconcile file");
                events.push(IngestEvent::Failed {
                    path: rel,
                    message: e.to_string(),
                });
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Fingerprint files in parallel off the async runtime.
async fn fingerprint_all(paths: Vec<PathBuf>) -> Result<HashMap<PathBuf, Result<Fingerprint>>> {
    if paths.is_empty() {
        return Ok(HashMap::new());
    }

    tokio::task::spawn_blocking(move || {
        paths
            .into_par_iter()
            .map(|path| {
                let fp = fingerprint(&path);
                (path, fp)
            })
            .collect()
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))
}

async fn reconcile(
    conn: &mut SqliteConnection,
    tiers: &TierMachine,
    record: Option<&Image>,
    rel: &str,
    fp: Fingerprint,
    moves: &mut MoveLog,
) -> Result<IngestEvent> {
    if let Some(image) = record {
        db::set_content_hash(&mut *conn, image.id, &fp.content_hash).await?;
        tracing::debug!(target: "ingest", path = rel, "Backfilled content hash");
        return Ok(IngestEvent::Backfilled {
            path: rel.to_string(),
        });
    }

    let same_content = db::get_images_by_hash(&mut *conn, &fp.content_hash).await?;

    if let Some(moved) = same_content.iter().find(|image| !exists(tiers.root(), &image.path)) {
        db::update_path(&mut *conn, moved.id, rel).await?;
        tracing::info!(target: "ingest", from = %moved.path, to = rel, "Relocated record");
        return Ok(IngestEvent::Relocated {
            from: moved.path.clone(),
            to: rel.to_string(),
        });
    }

    let new_image = NewImage {
        path: rel.to_string(),
        width: fp.width,
        height: fp.height,
        orientation: fp.orientation,
        content_hash: Some(fp.content_hash),
    };
    let mut image = db::insert_image(&mut *conn, &new_image).await?;

    match same_content.first() {
        Some(original) => {
            tiers.hide(conn, &mut image, moves).await?;
            tracing::info!(
                target: "ingest",
                path = rel,
                original = %original.path,
                hidden_path = %image.path,
                "Hid duplicate"
            );
            Ok(IngestEvent::Duplicate {
                path: rel.to_string(),
                original: original.path.clone(),
                hidden_path: image.path,
            })
        }
        None => {
            tracing::debug!(target: "ingest", path = rel, "Added");
            Ok(IngestEvent::Added {
                path: rel.to_string(),
            })
        }
    }
}

fn exists(root: &Path, rel: &str) -> bool {
    root.join(rel).exists()
}
