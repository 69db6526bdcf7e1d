//! Comparison rounds: counter bookkeeping and ELO updates.
//!
//! A round names one winner and any number of losers. Every participant
//! either consumes one unit of `extra_count` or gains one `shown_times`.
//! Only losers that were shown through normal scheduling (no boost) take part
//! in the rating computation; the winner is always rated.

pub mod elo;

pub use elo::{Elo, Outcome};

use sqlx::SqlitePool;

use crate::db;
use crate::error::Result;
use crate::model::Image;
use crate::tiers::{MoveLog, TierMachine};

/// One participant after scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub image: Image,
    /// Whether the rating was part of the ELO computation
    pub rated: bool,
}

/// Apply one round to the loaded records.
///
/// Returns `None` if the winner is not among `records`.
pub fn score_round(elo: &Elo, winner_path: &str, records: Vec<Image>) -> Option<Vec<Scored>> {
    let winner_rating = records.iter().find(|r| r.path == winner_path)?.elo_rating;

    // Snapshot of the qualifying losers before any counter changes
    let loser_ratings: Vec<i64> = records
        .iter()
        .filter(|r| r.path != winner_path && r.extra_count == 0)
        .map(|r| r.elo_rating)
        .collect();

    let scored = records
        .into_iter()
        .map(|mut image| {
            let is_winner = image.path == winner_path;
            let rated = is_winner || image.extra_count == 0;

            if is_winner {
                let series: Vec<(Outcome, i64)> = loser_ratings
                    .iter()
                    .map(|&rating| (Outcome::Win, rating))
                    .collect();
                image.elo_rating = elo.rate(image.elo_rating, &series);
            } else if rated {
                image.elo_rating = elo.rate(image.elo_rating, &[(Outcome::Loss, winner_rating)]);
            }

            if image.extra_count > 0 {
                image.extra_count -= 1;
            } else {
                image.shown_times += 1;
            }

            Scored { image, rated }
        })
        .collect();

    Some(scored)
}

/// Record the outcome of a comparison round.
///
/// Loads every referenced record in one query, scores the round, then
/// persists counters and ratings and moves rated files to their tier, all in
/// one transaction. An unknown winner makes the call a no-op. If any step
/// fails, files already moved for this round are moved back.
///
/// # Returns
///
/// The updated participants (empty if the winner was not found).
pub async fn record_result(
    pool: &SqlitePool,
    tiers: &TierMachine,
    elo: &Elo,
    winner_path: &str,
    loser_paths: &[String],
) -> Result<Vec<Image>> {
    let mut moves = MoveLog::default();
    let result = record_round(pool, tiers, elo, winner_path, loser_paths, &mut moves).await;
    moves.settle(result)
}

async fn record_round(
    pool: &SqlitePool,
    tiers: &TierMachine,
    elo: &Elo,
    winner_path: &str,
    loser_paths: &[String],
    moves: &mut MoveLog,
) -> Result<Vec<Image>> {
    let mut paths = Vec::with_capacity(loser_paths.len() + 1);
    paths.push(winner_path.to_string());
    paths.extend(loser_paths.iter().filter(|p| *p != winner_path).cloned());

    let mut tx = pool.begin().await?;
    let records = db::get_images_by_paths(&mut *tx, &paths).await?;

    let Some(scored) = score_round(elo, winner_path, records) else {
        tracing::warn!(target: "ranking", winner = winner_path, "Winner not found, ignoring result");
        return Ok(Vec::new());
    };

    let mut updated = Vec::with_capacity(scored.len());
    for Scored { mut image, rated } in scored {
        db::save_round(&mut *tx, &image).await?;
        if rated {
            tiers.apply_rating(&mut *tx, &mut image, moves).await?;
        }
        updated.push(image);
    }

    tx.commit().await?;

    tracing::info!(
        target: "ranking",
        winner = winner_path,
        participants = updated.len(),
        "Recorded comparison result"
    );
    Ok(updated)
}
