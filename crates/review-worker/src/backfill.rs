//! Backfill reconciler: categorizes stored poor moves that have no blunder detail yet.
//!
//! Never calls the engine; it only re-reads stored evaluations. Existing
//! blunder_details rows are never touched, so a second run with no new data
//! inserts nothing.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use chess_core::{notation, Side};

use crate::analysis::{MoveQuality, POOR_MOVE_MIN_LOSS};
use crate::categorize::{BlunderDetail, Categorizer, PoorMove};
use crate::db::{self, StoredMove};
use crate::error::ReviewError;

#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillOptions {
    /// Newest games first, at most this many
    pub limit: Option<u32>,
    /// Do everything except write rows
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillSummary {
    pub games_processed: u32,
    pub blunders_categorized: u32,
    pub mistakes_categorized: u32,
    pub inaccuracies_categorized: u32,
    pub skipped_existing: u32,
    pub errors: u32,
}

impl BackfillSummary {
    pub fn total_categorized(&self) -> u32 {
        self.blunders_categorized + self.mistakes_categorized + self.inaccuracies_categorized
    }

    fn record(&mut self, severity: MoveQuality) {
        match severity {
            MoveQuality::Blunder => self.blunders_categorized += 1,
            MoveQuality::Mistake => self.mistakes_categorized += 1,
            MoveQuality::Inaccuracy => self.inaccuracies_categorized += 1,
            MoveQuality::Best | MoveQuality::Excellent | MoveQuality::Good | MoveQuality::Book => {}
        }
    }
}

pub struct Reconciler {
    pool: SqlitePool,
    categorizer: Categorizer,
}

impl Reconciler {
    pub fn new(pool: SqlitePool, categorizer: Categorizer) -> Self {
        Self { pool, categorizer }
    }

    /// Walk candidate games newest-first. Per-move and per-game failures are
    /// counted in `errors`; only failing to list candidates aborts the run.
    pub async fn run(&self, options: BackfillOptions) -> Result<BackfillSummary, ReviewError> {
        let candidates = db::backfill_candidates(&self.pool, POOR_MOVE_MIN_LOSS, options.limit).await?;
        info!(
            games = candidates.len(),
            dry_run = options.dry_run,
            "Starting blunder backfill"
        );

        let mut summary = BackfillSummary::default();
        for game_id in candidates {
            match self.process_game(game_id, options.dry_run, &mut summary).await {
                Ok(()) => summary.games_processed += 1,
                Err(e) => {
                    warn!(game_id, error = %e, "Skipping game");
                    summary.errors += 1;
                }
            }
        }

        info!(
            games = summary.games_processed,
            blunders = summary.blunders_categorized,
            mistakes = summary.mistakes_categorized,
            inaccuracies = summary.inaccuracies_categorized,
            errors = summary.errors,
            "Backfill finished"
        );
        Ok(summary)
    }

    async fn process_game(
        &self,
        game_id: i64,
        dry_run: bool,
        summary: &mut BackfillSummary,
    ) -> Result<(), ReviewError> {
        let moves = db::flagged_moves(&self.pool, game_id, POOR_MOVE_MIN_LOSS).await?;

        for stored in moves {
            if db::blunder_detail_exists(&self.pool, game_id, stored.ply).await? {
                summary.skipped_existing += 1;
                continue;
            }

            let detail = match self.categorize_stored(game_id, &stored) {
                Ok(detail) => detail,
                Err(e) => {
                    warn!(game_id, ply = stored.ply, error = %e, "Could not categorize move");
                    summary.errors += 1;
                    continue;
                }
            };

            if dry_run || db::insert_blunder_detail(&self.pool, &detail).await? {
                summary.record(detail.severity);
            } else {
                summary.skipped_existing += 1;
            }
        }
        Ok(())
    }

    fn categorize_stored(&self, game_id: i64, stored: &StoredMove) -> Result<BlunderDetail, ReviewError> {
        let poor = to_poor_move(stored)?;
        let categorization = self.categorizer.categorize(&poor)?;
        Ok(BlunderDetail::new(game_id, &poor, categorization))
    }
}

/// Rebuild categorizer input from a stored row. The played move is stored as SAN.
fn to_poor_move(stored: &StoredMove) -> Result<PoorMove, ReviewError> {
    let missing = |what: &str| ReviewError::InvalidPosition(format!("ply {} has no {what}", stored.ply));

    let side = Side::parse(&stored.color).ok_or_else(|| missing("valid color"))?;
    let ply = u32::try_from(stored.ply).map_err(|_| missing("valid ply"))?;
    let player_move = notation::san_to_uci(&stored.fen_before, &stored.san)?;
    let best_move = stored.best_move.clone().ok_or_else(|| missing("best move"))?;
    let before = stored.evaluation_before.ok_or_else(|| missing("evaluation before"))?;
    let after = stored.evaluation_after.ok_or_else(|| missing("evaluation after"))?;
    let loss = stored
        .centipawn_loss
        .and_then(|l| u32::try_from(l).ok())
        .ok_or_else(|| missing("centipawn loss"))?;
    let alternatives: Vec<String> = serde_json::from_str(&stored.alternatives)?;

    Ok(PoorMove::from_white_pov(
        ply,
        side,
        stored.fen_before.clone(),
        player_move,
        best_move,
        before,
        after,
        loss,
        alternatives,
    ))
}
