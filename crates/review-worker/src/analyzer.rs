//! Game analysis pipeline.
//!
//! PGN → replayed plies → engine evaluations through the arbiter → quality
//! bands, with poor moves categorized and stored as blunder details.

use std::sync::Arc;

use chess_core::{pgn, GameRecord, PlyRecord, Side, STANDARD_START_FEN};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analysis::{calculate_accuracy, calculate_cp_loss, classify, Classifications, MoveContext, MoveQuality};
use crate::arbiter::{ArbiterHandle, PositionOutcome};
use crate::book_cache::OpeningBook;
use crate::categorize::{BlunderDetail, Categorizer, PoorMove};
use crate::config::ReviewConfig;
use crate::db;
use crate::engine::SearchBudget;
use crate::error::ReviewError;

/// One analyzed half-move. Evaluations are from White's point of view and
/// absent when the engine could not produce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveEvaluation {
    pub ply: u32,
    pub color: Side,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    pub evaluation_before: Option<i32>,
    pub evaluation_after: Option<i32>,
    pub best_move: Option<String>,
    pub centipawn_loss: Option<u32>,
    pub is_book: bool,
    pub alternatives: Vec<String>,
}

impl MoveEvaluation {
    /// Quality band; `None` while the move has no evaluation.
    pub fn quality(&self) -> Option<MoveQuality> {
        let context = MoveContext {
            ply: self.ply,
            is_book: self.is_book,
        };
        if self.is_book {
            return Some(classify(0, context));
        }
        self.centipawn_loss.map(|loss| classify(loss, context))
    }

    /// Categorizer input for poor moves with complete evaluations
    pub fn poor_move(&self) -> Option<PoorMove> {
        if !self.quality()?.is_poor() {
            return None;
        }
        Some(PoorMove::from_white_pov(
            self.ply,
            self.color,
            self.fen_before.clone(),
            self.uci.clone(),
            self.best_move.clone()?,
            self.evaluation_before?,
            self.evaluation_after?,
            self.centipawn_loss?,
            self.alternatives.clone(),
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideSummary {
    pub accuracy: f64,
    pub average_cp_loss: f64,
    pub classifications: Classifications,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameSummary {
    pub white: SideSummary,
    pub black: SideSummary,
}

impl GameSummary {
    /// Accuracy and average loss per side; book moves and unevaluated moves don't count.
    pub fn from_moves(moves: &[MoveEvaluation]) -> Self {
        let mut summary = GameSummary::default();
        let mut totals = [(0u32, 0u32); 2];

        for mv in moves {
            let (side, total) = match mv.color {
                Side::White => (&mut summary.white, &mut totals[0]),
                Side::Black => (&mut summary.black, &mut totals[1]),
            };
            let Some(quality) = mv.quality() else {
                continue;
            };
            side.classifications.record(quality);
            if let (false, Some(loss)) = (mv.is_book, mv.centipawn_loss) {
                total.0 += loss;
                total.1 += 1;
            }
        }

        for (side, (loss, count)) in [(&mut summary.white, totals[0]), (&mut summary.black, totals[1])] {
            side.accuracy = (calculate_accuracy(loss, count) * 10.0).round() / 10.0;
            side.average_cp_loss = if count == 0 {
                0.0
            } else {
                (loss as f64 / count as f64 * 10.0).round() / 10.0
            };
        }
        summary
    }
}

#[derive(Debug, Clone)]
pub struct GameAnalysis {
    pub game: GameRecord,
    pub moves: Vec<MoveEvaluation>,
    pub summary: GameSummary,
    /// Set when replay stopped early at an illegal or unreadable move
    pub truncated_at: Option<u32>,
    /// Set when the engine was lost mid-game; later moves have no evaluation
    pub engine_failure: Option<String>,
}

/// Result of [`GameAnalyzer::analyze_and_store`]
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub game_id: i64,
    pub analysis: GameAnalysis,
    pub blunders_categorized: u32,
    pub moves_skipped: u32,
}

/// Cheap to clone; clones share the arbiter and book.
#[derive(Clone)]
pub struct GameAnalyzer {
    arbiter: ArbiterHandle,
    book: Arc<OpeningBook>,
    budget: SearchBudget,
    categorizer: Categorizer,
}

impl GameAnalyzer {
    pub fn new(
        arbiter: ArbiterHandle,
        book: Arc<OpeningBook>,
        budget: SearchBudget,
        categorizer: Categorizer,
    ) -> Self {
        Self {
            arbiter,
            book,
            budget,
            categorizer,
        }
    }

    pub fn from_config(arbiter: ArbiterHandle, config: &ReviewConfig) -> Self {
        let budget = SearchBudget {
            depth: config.analysis_depth,
            nodes: config.nodes_per_position,
            multipv: config.multipv,
            timeout: config.position_timeout,
        };
        Self::new(
            arbiter,
            Arc::new(OpeningBook::load_or_empty(&config.book_path)),
            budget,
            Categorizer::new(config.opening_ply_threshold),
        )
    }

    /// Evaluate and classify every move of a PGN game.
    ///
    /// An engine lost for good after some positions were evaluated still
    /// yields the partial analysis; with nothing evaluated it is an error.
    pub async fn analyze(&self, pgn_text: &str, cancel: &CancellationToken) -> Result<GameAnalysis, ReviewError> {
        let game = pgn::parse_pgn(pgn_text)?;
        let start_fen = game.start_fen.as_deref().unwrap_or(STANDARD_START_FEN);
        let replay = chess_core::notation::replay(start_fen, &game.moves)?;

        let truncated_at = replay.stopped_at.as_ref().map(|(ply, e)| {
            warn!(ply, error = %e, "Replay stopped early, analyzing the legal prefix");
            *ply
        });

        let mut positions = Vec::with_capacity(replay.plies.len() + 1);
        positions.push(replay.start_fen.clone());
        positions.extend(replay.plies.iter().map(|p| p.fen_after.clone()));

        info!(plies = replay.plies.len(), "Evaluating positions");
        let batch = self.arbiter.submit_partial(positions, self.budget, cancel).await?;
        let engine_failure = match batch.failure {
            Some(e) if batch.evaluated() == 0 => return Err(e),
            Some(ref e) => {
                warn!(evaluated = batch.evaluated(), error = %e, "Engine lost mid-game, keeping partial evaluations");
                Some(e.to_string())
            }
            None => None,
        };
        let outcomes = batch.outcomes;

        let evals: Vec<Option<i32>> = outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| white_pov_eval(outcome, side_to_move(&replay.plies, i)))
            .collect();

        let moves: Vec<MoveEvaluation> = replay
            .plies
            .iter()
            .enumerate()
            .map(|(i, ply)| self.evaluate_ply(ply, &outcomes[i], evals[i], evals[i + 1]))
            .collect();

        let summary = GameSummary::from_moves(&moves);
        Ok(GameAnalysis {
            game,
            moves,
            summary,
            truncated_at,
            engine_failure,
        })
    }

    fn evaluate_ply(
        &self,
        ply: &PlyRecord,
        before: &PositionOutcome,
        eval_before: Option<i32>,
        eval_after: Option<i32>,
    ) -> MoveEvaluation {
        let best = before.evaluation();
        let centipawn_loss = match (eval_before, eval_after) {
            (Some(b), Some(a)) => Some(calculate_cp_loss(
                ply.side.relative(b),
                ply.side.relative(a),
                ply.is_checkmate,
            )),
            _ => None,
        };

        MoveEvaluation {
            ply: ply.ply,
            color: ply.side,
            san: ply.san.clone(),
            uci: ply.uci.clone(),
            fen_before: ply.fen_before.clone(),
            fen_after: ply.fen_after.clone(),
            evaluation_before: eval_before,
            evaluation_after: eval_after,
            best_move: best.and_then(|e| e.best_move.clone()),
            centipawn_loss,
            is_book: self.book.is_book_move(&ply.fen_before, &ply.san),
            alternatives: best.map(|e| e.alternatives()).unwrap_or_default(),
        }
    }

    /// Analyze a game and persist it with its evaluations and categorized poor moves.
    pub async fn analyze_and_store(
        &self,
        pool: &SqlitePool,
        pgn_text: &str,
        cancel: &CancellationToken,
    ) -> Result<StoredAnalysis, ReviewError> {
        let analysis = self.analyze(pgn_text, cancel).await?;
        let game_id = db::insert_game(pool, &analysis.game).await?;

        for mv in &analysis.moves {
            db::insert_move_evaluation(pool, game_id, mv).await?;
        }

        let mut blunders_categorized = 0;
        let mut moves_skipped = 0;
        for poor in analysis.moves.iter().filter_map(MoveEvaluation::poor_move) {
            match self.categorizer.categorize(&poor) {
                Ok(cat) => {
                    let detail = BlunderDetail::new(game_id, &poor, cat);
                    if db::insert_blunder_detail(pool, &detail).await? {
                        blunders_categorized += 1;
                    }
                }
                Err(e @ (ReviewError::InvalidPosition(_) | ReviewError::CategorizationSkipped(_))) => {
                    warn!(game_id, ply = poor.ply, error = %e, "Skipping move");
                    moves_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        db::mark_analyzed(pool, game_id).await?;
        info!(
            game_id,
            moves = analysis.moves.len(),
            blunders_categorized,
            white_accuracy = analysis.summary.white.accuracy,
            black_accuracy = analysis.summary.black.accuracy,
            "Game analysis stored"
        );

        Ok(StoredAnalysis {
            game_id,
            analysis,
            blunders_categorized,
            moves_skipped,
        })
    }
}

/// Side to move in position `index` (0 = start, i = after ply i)
fn side_to_move(plies: &[PlyRecord], index: usize) -> Side {
    match index {
        0 => plies.first().map(|p| p.side).unwrap_or(Side::White),
        i => plies[i - 1].side.opposite(),
    }
}

fn white_pov_eval(outcome: &PositionOutcome, to_move: Side) -> Option<i32> {
    let score = outcome.evaluation()?.score()?;
    Some(to_move.relative(score.to_cp()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(color: Side, loss: Option<u32>, is_book: bool) -> MoveEvaluation {
        MoveEvaluation {
            ply: 1,
            color,
            san: "e4".into(),
            uci: "e2e4".into(),
            fen_before: STANDARD_START_FEN.into(),
            fen_after: String::new(),
            evaluation_before: Some(20),
            evaluation_after: Some(-200),
            best_move: Some("d2d4".into()),
            centipawn_loss: loss,
            is_book,
            alternatives: vec![],
        }
    }

    #[test]
    fn test_quality_absent_without_evaluation() {
        assert_eq!(mv(Side::White, None, false).quality(), None);
        assert_eq!(mv(Side::White, None, true).quality(), Some(MoveQuality::Book));
        assert_eq!(mv(Side::White, Some(220), false).quality(), Some(MoveQuality::Blunder));
    }

    #[test]
    fn test_poor_move_uses_mover_perspective() {
        let poor = mv(Side::Black, Some(220), false).poor_move().unwrap();
        assert_eq!(poor.evaluation_before, -20);
        assert_eq!(poor.evaluation_after, 200);
        assert!(mv(Side::White, Some(3), false).poor_move().is_none());
        assert!(mv(Side::White, Some(300), true).poor_move().is_none());
    }

    #[test]
    fn test_summary_excludes_book_moves() {
        let moves = vec![
            mv(Side::White, Some(0), true),
            mv(Side::White, Some(100), false),
            mv(Side::Black, Some(0), false),
        ];
        let summary = GameSummary::from_moves(&moves);
        assert_eq!(summary.white.classifications.book, 1);
        assert_eq!(summary.white.classifications.mistake, 1);
        assert_eq!(summary.white.average_cp_loss, 100.0);
        assert_eq!(summary.black.accuracy, 100.0);
    }

    #[test]
    fn test_side_to_move_indexing() {
        let replay = chess_core::notation::replay(STANDARD_START_FEN, &["e4".to_string()]).unwrap();
        assert_eq!(side_to_move(&replay.plies, 0), Side::White);
        assert_eq!(side_to_move(&replay.plies, 1), Side::Black);
    }
}
