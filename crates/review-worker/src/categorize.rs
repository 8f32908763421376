//! Tactical theme categorization of poor moves.
//!
//! Shared by live analysis and the backfill reconciler so both produce the
//! same row for the same stored move.

use std::str::FromStr;

use chess::Board;
use chess_core::Side;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{classify, win_probability, MoveContext, MoveQuality};
use crate::board_utils::{total_material, undeveloped_minors};
use crate::error::ReviewError;
use crate::tactics::{self, positional, PositionType, TacticalContext, Theme};
use crate::themes::canonical_theme;

/// Non-king material (both sides, pawn units) below which the game is an endgame
pub const ENDGAME_MATERIAL_THRESHOLD: i32 = 28;

/// Default number of plies treated as opening
pub const DEFAULT_OPENING_PLY_THRESHOLD: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Opening => "opening",
            Phase::Middlegame => "middlegame",
            Phase::Endgame => "endgame",
        }
    }

    pub fn parse(s: &str) -> Option<Phase> {
        match s {
            "opening" => Some(Phase::Opening),
            "middlegame" => Some(Phase::Middlegame),
            "endgame" => Some(Phase::Endgame),
            _ => None,
        }
    }
}

/// A move flagged inaccuracy or worse. Evaluations are from the mover's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoorMove {
    pub ply: u32,
    pub fen_before: String,
    /// UCI
    pub player_move: String,
    /// UCI
    pub best_move: String,
    pub evaluation_before: i32,
    pub evaluation_after: i32,
    pub centipawn_loss: u32,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl PoorMove {
    /// Build from stored White-perspective evaluations.
    #[allow(clippy::too_many_arguments)]
    pub fn from_white_pov(
        ply: u32,
        side: Side,
        fen_before: String,
        player_move: String,
        best_move: String,
        white_eval_before: i32,
        white_eval_after: i32,
        centipawn_loss: u32,
        alternatives: Vec<String>,
    ) -> Self {
        Self {
            ply,
            fen_before,
            player_move,
            best_move,
            evaluation_before: side.relative(white_eval_before),
            evaluation_after: side.relative(white_eval_after),
            centipawn_loss,
            alternatives,
        }
    }

    /// Evaluation drop caused by the move
    pub fn swing(&self) -> i32 {
        (self.evaluation_before - self.evaluation_after).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categorization {
    pub theme: Theme,
    /// External theme name
    pub tactical_theme: String,
    pub phase: Phase,
    pub position_type: PositionType,
    pub severity: MoveQuality,
    pub difficulty_level: u8,
}

/// Stored diagnosis of one poor move, keyed by (game_id, move_number)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlunderDetail {
    pub game_id: i64,
    pub move_number: i64,
    pub fen: String,
    pub phase: Phase,
    pub player_move: String,
    pub best_move: String,
    pub alternatives: Vec<String>,
    pub evaluation_before: i32,
    pub evaluation_after: i32,
    pub win_probability_before: f64,
    pub win_probability_after: f64,
    pub tactical_theme: String,
    pub position_type: PositionType,
    pub severity: MoveQuality,
    pub difficulty_level: u8,
    pub learned: bool,
    pub review_count: i64,
    pub mastery_score: i64,
}

impl BlunderDetail {
    /// Fresh, never-reviewed row for a categorized move
    pub fn new(game_id: i64, poor: &PoorMove, cat: Categorization) -> Self {
        Self {
            game_id,
            move_number: poor.ply as i64,
            fen: poor.fen_before.clone(),
            phase: cat.phase,
            player_move: poor.player_move.clone(),
            best_move: poor.best_move.clone(),
            alternatives: poor.alternatives.clone(),
            evaluation_before: poor.evaluation_before,
            evaluation_after: poor.evaluation_after,
            win_probability_before: round1(win_probability(poor.evaluation_before)),
            win_probability_after: round1(win_probability(poor.evaluation_after)),
            tactical_theme: cat.tactical_theme,
            position_type: cat.position_type,
            severity: cat.severity,
            difficulty_level: cat.difficulty_level,
            learned: false,
            review_count: 0,
            mastery_score: 0,
        }
    }

    /// Id under which this blunder is practised as a puzzle
    pub fn puzzle_id(&self) -> String {
        puzzle_id(self.game_id, self.move_number)
    }
}

pub fn puzzle_id(game_id: i64, move_number: i64) -> String {
    format!("{game_id}_m{move_number}")
}

/// Inverse of [`puzzle_id`]
pub fn parse_puzzle_id(id: &str) -> Option<(i64, i64)> {
    let (game, mv) = id.split_once("_m")?;
    Some((game.parse().ok()?, mv.parse().ok()?))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    opening_ply_threshold: u32,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(DEFAULT_OPENING_PLY_THRESHOLD)
    }
}

impl Categorizer {
    pub fn new(opening_ply_threshold: u32) -> Self {
        Self { opening_ply_threshold }
    }

    /// Diagnose why `poor` lost material or position.
    pub fn categorize(&self, poor: &PoorMove) -> Result<Categorization, ReviewError> {
        chess_core::notation::validate_fen(&poor.fen_before)?;
        let board = Board::from_str(&poor.fen_before)
            .map_err(|e| ReviewError::InvalidPosition(format!("{}: {e}", poor.fen_before)))?;

        let played = tactics::parse_legal_move(&board, &poor.player_move).ok_or_else(|| {
            ReviewError::InvalidPosition(format!("illegal move {} in {}", poor.player_move, poor.fen_before))
        })?;
        let best = tactics::parse_legal_move(&board, &poor.best_move).ok_or_else(|| {
            ReviewError::InvalidPosition(format!("illegal move {} in {}", poor.best_move, poor.fen_before))
        })?;
        if played == best {
            return Err(ReviewError::CategorizationSkipped(format!(
                "{} is the engine's choice",
                poor.player_move
            )));
        }

        let ctx = TacticalContext::new(board, best, played);
        let swing = poor.swing();
        let theme = tactics::detect(&ctx, swing);
        let phase = self.phase(&ctx.before, poor.ply);
        let position_type = positional::position_type(theme, &ctx.after_played);
        let severity = classify(poor.centipawn_loss, MoveContext { ply: poor.ply, is_book: false });

        debug!(ply = poor.ply, theme = %theme, phase = phase.as_str(), "Categorized move");

        Ok(Categorization {
            theme,
            tactical_theme: canonical_theme(theme.as_str()).to_string(),
            phase,
            position_type,
            severity,
            difficulty_level: difficulty(swing, phase, theme),
        })
    }

    pub fn phase(&self, board: &Board, ply: u32) -> Phase {
        if ply <= self.opening_ply_threshold && undeveloped_minors(board) > 0 {
            Phase::Opening
        } else if total_material(board) < ENDGAME_MATERIAL_THRESHOLD {
            Phase::Endgame
        } else {
            Phase::Middlegame
        }
    }
}

/// Difficulty 1-5: grows with the swing, endgames and multi-move themes.
pub fn difficulty(swing: i32, phase: Phase, theme: Theme) -> u8 {
    let mut level: i32 = match swing {
        s if s < 100 => 1,
        s if s < 300 => 2,
        s if s < 600 => 3,
        _ => 4,
    };
    if phase == Phase::Endgame {
        level += 1;
    }
    if theme.is_multi_move() {
        level += 1;
    }
    if theme == Theme::HangingPiece {
        level -= 1;
    }
    level.clamp(1, 5) as u8
}
