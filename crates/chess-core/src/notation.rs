//! SAN/UCI conversion and game replay using shakmaty.

use serde::{Deserialize, Serialize};
use shakmaty::{
    fen::Fen, san::San, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, Position,
};
use thiserror::Error;

use crate::game_data::Side;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid SAN: {0}")]
    InvalidSan(String),

    #[error("Invalid UCI: {0}")]
    InvalidUci(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("PGN contains no moves")]
    EmptyGame,
}

/// One replayed half-move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlyRecord {
    /// 1-based ply index
    pub ply: u32,
    pub side: Side,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    pub is_checkmate: bool,
}

/// Result of replaying a SAN move list.
/// Replay stops at the first move the position does not allow.
#[derive(Debug, Clone)]
pub struct Replay {
    pub start_fen: String,
    pub plies: Vec<PlyRecord>,
    pub stopped_at: Option<(u32, NotationError)>,
}

impl Replay {
    pub fn is_complete(&self) -> bool {
        self.stopped_at.is_none()
    }
}

/// Parse and validate a FEN into a playable position.
pub fn position_from_fen(fen: &str) -> Result<Chess, NotationError> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| NotationError::InvalidFen(format!("{fen}: {e}")))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| NotationError::InvalidFen(format!("{fen}: {e}")))
}

pub fn validate_fen(fen: &str) -> Result<(), NotationError> {
    position_from_fen(fen).map(|_| ())
}

pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn strip_annotations(san: &str) -> &str {
    san.trim()
        .trim_end_matches(|c: char| c == '+' || c == '#' || c == '!' || c == '?')
}

fn san_to_move(pos: &Chess, san: &str) -> Result<shakmaty::Move, NotationError> {
    let parsed: San = strip_annotations(san)
        .parse()
        .map_err(|_| NotationError::InvalidSan(san.to_string()))?;
    parsed
        .to_move(pos)
        .map_err(|e| NotationError::IllegalMove(format!("{san}: {e}")))
}

/// Convert a SAN move played from `fen` into UCI notation.
pub fn san_to_uci(fen: &str, san: &str) -> Result<String, NotationError> {
    let pos = position_from_fen(fen)?;
    let mv = san_to_move(&pos, san)?;
    Ok(mv.to_uci(CastlingMode::Standard).to_string())
}

/// Convert a UCI move played from `fen` into SAN notation.
pub fn uci_to_san(fen: &str, uci: &str) -> Result<String, NotationError> {
    let pos = position_from_fen(fen)?;
    let parsed: UciMove = uci
        .trim()
        .parse()
        .map_err(|_| NotationError::InvalidUci(uci.to_string()))?;
    let mv = parsed
        .to_move(&pos)
        .map_err(|e| NotationError::IllegalMove(format!("{uci}: {e}")))?;
    Ok(San::from_move(&pos, mv).to_string())
}

/// Replay SAN moves from `start_fen`, recording the FEN pair around each ply.
pub fn replay(start_fen: &str, san_moves: &[String]) -> Result<Replay, NotationError> {
    let mut pos = position_from_fen(start_fen)?;
    let start_fen = fen_of(&pos);
    let mut plies = Vec::with_capacity(san_moves.len());
    let mut stopped_at = None;

    for (i, san) in san_moves.iter().enumerate() {
        let ply = i as u32 + 1;
        let mv = match san_to_move(&pos, san) {
            Ok(mv) => mv,
            Err(e) => {
                stopped_at = Some((ply, e));
                break;
            }
        };

        let side = side_of(pos.turn());
        let fen_before = fen_of(&pos);
        let uci = mv.to_uci(CastlingMode::Standard).to_string();
        pos.play_unchecked(mv);

        plies.push(PlyRecord {
            ply,
            side,
            san: strip_annotations(san).to_string(),
            uci,
            fen_before,
            fen_after: fen_of(&pos),
            is_checkmate: pos.is_checkmate(),
        });
    }

    Ok(Replay {
        start_fen,
        plies,
        stopped_at,
    })
}
