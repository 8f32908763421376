//! Tactical detectors for blunder categorization
//! Each detector looks at the engine's best move from the blunder position.

pub mod attacks;
pub mod king;
pub mod line_geometry;
pub mod positional;

use std::fmt;
use std::str::FromStr;

use chess::{Board, ChessMove, Color, MoveGen, Piece, Square};
use serde::{Deserialize, Serialize};

/// Internal theme vocabulary, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    HangingPiece,
    Fork,
    Pin,
    Skewer,
    DiscoveredAttack,
    BackRankWeakness,
    KingSafety,
    PositionalError,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::HangingPiece => "hanging_piece",
            Theme::Fork => "fork",
            Theme::Pin => "pin",
            Theme::Skewer => "skewer",
            Theme::DiscoveredAttack => "discovered_attack",
            Theme::BackRankWeakness => "back_rank_weakness",
            Theme::KingSafety => "king_safety",
            Theme::PositionalError => "positional_error",
        }
    }

    /// Themes that need the opponent to see more than one move ahead
    pub fn is_multi_move(self) -> bool {
        matches!(self, Theme::Fork | Theme::DiscoveredAttack)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of position the mistake happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionType {
    Tactical,
    KingSafety,
    Material,
    Structure,
    Space,
}

impl PositionType {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionType::Tactical => "tactical",
            PositionType::KingSafety => "king_safety",
            PositionType::Material => "material",
            PositionType::Structure => "structure",
            PositionType::Space => "space",
        }
    }

    pub fn parse(s: &str) -> Option<PositionType> {
        match s {
            "tactical" => Some(PositionType::Tactical),
            "king_safety" => Some(PositionType::KingSafety),
            "material" => Some(PositionType::Material),
            "structure" => Some(PositionType::Structure),
            "space" => Some(PositionType::Space),
            _ => None,
        }
    }
}

/// The blunder position with both the played and the best continuation applied
pub struct TacticalContext {
    pub before: Board,
    pub mover: Color,
    pub best: ChessMove,
    pub after_best: Board,
    pub played: ChessMove,
    pub after_played: Board,
}

impl TacticalContext {
    pub fn new(before: Board, best: ChessMove, played: ChessMove) -> Self {
        Self {
            mover: before.side_to_move(),
            after_best: before.make_move_new(best),
            after_played: before.make_move_new(played),
            before,
            best,
            played,
        }
    }

    /// Did the best move take material (en passant included)?
    pub fn best_is_capture(&self) -> bool {
        let src = self.best.get_source();
        let dest = self.best.get_dest();
        if self.before.piece_on(dest).is_some() {
            return true;
        }
        self.before.piece_on(src) == Some(Piece::Pawn) && src.get_file() != dest.get_file()
    }
}

/// First matching theme for the position. `swing` is the evaluation drop in centipawns.
pub fn detect(ctx: &TacticalContext, swing: i32) -> Theme {
    if attacks::hanging_piece(ctx) {
        return Theme::HangingPiece;
    }
    if attacks::fork(ctx) {
        return Theme::Fork;
    }
    if let Some(theme) = line_geometry::pin_or_skewer(ctx) {
        return theme;
    }
    if line_geometry::discovered_attack(ctx) {
        return Theme::DiscoveredAttack;
    }
    if king::back_rank_weakness(ctx) {
        return Theme::BackRankWeakness;
    }
    if king::king_safety(ctx, swing) {
        return Theme::KingSafety;
    }
    Theme::PositionalError
}

/// Parse a UCI move and check it is legal on `board`.
pub fn parse_legal_move(board: &Board, uci: &str) -> Option<ChessMove> {
    let uci = uci.trim();
    if !(4..=5).contains(&uci.len()) || !uci.is_ascii() {
        return None;
    }
    let from = Square::from_str(&uci[0..2]).ok()?;
    let to = Square::from_str(&uci[2..4]).ok()?;
    let promotion = match uci.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return None,
    };
    let mv = ChessMove::new(from, to, promotion);
    MoveGen::new_legal(board).any(|m| m == mv).then_some(mv)
}
