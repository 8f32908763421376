//! Static imbalance summary for mistakes without a concrete tactic

use chess::{Board, Color};

use super::{PositionType, Theme};
use crate::board_utils::{material_diff, space, weak_pawns};

/// Controlled squares that weigh as much as one pawn of material
const SPACE_PER_PAWN: i32 = 4;

/// Position type for a detected theme; for positional errors, the dominant imbalance
pub fn position_type(theme: Theme, board: &Board) -> PositionType {
    match theme {
        Theme::HangingPiece
        | Theme::Fork
        | Theme::Pin
        | Theme::Skewer
        | Theme::DiscoveredAttack => PositionType::Tactical,
        Theme::BackRankWeakness | Theme::KingSafety => PositionType::KingSafety,
        Theme::PositionalError => dominant_imbalance(board),
    }
}

/// Largest of the material, pawn-structure and space imbalances.
/// Ties resolve in that order.
pub fn dominant_imbalance(board: &Board) -> PositionType {
    let material = material_diff(board, Color::White).abs();
    let structure = (weak_pawns(board, Color::White) - weak_pawns(board, Color::Black)).abs();
    let space = (space(board, Color::White) - space(board, Color::Black)).abs() / SPACE_PER_PAWN;

    if material >= structure && material >= space {
        PositionType::Material
    } else if structure >= space {
        PositionType::Structure
    } else {
        PositionType::Space
    }
}
