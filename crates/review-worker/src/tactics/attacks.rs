//! Attack-based detectors: hanging_piece, fork

use chess::{BitBoard, MoveGen, Piece, EMPTY};

use super::TacticalContext;
use crate::board_utils::{attacked_opponent_squares, attackers, is_hanging, is_in_bad_spot, king_value};

/// Hanging piece: the best move captures and nothing can take back on that square
pub fn hanging_piece(ctx: &TacticalContext) -> bool {
    if !ctx.best_is_capture() {
        return false;
    }
    let dest = ctx.best.get_dest();
    !MoveGen::new_legal(&ctx.after_best).any(|reply| reply.get_dest() == dest)
}

/// Fork: the moved piece attacks two or more higher-value or undefended pieces
pub fn fork(ctx: &TacticalContext) -> bool {
    let board = &ctx.after_best;
    let to_sq = ctx.best.get_dest();

    let moved_piece = match board.piece_on(to_sq) {
        Some(Piece::King) | None => return false,
        Some(p) => p,
    };

    // Don't count forks from a bad square
    if is_in_bad_spot(board, to_sq) {
        return false;
    }

    let fork_count = attacked_opponent_squares(board, to_sq, ctx.mover)
        .into_iter()
        .filter(|(piece, square)| {
            *piece != Piece::Pawn
                && (king_value(*piece) > king_value(moved_piece)
                    || (is_hanging(board, !ctx.mover, *square)
                        && (attackers(board, !ctx.mover, to_sq) & BitBoard::from_square(*square))
                            == EMPTY))
        })
        .count();

    fork_count > 1
}
