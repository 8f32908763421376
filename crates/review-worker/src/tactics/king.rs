//! King-centred detectors: back_rank_weakness, king_safety

use chess::{Piece, EMPTY};

use super::TacticalContext;
use crate::board_utils::{attackers, home_rank, king_exposure, king_square, offset};

/// Swing (centipawns) a king-safety diagnosis needs
pub const KING_SAFETY_SWING: i32 = 200;

/// Back-rank weakness: the enemy king sits on its home rank with every forward
/// square blocked by its own pieces or covered, and a rook or queen lands on that rank.
pub fn back_rank_weakness(ctx: &TacticalContext) -> bool {
    let board = &ctx.after_best;
    let enemy = !ctx.mover;
    let king = king_square(board, enemy);
    let rank = home_rank(enemy);
    if king.get_rank() != rank {
        return false;
    }

    let dest = ctx.best.get_dest();
    let heavy = matches!(board.piece_on(dest), Some(Piece::Rook | Piece::Queen));
    if !heavy || dest.get_rank() != rank {
        return false;
    }

    let forward = if rank.to_index() == 0 { 1 } else { -1 };
    (-1..=1)
        .filter_map(|df| offset(king, df, forward))
        .all(|sq| board.color_on(sq) == Some(enemy) || attackers(board, ctx.mover, sq) != EMPTY)
}

/// King safety: a large swing after a move that opened up the mover's own king
pub fn king_safety(ctx: &TacticalContext, swing: i32) -> bool {
    swing >= KING_SAFETY_SWING
        && king_exposure(&ctx.after_played, ctx.mover) > king_exposure(&ctx.before, ctx.mover)
}
