//! Line geometry detectors: pin, skewer, discovered_attack

use chess::{BitBoard, Piece, EMPTY};

use super::{TacticalContext, Theme};
use crate::board_utils::{first_piece_on_ray, is_in_bad_spot, is_ray_piece, king_value, ray_directions};

/// Pin or skewer created by the slider the best move lands.
///
/// The front piece shields something worth more: a pin when that is the king,
/// a skewer otherwise. A king in front of a piece is always a skewer.
pub fn pin_or_skewer(ctx: &TacticalContext) -> Option<Theme> {
    let board = &ctx.after_best;
    let dest = ctx.best.get_dest();
    let mover = board.piece_on(dest)?;
    if !is_ray_piece(mover) || is_in_bad_spot(board, dest) {
        return None;
    }

    let enemy = !ctx.mover;
    for &(df, dr) in ray_directions(mover) {
        let Some(front_sq) = first_piece_on_ray(board, dest, df, dr) else {
            continue;
        };
        if board.color_on(front_sq) != Some(enemy) {
            continue;
        }
        let Some(back_sq) = first_piece_on_ray(board, front_sq, df, dr) else {
            continue;
        };
        if board.color_on(back_sq) != Some(enemy) {
            continue;
        }
        let (Some(front), Some(back)) = (board.piece_on(front_sq), board.piece_on(back_sq)) else {
            continue;
        };

        if front == Piece::King {
            if back != Piece::Pawn {
                return Some(Theme::Skewer);
            }
            continue;
        }
        if king_value(back) > king_value(front) {
            return Some(if back == Piece::King {
                Theme::Pin
            } else {
                Theme::Skewer
            });
        }
    }
    None
}

/// Discovered attack: the best move unmasks a check or an attack by another piece
pub fn discovered_attack(ctx: &TacticalContext) -> bool {
    let board = &ctx.after_best;
    let src = ctx.best.get_source();
    let dest = ctx.best.get_dest();

    // Discovered check: a checker other than the piece that moved
    let checkers = *board.checkers();
    if checkers != EMPTY && (checkers & !BitBoard::from_square(dest)) != EMPTY {
        return true;
    }

    let own = *board.color_combined(ctx.mover);
    for sq in own {
        if sq == dest {
            continue;
        }
        let Some(piece) = board.piece_on(sq) else {
            continue;
        };
        for &(df, dr) in ray_directions(piece) {
            let Some(target) = first_piece_on_ray(board, sq, df, dr) else {
                continue;
            };
            if board.color_on(target) != Some(!ctx.mover) || board.piece_on(target) == Some(Piece::Pawn) {
                continue;
            }
            if chess::between(sq, target) & BitBoard::from_square(src) != EMPTY {
                return true;
            }
        }
    }
    false
}
