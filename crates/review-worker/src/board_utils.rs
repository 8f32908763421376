//! Board utility functions for tactical categorization
//! Attack/defense queries over `chess::Board`

use chess::{BitBoard, Board, Color, File, Piece, Rank, Square, EMPTY};

// Piece values for material calculation
pub const PAWN_VALUE: i32 = 1;
pub const KNIGHT_VALUE: i32 = 3;
pub const BISHOP_VALUE: i32 = 3;
pub const ROOK_VALUE: i32 = 5;
pub const QUEEN_VALUE: i32 = 9;
pub const KING_VALUE: i32 = 99;

/// Rook, bishop and queen directions as (file, rank) steps
pub const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Piece value (no king)
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => PAWN_VALUE,
        Piece::Knight => KNIGHT_VALUE,
        Piece::Bishop => BISHOP_VALUE,
        Piece::Rook => ROOK_VALUE,
        Piece::Queen => QUEEN_VALUE,
        Piece::King => 0,
    }
}

/// Piece value including king (for fork/pin comparisons)
pub fn king_value(piece: Piece) -> i32 {
    match piece {
        Piece::King => KING_VALUE,
        other => piece_value(other),
    }
}

/// Is this a ray (sliding) piece type?
pub fn is_ray_piece(piece: Piece) -> bool {
    matches!(piece, Piece::Queen | Piece::Rook | Piece::Bishop)
}

/// Directions a sliding piece moves along
pub fn ray_directions(piece: Piece) -> &'static [(i8, i8)] {
    const ALL: [(i8, i8); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    match piece {
        Piece::Rook => &ORTHOGONAL,
        Piece::Bishop => &DIAGONAL,
        Piece::Queen => &ALL,
        _ => &[],
    }
}

/// Square shifted by (df, dr), if still on the board
pub fn offset(square: Square, df: i8, dr: i8) -> Option<Square> {
    let file = square.get_file().to_index() as i8 + df;
    let rank = square.get_rank().to_index() as i8 + dr;
    if !(0..8).contains(&file) || !(0..8).contains(&rank) {
        return None;
    }
    Some(Square::make_square(
        Rank::from_index(rank as usize),
        File::from_index(file as usize),
    ))
}

/// First occupied square walking from `from` in direction (df, dr)
pub fn first_piece_on_ray(board: &Board, from: Square, df: i8, dr: i8) -> Option<Square> {
    let mut current = from;
    while let Some(next) = offset(current, df, dr) {
        if board.piece_on(next).is_some() {
            return Some(next);
        }
        current = next;
    }
    None
}

/// Get squares attacked by a piece on a given square
pub fn attacks(board: &Board, square: Square) -> BitBoard {
    let (piece, color) = match (board.piece_on(square), board.color_on(square)) {
        (Some(p), Some(c)) => (p, c),
        _ => return EMPTY,
    };

    match piece {
        Piece::Pawn => pawn_attacks(square, color),
        Piece::Knight => chess::get_knight_moves(square),
        Piece::King => chess::get_king_moves(square),
        Piece::Bishop => chess::get_bishop_moves(square, *board.combined()),
        Piece::Rook => chess::get_rook_moves(square, *board.combined()),
        Piece::Queen => {
            chess::get_bishop_moves(square, *board.combined())
                | chess::get_rook_moves(square, *board.combined())
        }
    }
}

/// Pawn attack squares (just the diagonal attacks, not pushes)
pub fn pawn_attacks(square: Square, color: Color) -> BitBoard {
    let dr = match color {
        Color::White => 1,
        Color::Black => -1,
    };
    [-1, 1]
        .into_iter()
        .filter_map(|df| offset(square, df, dr))
        .fold(EMPTY, |acc, sq| acc | BitBoard::from_square(sq))
}

/// Get all pieces of a given color that attack a square
pub fn attackers(board: &Board, color: Color, square: Square) -> BitBoard {
    let occupied = *board.combined();
    let color_pieces = *board.color_combined(color);
    let queens = *board.pieces(Piece::Queen);

    let mut result = EMPTY;

    // Pawns: reverse lookup from the target square with the opposite color
    result |= pawn_attacks(square, !color) & *board.pieces(Piece::Pawn);
    result |= chess::get_knight_moves(square) & *board.pieces(Piece::Knight);
    result |= chess::get_king_moves(square) & *board.pieces(Piece::King);
    result |= chess::get_bishop_moves(square, occupied) & (*board.pieces(Piece::Bishop) | queens);
    result |= chess::get_rook_moves(square, occupied) & (*board.pieces(Piece::Rook) | queens);

    result & color_pieces
}

/// Find the king square for a color
pub fn king_square(board: &Board, color: Color) -> Square {
    (*board.pieces(Piece::King) & *board.color_combined(color)).to_square()
}

/// Is a piece defended, directly or by a slider behind one of its attackers?
pub fn is_defended(board: &Board, color: Color, square: Square) -> bool {
    if attackers(board, color, square) != EMPTY {
        return true;
    }

    for att_sq in attackers(board, !color, square) {
        let Some(att_piece) = board.piece_on(att_sq) else {
            continue;
        };
        if !is_ray_piece(att_piece) {
            continue;
        }
        // Walk past the attacker, away from the target
        let df = (att_sq.get_file().to_index() as i8 - square.get_file().to_index() as i8).signum();
        let dr = (att_sq.get_rank().to_index() as i8 - square.get_rank().to_index() as i8).signum();
        if let Some(behind) = first_piece_on_ray(board, att_sq, df, dr) {
            if board.color_on(behind) == Some(color) {
                if let Some(piece) = board.piece_on(behind) {
                    if ray_directions(piece).contains(&(-df, -dr)) {
                        return true;
                    }
                }
            }
        }
    }

    false
}

/// Is a piece hanging (not defended)?
pub fn is_hanging(board: &Board, color: Color, square: Square) -> bool {
    !is_defended(board, color, square)
}

/// Can a piece be taken by a lower-value piece?
pub fn can_be_taken_by_lower_piece(board: &Board, piece: Piece, color: Color, square: Square) -> bool {
    attackers(board, !color, square).into_iter().any(|att_sq| {
        board
            .piece_on(att_sq)
            .is_some_and(|att| att != Piece::King && piece_value(att) < piece_value(piece))
    })
}

/// Is a piece in a bad spot (attacked and hanging, or takeable by a lower piece)?
pub fn is_in_bad_spot(board: &Board, square: Square) -> bool {
    let (piece, color) = match (board.piece_on(square), board.color_on(square)) {
        (Some(p), Some(c)) => (p, c),
        _ => return false,
    };

    if attackers(board, !color, square) == EMPTY {
        return false;
    }

    is_hanging(board, color, square) || can_be_taken_by_lower_piece(board, piece, color, square)
}

/// Count material for one side (king excluded)
pub fn material_count(board: &Board, color: Color) -> i32 {
    let color_bb = *board.color_combined(color);
    [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
        .into_iter()
        .map(|p| (*board.pieces(p) & color_bb).popcnt() as i32 * piece_value(p))
        .sum()
}

/// Material difference (positive = side has more)
pub fn material_diff(board: &Board, side: Color) -> i32 {
    material_count(board, side) - material_count(board, !side)
}

/// Non-king material of both sides
pub fn total_material(board: &Board) -> i32 {
    material_count(board, Color::White) + material_count(board, Color::Black)
}

/// Minor pieces still standing on their starting squares
pub fn undeveloped_minors(board: &Board) -> u32 {
    let homes = [
        (Color::White, Piece::Knight, Rank::First, [File::B, File::G]),
        (Color::White, Piece::Bishop, Rank::First, [File::C, File::F]),
        (Color::Black, Piece::Knight, Rank::Eighth, [File::B, File::G]),
        (Color::Black, Piece::Bishop, Rank::Eighth, [File::C, File::F]),
    ];
    homes
        .iter()
        .flat_map(|(color, piece, rank, files)| {
            files.iter().map(move |file| (color, piece, Square::make_square(*rank, *file)))
        })
        .filter(|(color, piece, sq)| {
            board.piece_on(*sq) == Some(**piece) && board.color_on(*sq) == Some(**color)
        })
        .count() as u32
}

/// Get opponent pieces attacked from a square
pub fn attacked_opponent_squares(
    board: &Board,
    from_square: Square,
    pov: Color,
) -> Vec<(Piece, Square)> {
    attacks(board, from_square)
        .into_iter()
        .filter_map(|sq| match (board.piece_on(sq), board.color_on(sq)) {
            (Some(piece), Some(color)) if color != pov => Some((piece, sq)),
            _ => None,
        })
        .collect()
}

/// Rank index a color's pieces start on
pub fn home_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    }
}

/// Rough count of weaknesses around a king: attacked neighbour squares,
/// missing shield pawns and pawnless files next to it.
pub fn king_exposure(board: &Board, color: Color) -> i32 {
    let king = king_square(board, color);
    let own_pawns = *board.pieces(Piece::Pawn) & *board.color_combined(color);
    let forward = match color {
        Color::White => 1,
        Color::Black => -1,
    };

    let attacked_neighbours = chess::get_king_moves(king)
        .into_iter()
        .filter(|sq| attackers(board, !color, *sq) != EMPTY)
        .count() as i32;

    let mut missing_shield = 0;
    let mut open_files = 0;
    for df in -1..=1 {
        let Some(file_sq) = offset(king, df, 0) else {
            continue;
        };
        let shielded = [1, 2]
            .into_iter()
            .filter_map(|dist| offset(file_sq, 0, forward * dist))
            .any(|sq| own_pawns & BitBoard::from_square(sq) != EMPTY);
        if !shielded {
            missing_shield += 1;
        }
        if chess::get_file(file_sq.get_file()) & own_pawns == EMPTY {
            open_files += 1;
        }
    }

    attacked_neighbours + missing_shield + open_files
}

/// Doubled plus isolated pawns for one side
pub fn weak_pawns(board: &Board, color: Color) -> i32 {
    let own_pawns = *board.pieces(Piece::Pawn) & *board.color_combined(color);
    let mut weak = 0;
    for file_idx in 0..8 {
        let file = File::from_index(file_idx);
        let on_file = (chess::get_file(file) & own_pawns).popcnt() as i32;
        if on_file == 0 {
            continue;
        }
        weak += on_file - 1;
        if chess::get_adjacent_files(file) & own_pawns == EMPTY {
            weak += on_file;
        }
    }
    weak
}

/// Squares in the opponent's half attacked by one side
pub fn space(board: &Board, color: Color) -> i32 {
    let mut controlled = EMPTY;
    for sq in *board.color_combined(color) {
        controlled |= attacks(board, sq);
    }
    controlled
        .into_iter()
        .filter(|sq| {
            let rank = sq.get_rank().to_index();
            match color {
                Color::White => rank >= 4,
                Color::Black => rank <= 3,
            }
        })
        .count() as i32
}

/// Distance between two squares (Chebyshev distance)
pub fn square_distance(s1: Square, s2: Square) -> u32 {
    let r1 = s1.get_rank().to_index() as i32;
    let r2 = s2.get_rank().to_index() as i32;
    let f1 = s1.get_file().to_index() as i32;
    let f2 = s2.get_file().to_index() as i32;
    (r1 - r2).unsigned_abs().max((f1 - f2).unsigned_abs())
}
