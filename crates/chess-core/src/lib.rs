//! Rules oracle shared by the review worker: PGN extraction, notation
//! conversion and game replay.

pub mod game_data;
pub mod notation;
pub mod pgn;

pub use game_data::{GameMetadata, GameRecord, Side};
pub use notation::{NotationError, PlyRecord, Replay, STANDARD_START_FEN};
