//! In-memory opening book for book-move detection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Stats for a single book move
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMoveStats {
    pub games: i32,
    pub white_wins: i32,
    pub draws: i32,
    pub black_wins: i32,
}

/// FEN (first four fields) -> (move_san -> stats)
pub type BookEntries = HashMap<String, HashMap<String, BookMoveStats>>;

#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: BookEntries,
}

impl OpeningBook {
    pub fn from_entries(entries: BookEntries) -> Self {
        Self { entries }
    }

    /// Load the book from a bincode file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let entries: BookEntries = bincode::deserialize_from(reader)?;
        Ok(Self { entries })
    }

    /// Load the book, or an empty one (book detection disabled) when unreadable.
    pub fn load_or_empty(path: &str) -> Self {
        match Self::load(path) {
            Ok(book) => {
                let total_moves: usize = book.entries.values().map(|m| m.len()).sum();
                tracing::info!(positions = book.entries.len(), moves = total_moves, "Loaded opening book");
                book
            }
            Err(e) => {
                tracing::warn!("Failed to load opening book from {}: {}", path, e);
                tracing::warn!("Book move detection will be disabled");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Is (fen, move_san) a known book move?
    pub fn is_book_move(&self, fen: &str, move_san: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries
            .get(&normalize_fen(fen))
            .is_some_and(|moves| moves.contains_key(move_san))
    }
}

/// Strips move counters from FEN, keeping only position + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}
