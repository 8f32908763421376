//! Review configuration from environment variables

use std::env;
use std::path::Path;
use std::time::Duration;

use tracing::info;

/// Hard ceiling on the requested search depth
pub const MAX_DEPTH: u32 = 25;

const DEFAULT_DATABASE_URL: &str = "sqlite://chess_review.db?mode=rwc";

const STOCKFISH_CANDIDATES: &[&str] = &[
    "/opt/homebrew/bin/stockfish",
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
];

#[derive(Clone, Debug)]
pub struct ReviewConfig {
    /// SQLite connection URL
    pub database_url: String,

    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search depth per position
    pub analysis_depth: u32,

    /// Optional node budget per position
    pub nodes_per_position: Option<u32>,

    /// Wall-clock budget per position
    pub position_timeout: Duration,

    /// Ranked alternatives requested per position
    pub multipv: u32,

    /// Plies considered part of the opening phase
    pub opening_ply_threshold: u32,

    /// Bincode opening book
    pub book_path: String,

    /// Bounded arbiter mailbox size
    pub arbiter_queue_depth: usize,

    /// Games analyzed at once; they queue on the one engine
    pub concurrent_games: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            stockfish_path: "stockfish".to_string(),
            analysis_depth: 15,
            nodes_per_position: None,
            position_timeout: Duration::from_millis(10_000),
            multipv: 3,
            opening_ply_threshold: 20,
            book_path: "data/opening_book.bin".to_string(),
            arbiter_queue_depth: 64,
            concurrent_games: 4,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ReviewConfig {
    /// Load configuration from environment variables.
    /// Malformed numbers fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let stockfish_path = env::var("STOCKFISH_PATH").unwrap_or_else(|_| locate_stockfish());

        let analysis_depth = parse_env::<u32>("ANALYSIS_DEPTH")
            .unwrap_or(defaults.analysis_depth)
            .clamp(1, MAX_DEPTH);

        let nodes_per_position = parse_env::<u32>("NODES_PER_POSITION").filter(|n| *n > 0);

        let position_timeout = parse_env::<u64>("POSITION_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.position_timeout);

        let multipv = parse_env::<u32>("MULTIPV")
            .unwrap_or(defaults.multipv)
            .max(1);

        let opening_ply_threshold =
            parse_env("OPENING_PLY_THRESHOLD").unwrap_or(defaults.opening_ply_threshold);

        let book_path = env::var("BOOK_PATH").unwrap_or(defaults.book_path);

        let arbiter_queue_depth = parse_env::<usize>("ARBITER_QUEUE_DEPTH")
            .unwrap_or(defaults.arbiter_queue_depth)
            .max(1);

        let concurrent_games = parse_env::<usize>("CONCURRENT_GAMES")
            .unwrap_or(defaults.concurrent_games)
            .max(1);

        let config = Self {
            database_url,
            stockfish_path,
            analysis_depth,
            nodes_per_position,
            position_timeout,
            multipv,
            opening_ply_threshold,
            book_path,
            arbiter_queue_depth,
            concurrent_games,
        };
        info!(
            stockfish_path = %config.stockfish_path,
            depth = config.analysis_depth,
            multipv = config.multipv,
            "Review config loaded"
        );
        config
    }
}

/// First installed Stockfish among the usual locations, else rely on PATH.
fn locate_stockfish() -> String {
    STOCKFISH_CANDIDATES
        .iter()
        .find(|p| Path::new(p).exists())
        .map(|p| p.to_string())
        .unwrap_or_else(|| "stockfish".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReviewConfig::default();
        assert_eq!(config.analysis_depth, 15);
        assert_eq!(config.multipv, 3);
        assert_eq!(config.position_timeout, Duration::from_secs(10));
        assert!(config.nodes_per_position.is_none());
        assert_eq!(config.concurrent_games, 4);
    }

    #[test]
    fn test_locate_stockfish_never_empty() {
        assert!(!locate_stockfish().is_empty());
    }
}
