pub use chess;

pub mod analysis;
pub mod analyzer;
pub mod arbiter;
pub mod backfill;
pub mod board_utils;
pub mod book_cache;
pub mod categorize;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod mastery;
pub mod stockfish;
pub mod tactics;
pub mod themes;

pub use analysis::{classify, MoveContext, MoveQuality, Score};
pub use analyzer::{GameAnalysis, GameAnalyzer, MoveEvaluation, StoredAnalysis};
pub use arbiter::{ArbiterHandle, BatchOutcome, EngineArbiter, PositionOutcome};
pub use backfill::{BackfillOptions, BackfillSummary, Reconciler};
pub use categorize::{BlunderDetail, Categorization, Categorizer, Phase, PoorMove};
pub use config::ReviewConfig;
pub use engine::{Engine, EngineFactory, EvalResult, PvLine, SearchBudget};
pub use error::ReviewError;
pub use mastery::{AttemptInput, MasteryStatus, MasteryTracker, PuzzleProgress};
pub use tactics::{PositionType, Theme};
pub use themes::canonical_theme;
