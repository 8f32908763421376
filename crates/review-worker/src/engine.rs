//! Evaluation engine abstraction used by the arbiter.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::Score;
use crate::error::ReviewError;

/// Per-position search limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    pub depth: u32,
    pub nodes: Option<u32>,
    pub multipv: u32,
    /// Wall-clock limit enforced by the arbiter
    pub timeout: Duration,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            depth: 15,
            nodes: None,
            multipv: 1,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A single PV line from multi-PV analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvLine {
    /// Principal variation moves (UCI)
    pub pv: Vec<String>,
    pub cp: Option<i32>,
    pub mate: Option<i32>,
}

/// Result of a single position evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Centipawn score from the side to move's perspective
    pub cp: Option<i32>,
    /// Mate in N moves (positive = side to move mates)
    pub mate: Option<i32>,
    /// Best move in UCI notation; `None` in terminal positions
    pub best_move: Option<String>,
    /// Ranked alternatives, best first
    pub lines: Vec<PvLine>,
}

impl EvalResult {
    pub fn score(&self) -> Option<Score> {
        Score::from_parts(self.cp, self.mate)
    }

    /// First move of each ranked line
    pub fn alternatives(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|l| l.pv.first().cloned())
            .collect()
    }
}

/// One stateful engine process
#[async_trait]
pub trait Engine: Send {
    async fn evaluate(&mut self, fen: &str, budget: &SearchBudget) -> Result<EvalResult, ReviewError>;

    /// Abort the running search and wait for it to report
    async fn stop(&mut self) -> Result<(), ReviewError>;

    async fn quit(&mut self);
}

/// Starts engine processes; the arbiter calls it again after a crash.
#[async_trait]
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: Engine + 'static;

    async fn spawn(&self) -> Result<Self::Engine, ReviewError>;
}
