//! Stockfish engine wrapper using UCI protocol (async I/O)

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::engine::{Engine, EngineFactory, EvalResult, PvLine, SearchBudget};
use crate::error::ReviewError;

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    multipv: u32,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str) -> Result<Self, ReviewError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReviewError::Engine(format!("Failed to spawn Stockfish at {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| ReviewError::Engine("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| ReviewError::Engine("Stockfish stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
            multipv: 1,
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine.send("setoption name Threads value 1").await?;
        engine.send("setoption name Hash value 256").await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    async fn send(&mut self, cmd: &str) -> Result<(), ReviewError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| ReviewError::Engine(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ReviewError::Engine(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Next output line; EOF means the process died.
    async fn read_line(&mut self) -> Result<String, ReviewError> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| ReviewError::Engine(format!("Failed to read from Stockfish: {e}")))?;
        if n == 0 {
            return Err(ReviewError::Engine("Stockfish closed its output".into()));
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "SF >");
        Ok(trimmed)
    }

    async fn wait_for(&mut self, expected: &str) -> Result<(), ReviewError> {
        while self.read_line().await? != expected {}
        Ok(())
    }
}

#[async_trait]
impl Engine for StockfishEngine {
    async fn evaluate(&mut self, fen: &str, budget: &SearchBudget) -> Result<EvalResult, ReviewError> {
        let multipv = budget.multipv.max(1);
        if multipv != self.multipv {
            self.send(&format!("setoption name MultiPV value {multipv}")).await?;
            self.multipv = multipv;
        }
        self.send(&format!("position fen {fen}")).await?;
        self.send(&go_command(budget)).await?;

        let mut search = SearchOutput::new(multipv);
        loop {
            let line = self.read_line().await?;
            if let Some(result) = search.feed(&line) {
                return Ok(result);
            }
        }
    }

    async fn stop(&mut self) -> Result<(), ReviewError> {
        self.send("stop").await?;
        while !self.read_line().await?.starts_with("bestmove") {}
        Ok(())
    }

    async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

/// Collects the `info` lines of one search until `bestmove`
struct SearchOutput {
    lines: Vec<PvLine>,
}

impl SearchOutput {
    fn new(multipv: u32) -> Self {
        Self {
            lines: vec![PvLine::default(); multipv.max(1) as usize],
        }
    }

    /// Feed one output line; returns the result once `bestmove` arrives.
    fn feed(&mut self, line: &str) -> Option<EvalResult> {
        if line.starts_with("info") && line.contains(" score ") {
            if line.contains(" pv ") {
                let idx = parse_multipv_index(line).unwrap_or(1).saturating_sub(1) as usize;
                if let Some(entry) = self.lines.get_mut(idx) {
                    entry.cp = parse_cp(line);
                    entry.mate = parse_mate(line);
                    entry.pv = parse_pv(line);
                }
            } else if self.lines[0].pv.is_empty() {
                // Terminal position (mate or stalemate): a depth 0 score and no pv
                self.lines[0].cp = parse_cp(line);
                self.lines[0].mate = parse_mate(line);
            }
            return None;
        }

        if !line.starts_with("bestmove") {
            return None;
        }
        let best_move = line
            .split_whitespace()
            .nth(1)
            .filter(|m| *m != "(none)")
            .map(str::to_string);
        let top = self.lines[0].clone();
        let lines = std::mem::take(&mut self.lines)
            .into_iter()
            .filter(|l| !l.pv.is_empty())
            .collect();
        Some(EvalResult {
            cp: top.cp,
            mate: top.mate,
            best_move,
            lines,
        })
    }
}

/// Launches Stockfish processes from a binary path
#[derive(Debug, Clone)]
pub struct StockfishLauncher {
    pub path: String,
}

impl StockfishLauncher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EngineFactory for StockfishLauncher {
    type Engine = StockfishEngine;

    async fn spawn(&self) -> Result<StockfishEngine, ReviewError> {
        StockfishEngine::new(&self.path).await
    }
}

fn go_command(budget: &SearchBudget) -> String {
    match budget.nodes {
        Some(nodes) => format!("go depth {} nodes {nodes}", budget.depth),
        None => format!("go depth {}", budget.depth),
    }
}

/// Value following `key` in an info line
fn parse_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let mut parts = line.split_whitespace();
    parts.find(|p| *p == key)?;
    parts.next()?.parse().ok()
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_after(line, "multipv")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip_while(|p| *p != "pv")
        .skip(1)
        .take_while(|p| !p.starts_with("bmc") && *p != "string")
        .map(str::to_string)
        .collect()
}
