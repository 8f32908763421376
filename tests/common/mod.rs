#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use chess_core::notation::replay;
use chess_core::{GameMetadata, GameRecord, STANDARD_START_FEN};
use review_worker::analyzer::MoveEvaluation;
use review_worker::{db, Engine, EngineFactory, EvalResult, ReviewError, SearchBudget};

pub const SCHOLARS_MATE: &[&str] = &["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"];
pub const FOOLS_MATE: &[&str] = &["f3", "e5", "g4", "Qh4#"];

pub const SCHOLARS_MATE_PGN: &str = r#"[Event "Casual"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0
"#;

/// In-memory store with the schema applied. One connection so every query
/// sees the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// File-backed store opened the way the worker opens it, with several
/// connections. Keep the directory alive for as long as the pool.
pub async fn file_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("review.db").display());
    let pool = db::connect(&url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    (dir, pool)
}

/// Stored evaluation data for one ply that should be flagged
#[derive(Debug, Clone, Copy)]
pub struct Flag {
    pub ply: u32,
    pub best: &'static str,
    /// White point of view
    pub before: i32,
    pub after: i32,
    pub loss: u32,
    pub is_book: bool,
}

impl Flag {
    pub fn new(ply: u32, best: &'static str, before: i32, after: i32, loss: u32) -> Self {
        Self {
            ply,
            best,
            before,
            after,
            loss,
            is_book: false,
        }
    }

    pub fn book(mut self) -> Self {
        self.is_book = true;
        self
    }
}

/// Store a game and an evaluation row for every ply. Unflagged plies get a
/// zero loss with the played move as the engine's choice.
pub async fn seed_game(pool: &SqlitePool, sans: &[&str], flags: &[Flag]) -> i64 {
    let moves: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
    let replayed = replay(STANDARD_START_FEN, &moves).unwrap();
    assert!(replayed.is_complete(), "fixture has an illegal move");

    let game = GameRecord {
        metadata: GameMetadata {
            white: "White".into(),
            black: "Black".into(),
            result: "*".into(),
            date: None,
            time_control: None,
            eco: None,
            event: None,
        },
        moves,
        pgn: sans.join(" "),
        start_fen: None,
    };
    let game_id = db::insert_game(pool, &game).await.unwrap();

    for ply in &replayed.plies {
        let flag = flags.iter().find(|f| f.ply == ply.ply);
        let mv = MoveEvaluation {
            ply: ply.ply,
            color: ply.side,
            san: ply.san.clone(),
            uci: ply.uci.clone(),
            fen_before: ply.fen_before.clone(),
            fen_after: ply.fen_after.clone(),
            evaluation_before: Some(flag.map_or(0, |f| f.before)),
            evaluation_after: Some(flag.map_or(0, |f| f.after)),
            best_move: Some(flag.map_or_else(|| ply.uci.clone(), |f| f.best.to_string())),
            centipawn_loss: Some(flag.map_or(0, |f| f.loss)),
            is_book: flag.is_some_and(|f| f.is_book),
            alternatives: Vec::new(),
        };
        db::insert_move_evaluation(pool, game_id, &mv).await.unwrap();
    }
    game_id
}

/// Shared, inspectable state behind every engine a [`ScriptedFactory`] spawns
#[derive(Default)]
pub struct ScriptState {
    /// Answers by position; unknown positions score 0 with the position echoed as best move
    pub answers: Mutex<HashMap<String, EvalResult>>,
    /// Remaining crashes per position
    pub crashes: Mutex<HashMap<String, usize>>,
    /// Positions the engine never finishes
    pub hangs: Mutex<HashSet<String>>,
    /// Every position an engine started on, in order
    pub log: Mutex<Vec<String>>,
    pub spawns: AtomicUsize,
    pub stops: AtomicUsize,
    pub delay: Mutex<Duration>,
}

impl ScriptState {
    pub fn answer(&self, fen: impl Into<String>, eval: EvalResult) {
        self.answers.lock().unwrap().insert(fen.into(), eval);
    }

    pub fn crash_on(&self, fen: impl Into<String>, times: usize) {
        self.crashes.lock().unwrap().insert(fen.into(), times);
    }

    pub fn hang_on(&self, fen: impl Into<String>) {
        self.hangs.lock().unwrap().insert(fen.into());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pub state: Arc<ScriptState>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngineFactory for ScriptedFactory {
    type Engine = ScriptedEngine;

    async fn spawn(&self) -> Result<ScriptedEngine, ReviewError> {
        self.state.spawns.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedEngine {
            state: self.state.clone(),
        })
    }
}

pub struct ScriptedEngine {
    state: Arc<ScriptState>,
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn evaluate(&mut self, fen: &str, _budget: &SearchBudget) -> Result<EvalResult, ReviewError> {
        self.state.log.lock().unwrap().push(fen.to_string());

        let crash = {
            let mut crashes = self.state.crashes.lock().unwrap();
            match crashes.get_mut(fen) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if crash {
            return Err(ReviewError::Engine("engine process exited".into()));
        }

        let hang = self.state.hangs.lock().unwrap().contains(fen);
        if hang {
            std::future::pending::<()>().await;
        }

        let delay = *self.state.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.state.answers.lock().unwrap().get(fen).cloned();
        Ok(scripted.unwrap_or_else(|| EvalResult {
            cp: Some(0),
            mate: None,
            best_move: Some(fen.to_string()),
            lines: Vec::new(),
        }))
    }

    async fn stop(&mut self) -> Result<(), ReviewError> {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn quit(&mut self) {}
}

pub fn positions(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

pub fn budget(timeout: Duration) -> SearchBudget {
    SearchBudget {
        timeout,
        ..SearchBudget::default()
    }
}
