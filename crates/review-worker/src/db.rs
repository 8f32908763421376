//! SQLite persistence for games, move evaluations and blunder details

use std::str::FromStr;

use chess_core::GameRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::analysis::MoveQuality;
use crate::analyzer::MoveEvaluation;
use crate::categorize::{BlunderDetail, Phase};
use crate::error::ReviewError;
use crate::tactics::PositionType;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event TEXT,
    white TEXT NOT NULL,
    black TEXT NOT NULL,
    result TEXT NOT NULL,
    date TEXT,
    eco TEXT,
    time_control TEXT,
    pgn TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    analyzed_at TIMESTAMP
);

CREATE TABLE IF NOT EXISTS move_evaluations (
    game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    ply INTEGER NOT NULL,
    color TEXT NOT NULL,
    san TEXT NOT NULL,
    fen_before TEXT NOT NULL,
    fen_after TEXT NOT NULL,
    evaluation_before INTEGER,
    evaluation_after INTEGER,
    best_move TEXT,
    centipawn_loss INTEGER,
    is_book INTEGER NOT NULL DEFAULT 0,
    alternatives TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (game_id, ply)
);

CREATE TABLE IF NOT EXISTS blunder_details (
    game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    move_number INTEGER NOT NULL,
    fen TEXT NOT NULL,
    phase TEXT NOT NULL,
    player_move TEXT NOT NULL,
    best_move TEXT NOT NULL,
    alternatives TEXT NOT NULL DEFAULT '[]',
    evaluation_before INTEGER NOT NULL,
    evaluation_after INTEGER NOT NULL,
    win_probability_before REAL NOT NULL,
    win_probability_after REAL NOT NULL,
    tactical_theme TEXT NOT NULL,
    position_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    difficulty_level INTEGER NOT NULL,
    learned INTEGER NOT NULL DEFAULT 0,
    review_count INTEGER NOT NULL DEFAULT 0,
    mastery_score INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (game_id, move_number)
);

CREATE TABLE IF NOT EXISTS puzzle_practice_progress (
    user_id INTEGER NOT NULL,
    puzzle_id TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    solved INTEGER NOT NULL DEFAULT 0,
    first_attempt_correct INTEGER NOT NULL DEFAULT 0,
    streak INTEGER NOT NULL DEFAULT 0,
    total_time_ms INTEGER NOT NULL DEFAULT 0,
    moves_count INTEGER,
    hints_used INTEGER NOT NULL DEFAULT 0,
    last_attempted_at TIMESTAMP,
    mastery_score INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, puzzle_id)
);

CREATE INDEX IF NOT EXISTS idx_move_evaluations_loss ON move_evaluations(centipawn_loss);
CREATE INDEX IF NOT EXISTS idx_games_created ON games(created_at DESC, id DESC);
"#;

/// Open (creating if needed) the SQLite store
pub async fn connect(database_url: &str) -> Result<SqlitePool, ReviewError> {
    if database_url.trim().is_empty() {
        return Err(ReviewError::Config("DATABASE_URL is empty"));
    }
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create tables if they don't exist yet
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), ReviewError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    info!("Database schema ready");
    Ok(())
}

/// Insert a parsed game and return its id
pub async fn insert_game(pool: &SqlitePool, game: &GameRecord) -> Result<i64, ReviewError> {
    let meta = &game.metadata;
    let id = sqlx::query(
        r#"INSERT INTO games (event, white, black, result, date, eco, time_control, pgn)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&meta.event)
    .bind(&meta.white)
    .bind(&meta.black)
    .bind(&meta.result)
    .bind(&meta.date)
    .bind(&meta.eco)
    .bind(&meta.time_control)
    .bind(&game.pgn)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn mark_analyzed(pool: &SqlitePool, game_id: i64) -> Result<(), ReviewError> {
    sqlx::query("UPDATE games SET analyzed_at = ? WHERE id = ?")
        .bind(chrono::Utc::now())
        .bind(game_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store one evaluated move. Existing rows are never rewritten.
pub async fn insert_move_evaluation(
    pool: &SqlitePool,
    game_id: i64,
    mv: &MoveEvaluation,
) -> Result<(), ReviewError> {
    sqlx::query(
        r#"INSERT INTO move_evaluations (
            game_id, ply, color, san, fen_before, fen_after,
            evaluation_before, evaluation_after, best_move, centipawn_loss,
            is_book, alternatives
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (game_id, ply) DO NOTHING"#,
    )
    .bind(game_id)
    .bind(mv.ply as i64)
    .bind(mv.color.as_str())
    .bind(&mv.san)
    .bind(&mv.fen_before)
    .bind(&mv.fen_after)
    .bind(mv.evaluation_before)
    .bind(mv.evaluation_after)
    .bind(&mv.best_move)
    .bind(mv.centipawn_loss.map(i64::from))
    .bind(mv.is_book)
    .bind(serde_json::to_string(&mv.alternatives)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a blunder detail unless its (game_id, move_number) key exists.
/// Returns whether a row was written.
pub async fn insert_blunder_detail(pool: &SqlitePool, detail: &BlunderDetail) -> Result<bool, ReviewError> {
    let result = sqlx::query(
        r#"INSERT INTO blunder_details (
            game_id, move_number, fen, phase, player_move, best_move, alternatives,
            evaluation_before, evaluation_after, win_probability_before, win_probability_after,
            tactical_theme, position_type, severity, difficulty_level,
            learned, review_count, mastery_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (game_id, move_number) DO NOTHING"#,
    )
    .bind(detail.game_id)
    .bind(detail.move_number)
    .bind(&detail.fen)
    .bind(detail.phase.as_str())
    .bind(&detail.player_move)
    .bind(&detail.best_move)
    .bind(serde_json::to_string(&detail.alternatives)?)
    .bind(detail.evaluation_before)
    .bind(detail.evaluation_after)
    .bind(detail.win_probability_before)
    .bind(detail.win_probability_after)
    .bind(&detail.tactical_theme)
    .bind(detail.position_type.as_str())
    .bind(detail.severity.as_str())
    .bind(detail.difficulty_level as i64)
    .bind(detail.learned)
    .bind(detail.review_count)
    .bind(detail.mastery_score)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn blunder_detail_exists(
    pool: &SqlitePool,
    game_id: i64,
    move_number: i64,
) -> Result<bool, ReviewError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM blunder_details WHERE game_id = ? AND move_number = ?")
            .bind(game_id)
            .bind(move_number)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

pub async fn count_blunder_details(pool: &SqlitePool) -> Result<i64, ReviewError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blunder_details")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn decode_err(what: &str, value: &str) -> ReviewError {
    ReviewError::Persistence(sqlx::Error::Decode(format!("unknown {what}: {value}").into()))
}

pub async fn get_blunder_detail(
    pool: &SqlitePool,
    game_id: i64,
    move_number: i64,
) -> Result<Option<BlunderDetail>, ReviewError> {
    let row = sqlx::query("SELECT * FROM blunder_details WHERE game_id = ? AND move_number = ?")
        .bind(game_id)
        .bind(move_number)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let phase: String = row.try_get("phase")?;
    let position_type: String = row.try_get("position_type")?;
    let severity: String = row.try_get("severity")?;
    let alternatives: String = row.try_get("alternatives")?;
    let difficulty: i64 = row.try_get("difficulty_level")?;

    Ok(Some(BlunderDetail {
        game_id: row.try_get("game_id")?,
        move_number: row.try_get("move_number")?,
        fen: row.try_get("fen")?,
        phase: Phase::parse(&phase).ok_or_else(|| decode_err("phase", &phase))?,
        player_move: row.try_get("player_move")?,
        best_move: row.try_get("best_move")?,
        alternatives: serde_json::from_str(&alternatives)?,
        evaluation_before: row.try_get("evaluation_before")?,
        evaluation_after: row.try_get("evaluation_after")?,
        win_probability_before: row.try_get("win_probability_before")?,
        win_probability_after: row.try_get("win_probability_after")?,
        tactical_theme: row.try_get("tactical_theme")?,
        position_type: PositionType::parse(&position_type)
            .ok_or_else(|| decode_err("position type", &position_type))?,
        severity: MoveQuality::from_str(&severity).map_err(|_| decode_err("severity", &severity))?,
        difficulty_level: difficulty.clamp(1, 5) as u8,
        learned: row.try_get("learned")?,
        review_count: row.try_get("review_count")?,
        mastery_score: row.try_get("mastery_score")?,
    }))
}

/// A stored evaluated move, evaluations from White's point of view
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredMove {
    pub ply: i64,
    pub color: String,
    pub san: String,
    pub fen_before: String,
    pub evaluation_before: Option<i32>,
    pub evaluation_after: Option<i32>,
    pub best_move: Option<String>,
    pub centipawn_loss: Option<i64>,
    pub alternatives: String,
}

/// Games with at least one poor, non-book move that has no blunder detail yet, newest first
pub async fn backfill_candidates(
    pool: &SqlitePool,
    min_loss: u32,
    limit: Option<u32>,
) -> Result<Vec<i64>, ReviewError> {
    let ids = sqlx::query_scalar(
        r#"SELECT g.id FROM games g
           WHERE EXISTS (
               SELECT 1 FROM move_evaluations m
               LEFT JOIN blunder_details b ON b.game_id = m.game_id AND b.move_number = m.ply
               WHERE m.game_id = g.id
                 AND m.centipawn_loss > ?
                 AND m.is_book = 0
                 AND b.game_id IS NULL
           )
           ORDER BY g.created_at DESC, g.id DESC
           LIMIT ?"#,
    )
    .bind(min_loss as i64)
    .bind(limit.map(i64::from).unwrap_or(-1))
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Poor, non-book moves of one game in ply order
pub async fn flagged_moves(
    pool: &SqlitePool,
    game_id: i64,
    min_loss: u32,
) -> Result<Vec<StoredMove>, ReviewError> {
    let moves = sqlx::query_as::<_, StoredMove>(
        r#"SELECT ply, color, san, fen_before, evaluation_before, evaluation_after,
                  best_move, centipawn_loss, alternatives
           FROM move_evaluations
           WHERE game_id = ? AND centipawn_loss > ? AND is_book = 0
           ORDER BY ply"#,
    )
    .bind(game_id)
    .bind(min_loss as i64)
    .fetch_all(pool)
    .await?;
    Ok(moves)
}
