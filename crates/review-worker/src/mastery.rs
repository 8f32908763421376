//! Puzzle practice progress and mastery scoring.
//!
//! One row per (user, puzzle). `solved` is sticky, `streak` is per puzzle and
//! resets on a failed attempt. Puzzle ids of the form `{game_id}_m{move_number}`
//! also update the blunder detail they were built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::categorize::parse_puzzle_id;
use crate::error::ReviewError;

/// Average seconds per attempt that still earns the full speed bonus
const FAST_SOLVE_SECS: f64 = 10.0;
/// Average seconds per attempt at which the speed bonus reaches zero
const SLOW_SOLVE_SECS: f64 = 120.0;
const MAX_STREAK_BONUS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryStatus {
    #[default]
    Learning,
    Improving,
    Mastered,
}

pub fn mastery_status(score: i64) -> MasteryStatus {
    match score {
        s if s >= 80 => MasteryStatus::Mastered,
        s if s >= 50 => MasteryStatus::Improving,
        _ => MasteryStatus::Learning,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PuzzleProgress {
    pub user_id: i64,
    pub puzzle_id: String,
    pub attempts: i64,
    pub solved: bool,
    pub first_attempt_correct: bool,
    pub streak: i64,
    pub total_time_ms: i64,
    pub moves_count: Option<i64>,
    pub hints_used: i64,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub mastery_score: i64,
    #[sqlx(skip)]
    pub mastery_status: MasteryStatus,
}

impl PuzzleProgress {
    fn with_status(mut self) -> Self {
        self.mastery_status = mastery_status(self.mastery_score);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptInput {
    pub solved: bool,
    pub time_spent_seconds: f64,
    pub moves_count: Option<u32>,
    pub hints_used: Option<u32>,
}

/// Mastery in [0, 100]. Never lower for a faster average time with the
/// same attempts and correctness.
pub fn calculate_mastery_score(progress: &PuzzleProgress) -> i64 {
    if progress.attempts <= 0 {
        return 0;
    }
    let avg_secs = progress.total_time_ms.max(0) as f64 / progress.attempts as f64 / 1000.0;
    let speed = (1.0 - (avg_secs - FAST_SOLVE_SECS) / (SLOW_SOLVE_SECS - FAST_SOLVE_SECS)).clamp(0.0, 1.0);

    let score = if progress.solved {
        let first_try = if progress.first_attempt_correct { 20.0 } else { 0.0 };
        let streak = progress.streak.clamp(0, MAX_STREAK_BONUS) as f64 * 2.0;
        50.0 + first_try + 30.0 * speed + streak
    } else {
        10.0 + 10.0 * speed - 3.0 * (progress.attempts - 1) as f64
    };
    score.round().clamp(0.0, 100.0) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressOrder {
    #[default]
    LastAttempted,
    MasteryScore,
    Attempts,
    Streak,
}

impl ProgressOrder {
    fn column(self) -> &'static str {
        match self {
            ProgressOrder::LastAttempted => "last_attempted_at",
            ProgressOrder::MasteryScore => "mastery_score",
            ProgressOrder::Attempts => "attempts",
            ProgressOrder::Streak => "streak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressQuery {
    pub min_mastery: Option<i64>,
    pub limit: Option<u32>,
    pub order_by: ProgressOrder,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeStatistics {
    pub total_puzzles: i64,
    pub total_attempts: i64,
    pub total_solved: i64,
    /// Percent, rounded
    pub success_rate: i64,
    /// One decimal
    pub average_mastery: f64,
    /// Highest per-puzzle streak
    pub best_streak: i64,
}

#[derive(Clone)]
pub struct MasteryTracker {
    pool: SqlitePool,
}

impl MasteryTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one practice attempt and return the updated row.
    pub async fn record_attempt(
        &self,
        user_id: i64,
        puzzle_id: &str,
        attempt: AttemptInput,
    ) -> Result<PuzzleProgress, ReviewError> {
        let time_ms = (attempt.time_spent_seconds.max(0.0) * 1000.0).round() as i64;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO puzzle_practice_progress (
                user_id, puzzle_id, attempts, solved, first_attempt_correct, streak,
                total_time_ms, moves_count, hints_used, last_attempted_at
            ) VALUES (?, ?, 1, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, puzzle_id) DO UPDATE SET
                attempts = attempts + 1,
                solved = MAX(solved, excluded.solved),
                streak = CASE WHEN excluded.solved THEN streak + 1 ELSE 0 END,
                total_time_ms = total_time_ms + excluded.total_time_ms,
                moves_count = COALESCE(excluded.moves_count, moves_count),
                hints_used = hints_used + excluded.hints_used,
                last_attempted_at = excluded.last_attempted_at"#,
        )
        .bind(user_id)
        .bind(puzzle_id)
        .bind(attempt.solved)
        .bind(attempt.solved)
        .bind(i64::from(attempt.solved))
        .bind(time_ms)
        .bind(attempt.moves_count.map(i64::from))
        .bind(i64::from(attempt.hints_used.unwrap_or(0)))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let mut progress = sqlx::query_as::<_, PuzzleProgress>(
            "SELECT * FROM puzzle_practice_progress WHERE user_id = ? AND puzzle_id = ?",
        )
        .bind(user_id)
        .bind(puzzle_id)
        .fetch_one(&mut *tx)
        .await?;

        progress.mastery_score = calculate_mastery_score(&progress);
        sqlx::query("UPDATE puzzle_practice_progress SET mastery_score = ? WHERE user_id = ? AND puzzle_id = ?")
            .bind(progress.mastery_score)
            .bind(user_id)
            .bind(puzzle_id)
            .execute(&mut *tx)
            .await?;

        if let Some((game_id, move_number)) = parse_puzzle_id(puzzle_id) {
            let mastered = mastery_status(progress.mastery_score) == MasteryStatus::Mastered;
            sqlx::query(
                r#"UPDATE blunder_details
                   SET review_count = review_count + 1,
                       mastery_score = ?,
                       learned = MAX(learned, ?)
                   WHERE game_id = ? AND move_number = ?"#,
            )
            .bind(progress.mastery_score)
            .bind(mastered)
            .bind(game_id)
            .bind(move_number)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            user_id,
            puzzle_id,
            attempts = progress.attempts,
            mastery = progress.mastery_score,
            "Recorded puzzle attempt"
        );
        Ok(progress.with_status())
    }

    pub async fn get_progress(&self, user_id: i64, puzzle_id: &str) -> Result<PuzzleProgress, ReviewError> {
        sqlx::query_as::<_, PuzzleProgress>(
            "SELECT * FROM puzzle_practice_progress WHERE user_id = ? AND puzzle_id = ?",
        )
        .bind(user_id)
        .bind(puzzle_id)
        .fetch_optional(&self.pool)
        .await?
        .map(PuzzleProgress::with_status)
        .ok_or_else(|| ReviewError::NotFound(format!("no progress for puzzle {puzzle_id}")))
    }

    pub async fn get_all_progress(
        &self,
        user_id: i64,
        query: ProgressQuery,
    ) -> Result<Vec<PuzzleProgress>, ReviewError> {
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        // Column and direction come from closed enums, never from input text
        let sql = format!(
            "SELECT * FROM puzzle_practice_progress
             WHERE user_id = ? AND mastery_score >= ?
             ORDER BY {} {direction}, puzzle_id ASC
             LIMIT ?",
            query.order_by.column()
        );
        let rows = sqlx::query_as::<_, PuzzleProgress>(&sql)
            .bind(user_id)
            .bind(query.min_mastery.unwrap_or(0))
            .bind(query.limit.map(i64::from).unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PuzzleProgress::with_status).collect())
    }

    pub async fn get_statistics(&self, user_id: i64) -> Result<PracticeStatistics, ReviewError> {
        let (total_puzzles, total_attempts, total_solved, average, best_streak): (i64, i64, i64, f64, i64) =
            sqlx::query_as(
                r#"SELECT COUNT(*),
                          COALESCE(SUM(attempts), 0),
                          COALESCE(SUM(solved), 0),
                          COALESCE(AVG(mastery_score), 0.0),
                          COALESCE(MAX(streak), 0)
                   FROM puzzle_practice_progress
                   WHERE user_id = ?"#,
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let success_rate = if total_puzzles == 0 {
            0
        } else {
            (100.0 * total_solved as f64 / total_puzzles as f64).round() as i64
        };

        Ok(PracticeStatistics {
            total_puzzles,
            total_attempts,
            total_solved,
            success_rate,
            average_mastery: (average * 10.0).round() / 10.0,
            best_streak,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(attempts: i64, solved: bool, first: bool, streak: i64, total_secs: i64) -> PuzzleProgress {
        PuzzleProgress {
            user_id: 1,
            puzzle_id: "p".into(),
            attempts,
            solved,
            first_attempt_correct: first,
            streak,
            total_time_ms: total_secs * 1000,
            moves_count: None,
            hints_used: 0,
            last_attempted_at: None,
            mastery_score: 0,
            mastery_status: MasteryStatus::Learning,
        }
    }

    #[test]
    fn test_zero_attempts_scores_zero() {
        assert_eq!(calculate_mastery_score(&progress(0, false, false, 0, 0)), 0);
    }

    #[test]
    fn test_fast_first_try_is_mastered() {
        let score = calculate_mastery_score(&progress(1, true, true, 1, 8));
        assert_eq!(score, 100);
        assert_eq!(mastery_status(score), MasteryStatus::Mastered);
    }

    #[test]
    fn test_unsolved_penalized_by_attempts() {
        let one = calculate_mastery_score(&progress(1, false, false, 0, 60));
        let four = calculate_mastery_score(&progress(4, false, false, 0, 240));
        assert!(four < one);
        assert!(four >= 0);
    }

    #[test]
    fn test_score_monotone_in_time() {
        let mut prev = i64::MAX;
        for secs in (0..=300).step_by(5) {
            let score = calculate_mastery_score(&progress(2, true, false, 1, secs));
            assert!(score <= prev, "slower solve scored higher at {secs}s");
            prev = score;
        }
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(mastery_status(0), MasteryStatus::Learning);
        assert_eq!(mastery_status(49), MasteryStatus::Learning);
        assert_eq!(mastery_status(50), MasteryStatus::Improving);
        assert_eq!(mastery_status(79), MasteryStatus::Improving);
        assert_eq!(mastery_status(80), MasteryStatus::Mastered);
    }
}
