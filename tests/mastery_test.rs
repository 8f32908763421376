//! Puzzle practice progress and statistics against an in-memory store.

mod common;

use common::{file_pool, seed_game, test_pool, Flag, SCHOLARS_MATE};
use tokio::task::JoinSet;
use review_worker::mastery::{PracticeStatistics, ProgressOrder, ProgressQuery, SortOrder};
use review_worker::{db, AttemptInput, BackfillOptions, Categorizer, MasteryStatus, MasteryTracker, Reconciler, ReviewError};

const USER: i64 = 1;

fn attempt(solved: bool, secs: f64) -> AttemptInput {
    AttemptInput {
        solved,
        time_spent_seconds: secs,
        ..AttemptInput::default()
    }
}

#[tokio::test]
async fn test_fail_then_solve() {
    let tracker = MasteryTracker::new(test_pool().await);

    let first = tracker.record_attempt(USER, "p1", attempt(false, 60.0)).await.unwrap();
    assert_eq!(first.attempts, 1);
    assert!(!first.solved);
    assert!(!first.first_attempt_correct);
    assert_eq!(first.streak, 0);
    assert_eq!(first.total_time_ms, 60_000);

    let second = tracker.record_attempt(USER, "p1", attempt(true, 45.0)).await.unwrap();
    assert_eq!(second.attempts, 2);
    assert!(second.solved);
    assert!(!second.first_attempt_correct);
    assert_eq!(second.streak, 1);
    assert_eq!(second.total_time_ms, 105_000);
    assert!(second.mastery_score > first.mastery_score);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_are_all_counted() {
    const ATTEMPTS: i64 = 20;
    let (_dir, pool) = file_pool().await;
    let tracker = MasteryTracker::new(pool);

    let mut tasks = JoinSet::new();
    for _ in 0..ATTEMPTS {
        let tracker = tracker.clone();
        tasks.spawn(async move { tracker.record_attempt(USER, "p1", attempt(true, 5.0)).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    let progress = tracker.get_progress(USER, "p1").await.unwrap();
    assert_eq!(progress.attempts, ATTEMPTS);
    assert_eq!(progress.streak, ATTEMPTS);
    assert!(progress.solved);
    assert!(progress.first_attempt_correct);
    assert_eq!(progress.total_time_ms, ATTEMPTS * 5_000);
}

#[tokio::test]
async fn test_repeated_solves_build_streak() {
    let tracker = MasteryTracker::new(test_pool().await);
    let mut last = None;
    for _ in 0..4 {
        last = Some(tracker.record_attempt(USER, "p1", attempt(true, 8.0)).await.unwrap());
    }
    let progress = last.unwrap();
    assert_eq!(progress.attempts, 4);
    assert!(progress.solved);
    assert!(progress.first_attempt_correct);
    assert_eq!(progress.streak, 4);
    assert_eq!(progress.mastery_status, MasteryStatus::Mastered);
}

#[tokio::test]
async fn test_solved_is_sticky_and_streak_resets() {
    let tracker = MasteryTracker::new(test_pool().await);
    tracker.record_attempt(USER, "p1", attempt(true, 20.0)).await.unwrap();
    tracker.record_attempt(USER, "p1", attempt(true, 20.0)).await.unwrap();

    let after_miss = tracker.record_attempt(USER, "p1", attempt(false, 20.0)).await.unwrap();
    assert!(after_miss.solved);
    assert!(after_miss.first_attempt_correct);
    assert_eq!(after_miss.streak, 0);
    assert_eq!(after_miss.attempts, 3);
}

#[tokio::test]
async fn test_users_have_separate_progress() {
    let tracker = MasteryTracker::new(test_pool().await);
    tracker.record_attempt(1, "p1", attempt(true, 10.0)).await.unwrap();
    let other = tracker.record_attempt(2, "p1", attempt(false, 10.0)).await.unwrap();
    assert_eq!(other.attempts, 1);
    assert!(!other.solved);
}

#[tokio::test]
async fn test_missing_progress_is_not_found() {
    let tracker = MasteryTracker::new(test_pool().await);
    assert!(matches!(
        tracker.get_progress(USER, "nope").await,
        Err(ReviewError::NotFound(_))
    ));

    tracker.record_attempt(USER, "p1", attempt(true, 10.0)).await.unwrap();
    let stored = tracker.get_progress(USER, "p1").await.unwrap();
    assert_eq!(stored.attempts, 1);
    assert!(stored.mastery_score > 0);
}

#[tokio::test]
async fn test_statistics_success_rate() {
    let tracker = MasteryTracker::new(test_pool().await);
    tracker.record_attempt(USER, "a", attempt(true, 10.0)).await.unwrap();
    tracker.record_attempt(USER, "b", attempt(true, 30.0)).await.unwrap();
    tracker.record_attempt(USER, "b", attempt(true, 30.0)).await.unwrap();
    tracker.record_attempt(USER, "c", attempt(false, 90.0)).await.unwrap();

    let stats = tracker.get_statistics(USER).await.unwrap();
    assert_eq!(stats.total_puzzles, 3);
    assert_eq!(stats.total_attempts, 4);
    assert_eq!(stats.total_solved, 2);
    assert_eq!(stats.success_rate, 67);
    assert_eq!(stats.best_streak, 2);
    assert!(stats.average_mastery > 0.0);
}

#[tokio::test]
async fn test_statistics_without_attempts() {
    let tracker = MasteryTracker::new(test_pool().await);
    let stats = tracker.get_statistics(USER).await.unwrap();
    assert_eq!(
        stats,
        PracticeStatistics {
            total_puzzles: 0,
            total_attempts: 0,
            total_solved: 0,
            success_rate: 0,
            average_mastery: 0.0,
            best_streak: 0,
        }
    );
}

#[tokio::test]
async fn test_all_progress_filter_and_order() {
    let tracker = MasteryTracker::new(test_pool().await);
    tracker.record_attempt(USER, "fast", attempt(true, 5.0)).await.unwrap();
    tracker.record_attempt(USER, "slow", attempt(true, 100.0)).await.unwrap();
    tracker.record_attempt(USER, "miss", attempt(false, 60.0)).await.unwrap();

    let by_mastery = tracker
        .get_all_progress(
            USER,
            ProgressQuery {
                order_by: ProgressOrder::MasteryScore,
                order: SortOrder::Desc,
                ..ProgressQuery::default()
            },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = by_mastery.iter().map(|p| p.puzzle_id.as_str()).collect();
    assert_eq!(ids, vec!["fast", "slow", "miss"]);
    assert_eq!(by_mastery[2].mastery_status, MasteryStatus::Learning);

    let solved_only = tracker
        .get_all_progress(
            USER,
            ProgressQuery {
                min_mastery: Some(50),
                limit: Some(1),
                order_by: ProgressOrder::MasteryScore,
                order: SortOrder::Asc,
            },
        )
        .await
        .unwrap();
    assert_eq!(solved_only.len(), 1);
    assert_eq!(solved_only[0].puzzle_id, "slow");
}

#[tokio::test]
async fn test_practice_updates_linked_blunder() {
    let pool = test_pool().await;
    let game_id = seed_game(&pool, SCHOLARS_MATE, &[Flag::new(6, "g7g6", 60, 9990, 500)]).await;
    Reconciler::new(pool.clone(), Categorizer::default())
        .run(BackfillOptions::default())
        .await
        .unwrap();

    let tracker = MasteryTracker::new(pool.clone());
    let puzzle = format!("{game_id}_m6");
    let progress = tracker.record_attempt(USER, &puzzle, attempt(true, 5.0)).await.unwrap();
    assert_eq!(progress.mastery_status, MasteryStatus::Mastered);

    let detail = db::get_blunder_detail(&pool, game_id, 6).await.unwrap().unwrap();
    assert_eq!(detail.review_count, 1);
    assert_eq!(detail.mastery_score, progress.mastery_score);
    assert!(detail.learned);

    // A later miss lowers the score but the move stays learned
    let missed = tracker.record_attempt(USER, &puzzle, attempt(false, 90.0)).await.unwrap();
    let detail = db::get_blunder_detail(&pool, game_id, 6).await.unwrap().unwrap();
    assert_eq!(detail.review_count, 2);
    assert_eq!(detail.mastery_score, missed.mastery_score);
    assert!(detail.learned);
}
