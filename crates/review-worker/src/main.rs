//! Review worker
//!
//! Analyzes PGN files with Stockfish, stores evaluations and categorized
//! poor moves in SQLite. Up to `CONCURRENT_GAMES` games are in flight at
//! once, all sharing one engine through the arbiter.
//!
//! Usage:
//!   review-worker game1.pgn [game2.pgn ...]
//!
//! A file may hold several games separated by blank lines before `[Event`.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use review_worker::stockfish::StockfishLauncher;
use review_worker::{db, EngineArbiter, GameAnalyzer, ReviewConfig, ReviewError, StoredAnalysis};

/// Split a multi-game PGN file on `[Event` headers that start a new game
fn split_games(text: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut in_moves = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("[Event ") && in_moves {
            games.push(std::mem::take(&mut current));
            in_moves = false;
        }
        if !trimmed.is_empty() && !trimmed.starts_with('[') {
            in_moves = true;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        games.push(current);
    }
    games
}

type GameResult = (String, Result<StoredAnalysis, ReviewError>);

/// Log one finished game; returns whether it was stored.
fn report(joined: Result<GameResult, JoinError>, cancel: &CancellationToken) -> bool {
    let (path, result) = match joined {
        Ok(done) => done,
        Err(e) => {
            error!(error = %e, "Analysis task panicked");
            return false;
        }
    };
    match result {
        Ok(stored) => {
            if let Some(ply) = stored.analysis.truncated_at {
                warn!(game_id = stored.game_id, ply, "Game replay stopped early");
            }
            if let Some(reason) = &stored.analysis.engine_failure {
                warn!(game_id = stored.game_id, reason = %reason, "Game only partially evaluated");
            }
            println!(
                "game {}: {} moves, white {:.1}%, black {:.1}%, {} poor moves categorized",
                stored.game_id,
                stored.analysis.moves.len(),
                stored.analysis.summary.white.accuracy,
                stored.analysis.summary.black.accuracy,
                stored.blunders_categorized,
            );
            true
        }
        Err(e @ ReviewError::EngineUnavailable(_)) => {
            error!(path = %path, error = %e, "Engine unavailable, stopping");
            cancel.cancel();
            false
        }
        Err(e) => {
            error!(path = %path, error = %e, "Game analysis failed");
            false
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let _ = dotenvy::dotenv();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: review-worker <game.pgn> [more.pgn ...]");
    }

    let config = ReviewConfig::from_env();
    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let arbiter = EngineArbiter::spawn(
        StockfishLauncher::new(config.stockfish_path.clone()),
        config.arbiter_queue_depth,
    );
    let analyzer = GameAnalyzer::from_config(arbiter.handle(), &config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, cancelling outstanding work");
            ctrl_c.cancel();
        }
    });

    // Games run concurrently and queue on the arbiter for engine time
    let semaphore = Arc::new(Semaphore::new(config.concurrent_games));
    let mut tasks = JoinSet::new();
    let mut stored = 0u32;
    let mut failed = 0u32;

    'files: for path in &paths {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(t) => t,
            Err(e) => {
                error!(path = %path, error = %e, "Cannot read PGN file");
                failed += 1;
                continue;
            }
        };

        for pgn in split_games(&text) {
            while let Some(joined) = tasks.try_join_next() {
                if report(joined, &cancel) {
                    stored += 1;
                } else {
                    failed += 1;
                }
            }
            if cancel.is_cancelled() {
                break 'files;
            }

            let permit = semaphore.clone().acquire_owned().await?;
            let analyzer = analyzer.clone();
            let pool = pool.clone();
            let cancel = cancel.clone();
            let path = path.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = analyzer.analyze_and_store(&pool, &pgn, &cancel).await;
                (path, result)
            });
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if report(joined, &cancel) {
            stored += 1;
        } else {
            failed += 1;
        }
    }

    arbiter.shutdown().await;
    info!(stored, failed, "Review worker finished");
    Ok(())
}
