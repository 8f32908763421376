//! Categorize stored poor moves that have no blunder detail yet.
//!
//! Safe to rerun: existing details are never touched. No Stockfish needed,
//! stored evaluations are reused.
//!
//! Usage:
//!   cargo run -p review-worker --bin backfill-blunders -- [--limit N] [--dry-run]
//!
//! Set DATABASE_URL env var or use .env file.

use review_worker::{db, BackfillOptions, Categorizer, Reconciler, ReviewConfig};

fn parse_args() -> anyhow::Result<BackfillOptions> {
    let mut options = BackfillOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dry-run" => options.dry_run = true,
            "--limit" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--limit needs a value"))?;
                options.limit = Some(value.parse()?);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(options)
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

    let options = parse_args()?;
    let config = ReviewConfig::from_env();
    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let reconciler = Reconciler::new(pool, Categorizer::new(config.opening_ply_threshold));
    let summary = reconciler.run(options).await?;

    let mode = if options.dry_run { " (dry run)" } else { "" };
    println!("Backfill complete{mode}");
    println!("  games processed:   {}", summary.games_processed);
    println!("  blunders:          {}", summary.blunders_categorized);
    println!("  mistakes:          {}", summary.mistakes_categorized);
    println!("  inaccuracies:      {}", summary.inaccuracies_categorized);
    println!("  skipped existing:  {}", summary.skipped_existing);
    println!("  errors:            {}", summary.errors);
    Ok(())
}
