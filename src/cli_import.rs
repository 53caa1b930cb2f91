use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodreel_server::catalog_loader::load_catalog_file;
use moodreel_server::catalog_store::{CatalogStore, SqliteCatalogStore};
use moodreel_server::emotion::Emotion;

/// How many problems are printed before the rest are only counted.
const MAX_PRINTED_PROBLEMS: usize = 20;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Loads a movie metadata CSV into the catalog database.
#[derive(Parser, Debug)]
struct CliArgs {
    /// CSV export with a header row (TMDB/IMDb style column names are recognized).
    #[clap(value_parser = parse_path)]
    pub csv_path: PathBuf,

    /// Directory holding catalog.db, created on first import.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    std::fs::create_dir_all(&cli_args.db_dir)
        .with_context(|| format!("Failed to create {:?}", cli_args.db_dir))?;
    let catalog_db_path = cli_args.db_dir.join("catalog.db");
    info!("Opening SQLite catalog database at {:?}...", catalog_db_path);
    let store = SqliteCatalogStore::new(&catalog_db_path, 1)?;

    let report = load_catalog_file(&cli_args.csv_path, &store)
        .with_context(|| format!("Failed to import {:?}", cli_args.csv_path))?;

    println!(
        "Read {} rows: {} upserted, {} skipped.",
        report.rows_read, report.upserted, report.skipped
    );
    if !report.problems.is_empty() {
        println!("{} problems:", report.problems.len());
        for problem in report.problems.iter().take(MAX_PRINTED_PROBLEMS) {
            println!("  row {}: {}", problem.row, problem.message);
        }
        if report.problems.len() > MAX_PRINTED_PROBLEMS {
            println!("  ...and {} more", report.problems.len() - MAX_PRINTED_PROBLEMS);
        }
    }

    println!("Catalog now holds {} movies.", store.get_movies_count());
    let counts = store.get_emotion_tag_counts()?;
    for count in &counts {
        println!("  {:<10} {}", count.emotion.as_str(), count.movie_count);
    }
    let untagged: Vec<Emotion> = counts
        .iter()
        .filter(|c| c.movie_count == 0)
        .map(|c| c.emotion)
        .collect();
    if !untagged.is_empty() {
        warn!(
            "No movies tagged {:?}, those emotions will get random picks",
            untagged
        );
    }

    Ok(())
}
