use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use scraper::Html;
use std::path::PathBuf;
use tender_scraper::config::load_config;
use tender_scraper::detail::DetailParser;
use tender_scraper::harness::{HarnessOptions, run_harness};
use tender_scraper::listing::{ListingEntry, ListingParser};
use tender_scraper::navigate::open_navigator;
use tender_scraper::notify::spawn_dispatcher;
use tender_scraper::pipeline::{RunOptions, execute_run};
use tender_scraper::store::{JsonStore, TenderStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tender-scraper", about = "Tender portal extraction pipeline")]
struct Cli {
    #[arg(long, default_value = "configs/scraper.toml")]
    config: PathBuf,

    /// Overrides `store.path` from the config file.
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one scrape run.
    Run,
    ParseListing {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        base_url: Option<String>,
    },
    ParseDetail {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        url: String,
    },
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    Validate,
    Harness {
        #[arg(long)]
        snapshot_dir: PathBuf,
        #[arg(long, default_value = "data/state/harness.json")]
        state_path: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }

    match cli.command {
        Commands::Run => {
            let mut store = JsonStore::open(&config.store.path)?;
            let (events, dispatcher) = spawn_dispatcher(&config.notify)?;
            let options = RunOptions::from_config(&config);

            let result = execute_run(
                &options,
                || open_navigator(&config.portal, &config.browser),
                &mut store,
                &events,
            );

            drop(events);
            if dispatcher.join().is_err() {
                warn!("notification thread panicked");
            }

            let summary = result?;
            info!(
                found = summary.tenders_found,
                new = summary.tenders_new,
                updated = summary.tenders_updated,
                "scrape run summary"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::ParseListing { file, base_url } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let base_url = base_url.unwrap_or_else(|| config.portal.listing_url.clone());
            let parser = ListingParser::new(&config.portal.row_selector, &base_url)?;
            let doc = Html::parse_document(&html);

            let mut found = 0usize;
            for entry in parser.rows(&doc) {
                found += 1;
                if let ListingEntry::Tender(row) = entry {
                    println!("{}", serde_json::to_string(&row)?);
                }
            }
            info!(found, "listing parsed");
        }
        Commands::ParseDetail { file, url } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let document = DetailParser::new()?.parse(&html, &url, Utc::now());
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Runs { limit } => {
            let store = JsonStore::open(&config.store.path)?;
            let runs = store.runs()?;
            for run in runs.iter().rev().take(limit) {
                println!("{}", serde_json::to_string(run)?);
            }
        }
        Commands::Validate => {
            println!("OK: {}", cli.config.display());
        }
        Commands::Harness {
            snapshot_dir,
            state_path,
        } => {
            let report = run_harness(&HarnessOptions {
                snapshot_dir,
                state_path,
                run: RunOptions::from_config(&config),
            })?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}
