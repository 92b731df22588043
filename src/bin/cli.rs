//! Powderhound CLI
//!
//! Local execution entry point for resort and avalanche scrapes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use powderhound::{
    browser::FixtureSite,
    config,
    error::{AppError, Result},
    services::{ScrapeOrchestrator, TerrainStrategy},
    storage::PolicyDirectory,
};
#[cfg(feature = "chrome")]
use powderhound::{browser::ChromeLauncher, pipeline, storage::LocalStorage};

/// Powderhound - Ski Resort Conditions Scraper
#[derive(Parser, Debug)]
#[command(
    name = "powderhound",
    version,
    about = "Policy-driven ski resort conditions scraper"
)]
struct Cli {
    /// Path to storage directory containing config, policies and results
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration and every stored policy
    Validate,

    /// Run a policy against saved HTML and print the record
    Replay {
        /// Policy document
        policy: PathBuf,

        /// Saved conditions page, served at the policy's conditionsURL
        conditions_html: PathBuf,

        /// Saved terrain page, served at the policy's terrainURL
        #[arg(long)]
        terrain_html: Option<PathBuf>,
    },

    /// Scrape resorts with headless Chromium
    #[cfg(feature = "chrome")]
    Scrape {
        /// Mountain names (policy document names)
        names: Vec<String>,

        /// Scrape every stored policy
        #[arg(long, conflicts_with = "names")]
        all: bool,
    },

    /// Scrape avalanche forecasts for every mountain
    #[cfg(feature = "chrome")]
    Avalanche {
        /// Path to mountain coordinates (default: {storage_dir}/mountains.json)
        #[arg(long)]
        mountains: Option<PathBuf>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Arc::new(config::load_config(&config_path)?);
    let policies = PolicyDirectory::new(cli.storage_dir.join("policies"));

    log::debug!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Validate => {
            log::info!("Validating policies in {}...", policies.dir().display());

            let mut invalid = 0;
            for name in policies.names().await? {
                match policies.load(&name).await.and_then(|p| p.validate().map(|()| p)) {
                    Ok(policy) => {
                        log::info!("✓ {} ({})", name, TerrainStrategy::select(&policy));
                    }
                    Err(e) => {
                        invalid += 1;
                        log::error!("✗ {}: {}", name, e);
                    }
                }
            }

            if invalid > 0 {
                return Err(AppError::config(format!("{invalid} invalid policies")));
            }
            log::info!("All validations passed!");
        }

        Command::Replay {
            policy,
            conditions_html,
            terrain_html,
        } => {
            let policy = config::load_policy_file(&policy)?;
            let mut site = FixtureSite::new().page(
                policy.conditions_url.clone(),
                std::fs::read_to_string(&conditions_html)?,
            );
            if let Some(path) = terrain_html {
                site = site.page(policy.terrain_url.clone(), std::fs::read_to_string(&path)?);
            }

            let orchestrator = ScrapeOrchestrator::new(Arc::clone(&config), site);
            let record = orchestrator.run(&policy).await.map_err(|failure| {
                log::error!("{}", failure);
                failure.error
            })?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        #[cfg(feature = "chrome")]
        Command::Scrape { names, all } => {
            let selected = if all {
                policies.load_all().await?
            } else {
                if names.is_empty() {
                    return Err(AppError::config("Name at least one mountain or pass --all"));
                }
                let mut selected = Vec::with_capacity(names.len());
                for name in &names {
                    selected.push(policies.load(name).await?);
                }
                selected
            };

            let storage = LocalStorage::new(&cli.storage_dir);
            let launcher = ChromeLauncher::new(config.browser.clone());
            let orchestrator = ScrapeOrchestrator::new(Arc::clone(&config), launcher);
            let today = chrono::Utc::now().date_naive();

            let outcome =
                pipeline::run_resort_batch(&orchestrator, &storage, &selected, today).await;
            if !outcome.all_succeeded() {
                log::warn!(
                    "{} of {} resorts failed ({} retryable)",
                    outcome.failed,
                    outcome.total,
                    outcome.retryable
                );
            }
        }

        #[cfg(feature = "chrome")]
        Command::Avalanche { mountains } => {
            let path = mountains.unwrap_or_else(|| cli.storage_dir.join("mountains.json"));
            let mountains = config::load_mountains(&path)?;
            log::info!("Loaded {} mountains", mountains.len());

            let storage = LocalStorage::new(&cli.storage_dir);
            let launcher = ChromeLauncher::new(config.browser.clone());
            let orchestrator = ScrapeOrchestrator::new(Arc::clone(&config), launcher);

            let outcome = pipeline::run_avalanche_batch(&orchestrator, &storage, &mountains).await;
            if !outcome.all_succeeded() {
                log::warn!("{} of {} forecasts failed", outcome.failed, outcome.total);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
