use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pipeline::{load_sites, PipelineConfig, PipelineRunner, Site};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "site-pipeline")]
#[command(about = "Crawl configured websites and summarize their content")]
struct Cli {
    /// Root directory for raw, extracted, processed and metrics artifacts
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// YAML file with the `websites` list
    #[arg(long, global = true)]
    sites: Option<PathBuf>,

    /// Pin the run timestamp (RFC 3339), e.g. to re-run a past day
    #[arg(long, global = true)]
    run_at: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl, extract and transform every site, then aggregate
    Run,

    /// Crawl one site
    Crawl {
        #[arg(long)]
        url: String,
    },

    /// Extract sections from one site's raw pages
    Extract {
        #[arg(long)]
        url: String,
    },

    /// Turn one site's sections into records
    Transform {
        #[arg(long)]
        url: String,
    },

    /// Summarize the records of every configured site
    Aggregate,

    /// Print the last stored summary
    Summary,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeline=info,crawler=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(file) = cli.sites {
        config = config.with_sites_file(file);
    }
    let run_at = cli.run_at.unwrap_or_else(Utc::now);

    let runner = PipelineRunner::from_config(&config).context("Failed to set up pipeline")?;

    match cli.command {
        Commands::Run => {
            let sites = load_sites(&config.sites_file)
                .with_context(|| format!("Failed to load {}", config.sites_file.display()))?;
            let report = runner.run(&sites, run_at).await;
            print_json(&report)?;
        }
        Commands::Crawl { url } => {
            let site = Site::parse(&url)?;
            print_json(&runner.crawl(&site, run_at).await)?;
        }
        Commands::Extract { url } => {
            let site = Site::parse(&url)?;
            print_json(&runner.extract(&site, run_at).await)?;
        }
        Commands::Transform { url } => {
            let site = Site::parse(&url)?;
            print_json(&runner.transform(&site, run_at).await)?;
        }
        Commands::Aggregate => {
            let sites = load_sites(&config.sites_file)
                .with_context(|| format!("Failed to load {}", config.sites_file.display()))?;
            print_json(&runner.aggregate(&sites, run_at).await)?;
        }
        Commands::Summary => match runner.store().load_summary()? {
            Some(summary) => print_json(&summary)?,
            None => anyhow::bail!(
                "No summary found under {}; run the pipeline first",
                config.data_dir.display()
            ),
        },
    }

    Ok(())
}
