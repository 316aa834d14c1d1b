//! BGL - biological graph bulk loader

mod executors;

use anyhow::Result;
use bgl_common::logging::{init_logging, LogConfig, LogLevel};
use bgl_engine::{PoolConfig, RetryPolicy, WorkerPool};
use bgl_ingest::config::LoadConfig;
use bgl_ingest::{download, runner};
use clap::{Parser, Subcommand};
use executors::{CypherShellExecutor, DryRunExecutor};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "bgl")]
#[command(author, version, about = "Biological graph bulk loader")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full load described by a manifest
    Load {
        /// Load manifest (YAML)
        #[arg(short, long, default_value = "bgl.yaml")]
        config: PathBuf,

        /// Stage and log, but execute nothing
        #[arg(long)]
        dry_run: bool,

        /// Database address for cypher-shell
        #[arg(long, env = "BGL_DB_ADDRESS", default_value = "neo4j://localhost:7687")]
        address: String,

        #[arg(long, env = "BGL_DB_USERNAME")]
        username: Option<String>,

        #[arg(long, env = "BGL_DB_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Override the manifest's worker count
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Download every configured remote source into the data directory
    Fetch {
        #[arg(short, long, default_value = "bgl.yaml")]
        config: PathBuf,
    },

    /// Check a manifest without staging or loading anything
    ValidateConfig {
        #[arg(short, long, default_value = "bgl.yaml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_level(log_level)
        .with_file_prefix("bgl");
    init_logging(&log_config)?;

    match cli.command {
        Command::Load {
            config,
            dry_run,
            address,
            username,
            password,
            workers,
        } => cmd_load(&config, dry_run, address, username, password, workers),
        Command::Fetch { config } => cmd_fetch(&config),
        Command::ValidateConfig { config } => cmd_validate(&config),
    }
}

fn cmd_load(
    config_path: &PathBuf,
    dry_run: bool,
    address: String,
    username: Option<String>,
    password: Option<String>,
    workers: Option<usize>,
) -> Result<()> {
    let config = LoadConfig::from_file(config_path)?;
    let pool_config = pool_config(&config, workers);

    info!(
        config = %config_path.display(),
        providers = config.providers.len(),
        ontologies = config.ontologies.len(),
        dry_run,
        "starting load"
    );

    let pool = if dry_run {
        WorkerPool::start(pool_config, DryRunExecutor::default())?
    } else {
        let executor = CypherShellExecutor::new(address).with_credentials(username, password);
        WorkerPool::start(pool_config, executor)?
    };

    let report = runner::run_load(&config, &pool)?;
    let dead = pool.drain_dead_letters();
    pool.shutdown();

    for letter in &dead {
        error!(
            job = %letter.job.describe(),
            attempts = letter.attempts,
            error = %letter.error,
            "job never committed"
        );
    }
    if !dead.is_empty() {
        anyhow::bail!("{} job(s) dead-lettered; see log for details", dead.len());
    }

    info!(
        committed = report.summary.committed,
        relations = report.relations.len(),
        "load finished"
    );
    // staged CSVs are left in the staging dir on purpose: they are the
    // cheapest artifact for debugging a bad load
    Ok(())
}

fn cmd_fetch(config_path: &PathBuf) -> Result<()> {
    let config = LoadConfig::from_file(config_path)?;
    let data_dir = &config.settings.data_dir;

    for ontology in &config.ontologies {
        if ontology.source.url.is_some() {
            let path = download::ensure_local(&ontology.source, &ontology.name, data_dir)?;
            info!(ontology = %ontology.name, path = %path.display(), "fetched");
        }
    }
    for provider in &config.providers {
        for (datatype, source) in [
            ("genes", &provider.genes),
            ("alleles", &provider.alleles),
            ("disease", &provider.disease),
            ("orthology", &provider.orthology),
        ] {
            if let Some(source) = source {
                if source.url.is_some() {
                    let path = download::ensure_local(source, datatype, data_dir)?;
                    info!(
                        provider = %provider.name,
                        datatype,
                        path = %path.display(),
                        "fetched"
                    );
                }
            }
        }
    }
    Ok(())
}

fn cmd_validate(config_path: &PathBuf) -> Result<()> {
    let config = LoadConfig::from_file(config_path)?;
    match config.validate() {
        Ok(()) => {
            info!(
                providers = config.providers.len(),
                ontologies = config.ontologies.len(),
                "manifest is valid"
            );
            Ok(())
        }
        Err(problems) => {
            for problem in &problems {
                warn!(%problem, "manifest problem");
            }
            anyhow::bail!("manifest has {} problem(s)", problems.len())
        }
    }
}

fn pool_config(config: &LoadConfig, workers_override: Option<usize>) -> PoolConfig {
    PoolConfig {
        workers: workers_override.unwrap_or(config.settings.workers),
        queue_capacity: config.settings.queue_capacity,
        retry: RetryPolicy {
            max_attempts: config.settings.max_attempts,
            ..RetryPolicy::default()
        },
        ..PoolConfig::default()
    }
}
