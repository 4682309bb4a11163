use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use repowatch::config::Config;
use repowatch::github::{GitHubClient, GitHubFeed};
use repowatch::ingest::IngestionEngine;
use repowatch::server::{StatsDefaults, StatsServer};
use repowatch::stats::Analyzer;
use repowatch::storage::open_store;

/// Monitor GitHub repository events and analyze activity intervals
#[derive(Parser)]
#[command(name = "repowatch")]
#[command(about = "Monitor GitHub repository events and analyze activity intervals", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent events for all active repositories
    Fetch {
        /// Maximum pages to fetch per repository
        #[arg(long)]
        pages: Option<u32>,

        /// Rolling window in days
        #[arg(long)]
        days: Option<i64>,

        /// Maximum stored events per repository and event type
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Print event statistics per repository and event type
    Stats {
        /// Restrict to a single repository by slug
        #[arg(long)]
        repo: Option<String>,

        /// Rolling window in days
        #[arg(long)]
        days: Option<i64>,

        /// Maximum events per repository and event type to consider
        #[arg(long)]
        limit: Option<u64>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Serve the statistics REST API
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage monitored repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Register a repository by full name (e.g. "octocat/Hello-World")
    Add {
        name: String,

        /// GitHub numeric repository id; resolved via the API when omitted
        #[arg(long)]
        id: Option<i64>,

        /// Register without activating
        #[arg(long)]
        inactive: bool,
    },
    /// List registered repositories
    List {
        /// Include inactive repositories
        #[arg(long)]
        all: bool,
    },
    /// Remove a repository by slug (rejected while events exist)
    Remove { slug: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("repowatch started with verbosity level: {}", cli.verbose);

    let result = run(cli).await;

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch { pages, days, limit } => run_fetch(&config, pages, days, limit).await,
        Commands::Stats {
            repo,
            days,
            limit,
            json,
        } => run_stats(&config, repo, days, limit, json).await,
        Commands::Serve { port } => run_serve(&config, port).await,
        Commands::Repo { command } => run_repo(&config, command).await,
    }
}

async fn run_fetch(
    config: &Config,
    pages: Option<u32>,
    days: Option<i64>,
    limit: Option<u64>,
) -> anyhow::Result<()> {
    let pages = pages.unwrap_or(config.fetch.page_limit);
    let days = days.unwrap_or(config.fetch.days);
    let limit = limit.unwrap_or(config.fetch.event_limit);
    if pages == 0 || days <= 0 || limit == 0 {
        anyhow::bail!("'pages', 'days' and 'limit' must be positive integers");
    }

    let store = open_store(&config.storage).await?;
    let client = Arc::new(GitHubClient::new(
        config.github.api_url.clone(),
        config.github.token.clone(),
    )?);
    let engine = IngestionEngine::new(client, store.clone());

    let repos = store.list_repositories(true).await?;
    if repos.is_empty() {
        println!("No active repositories found.");
        return Ok(());
    }

    let min_date = Utc::now() - Duration::days(days);
    let total = repos.len();
    let mut failures = 0;

    for (repo, result) in engine.ingest_all(&repos, pages, min_date, limit).await {
        match result {
            Ok(summary) => println!(
                "✓ {} new events saved for {}, {} known events across {} pages",
                summary.new_events, repo.name, summary.skipped_events, summary.pages_fetched
            ),
            Err(e) => {
                eprintln!("✗ {}: {e}", repo.name);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {total} repositories failed");
    }
    Ok(())
}

async fn run_stats(
    config: &Config,
    repo_slug: Option<String>,
    days: Option<i64>,
    limit: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let days = days.unwrap_or(config.fetch.days);
    let limit = limit.unwrap_or(config.fetch.event_limit);
    if days <= 0 || limit == 0 {
        anyhow::bail!("'days' and 'limit' must be positive integers");
    }

    let store = open_store(&config.storage).await?;
    let repo = match &repo_slug {
        Some(slug) => Some(
            store
                .get_repository(slug)
                .await?
                .ok_or_else(|| anyhow::anyhow!("repository '{slug}' not found"))?,
        ),
        None => None,
    };

    let entries = Analyzer::new(days, limit as usize)
        .stats(store.as_ref(), repo.as_ref())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No events in the selected window.");
    } else {
        for entry in &entries {
            println!(
                "{} {}: {} ({} events)",
                entry.repository,
                entry.event_type,
                entry.human_readable_interval,
                entry.event_count
            );
        }
    }
    Ok(())
}

async fn run_serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    let store = open_store(&config.storage).await?;
    let defaults = StatsDefaults {
        days: config.fetch.days,
        limit: config.fetch.event_limit as usize,
    };

    StatsServer::new(store, defaults, port).start().await
}

async fn run_repo(config: &Config, command: RepoCommands) -> anyhow::Result<()> {
    let store = open_store(&config.storage).await?;

    match command {
        RepoCommands::Add { name, id, inactive } => {
            let gh_repo_id = match id {
                Some(id) => id,
                None => {
                    let client = GitHubClient::new(
                        config.github.api_url.clone(),
                        config.github.token.clone(),
                    )?;
                    client.fetch_repository(&name).await?.id
                }
            };
            let repo = store.add_repository(&name, gh_repo_id, !inactive).await?;
            println!(
                "✓ registered {} as '{}' (GitHub id {})",
                repo.name, repo.slug, repo.gh_repo_id
            );
        }
        RepoCommands::List { all } => {
            let repos = store.list_repositories(!all).await?;
            if repos.is_empty() {
                println!("No repositories registered.");
            }
            for repo in repos {
                println!(
                    "{}  {}  id={}  {}",
                    repo.slug,
                    repo.name,
                    repo.gh_repo_id,
                    if repo.active { "active" } else { "inactive" }
                );
            }
        }
        RepoCommands::Remove { slug } => {
            store.remove_repository(&slug).await?;
            println!("✓ removed {slug}");
        }
    }
    Ok(())
}
