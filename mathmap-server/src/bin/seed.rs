//! mathmap-seed - populate or reset the mathmap database

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use mathmap_common::config::{ConfigOverrides, ServiceConfig};
use mathmap_common::db::init_database;
use mathmap_server::seed;

#[derive(Parser, Debug)]
#[command(name = "mathmap-seed")]
#[command(about = "Seed or reset the mathmap database")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "MATHMAP_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "MATHMAP_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the knowledge graph with the quadratic-equation concept map
    InitKnowledgeMap,
    /// Create the test user, nodes, links, questions and progress row
    CreateTestData,
    /// Delete practice history, questions, links and nodes (users are kept)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = ServiceConfig::resolve(ConfigOverrides {
        config_file: args.config,
        database_path: args.database_path,
        ..Default::default()
    })
    .context("Failed to resolve configuration")?;

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::InitKnowledgeMap => {
            let report = seed::init_knowledge_map(&pool).await?;
            info!(
                "✓ Knowledge map initialized: {} nodes, {} links",
                report.nodes, report.links
            );
        }
        Command::CreateTestData => {
            let report = seed::create_test_data(&pool).await?;
            info!(
                "✓ Test data ready: {} users, {} nodes, {} links, {} questions created",
                report.users, report.nodes, report.links, report.questions
            );
        }
        Command::Reset => {
            seed::reset(&pool).await?;
            info!("✓ Knowledge data reset (users kept)");
        }
    }

    pool.close().await;
    Ok(())
}
