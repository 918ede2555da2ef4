//! mathmap-server - knowledge-graph practice backend
//!
//! Configuration priority: command line → `MATHMAP_*` environment → TOML file → defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::Request, ServiceExt};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use mathmap_common::api::{load_signing_secret, TokenSigner};
use mathmap_common::config::{ConfigOverrides, ServiceConfig};
use mathmap_common::db::init_database;
use mathmap_server::ocr::{CompletionClient, OcrPipeline, TesseractCli};
use mathmap_server::{build_app, AppState};

/// Command-line arguments for mathmap-server
#[derive(Parser, Debug)]
#[command(name = "mathmap-server")]
#[command(about = "Knowledge-graph practice backend with OCR problem solving")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "MATHMAP_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "MATHMAP_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Address to listen on (host:port)
    #[arg(short, long, env = "MATHMAP_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Completion API key
    #[arg(long, env = "MATHMAP_LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Completion endpoint URL
    #[arg(long, env = "MATHMAP_LLM_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Completion request timeout in seconds
    #[arg(long, env = "MATHMAP_LLM_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Tesseract executable
    #[arg(long, env = "MATHMAP_TESSERACT_PATH")]
    tesseract_path: Option<PathBuf>,

    /// Tesseract language hint
    #[arg(long, env = "MATHMAP_OCR_LANGUAGE_HINT")]
    language_hint: Option<String>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        ConfigOverrides {
            config_file: args.config,
            database_path: args.database_path,
            bind_address: args.bind_address,
            api_key: args.api_key,
            endpoint_url: args.endpoint_url,
            timeout_secs: args.timeout_secs,
            tesseract_path: args.tesseract_path,
            language_hint: args.language_hint,
            jwt_secret: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    info!("Starting mathmap-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::resolve(Args::parse().into())
        .context("Failed to resolve configuration")?;
    info!("Database path: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    info!("✓ Database ready");

    let secret = match &config.auth.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            let secret = load_signing_secret(&pool)
                .await
                .context("Failed to load token signing secret")?;
            info!("✓ Loaded token signing secret from database");
            secret
        }
    };
    let tokens = TokenSigner::new(
        &secret,
        config.auth.access_token_ttl_secs,
        config.auth.refresh_token_ttl_secs,
    );

    let recognizer = TesseractCli::new(
        config.ocr.tesseract_path.clone(),
        config.ocr.language_hint.clone(),
    );
    let client = CompletionClient::new(&config.llm).context("Failed to build completion client")?;
    let ocr = OcrPipeline::new(Arc::new(recognizer), client);

    let state = AppState::new(pool, tokens, ocr);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("mathmap-server listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
