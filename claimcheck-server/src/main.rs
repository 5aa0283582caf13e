use std::sync::Arc;

use clap::Parser;
use claimcheck_core::{AutoLoader, ClaimcheckConfig, Credentials, VerificationPipeline};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use claimcheck_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to an optional ./claimcheck.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Resolve credentials and exit
    #[arg(long)]
    check_credentials: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (local runs)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match ClaimcheckConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Credentials are required before any upstream call is attempted
    let credentials = match Credentials::resolve(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if args.check_credentials {
        println!("✅ Credentials resolved for completion and search APIs");
        return Ok(());
    }

    let pipeline = match VerificationPipeline::connect(&config, &credentials) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to build upstream clients: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        model = %config.llm.model,
        concurrency = config.verification.concurrency,
        "Verification pipeline ready"
    );

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(HttpState {
        pipeline: Arc::new(pipeline),
        loader: Arc::new(AutoLoader),
        config,
    });

    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
