//! claimcheck: verify the factual claims in a document
//!
//! # Subcommands
//! - `check <path> [--json] [--config <path>]`: run the pipeline locally
//! - `submit <path> [--json]`                 : upload to a running claimcheck server
//! - `status`                                 : show server health

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use claimcheck_core::{
    check_document, AutoLoader, ClaimcheckConfig, Credentials, ProgressSink, RunOutcome,
    Verdict, VerificationPipeline, VerificationReport, VerificationSummary,
};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const CLAIM_PREVIEW_CHARS: usize = 100;
const NO_CLAIMS_MESSAGE: &str = "No verifiable claims found in the document.";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "claimcheck",
    version,
    about = "Extract factual claims from a document and check them against web evidence"
)]
struct Cli {
    /// claimcheck HTTP server URL (overrides CLAIMCHECK_SERVER_URL env var)
    #[arg(long, env = "CLAIMCHECK_SERVER_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check a document locally, calling the upstream APIs directly
    Check {
        /// Document to check
        path: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Config file (defaults to an optional ./claimcheck.toml)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Upload a document to a running claimcheck server
    Submit {
        /// Document to check
        path: String,

        /// Print the server response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show claimcheck server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// Response body of POST /check
#[derive(Debug, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    pub message: Option<String>,
    pub extraction_error: Option<String>,
    pub preview: Option<String>,
    pub report: Option<VerificationReport>,
    pub error: Option<String>,
}

// ============================================================================
// Presentation
// ============================================================================

/// Prints progress to stderr so stdout stays clean for `--json`.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn on_claims_extracted(&self, count: usize) {
        if count > 0 {
            eprintln!("Found {} claims to verify", count);
        }
    }

    fn on_extraction_error(&self, message: &str) {
        eprintln!("Claim extraction failed: {}", message);
    }

    fn on_progress(&self, index: usize, total: usize) {
        eprint!("\rVerified claim {}/{}", index, total);
        if index == total {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    }
}

pub fn render_summary(summary: &VerificationSummary) -> String {
    let mut line = format!(
        "✅ Verified: {}   ⚠️ Inaccurate: {}   ❌ False: {}",
        summary.verified_count, summary.inaccurate_count, summary.false_count
    );
    if summary.error_count > 0 {
        line.push_str(&format!("   🔴 Error: {}", summary.error_count));
    }
    line
}

pub fn render_verdict(position: usize, verdict: &Verdict) -> String {
    let mut out = format!(
        "{}. {} {}: {}\n   {}\n",
        position,
        verdict.status.marker(),
        verdict.status,
        verdict.claim.preview(CLAIM_PREVIEW_CHARS),
        verdict.explanation
    );
    if !verdict.sources.is_empty() {
        out.push_str("   Sources:\n");
        for source in &verdict.sources {
            out.push_str(&format!("   - {}\n", source));
        }
    }
    out
}

pub fn render_report(report: &VerificationReport) -> String {
    let mut out = format!(
        "Run {} ({} claims)\n{}\n\n",
        report.run_id,
        report.summary.total,
        render_summary(&report.summary)
    );
    for (i, verdict) in report.verdicts.iter().enumerate() {
        out.push_str(&render_verdict(i + 1, verdict));
        out.push('\n');
    }
    out
}

fn print_preview(preview: &str) {
    if !preview.is_empty() {
        println!("Document preview:\n{}\n", preview);
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn extraction_error(outcome: &RunOutcome) -> Option<&str> {
    match outcome {
        RunOutcome::NoClaims {
            extraction_error, ..
        } => extraction_error.as_deref(),
        RunOutcome::Verified(_) => None,
    }
}

fn file_name(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

// ============================================================================
// Local run
// ============================================================================

fn do_check(path: &str, json_output: bool, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = ClaimcheckConfig::load(config_path)?;

    // Console output is the progress channel; keep logs quiet unless asked
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let credentials = Credentials::resolve(&config)?;
    let pipeline = VerificationPipeline::connect(&config, &credentials)?;

    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path, e))?;

    let runtime = tokio::runtime::Runtime::new()?;
    let check = runtime.block_on(check_document(
        &pipeline,
        Arc::new(AutoLoader),
        &bytes,
        file_name(path).as_deref(),
        &ConsoleSink,
    ))?;

    match check.outcome.report() {
        Some(report) if json_output => print_json(report)?,
        Some(report) => {
            print_preview(&check.preview);
            print!("{}", render_report(report));
        }
        None if json_output => print_json(&serde_json::json!({
            "status": "no_claims",
            "run_id": check.outcome.run_id(),
            "message": NO_CLAIMS_MESSAGE,
            "extraction_error": extraction_error(&check.outcome),
        }))?,
        None => {
            print_preview(&check.preview);
            println!("{}", NO_CLAIMS_MESSAGE);
        }
    }

    Ok(())
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

/// Upload a document to POST /check and display the result.
fn do_submit(server: &str, path: &str, json_output: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path, e))?;

    // Verification runs one claim at a time on the server side
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(600))
        .build()?;

    let url = format!("{}/check", server);
    let mut request = client.post(&url).body(bytes);
    if let Some(name) = file_name(path) {
        request = request.query(&[("name", name)]);
    }

    eprintln!("Submitting {} to {}", path, server);
    let resp = match request.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("claimcheck: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body: serde_json::Value = match resp.json() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("claimcheck: failed to parse response (HTTP {}): {}", status, e);
            std::process::exit(1);
        }
    };

    if json_output {
        print_json(&body)?;
        if !status.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let parsed: CheckResponse = serde_json::from_value(body)?;
    if !status.is_success() {
        eprintln!(
            "claimcheck: server returned {}: {}",
            status,
            parsed.error.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    if let Some(preview) = &parsed.preview {
        print_preview(preview);
    }
    match &parsed.report {
        Some(report) => print!("{}", render_report(report)),
        None => {
            if let Some(cause) = &parsed.extraction_error {
                eprintln!("Claim extraction failed: {}", cause);
            }
            println!("{}", parsed.message.as_deref().unwrap_or(NO_CLAIMS_MESSAGE));
        }
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("claimcheck server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:           {}", body["version"].as_str().unwrap_or("?"));
            println!("Model:             {}", body["model"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            eprintln!("claimcheck: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("claimcheck: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Check { path, json, config } => do_check(&path, json, config.as_deref()),
        Commands::Submit { path, json } => do_submit(&server, &path, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("claimcheck: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
