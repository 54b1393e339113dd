// crates/arre-cli/src/main.rs
// ============================================================================
// Module: ARRE CLI Entry Point
// Description: Command dispatcher for running and operating the ARRE server.
// Purpose: Give operators one binary to start the server and to read or
//          mutate its admin-settings flags without a separate HTTP client.
// Dependencies: clap, arre-core, arre-server, reqwest, tokio, tracing.
// ============================================================================

//! ## Overview
//! `serve` loads configuration (see `arre_server::config::CONFIG_ENV_VAR`)
//! and runs the HTTP server in the foreground. `set-flags`, `get-flags`,
//! and `stats` are thin `reqwest` clients against a running server's admin
//! endpoints, for operators who would otherwise reach for `curl`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;

// ============================================================================
// SECTION: CLI Surface
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "arre", about = "Alert Routing and Response Engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the HTTP server in the foreground until interrupted.
    Serve,
    /// Reads the current `incident_response_mode` from a running server.
    GetFlags {
        /// Base URL of the running server, e.g. `http://127.0.0.1:8080`.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        base_url: String,
        /// Bearer token, when the server is configured to require one.
        #[arg(long, env = "ARRE_TOKEN")]
        token: Option<String>,
    },
    /// Sets `incident_response_mode` on a running server. Requires an
    /// admin credential.
    SetFlags {
        /// Base URL of the running server.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        base_url: String,
        /// Bearer token for the admin principal.
        #[arg(long, env = "ARRE_TOKEN")]
        token: Option<String>,
        /// New mode: `deterministic`, `ai_selected`, or `autonomous`.
        #[arg(long)]
        mode: String,
    },
    /// Prints aggregate alert counts by selection mode.
    Stats {
        /// Base URL of the running server.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        base_url: String,
        /// Bearer token, when the server is configured to require one.
        #[arg(long, env = "ARRE_TOKEN")]
        token: Option<String>,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "arre command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve => {
            let config = arre_server::ServerConfig::load()?;
            arre_server::run(config).await
        }
        Command::GetFlags { base_url, token } => get_flags(&base_url, token.as_deref()),
        Command::SetFlags { base_url, token, mode } => set_flags(&base_url, token.as_deref(), &mode),
        Command::Stats { base_url, token } => stats(&base_url, token.as_deref()),
    }
}

// ============================================================================
// SECTION: Admin HTTP Client
// ============================================================================

fn admin_client(token: Option<&str>) -> anyhow::Result<reqwest::blocking::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = token {
        let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))?;
        headers.insert(reqwest::header::AUTHORIZATION, value);
    }
    Ok(reqwest::blocking::Client::builder().timeout(Duration::from_secs(10)).default_headers(headers).build()?)
}

fn get_flags(base_url: &str, token: Option<&str>) -> anyhow::Result<()> {
    let client = admin_client(token)?;
    let response = client.get(format!("{base_url}/getAdminSettingsFlags")).send()?.error_for_status()?;
    println!("{}", response.text()?);
    Ok(())
}

fn set_flags(base_url: &str, token: Option<&str>, mode: &str) -> anyhow::Result<()> {
    mode.parse::<arre_core::IncidentResponseMode>()
        .map_err(|_| anyhow::anyhow!("'{mode}' is not a valid incident_response_mode (deterministic, ai_selected, autonomous)"))?;

    let client = admin_client(token)?;
    let response = client
        .post(format!("{base_url}/setFlags"))
        .json(&serde_json::json!({ "incident_response_mode": mode }))
        .send()?
        .error_for_status()?;
    println!("{}", response.text()?);
    Ok(())
}

fn stats(base_url: &str, token: Option<&str>) -> anyhow::Result<()> {
    let client = admin_client(token)?;
    let response = client.get(format!("{base_url}/alerts/stats")).send()?.error_for_status()?;
    println!("{}", response.text()?);
    Ok(())
}
