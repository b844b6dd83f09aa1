//! `parley` — conversational-interview relay CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use parley_core::SessionId;
use parley_llm::{CompletionProvider, OpenAiConfig, OpenAiProvider};
use parley_server::{ParleyServer, ServerConfig, SessionDefaults};
use parley_settings::{load_settings, load_settings_from_path, ParleySettings};
use parley_sheets::{
    MemorySink, ServiceAccountKey, SheetsConfig, SheetsSink, TranscriptRow, TranscriptSink,
};

#[derive(Parser)]
#[command(name = "parley", about = "Conversational-interview relay", version)]
struct Cli {
    /// Settings file path (default: ~/.parley/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interview relay server.
    Serve {
        /// Override the bind host.
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Verify spreadsheet access with the configured credentials.
    CheckSheet {
        /// Also append a probe row (verifies write access).
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => load_settings().context("loading settings")?,
    };

    match cli.command {
        Command::Serve { host, port } => serve(settings, host, port).await,
        Command::CheckSheet { write } => check_sheet(&settings, write).await,
    }
}

/// `PARLEY_LOG`-filtered tracing, `info` by default.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("PARLEY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(
    settings: ParleySettings,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let provider = build_provider(&settings)?;
    let sink = build_sink(&settings)?;

    let config = ServerConfig {
        host: host.unwrap_or_else(|| settings.server.host.clone()),
        port: port.unwrap_or(settings.server.port),
        allowed_origin: settings.server.allowed_origin.clone(),
        max_concurrent_sessions: settings.server.max_concurrent_sessions,
    };
    let defaults = SessionDefaults {
        system_prompt: settings.interview.system_prompt.clone(),
        greeting: settings.interview.greeting.clone(),
        max_turns: settings.interview.max_turns,
        streaming: settings.gateway.streaming,
        default_params: settings.interview.default_params.clone(),
    };

    if config.allowed_origin.is_none() {
        warn!("no allowed origin configured; cross-origin host pages will be rejected");
    }

    let server = ParleyServer::new(config, defaults, provider, sink);

    let shutdown = server.shutdown().clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.shutdown();
        }
    });

    server.run().await.context("server error")
}

async fn check_sheet(settings: &ParleySettings, write: bool) -> anyhow::Result<()> {
    let sink = build_sheets_sink(settings)?;

    sink.probe().await.context("spreadsheet probe failed")?;
    info!(
        spreadsheet_id = %settings.sheets.spreadsheet_id,
        "spreadsheet reachable with the configured credentials"
    );

    if write {
        let row = TranscriptRow::new(SessionId::new(), "connectivity probe");
        sink.append_row(&row)
            .await
            .context("probe row append failed")?;
        info!("probe row appended");
    }
    Ok(())
}

/// Gateway from settings, resolving the API key through its env var.
fn build_provider(settings: &ParleySettings) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let api_key = std::env::var(&settings.gateway.api_key_env).with_context(|| {
        format!(
            "completion API key not found in ${}",
            settings.gateway.api_key_env
        )
    })?;

    let config = OpenAiConfig {
        base_url: settings.gateway.base_url.clone(),
        model: settings.gateway.model.clone(),
        api_key,
        temperature: settings.gateway.temperature,
        max_tokens: settings.gateway.max_tokens,
        timeout_ms: settings.gateway.timeout_ms,
    };
    Ok(Arc::new(OpenAiProvider::new(config)))
}

/// Sink from settings: the sheets client when enabled, otherwise an
/// in-memory sink (useful for local runs and demos).
fn build_sink(settings: &ParleySettings) -> anyhow::Result<Arc<dyn TranscriptSink>> {
    if !settings.sheets.enabled {
        info!("sheets persistence disabled; transcripts stay in memory");
        return Ok(Arc::new(MemorySink::new()));
    }
    Ok(Arc::new(build_sheets_sink(settings)?))
}

fn build_sheets_sink(settings: &ParleySettings) -> anyhow::Result<SheetsSink> {
    anyhow::ensure!(
        !settings.sheets.spreadsheet_id.is_empty(),
        "sheets.spreadsheetId is not configured"
    );

    let key_path = PathBuf::from(&settings.sheets.credentials_path);
    let key = ServiceAccountKey::from_file(&key_path)
        .with_context(|| format!("loading service account key from {}", key_path.display()))?;

    let config = SheetsConfig {
        base_url: settings.sheets.base_url.clone(),
        spreadsheet_id: settings.sheets.spreadsheet_id.clone(),
        range: settings.sheets.range.clone(),
        max_attempts: settings.sheets.max_attempts,
        retry: settings.retry.clone(),
    };
    Ok(SheetsSink::new(
        config,
        key,
        settings.sheets.token_uri.clone(),
    ))
}
