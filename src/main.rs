#![forbid(unsafe_code)]

//! `agent-duet`: two-agent conversation session launcher.
//!
//! Loads configuration and credentials, then hands off to the session
//! lifecycle controller: provision a room, serve and open the viewer, launch
//! both agents, and tear everything down when the time budget ends or the
//! operator interrupts.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agent_duet::config::{self, GlobalConfig};
use agent_duet::orchestrator::lifecycle;
use agent_duet::viewer::launch::{BrowserLauncher, NoBrowser, SystemBrowser};
use agent_duet::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-duet", about = "Two-agent conversation session launcher", version, long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Environment file loaded before configuration; its values override the shell.
    #[arg(long, default_value = ".env.local")]
    env_file: PathBuf,

    /// Session duration in seconds; zero or negative runs until both agents exit.
    #[arg(long, allow_hyphen_values = true)]
    duration: Option<i64>,

    /// Conversation topic.
    #[arg(long)]
    topic: Option<String>,

    /// Viewer asset server port.
    #[arg(long)]
    port: Option<u16>,

    /// Directory served to the viewer.
    #[arg(long)]
    viewer_root: Option<PathBuf>,

    /// Do not open a browser; only log the viewer URL.
    #[arg(long)]
    no_browser: bool,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::from(err.exit_code());
    }
    info!("agent-duet bootstrap");

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "agent-duet exiting with error");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    config::load_dotenv(&args.env_file);

    let mut config = match args.config {
        Some(ref path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    config.apply_env_overrides()?;
    apply_cli_overrides(&mut config, &args);
    config.load_credentials().await?;

    let config = Arc::new(config);
    info!(
        topic = %config.session.topic,
        duration_seconds = config.session.duration_seconds,
        port = config.viewer.port,
        "configuration loaded"
    );

    let browser: Arc<dyn BrowserLauncher> = if config.viewer.open_browser {
        Arc::new(SystemBrowser)
    } else {
        Arc::new(NoBrowser)
    };

    // ── Operator interrupt → cooperative cancellation ──
    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    let signal_handle = tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => {
                info!("shutdown signal received");
                signal_ct.cancel();
            }
            () = signal_ct.cancelled() => {}
        }
    });

    let outcome = lifecycle::run_daily_session(config, browser, &ct).await;

    ct.cancel();
    let _ = signal_handle.await;

    let outcome = outcome?;
    info!(?outcome, "agent-duet shut down");
    Ok(())
}

fn apply_cli_overrides(config: &mut GlobalConfig, args: &Cli) {
    if let Some(duration) = args.duration {
        config.session.duration_seconds = duration;
    }
    if let Some(topic) = args.topic.as_ref().filter(|t| !t.trim().is_empty()) {
        config.session.topic.clone_from(topic);
    }
    if let Some(port) = args.port {
        config.viewer.port = port;
    }
    if let Some(ref root) = args.viewer_root {
        config.viewer.root.clone_from(root);
    }
    if args.no_browser {
        config.viewer.open_browser = false;
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
