//! Bulgarian voice coach server entry point

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bgcoach_coach::{build_provider, CoachComposer};
use bgcoach_config::Settings;
use bgcoach_content::ContentStore;
use bgcoach_pipeline::{AsrEngine, TtsEngine};
use bgcoach_server::{create_router, AppState};

/// Exit codes: 0 success, 2 configuration error, 3 content error,
/// 70 internal error.
const EXIT_CONFIG: u8 = 2;
const EXIT_CONTENT: u8 = 3;
const EXIT_INTERNAL: u8 = 70;

#[derive(Parser)]
#[command(name = "bgcoach", about = "Real-time voice coach for learners of Bulgarian")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(long)]
        port: Option<u16>,

        /// ASR worker pool size (default: physical cores)
        #[arg(long)]
        workers: Option<usize>,

        /// Log level (trace|debug|info|warn|error)
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Validate the content files and exit
    CheckContent,
    /// Print the version and exit
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("bgcoach {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Command::CheckContent => check_content(),
        Command::Serve {
            host,
            port,
            workers,
            log_level,
        } => serve(host, port, workers, log_level).await,
    }
}

fn check_content() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match ContentStore::load(&settings.content.dir) {
        Ok(store) => {
            println!(
                "content OK: {} grammar items, {} scenarios (version {})",
                store.item_count(),
                store.scenario_count(),
                store.version()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("content error: {e}");
            ExitCode::from(EXIT_CONTENT)
        }
    }
}

async fn serve(
    host: Option<String>,
    port: Option<u16>,
    workers: Option<usize>,
    log_level: Option<String>,
) -> ExitCode {
    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // CLI flags take precedence over the environment.
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(workers) = workers {
        settings.server.workers = workers;
    }
    if let Some(level) = log_level {
        settings.server.log_level = level;
    }
    if let Err(e) = settings.validate() {
        eprintln!("configuration error: {e}");
        return ExitCode::from(EXIT_CONFIG);
    }

    init_tracing(&settings);
    tracing::info!("starting bgcoach v{}", env!("CARGO_PKG_VERSION"));

    if bgcoach_server::metrics::init_metrics().is_some() {
        tracing::info!("Prometheus metrics at /metrics");
    }

    // Content failures are fatal: refuse to serve degraded lookups.
    let content = match ContentStore::load(&settings.content.dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(dir = %settings.content.dir, error = %e, "content load failed");
            return ExitCode::from(EXIT_CONTENT);
        }
    };

    let workers = resolve_workers(settings.server.workers);
    tracing::info!(workers, "ASR worker pool sized");

    let asr = Arc::new(AsrEngine::new(settings.asr.clone(), workers));
    if !asr.is_available() {
        tracing::warn!("ASR model unavailable; /health will report fail");
    }
    let tts = Arc::new(TtsEngine::new(settings.tts.clone()));
    let provider = build_provider(&settings.llm);
    tracing::info!(provider = provider.name(), "chat provider selected");
    let composer = Arc::new(CoachComposer::new(
        provider,
        content.clone(),
        settings.llm.clone(),
    ));

    let addr: SocketAddr = match format!("{}:{}", settings.server.host, settings.server.port).parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("configuration error: invalid bind address: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let state = AppState::new(settings, content, asr, tts, composer);
    let app = create_router(state);

    tracing::info!(%addr, "listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "cannot bind");
            return ExitCode::from(EXIT_INTERNAL);
        }
    };

    match axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        Ok(()) => {
            tracing::info!("server shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}

fn resolve_workers(configured: usize) -> usize {
    if configured > 0 {
        configured
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bgcoach={level},tower_http={level}",
            level = settings.server.log_level
        ))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "cannot install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
