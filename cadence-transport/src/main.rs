//! Cadence Transport - Main entry point
//!
//! Headless transport session: loads configuration, restores the persisted
//! session, plays items on the built-in clock engine and takes commands from
//! stdin. The session is suspended and persisted on exit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cadence_transport::config::TomlConfig;
use cadence_transport::console::{self, ConsoleCommand};
use cadence_transport::db::SqliteSnapshotStore;
use cadence_transport::engine::{self, ClockEngine};
use cadence_transport::playback::{MediaItem, Playlist, TransportController};
use cadence_transport::service::{Response, TransportHandle, TransportService};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cadence-transport
#[derive(Parser, Debug)]
#[command(name = "cadence-transport")]
#[command(about = "Playback transport with real-time listening clock")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot database, overrides the configured path
    #[arg(short, long, env = "CADENCE_DATABASE")]
    database: Option<PathBuf>,

    /// Discard the persisted session and start stopped
    #[arg(long)]
    fresh: bool,

    /// Items for the playlist (paths or URIs)
    items: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cadence_transport={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cadence Transport v{}", env!("CARGO_PKG_VERSION"));

    let database_path = args.database.clone().unwrap_or_else(|| config.database_path());
    let store = SqliteSnapshotStore::connect(&database_path)
        .await
        .with_context(|| format!("Failed to open database {}", database_path.display()))?;
    if args.fresh {
        store.clear().await.context("Failed to discard persisted session")?;
        info!("Fresh start requested, persisted session discarded");
    }

    let (engine_tx, engine_rx) = engine::event_channel();
    let engine = ClockEngine::new(engine_tx, &config.engine);
    let playlist = Playlist::new(args.items.iter().map(MediaItem::from_location).collect());
    info!("Playlist has {} item(s)", playlist.len());

    let controller = TransportController::new(engine, playlist, &config.transport)
        .context("Invalid transport settings")?;
    let (service, handle) = TransportService::new(controller, store, engine_rx, &config.transport);
    let service_task = service.spawn();

    spawn_event_logger(&handle);

    if let Err(e) = handle.activate().await {
        warn!("Session not restored: {}", e);
    }

    println!("{}", console::HELP);

    tokio::select! {
        result = run_console(&handle) => {
            if let Err(e) = result {
                error!("Console error: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    match handle.shutdown().await {
        Ok(snapshot) => info!(
            "Session saved: {} at {} ms (listened {} ms)",
            snapshot.status, snapshot.current_time_ms, snapshot.real_time_ms
        ),
        Err(e) => error!("Failed to save session: {}", e),
    }
    drop(handle);

    service_task.await.context("Transport task panicked")?;
    info!("Shutdown complete");
    Ok(())
}

/// Log every transport event at debug level
fn spawn_event_logger(handle: &TransportHandle) {
    let mut events = BroadcastStream::new(handle.subscribe());
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => debug!("{} {:?}", event.event_type(), event),
                Err(e) => warn!("Event logger lagged: {}", e),
            }
        }
    });
}

/// Read console commands from stdin until `quit` or end of input
async fn run_console(handle: &TransportHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match console::parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(ConsoleCommand::Help) => {
                println!("{}", console::HELP);
                continue;
            }
            Ok(ConsoleCommand::Transport(command)) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match handle.send(command).await {
            Ok(Response::Status(status)) => {
                let state = &status.state;
                let item = status
                    .item
                    .as_ref()
                    .map(|i| i.display_name().to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} [{}] {} {}/{} ms, listened {} ms, vol {:.2} bal {:+.2} rate {:.2}{} loop {}",
                    state.status(),
                    status.phase,
                    item,
                    state.current_time_ms(),
                    state.duration_ms(),
                    state.real_time_ms(),
                    state.volume(),
                    state.balance(),
                    state.rate(),
                    if state.mute() { " muted" } else { "" },
                    state.loop_mode()
                );
            }
            Ok(Response::Snapshot(snapshot)) => {
                println!("suspended at {} ms", snapshot.current_time_ms);
            }
            Ok(Response::Done) => {}
            Err(e) => println!("error: {}", e),
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
