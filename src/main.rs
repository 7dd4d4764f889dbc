//! `pointercast` CLI: join a pointer session from the terminal.
//!
//! Connects to a WebSocket relay (or an in-process loopback mesh with a ghost
//! peer), optionally sweeps the local pointer across the element, and logs
//! every render state the overlay would draw.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use overlay::input::LocalPointer;
use overlay::transform::{FitPolicy, Size};
use pointercast::config::{RelayConfig, SessionConfig};
use pointercast::services::session::{SessionCommand, SessionError, SessionHandle, spawn_session};
use pointercast::state::SessionContext;
use pointercast::transport::{Capabilities, LoopbackMesh, Transport, TransportEvent, WsRelayTransport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

const SWEEP_INTERVAL_MS: u64 = 50;
const SWEEP_CLICK_EVERY: u32 = 40;
const GHOST_NICKNAME: &str = "ghost";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no transport; pass --relay URL or --loopback")]
    NoTransport,
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Fit {
    Cover,
    Contain,
}

impl From<Fit> for FitPolicy {
    fn from(fit: Fit) -> Self {
        match fit {
            Fit::Cover => FitPolicy::Cover,
            Fit::Contain => FitPolicy::Contain,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pointercast", about = "Shared pointer overlay from the terminal")]
struct Cli {
    /// WebSocket relay URL.
    #[arg(long, env = "POINTERCAST_RELAY", conflicts_with = "loopback")]
    relay: Option<String>,

    /// Run against an in-process mesh with a sweeping ghost peer.
    #[arg(long)]
    loopback: bool,

    #[arg(long, env = "POINTERCAST_NICKNAME", default_value = "terminal")]
    nickname: String,

    /// Element box as WIDTHxHEIGHT.
    #[arg(long, default_value = "640x360", value_parser = parse_size)]
    element: Size,

    /// Intrinsic video size as WIDTHxHEIGHT.
    #[arg(long, default_value = "1280x720", value_parser = parse_size)]
    video: Size,

    #[arg(long, value_enum, default_value_t = Fit::Cover)]
    fit: Fit,

    /// Sweep the local pointer and click periodically.
    #[arg(long)]
    sweep: bool,

    /// Leave after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn")]
    log: String,
}

fn parse_size(raw: &str) -> Result<Size, String> {
    let (w, h) = raw.split_once(['x', 'X']).ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("invalid width `{w}`"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("invalid height `{h}`"))?;
    let size = Size::new(width, height);
    if size.is_degenerate() {
        return Err(format!("size must be positive, got `{raw}`"));
    }
    Ok(size)
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let peer_id = Uuid::new_v4().to_string();
    let context = SessionContext::new(peer_id.clone(), cli.nickname.clone());
    let config = SessionConfig::from_env();

    let mut ghost = None;
    let (transport, events): (Arc<dyn Transport>, mpsc::Receiver<TransportEvent>) = if let Some(url) = &cli.relay {
        let (transport, events) = WsRelayTransport::connect(RelayConfig::from_env(url.clone(), peer_id.clone()));
        let transport: Arc<dyn Transport> = Arc::new(transport);
        (transport, events)
    } else if cli.loopback {
        let mesh = LoopbackMesh::new(Capabilities::broadcast());
        let (transport, events) = mesh.join(&peer_id).await;
        ghost = Some(Ghost::spawn(&mesh, config, &cli).await?);
        let transport: Arc<dyn Transport> = Arc::new(transport);
        (transport, events)
    } else {
        return Err(CliError::NoTransport);
    };

    let (handle, session) = spawn_session(context, config, transport, events);
    configure(&handle, &cli).await?;
    let sweeper = cli.sweep.then(|| tokio::spawn(sweep(handle.clone(), cli.element)));

    info!(peer = %peer_id, nickname = %cli.nickname, "cli: session started");
    watch_render(&handle, cli.duration_secs).await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    handle.leave().await?;
    session.await?;
    if let Some(ghost) = ghost {
        ghost.stop().await?;
    }
    info!("cli: done");
    Ok(())
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn configure(handle: &SessionHandle, cli: &Cli) -> Result<(), SessionError> {
    handle.send(SessionCommand::SetFitPolicy(cli.fit.into())).await?;
    handle.send(SessionCommand::ElementResized(cli.element)).await?;
    handle.send(SessionCommand::VideoResized(cli.video)).await
}

/// Log each published render state until Ctrl-C or the deadline.
async fn watch_render(handle: &SessionHandle, duration_secs: Option<u64>) -> Result<(), CliError> {
    let mut render = handle.subscribe_render();
    let deadline = sleep_for(duration_secs);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = render.changed() => {
                if changed.is_err() {
                    info!("cli: session ended");
                    return Ok(());
                }
                let state = render.borrow_and_update().clone();
                info!(pointers = state.pointers.len(), pulses = state.pulses.len(), "cli: render");
                debug!(state = %serde_json::to_string(&state)?, "cli: render state");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("cli: interrupted");
                return Ok(());
            }
            () = &mut deadline => return Ok(()),
        }
    }
}

async fn sleep_for(duration_secs: Option<u64>) {
    match duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => std::future::pending().await,
    }
}

/// Drive the local pointer along a Lissajous path, clicking now and then.
async fn sweep(handle: SessionHandle, element: Size) {
    let mut interval = tokio::time::interval(Duration::from_millis(SWEEP_INTERVAL_MS));
    if handle.pointer(LocalPointer::Enter).await.is_err() {
        return;
    }
    let mut step: u32 = 0;
    loop {
        interval.tick().await;
        let t = f64::from(step) / 20.0;
        let x = element.width * (0.5 + 0.4 * t.sin());
        let y = element.height * (0.5 + 0.4 * (t * 1.3).cos());
        let event = if step % SWEEP_CLICK_EVERY == SWEEP_CLICK_EVERY - 1 {
            LocalPointer::Click { x, y }
        } else {
            LocalPointer::Move { x, y }
        };
        if handle.pointer(event).await.is_err() {
            return;
        }
        step = step.wrapping_add(1);
    }
}

/// A second peer on the loopback mesh that sweeps its own pointer.
struct Ghost {
    handle: SessionHandle,
    session: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl Ghost {
    async fn spawn(mesh: &LoopbackMesh, config: SessionConfig, cli: &Cli) -> Result<Self, SessionError> {
        let peer_id = format!("{GHOST_NICKNAME}-{}", Uuid::new_v4());
        let (transport, events) = mesh.join(&peer_id).await;
        let context = SessionContext::new(peer_id, GHOST_NICKNAME);
        let (handle, session) = spawn_session(context, config, Arc::new(transport), events);
        configure(&handle, cli).await?;
        let sweeper = tokio::spawn(sweep(handle.clone(), cli.element));
        Ok(Self { handle, session, sweeper })
    }

    async fn stop(self) -> Result<(), CliError> {
        self.sweeper.abort();
        self.handle.leave().await?;
        self.session.await?;
        Ok(())
    }
}
