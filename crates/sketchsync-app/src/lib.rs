//! SketchSync command-line client.
//!
//! Joins a session, replays a gesture script through a [`SyncController`],
//! keeps applying peer updates for a while, and optionally writes what the
//! canvas shows to a PNG.

pub mod script;

use anyhow::Context;
use clap::Parser;
use sketchsync_core::{
    CanvasStyle, ClientConfig, ConnectionState, DEFAULT_SERVER_URL, PointerEvent, RenderEngine,
    SessionEvent, SessionId, SyncChannel, SyncController,
};
use sketchsync_core::sync::NativeChannel;
use sketchsync_render::PixelCanvas;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Pause between scripted steps and between pumps, about one frame.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "sketchsync", version, about = "Draw together on a shared SketchSync canvas")]
pub struct Args {
    /// Relay server base URL.
    #[arg(long, env = "SKETCHSYNC_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Session to join.
    #[arg(long)]
    pub session: String,

    /// Canvas and pen style (JSON).
    #[arg(long)]
    pub style: Option<PathBuf>,

    /// Gesture script to replay (JSON array of pointer steps).
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Write the final canvas to this PNG file.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Keep receiving peer updates this long after the script finishes.
    #[arg(long, default_value_t = 1000)]
    pub linger_ms: u64,
}

/// Run a client session to completion.
pub fn run(args: Args) -> anyhow::Result<()> {
    let session = SessionId::new(args.session).context("Invalid session")?;
    let style = match &args.style {
        Some(path) => CanvasStyle::from_json_file(path)
            .with_context(|| format!("Failed to load style from {}", path.display()))?,
        None => CanvasStyle::default(),
    };
    let steps = match &args.script {
        Some(path) => script::load_script(path)
            .with_context(|| format!("Failed to load script from {}", path.display()))?,
        None => Vec::new(),
    };

    let config = ClientConfig::new(args.server, session.clone());
    let url = config.channel_url()?;
    log::info!("Joining {} via {}", session, url);

    let channel = NativeChannel::open(&config)?;
    let canvas = PixelCanvas::for_style(&style)?;
    let mut controller = SyncController::new(session, channel, canvas, style);

    if !wait_for_connection(&mut controller, CONNECT_TIMEOUT) {
        log::warn!("Not connected after {:?}; drawing locally only", CONNECT_TIMEOUT);
    }

    play(&mut controller, &steps, FRAME_INTERVAL);
    linger(&mut controller, Duration::from_millis(args.linger_ms), FRAME_INTERVAL);

    log::info!(
        "Session {} finished: {} strokes drawn locally, {} peers",
        controller.session(),
        controller.history().len(),
        controller.peer_count()
    );

    let canvas = controller.close();
    if let Some(path) = &args.snapshot {
        canvas
            .write_png(path)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        log::info!("Snapshot written to {}", path.display());
    }

    Ok(())
}

/// Pump until the channel opens, fails, or `timeout` passes.
pub fn wait_for_connection<C: SyncChannel, R: RenderEngine>(
    controller: &mut SyncController<C, R>,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        for event in controller.pump() {
            log_event(&event);
        }
        match controller.connection_state() {
            ConnectionState::Connected => return true,
            ConnectionState::Disconnected | ConnectionState::Error => return false,
            ConnectionState::Connecting => {}
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(FRAME_INTERVAL);
    }
}

/// Feed `steps` to the controller, pumping inbound traffic between steps.
pub fn play<C: SyncChannel, R: RenderEngine>(
    controller: &mut SyncController<C, R>,
    steps: &[PointerEvent],
    interval: Duration,
) {
    for &step in steps {
        controller.handle_pointer_event(step);
        for event in controller.pump() {
            log_event(&event);
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
}

/// Keep applying inbound traffic for `duration`.
pub fn linger<C: SyncChannel, R: RenderEngine>(
    controller: &mut SyncController<C, R>,
    duration: Duration,
    interval: Duration,
) {
    let deadline = Instant::now() + duration;
    loop {
        for event in controller.pump() {
            log_event(&event);
        }
        if !controller.is_attached() || Instant::now() >= deadline {
            break;
        }
        thread::sleep(interval);
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Connected => log::info!("Connected"),
        SessionEvent::Disconnected { reason: Some(reason) } => {
            log::warn!("Disconnected: {}", reason)
        }
        SessionEvent::Disconnected { reason: None } => log::info!("Disconnected"),
        SessionEvent::Joined { peer_count } => log::info!("Joined session ({} peers)", peer_count),
        SessionEvent::PeerJoined { peer_id } => log::info!("Peer {} joined", peer_id),
        SessionEvent::PeerLeft { peer_id } => log::info!("Peer {} left", peer_id),
        SessionEvent::RemoteDraw { points } => log::debug!("Remote path of {} points", points),
    }
}
