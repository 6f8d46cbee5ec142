mod action;
mod app;
mod mpv;
mod playback;
mod pusher;
mod queue;
mod service;
mod shell;
mod status;
mod theme;
mod ui;
mod widgets;

use std::sync::Arc;

use play_proto::client::{PlayApi, PlayService};
use play_proto::config::{Config, Credentials};
use play_proto::platform;
use play_proto::state::SessionStore;

use crate::mpv::MpvStream;
use crate::playback::PlaybackController;
use crate::pusher::PusherListener;
use crate::shell::{Connector, Shell};
use crate::status::StatusUpdateChannel;
use crate::ui::UiHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = platform::log_path();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but keep HTTP
    // and websocket internals quiet.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "debug,hyper_util=warn,reqwest=warn,hyper=warn,tungstenite=warn,tokio_tungstenite=warn"
            .to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("play log: {}", log_path.display());

    tracing::info!("play starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config_path = Config::config_path();
    let config = Config::load_from(&config_path).unwrap_or_else(|e| {
        tracing::warn!("config: {}, using defaults", e);
        Config::default()
    });

    // ── Status updates (push listener → UI) ──────────────────────────────────
    let status = StatusUpdateChannel::new();
    let (ui, ui_rx) = UiHandle::channel(1024);

    // ── Playback: mpv + push listener, started and stopped together ─────────
    let audio = MpvStream::new(
        config.player.mpv_binary.clone(),
        config.player.volume,
        &data_dir.join("mpv-stderr.log"),
    );
    let listener = PusherListener::new(
        config.push.host.clone(),
        config.push.channel.clone(),
        status.clone(),
    )
    .with_ui(ui.clone());
    let playback = PlaybackController::new(Box::new(audio), Box::new(listener));

    // ── Server client factory ────────────────────────────────────────────────
    let http_config = config.http.clone();
    let connector: Connector = Box::new(move |credentials: &Credentials| {
        let service = PlayService::new(credentials.clone(), &http_config)?;
        Ok(Arc::new(service) as Arc<dyn PlayApi>)
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let shell = Shell::new(
        config,
        config_path,
        SessionStore::new(platform::state_path()),
        playback,
        connector,
        ui.clone(),
    );
    let app = app::App::new(shell, status, ui);
    app.run(ui_rx).await?;

    tracing::info!("play exited");
    Ok(())
}
