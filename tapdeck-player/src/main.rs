//! Tapdeck player - main entry point
//!
//! Boots storage, the health monitor, the codec and the pipeline, then hands
//! control to the playback controller until a `Stop` tap. After `Stop` the
//! pipeline is torn down but the process stays up so the storage monitor
//! keeps checking. Bootstrap faults park the process instead of returning.

use anyhow::Result;
use tapdeck_common::events::InputKey;
use tapdeck_common::halt_forever;
use tapdeck_common::logging::init_tracing;
use tapdeck_player::bootstrap::{boot_storage, build_controller};
use tapdeck_player::config::PlayerConfig;
use tapdeck_player::input::{spawn_stdin_keypad, KeyMap};
use tapdeck_player::playback::TrackSet;
use tapdeck_player::storage::keep_monitoring;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match PlayerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tapdeck-player: {}", e);
            halt_forever("configuration unusable");
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("tapdeck-player: {}", e);
        halt_forever("logging unavailable");
    }

    info!(
        "Tapdeck player {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let monitor = match boot_storage(&config.storage) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Storage bootstrap failed: {}", e);
            halt_forever("storage bootstrap failed");
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut controller = match build_controller(&config, TrackSet::embedded(), event_tx.clone()) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Audio bootstrap failed: {}", e);
            halt_forever("audio pipeline unavailable");
        }
    };

    info!("Initialize keypad");
    let keymap = KeyMap::new(&config.input);
    if let Err(e) = spawn_stdin_keypad(keymap.clone(), event_tx) {
        error!("{}", e);
        halt_forever("keypad unavailable");
    }

    warn!("Tap keys to control the music player:");
    warn!(
        "      [{}] to start, pause and resume, [{}] to stop, [{}] for the next track.",
        binding(&keymap, InputKey::Play),
        binding(&keymap, InputKey::Stop),
        binding(&keymap, InputKey::Mode)
    );
    warn!(
        "      [{}] or [{}] to adjust volume.",
        binding(&keymap, InputKey::VolumeDown),
        binding(&keymap, InputKey::VolumeUp)
    );

    if config.playback.autoplay {
        if let Err(e) = controller.start() {
            warn!("Autoplay failed, waiting for [Play]: {}", e);
        }
    }

    controller.run(&mut event_rx).await;
    controller.teardown();

    info!("Playback stopped, storage monitor keeps running");
    keep_monitoring(monitor)
}

fn binding(keymap: &KeyMap, key: InputKey) -> &str {
    keymap.binding_of(key).unwrap_or("?")
}
