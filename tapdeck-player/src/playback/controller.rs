//! Playback controller
//!
//! Event-driven state machine translating input taps into pipeline
//! lifecycle transitions and codec volume changes.
//!
//! | Output state | `Play` tap                                   |
//! |--------------|----------------------------------------------|
//! | Init         | run                                          |
//! | Running      | pause                                        |
//! | Paused       | resume                                       |
//! | Finished     | reset, select track, run from a fresh cursor |
//! | Stopped/Error| logged, ignored                              |
//!
//! `Mode` tears the current run down and restarts on the next track,
//! `Stop` leaves the loop. Volume taps never touch the lifecycle.

use super::state::{SessionState, Volume};
use super::stream::TrackStream;
use super::tracks::{TrackSelector, TrackSet};
use crate::config::{FinishedPolicy, PlaybackConfig};
use crate::error::{Error, FaultClass, Result};
use crate::pipeline::{AudioCodec, ElementKind, PipelineEngine, DECODER_TAG, OUTPUT_TAG};
use std::time::Duration;
use tapdeck_common::events::{ControlEvent, ElementState, InputKey, MusicInfo, PipelineStatus};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::block_in_place;
use tracing::{debug, error, info, trace, warn};

/// Whether the control loop keeps listening after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Controller tuning taken from `[playback]`
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub volume_step: u8,
    pub event_wait: Option<Duration>,
    pub on_finished: FinishedPolicy,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for ControllerSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            volume_step: config.volume_step,
            event_wait: config.event_wait(),
            on_finished: config.on_finished,
        }
    }
}

/// Owner of the playback session
pub struct PlaybackController<P, C> {
    pipeline: P,
    codec: C,
    selector: TrackSelector,
    session: SessionState,
    settings: ControllerSettings,
}

impl<P: PipelineEngine, C: AudioCodec> PlaybackController<P, C> {
    /// Create a controller; the session volume starts at the codec's volume
    pub fn new(pipeline: P, codec: C, tracks: TrackSet, settings: ControllerSettings) -> Result<Self> {
        let volume = Volume::new(codec.volume()? as i32);
        let session = SessionState {
            lifecycle: pipeline.state(),
            ..SessionState::new(volume)
        };
        debug!("Controller created, codec volume {}", volume);

        Ok(Self {
            pipeline,
            codec,
            selector: TrackSelector::new(tracks),
            session,
            settings,
        })
    }

    /// Register and link `decoder -> output`, and route status events into
    /// the merged channel
    pub fn assemble(&mut self, listener: UnboundedSender<ControlEvent>) -> Result<()> {
        info!("Register all elements to audio pipeline");
        self.pipeline.register(ElementKind::Decoder, DECODER_TAG)?;
        self.pipeline.register(ElementKind::Output, OUTPUT_TAG)?;

        info!("Link it together [track]-->{}-->{}-->[codec]", DECODER_TAG, OUTPUT_TAG);
        self.pipeline.link(&[DECODER_TAG, OUTPUT_TAG])?;

        info!("Listening to events from all elements of the pipeline");
        self.pipeline.set_listener(listener)?;
        Ok(())
    }

    /// Write an explicit start-up volume to the codec
    pub fn set_initial_volume(&mut self, volume: Volume) -> Result<()> {
        self.codec.set_volume(volume.get())?;
        self.session.volume = volume;
        info!("Initial volume set to {}", volume);
        Ok(())
    }

    /// Select the first track and start streaming
    pub fn start(&mut self) -> Result<()> {
        info!("Start audio pipeline");
        self.install_track(true)?;
        self.pipeline.run()?;
        self.refresh_lifecycle();
        Ok(())
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Process events until `Stop` arrives or every sender is gone
    ///
    /// With an event-wait timeout configured, an expired wait is not an
    /// error: the loop simply listens again.
    ///
    /// Engine calls may block, e.g. joining the worker on `Mode`. On a
    /// multi-threaded runtime each event is handled inside
    /// [`tokio::task::block_in_place`] so other tasks keep running.
    pub async fn run(&mut self, events: &mut UnboundedReceiver<ControlEvent>) {
        loop {
            let received = match self.settings.event_wait {
                Some(wait) => match tokio::time::timeout(wait, events.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        trace!("No event within {:?}, listening again", wait);
                        continue;
                    }
                },
                None => events.recv().await,
            };

            let Some(event) = received else {
                warn!("{}, leaving control loop", Error::EventWait);
                break;
            };

            let flow = match Handle::current().runtime_flavor() {
                RuntimeFlavor::MultiThread => block_in_place(|| self.handle_event(event)),
                _ => self.handle_event(event),
            };
            if flow == Flow::Exit {
                break;
            }
        }
    }

    /// React to one event
    pub fn handle_event(&mut self, event: ControlEvent) -> Flow {
        match event {
            ControlEvent::Pipeline(PipelineStatus::MusicInfo(info)) => {
                self.on_music_info(info);
                Flow::Continue
            }
            ControlEvent::Pipeline(PipelineStatus::StateChanged(state)) => {
                debug!("Output element now {}", state);
                self.session.lifecycle = state;
                Flow::Continue
            }
            ControlEvent::Input(key) => self.on_input(key),
        }
    }

    fn on_input(&mut self, key: InputKey) -> Flow {
        info!("[{}] tap event", key);
        match key {
            InputKey::Play => {
                if let Err(e) = self.on_play() {
                    report(&e, "play");
                }
                self.refresh_lifecycle();
                Flow::Continue
            }
            InputKey::Stop => {
                info!("Stopping audio pipeline");
                Flow::Exit
            }
            InputKey::Mode => {
                if let Err(e) = self.on_mode() {
                    report(&e, "track change");
                }
                self.refresh_lifecycle();
                Flow::Continue
            }
            InputKey::VolumeUp => {
                self.adjust_volume(self.session.volume.raised(self.settings.volume_step));
                Flow::Continue
            }
            InputKey::VolumeDown => {
                self.adjust_volume(self.session.volume.lowered(self.settings.volume_step));
                Flow::Continue
            }
        }
    }

    fn on_play(&mut self) -> Result<()> {
        let state = self.pipeline.state();
        self.session.lifecycle = state;

        match state {
            ElementState::Init => {
                info!("Starting audio pipeline");
                self.pipeline.run()
            }
            ElementState::Running => {
                info!("Pausing audio pipeline");
                self.pipeline.pause()
            }
            ElementState::Paused => {
                info!("Resuming audio pipeline");
                self.pipeline.resume()
            }
            ElementState::Finished => {
                info!("Rewinding audio pipeline");
                self.pipeline.reset_ringbuffer()?;
                self.pipeline.reset_elements()?;
                self.pipeline.change_state(ElementState::Init)?;
                self.install_track(self.settings.on_finished == FinishedPolicy::Next)?;
                self.pipeline.run()
            }
            ElementState::Stopped | ElementState::Error => Err(Error::UnsupportedState(state)),
        }
    }

    fn on_mode(&mut self) -> Result<()> {
        info!("Switching to next track");
        self.pipeline.stop()?;
        self.pipeline.wait_for_stop()?;
        self.pipeline.terminate()?;
        self.pipeline.reset_ringbuffer()?;
        self.pipeline.reset_elements()?;
        self.install_track(true)?;
        self.pipeline.run()
    }

    fn on_music_info(&mut self, info: MusicInfo) {
        info!(
            "Receive music info from decoder, sample_rates={}, bits={}, ch={}",
            info.sample_rate, info.bits, info.channels
        );
        if let Err(e) = self.pipeline.set_clock(OUTPUT_TAG, info) {
            report(&e, "clock configuration");
        }
    }

    /// Write `target` to the codec; exactly one codec write per call
    fn adjust_volume(&mut self, target: Volume) {
        match self.codec.set_volume(target.get()) {
            Ok(()) => {
                self.session.volume = target;
                info!("Volume set to {}", target);
            }
            Err(e) => report(&e, "volume change"),
        }
    }

    /// Hand a fresh stream (cursor at zero) to the decoder element
    ///
    /// With `advance` the selector moves to the next track; otherwise the
    /// current track is streamed again.
    fn install_track(&mut self, advance: bool) -> Result<()> {
        let track = match (advance, self.selector.current()) {
            (false, Some(current)) => current,
            _ => match self.selector.select_next() {
                Ok(track) => track,
                Err(e) => {
                    report(&e, "track selection");
                    self.selector.current().ok_or(e)?
                }
            },
        };

        self.pipeline
            .set_read_source(DECODER_TAG, Box::new(TrackStream::new(track)))?;
        self.session.track_index = self.selector.current_index();
        Ok(())
    }

    fn refresh_lifecycle(&mut self) {
        self.session.lifecycle = self.pipeline.state();
    }

    /// Stop the run and release the pipeline; failures are logged only
    pub fn teardown(&mut self) {
        info!("Stop audio pipeline");
        let steps: [(&str, Result<()>); 6] = [
            ("stop", self.pipeline.stop()),
            ("wait_for_stop", self.pipeline.wait_for_stop()),
            ("terminate", self.pipeline.terminate()),
            ("unregister decoder", self.pipeline.unregister(DECODER_TAG)),
            ("unregister output", self.pipeline.unregister(OUTPUT_TAG)),
            ("remove_listener", self.pipeline.remove_listener()),
        ];
        for (step, result) in steps {
            if let Err(e) = result {
                warn!("Teardown step {} failed: {}", step, e);
            }
        }
        self.refresh_lifecycle();
    }
}

/// Log a fault according to its class; nothing here is fatal
fn report(e: &Error, operation: &str) {
    match e.class() {
        FaultClass::Logic => info!("Not supported during {}: {}", operation, e),
        FaultClass::Transient => warn!("{} failed, still listening: {}", operation, e),
        FaultClass::Integrity | FaultClass::Bootstrap => {
            error!("{} failed: {}", operation, e)
        }
    }
}
