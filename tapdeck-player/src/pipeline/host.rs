//! In-process pipeline engine
//!
//! A single worker thread plays both elements of a `decoder -> output`
//! chain:
//! - Decoder stage: pulls bytes from the installed [`ByteSource`], strips a
//!   RIFF/WAVE header when present and reports the stream format once per
//!   track, then pushes PCM into a lock-protected ring buffer.
//! - Output stage: drains the ring at the byte rate of the configured clock
//!   into a null sink, standing in for the I2S writer.
//!
//! The worker reports `Finished` once the source is exhausted and the ring
//! is empty, then exits. Pause parks the worker on a condvar so the source
//! is not polled while paused.

use super::{ByteSource, ElementKind, PipelineEngine, ReadOutcome, DECODER_TAG};
use crate::error::{Error, Result};
use ringbuf::{traits::*, HeapRb};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tapdeck_common::events::{ControlEvent, ElementState, MusicInfo, PipelineStatus};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

/// Length of a canonical RIFF/WAVE header
const WAV_HEADER_LEN: usize = 44;

/// Host engine tuning
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Output ring capacity in bytes
    pub ring_capacity: usize,
    /// Maximum bytes requested from the read source per call
    pub read_chunk: usize,
    /// Output clock tick
    pub tick: Duration,
    /// Clock used until the controller configures one
    pub default_clock: MusicInfo,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 8 * 1024,
            read_chunk: 1024,
            tick: Duration::from_millis(10),
            default_clock: MusicInfo {
                sample_rate: 44100,
                bits: 16,
                channels: 2,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Pause,
    Stop,
}

/// Decoder element progress through the stream header
enum HeaderState {
    /// Collecting the first bytes of the stream
    Pending(Vec<u8>),
    /// Format reported; remaining bytes are PCM
    Parsed,
}

struct Inner {
    state: ElementState,
    command: Command,
    source: Option<Box<dyn ByteSource>>,
    source_done: bool,
    header: HeaderState,
    ring: HeapRb<u8>,
    clock: Option<MusicInfo>,
    listener: Option<UnboundedSender<ControlEvent>>,
    bytes_played: u64,
}

impl Inner {
    fn emit(&self, status: PipelineStatus) {
        if let Some(listener) = &self.listener {
            if listener.send(ControlEvent::Pipeline(status)).is_err() {
                trace!("Listener dropped, status {:?} discarded", status);
            }
        }
    }

    fn set_state(&mut self, state: ElementState) {
        if self.state != state {
            debug!("Output element: {} -> {}", self.state, state);
            self.state = state;
            self.emit(PipelineStatus::StateChanged(state));
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process [`PipelineEngine`]
pub struct HostPipeline {
    config: HostConfig,
    elements: Vec<(String, ElementKind)>,
    links: Vec<String>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl HostPipeline {
    pub fn new(mut config: HostConfig) -> Self {
        // One read plus a held-back header must always fit
        config.ring_capacity = config
            .ring_capacity
            .max(config.read_chunk + WAV_HEADER_LEN);
        let ring = HeapRb::new(config.ring_capacity);
        Self {
            elements: Vec::new(),
            links: Vec::new(),
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ElementState::Init,
                    command: Command::Stop,
                    source: None,
                    source_done: false,
                    header: HeaderState::Pending(Vec::with_capacity(WAV_HEADER_LEN)),
                    ring,
                    clock: None,
                    listener: None,
                    bytes_played: 0,
                }),
                wake: Condvar::new(),
            }),
            worker: None,
            config,
        }
    }

    /// Bytes the output stage has written since the last element reset
    pub fn bytes_played(&self) -> u64 {
        self.shared.lock().bytes_played
    }

    /// Clock currently applied to the output element
    pub fn clock(&self) -> Option<MusicInfo> {
        self.shared.lock().clock
    }

    fn worker_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether a run is still in progress
    ///
    /// A worker that already reported its final state is joined here, so
    /// callers never race its exit.
    fn active(&mut self) -> Result<bool> {
        let state = self.shared.lock().state;
        if matches!(
            state,
            ElementState::Finished | ElementState::Stopped | ElementState::Error
        ) {
            self.join_worker()?;
        }
        Ok(self.worker_alive())
    }

    fn kind_of(&self, tag: &str) -> Option<ElementKind> {
        self.elements
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, kind)| *kind)
    }

    fn join_worker(&mut self) -> Result<()> {
        if let Some(handle) = self.worker.take() {
            handle
                .join()
                .map_err(|_| Error::Pipeline("pipeline worker panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Default for HostPipeline {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl PipelineEngine for HostPipeline {
    fn register(&mut self, kind: ElementKind, tag: &str) -> Result<()> {
        if self.kind_of(tag).is_some() {
            return Err(Error::Pipeline(format!("element '{}' already registered", tag)));
        }
        debug!("Registered {:?} element '{}'", kind, tag);
        self.elements.push((tag.to_string(), kind));
        Ok(())
    }

    fn unregister(&mut self, tag: &str) -> Result<()> {
        if self.active()? {
            return Err(Error::Pipeline(format!("cannot unregister '{}' while running", tag)));
        }
        let before = self.elements.len();
        self.elements.retain(|(t, _)| t != tag);
        if self.elements.len() == before {
            return Err(Error::Pipeline(format!("element '{}' not registered", tag)));
        }
        self.links.retain(|t| t != tag);
        debug!("Unregistered element '{}'", tag);
        Ok(())
    }

    fn link(&mut self, tags: &[&str]) -> Result<()> {
        if tags.len() < 2 {
            return Err(Error::Pipeline("a link needs at least two elements".to_string()));
        }
        for tag in tags {
            if self.kind_of(tag).is_none() {
                return Err(Error::Pipeline(format!("cannot link unknown element '{}'", tag)));
            }
        }
        if self.kind_of(tags[0]) != Some(ElementKind::Decoder) {
            return Err(Error::Pipeline(format!("'{}' is not a decoder", tags[0])));
        }
        if self.kind_of(tags[tags.len() - 1]) != Some(ElementKind::Output) {
            return Err(Error::Pipeline(format!(
                "'{}' is not an output",
                tags[tags.len() - 1]
            )));
        }
        self.links = tags.iter().map(|t| t.to_string()).collect();
        info!("Linked [{}]", self.links.join("]-->["));
        Ok(())
    }

    fn set_read_source(&mut self, tag: &str, source: Box<dyn ByteSource>) -> Result<()> {
        if self.kind_of(tag) != Some(ElementKind::Decoder) {
            return Err(Error::Pipeline(format!("'{}' is not a decoder element", tag)));
        }
        if self.active()? {
            return Err(Error::Pipeline("cannot swap read source while running".to_string()));
        }
        let mut inner = self.shared.lock();
        inner.source = Some(source);
        inner.source_done = false;
        Ok(())
    }

    fn set_listener(&mut self, listener: UnboundedSender<ControlEvent>) -> Result<()> {
        self.shared.lock().listener = Some(listener);
        Ok(())
    }

    fn remove_listener(&mut self) -> Result<()> {
        self.shared.lock().listener = None;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        if self.active()? {
            return Err(Error::Pipeline("pipeline already running".to_string()));
        }
        self.join_worker()?;

        if self.links.is_empty() {
            return Err(Error::Pipeline("pipeline not linked".to_string()));
        }

        {
            let mut inner = self.shared.lock();
            if inner.state != ElementState::Init {
                return Err(Error::Pipeline(format!(
                    "run requires init state, output is {}",
                    inner.state
                )));
            }
            if inner.source.is_none() {
                return Err(Error::Pipeline(format!(
                    "no read source on '{}'",
                    DECODER_TAG
                )));
            }
            inner.command = Command::Run;
            inner.set_state(ElementState::Running);
        }

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name("pipeline-worker".to_string())
            .spawn(move || worker_loop(shared, config))
            .map_err(|e| {
                let mut inner = self.shared.lock();
                inner.command = Command::Stop;
                inner.set_state(ElementState::Error);
                Error::TaskSpawn(format!("pipeline worker: {}", e))
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut inner = self.shared.lock();
        if inner.state != ElementState::Running {
            return Err(Error::Pipeline(format!("cannot pause from {}", inner.state)));
        }
        inner.command = Command::Pause;
        inner.set_state(ElementState::Paused);
        self.shared.wake.notify_all();
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.shared.lock();
        if inner.state != ElementState::Paused {
            return Err(Error::Pipeline(format!("cannot resume from {}", inner.state)));
        }
        inner.command = Command::Run;
        inner.set_state(ElementState::Running);
        self.shared.wake.notify_all();
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.worker_alive() {
            debug!("Stop requested with no active run");
            return Ok(());
        }
        self.shared.lock().command = Command::Stop;
        self.shared.wake.notify_all();
        Ok(())
    }

    fn wait_for_stop(&mut self) -> Result<()> {
        self.join_worker()
    }

    fn terminate(&mut self) -> Result<()> {
        if self.worker_alive() {
            warn!("Terminating a running pipeline, stopping it first");
            self.stop()?;
        }
        self.join_worker()?;
        let mut inner = self.shared.lock();
        if matches!(inner.state, ElementState::Running | ElementState::Paused) {
            inner.set_state(ElementState::Stopped);
        }
        Ok(())
    }

    fn reset_ringbuffer(&mut self) -> Result<()> {
        if self.active()? {
            return Err(Error::Pipeline("cannot reset ringbuffer while running".to_string()));
        }
        let mut inner = self.shared.lock();
        let discarded = inner.ring.occupied_len();
        inner.ring = HeapRb::new(self.config.ring_capacity);
        debug!("Ring buffer reset, {} bytes discarded", discarded);
        Ok(())
    }

    fn reset_elements(&mut self) -> Result<()> {
        if self.active()? {
            return Err(Error::Pipeline("cannot reset elements while running".to_string()));
        }
        let mut inner = self.shared.lock();
        inner.header = HeaderState::Pending(Vec::with_capacity(WAV_HEADER_LEN));
        inner.source_done = false;
        inner.clock = None;
        inner.bytes_played = 0;
        inner.command = Command::Stop;
        if inner.state != ElementState::Init {
            inner.set_state(ElementState::Init);
        }
        Ok(())
    }

    fn change_state(&mut self, target: ElementState) -> Result<()> {
        if self.active()? {
            return Err(Error::Pipeline(format!(
                "cannot force state {} while running",
                target
            )));
        }
        self.shared.lock().set_state(target);
        Ok(())
    }

    fn state(&self) -> ElementState {
        self.shared.lock().state
    }

    fn set_clock(&mut self, tag: &str, info: MusicInfo) -> Result<()> {
        if self.kind_of(tag) != Some(ElementKind::Output) {
            return Err(Error::Pipeline(format!("'{}' is not an output element", tag)));
        }
        if info.sample_rate == 0 || info.channels == 0 || info.bits == 0 || info.bits % 8 != 0 {
            return Err(Error::Pipeline(format!("unusable clock {:?}", info)));
        }
        self.shared.lock().clock = Some(info);
        Ok(())
    }
}

impl Drop for HostPipeline {
    fn drop(&mut self) {
        if self.worker_alive() {
            self.shared.lock().command = Command::Stop;
            self.shared.wake.notify_all();
        }
        let _ = self.join_worker();
    }
}

/// Parse a canonical 44-byte RIFF/WAVE header
fn parse_wav_header(header: &[u8]) -> Option<MusicInfo> {
    if header.len() < WAV_HEADER_LEN || &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return None;
    }
    let channels = u16::from_le_bytes([header[22], header[23]]);
    let sample_rate = u32::from_le_bytes([header[24], header[25], header[26], header[27]]);
    let bits = u16::from_le_bytes([header[34], header[35]]);
    Some(MusicInfo {
        sample_rate,
        bits,
        channels,
    })
}

/// Decoder stage: move bytes from the source into the ring
fn decode_into_ring(inner: &mut Inner, config: &HostConfig, scratch: &mut [u8]) {
    while !inner.source_done && inner.ring.vacant_len() >= config.read_chunk + WAV_HEADER_LEN {
        let Some(source) = inner.source.as_mut() else {
            inner.source_done = true;
            break;
        };
        let n = match source.read(scratch) {
            ReadOutcome::Data(n) => n,
            ReadOutcome::Done => {
                inner.source_done = true;
                0
            }
        };

        let mut pcm: &[u8] = &scratch[..n];
        let mut flushed = Vec::new();
        if let HeaderState::Pending(pending) = &mut inner.header {
            let take = (WAV_HEADER_LEN - pending.len()).min(pcm.len());
            pending.extend_from_slice(&pcm[..take]);
            pcm = &pcm[take..];

            if pending.len() == WAV_HEADER_LEN || inner.source_done {
                let info = match parse_wav_header(pending) {
                    Some(info) => info,
                    None => {
                        // Headerless stream: everything collected so far is PCM
                        flushed = std::mem::take(pending);
                        config.default_clock
                    }
                };
                info!(
                    "Decoder reports music info: sample_rate={}, bits={}, ch={}",
                    info.sample_rate, info.bits, info.channels
                );
                inner.header = HeaderState::Parsed;
                inner.emit(PipelineStatus::MusicInfo(info));
            }
        }

        inner.ring.push_slice(&flushed);
        inner.ring.push_slice(pcm);

        if n == 0 {
            break;
        }
    }
}

/// Output stage: drain one tick worth of bytes at the configured clock
fn output_tick(inner: &mut Inner, config: &HostConfig, sink: &mut [u8]) {
    let clock = inner.clock.unwrap_or(config.default_clock);
    let budget = (clock.byte_rate() as u128 * config.tick.as_micros() / 1_000_000).max(1) as usize;
    let mut remaining = budget;
    while remaining > 0 {
        let want = remaining.min(sink.len());
        let got = inner.ring.pop_slice(&mut sink[..want]);
        if got == 0 {
            break;
        }
        inner.bytes_played += got as u64;
        remaining -= got;
    }
}

fn worker_loop(shared: Arc<Shared>, config: HostConfig) {
    debug!("Pipeline worker started");
    let mut scratch = vec![0u8; config.read_chunk];
    let mut sink = vec![0u8; config.read_chunk];
    let mut inner = shared.lock();

    loop {
        while inner.command == Command::Pause {
            inner = shared
                .wake
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if inner.command == Command::Stop {
            inner.set_state(ElementState::Stopped);
            break;
        }

        decode_into_ring(&mut inner, &config, &mut scratch);
        output_tick(&mut inner, &config, &mut sink);

        if inner.source_done && inner.ring.is_empty() {
            info!("Source exhausted after {} bytes", inner.bytes_played);
            inner.set_state(ElementState::Finished);
            break;
        }

        inner = shared
            .wake
            .wait_timeout(inner, config.tick)
            .map(|(guard, _)| guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner().0);
    }

    debug!("Pipeline worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wav_header() {
        let asset = include_bytes!("../../assets/music_16b_2c_8000hz.wav");
        let info = parse_wav_header(asset).unwrap();
        assert_eq!(
            info,
            MusicInfo {
                sample_rate: 8000,
                bits: 16,
                channels: 2
            }
        );
    }

    #[test]
    fn test_parse_rejects_headerless() {
        assert!(parse_wav_header(&[0u8; 64]).is_none());
        assert!(parse_wav_header(b"RIFF").is_none());
    }

    #[test]
    fn test_link_requires_decoder_then_output() {
        let mut pipeline = HostPipeline::default();
        pipeline.register(ElementKind::Decoder, "mp3").unwrap();
        pipeline.register(ElementKind::Output, "i2s").unwrap();

        assert!(pipeline.link(&["i2s", "mp3"]).is_err());
        assert!(pipeline.link(&["mp3", "wav"]).is_err());
        pipeline.link(&["mp3", "i2s"]).unwrap();
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let mut pipeline = HostPipeline::default();
        pipeline.register(ElementKind::Decoder, "mp3").unwrap();
        assert!(pipeline.register(ElementKind::Output, "mp3").is_err());
    }

    #[test]
    fn test_run_without_source_fails() {
        let mut pipeline = HostPipeline::default();
        pipeline.register(ElementKind::Decoder, "mp3").unwrap();
        pipeline.register(ElementKind::Output, "i2s").unwrap();
        pipeline.link(&["mp3", "i2s"]).unwrap();

        assert!(matches!(pipeline.run(), Err(Error::Pipeline(_))));
        assert_eq!(pipeline.state(), ElementState::Init);
    }

    #[test]
    fn test_set_clock_validates_target_and_format() {
        let mut pipeline = HostPipeline::default();
        pipeline.register(ElementKind::Decoder, "mp3").unwrap();
        pipeline.register(ElementKind::Output, "i2s").unwrap();

        let info = MusicInfo {
            sample_rate: 22050,
            bits: 16,
            channels: 2,
        };
        assert!(pipeline.set_clock("mp3", info).is_err());
        assert!(pipeline
            .set_clock(
                "i2s",
                MusicInfo {
                    bits: 12,
                    ..info
                }
            )
            .is_err());
        pipeline.set_clock("i2s", info).unwrap();
        assert_eq!(pipeline.clock(), Some(info));
    }
}
