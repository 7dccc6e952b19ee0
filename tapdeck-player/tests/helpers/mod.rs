//! Test helpers for tapdeck-player integration tests
//!
//! Provides recording stand-ins for the pipeline engine and the codec, plus
//! a small track set with easily recognisable contents:
//! - MockPipeline: logs every engine call, tracks a simple lifecycle, keeps
//!   the installed read source for inspection
//! - MockCodec: logs every volume write
//! - scenario_tracks: three tracks of 100, 50 and 200 bytes

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tapdeck_common::events::{ControlEvent, ElementState, MusicInfo};
use tapdeck_player::error::{Error, Result};
use tapdeck_player::pipeline::{AudioCodec, ByteSource, ElementKind, PipelineEngine, ReadOutcome};
use tapdeck_player::playback::{RateTier, TrackDescriptor, TrackSet};
use tokio::sync::mpsc::UnboundedSender;

pub static T0: [u8; 100] = [0xA0; 100];
pub static T1: [u8; 50] = [0xA1; 50];
pub static T2: [u8; 200] = [0xA2; 200];

pub fn scenario_tracks() -> TrackSet {
    TrackSet::new(vec![
        TrackDescriptor::new(RateTier::Low, &T0),
        TrackDescriptor::new(RateTier::Medium, &T1),
        TrackDescriptor::new(RateTier::High, &T2),
    ])
    .unwrap()
}

/// Everything the mock pipeline has observed
#[derive(Default)]
pub struct PipelineLog {
    pub calls: Vec<String>,
    pub state: Option<ElementState>,
    pub source: Option<Box<dyn ByteSource>>,
    pub sources_installed: usize,
    pub clock: Option<MusicInfo>,
    pub listener: Option<UnboundedSender<ControlEvent>>,
    /// Engine call that fails with a pipeline error
    pub fail_on: Option<&'static str>,
}

/// Recording [`PipelineEngine`]; clones share one log
#[derive(Clone, Default)]
pub struct MockPipeline {
    log: Arc<Mutex<PipelineLog>>,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().calls.clear();
    }

    /// Force the lifecycle state the controller will observe
    pub fn force_state(&self, state: ElementState) {
        self.log.lock().unwrap().state = Some(state);
    }

    pub fn fail_on(&self, call: &'static str) {
        self.log.lock().unwrap().fail_on = Some(call);
    }

    pub fn sources_installed(&self) -> usize {
        self.log.lock().unwrap().sources_installed
    }

    pub fn clock(&self) -> Option<MusicInfo> {
        self.log.lock().unwrap().clock
    }

    pub fn has_listener(&self) -> bool {
        self.log.lock().unwrap().listener.is_some()
    }

    /// One read of at most `chunk` bytes from the installed read source
    pub fn read_source(&self, chunk: usize) -> Vec<u8> {
        let mut log = self.log.lock().unwrap();
        let source = log.source.as_mut().expect("no read source installed");
        let mut buf = vec![0u8; chunk];
        match source.read(&mut buf) {
            ReadOutcome::Data(n) => buf[..n].to_vec(),
            ReadOutcome::Done => Vec::new(),
        }
    }

    /// Drain the installed read source with `chunk`-sized reads
    ///
    /// Returns every byte delivered before `Done`.
    pub fn drain_source(&self, chunk: usize) -> Vec<u8> {
        let mut log = self.log.lock().unwrap();
        let source = log.source.as_mut().expect("no read source installed");
        let mut buf = vec![0u8; chunk];
        let mut out = Vec::new();
        while let ReadOutcome::Data(n) = source.read(&mut buf) {
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    fn record(&self, call: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(call.to_string());
        if log.fail_on == Some(call_name(call)) {
            return Err(Error::Pipeline(format!("{} failed", call)));
        }
        Ok(())
    }

    fn set(&self, state: ElementState) {
        self.log.lock().unwrap().state = Some(state);
    }
}

fn call_name(call: &str) -> &str {
    call.split('(').next().unwrap_or(call)
}

impl PipelineEngine for MockPipeline {
    fn register(&mut self, kind: ElementKind, tag: &str) -> Result<()> {
        self.record(&format!("register({:?},{})", kind, tag))
    }

    fn unregister(&mut self, tag: &str) -> Result<()> {
        self.record(&format!("unregister({})", tag))
    }

    fn link(&mut self, tags: &[&str]) -> Result<()> {
        self.record(&format!("link({})", tags.join(",")))
    }

    fn set_read_source(&mut self, tag: &str, source: Box<dyn ByteSource>) -> Result<()> {
        self.record(&format!("set_read_source({})", tag))?;
        let mut log = self.log.lock().unwrap();
        log.source = Some(source);
        log.sources_installed += 1;
        Ok(())
    }

    fn set_listener(&mut self, listener: UnboundedSender<ControlEvent>) -> Result<()> {
        self.record("set_listener")?;
        self.log.lock().unwrap().listener = Some(listener);
        Ok(())
    }

    fn remove_listener(&mut self) -> Result<()> {
        self.record("remove_listener")?;
        self.log.lock().unwrap().listener = None;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.record("run")?;
        self.set(ElementState::Running);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record("pause")?;
        self.set(ElementState::Paused);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.record("resume")?;
        self.set(ElementState::Running);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record("stop")
    }

    fn wait_for_stop(&mut self) -> Result<()> {
        self.record("wait_for_stop")?;
        self.set(ElementState::Stopped);
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.record("terminate")
    }

    fn reset_ringbuffer(&mut self) -> Result<()> {
        self.record("reset_ringbuffer")
    }

    fn reset_elements(&mut self) -> Result<()> {
        self.record("reset_elements")?;
        self.set(ElementState::Init);
        Ok(())
    }

    fn change_state(&mut self, target: ElementState) -> Result<()> {
        self.record(&format!("change_state({})", target))?;
        self.set(target);
        Ok(())
    }

    fn state(&self) -> ElementState {
        self.log.lock().unwrap().state.unwrap_or(ElementState::Init)
    }

    fn set_clock(&mut self, tag: &str, info: MusicInfo) -> Result<()> {
        self.record(&format!("set_clock({})", tag))?;
        self.log.lock().unwrap().clock = Some(info);
        Ok(())
    }
}

/// Recording [`AudioCodec`]; clones share one log
#[derive(Clone)]
pub struct MockCodec {
    volume: Arc<Mutex<u8>>,
    writes: Arc<Mutex<Vec<u8>>>,
}

impl MockCodec {
    pub fn with_volume(volume: u8) -> Self {
        Self {
            volume: Arc::new(Mutex::new(volume)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every value written through `set_volume`, in order
    pub fn writes(&self) -> Vec<u8> {
        self.writes.lock().unwrap().clone()
    }
}

impl AudioCodec for MockCodec {
    fn volume(&self) -> Result<u8> {
        Ok(*self.volume.lock().unwrap())
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.writes.lock().unwrap().push(volume);
        *self.volume.lock().unwrap() = volume;
        Ok(())
    }
}
