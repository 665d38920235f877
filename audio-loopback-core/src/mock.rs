//! In-memory audio platform.
//!
//! Capture reads are scripted, render writes are recorded, and the output
//! device list can be changed at any time. Used by this crate's tests and by
//! hosts that want to exercise the loopback controller without hardware.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::AudioSourceKind;
use crate::models::error::{LoopbackError, LoopbackResult};
use crate::models::format::{ChannelLayout, ResolvedFormat, SampleEncoding};
use crate::models::route::OutputDevice;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::platform::AudioPlatform;
use crate::traits::render_device::RenderDevice;

/// Pause taken by an unscripted read so the loop can observe its stop flag.
const IDLE_READ_DELAY: Duration = Duration::from_millis(1);

/// One scripted outcome of [`CaptureDevice::read`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockRead {
    /// Deliver these bytes (truncated to the caller's buffer).
    Data(Vec<u8>),
    /// Return `Ok(0)`.
    Empty,
    /// Return a transient I/O error.
    Error(String),
    /// Remove the output device with this id, then return `Ok(0)`.
    DetachRoute(String),
}

/// Everything the mock devices did, for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    pub capture_opens: usize,
    pub render_opens: usize,
    pub live_captures: usize,
    pub live_renders: usize,
    pub capture_starts: usize,
    pub capture_stops: usize,
    pub render_starts: usize,
    pub render_stops: usize,
    pub last_source: Option<AudioSourceKind>,
    pub last_format: Option<ResolvedFormat>,
    pub volume: Option<f32>,
    pub rendered: Vec<Vec<u8>>,
}

#[derive(Default)]
struct Faults {
    open_capture: Option<LoopbackError>,
    open_render: Option<LoopbackError>,
    start_render: Option<LoopbackError>,
    stop: Option<LoopbackError>,
}

/// Scriptable [`AudioPlatform`].
pub struct MockPlatform {
    min_buffer_bytes: usize,
    rejected_rates: HashSet<u32>,
    outputs: Arc<Mutex<Option<Vec<OutputDevice>>>>,
    script: Arc<Mutex<VecDeque<MockRead>>>,
    log: Arc<Mutex<MockLog>>,
    faults: Arc<Mutex<Faults>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            min_buffer_bytes: 2048,
            rejected_rates: HashSet::new(),
            outputs: Arc::new(Mutex::new(Some(Vec::new()))),
            script: Arc::new(Mutex::new(VecDeque::new())),
            log: Arc::new(Mutex::new(MockLog::default())),
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    pub fn with_min_buffer_bytes(mut self, bytes: usize) -> Self {
        self.min_buffer_bytes = bytes;
        self
    }

    /// Make `min_capture_buffer_bytes` reject this sample rate.
    pub fn reject_sample_rate(mut self, rate: u32) -> Self {
        self.rejected_rates.insert(rate);
        self
    }

    /// Report no output enumeration capability.
    pub fn without_enumeration(self) -> Self {
        *self.outputs.lock() = None;
        self
    }

    pub fn with_output(self, device: OutputDevice) -> Self {
        self.attach(device);
        self
    }

    pub fn min_buffer_bytes(&self) -> usize {
        self.min_buffer_bytes
    }

    pub fn attach(&self, device: OutputDevice) {
        self.outputs.lock().get_or_insert_with(Vec::new).push(device);
    }

    pub fn detach(&self, id: &str) {
        detach_output(&self.outputs, id);
    }

    /// Queue capture read outcomes, consumed in order by any open capture device.
    pub fn script(&self, reads: impl IntoIterator<Item = MockRead>) {
        self.script.lock().extend(reads);
    }

    pub fn remaining_reads(&self) -> usize {
        self.script.lock().len()
    }

    pub fn fail_open_capture(&self, error: LoopbackError) {
        self.faults.lock().open_capture = Some(error);
    }

    pub fn fail_open_render(&self, error: LoopbackError) {
        self.faults.lock().open_render = Some(error);
    }

    pub fn fail_start_render(&self, error: LoopbackError) {
        self.faults.lock().start_render = Some(error);
    }

    /// Make every device `stop` fail with this error.
    pub fn fail_stop(&self, error: LoopbackError) {
        self.faults.lock().stop = Some(error);
    }

    pub fn log(&self) -> MockLog {
        self.log.lock().clone()
    }

    pub fn rendered(&self) -> Vec<Vec<u8>> {
        self.log.lock().rendered.clone()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlatform for MockPlatform {
    fn min_capture_buffer_bytes(
        &self,
        sample_rate_hz: u32,
        _layout: ChannelLayout,
        _encoding: SampleEncoding,
    ) -> LoopbackResult<usize> {
        if self.rejected_rates.contains(&sample_rate_hz) {
            return Err(LoopbackError::InvalidConfig(format!(
                "platform rejected sample rate {}",
                sample_rate_hz
            )));
        }
        Ok(self.min_buffer_bytes)
    }

    fn open_capture(
        &self,
        format: &ResolvedFormat,
        source: AudioSourceKind,
    ) -> LoopbackResult<Box<dyn CaptureDevice>> {
        if let Some(err) = self.faults.lock().open_capture.clone() {
            return Err(err);
        }
        {
            let mut log = self.log.lock();
            log.capture_opens += 1;
            log.live_captures += 1;
            log.last_source = Some(source);
            log.last_format = Some(*format);
        }
        Ok(Box::new(MockCaptureDevice {
            script: Arc::clone(&self.script),
            outputs: Arc::clone(&self.outputs),
            log: Arc::clone(&self.log),
            faults: Arc::clone(&self.faults),
        }))
    }

    fn open_render(&self, _format: &ResolvedFormat) -> LoopbackResult<Box<dyn RenderDevice>> {
        if let Some(err) = self.faults.lock().open_render.clone() {
            return Err(err);
        }
        {
            let mut log = self.log.lock();
            log.render_opens += 1;
            log.live_renders += 1;
        }
        Ok(Box::new(MockRenderDevice {
            log: Arc::clone(&self.log),
            faults: Arc::clone(&self.faults),
        }))
    }

    fn output_devices(&self) -> Option<Vec<OutputDevice>> {
        self.outputs.lock().clone()
    }
}

fn detach_output(outputs: &Mutex<Option<Vec<OutputDevice>>>, id: &str) {
    if let Some(devices) = outputs.lock().as_mut() {
        devices.retain(|d| d.id != id);
    }
}

struct MockCaptureDevice {
    script: Arc<Mutex<VecDeque<MockRead>>>,
    outputs: Arc<Mutex<Option<Vec<OutputDevice>>>>,
    log: Arc<Mutex<MockLog>>,
    faults: Arc<Mutex<Faults>>,
}

impl CaptureDevice for MockCaptureDevice {
    fn start(&mut self) -> LoopbackResult<()> {
        self.log.lock().capture_starts += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> LoopbackResult<usize> {
        let next = self.script.lock().pop_front();
        match next {
            Some(MockRead::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(MockRead::Empty) => Ok(0),
            Some(MockRead::Error(message)) => Err(LoopbackError::TransientIo(message)),
            Some(MockRead::DetachRoute(id)) => {
                detach_output(&self.outputs, &id);
                Ok(0)
            }
            None => {
                thread::sleep(IDLE_READ_DELAY);
                Ok(0)
            }
        }
    }

    fn stop(&mut self) -> LoopbackResult<()> {
        self.log.lock().capture_stops += 1;
        match self.faults.lock().stop.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for MockCaptureDevice {
    fn drop(&mut self) {
        self.log.lock().live_captures -= 1;
    }
}

struct MockRenderDevice {
    log: Arc<Mutex<MockLog>>,
    faults: Arc<Mutex<Faults>>,
}

impl RenderDevice for MockRenderDevice {
    fn start(&mut self) -> LoopbackResult<()> {
        if let Some(err) = self.faults.lock().start_render.clone() {
            return Err(err);
        }
        self.log.lock().render_starts += 1;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> LoopbackResult<usize> {
        self.log.lock().rendered.push(data.to_vec());
        Ok(data.len())
    }

    fn stop(&mut self) -> LoopbackResult<()> {
        self.log.lock().render_stops += 1;
        match self.faults.lock().stop.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_volume(&mut self, volume: f32) -> LoopbackResult<()> {
        self.log.lock().volume = Some(volume);
        Ok(())
    }
}

impl Drop for MockRenderDevice {
    fn drop(&mut self) {
        self.log.lock().live_renders -= 1;
    }
}
