use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::LoopbackError;
use crate::models::format::SampleEncoding;
use crate::models::route::RouteChangeEvent;
use crate::models::state::{LoopDiagnostics, LoopState};
use crate::processing::gain::GainProcessor;
use crate::route_monitor::RouteMonitor;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::render_device::RenderDevice;
use crate::traits::route_sink::RouteChangeSink;

/// Non-empty blocks discarded at the start of every session.
pub const WARMUP_BLOCKS: u64 = 2;

/// Lock-free counters behind [`LoopDiagnostics`].
#[derive(Default)]
pub(crate) struct DiagnosticCounters {
    blocks_read: AtomicU64,
    blocks_skipped: AtomicU64,
    empty_reads: AtomicU64,
    blocks_rendered: AtomicU64,
    bytes_rendered: AtomicU64,
    route_checks: AtomicU64,
}

impl DiagnosticCounters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LoopDiagnostics {
        LoopDiagnostics {
            blocks_read: self.blocks_read.load(Ordering::Relaxed),
            blocks_skipped: self.blocks_skipped.load(Ordering::Relaxed),
            empty_reads: self.empty_reads.load(Ordering::Relaxed),
            blocks_rendered: self.blocks_rendered.load(Ordering::Relaxed),
            bytes_rendered: self.bytes_rendered.load(Ordering::Relaxed),
            route_checks: self.route_checks.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.blocks_read,
            &self.blocks_skipped,
            &self.empty_reads,
            &self.blocks_rendered,
            &self.bytes_rendered,
            &self.route_checks,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// State shared between the controller and the loop thread.
///
/// The loop's hot path only touches atomics; `state` is locked on
/// transitions.
pub(crate) struct LoopShared {
    running: AtomicBool,
    state: Mutex<LoopState>,
    diagnostics: DiagnosticCounters,
}

impl LoopShared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            state: Mutex::new(LoopState::Idle),
            diagnostics: DiagnosticCounters::default(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> LoopState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: LoopState) {
        *self.state.lock() = state;
    }

    pub(crate) fn diagnostics(&self) -> LoopDiagnostics {
        self.diagnostics.snapshot()
    }

    pub(crate) fn reset_diagnostics(&self) {
        self.diagnostics.reset();
    }

    pub(crate) fn begin_streaming(&self) {
        self.running.store(true, Ordering::Release);
        self.set_state(LoopState::Streaming);
    }

    /// Clears the running flag. Returns true if the session was streaming.
    pub(crate) fn request_stop(&self) -> bool {
        self.running.store(false, Ordering::Release);
        let mut state = self.state.lock();
        if state.is_streaming() {
            *state = LoopState::Stopping;
            true
        } else {
            false
        }
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
        self.set_state(LoopState::Idle);
    }
}

/// Why the block loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The running flag was cleared by `stop`.
    Stopped,
    /// Route monitoring found no external output.
    RouteLost,
    /// A capture read or render write failed.
    Failed(LoopbackError),
}

/// The read → gain → write cycle for one session.
///
/// Owns both devices for the lifetime of the stream and tears them down when
/// the loop exits.
pub struct CaptureRenderLoop {
    capture: Box<dyn CaptureDevice>,
    render: Box<dyn RenderDevice>,
    gain: GainProcessor,
    encoding: SampleEncoding,
    block_bytes: usize,
    monitor: Option<RouteMonitor>,
    sink: Option<Arc<dyn RouteChangeSink>>,
    session_id: String,
    shared: Arc<LoopShared>,
}

impl CaptureRenderLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        capture: Box<dyn CaptureDevice>,
        render: Box<dyn RenderDevice>,
        gain: GainProcessor,
        encoding: SampleEncoding,
        block_bytes: usize,
        monitor: Option<RouteMonitor>,
        sink: Option<Arc<dyn RouteChangeSink>>,
        session_id: String,
        shared: Arc<LoopShared>,
    ) -> Self {
        Self {
            capture,
            render,
            gain,
            encoding,
            block_bytes,
            monitor,
            sink,
            session_id,
            shared,
        }
    }

    /// Runs until stopped, the route is lost, or a device fails.
    pub fn run(mut self) -> LoopExit {
        let mut buffer = vec![0u8; self.block_bytes];
        let mut warmup_remaining = WARMUP_BLOCKS;

        log::info!("[{}] loop started, block {} bytes", self.session_id, self.block_bytes);

        let exit = loop {
            if !self.shared.is_running() {
                break LoopExit::Stopped;
            }

            if let Some(ref monitor) = self.monitor {
                DiagnosticCounters::bump(&self.shared.diagnostics.route_checks, 1);
                if !monitor.is_external_output_attached() {
                    log::warn!("[{}] external output detached, stopping", self.session_id);
                    self.shared.request_stop();
                    if let Some(ref sink) = self.sink {
                        sink.notify(&RouteChangeEvent::unplugged(&self.session_id));
                    }
                    break LoopExit::RouteLost;
                }
            }

            let read = match self.capture.read(&mut buffer) {
                Ok(n) => n.min(buffer.len()),
                Err(e) => {
                    log::error!("[{}] capture read failed: {}", self.session_id, e);
                    self.shared.request_stop();
                    break LoopExit::Failed(e);
                }
            };

            if read == 0 {
                DiagnosticCounters::bump(&self.shared.diagnostics.empty_reads, 1);
                continue;
            }
            DiagnosticCounters::bump(&self.shared.diagnostics.blocks_read, 1);

            if warmup_remaining > 0 {
                warmup_remaining -= 1;
                DiagnosticCounters::bump(&self.shared.diagnostics.blocks_skipped, 1);
                log::debug!("[{}] skipped warm-up block of {} bytes", self.session_id, read);
                continue;
            }

            let block = &mut buffer[..read];
            self.gain.apply(self.encoding, block);

            if let Err(e) = self.render.write(block) {
                log::error!("[{}] render write failed: {}", self.session_id, e);
                self.shared.request_stop();
                break LoopExit::Failed(e);
            }

            DiagnosticCounters::bump(&self.shared.diagnostics.blocks_rendered, 1);
            DiagnosticCounters::bump(&self.shared.diagnostics.bytes_rendered, read as u64);
        };

        log::info!("[{}] loop exited: {:?}", self.session_id, exit);
        self.teardown();
        exit
    }

    /// Best-effort device shutdown; failures are logged, never returned.
    ///
    /// Both devices are released before the session reports `Idle`.
    fn teardown(self) {
        let Self {
            mut capture,
            mut render,
            session_id,
            shared,
            ..
        } = self;

        if let Err(e) = capture.stop() {
            log::error!("[{}] failed to stop capture device: {}", session_id, e);
        }
        if let Err(e) = render.stop() {
            log::error!("[{}] failed to stop render device: {}", session_id, e);
        }
        drop(capture);
        drop(render);
        shared.finish();
    }
}
