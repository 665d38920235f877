use std::sync::Arc;
use std::thread;

use crate::models::config::AudioConfig;
use crate::models::error::{LoopbackError, LoopbackResult};
use crate::models::format::ResolvedFormat;
use crate::models::route::RouteStatus;
use crate::models::state::{LoopDiagnostics, LoopState};
use crate::processing::format_resolver::{AudioFormatResolver, ResolutionPolicy};
use crate::processing::gain::GainProcessor;
use crate::route_monitor::RouteMonitor;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::platform::AudioPlatform;
use crate::traits::render_device::RenderDevice;
use crate::traits::route_sink::RouteChangeSink;

use super::block_loop::{CaptureRenderLoop, LoopExit, LoopShared};

/// Device pair and parameters held between `init` and `start`.
struct OpenedSession {
    capture: Box<dyn CaptureDevice>,
    render: Box<dyn RenderDevice>,
    gain: GainProcessor,
    monitor_route: bool,
}

/// Host-facing facade for one live loopback stream at a time.
///
/// Data flow:
/// ```text
/// [CaptureDevice] → read block → [GainProcessor] → write block → [RenderDevice]
///                        ↑
///                  [RouteMonitor] polled once per block
/// ```
///
/// The block loop runs on its own thread. `start` only launches it and `stop`
/// only flags it to end; neither waits on the stream.
pub struct LoopbackController {
    platform: Arc<dyn AudioPlatform>,
    monitor: RouteMonitor,
    resolver: AudioFormatResolver,
    sink: Option<Arc<dyn RouteChangeSink>>,
    shared: Arc<LoopShared>,
    opened: Option<OpenedSession>,
    format: Option<ResolvedFormat>,
    session_id: Option<String>,
    loop_handle: Option<thread::JoinHandle<LoopExit>>,
}

impl LoopbackController {
    pub fn new(platform: Arc<dyn AudioPlatform>) -> Self {
        Self {
            monitor: RouteMonitor::new(Arc::clone(&platform)),
            platform,
            resolver: AudioFormatResolver::default(),
            sink: None,
            shared: Arc::new(LoopShared::new()),
            opened: None,
            format: None,
            session_id: None,
            loop_handle: None,
        }
    }

    /// Use strict option validation instead of the permissive default.
    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.resolver = AudioFormatResolver::new(policy);
        self
    }

    /// Register the receiver of route-change events. Applies from the next `start`.
    pub fn set_sink(&mut self, sink: Arc<dyn RouteChangeSink>) {
        self.sink = Some(sink);
    }

    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    pub fn diagnostics(&self) -> LoopDiagnostics {
        self.shared.diagnostics()
    }

    /// Format resolved by the last successful `init`.
    pub fn resolved_format(&self) -> Option<ResolvedFormat> {
        self.format
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Resolve the format and open a fresh capture/render pair.
    ///
    /// Any previous session is stopped and its loop joined first, so stale
    /// devices are released before new ones are opened.
    pub fn init(&mut self, config: AudioConfig) -> LoopbackResult<()> {
        if self.shared.request_stop() {
            log::info!("init while streaming, stopping previous session");
        }
        self.join();
        if self.opened.take().is_some() {
            log::debug!("released previously opened devices");
        }
        self.format = None;
        self.session_id = None;
        self.shared.set_state(LoopState::Idle);
        self.shared.reset_diagnostics();

        let format = self.resolver.resolve_with(&config, self.platform.as_ref())?;

        let capture = self.platform.open_capture(&format, config.audio_source)?;
        let mut render = self.platform.open_render(&format)?;

        if let Err(e) = render.set_volume(1.0) {
            log::warn!("failed to set render volume: {}", e);
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        log::info!(
            "[{}] initialized: {} Hz, {:?}, {:?}, block {} bytes, capture allocation {} bytes",
            session_id,
            format.sample_rate_hz,
            format.input_layout,
            format.encoding,
            format.capture_buffer_bytes,
            format.capture_allocation_bytes()
        );

        self.opened = Some(OpenedSession {
            capture,
            render,
            gain: GainProcessor::new(config.gain_factor),
            monitor_route: config.monitor_external_output,
        });
        self.format = Some(format);
        self.session_id = Some(session_id);
        self.shared.set_state(LoopState::Opened);
        Ok(())
    }

    /// Start both devices and launch the block loop on its own thread.
    ///
    /// Fails with `NotInitialized` unless `init` succeeded since the last
    /// session ended. A call while already streaming is ignored.
    pub fn start(&mut self) -> LoopbackResult<()> {
        let Some(mut opened) = self.opened.take() else {
            if self.shared.state().is_streaming() {
                log::warn!("start ignored: already streaming");
                return Ok(());
            }
            return Err(LoopbackError::NotInitialized);
        };
        let (Some(format), Some(session_id)) = (self.format, self.session_id.clone()) else {
            return Err(LoopbackError::NotInitialized);
        };

        if let Err(e) = opened.capture.start() {
            self.shared.set_state(LoopState::Idle);
            return Err(e);
        }
        if let Err(e) = opened.render.start() {
            if let Err(stop_err) = opened.capture.stop() {
                log::error!("[{}] failed to stop capture device: {}", session_id, stop_err);
            }
            self.shared.set_state(LoopState::Idle);
            return Err(e);
        }

        let block_loop = CaptureRenderLoop::new(
            opened.capture,
            opened.render,
            opened.gain,
            format.encoding,
            format.capture_buffer_bytes,
            opened.monitor_route.then(|| self.monitor.clone()),
            self.sink.clone(),
            session_id.clone(),
            Arc::clone(&self.shared),
        );

        self.shared.begin_streaming();
        let handle = thread::Builder::new()
            .name("audio-loopback".into())
            .spawn(move || block_loop.run())
            .map_err(|e| {
                self.shared.request_stop();
                self.shared.set_state(LoopState::Idle);
                LoopbackError::Unknown(format!("failed to spawn loop thread: {}", e))
            })?;

        self.loop_handle = Some(handle);
        log::info!("[{}] streaming started", session_id);
        Ok(())
    }

    /// Ask the stream to end. Always succeeds and never waits for the loop.
    ///
    /// Before `start`, releases the opened devices. When idle, does nothing.
    pub fn stop(&mut self) {
        if self.shared.request_stop() {
            log::info!("stop requested");
        } else if self.opened.take().is_some() {
            self.shared.set_state(LoopState::Idle);
            log::info!("stop before start, released devices");
        }
    }

    /// Synchronous route query, independent of streaming state.
    pub fn query_external_route(&self) -> RouteStatus {
        self.monitor.current_route()
    }

    pub fn is_external_audio_output_connected(&self) -> bool {
        self.query_external_route().attached
    }

    /// Block until the current loop thread, if any, has exited.
    ///
    /// Does not request a stop by itself.
    pub fn join(&mut self) -> Option<LoopExit> {
        let handle = self.loop_handle.take()?;
        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                log::error!("loop thread panicked");
                self.shared.set_state(LoopState::Idle);
                Some(LoopExit::Failed(LoopbackError::Unknown("loop thread panicked".into())))
            }
        }
    }
}

impl Drop for LoopbackController {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}
