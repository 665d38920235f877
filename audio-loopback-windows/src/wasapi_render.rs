//! WASAPI render device.
//!
//! `write` queues processed blocks into a ring buffer; a render thread moves
//! whatever is queued into the endpoint buffer as space frees up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Threading::*;

use audio_loopback_core::models::error::{LoopbackError, LoopbackResult};
use audio_loopback_core::models::format::ResolvedFormat;
use audio_loopback_core::processing::ring_buffer::BlockingRingBuffer;
use audio_loopback_core::traits::render_device::RenderDevice;

use crate::com::ComScope;
use crate::device_enumerator::DeviceEnumerator;
use crate::error::WasapiError;
use crate::stream::{open_shared_client, pcm_wave_format};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Blocks queued ahead of the endpoint.
const QUEUE_BLOCKS: usize = 2;

/// WASAPI playback of processed blocks on the default console endpoint.
pub struct WasapiRenderDevice {
    device_id: Option<String>,
    format: ResolvedFormat,
    queue: Arc<BlockingRingBuffer>,
    running: Arc<AtomicBool>,
    volume: Arc<Mutex<f32>>,
    failure: Arc<Mutex<Option<String>>>,
    render_handle: Option<thread::JoinHandle<()>>,
}

impl WasapiRenderDevice {
    pub fn new(device_id: Option<String>, format: ResolvedFormat) -> Self {
        Self {
            device_id,
            format,
            queue: Arc::new(BlockingRingBuffer::new(format.render_buffer_bytes * QUEUE_BLOCKS)),
            running: Arc::new(AtomicBool::new(false)),
            volume: Arc::new(Mutex::new(1.0)),
            failure: Arc::new(Mutex::new(None)),
            render_handle: None,
        }
    }
}

impl RenderDevice for WasapiRenderDevice {
    fn start(&mut self) -> LoopbackResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.queue.reset();
        *self.failure.lock() = None;
        self.running.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = mpsc::channel();
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let volume = Arc::clone(&self.volume);
        let failure = Arc::clone(&self.failure);
        let device_id = self.device_id.clone();
        let format = self.format;

        let handle = thread::Builder::new()
            .name("wasapi-render".into())
            .spawn(move || {
                let result = render_loop(&running, device_id.as_deref(), &format, &queue, &volume, &ready_tx);
                if let Err(e) = result {
                    log::error!("Render thread error: {}", e);
                    *failure.lock() = Some(e.to_string());
                    let _ = ready_tx.send(Err(LoopbackError::from(e)));
                }
                running.store(false, Ordering::SeqCst);
                queue.close();
            })
            .map_err(|e| LoopbackError::Unknown(format!("failed to spawn render thread: {}", e)))?;
        self.render_handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.stop().ok();
                Err(e)
            }
            Err(_) => {
                self.stop().ok();
                Err(LoopbackError::DeviceUnavailable("render thread exited".into()))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> LoopbackResult<usize> {
        let written = self.queue.write_block(data);
        if written < data.len() {
            let reason = self
                .failure
                .lock()
                .take()
                .unwrap_or_else(|| WasapiError::Closed.to_string());
            return Err(LoopbackError::TransientIo(reason));
        }
        Ok(written)
    }

    fn stop(&mut self) -> LoopbackResult<()> {
        self.running.store(false, Ordering::SeqCst);
        self.queue.close();
        if let Some(handle) = self.render_handle.take() {
            handle
                .join()
                .map_err(|_| LoopbackError::Teardown("render thread panicked".into()))?;
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> LoopbackResult<()> {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
        Ok(())
    }
}

impl Drop for WasapiRenderDevice {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn render_loop(
    running: &AtomicBool,
    device_id: Option<&str>,
    format: &ResolvedFormat,
    queue: &BlockingRingBuffer,
    volume: &Mutex<f32>,
    ready: &mpsc::Sender<LoopbackResult<()>>,
) -> Result<(), WasapiError> {
    let _com = ComScope::enter()?;

    let enumerator = DeviceEnumerator::new()?;
    let device = enumerator.endpoint(eRender, eConsole, device_id)?;

    let wave = pcm_wave_format(format, format.output_layout);
    let client = open_shared_client(&device, &wave, format.render_buffer_bytes * QUEUE_BLOCKS)?;
    let frame_bytes = wave.nBlockAlign as usize;

    unsafe {
        let render_client: IAudioRenderClient = client
            .GetService()
            .map_err(|e| WasapiError::call("IAudioClient::GetService", e))?;
        let session_volume: ISimpleAudioVolume = client
            .GetService()
            .map_err(|e| WasapiError::call("IAudioClient::GetService(ISimpleAudioVolume)", e))?;

        let buffer_frames = client
            .GetBufferSize()
            .map_err(|e| WasapiError::call("GetBufferSize", e))?;

        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        let _mmcss_handle = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index);

        let mut applied_volume = f32::NAN;
        let mut staging = vec![0u8; buffer_frames as usize * frame_bytes];

        client
            .Start()
            .map_err(|e| WasapiError::call("IAudioClient::Start", e))?;
        let _ = ready.send(Ok(()));

        while running.load(Ordering::SeqCst) {
            let wanted = *volume.lock();
            if wanted != applied_volume {
                session_volume
                    .SetMasterVolume(wanted, std::ptr::null())
                    .map_err(|e| WasapiError::call("SetMasterVolume", e))?;
                applied_volume = wanted;
            }

            let padding = client
                .GetCurrentPadding()
                .map_err(|e| WasapiError::call("GetCurrentPadding", e))?;
            let free_frames = buffer_frames.saturating_sub(padding) as usize;
            let queued_frames = queue.count() / frame_bytes;
            let frames = free_frames.min(queued_frames);

            if frames > 0 {
                let bytes = frames * frame_bytes;
                let copied = queue.pop_available(&mut staging[..bytes]);
                staging[copied..bytes].fill(0);

                let buffer_ptr = render_client
                    .GetBuffer(frames as u32)
                    .map_err(|e| WasapiError::call("GetBuffer", e))?;
                std::ptr::copy_nonoverlapping(staging.as_ptr(), buffer_ptr, bytes);
                render_client
                    .ReleaseBuffer(frames as u32, 0)
                    .map_err(|e| WasapiError::call("ReleaseBuffer", e))?;
            }

            thread::sleep(POLL_INTERVAL);
        }

        let _ = client.Stop();
    }

    Ok(())
}
