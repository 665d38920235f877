//! WASAPI microphone capture device.
//!
//! A dedicated high-priority thread pulls packets from the capture endpoint
//! into a byte ring buffer sized to the session's capture allocation. The
//! block loop's `read` blocks on that buffer until a full block is ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Threading::*;

use audio_loopback_core::models::config::AudioSourceKind;
use audio_loopback_core::models::error::{LoopbackError, LoopbackResult};
use audio_loopback_core::models::format::{ResolvedFormat, SampleEncoding};
use audio_loopback_core::processing::ring_buffer::BlockingRingBuffer;
use audio_loopback_core::traits::capture_device::CaptureDevice;

use crate::com::ComScope;
use crate::device_enumerator::DeviceEnumerator;
use crate::error::WasapiError;
use crate::stream::{capture_role, open_shared_client, pcm_wave_format};

/// Interval between packet polls on the capture thread.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// WASAPI microphone capture.
pub struct WasapiCaptureDevice {
    device_id: Option<String>,
    format: ResolvedFormat,
    source: AudioSourceKind,
    ring: Arc<BlockingRingBuffer>,
    running: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<LoopbackError>>>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl WasapiCaptureDevice {
    pub fn new(device_id: Option<String>, format: ResolvedFormat, source: AudioSourceKind) -> Self {
        Self {
            device_id,
            format,
            source,
            ring: Arc::new(BlockingRingBuffer::new(format.capture_allocation_bytes())),
            running: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
            capture_handle: None,
        }
    }
}

impl CaptureDevice for WasapiCaptureDevice {
    fn start(&mut self) -> LoopbackResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.ring.reset();
        *self.failure.lock() = None;
        self.running.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = mpsc::channel();
        let running = Arc::clone(&self.running);
        let ring = Arc::clone(&self.ring);
        let failure = Arc::clone(&self.failure);
        let device_id = self.device_id.clone();
        let format = self.format;
        let source = self.source;

        let handle = thread::Builder::new()
            .name("wasapi-capture".into())
            .spawn(move || {
                let result = capture_loop(&running, device_id.as_deref(), &format, source, &ring, &ready_tx);
                if let Err(e) = result {
                    log::error!("Capture thread error: {}", e);
                    let err = LoopbackError::from(e);
                    let _ = ready_tx.send(Err(err.clone()));
                    *failure.lock() = Some(err);
                }
                running.store(false, Ordering::SeqCst);
                ring.close();
            })
            .map_err(|e| LoopbackError::Unknown(format!("failed to spawn capture thread: {}", e)))?;
        self.capture_handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.stop().ok();
                Err(e)
            }
            Err(_) => {
                self.stop().ok();
                Err(LoopbackError::DeviceUnavailable("capture thread exited".into()))
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> LoopbackResult<usize> {
        let n = self.ring.read_block(buf);
        if n == 0 && self.ring.is_closed() {
            let reason = match self.failure.lock().take() {
                Some(err) => err.to_string(),
                None => WasapiError::Closed.to_string(),
            };
            return Err(LoopbackError::TransientIo(reason));
        }
        Ok(n)
    }

    fn stop(&mut self) -> LoopbackResult<()> {
        self.running.store(false, Ordering::SeqCst);
        self.ring.close();
        if let Some(handle) = self.capture_handle.take() {
            handle
                .join()
                .map_err(|_| LoopbackError::Teardown("capture thread panicked".into()))?;
        }
        Ok(())
    }
}

impl Drop for WasapiCaptureDevice {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Capture loop running on a dedicated thread.
///
/// Sequence:
/// 1. Enter a COM apartment
/// 2. Resolve the capture endpoint (by ID or role)
/// 3. Initialize a shared-mode client in the session's PCM format
/// 4. Register with MMCSS for real-time priority
/// 5. Signal readiness, then poll packets into the ring buffer
fn capture_loop(
    running: &AtomicBool,
    device_id: Option<&str>,
    format: &ResolvedFormat,
    source: AudioSourceKind,
    ring: &BlockingRingBuffer,
    ready: &mpsc::Sender<LoopbackResult<()>>,
) -> Result<(), WasapiError> {
    let _com = ComScope::enter()?;

    let enumerator = DeviceEnumerator::new()?;
    let device = enumerator.endpoint(eCapture, capture_role(source), device_id)?;

    let wave = pcm_wave_format(format, format.input_layout);
    let client = open_shared_client(&device, &wave, format.capture_allocation_bytes())?;
    let frame_bytes = wave.nBlockAlign as usize;

    unsafe {
        let capture_client: IAudioCaptureClient = client
            .GetService()
            .map_err(|e| WasapiError::call("IAudioClient::GetService", e))?;

        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        let _mmcss_handle = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index);

        client
            .Start()
            .map_err(|e| WasapiError::call("IAudioClient::Start", e))?;
        let _ = ready.send(Ok(()));

        while running.load(Ordering::SeqCst) {
            thread::sleep(POLL_INTERVAL);

            let mut packet_length = capture_client
                .GetNextPacketSize()
                .map_err(|e| WasapiError::call("GetNextPacketSize", e))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| WasapiError::call("GetBuffer", e))?;

                let bytes = num_frames as usize * frame_bytes;
                if bytes > 0 && !buffer_ptr.is_null() {
                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        let silence = silence_byte(format);
                        ring.push_overwrite(&vec![silence; bytes]);
                    } else {
                        ring.push_overwrite(std::slice::from_raw_parts(buffer_ptr, bytes));
                    }
                }

                capture_client
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| WasapiError::call("ReleaseBuffer", e))?;

                packet_length = capture_client
                    .GetNextPacketSize()
                    .map_err(|e| WasapiError::call("GetNextPacketSize", e))?;
            }
        }

        let _ = client.Stop();
    }

    Ok(())
}

fn silence_byte(format: &ResolvedFormat) -> u8 {
    match format.encoding {
        SampleEncoding::Pcm8 => 128,
        SampleEncoding::Pcm16 => 0,
    }
}
