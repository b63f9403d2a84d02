use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::audio::vad::{block_rms, SilenceTracker};
use crate::audio::{convert, wav};
use crate::domain::{
    AtomicCaptureState, AudioClip, AudioDevice, CaptureConfig, CaptureEvent, CaptureState,
    CoreError, StopReason,
};
use crate::ports::CaptureManager;

/// Commands sent to the audio thread.
enum AudioCommand {
    Start {
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
    Stop {
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },
    /// Sent by the stream callback when the silence tracker fires.
    AutoStop,
    Shutdown,
}

/// Device and stream plumbing.
mod device_setup {
    use super::*;

    pub fn get_device(selected_device_id: Option<&str>) -> Result<Device, CoreError> {
        let host = cpal::default_host();

        if let Some(id) = selected_device_id {
            let devices = host.input_devices().map_err(|e| {
                CoreError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e))
            })?;

            for device in devices {
                if let Ok(name) = device.name() {
                    if name == id {
                        return Ok(device);
                    }
                }
            }
            warn!(device_id = %id, "Selected device not found, falling back to default");
        }

        host.default_input_device().ok_or_else(|| {
            CoreError::DeviceUnavailable("No default input device available".to_string())
        })
    }

    pub fn build_stream_config(device: &Device) -> Result<(StreamConfig, SampleFormat), CoreError> {
        let supported = device.default_input_config().map_err(|e| {
            CoreError::DeviceUnavailable(format!("Failed to get default config: {}", e))
        })?;

        debug!(
            sample_rate = ?supported.sample_rate(),
            channels = supported.channels(),
            format = ?supported.sample_format(),
            "Device default config"
        );

        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, supported.sample_format()))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn build_stream(
        device: &Device,
        stream_config: &StreamConfig,
        sample_format: SampleFormat,
        capture_config: &CaptureConfig,
        session: Arc<Mutex<Vec<f32>>>,
        event_sender: broadcast::Sender<CaptureEvent>,
        current_level: Arc<AtomicU32>,
        cmd_tx: mpsc::Sender<AudioCommand>,
    ) -> Result<Stream, CoreError> {
        let channels = stream_config.channels;
        let device_rate = stream_config.sample_rate.0;
        let target_rate = capture_config.sample_rate;

        // Level updates roughly 10x per second, counted in converted samples.
        let samples_per_update = (target_rate / 10) as usize;
        let mut sample_counter = 0usize;
        let mut level_window = Vec::with_capacity(samples_per_update);
        let mut tracker = SilenceTracker::new(
            capture_config.silence_threshold,
            capture_config.silence_window_samples(),
        );

        let err_fn = |err| error!(?err, "Audio stream error");

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    process_block(
                        data,
                        channels,
                        device_rate,
                        target_rate,
                        &session,
                        &mut level_window,
                        &mut sample_counter,
                        samples_per_update,
                        &mut tracker,
                        &event_sender,
                        &current_level,
                        &cmd_tx,
                    );
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let float_data: Vec<f32> =
                        data.iter().map(|&s| s as f32 / 32_768.0).collect();
                    process_block(
                        &float_data,
                        channels,
                        device_rate,
                        target_rate,
                        &session,
                        &mut level_window,
                        &mut sample_counter,
                        samples_per_update,
                        &mut tracker,
                        &event_sender,
                        &current_level,
                        &cmd_tx,
                    );
                },
                err_fn,
                None,
            ),
            other => {
                return Err(CoreError::FormatUnsupported(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        }
        .map_err(|e| CoreError::DeviceUnavailable(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Per-callback work: convert to the target format, append to the
    /// session, publish levels, and run silence detection. Everything here
    /// is allocation-light and lock-held briefly; it runs on the real-time
    /// audio callback.
    #[allow(clippy::too_many_arguments)]
    fn process_block(
        data: &[f32],
        channels: u16,
        device_rate: u32,
        target_rate: u32,
        session: &Mutex<Vec<f32>>,
        level_window: &mut Vec<f32>,
        sample_counter: &mut usize,
        samples_per_update: usize,
        tracker: &mut SilenceTracker,
        event_sender: &broadcast::Sender<CaptureEvent>,
        current_level: &AtomicU32,
        cmd_tx: &mpsc::Sender<AudioCommand>,
    ) {
        let converted = convert::to_target(data, channels, device_rate, target_rate);

        session.lock().extend_from_slice(&converted);

        level_window.extend_from_slice(&converted);
        *sample_counter += converted.len();
        if *sample_counter >= samples_per_update {
            let level = block_rms(level_window);
            current_level.store(level.to_bits(), Ordering::Relaxed);
            let _ = event_sender.send(CaptureEvent::LevelUpdate { level });
            level_window.clear();
            *sample_counter = 0;
        }

        let rms = block_rms(&converted);
        if tracker.observe(rms, converted.len()) {
            // Non-blocking; the audio thread finalizes the session. A full
            // channel just means a stop is already underway.
            let _ = cmd_tx.try_send(AudioCommand::AutoStop);
        }
    }
}

/// Stop the stream, drain the session buffer, and encode the result.
///
/// Shared between manual stop and silence auto-stop so both paths emit the
/// same events and leave the pipeline in the same idle state. Returns `None`
/// when the session captured nothing.
fn finalize_session(
    stream: &mut Option<Stream>,
    session: &Mutex<Vec<f32>>,
    state: &AtomicCaptureState,
    event_sender: &broadcast::Sender<CaptureEvent>,
    current_level: &AtomicU32,
    sample_rate: u32,
    reason: StopReason,
) -> Option<Vec<u8>> {
    stream.take();

    let samples = std::mem::take(&mut *session.lock());
    current_level.store(0f32.to_bits(), Ordering::Relaxed);

    let from = state.load();
    state.store(CaptureState::Idle);
    let _ = event_sender.send(CaptureEvent::StateChanged {
        from,
        to: CaptureState::Idle,
    });
    let _ = event_sender.send(CaptureEvent::Stopped { reason });

    let clip = AudioClip::from_samples(samples, sample_rate);
    if clip.is_empty() {
        info!(?reason, "Recording stopped with no audio captured");
        return None;
    }

    let encoded = wav::encode(clip.samples(), clip.sample_rate());
    info!(
        ?reason,
        samples = clip.len(),
        duration_secs = clip.duration_secs(),
        "Recording stopped"
    );
    Some(encoded)
}

/// Audio thread runner. The cpal `Stream` is not `Send`, so it is created,
/// driven, and dropped entirely on this thread.
fn audio_thread_main(
    config: CaptureConfig,
    selected_device_id: Arc<RwLock<Option<String>>>,
    state: Arc<AtomicCaptureState>,
    event_sender: broadcast::Sender<CaptureEvent>,
    current_level: Arc<AtomicU32>,
    cmd_tx: mpsc::Sender<AudioCommand>,
    mut cmd_rx: mpsc::Receiver<AudioCommand>,
) {
    let mut stream: Option<Stream> = None;
    let session: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    // A clip finished by silence auto-stop waits here for the next stop().
    let mut pending_clip: Option<Vec<u8>> = None;

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            AudioCommand::Start { reply } => {
                let result = (|| -> Result<(), CoreError> {
                    if !state.load().can_start_recording() {
                        return Err(CoreError::AlreadyRecording);
                    }

                    let device_id = selected_device_id.read().clone();
                    let device = device_setup::get_device(device_id.as_deref())?;
                    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    let (stream_config, sample_format) =
                        device_setup::build_stream_config(&device)?;

                    session.lock().clear();

                    let new_stream = device_setup::build_stream(
                        &device,
                        &stream_config,
                        sample_format,
                        &config,
                        Arc::clone(&session),
                        event_sender.clone(),
                        Arc::clone(&current_level),
                        cmd_tx.clone(),
                    )?;

                    new_stream.play().map_err(|e| {
                        CoreError::DeviceUnavailable(format!("Failed to start stream: {}", e))
                    })?;

                    stream = Some(new_stream);
                    // A new session supersedes any uncollected auto-stopped clip.
                    pending_clip = None;

                    let from = state.load();
                    state.store(CaptureState::Recording);
                    let _ = event_sender.send(CaptureEvent::StateChanged {
                        from,
                        to: CaptureState::Recording,
                    });

                    info!(device = %device_name, "Recording started");
                    Ok(())
                })();
                let _ = reply.send(result);
            }
            AudioCommand::Stop { reply } => {
                let clip = if state.load().can_stop_recording() {
                    finalize_session(
                        &mut stream,
                        &session,
                        &state,
                        &event_sender,
                        &current_level,
                        config.sample_rate,
                        StopReason::Manual,
                    )
                } else {
                    pending_clip.take()
                };
                let _ = reply.send(clip);
            }
            AudioCommand::AutoStop => {
                // Stale if a manual stop won the race; nothing to do then.
                if state.load().can_stop_recording() {
                    pending_clip = finalize_session(
                        &mut stream,
                        &session,
                        &state,
                        &event_sender,
                        &current_level,
                        config.sample_rate,
                        StopReason::Silence,
                    );
                }
            }
            AudioCommand::Shutdown => {
                break;
            }
        }
    }
    debug!("Audio thread shutting down");
}

/// cpal-based capture pipeline.
///
/// Uses a dedicated audio thread to own the non-Send `Stream`; the async
/// methods talk to it over a command channel.
pub struct CpalCaptureManager {
    config: CaptureConfig,
    state: Arc<AtomicCaptureState>,
    event_sender: broadcast::Sender<CaptureEvent>,
    current_level: Arc<AtomicU32>,
    selected_device_id: Arc<RwLock<Option<String>>>,
    session_start: Mutex<Option<Instant>>,
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CpalCaptureManager {
    /// Create a capture pipeline with default configuration.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_config(CaptureConfig::default())
    }

    /// Create a capture pipeline with custom configuration.
    pub fn with_config(config: CaptureConfig) -> Result<Self, CoreError> {
        let state = Arc::new(AtomicCaptureState::default());
        let (event_sender, _) = broadcast::channel(64);
        let current_level = Arc::new(AtomicU32::new(0));
        let selected_device_id = Arc::new(RwLock::new(None));

        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let thread_config = config.clone();
        let thread_device_id = Arc::clone(&selected_device_id);
        let thread_state = Arc::clone(&state);
        let thread_event_sender = event_sender.clone();
        let thread_level = Arc::clone(&current_level);
        let thread_cmd_tx = cmd_tx.clone();

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                audio_thread_main(
                    thread_config,
                    thread_device_id,
                    thread_state,
                    thread_event_sender,
                    thread_level,
                    thread_cmd_tx,
                    cmd_rx,
                )
            })
            .map_err(|e| {
                CoreError::DeviceUnavailable(format!("Failed to spawn audio thread: {}", e))
            })?;

        info!(
            sample_rate = config.sample_rate,
            silence_threshold = config.silence_threshold,
            silence_duration_ms = config.silence_duration_ms,
            "CpalCaptureManager initialized"
        );

        Ok(Self {
            config,
            state,
            event_sender,
            current_level,
            selected_device_id,
            session_start: Mutex::new(None),
            cmd_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }

    /// List available input devices with unique IDs.
    fn list_devices_internal(&self) -> Result<Vec<AudioDevice>, CoreError> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let devices = host.input_devices().map_err(|e| {
            CoreError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e))
        })?;

        let mut result = Vec::new();
        let mut name_counts: std::collections::HashMap<String, usize> =
            std::collections::HashMap::new();

        for device in devices {
            if let Ok(name) = device.name() {
                // Disambiguate duplicate names by appending an index
                let count = name_counts.entry(name.clone()).or_insert(0);
                let id = if *count == 0 {
                    name.clone()
                } else {
                    format!("{}:{}", name, count)
                };
                *count += 1;

                result.push(AudioDevice {
                    id,
                    name: name.clone(),
                    is_default: Some(&name) == default_name.as_ref(),
                });
            }
        }

        debug!(count = result.len(), "Listed input devices");
        Ok(result)
    }
}

impl Drop for CpalCaptureManager {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(AudioCommand::Shutdown);

        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

#[async_trait]
impl CaptureManager for CpalCaptureManager {
    async fn start(&self) -> Result<(), CoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(AudioCommand::Start { reply: reply_tx })
            .await
            .map_err(|_| CoreError::DeviceUnavailable("Audio thread not running".to_string()))?;

        reply_rx
            .await
            .map_err(|_| CoreError::DeviceUnavailable("Audio thread did not respond".to_string()))??;

        *self.session_start.lock() = Some(Instant::now());
        Ok(())
    }

    async fn stop(&self) -> Result<Option<Vec<u8>>, CoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(AudioCommand::Stop { reply: reply_tx })
            .await
            .map_err(|_| CoreError::DeviceUnavailable("Audio thread not running".to_string()))?;

        let clip = reply_rx
            .await
            .map_err(|_| CoreError::DeviceUnavailable("Audio thread did not respond".to_string()))?;

        self.session_start.lock().take();
        Ok(clip)
    }

    fn state(&self) -> CaptureState {
        self.state.load()
    }

    fn config(&self) -> CaptureConfig {
        self.config.clone()
    }

    fn list_input_devices(&self) -> Result<Vec<AudioDevice>, CoreError> {
        self.list_devices_internal()
    }

    fn select_input_device(&self, device_id: Option<&str>) -> Result<(), CoreError> {
        if let Some(id) = device_id {
            let devices = self.list_devices_internal()?;
            if !devices.iter().any(|d| d.id == id) {
                return Err(CoreError::DeviceUnavailable(format!(
                    "Device not found: {}",
                    id
                )));
            }
        }

        *self.selected_device_id.write() = device_id.map(String::from);
        info!(device_id = ?device_id, "Input device selected");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.event_sender.subscribe()
    }

    fn current_duration(&self) -> f32 {
        if self.state.load() != CaptureState::Recording {
            return 0.0;
        }
        self.session_start
            .lock()
            .as_ref()
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }

    fn current_level(&self) -> f32 {
        f32::from_bits(self.current_level.load(Ordering::Relaxed))
    }
}
