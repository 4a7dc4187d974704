//! Native microphone devices via cpal
//!
//! Provides audio-only local streams backed by the system's input devices.
//! Each stream owns a capture thread that keeps a cpal input stream open
//! until its track is stopped. Video and desktop capture are left to the host.

use super::stream::{MediaStream, MediaTrack, TrackKind};
use super::traits::{AudioDeviceInfo, MediaConstraints, MediaDevices};
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// How often the capture thread checks whether its track was stopped
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// List audio input devices, default device first
pub fn get_audio_input_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut devices: Vec<AudioDeviceInfo> = match host.input_devices() {
        Ok(devices) => devices
            .filter_map(|d| d.name().ok())
            .map(|name| AudioDeviceInfo {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate input devices: {}", e);
            Vec::new()
        }
    };

    devices.sort_by(|a, b| b.is_default.cmp(&a.is_default));
    tracing::debug!("Found {} input devices", devices.len());
    devices
}

fn find_input_device(name: Option<&str>) -> AppResult<Device> {
    let host = cpal::default_host();
    match name {
        Some(wanted) => host
            .input_devices()
            .map_err(|e| AppError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| AppError::DeviceUnavailable(format!("Input device not found: {}", wanted))),
        None => host
            .default_input_device()
            .ok_or_else(|| AppError::DeviceUnavailable("No default input device".to_string())),
    }
}

fn build_stream<T: SizedSample>(
    device: &Device,
    config: &StreamConfig,
    frames: Arc<AtomicU64>,
) -> Result<Stream, cpal::BuildStreamError> {
    let channels = u64::from(config.channels.max(1));
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            frames.fetch_add(data.len() as u64 / channels, Ordering::Relaxed);
        },
        |err| tracing::error!("Microphone stream error: {}", err),
        None,
    )
}

/// Open and start an input stream on `device`
fn open_input(device: &Device, frames: Arc<AtomicU64>) -> AppResult<Stream> {
    let supported = device
        .default_input_config()
        .map_err(|e| AppError::DeviceUnavailable(format!("Failed to get input config: {}", e)))?;
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(device, &config, frames),
        SampleFormat::I16 => build_stream::<i16>(device, &config, frames),
        SampleFormat::U16 => build_stream::<u16>(device, &config, frames),
        other => {
            return Err(AppError::DeviceUnavailable(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| AppError::DeviceUnavailable(format!("Failed to build input stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| AppError::DeviceUnavailable(format!("Failed to start input stream: {}", e)))?;

    tracing::info!(
        "Microphone stream started ({}Hz, {}ch)",
        config.sample_rate.0,
        config.channels
    );
    Ok(stream)
}

/// Microphone-backed [`MediaDevices`]
#[derive(Debug, Default, Clone)]
pub struct MicrophoneDevices {
    /// Preferred device name, default input device when `None`
    pub device_name: Option<String>,

    /// Frames delivered by every stream opened through this value
    frames: Arc<AtomicU64>,
}

impl MicrophoneDevices {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total frames captured so far
    pub fn captured_frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MediaDevices for MicrophoneDevices {
    async fn get_user_media(&self, constraints: &MediaConstraints) -> AppResult<MediaStream> {
        if constraints.audio.is_none() {
            return Err(AppError::DeviceUnavailable(
                "Only microphone capture is available natively".to_string(),
            ));
        }
        if constraints.video.is_some() {
            tracing::warn!("Camera capture is not available natively; continuing with audio only");
        }

        let name = find_input_device(self.device_name.as_deref())?
            .name()
            .map_err(|e| AppError::DeviceUnavailable(e.to_string()))?;
        tracing::info!("Using input device: {}", name);

        let track = MediaTrack::new(TrackKind::Audio, name.clone());
        let (ready_tx, ready_rx) = oneshot::channel();
        let live = track.clone();
        let frames = self.frames.clone();

        // The cpal stream is created, held and dropped on this thread
        std::thread::spawn(move || {
            let opened = find_input_device(Some(name.as_str())).and_then(|device| open_input(&device, frames));
            let stream = match opened {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while live.is_live() {
                std::thread::sleep(LIVENESS_POLL);
            }
            drop(stream);
            tracing::info!("Microphone stream stopped");
        });

        ready_rx
            .await
            .map_err(|_| AppError::Runtime("Microphone thread exited early".to_string()))??;
        Ok(MediaStream::new(vec![track]))
    }

    async fn get_desktop_media(&self, _stream_id: &str) -> AppResult<MediaStream> {
        Err(AppError::DeviceUnavailable(
            "Desktop capture must be provided by the host".to_string(),
        ))
    }
}
