//! Capture trait definitions
//!
//! Platform-agnostic types and traits for capture sources. The host (browser,
//! desktop shell, test harness) implements [`MediaDevices`].

use super::stream::MediaStream;
use crate::utils::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of surface offered by the capture source picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Screen,
    Window,
    Tab,
}

impl CaptureSource {
    /// Every source kind, in picker order
    pub const ALL: [CaptureSource; 3] = [CaptureSource::Screen, CaptureSource::Window, CaptureSource::Tab];
}

/// Facing mode for camera selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// A min/ideal/max range for a video dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRange {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

/// Audio processing requested from the microphone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Camera requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub facing_mode: FacingMode,
    pub width: DimensionRange,
    pub height: DimensionRange,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            width: DimensionRange {
                min: 1024,
                ideal: 1280,
                max: 1920,
            },
            height: DimensionRange {
                min: 576,
                ideal: 720,
                max: 1080,
            },
        }
    }
}

/// Constraints for acquiring the local (camera/microphone) stream.
///
/// `None` means the kind is not requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConstraints {
    pub audio: Option<AudioConstraints>,
    pub video: Option<VideoConstraints>,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: Some(VideoConstraints::default()),
        }
    }
}

impl MediaConstraints {
    /// Microphone only
    pub fn audio_only() -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }
}

/// Information about an audio input device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Whether this is the default device
    pub is_default: bool,
}

/// Host access to capture devices.
///
/// Both calls may suspend on a permission prompt.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Open a local camera/microphone stream.
    ///
    /// Fails with `PermissionDenied` or `DeviceUnavailable`.
    async fn get_user_media(&self, constraints: &MediaConstraints) -> AppResult<MediaStream>;

    /// Exchange a capture token from the source picker for a desktop stream
    async fn get_desktop_media(&self, stream_id: &str) -> AppResult<MediaStream>;
}
