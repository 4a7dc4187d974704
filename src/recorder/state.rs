//! Recording state management
//!
//! Defines the recording state machine, session tracking and recorder settings.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Inactive,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
    /// Recording finished, chunks are still buffered
    Stopped,
}

impl RecordingState {
    /// Recording or paused
    pub fn is_active(self) -> bool {
        matches!(self, RecordingState::Recording | RecordingState::Paused)
    }
}

/// One uninterrupted stretch of recording.
///
/// A new session starts on every start or resume.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Session index (0, 1, 2, ...)
    pub index: usize,

    /// When the session started
    pub started_at: Instant,

    /// When the session ended, `None` while running
    pub ended_at: Option<Instant>,

    /// Unix timestamp when the session started
    pub unix_start_ms: i64,

    /// Unix timestamp when the session ended
    pub unix_end_ms: Option<i64>,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new(index: usize) -> Self {
        Self {
            index,
            started_at: Instant::now(),
            ended_at: None,
            unix_start_ms: Utc::now().timestamp_millis(),
            unix_end_ms: None,
        }
    }

    /// End the session. Ending twice keeps the first end time.
    pub fn end(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Instant::now());
            self.unix_end_ms = Some(Utc::now().timestamp_millis());
        }
    }

    /// Length of the session, measured up to now while it is running
    pub fn duration(&self) -> Duration {
        self.ended_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }
}

/// MIME types tried in order when choosing the encoder output
pub const DEFAULT_MIME_TYPES: [&str; 8] = [
    "video/x-matroska;codecs=avc1",
    "video/webm;codecs=h264",
    "video/webm",
    "video/webm,codecs=vp9",
    "video/vp8",
    "video/webm;codecs=vp8",
    "video/webm;codecs=daala",
    "video/mpeg",
];

/// Recorder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Target video bitrate
    pub video_bits_per_second: u64,

    /// Chunk flush interval in milliseconds
    pub timeslice_ms: u64,

    /// Output types in descending preference
    pub mime_types: Vec<String>,

    /// How long `stop` waits for the encoder's final flush
    pub stop_timeout_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            video_bits_per_second: 12_000_000,
            timeslice_ms: 100,
            mime_types: DEFAULT_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            stop_timeout_ms: 5_000,
        }
    }
}

impl RecorderConfig {
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}
