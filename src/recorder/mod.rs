//! Recording pipeline
//!
//! This module implements the recorder:
//! - AudioGraph to mix local audio into the desktop stream
//! - MediaEncoder/EncoderFactory traits for the host's chunked encoder
//! - Recorder to drive the lifecycle and assemble the final blob

pub mod blob;
pub mod chunks;
pub mod codec;
pub mod coordinator;
pub mod encoder;
pub mod mixer;
pub mod state;

pub use blob::{Blob, ObjectUrlRegistry};
pub use coordinator::{Recorder, RecorderEvent};
pub use encoder::{EncoderEvent, EncoderEventSender, EncoderFactory, EncoderOptions, MediaEncoder};
pub use mixer::AudioGraph;
pub use state::{RecorderConfig, RecordingSession, RecordingState};
