//! Chunked media encoder interface
//!
//! The host supplies the encoder. It reports progress by pushing
//! [`EncoderEvent`]s into the channel handed to it at creation.

use crate::capture::MediaStream;
use crate::utils::AppResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events emitted by an encoder
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderEvent {
    /// Encoding began
    Started,
    /// One flush interval of encoded output
    Data(Vec<u8>),
    /// Encoding paused
    Paused,
    /// Encoding resumed
    Resumed,
    /// Final data has been flushed; no more events follow
    Stopped,
    /// Non-fatal encoder failure
    Error(String),
}

/// Sender half given to encoders
pub type EncoderEventSender = mpsc::UnboundedSender<EncoderEvent>;

/// Options for a new encoder
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    /// Output container/codec
    pub mime_type: String,

    /// Target video bitrate
    pub video_bits_per_second: u64,

    /// Flush interval
    pub timeslice: Duration,
}

/// A running chunked encoder
#[async_trait]
pub trait MediaEncoder: Send {
    /// Begin encoding, flushing a chunk every `timeslice`
    async fn start(&mut self) -> AppResult<()>;

    async fn pause(&mut self) -> AppResult<()>;

    async fn resume(&mut self) -> AppResult<()>;

    /// Flush whatever is buffered as a `Data` event
    async fn request_data(&mut self) -> AppResult<()>;

    /// Stop encoding. Must eventually emit `Stopped`.
    async fn stop(&mut self) -> AppResult<()>;
}

/// Creates encoders and reports which output types are available
pub trait EncoderFactory: Send + Sync {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn create(
        &self,
        stream: MediaStream,
        options: EncoderOptions,
        events: EncoderEventSender,
    ) -> AppResult<Box<dyn MediaEncoder>>;
}
