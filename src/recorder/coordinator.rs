//! Recorder
//!
//! Drives a chunked encoder over the desktop stream (plus mixed local audio)
//! and manages the recording lifecycle:
//!
//! ```text
//! inactive -> recording <-> paused -> stopped -> inactive
//! ```

use super::blob::Blob;
use super::chunks::ChunkBuffer;
use super::codec::select_mime_type;
use super::encoder::{EncoderEvent, EncoderFactory, EncoderOptions, MediaEncoder};
use super::mixer::{combine_streams, AudioGraph};
use super::state::{RecorderConfig, RecordingSession, RecordingState};
use crate::capture::MediaStream;
use crate::container::{self, ContainerKind};
use crate::utils::{AppError, AppResult};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

/// Events emitted by the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// Recording started with the given output type
    Started(String),
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Recording stopped
    Stopped,
    /// A chunk of the given size was buffered
    Chunk(usize),
    /// Error reported by the encoder
    Error(String),
}

/// Records one desktop stream at a time
pub struct Recorder {
    /// Recorder settings
    config: RecorderConfig,

    /// Host encoder factory
    factory: Arc<dyn EncoderFactory>,

    /// Current recording state
    state: Arc<RwLock<RecordingState>>,

    /// Output type chosen at start
    mime_type: Option<String>,

    /// Active encoder
    encoder: Option<Box<dyn MediaEncoder>>,

    /// Encoder event receiver
    encoder_rx: Option<mpsc::UnboundedReceiver<EncoderEvent>>,

    /// Buffered encoder output
    chunks: ChunkBuffer,

    /// Audio graph mixing the local stream, if any
    graph: Option<AudioGraph>,

    /// Stream handed to the encoder
    stream: Option<MediaStream>,

    /// Recording sessions (one per start/resume)
    sessions: Vec<RecordingSession>,

    /// Time the recording started
    started_at: Option<Instant>,

    /// Time the recording stopped
    stopped_at: Option<Instant>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl Recorder {
    pub fn new(config: RecorderConfig, factory: Arc<dyn EncoderFactory>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            config,
            factory,
            state: Arc::new(RwLock::new(RecordingState::Inactive)),
            mime_type: None,
            encoder: None,
            encoder_rx: None,
            chunks: ChunkBuffer::new(),
            graph: None,
            stream: None,
            sessions: Vec::new(),
            started_at: None,
            stopped_at: None,
            event_tx,
        }
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        *self.state.read()
    }

    /// Output type of the current or last recording
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Subscribe to recorder events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }

    /// Number of buffered chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Recording sessions of the current or last recording, one per start/resume
    pub fn sessions(&self) -> &[RecordingSession] {
        &self.sessions
    }

    /// Stream currently fed to the encoder
    pub fn recording_stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    fn set_state(&self, state: RecordingState) {
        *self.state.write() = state;
    }

    fn emit(&self, event: RecorderEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Start recording `desktop`, mixing in the audio of `local` if given
    pub async fn start(
        &mut self,
        desktop: Option<MediaStream>,
        local: Option<MediaStream>,
    ) -> AppResult<()> {
        match self.state() {
            RecordingState::Inactive => {}
            RecordingState::Stopped => {
                return Err(AppError::InvalidState(
                    "Previous recording not collected; reset the recorder first".to_string(),
                ))
            }
            _ => {
                return Err(AppError::InvalidState("Recording already in progress".to_string()));
            }
        }

        let desktop = desktop.ok_or_else(|| AppError::Runtime("No stream found".to_string()))?;

        let mime_type = select_mime_type(&self.config.mime_types, self.factory.as_ref())
            .ok_or(AppError::UnsupportedCodec)?;

        let graph = local.as_ref().and_then(|local| {
            let mut graph = AudioGraph::new();
            if graph.connect(local) {
                Some(graph)
            } else {
                tracing::debug!("Local stream has no audio; recording desktop tracks only");
                None
            }
        });
        let stream = combine_streams(&desktop, graph.as_ref());

        tracing::info!(
            "Starting recording: {} track(s) as {}",
            stream.tracks().len(),
            mime_type
        );

        let options = EncoderOptions {
            mime_type: mime_type.clone(),
            video_bits_per_second: self.config.video_bits_per_second,
            timeslice: self.config.timeslice(),
        };
        let (tx, rx) = mpsc::unbounded_channel();

        let started = match self.factory.create(stream.clone(), options, tx) {
            Ok(mut encoder) => encoder.start().await.map(|_| encoder),
            Err(e) => Err(e),
        };
        let encoder = match started {
            Ok(encoder) => encoder,
            Err(e) => {
                if let Some(mut graph) = graph {
                    graph.close();
                }
                tracing::error!("Failed to start encoder: {}", e);
                return Err(e);
            }
        };

        self.chunks.clear();
        self.sessions.clear();
        self.sessions.push(RecordingSession::new(0));
        self.started_at = Some(Instant::now());
        self.stopped_at = None;
        self.mime_type = Some(mime_type.clone());
        self.encoder = Some(encoder);
        self.encoder_rx = Some(rx);
        self.graph = graph;
        self.stream = Some(stream);

        self.set_state(RecordingState::Recording);
        self.emit(RecorderEvent::Started(mime_type));
        self.poll_events();

        tracing::info!("Recording started");
        Ok(())
    }

    /// Pause recording
    pub async fn pause(&mut self) -> AppResult<()> {
        if self.state() != RecordingState::Recording {
            return Err(AppError::InvalidState("Not recording".to_string()));
        }

        tracing::info!("Pausing recording");
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.pause().await?;
        }
        if let Some(session) = self.sessions.last_mut() {
            session.end();
        }

        self.set_state(RecordingState::Paused);
        self.emit(RecorderEvent::Paused);
        self.poll_events();
        Ok(())
    }

    /// Resume recording
    pub async fn resume(&mut self) -> AppResult<()> {
        if self.state() != RecordingState::Paused {
            return Err(AppError::InvalidState("Recording is not paused".to_string()));
        }

        tracing::info!("Resuming recording");
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.resume().await?;
        }
        self.sessions.push(RecordingSession::new(self.sessions.len()));

        self.set_state(RecordingState::Recording);
        self.emit(RecorderEvent::Resumed);
        self.poll_events();
        Ok(())
    }

    /// Stop recording, flushing the final chunk. A no-op unless recording or paused.
    pub async fn stop(&mut self) -> AppResult<()> {
        if !self.state().is_active() {
            tracing::debug!("Stop requested while {:?}; nothing to do", self.state());
            return Ok(());
        }

        tracing::info!("Stopping recording");

        if let Some(mut encoder) = self.encoder.take() {
            if let Err(e) = encoder.request_data().await {
                tracing::warn!("Final flush request failed: {}", e);
            }
            if let Err(e) = encoder.stop().await {
                tracing::warn!("Encoder stop failed: {}", e);
            }
        }
        self.drain_until_stopped().await;

        if let Some(stream) = self.stream.as_ref() {
            stream.stop_all();
        }
        if let Some(graph) = self.graph.as_mut() {
            graph.close();
        }
        if let Some(session) = self.sessions.last_mut() {
            session.end();
        }
        self.stopped_at = Some(Instant::now());

        self.set_state(RecordingState::Stopped);
        self.emit(RecorderEvent::Stopped);

        tracing::info!(
            "Recording stopped. Duration: {}ms over {} session(s), {} chunk(s), {} bytes",
            self.recorded_duration().as_millis(),
            self.sessions.len(),
            self.chunks.len(),
            self.chunks.byte_len()
        );
        if let (Some(first), Some(last)) = (self.sessions.first(), self.sessions.last()) {
            tracing::debug!(
                "Wall clock: {} -> {:?} (unix ms)",
                first.unix_start_ms,
                last.unix_end_ms
            );
        }
        Ok(())
    }

    /// Wait for the encoder's `Stopped` event, bounded by the stop timeout
    async fn drain_until_stopped(&mut self) {
        let Some(mut rx) = self.encoder_rx.take() else {
            return;
        };

        let deadline = self.config.stop_timeout();
        let drained = tokio::time::timeout(deadline, async {
            while let Some(event) = rx.recv().await {
                let stopped = event == EncoderEvent::Stopped;
                self.handle_encoder_event(event);
                if stopped {
                    break;
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "Encoder did not report stop within {}ms; keeping {} chunk(s)",
                deadline.as_millis(),
                self.chunks.len()
            );
            while let Ok(event) = rx.try_recv() {
                self.handle_encoder_event(event);
            }
        }
    }

    /// Buffer any encoder events that have already arrived
    pub fn poll_events(&mut self) -> usize {
        let mut events = Vec::new();
        if let Some(rx) = self.encoder_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        let count = events.len();
        for event in events {
            self.handle_encoder_event(event);
        }
        count
    }

    fn handle_encoder_event(&mut self, event: EncoderEvent) {
        match event {
            EncoderEvent::Data(chunk) => {
                let size = chunk.len();
                if self.chunks.push(chunk) {
                    self.emit(RecorderEvent::Chunk(size));
                }
            }
            EncoderEvent::Error(message) => {
                tracing::warn!("Encoder error: {}", message);
                self.emit(RecorderEvent::Error(message));
            }
            other => tracing::trace!("Encoder event: {:?}", other),
        }
    }

    /// Time spent recording, excluding pauses
    pub fn recorded_duration(&self) -> Duration {
        self.sessions.iter().map(RecordingSession::duration).sum()
    }

    /// Wall-clock time from start to stop (or to now while active)
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(start) => self
                .stopped_at
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(start),
            None => Duration::ZERO,
        }
    }

    /// Join the buffered chunks into one blob with repaired duration metadata.
    ///
    /// Returns `None` when nothing was recorded.
    pub fn get_result(&mut self) -> Option<Blob> {
        self.poll_events();
        if self.chunks.is_empty() {
            return None;
        }

        let mime_type = self.mime_type.clone().unwrap_or_default();
        let data = self.chunks.concat();

        if ContainerKind::from_mime(&mime_type) != ContainerKind::Ebml {
            return Some(Blob::new(mime_type, data));
        }

        match container::repair_duration(&data, self.recorded_duration()) {
            Ok(repaired) => Some(Blob::new(mime_type, repaired)),
            Err(e) => {
                tracing::warn!("Could not repair container duration: {}", e);
                Some(Blob::new(mime_type, data))
            }
        }
    }

    /// Return a stopped recorder to `inactive`, dropping buffered chunks
    pub fn reset(&mut self) -> AppResult<()> {
        if self.state().is_active() {
            return Err(AppError::InvalidState(
                "Cannot reset while recording".to_string(),
            ));
        }

        self.chunks.clear();
        self.sessions.clear();
        self.started_at = None;
        self.stopped_at = None;
        self.stream = None;
        self.graph = None;
        self.encoder_rx = None;
        self.set_state(RecordingState::Inactive);
        Ok(())
    }
}
