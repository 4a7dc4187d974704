//! In-page controller
//!
//! Owns the capture session (local stream, desktop stream, recorder) and the
//! popup state. Reacts to messages from the background service and to the
//! user pressing the record button.

use super::port::{MessageHandler, MessagePort};
use super::protocol::{BadgePayload, Message, MessageResponse, RedirectPayload, StartRecordingPayload};
use crate::capture::{release_stream, MediaStream, StreamAcquirer};
use crate::config::BadgeConfig;
use crate::recorder::{ObjectUrlRegistry, Recorder, RecordingState};
use crate::utils::{AppError, AppResult, Observable};
use async_trait::async_trait;
use tokio::sync::Mutex;

const STREAM_ID_REQUIRED: &str = "Stream Id is required to start the recording";

/// Streams and recorder for one page
pub struct CaptureSession {
    /// Local camera/microphone acquisition
    pub acquirer: StreamAcquirer,

    /// Desktop stream being recorded
    pub desktop: Option<MediaStream>,

    /// Recorder driving the encoder
    pub recorder: Recorder,
}

impl CaptureSession {
    pub fn new(acquirer: StreamAcquirer, recorder: Recorder) -> Self {
        Self {
            acquirer,
            desktop: None,
            recorder,
        }
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    /// Stop recording, release every stream and collect the result
    async fn finish(&mut self, urls: &ObjectUrlRegistry) -> AppResult<Option<String>> {
        self.recorder.stop().await?;
        self.acquirer.release_local_stream();
        if let Some(desktop) = self.desktop.take() {
            release_stream(&desktop);
        }

        let blob = self.recorder.get_result();
        self.recorder.reset()?;

        Ok(blob.map(|blob| {
            tracing::info!("Recording ready: {} bytes of {}", blob.size(), blob.mime_type);
            urls.create(blob)
        }))
    }
}

/// Page-side message handler and UI state
pub struct PageController {
    session: Mutex<CaptureSession>,
    background: MessagePort,
    urls: ObjectUrlRegistry,
    badge: BadgeConfig,
    popup: Observable<bool>,
    error: Observable<Option<String>>,
    /// Object URL of the last finished recording, revoked when the next one starts
    last_url: parking_lot::Mutex<Option<String>>,
}

impl PageController {
    pub fn new(
        session: CaptureSession,
        background: MessagePort,
        urls: ObjectUrlRegistry,
        badge: BadgeConfig,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            background,
            urls,
            badge,
            popup: Observable::new(false),
            error: Observable::new(None),
            last_url: parking_lot::Mutex::new(None),
        }
    }

    /// Popup visibility
    pub fn popup(&self) -> &Observable<bool> {
        &self.popup
    }

    /// Error text shown in the popup
    pub fn error(&self) -> &Observable<Option<String>> {
        &self.error
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    pub async fn recording_state(&self) -> RecordingState {
        self.session.lock().await.recording_state()
    }

    fn show_error(&self, message: impl Into<String>) {
        self.error.set(Some(message.into()));
        self.popup.set(true);
    }

    /// The record button: hide the popup and ask the background for a source
    pub async fn request_recording(&self) -> AppResult<MessageResponse> {
        self.popup.set(false);

        match self.background.send(Message::GetStream).await {
            Ok(response) if response.success => {
                self.error.set(None);
                Ok(response)
            }
            Ok(response) => {
                self.show_error(response.message.clone());
                Ok(response)
            }
            Err(e) => {
                self.show_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn handle_start_recording(&self, payload: StartRecordingPayload) -> AppResult<MessageResponse> {
        if payload.stream_id.trim().is_empty() {
            self.show_error(STREAM_ID_REQUIRED);
            return Ok(MessageResponse::error(STREAM_ID_REQUIRED));
        }

        {
            let mut session = self.session.lock().await;
            if session.recording_state().is_active() {
                return Err(AppError::InvalidState("Recording already in progress".to_string()));
            }

            let desktop = session.acquirer.acquire_desktop_stream(&payload.stream_id).await?;
            let local = session.acquirer.local_stream().cloned();

            if let Err(e) = session.recorder.start(Some(desktop.clone()), local).await {
                release_stream(&desktop);
                return Err(e);
            }
            session.desktop = Some(desktop);
        }

        if let Some(previous) = self.last_url.lock().take() {
            if self.urls.revoke(&previous) {
                tracing::debug!("Revoked previous recording {}", previous);
            }
        }

        self.popup.set(false);
        self.error.set(None);
        self.send_badge(&self.badge.recording_text, self.badge.recording_color).await;

        Ok(MessageResponse::success("Recording started"))
    }

    async fn handle_icon_clicked(&self) -> AppResult<MessageResponse> {
        let active = self.session.lock().await.recording_state().is_active();
        if active {
            self.stop_and_open().await?;
            return Ok(MessageResponse::success("Recording stopped"));
        }

        self.popup.set(true);
        let acquired = self.session.lock().await.acquirer.acquire_local_stream().await;
        if let Err(e) = acquired {
            // The popup still works without camera or microphone
            tracing::warn!("Local stream unavailable: {}", e);
            self.error.set(Some(e.to_string()));
        }
        Ok(MessageResponse::success("Popup shown"))
    }

    async fn handle_stop_recording(&self) -> AppResult<MessageResponse> {
        let active = self.session.lock().await.recording_state().is_active();
        if !active {
            return Ok(MessageResponse::success("Not recording"));
        }
        self.stop_and_open().await?;
        Ok(MessageResponse::success("Recording stopped"))
    }

    /// Stop, clear the badge and open the result in a new tab
    pub async fn stop_and_open(&self) -> AppResult<Option<String>> {
        let url = {
            let mut session = self.session.lock().await;
            session.finish(&self.urls).await?
        };

        self.send_badge(&self.badge.idle_text, self.badge.idle_color).await;

        let Some(url) = url else {
            tracing::warn!("Recording produced no data");
            return Ok(None);
        };

        *self.last_url.lock() = Some(url.clone());
        self.popup.set(true);
        let response = self
            .background
            .send(Message::Redirect(RedirectPayload {
                url: url.clone(),
                options: None,
            }))
            .await?;
        if !response.success {
            tracing::warn!("Redirect failed: {}", response.message);
        }
        Ok(Some(url))
    }

    async fn send_badge(&self, text: &str, color: [u8; 4]) {
        let message = Message::SetBadge(BadgePayload {
            text: text.to_string(),
            color,
        });
        if let Err(e) = self.background.send(message).await {
            tracing::warn!("Could not update badge: {}", e);
        }
    }
}

#[async_trait]
impl MessageHandler for PageController {
    async fn handle(&self, message: Message) -> MessageResponse {
        let kind = message.kind();
        let result = match message {
            Message::StartRecording(payload) => self.handle_start_recording(payload).await,
            Message::IconClicked => self.handle_icon_clicked().await,
            Message::StopRecording => self.handle_stop_recording().await,
            _ => Err(AppError::UnknownMessageType),
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} failed: {}", kind, e);
                MessageResponse::from_error(&e)
            }
        }
    }
}
