//! Background service
//!
//! The privileged side of the relay. It owns the source picker, tab creation
//! and the toolbar badge, and forwards the chosen capture source to the page.

use super::host::{BrowserHost, TabInfo};
use super::port::{MessageHandler, MessagePort};
use super::protocol::{BadgePayload, Message, MessageResponse, RedirectPayload, StartRecordingPayload};
use crate::capture::CaptureSource;
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Handles requests from the page and toolbar events
pub struct BackgroundService {
    host: Arc<dyn BrowserHost>,
    page: MessagePort,
    sources: Vec<CaptureSource>,
}

impl BackgroundService {
    pub fn new(host: Arc<dyn BrowserHost>, page: MessagePort) -> Self {
        Self {
            host,
            page,
            sources: CaptureSource::ALL.to_vec(),
        }
    }

    /// Limit the kinds offered by the source picker
    pub fn with_sources(mut self, sources: Vec<CaptureSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Toolbar icon clicked: let the page show its UI or stop recording
    pub async fn on_icon_clicked(&self, tab: &TabInfo) {
        tracing::info!("Icon clicked in tab {} ({:?})", tab.id, tab.url);
        match self.page.send(Message::IconClicked).await {
            Ok(response) if !response.success => {
                tracing::warn!("Page rejected icon click: {}", response.message);
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Could not reach the page: {}", e),
        }
    }

    /// Pick a capture source and ask the page to start recording it
    async fn handle_get_stream(&self) -> AppResult<MessageResponse> {
        let tab = self
            .host
            .active_tab()
            .await?
            .ok_or_else(|| AppError::Runtime("No active tab".to_string()))?;

        let choice = self.host.choose_desktop_media(&self.sources, &tab).await?;
        let choice = match choice {
            Some(choice) if !choice.stream_id.is_empty() => choice,
            _ => {
                tracing::info!("Source picker cancelled");
                return Err(AppError::NoStreamId);
            }
        };
        tracing::debug!("Capture source chosen: {}", choice.stream_id);

        self.page
            .send(Message::StartRecording(StartRecordingPayload {
                stream_id: choice.stream_id,
                options: choice.options,
            }))
            .await
    }

    async fn handle_redirect(&self, payload: RedirectPayload) -> AppResult<MessageResponse> {
        let tab = self.host.create_tab(&payload.url).await?;
        tracing::info!("Opened {} in tab {}", payload.url, tab.id);
        Ok(MessageResponse::redirect(payload.url))
    }

    async fn handle_badge(&self, payload: BadgePayload) -> AppResult<MessageResponse> {
        // Badge failures are cosmetic and never fail the request
        if let Err(e) = self.host.set_badge_text(&payload.text).await {
            tracing::error!("Failed to set badge text: {}", e);
        }
        if let Err(e) = self.host.set_badge_background_color(payload.color).await {
            tracing::error!("Failed to set badge colour: {}", e);
        }
        Ok(MessageResponse::success("Badge set"))
    }
}

#[async_trait]
impl MessageHandler for BackgroundService {
    async fn handle(&self, message: Message) -> MessageResponse {
        let kind = message.kind();
        let result = match message {
            Message::GetStream => self.handle_get_stream().await,
            Message::Redirect(payload) => self.handle_redirect(payload).await,
            Message::SetBadge(payload) => self.handle_badge(payload).await,
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
