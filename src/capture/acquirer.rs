//! Stream acquisition
//!
//! Owns the local camera/microphone stream and exchanges capture tokens for
//! desktop streams.

use super::stream::MediaStream;
use super::traits::{MediaConstraints, MediaDevices};
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Whether the acquirer currently holds a local stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    #[default]
    Inactive,
    Active,
}

/// Wraps the host's capture devices and owns the local stream lifecycle
pub struct StreamAcquirer {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    local: Option<MediaStream>,
}

impl StreamAcquirer {
    pub fn new(devices: Arc<dyn MediaDevices>, constraints: MediaConstraints) -> Self {
        Self {
            devices,
            constraints,
            local: None,
        }
    }

    pub fn state(&self) -> StreamState {
        match &self.local {
            Some(stream) if stream.is_active() => StreamState::Active,
            _ => StreamState::Inactive,
        }
    }

    /// The local stream, if one is held and still live
    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.local.as_ref().filter(|s| s.is_active())
    }

    /// Acquire the local stream with the configured constraints
    pub async fn acquire_local_stream(&mut self) -> AppResult<MediaStream> {
        let constraints = self.constraints.clone();
        self.acquire_local_stream_with(&constraints).await
    }

    /// Acquire the local stream, releasing any stream held before
    pub async fn acquire_local_stream_with(
        &mut self,
        constraints: &MediaConstraints,
    ) -> AppResult<MediaStream> {
        if constraints.is_empty() {
            return Err(AppError::DeviceUnavailable(
                "No audio or video requested".to_string(),
            ));
        }

        self.release_local_stream();

        let stream = self.devices.get_user_media(constraints).await?;
        tracing::info!(
            "Local stream acquired: {} audio, {} video track(s)",
            stream.audio_tracks().count(),
            stream.video_tracks().count()
        );
        self.local = Some(stream.clone());
        Ok(stream)
    }

    /// Stop every track of the local stream. Safe to call when nothing is held.
    pub fn release_local_stream(&mut self) {
        if let Some(stream) = self.local.take() {
            let stopped = release_stream(&stream);
            tracing::debug!("Released local stream {} ({} track(s) stopped)", stream.id(), stopped);
        }
    }

    /// Exchange a capture token for a desktop stream
    pub async fn acquire_desktop_stream(&self, stream_id: &str) -> AppResult<MediaStream> {
        if stream_id.trim().is_empty() {
            return Err(AppError::NoStreamId);
        }

        let stream = self.devices.get_desktop_media(stream_id).await?;
        if stream.video_tracks().next().is_none() {
            release_stream(&stream);
            return Err(AppError::Runtime(
                "Could not get the screen stream from the stream id".to_string(),
            ));
        }

        tracing::info!("Desktop stream acquired for source {}", stream_id);
        Ok(stream)
    }
}

impl Drop for StreamAcquirer {
    fn drop(&mut self) {
        self.release_local_stream();
    }
}

/// Stop all tracks of `stream`, returning how many were still live
pub fn release_stream(stream: &MediaStream) -> usize {
    stream.stop_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevices;

    #[tokio::test]
    async fn test_acquire_and_release_local_stream() {
        let devices = Arc::new(FakeDevices::default());
        let mut acquirer = StreamAcquirer::new(devices.clone(), MediaConstraints::default());

        let stream = acquirer.acquire_local_stream().await.unwrap();
        assert_eq!(acquirer.state(), StreamState::Active);
        assert_eq!(stream.tracks().len(), 2);

        acquirer.release_local_stream();
        acquirer.release_local_stream();
        assert_eq!(acquirer.state(), StreamState::Inactive);
        assert!(!stream.is_active());
    }

    #[tokio::test]
    async fn test_reacquire_releases_previous_stream() {
        let devices = Arc::new(FakeDevices::default());
        let mut acquirer = StreamAcquirer::new(devices, MediaConstraints::audio_only());

        let first = acquirer.acquire_local_stream().await.unwrap();
        let second = acquirer.acquire_local_stream().await.unwrap();

        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(second.video_tracks().count(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_is_propagated() {
        let devices = Arc::new(FakeDevices::denying());
        let mut acquirer = StreamAcquirer::new(devices, MediaConstraints::default());

        let err = acquirer.acquire_local_stream().await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert_eq!(acquirer.state(), StreamState::Inactive);
    }

    #[tokio::test]
    async fn test_empty_stream_id_is_rejected() {
        let devices = Arc::new(FakeDevices::default());
        let acquirer = StreamAcquirer::new(devices, MediaConstraints::default());

        let err = acquirer.acquire_desktop_stream("  ").await.unwrap_err();
        assert!(matches!(err, AppError::NoStreamId));

        let desktop = acquirer.acquire_desktop_stream("screen:0").await.unwrap();
        assert_eq!(desktop.video_tracks().count(), 1);
    }
}
