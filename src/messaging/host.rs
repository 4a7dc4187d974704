//! Privileged host capabilities used by the background service

use crate::capture::CaptureSource;
use crate::utils::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A browser tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: u32,
    pub url: Option<String>,
}

/// Result of the capture source picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesktopMediaChoice {
    /// Capture token, empty when the user cancelled
    pub stream_id: String,

    /// Picker options such as whether audio may be captured
    pub options: Option<Value>,
}

/// Browser APIs only the background side may call
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Active tab of the current window
    async fn active_tab(&self) -> AppResult<Option<TabInfo>>;

    /// Show the capture source picker. `None` when the user cancels.
    async fn choose_desktop_media(
        &self,
        sources: &[CaptureSource],
        tab: &TabInfo,
    ) -> AppResult<Option<DesktopMediaChoice>>;

    /// Open `url` in a new top-level tab
    async fn create_tab(&self, url: &str) -> AppResult<TabInfo>;

    async fn set_badge_text(&self, text: &str) -> AppResult<()>;

    async fn set_badge_background_color(&self, color: [u8; 4]) -> AppResult<()>;
}
