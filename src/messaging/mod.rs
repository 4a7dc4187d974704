//! Message relay between the background service and the page
//!
//! Sequence of a recording:
//! 1. Toolbar icon clicked: background sends `icon-clicked`, page shows its popup
//! 2. Record pressed: page sends `get-stream`, background opens the source picker
//! 3. Background sends `start-recording` with the capture token, page starts the recorder
//! 4. Icon clicked again (or `stop-recording`): page stops, clears the badge and
//!    sends `redirect-to-url` with an object URL for the result

pub mod background;
pub mod host;
pub mod page;
pub mod port;
pub mod protocol;

pub use background::BackgroundService;
pub use host::{BrowserHost, DesktopMediaChoice, TabInfo};
pub use page::{CaptureSession, PageController};
pub use port::{channel, MessageHandler, MessagePort, MessageReceiver};
pub use protocol::{
    BadgePayload, Message, MessageResponse, RedirectPayload, ResponseType, StartRecordingPayload,
};

use serde_json::Value;

/// Parse a raw JSON request and answer it with `handler`
pub async fn dispatch_json<H>(handler: &H, request: Value) -> MessageResponse
where
    H: MessageHandler + ?Sized,
{
    match Message::from_json(request) {
        Ok(message) => handler.handle(message).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBackground;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_unknown_type() {
        let handler = RecordingBackground::default();

        let response = dispatch_json(&handler, json!({"type": "launch-rocket"})).await;

        assert!(!response.success);
        assert_eq!(response.message, "Unknown message type");
        assert!(handler.received().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_known_type() {
        let handler = RecordingBackground::default();

        let response = dispatch_json(
            &handler,
            json!({"type": "set-badge", "payload": {"text": "", "color": [0, 0, 0, 0]}}),
        )
        .await;

        assert!(response.success);
        assert_eq!(handler.received().len(), 1);
    }
}
