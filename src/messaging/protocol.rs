//! Message schema
//!
//! Requests are a tagged union serialized as `{"type": "...", "payload": {...}}`.
//! Every request is answered by exactly one [`MessageResponse`].

use crate::utils::{AppError, ErrorResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of `start-recording`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingPayload {
    /// Capture token returned by the source picker
    #[serde(default)]
    pub stream_id: String,

    /// Extra picker options, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// Payload of `redirect-to-url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectPayload {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// Payload of `set-badge`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgePayload {
    /// Badge text, empty to clear
    pub text: String,

    /// Background colour as RGBA
    pub color: [u8; 4],
}

/// Request sent over a message port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    /// Page asks the background to pick a capture source
    #[serde(rename = "get-stream")]
    GetStream,

    /// Background hands the chosen source to the page
    #[serde(rename = "start-recording")]
    StartRecording(StartRecordingPayload),

    /// Stop an active recording and open the result
    #[serde(rename = "stop-recording")]
    StopRecording,

    /// Open a URL in a new tab
    #[serde(rename = "redirect-to-url")]
    Redirect(RedirectPayload),

    /// Update the toolbar badge
    #[serde(rename = "set-badge")]
    SetBadge(BadgePayload),

    /// The toolbar icon was clicked
    #[serde(rename = "icon-clicked")]
    IconClicked,
}

impl Message {
    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            Message::GetStream => "get-stream",
            Message::StartRecording(_) => "start-recording",
            Message::StopRecording => "stop-recording",
            Message::Redirect(_) => "redirect-to-url",
            Message::SetBadge(_) => "set-badge",
            Message::IconClicked => "icon-clicked",
        }
    }

    /// Parse a raw JSON request.
    ///
    /// Unknown or missing types map to "Unknown message type"; a known type
    /// with a bad payload maps to an error describing the payload.
    pub fn from_json(value: Value) -> Result<Message, MessageResponse> {
        let kind = value.get("type").and_then(Value::as_str).map(str::to_string);
        let Some(kind) = kind else {
            return Err(MessageResponse::from_error(&AppError::UnknownMessageType));
        };
        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Err(MessageResponse::from_error(&AppError::UnknownMessageType));
        }

        let needs_payload = matches!(kind.as_str(), "start-recording" | "redirect-to-url" | "set-badge");
        if needs_payload && value.get("payload").map_or(true, Value::is_null) {
            return Err(MessageResponse::error(format!(
                "Could not find the payload for {}",
                kind
            )));
        }

        // Unit variants ignore any payload that was sent along
        let value = if needs_payload {
            value
        } else {
            serde_json::json!({ "type": kind })
        };

        serde_json::from_value(value)
            .map_err(|e| MessageResponse::error(format!("Invalid {} payload: {}", kind, e)))
    }
}

const KNOWN_TYPES: [&str; 6] = [
    "get-stream",
    "start-recording",
    "stop-recording",
    "redirect-to-url",
    "set-badge",
    "icon-clicked",
];

/// Kind of response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Success,
    Error,
    Redirect,
}

/// Answer to a single [`Message`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,

    pub message: String,

    #[serde(rename = "type")]
    pub kind: ResponseType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: ResponseType::Success,
            payload: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: ResponseType::Error,
            payload: None,
        }
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            success: true,
            message: "Redirected".to_string(),
            kind: ResponseType::Redirect,
            payload: Some(serde_json::json!({ "url": url })),
        }
    }

    /// Failed response carrying the error code as payload
    pub fn from_error(error: &AppError) -> Self {
        let detail = ErrorResponse::from(error);
        Self {
            success: false,
            message: detail.message.clone(),
            kind: ResponseType::Error,
            payload: serde_json::to_value(detail).ok(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let message = Message::StartRecording(StartRecordingPayload {
            stream_id: "screen:1:0".to_string(),
            options: None,
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "start-recording", "payload": {"streamId": "screen:1:0"}})
        );
        assert_eq!(
            serde_json::to_value(Message::IconClicked).unwrap(),
            json!({"type": "icon-clicked"})
        );
    }

    #[test]
    fn test_badge_payload_parses() {
        let message = Message::from_json(json!({
            "type": "set-badge",
            "payload": {"text": "Rec", "color": [252, 16, 16, 255]}
        }))
        .unwrap();

        assert_eq!(
            message,
            Message::SetBadge(BadgePayload {
                text: "Rec".to_string(),
                color: [252, 16, 16, 255],
            })
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let response = Message::from_json(json!({"type": "take-screenshot"})).unwrap_err();

        assert!(!response.success);
        assert_eq!(response.kind, ResponseType::Error);
        assert_eq!(response.message, "Unknown message type");

        let response = Message::from_json(json!({"payload": {}})).unwrap_err();
        assert_eq!(response.message, "Unknown message type");
    }

    #[test]
    fn test_missing_payload_is_rejected() {
        let response = Message::from_json(json!({"type": "redirect-to-url"})).unwrap_err();
        assert!(!response.success);
        assert!(response.message.contains("payload"));
    }

    #[test]
    fn test_unit_messages_ignore_payload() {
        let message = Message::from_json(json!({"type": "get-stream", "payload": {"x": 1}})).unwrap();
        assert_eq!(message, Message::GetStream);
    }

    #[test]
    fn test_response_serialization() {
        let response = MessageResponse::success("Badge set");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "message": "Badge set", "type": "success"})
        );

        let response = MessageResponse::from_error(&AppError::NoStreamId);
        assert_eq!(response.message, "No stream id");
        assert_eq!(response.payload.unwrap()["code"], "NO_STREAM_ID");
    }
}
