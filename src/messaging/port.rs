//! One-shot request/response transport
//!
//! A [`MessagePort`] sends a [`Message`] and waits for exactly one
//! [`MessageResponse`]. If the receiving side is gone the call fails at once;
//! there are no retries.

use super::protocol::{Message, MessageResponse};
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Error text when nobody is listening on the other end
pub const RECEIVING_END_GONE: &str =
    "Could not establish connection. Receiving end does not exist.";

/// Request plus the slot for its single reply
#[derive(Debug)]
pub struct Envelope {
    pub message: Message,
    pub reply: oneshot::Sender<MessageResponse>,
}

/// Something that answers messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Produce the response for `message`. Failures are reported in the
    /// response, never by panicking.
    async fn handle(&self, message: Message) -> MessageResponse;
}

/// Sending half of a message channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessagePort {
    tx: mpsc::Sender<Envelope>,
}

/// Receiving half of a message channel
#[derive(Debug)]
pub struct MessageReceiver {
    rx: mpsc::Receiver<Envelope>,
}

/// Create a connected port/receiver pair
pub fn channel(buffer: usize) -> (MessagePort, MessageReceiver) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (MessagePort { tx }, MessageReceiver { rx })
}

impl MessagePort {
    /// Send `message` and wait for its response
    pub async fn send(&self, message: Message) -> AppResult<MessageResponse> {
        let kind = message.kind();
        let (reply, response) = oneshot::channel();

        self.tx
            .send(Envelope { message, reply })
            .await
            .map_err(|_| AppError::Runtime(RECEIVING_END_GONE.to_string()))?;

        let response = response.await.map_err(|_| {
            AppError::Runtime("The message port closed before a response was received".to_string())
        })?;
        tracing::debug!("{} -> success={} ({})", kind, response.success, response.message);
        Ok(response)
    }

    /// True once the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl MessageReceiver {
    /// Next request, `None` once every port is dropped
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Answer requests with `handler` until every port is dropped.
    ///
    /// Each request is handled on its own task so a handler that sends a
    /// message back through another port cannot stall this loop.
    pub async fn serve<H>(mut self, handler: Arc<H>)
    where
        H: MessageHandler + ?Sized + 'static,
    {
        while let Some(Envelope { message, reply }) = self.rx.recv().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let kind = message.kind();
                let response = handler.handle(message).await;
                if reply.send(response).is_err() {
                    tracing::debug!("Sender of {} went away before the response", kind);
                }
            });
        }
        tracing::debug!("Message receiver closed");
    }
}
