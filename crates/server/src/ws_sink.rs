use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::Mutex;

use gatewatch_core::pipeline::frame_sink::FrameSink;
use gatewatch_core::pipeline::stream_message::{StreamMessage, TransportError};

/// Send half of a client websocket, shared between the session loop and
/// the connection registry.
#[derive(Clone)]
pub struct WsFrameSink {
    tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    closed: Arc<AtomicBool>,
}

impl WsFrameSink {
    pub fn new(tx: SplitSink<WebSocket, Message>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(tx)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Called by the reader task when the peer closes or the stream ends.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl FrameSink for WsFrameSink {
    async fn send(&mut self, message: &StreamMessage) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let text = message.to_json()?;
        let mut tx = self.tx.lock().await;
        if let Err(e) = tx.send(Message::Text(text)).await {
            self.closed.store(true, Ordering::SeqCst);
            return Err(TransportError::Send(e.to_string()));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut tx = self.tx.lock().await;
        // Peer may already be gone.
        let _ = tx.send(Message::Close(None)).await;
        let _ = tx.close().await;
    }
}
