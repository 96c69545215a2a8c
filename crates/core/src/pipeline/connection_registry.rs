use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::pipeline::frame_sink::FrameSink;
use crate::pipeline::stream_message::StreamMessage;

/// Handle returned by [`ConnectionRegistry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Process-wide set of live client connections.
///
/// Used for connection-count logging and best-effort fan-out. Sessions push
/// their own frames directly; nothing on that path goes through here.
pub struct ConnectionRegistry<S: FrameSink + Clone> {
    connections: Mutex<HashMap<ConnectionId, S>>,
    next_id: AtomicU64,
}

impl<S: FrameSink + Clone> ConnectionRegistry<S> {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn register(&self, sink: S) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let total = {
            let mut connections = self.lock();
            connections.insert(id, sink);
            connections.len()
        };
        log::info!("Client connected. Total: {total}");
        id
    }

    /// Remove `id`. Unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) {
        let (removed, total) = {
            let mut connections = self.lock();
            let removed = connections.remove(&id).is_some();
            (removed, connections.len())
        };
        if removed {
            log::info!("Client disconnected. Total: {total}");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `message` to every registered connection, ignoring failures.
    ///
    /// Failed connections stay registered; removal only happens through
    /// [`unregister`](Self::unregister).
    pub async fn broadcast_best_effort(&self, message: &StreamMessage) {
        for mut sink in self.snapshot() {
            if let Err(e) = sink.send(message).await {
                log::warn!("Broadcast to client failed: {e}");
            }
        }
    }

    /// Close every registered connection without unregistering it.
    pub async fn close_all(&self) {
        for mut sink in self.snapshot() {
            sink.close().await;
        }
    }

    fn snapshot(&self) -> Vec<S> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, S>> {
        // A panicking holder cannot leave the map half-updated.
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: FrameSink + Clone> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
