use std::future::Future;

use crate::pipeline::stream_message::{StreamMessage, TransportError};

/// Outbound half of one client connection.
///
/// Implementations are cheap handles; clones address the same connection.
pub trait FrameSink: Send + Sync {
    /// Push one message. An error on the primary path ends the session.
    fn send(
        &mut self,
        message: &StreamMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// False once the peer has gone away or the sink was closed.
    fn is_connected(&self) -> bool;

    /// Close the connection. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
