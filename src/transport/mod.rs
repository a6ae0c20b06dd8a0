//! Transport adapters (C5).
//!
//! The ingress/egress transports are the only pluggable interfaces in this
//! system — a capability set of `{recv() -> bytes | EOF}` and
//! `{send(bytes)}` is enough. The concrete
//! implementation is a named local Unix domain stream socket
//! ([`ipc`]); tests use the in-memory [`MockEgress`] / channel-backed
//! ingress below instead.

pub mod ipc;

use crate::messages::BboUpdate;

/// Pulls framed JSON payloads from a local endpoint.
#[async_trait::async_trait]
pub trait Ingress: Send {
    /// Returns the next frame's payload, or `None` once the peer has
    /// disconnected — a disconnect ends the session for good.
    async fn recv(&mut self) -> std::io::Result<Option<Vec<u8>>>;
}

/// Pushes BBO updates to a peer-bound local endpoint.
#[async_trait::async_trait]
pub trait Egress: Send {
    async fn send(&mut self, update: &BboUpdate) -> anyhow::Result<()>;
}

/// In-memory egress used by engine tests: records every [`BboUpdate`] it
/// is handed instead of writing to a socket.
pub struct MockEgress {
    sink: std::sync::Arc<std::sync::Mutex<Vec<BboUpdate>>>,
}

impl MockEgress {
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<BboUpdate>>>) {
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            Self {
                sink: sink.clone(),
            },
            sink,
        )
    }
}

#[async_trait::async_trait]
impl Egress for MockEgress {
    async fn send(&mut self, update: &BboUpdate) -> anyhow::Result<()> {
        self.sink.lock().unwrap().push(update.clone());
        Ok(())
    }
}

/// In-memory ingress used by integration tests: yields each queued frame
/// in order, then reports EOF.
pub struct MockIngress {
    frames: std::collections::VecDeque<Vec<u8>>,
}

impl MockIngress {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl Ingress for MockIngress {
    async fn recv(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.frames.pop_front())
    }
}
