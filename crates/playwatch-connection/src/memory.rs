//! In-process connector.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use playwatch_protocols::TransportError;

use crate::connector::{Connector, Link, RemoteEnd};

/// Connector whose peers are scripted in advance.
///
/// Each `connect` call consumes the next queued outcome. With nothing
/// queued the attempt fails as if no server were listening.
pub struct MemoryConnector {
    buffer: usize,
    queue: Mutex<VecDeque<Result<Link, TransportError>>>,
    attempts: AtomicU32,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_buffer(16)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            buffer,
            queue: Mutex::new(VecDeque::new()),
            attempts: AtomicU32::new(0),
        }
    }

    /// Accept the next connection attempt and return the server side of it.
    pub fn accept_next(&self) -> RemoteEnd {
        let (link, remote) = Link::pair(self.buffer);
        self.queue.lock().push_back(Ok(link));
        remote
    }

    /// Fail the next connection attempt with `error`.
    pub fn refuse_next(&self, error: TransportError) {
        self.queue.lock().push_back(Err(error));
    }

    /// Number of connect calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::ConnectionFailed("no peer listening".into())))
    }
}
