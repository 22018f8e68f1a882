//! Transport abstraction under the connection manager.

use async_trait::async_trait;
use tokio::sync::mpsc;

use playwatch_protocols::TransportError;

/// Opens one physical link to the server.
///
/// A link is a pair of text-frame queues. The link is considered closed
/// when `inbound` yields `None`; dropping `outbound` closes it from this side.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Perform the handshake and return the established link.
    async fn connect(&self) -> Result<Link, TransportError>;
}

/// Client side of an established link.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<String>,
}

/// Server side of a link created with [`Link::pair`].
#[derive(Debug)]
pub struct RemoteEnd {
    /// Frames sent here arrive on the client's `inbound`.
    pub to_client: mpsc::Sender<String>,
    /// Frames the client sent.
    pub from_client: mpsc::Receiver<String>,
}

impl Link {
    /// Create a connected link and its far end.
    pub fn pair(buffer: usize) -> (Link, RemoteEnd) {
        let buffer = buffer.max(1);
        let (outbound, from_client) = mpsc::channel(buffer);
        let (to_client, inbound) = mpsc::channel(buffer);
        (
            Link { outbound, inbound },
            RemoteEnd {
                to_client,
                from_client,
            },
        )
    }
}

impl RemoteEnd {
    /// Push one text frame to the client. Returns false once the client is gone.
    pub async fn send(&self, frame: impl Into<String>) -> bool {
        self.to_client.send(frame.into()).await.is_ok()
    }

    /// Next frame the client sent, or `None` once the client closed the link.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Close the link from the server side.
    pub fn close(self) {}
}
