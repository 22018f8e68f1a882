//! # Playwatch Connection
//!
//! Owns the single realtime channel of a client session.
//!
//! The [`ConnectionManager`] drives a four-state machine
//! (`connecting → connected → disconnected → reconnecting → ...`), reconnects
//! forever with capped exponential backoff, probes liveness with ping/pong, and
//! fans decoded [`InboundMessage`]s out to subscribers in arrival order.
//!
//! The physical transport sits behind the [`Connector`] trait:
//! [`WsConnector`] speaks WebSocket, [`MemoryConnector`] is an in-process peer
//! for tests and embedding.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let connector = Arc::new(WsConnector::new("ws://127.0.0.1:8000/ws"));
//! let manager = ConnectionManager::new(connector, ConnectionOptions::default());
//! let _sub = manager.subscribe(|msg| println!("{}", msg.kind()));
//! manager.connect().await;
//! ```
//!
//! [`InboundMessage`]: playwatch_protocols::InboundMessage

mod backoff;
mod connector;
mod manager;
mod memory;
mod subscription;
mod websocket;

pub use backoff::BackoffPolicy;
pub use connector::{Connector, Link, RemoteEnd};
pub use manager::{ConnectionManager, ConnectionOptions, ConnectionStats};
pub use memory::MemoryConnector;
pub use subscription::{HandlerRegistry, Subscription};
pub use websocket::WsConnector;
