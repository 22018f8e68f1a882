//! # Playwatch Core
//!
//! Client-side state for watching remote playbook runs:
//!
//! - [`ExecutionStore`] reconciles out-of-order execution snapshots into one
//!   canonical record per run.
//! - [`FrameBuffer`] keeps the latest screenshot per run and freezes on it
//!   once the stream ends.
//! - [`map_click`] turns a click on a scaled image into native coordinates.
//! - [`ClickDispatcher`] and [`RemoteClicker`] deliver clicks to the remote
//!   browser.
//! - [`WatchSession`] wires all of it to one [`ConnectionManager`].
//!
//! [`ConnectionManager`]: playwatch_connection::ConnectionManager

pub mod clicker;
pub mod dispatch;
pub mod error;
pub mod frames;
pub mod mapper;
pub mod reconciler;
pub mod session;

pub use clicker::{RenderedClick, RemoteClicker};
pub use dispatch::{ClickDispatcher, ClickRecord, ClickTransport, HttpClickTransport};
pub use error::ClickError;
pub use frames::{FrameBuffer, FrameStats};
pub use mapper::map_click;
pub use reconciler::{ApplyOutcome, ExecutionStore, ReconcilerStats, RejectReason};
pub use session::WatchSession;
