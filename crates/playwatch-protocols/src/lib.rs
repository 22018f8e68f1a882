//! # Playwatch Protocols
//!
//! Wire types shared by every Playwatch crate: the realtime message envelope,
//! execution snapshots, screenshot frames, click commands, and the error
//! taxonomy.
//!
//! Contains only data definitions and codecs - no I/O.

pub mod click;
pub mod connection;
pub mod error;
pub mod execution;
pub mod frame;
pub mod message;

pub use click::{ClickAck, ClickCommand, NativePoint};
pub use connection::ConnectionState;
pub use error::{DecodeError, DispatchError, FrameError, MapError, TransportError};
pub use execution::{ExecutionSnapshot, ExecutionStatus, StepResult, StepStatus};
pub use frame::FrameRecord;
pub use message::{InboundMessage, OutboundMessage};

/// Opaque run identifier, stable for the lifetime of a run.
pub type ExecutionId = String;
