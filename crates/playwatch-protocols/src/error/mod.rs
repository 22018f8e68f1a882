//! Error types for the Playwatch protocol layer.

mod decode;
mod dispatch;
mod frame;
mod geometry;
mod transport;

pub use decode::*;
pub use dispatch::*;
pub use frame::*;
pub use geometry::*;
pub use transport::*;
