//! Remote click dispatch.

mod dispatcher;
mod http_transport;
mod transport;

pub use dispatcher::{ClickDispatcher, ClickRecord};
pub use http_transport::HttpClickTransport;
pub use transport::ClickTransport;
