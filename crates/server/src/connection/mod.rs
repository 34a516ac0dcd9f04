//! Client connections and the state machine driving them.
//!
//! - [`Connection`]: the shared handle handlers write their responses through
//! - [`HttpConnection`]: the per-connection driver reading requests, dispatching them
//!   and writing the responses back
//! - [`Dispatch`]: the seam between the driver and the routing

mod handle;
mod http_connection;

pub use handle::Connection;
pub use handle::ConnectionHandle;
pub use http_connection::ConnectionError;
pub use http_connection::Dispatch;
pub use http_connection::HttpConnection;

#[cfg(test)]
pub(crate) use http_connection::MockDispatch;
