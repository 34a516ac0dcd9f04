//! The serving side of avrouter
//!
//! A fixed pool of single-threaded reactors, an acceptor placing every new
//! connection on the next reactor round-robin, a per-connection driver running
//! the read, dispatch, write and keep-alive cycle, and an exact-match routing
//! table handing requests to the host application.
//!
//! # Example
//!
//! ```no_run
//! use av_http::form::Form;
//! use av_http::protocol::Request;
//! use av_server::{ConnectionHandle, ConnectionRegistry, ReactorPool, Server};
//!
//! fn login(request: &Request, connection: &ConnectionHandle, _: &ConnectionRegistry) {
//!     let form = Form::parse(request.header("content-type").unwrap_or_default(), request.body());
//!     match form.get("user") {
//!         Some(_) => connection.write_response(r#"{"ok":true}"#),
//!         None => connection.write_raw_response("HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n", ""),
//!     }
//! }
//!
//! let pool = ReactorPool::new(4)?;
//! let server = Server::new(&pool, "127.0.0.1", 8080);
//! server.add_route("/login", login)?;
//! server.start();
//! pool.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Failure handling
//!
//! Every failure on a connection closes it without a response: malformed requests,
//! POST bodies outside `(0, 65536)` bytes, unmatched URIs and transport errors look
//! the same to the client. A server that fails to bind logs the cause and never
//! accepts.

mod config;
mod reactor;
mod registry;
mod router;
mod server;

pub mod connection;

pub use config::Options;
pub use connection::{Connection, ConnectionError, ConnectionHandle, Dispatch, HttpConnection};
pub use reactor::{Reactor, ReactorPool, Reactors, StopHandle};
pub use registry::ConnectionRegistry;
pub use router::{RequestHandler, RouteError, RoutingTable};
pub use server::{Server, ServerError};
