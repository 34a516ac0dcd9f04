//! The listening side: bind, accept, place connections on reactors and route
//! their requests.
//!
//! ```no_run
//! use av_http::protocol::Request;
//! use av_server::{ConnectionHandle, ConnectionRegistry, ReactorPool, Server};
//!
//! let pool = ReactorPool::new(4)?;
//! let server = Server::new(&pool, "0.0.0.0", 9999);
//! server.add_route("/ping", |_: &Request, connection: &ConnectionHandle, _: &ConnectionRegistry| {
//!     connection.write_response(r#"{"pong":true}"#);
//! })?;
//! server.start();
//! pool.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use av_http::protocol::Request;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tokio::select;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connection::{Connection, ConnectionHandle, Dispatch};
use crate::reactor::{Reactor, ReactorPool, Reactors};
use crate::registry::ConnectionRegistry;
use crate::router::{RequestHandler, RouteError, RoutingTable};

const LISTEN_BACKLOG: u32 = 1024;
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Failures while setting the listening socket up. They are logged, the server
/// then stays non-listening.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to resolve {address}:{port}: {source}")]
    Resolve { address: String, port: u16, source: io::Error },

    #[error("{address}:{port} resolved to no address")]
    NoAddress { address: String, port: u16 },

    #[error("failed to open socket for {addr}: {source}")]
    Open { addr: SocketAddr, source: io::Error },

    #[error("failed to set reuse-address on {addr}: {source}")]
    ReuseAddress { addr: SocketAddr, source: io::Error },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to listen on {addr}: {source}")]
    Listen { addr: SocketAddr, source: io::Error },
}

/// An HTTP server accepting on one reactor of a [`ReactorPool`] and spreading
/// connections over all of them. Cloning shares the same server.
#[derive(Debug, Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

#[derive(Debug)]
struct ServerInner {
    reactors: Arc<Reactors>,
    acceptor: Reactor,
    listener: Mutex<Option<TcpListener>>,
    local_addr: Option<SocketAddr>,
    routes: RoutingTable,
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
    next_id: AtomicU64,
}

impl Server {
    /// Binds `address:port` on a reactor of `pool`.
    ///
    /// A failing bind is logged and leaves the server non-listening,
    /// [`Server::start`] is then a no-op.
    pub fn new(pool: &ReactorPool, address: &str, port: u16) -> Self {
        let acceptor = pool.next();

        let listener = {
            // registers the listener with the acceptor's reactor
            let _guard = acceptor.handle().enter();
            match bind(address, port) {
                Ok(listener) => Some(listener),
                Err(e) => {
                    error!(cause = %e, "server is not listening");
                    None
                }
            }
        };
        let local_addr = listener.as_ref().and_then(|listener| listener.local_addr().ok());
        if let Some(addr) = local_addr {
            info!(%addr, reactor = acceptor.index(), "server listening");
        }

        let inner = Arc::new(ServerInner {
            reactors: pool.reactors(),
            acceptor,
            listener: Mutex::new(listener),
            local_addr,
            routes: RoutingTable::new(),
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: CancellationToken::new(),
            next_id: AtomicU64::new(1),
        });

        if inner.local_addr.is_some() {
            inner.spawn_tick();
        }
        Self { inner }
    }

    pub fn is_listening(&self) -> bool {
        self.inner.local_addr.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    /// Registers `handler` for requests whose lower-cased URI equals `uri`.
    pub fn add_route(&self, uri: impl Into<String>, handler: impl RequestHandler + 'static) -> Result<(), RouteError> {
        self.inner.routes.add(uri, handler)
    }

    /// Invokes the handler registered for the request URI.
    pub fn dispatch(&self, request: &Request, connection: &ConnectionHandle) -> Result<(), RouteError> {
        self.inner.dispatch(request, connection)
    }

    /// Starts accepting connections. Does nothing when the server is not listening
    /// or already accepting.
    pub fn start(&self) {
        let Some(listener) = self.inner.listener.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            warn!("server is not listening or already started, ignore start");
            return;
        };

        let inner = Arc::clone(&self.inner);
        self.inner.acceptor.spawn(async move { inner.accept_loop(listener).await });
    }

    /// Stops accepting, stops the housekeeping tick and closes every connection.
    pub fn stop(&self) {
        info!("stopping server");
        self.inner.shutdown.cancel();
        self.inner.registry.stop_all();
    }
}

impl ServerInner {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let dispatcher: Arc<dyn Dispatch> = Arc::clone(&self) as Arc<dyn Dispatch>;

        loop {
            // the next connection is placed before accepting
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let connection = Connection::new(id, self.reactors.next());

            let accepted = select! {
                biased;
                () = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!(id, %peer, reactor = connection.reactor().index(), "accepted connection");
                    self.registry.start(connection, stream, peer, Arc::clone(&dispatcher));
                }
                Err(e) => warn!(cause = %e, "failed to accept"),
            }
        }

        info!("stopped accepting");
    }

    fn spawn_tick(self: &Arc<Self>) {
        let registry = Arc::clone(&self.registry);
        let shutdown = self.shutdown.clone();
        self.acceptor.spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                select! {
                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => registry.tick(),
                }
            }
        });
    }
}

impl Dispatch for ServerInner {
    fn dispatch(&self, request: &Request, connection: &ConnectionHandle) -> Result<(), RouteError> {
        self.routes.dispatch(request, connection, &self.registry)
    }
}

fn bind(address: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr = (address, port)
        .to_socket_addrs()
        .map_err(|source| ServerError::Resolve { address: address.to_owned(), port, source })?
        .next()
        .ok_or_else(|| ServerError::NoAddress { address: address.to_owned(), port })?;

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(|source| ServerError::Open { addr, source })?;
    socket.set_reuseaddr(true).map_err(|source| ServerError::ReuseAddress { addr, source })?;
    socket.bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
    socket.listen(LISTEN_BACKLOG).map_err(|source| ServerError::Listen { addr, source })
}
