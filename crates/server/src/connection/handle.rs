use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use av_http::protocol::Response;
use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span, warn};

use crate::connection::{ConnectionError, Dispatch, HttpConnection};
use crate::reactor::Reactor;
use crate::registry::ConnectionRegistry;

/// Shared handle of a connection, held by the registry and by its running driver.
pub type ConnectionHandle = Arc<Connection>;

/// One accepted client connection.
///
/// Handlers answer the request they were dispatched with through
/// [`Connection::write_response`] or [`Connection::write_raw_response`], right away
/// or later from any thread. The connection's driver writes the response and then
/// reads the next request if the client asked for keep-alive.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    reactor: Reactor,
    responses: UnboundedSender<Response>,
    receiver: Mutex<Option<UnboundedReceiver<Response>>>,
    cancel: CancellationToken,
}

impl Connection {
    /// Creates a connection that will run on `reactor` once started.
    pub fn new(id: u64, reactor: Reactor) -> ConnectionHandle {
        let (responses, receiver) = mpsc::unbounded_channel();
        Arc::new(Self { id, reactor, responses, receiver: Mutex::new(Some(receiver)), cancel: CancellationToken::new() })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    /// Answers with `200 OK` and an `application/json` body.
    pub fn write_response(&self, body: impl Into<Bytes>) {
        self.queue(Response::json(body));
    }

    /// Answers with a caller supplied status line and header block followed by
    /// `body`. The head must end with the blank line, it is not checked.
    pub fn write_raw_response(&self, head: impl Into<Bytes>, body: impl Into<Bytes>) {
        self.queue(Response::raw(head, body));
    }

    /// Closes the connection. Calling it again has no effect.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!(id = self.id, "stopping connection");
            self.cancel.cancel();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn take_responses(&self) -> Option<UnboundedReceiver<Response>> {
        self.receiver.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn queue(&self, response: Response) {
        if self.responses.send(response).is_err() {
            debug!(id = self.id, "connection already closed, response dropped");
        }
    }

    /// Moves `stream` onto this connection's reactor and drives it there until
    /// the connection closes, then removes the connection from `registry`.
    pub fn start(
        self: &Arc<Self>,
        stream: TcpStream,
        peer: SocketAddr,
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<dyn Dispatch>,
    ) {
        let Some(responses) = self.take_responses() else {
            warn!(id = self.id, "connection already started");
            return;
        };

        // the stream is registered with the accepting reactor, detach it first
        let stream = match stream.into_std() {
            Ok(stream) => stream,
            Err(e) => {
                error!(id = self.id, cause = %e, "failed to detach accepted stream");
                registry.stop(self);
                return;
            }
        };

        let connection = Arc::clone(self);
        let span = info_span!("connection", id = self.id, %peer, reactor = self.reactor.index());
        self.reactor.spawn(
            async move {
                match drive(&connection, stream, responses, dispatcher.as_ref()).await {
                    Ok(()) => debug!("connection closed"),
                    Err(e) if e.is_transport() => error!(cause = %e, "connection closed on transport error"),
                    Err(e) => warn!(cause = %e, "connection closed"),
                }
                registry.stop(&connection);
            }
            .instrument(span),
        );
    }
}

async fn drive(
    connection: &ConnectionHandle,
    stream: std::net::TcpStream,
    responses: UnboundedReceiver<Response>,
    dispatcher: &dyn Dispatch,
) -> Result<(), ConnectionError> {
    let stream = TcpStream::from_std(stream)?;
    if let Err(e) = stream.set_nodelay(true) {
        error!(cause = %e, "failed to disable send coalescing");
    }

    let (reader, writer) = stream.into_split();
    HttpConnection::new(reader, writer, Arc::clone(connection), responses).process(dispatcher).await
}
