use std::io;

use av_http::codec::{RequestDecoder, ResponseEncoder};
use av_http::protocol::{ParseError, Request, Response, SendError};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

use crate::connection::ConnectionHandle;
use crate::router::RouteError;

/// Hands a complete request to whoever answers it.
///
/// The dispatcher is expected to eventually queue exactly one response on
/// `connection`. An error closes the connection without a response.
#[cfg_attr(test, mockall::automock)]
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, request: &Request, connection: &ConnectionHandle) -> Result<(), RouteError>;
}

/// Why a connection was closed before the client closed it.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("request error: {0}")]
    Request(#[from] ParseError),

    #[error("response error: {0}")]
    Response(#[from] SendError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] RouteError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectionError {
    /// Socket failures, as opposed to requests the server refused.
    pub fn is_transport(&self) -> bool {
        matches!(self, ConnectionError::Io(_) | ConnectionError::Request(ParseError::Io { .. }) | ConnectionError::Response(_))
    }
}

/// Drives one connection through its request cycle
///
/// ```text
/// read headers -> [read body] -> dispatch -> write response -> read headers (keep-alive)
///                                                           \-> close
/// ```
///
/// The next request is read only after the response to the previous one has been
/// written, pipelined requests wait in the read buffer. Any error, an unmatched
/// route, or [`Connection::stop`](crate::connection::Connection::stop) closes the
/// connection without a response.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    connection: ConnectionHandle,
    responses: UnboundedReceiver<Response>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, connection: ConnectionHandle, responses: UnboundedReceiver<Response>) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            connection,
            responses,
        }
    }

    /// Runs until the client closes the connection, the request is not keep-alive,
    /// the connection is stopped, or an error occurs.
    pub async fn process(mut self, dispatcher: &dyn Dispatch) -> Result<(), ConnectionError> {
        let cancel = self.connection.cancellation();

        loop {
            let next = select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("connection aborted while reading");
                    return Ok(());
                }
                next = self.framed_read.next() => next,
            };

            let request = match next {
                Some(Ok(request)) => request,
                Some(Err(e)) => {
                    warn!(cause = %e, "can't receive next request");
                    return Err(e.into());
                }
                None => {
                    debug!("can't read more request, peer closed the connection");
                    return Ok(());
                }
            };

            trace!(method = request.method(), uri = request.uri(), keep_alive = request.keep_alive(), "dispatching request");
            self.framed_write.encoder_mut().set_version(request.version());
            if let Err(e) = dispatcher.dispatch(&request, &self.connection) {
                warn!(uri = request.uri(), cause = %e, "dispatch failed");
                return Err(e.into());
            }

            let response = select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("connection aborted while waiting for the response");
                    return Ok(());
                }
                response = self.responses.recv() => response,
            };
            let Some(response) = response else {
                return Ok(());
            };

            select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("connection aborted while writing the response");
                    return Ok(());
                }
                sent = self.framed_write.send(response) => sent?,
            }

            if !request.keep_alive() {
                debug!("request is not keep-alive, closing");
                return Ok(());
            }
        }
    }
}
