//! HTTP request decoder module
//!
//! This module drives the [`RequestParser`] over a connection's read buffer and
//! yields complete, normalised [`Request`]s.
//!
//! # Phases
//!
//! 1. Header read: wait until the buffer holds `\r\n\r\n`, then parse everything
//!    buffered so far. Anything short of [`ParseStatus::Complete`] at this point is a
//!    malformed request.
//! 2. Body read: only POST requests carry a body. The announced length must lie in
//!    `(0, 65536)`; the decoder waits until that many bytes are buffered and moves
//!    exactly them into the request.
//!
//! Bytes following a request stay in the buffer, so pipelined requests are decoded
//! one after the other.
//!
//! # Example
//!
//! ```
//! use av_http::codec::RequestDecoder;
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET /ping HTTP/1.1\r\nConnection: keep-alive\r\n\r\n"[..]);
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//!
//! assert_eq!(request.uri(), "/ping");
//! assert!(request.keep_alive());
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::request_parser::{ParseStatus, RequestParser};
use crate::utils::ensure;
use crate::protocol::{ParseError, Request};

/// Upper bound (exclusive) of a POST body.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Maximum size in bytes allowed for the request line plus header block.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A decoder turning a byte stream into [`Request`]s.
///
/// The decoder keeps the request whose headers are complete while its body is
/// still arriving.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    parser: RequestParser,
    pending: Option<Request>,
    /// how far the terminator search got, so a slow client is not rescanned
    scanned: usize,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` instance
    pub fn new() -> Self {
        Default::default()
    }

    fn decode_header(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ParseError> {
        let search_from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
        let Some(position) = find_terminator(&src[search_from..]) else {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            self.scanned = src.len();
            return Ok(None);
        };
        self.scanned = 0;

        let header_end = search_from + position + HEADER_TERMINATOR.len();
        ensure!(header_end <= MAX_HEADER_BYTES, ParseError::too_large_header(header_end, MAX_HEADER_BYTES));

        self.parser.reset();
        let mut request = Request::new();
        let (status, consumed) = self.parser.parse(&mut request, src);
        match status {
            ParseStatus::Complete => {}
            ParseStatus::Invalid => return Err(ParseError::malformed(consumed - 1)),
            ParseStatus::NeedMoreData => return Err(ParseError::Incomplete),
        }

        trace!(header_size = consumed, "parsed request header");
        src.advance(consumed);
        request.normalise();

        if request.method() != "post" {
            return Ok(Some(request));
        }

        let length = request.content_length();
        ensure!(length > 0 && length < MAX_BODY_BYTES, ParseError::content_length_out_of_range(length, MAX_BODY_BYTES));

        self.pending = Some(request);
        self.decode_body(src)
    }

    fn decode_body(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ParseError> {
        let Some(request) = self.pending.as_mut() else {
            return Ok(None);
        };

        // bounded by MAX_BODY_BYTES, fits in usize
        let length = request.content_length() as usize;
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        request.set_body(src.split_to(length).freeze());
        trace!(body_size = length, "read request body");
        Ok(self.pending.take())
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Attempts to decode a request from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: a complete request, body included when it has one
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: malformed request or a POST length outside the accepted range
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_some() {
            return self.decode_body(src);
        }
        self.decode_header(src)
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes.windows(HEADER_TERMINATOR.len()).position(|window| window == HEADER_TERMINATOR)
}
