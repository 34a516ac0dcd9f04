//! Byte level codecs of the protocol layer.
//!
//! - Request side:
//!   - [`RequestParser`]: incremental, chunk-boundary invariant request parser
//!   - [`RequestDecoder`]: tokio-util [`Decoder`](tokio_util::codec::Decoder) framing
//!     requests, bodies included, out of a connection's read buffer
//!
//! - Response side:
//!   - [`ResponseEncoder`]: tokio-util [`Encoder`](tokio_util::codec::Encoder) writing
//!     queued [`Response`](crate::protocol::Response)s
//!   - [`parse_status_line`] / [`parse_response_head`]: decoders for the head of a
//!     response received from an upstream peer
//!
//! # Example
//!
//! ```
//! use av_http::codec::{RequestDecoder, ResponseEncoder};
//! use av_http::protocol::Response;
//! use bytes::BytesMut;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::from(&b"GET /ping HTTP/1.0\r\n\r\n"[..]);
//! let request = decoder.decode(&mut request_buffer).unwrap().unwrap();
//!
//! let mut encoder = ResponseEncoder::new();
//! encoder.set_version(request.version());
//! let mut response_buffer = BytesMut::new();
//! encoder.encode(Response::json(r#"{"pong":true}"#), &mut response_buffer).unwrap();
//!
//! assert!(response_buffer.starts_with(b"HTTP/1.0 200 OK\r\n"));
//! ```

mod request_decoder;
mod request_parser;
mod response_encoder;
mod response_head_decoder;

pub use request_decoder::{MAX_BODY_BYTES, MAX_HEADER_BYTES, RequestDecoder};
pub use request_parser::{ParseStatus, RequestParser};
pub use response_encoder::ResponseEncoder;
pub use response_head_decoder::{parse_response_head, parse_status_line};
