//! The HTTP/1.x protocol layer of the avrouter server
//!
//! This crate holds everything about HTTP that does not touch a socket: the request
//! model, an incremental request parser, the tokio-util codecs a connection drives its
//! socket with, decoders for upstream response heads and POST form bodies.
//!
//! # Features
//!
//! - Byte-at-a-time request parsing with a tri-state result, the input may be split
//!   at any byte boundary
//! - Query parameters split out of the URI, raw
//! - Header continuation lines (LWS folding)
//! - Keep-alive detection and pipelined requests
//! - POST bodies announced by `Content-Length`, bounded to `(0, 65536)`
//! - `application/x-www-form-urlencoded` and `multipart/form-data` decoding
//!
//! # Example
//!
//! ```
//! use av_http::codec::{ParseStatus, RequestParser};
//! use av_http::protocol::Request;
//!
//! let mut parser = RequestParser::new();
//! let mut request = Request::new();
//!
//! let (status, _) = parser.parse(&mut request, b"GET /Search?q=rust&page=2 HTT");
//! assert_eq!(status, ParseStatus::NeedMoreData);
//!
//! let (status, _) = parser.parse(&mut request, b"P/1.1\r\nConnection: Keep-Alive\r\n\r\n");
//! assert_eq!(status, ParseStatus::Complete);
//!
//! request.normalise();
//! assert_eq!(request.uri(), "/search");
//! assert_eq!(request.query_param("page"), Some("2"));
//! assert!(request.keep_alive());
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request, response and response head types, error types
//! - [`codec`]: parser, decoder and encoder implementations
//! - [`form`]: form body decoding for dispatched handlers
//!
//! # Limitations
//!
//! - No chunked transfer-encoding
//! - Bodies are read for POST requests only
//! - Maximum header size: 64KB

pub mod codec;
pub mod form;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
