//! Protocol types shared by the codecs and the server.
//!
//! - [`Request`]: a parsed client request, normalised before dispatch
//! - [`Response`]: what a handler queues back to its connection
//! - [`StatusLine`] / [`ResponseHead`]: decoded heads of upstream responses
//! - [`ParseError`] / [`SendError`]: failures of the decoding and encoding halves

mod request;
pub use request::Header;
pub use request::HttpVersion;
pub use request::Request;

mod response;
pub use response::Response;

mod response_head;
pub use response_head::ResponseHead;
pub use response_head::StatusLine;

mod error;
pub use error::ParseError;
pub use error::SendError;

/// Parses the leading decimal digits of `value`, skipping leading whitespace.
///
/// Yields 0 when there is no digit and saturates on overflow.
pub(crate) fn parse_leading_u64(value: &str) -> u64 {
    value
        .trim_start()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .try_fold(0u64, |acc, digit| acc.checked_mul(10)?.checked_add(u64::from(digit - b'0')))
        .unwrap_or(u64::MAX)
}
