//! HTTP request model produced by the [`RequestParser`](crate::codec::RequestParser).
//!
//! A [`Request`] is filled in place by the parser and then normalised exactly once
//! before it is dispatched. The derived fields ([`Request::content_length`] and
//! [`Request::keep_alive`]) only carry meaning after [`Request::normalise`] ran.

use std::fmt;

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_RANGE};

use crate::protocol::parse_leading_u64;

/// The `HTTP/major.minor` token of a request or status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    pub major: u32,
    pub minor: u32,
}

impl HttpVersion {
    pub const HTTP_10: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_11: HttpVersion = HttpVersion { major: 1, minor: 1 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// A single header line, in the order it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// A request received from a client.
///
/// Query parameters and headers keep their wire order and may contain duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) uri: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) version: HttpVersion,
    pub(crate) headers: Vec<Header>,
    content_length: u64,
    keep_alive: bool,
    body: Bytes,
    normalised: bool,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the request method, lower-cased once normalised.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request path without the query string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the raw `key=value` pairs of the query string.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the value of the first query pair named `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Looks a header up by name, ignoring ASCII case. The first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|header| header.name.eq_ignore_ascii_case(name)).map(|header| header.value.as_str())
    }

    /// Body length announced by the client, valid after [`Request::normalise`].
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Whether the client asked for `Connection: keep-alive`, valid after [`Request::normalise`].
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// The request body. Only POST requests carry one.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_normalised(&self) -> bool {
        self.normalised
    }

    /// Lower-cases method, uri and header names, then derives `content_length`
    /// and `keep_alive` from the headers.
    ///
    /// Only the first call has an effect.
    pub fn normalise(&mut self) {
        if self.normalised {
            return;
        }

        self.method.make_ascii_lowercase();
        self.uri.make_ascii_lowercase();
        for header in &mut self.headers {
            header.name.make_ascii_lowercase();
        }

        self.content_length = derive_content_length(&self.headers);
        self.keep_alive = self.header(CONNECTION.as_str()).is_some_and(|value| value.eq_ignore_ascii_case("keep-alive"));
        self.normalised = true;
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }
}

/// Largest announced `Content-Length`, a `Content-Range` total may raise it.
fn derive_content_length(headers: &[Header]) -> u64 {
    headers.iter().fold(0, |length, header| {
        if header.name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            length.max(parse_leading_u64(&header.value))
        } else if header.name.eq_ignore_ascii_case(CONTENT_RANGE.as_str()) {
            match header.value.split_once('/') {
                Some((_, total)) => length.max(parse_leading_u64(total)),
                None => length,
            }
        } else {
            length
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_headers(headers: &[(&str, &str)]) -> Request {
        Request {
            method: "GET".into(),
            uri: "/Index".into(),
            headers: headers.iter().map(|(name, value)| Header::new(*name, *value)).collect(),
            ..Request::default()
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let request = request_with_headers(&[("Content-Length", "10")]);

        assert_eq!(request.header("content-length"), Some("10"));
        assert_eq!(request.header("CONTENT-LENGTH"), Some("10"));
    }

    #[test]
    fn header_lookup_requires_full_name() {
        let request = request_with_headers(&[("Content-Length", "10"), ("x-custom", "1")]);

        assert_eq!(request.header("content-length-extra"), None);
        assert_eq!(request.header("x"), None);
        assert_eq!(request.header("content"), None);
    }

    #[test]
    fn header_lookup_first_match_wins() {
        let request = request_with_headers(&[("Accept", "a"), ("accept", "b")]);

        assert_eq!(request.header("accept"), Some("a"));
    }

    #[test]
    fn normalise_lower_cases() {
        let mut request = request_with_headers(&[("X-Token", "AbC")]);
        request.normalise();

        assert_eq!(request.method(), "get");
        assert_eq!(request.uri(), "/index");
        assert_eq!(request.headers()[0].name, "x-token");
        assert_eq!(request.headers()[0].value, "AbC");
        assert!(request.is_normalised());
    }

    #[test]
    fn normalise_content_length() {
        let mut request = request_with_headers(&[("Content-Length", "42")]);
        assert_eq!(request.content_length(), 0);

        request.normalise();
        assert_eq!(request.content_length(), 42);

        let mut request = request_with_headers(&[]);
        request.normalise();
        assert_eq!(request.content_length(), 0);

        let mut request = request_with_headers(&[("Content-Length", "abc")]);
        request.normalise();
        assert_eq!(request.content_length(), 0);
    }

    #[test]
    fn normalise_content_range_raises_length() {
        let mut request = request_with_headers(&[("Content-Length", "10"), ("Content-Range", "bytes 0-9/100")]);
        request.normalise();
        assert_eq!(request.content_length(), 100);

        let mut request = request_with_headers(&[("Content-Range", "bytes 0-9/5"), ("Content-Length", "10")]);
        request.normalise();
        assert_eq!(request.content_length(), 10);

        let mut request = request_with_headers(&[("Content-Length", "10"), ("Content-Range", "bytes */*")]);
        request.normalise();
        assert_eq!(request.content_length(), 10);
    }

    #[test]
    fn normalise_keep_alive() {
        let mut request = request_with_headers(&[("Connection", "Keep-Alive")]);
        request.normalise();
        assert!(request.keep_alive());

        let mut request = request_with_headers(&[("Connection", "close")]);
        request.normalise();
        assert!(!request.keep_alive());

        // HTTP/1.1 persistence is not implied, the header has to ask for it
        let mut request = request_with_headers(&[]);
        request.version = HttpVersion::HTTP_11;
        request.normalise();
        assert!(!request.keep_alive());
    }

    #[test]
    fn normalise_runs_once() {
        let mut request = request_with_headers(&[("Content-Length", "7")]);
        request.normalise();
        request.headers.push(Header::new("Content-Length", "9"));
        request.method = "POST".into();
        request.normalise();

        assert_eq!(request.content_length(), 7);
        assert_eq!(request.method(), "POST");
    }

    #[test]
    fn query_param_first_match() {
        let request = Request { query: vec![("a".into(), "1".into()), ("a".into(), "2".into())], ..Request::default() };

        assert_eq!(request.query_param("a"), Some("1"));
        assert_eq!(request.query_param("b"), None);
    }

    #[test]
    fn version_display() {
        assert_eq!(HttpVersion::HTTP_11.to_string(), "HTTP/1.1");
        assert_eq!(HttpVersion::new(2, 0).to_string(), "HTTP/2.0");
    }
}
