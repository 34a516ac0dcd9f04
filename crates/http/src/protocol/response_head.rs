//! Status line and header block of a response received from an upstream peer.

use http::StatusCode;

use crate::protocol::{Header, HttpVersion};

/// `HTTP/major.minor status reason`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: HttpVersion,
    pub status: StatusCode,
    pub reason: String,
}

/// A decoded upstream response head together with the headers the caller
/// usually needs to drive the body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status_line: StatusLine,
    pub headers: Vec<Header>,
    pub content_type: Option<String>,
    pub content_length: u64,
    pub location: Option<String>,
}

impl ResponseHead {
    pub fn status(&self) -> StatusCode {
        self.status_line.status
    }

    /// Looks a header up by name, ignoring ASCII case. The first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|header| header.name.eq_ignore_ascii_case(name)).map(|header| header.value.as_str())
    }
}
