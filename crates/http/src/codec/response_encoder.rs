//! Encoder for the responses handlers queue on a connection.

use std::fmt::Write;

use bytes::{BufMut, BytesMut};
use http::StatusCode;
use tokio_util::codec::Encoder;

use crate::protocol::{HttpVersion, Response, SendError};

/// Writes [`Response`]s to the outgoing buffer.
///
/// A [`Response::Json`] gets a synthesized `200 OK` head carrying the version of the
/// request being answered, set through [`ResponseEncoder::set_version`]. A
/// [`Response::Raw`] head is written as is.
#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    version: HttpVersion,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_version(&mut self, version: HttpVersion) {
        self.version = version;
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { version: HttpVersion::HTTP_11 }
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Response::Json(body) => {
                dst.reserve(128 + body.len());
                let status = StatusCode::OK;
                // writing into BytesMut never fails
                let _ = write!(
                    dst,
                    "{} {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
                    self.version,
                    status.as_str(),
                    status.canonical_reason().unwrap_or("OK"),
                    mime::APPLICATION_JSON,
                    body.len(),
                );
                dst.put(body);
            }
            Response::Raw { head, body } => {
                dst.reserve(head.len() + body.len());
                dst.put(head);
                dst.put(body);
            }
        }
        Ok(())
    }
}
