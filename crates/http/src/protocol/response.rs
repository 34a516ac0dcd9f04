//! Responses queued by request handlers.

use bytes::Bytes;

/// A response waiting to be encoded by the [`ResponseEncoder`](crate::codec::ResponseEncoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `200 OK` with an `application/json` body. The status line echoes the
    /// version of the request being answered.
    Json(Bytes),

    /// A caller supplied status line and header block, written verbatim and
    /// followed by the body. The head is not validated.
    Raw { head: Bytes, body: Bytes },
}

impl Response {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::Json(body.into())
    }

    pub fn raw(head: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        Self::Raw { head: head.into(), body: body.into() }
    }

    pub fn body(&self) -> &Bytes {
        match self {
            Response::Json(body) | Response::Raw { body, .. } => body,
        }
    }
}
