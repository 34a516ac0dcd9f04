//! Decoding of POST form bodies.
//!
//! Two content types are understood:
//!
//! - `multipart/form-data; boundary=...`: every part carrying a
//!   `Content-Disposition: form-data; name="..."` header becomes one field
//! - anything else is read as `application/x-www-form-urlencoded`
//!
//! # Example
//!
//! ```
//! use av_http::form::Form;
//!
//! let form = Form::parse("application/x-www-form-urlencoded", b"a=1&b=hello%20world");
//!
//! assert_eq!(form.get("a"), Some("1"));
//! assert_eq!(form.get("b"), Some("hello world"));
//! assert_eq!(form.get("c"), None);
//! ```

mod multipart;

use bytes::Bytes;
use mime::Mime;

/// Ordered `(name, value)` fields of a decoded form. Names may repeat.
///
/// Values are kept as the raw bytes sent by the client, so binary uploads survive
/// decoding. [`Form::get`] gives the text view of a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, Bytes)>,
}

impl Form {
    /// Decodes `body` according to `content_type`.
    pub fn parse(content_type: &str, body: &[u8]) -> Self {
        let fields = match multipart_boundary(content_type) {
            Some(boundary) => multipart::parse(&boundary, body),
            None => parse_urlencoded(body),
        };
        Self { fields }
    }

    /// Value of the first field called `name`, if it is valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_bytes(name).and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Raw value of the first field called `name`.
    pub fn get_bytes(&self, name: &str) -> Option<&Bytes> {
        self.fields.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields.iter().map(|(key, value)| (key.as_str(), &value[..]))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, Bytes)> {
        self.fields
    }
}

impl<'a> IntoIterator for &'a Form {
    type Item = &'a (String, Bytes);
    type IntoIter = std::slice::Iter<'a, (String, Bytes)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn multipart_boundary(content_type: &str) -> Option<String> {
    let mime = content_type.parse::<Mime>().ok()?;
    if mime.type_() != mime::MULTIPART {
        return None;
    }
    mime.get_param(mime::BOUNDARY).map(|boundary| boundary.as_str().to_owned()).filter(|boundary| !boundary.is_empty())
}

/// `&` separated pairs split at the first `=`. Empty segments are skipped, a key
/// without `=` gets an empty value.
fn parse_urlencoded(body: &[u8]) -> Vec<(String, Bytes)> {
    body.split(|b| *b == b'&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = match segment.iter().position(|b| *b == b'=') {
                Some(eq) => (&segment[..eq], &segment[eq + 1..]),
                None => (segment, &b""[..]),
            };
            (String::from_utf8_lossy(&percent_decode(key)).into_owned(), Bytes::from(percent_decode(value)))
        })
        .collect()
}

// `+` is a space, `%2B` stays a plus
fn percent_decode(raw: &[u8]) -> Vec<u8> {
    let spaced = raw.iter().map(|b| if *b == b'+' { b' ' } else { *b }).collect::<Vec<_>>();
    urlencoding::decode_binary(&spaced).into_owned()
}
