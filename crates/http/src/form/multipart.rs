//! `multipart/form-data` bodies.
//!
//! Parts are the byte ranges between two consecutive `--boundary` delimiters, minus
//! the line break following the opening delimiter and the one preceding the next.
//! Part headers end at the first blank line.

use std::borrow::Cow;

use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Content-Disposition: form-data; name="([^"]+)""#).expect("field name regex should be valid")
});

const CRLF: &[u8] = b"\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

pub(super) fn parse(boundary: &str, body: &[u8]) -> Vec<(String, Bytes)> {
    let delimiter = [b"--", boundary.as_bytes()].concat();

    let positions = find_all(body, &delimiter);
    positions
        .windows(2)
        .filter_map(|window| {
            let part = &body[window[0] + delimiter.len()..window[1]];
            let part = part.strip_prefix(CRLF).unwrap_or(part);
            let part = part.strip_suffix(CRLF).unwrap_or(part);
            parse_part(part)
        })
        .collect()
}

fn parse_part(part: &[u8]) -> Option<(String, Bytes)> {
    let split = find(part, BLANK_LINE)?;
    let head = String::from_utf8_lossy(&part[..split]);
    let value = &part[split + BLANK_LINE.len()..];

    let Some(captures) = FIELD_NAME.captures(&head) else {
        trace!(head = %head, "skip multipart part without form-data name");
        return None;
    };
    let raw_name = &captures[1];
    let name = urlencoding::decode(raw_name).unwrap_or(Cow::Borrowed(raw_name)).into_owned();

    Some((name, Bytes::copy_from_slice(value)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut start = 0;
    while let Some(offset) = find(&haystack[start..], needle) {
        positions.push(start + offset);
        start += offset + needle.len();
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(s: &str) -> String {
        s.replace('\n', "\r\n")
    }

    #[test]
    fn several_parts() {
        let body = crlf(indoc! {r##"
        --b0undary
        Content-Disposition: form-data; name="title"

        hello
        --b0undary
        Content-Disposition: form-data; name="file"; filename="a.txt"
        Content-Type: text/plain

        line one
        line two
        --b0undary--
        "##});

        let fields = parse("b0undary", body.as_bytes());

        assert_eq!(
            fields,
            vec![
                ("title".to_owned(), Bytes::from_static(b"hello")),
                ("file".to_owned(), Bytes::from_static(b"line one\r\nline two"))
            ]
        );
    }

    #[test]
    fn skips_parts_without_name() {
        let body = crlf(indoc! {r##"
        --B
        Content-Type: text/plain

        anonymous
        --B
        Content-Disposition: attachment; name="x"

        nope
        --B
        Content-Disposition: form-data; name="kept"

        yes
        --B--
        "##});

        assert_eq!(parse("B", body.as_bytes()), vec![("kept".to_owned(), Bytes::from_static(b"yes"))]);
    }

    #[test]
    fn skips_parts_without_blank_line() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n--B--\r\n";
        assert!(parse("B", body).is_empty());
    }

    #[test]
    fn unescapes_name() {
        let body = b"--B\r\nContent-Disposition: form-data; name=\"a%20b\"\r\n\r\n1\r\n--B--\r\n";
        assert_eq!(parse("B", body), vec![("a b".to_owned(), Bytes::from_static(b"1"))]);
    }

    #[test]
    fn no_delimiter() {
        assert!(parse("B", b"a=1").is_empty());
        assert!(parse("B", b"").is_empty());
    }
}
