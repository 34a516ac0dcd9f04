//! Decoders for the head of a response received from an upstream peer.
//!
//! Unlike the [`RequestParser`](crate::codec::RequestParser) these are always handed a
//! complete head, so they answer valid or invalid rather than asking for more data.

use std::mem;

use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION};

use crate::codec::request_parser::{is_ctl, is_token, push_digit};
use crate::protocol::{Header, HttpVersion, ResponseHead, StatusLine, parse_leading_u64};

/// Decodes `HTTP/major.minor status reason\r\n`.
///
/// Returns `None` when the line violates the grammar, the status code is not a
/// three digit code, or the line is cut before its line feed.
///
/// ```
/// use av_http::codec::parse_status_line;
/// use http::StatusCode;
///
/// let line = parse_status_line(b"HTTP/1.1 404 Not Found\r\n").unwrap();
/// assert_eq!(line.status, StatusCode::NOT_FOUND);
/// assert_eq!(line.reason, "Not Found");
/// ```
pub fn parse_status_line(input: &[u8]) -> Option<StatusLine> {
    decode_status_line(input).map(|(line, _)| line)
}

/// Decodes a full upstream response head: the status line followed by the header
/// block up to and including the blank line.
///
/// Header names and values are trimmed, continuation lines are folded into the
/// previous value. `Content-Length` keeps the largest value announced, a
/// `Content-Range` total raises it as well.
pub fn parse_response_head(input: &[u8]) -> Option<ResponseHead> {
    let (status_line, consumed) = decode_status_line(input)?;
    let headers = decode_headers(&input[consumed..])?;

    let mut head = ResponseHead { status_line, headers: Vec::new(), content_type: None, content_length: 0, location: None };
    for header in headers {
        inspect_header(&mut head, &header);
        head.headers.push(header);
    }
    Some(head)
}

fn inspect_header(head: &mut ResponseHead, header: &Header) {
    let name = header.name.as_str();
    if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
        head.content_type = Some(header.value.clone());
    } else if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
        head.content_length = head.content_length.max(parse_leading_u64(&header.value));
    } else if name.eq_ignore_ascii_case(LOCATION.as_str()) {
        head.location = Some(header.value.clone());
    } else if name.eq_ignore_ascii_case(CONTENT_RANGE.as_str())
        && let Some((_, total)) = header.value.split_once('/')
        && !total.is_empty()
    {
        head.content_length = head.content_length.max(parse_leading_u64(total));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusState {
    VersionH,
    VersionT1,
    VersionT2,
    VersionP,
    VersionSlash,
    MajorStart,
    Major,
    MinorStart,
    Minor,
    CodeStart,
    Code,
    Reason,
    Newline,
}

fn decode_status_line(input: &[u8]) -> Option<(StatusLine, usize)> {
    use StatusState::*;

    let mut state = VersionH;
    let (mut major, mut minor, mut code) = (0u32, 0u32, 0u32);
    let mut reason = Vec::new();

    for (index, &byte) in input.iter().enumerate() {
        state = match (state, byte) {
            (VersionH, b'H') => VersionT1,
            (VersionT1, b'T') => VersionT2,
            (VersionT2, b'T') => VersionP,
            (VersionP, b'P') => VersionSlash,
            (VersionSlash, b'/') => MajorStart,
            (MajorStart | Major, b) if b.is_ascii_digit() => {
                push_digit(&mut major, b).then_some(())?;
                Major
            }
            (Major, b'.') => MinorStart,
            (MinorStart | Minor, b) if b.is_ascii_digit() => {
                push_digit(&mut minor, b).then_some(())?;
                Minor
            }
            (Minor, b' ') => CodeStart,
            (CodeStart | Code, b) if b.is_ascii_digit() => {
                push_digit(&mut code, b).then_some(())?;
                Code
            }
            (Code, b' ') => Reason,
            (Reason, b'\r') => Newline,
            (Reason, b) if !is_ctl(b) => {
                reason.push(b);
                Reason
            }
            (Newline, b'\n') => {
                let status = StatusCode::from_u16(u16::try_from(code).ok()?).ok()?;
                let line = StatusLine {
                    version: HttpVersion::new(major, minor),
                    status,
                    reason: String::from_utf8_lossy(&reason).into_owned(),
                };
                return Some((line, index + 1));
            }
            _ => return None,
        };
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    FirstLineStart,
    LineStart,
    Lws,
    Name,
    SpaceBeforeValue,
    Value,
    Newline,
    FinalNewline,
}

fn decode_headers(input: &[u8]) -> Option<Vec<Header>> {
    use HeaderState::*;

    let mut state = FirstLineStart;
    let mut headers = Vec::new();
    let mut name = Vec::new();
    let mut value = Vec::new();

    for &byte in input {
        state = match (state, byte) {
            (FirstLineStart, b'\r') => FinalNewline,
            (LineStart, b'\r') => {
                commit(&mut headers, &mut name, &mut value);
                FinalNewline
            }
            (LineStart, b' ' | b'\t') => Lws,
            (FirstLineStart, b) if is_token(b) => {
                name.push(b);
                Name
            }
            (LineStart, b) if is_token(b) => {
                commit(&mut headers, &mut name, &mut value);
                name.push(b);
                Name
            }
            (Lws, b'\r') | (Value | SpaceBeforeValue, b'\r') => Newline,
            (Lws, b' ' | b'\t') => Lws,
            (Name, b':') => SpaceBeforeValue,
            (Name, b) if is_token(b) => {
                name.push(b);
                Name
            }
            (SpaceBeforeValue, b' ') => Value,
            (Lws | SpaceBeforeValue | Value, b) if !is_ctl(b) => {
                value.push(b);
                Value
            }
            (Newline, b'\n') => LineStart,
            (FinalNewline, b'\n') => return Some(headers),
            _ => return None,
        };
    }

    None
}

fn commit(headers: &mut Vec<Header>, name: &mut Vec<u8>, value: &mut Vec<u8>) {
    headers.push(Header::new(trimmed(mem::take(name)), trimmed(mem::take(value))));
}

fn trimmed(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(bytes.trim_ascii()).into_owned()
}
