//! Incremental, byte-at-a-time HTTP/1.x request parser.
//!
//! The parser keeps its position in the grammar between calls, so a request may be
//! fed in arbitrary chunks: splitting the input at any byte boundary yields the same
//! outcome and the same [`Request`] as feeding it in one piece.
//!
//! # Grammar
//!
//! ```text
//! METHOD SP URI[?k=v&k=v...] SP HTTP/MAJOR.MINOR CRLF
//! (Name: value CRLF (LWS value CRLF)*)*
//! CRLF
//! ```
//!
//! Query pairs are split raw on `&` and `=`, nothing is percent-decoded here.
//! A header line starting with a space or tab continues the previous header's value.

use std::mem;

use crate::protocol::{Header, Request};

/// Outcome of feeding bytes to the [`RequestParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The terminating blank line was reached.
    Complete,
    /// A byte violated the grammar.
    Invalid,
    /// Input ran out before the request was complete.
    NeedMoreData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    MethodStart,
    Method,
    Uri,
    QueryKey,
    QueryValue,
    VersionH,
    VersionT1,
    VersionT2,
    VersionP,
    VersionSlash,
    MajorStart,
    Major,
    MinorStart,
    Minor,
    RequestLineNewline,
    HeaderLineStart,
    HeaderLws,
    HeaderName,
    SpaceBeforeHeaderValue,
    HeaderValue,
    HeaderNewline,
    FinalNewline,
}

/// Parser for incoming requests.
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    /// bytes of the token being read
    token: Vec<u8>,
    /// completed query key or header name waiting for its value
    name: String,
    /// a header line has been read but may still be continued
    pending_header: bool,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self { state: State::MethodStart, token: Vec::with_capacity(64), name: String::new(), pending_header: false }
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the parser to expect the start of a new request.
    pub fn reset(&mut self) {
        self.state = State::MethodStart;
        self.token.clear();
        self.name.clear();
        self.pending_header = false;
    }

    /// Feeds `input` to the parser, filling `request` as tokens complete.
    ///
    /// Returns the parse status and how many bytes of `input` were consumed. On
    /// [`ParseStatus::Complete`] the consumed count ends right after the blank line,
    /// any following bytes belong to the body or the next request.
    pub fn parse(&mut self, request: &mut Request, input: &[u8]) -> (ParseStatus, usize) {
        for (index, &byte) in input.iter().enumerate() {
            match self.consume(request, byte) {
                ParseStatus::NeedMoreData => {}
                status => return (status, index + 1),
            }
        }
        (ParseStatus::NeedMoreData, input.len())
    }

    fn consume(&mut self, request: &mut Request, byte: u8) -> ParseStatus {
        use ParseStatus::{Complete, Invalid, NeedMoreData};

        match self.state {
            State::MethodStart => {
                if !is_token(byte) {
                    return Invalid;
                }
                self.token.push(byte);
                self.state = State::Method;
            }
            State::Method => {
                if byte == b' ' {
                    request.method = self.take_token();
                    self.state = State::Uri;
                } else if is_token(byte) {
                    self.token.push(byte);
                } else {
                    return Invalid;
                }
            }
            State::Uri => match byte {
                b' ' => {
                    request.uri = self.take_token();
                    self.state = State::VersionH;
                }
                b'?' => {
                    request.uri = self.take_token();
                    self.state = State::QueryKey;
                }
                b if is_ctl(b) => return Invalid,
                b => self.token.push(b),
            },
            State::QueryKey => match byte {
                b' ' => {
                    self.finish_query_key(request);
                    self.state = State::VersionH;
                }
                b'&' => self.finish_query_key(request),
                b'=' => {
                    self.name = self.take_token();
                    self.state = State::QueryValue;
                }
                b if is_ctl(b) => return Invalid,
                b => self.token.push(b),
            },
            State::QueryValue => match byte {
                b' ' => {
                    self.finish_query_value(request);
                    self.state = State::VersionH;
                }
                b'&' => {
                    self.finish_query_value(request);
                    self.state = State::QueryKey;
                }
                b if is_ctl(b) => return Invalid,
                b => self.token.push(b),
            },
            State::VersionH => return self.expect(byte, b'H', State::VersionT1),
            State::VersionT1 => return self.expect(byte, b'T', State::VersionT2),
            State::VersionT2 => return self.expect(byte, b'T', State::VersionP),
            State::VersionP => return self.expect(byte, b'P', State::VersionSlash),
            State::VersionSlash => {
                if byte != b'/' {
                    return Invalid;
                }
                request.version.major = 0;
                request.version.minor = 0;
                self.state = State::MajorStart;
            }
            State::MajorStart => {
                if !push_digit(&mut request.version.major, byte) {
                    return Invalid;
                }
                self.state = State::Major;
            }
            State::Major => {
                if byte == b'.' {
                    self.state = State::MinorStart;
                } else if !push_digit(&mut request.version.major, byte) {
                    return Invalid;
                }
            }
            State::MinorStart => {
                if !push_digit(&mut request.version.minor, byte) {
                    return Invalid;
                }
                self.state = State::Minor;
            }
            State::Minor => {
                if byte == b'\r' {
                    self.state = State::RequestLineNewline;
                } else if !push_digit(&mut request.version.minor, byte) {
                    return Invalid;
                }
            }
            State::RequestLineNewline => return self.expect(byte, b'\n', State::HeaderLineStart),
            State::HeaderLineStart => match byte {
                b'\r' => {
                    self.finish_header(request);
                    self.state = State::FinalNewline;
                }
                b' ' | b'\t' if self.pending_header => self.state = State::HeaderLws,
                b if is_token(b) => {
                    self.finish_header(request);
                    self.token.push(b);
                    self.state = State::HeaderName;
                }
                _ => return Invalid,
            },
            State::HeaderLws => match byte {
                b'\r' => self.state = State::HeaderNewline,
                b' ' | b'\t' => {}
                b if is_ctl(b) => return Invalid,
                b => {
                    self.token.push(b);
                    self.state = State::HeaderValue;
                }
            },
            State::HeaderName => match byte {
                b':' => {
                    self.name = self.take_token();
                    self.pending_header = true;
                    self.state = State::SpaceBeforeHeaderValue;
                }
                b if is_token(b) => self.token.push(b),
                _ => return Invalid,
            },
            State::SpaceBeforeHeaderValue => match byte {
                b' ' => self.state = State::HeaderValue,
                b'\r' => self.state = State::HeaderNewline,
                _ => return Invalid,
            },
            State::HeaderValue => match byte {
                b'\r' => self.state = State::HeaderNewline,
                b if is_ctl(b) => return Invalid,
                b => self.token.push(b),
            },
            State::HeaderNewline => return self.expect(byte, b'\n', State::HeaderLineStart),
            State::FinalNewline => {
                return if byte == b'\n' { Complete } else { Invalid };
            }
        }

        NeedMoreData
    }

    #[inline]
    fn expect(&mut self, byte: u8, expected: u8, next: State) -> ParseStatus {
        if byte == expected {
            self.state = next;
            ParseStatus::NeedMoreData
        } else {
            ParseStatus::Invalid
        }
    }

    fn take_token(&mut self) -> String {
        let token = mem::take(&mut self.token);
        match String::from_utf8(token) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    fn finish_query_key(&mut self, request: &mut Request) {
        // `?` or `&` directly followed by a separator carries no pair
        if self.token.is_empty() {
            return;
        }
        let key = self.take_token();
        request.query.push((key, String::new()));
    }

    fn finish_query_value(&mut self, request: &mut Request) {
        let key = mem::take(&mut self.name);
        let value = self.take_token();
        request.query.push((key, value));
    }

    fn finish_header(&mut self, request: &mut Request) {
        if !self.pending_header {
            return;
        }
        let name = mem::take(&mut self.name);
        let value = self.take_token();
        request.headers.push(Header { name, value });
        self.pending_header = false;
    }
}

/// Check if a byte is an HTTP control character.
#[inline]
pub(crate) fn is_ctl(byte: u8) -> bool {
    byte <= 31 || byte == 127
}

/// Check if a byte is defined as an HTTP tspecial character.
#[inline]
fn is_tspecial(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
            | b'{'
            | b'}'
            | b' '
            | b'\t'
    )
}

/// Method and header name characters: ASCII, no controls, no separators.
#[inline]
pub(crate) fn is_token(byte: u8) -> bool {
    byte.is_ascii() && !is_ctl(byte) && !is_tspecial(byte)
}

#[inline]
pub(crate) fn push_digit(number: &mut u32, byte: u8) -> bool {
    if !byte.is_ascii_digit() {
        return false;
    }
    match number.checked_mul(10).and_then(|n| n.checked_add(u32::from(byte - b'0'))) {
        Some(n) => {
            *number = n;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HttpVersion;
    use indoc::indoc;

    fn parse_all(input: &[u8]) -> (ParseStatus, usize, Request) {
        let mut parser = RequestParser::new();
        let mut request = Request::new();
        let (status, consumed) = parser.parse(&mut request, input);
        (status, consumed, request)
    }

    fn parse_chunks(chunks: &[&[u8]]) -> (ParseStatus, Request) {
        let mut parser = RequestParser::new();
        let mut request = Request::new();
        let mut status = ParseStatus::NeedMoreData;
        for chunk in chunks {
            (status, _) = parser.parse(&mut request, chunk);
            if status != ParseStatus::NeedMoreData {
                break;
            }
        }
        (status, request)
    }

    fn crlf(s: &str) -> Vec<u8> {
        s.replace('\n', "\r\n").into_bytes()
    }

    #[test]
    fn simple_get() {
        let (status, consumed, request) = parse_all(b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n");

        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(consumed, 28);
        assert_eq!(request.method(), "GET");
        assert_eq!(request.uri(), "/x");
        assert_eq!(request.version(), HttpVersion::HTTP_11);
        assert_eq!(request.headers(), &[Header::new("Host", "a")]);
    }

    #[test]
    fn from_curl() {
        let input = crlf(indoc! {r##"
        GET /index.html HTTP/1.0
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##});

        let (status, consumed, request) = parse_all(&input);

        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(consumed, input.len());
        assert_eq!(request.version(), HttpVersion::HTTP_10);
        assert_eq!(request.headers().len(), 3);
        assert_eq!(request.header("user-agent"), Some("curl/7.79.1"));
        assert_eq!(request.header("accept"), Some("*/*"));
    }

    #[test]
    fn missing_version_is_invalid() {
        let (status, _, _) = parse_all(b"GET /\r\n\r\n");
        assert_eq!(status, ParseStatus::Invalid);
    }

    #[test]
    fn half_request_needs_more_data() {
        let input = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n";
        for cut in 1..input.len() {
            let (status, consumed, _) = parse_all(&input[..cut]);
            assert_eq!(status, ParseStatus::NeedMoreData, "cut at {cut}");
            assert_eq!(consumed, cut);
        }
    }

    #[test]
    fn consumed_stops_at_terminator() {
        let (status, consumed, _) = parse_all(b"POST /f HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcGET");
        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(consumed, 39);
    }

    #[test]
    fn query_params() {
        let (status, _, request) = parse_all(b"GET /a?x=1&y=2 HTTP/1.1\r\n\r\n");

        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(request.uri(), "/a");
        assert_eq!(request.query(), &[("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())]);
    }

    #[test]
    fn query_params_raw_split() {
        let (status, _, request) = parse_all(b"GET /a?x=1=2&flag&&y=%41&x= HTTP/1.1\r\n\r\n");

        assert_eq!(status, ParseStatus::Complete);
        let expected: Vec<(String, String)> = [("x", "1=2"), ("flag", ""), ("y", "%41"), ("x", "")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(request.query(), expected.as_slice());
        assert_eq!(request.query_param("x"), Some("1=2"));
    }

    #[test]
    fn header_folding() {
        let (status, _, request) = parse_all(b"GET / HTTP/1.1\r\nX-Long: first\r\n \t second\r\nHost: a\r\n\r\n");

        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(request.headers(), &[Header::new("X-Long", "firstsecond"), Header::new("Host", "a")]);
    }

    #[test]
    fn folding_without_previous_header_is_invalid() {
        let (status, _, _) = parse_all(b"GET / HTTP/1.1\r\n folded\r\n\r\n");
        assert_eq!(status, ParseStatus::Invalid);
    }

    #[test]
    fn empty_header_value() {
        let (status, _, request) = parse_all(b"GET / HTTP/1.1\r\nX-Empty:\r\nX-Space: \r\n\r\n");

        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(request.headers(), &[Header::new("X-Empty", ""), Header::new("X-Space", "")]);
    }

    #[test]
    fn duplicate_headers_keep_order() {
        let (_, _, request) = parse_all(b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nA: 3\r\n\r\n");
        let names: Vec<_> = request.headers().iter().map(|h| (h.name.as_str(), h.value.as_str())).collect();
        assert_eq!(names, vec![("A", "1"), ("B", "2"), ("A", "3")]);
    }

    #[test]
    fn header_value_accepts_high_bytes() {
        let (status, _, request) = parse_all("GET / HTTP/1.1\r\nX-Name: héllo\r\n\r\n".as_bytes());
        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(request.header("x-name"), Some("héllo"));
    }

    #[test]
    fn invalid_characters() {
        let cases: &[&[u8]] = &[
            b"G(T / HTTP/1.1\r\n\r\n",
            b" GET / HTTP/1.1\r\n\r\n",
            b"GET /\x01 HTTP/1.1\r\n\r\n",
            b"GET /?a=\x7f HTTP/1.1\r\n\r\n",
            b"GET / HTTX/1.1\r\n\r\n",
            b"GET / HTTP/a.1\r\n\r\n",
            b"GET / HTTP/1.\r\n\r\n",
            b"GET / HTTP/1.1\n\r\n",
            b"GET / HTTP/1.1\r\nBad Name: a\r\n\r\n",
            b"GET / HTTP/1.1\r\nBad[Name]: a\r\n\r\n",
            b"GET / HTTP/1.1\r\nName:value\r\n\r\n",
            b"GET / HTTP/1.1\r\nName: a\tb\r\n\r\n",
            b"GET / HTTP/1.1\r\nName: a\r\n\rX",
            b"GET / HTTP/99999999999.1\r\n\r\n",
        ];

        for case in cases {
            let (status, _, _) = parse_all(case);
            assert_eq!(status, ParseStatus::Invalid, "{:?}", String::from_utf8_lossy(case));
        }
    }

    #[test]
    fn chunk_invariance_two_pieces() {
        let input = crlf(indoc! {r##"
        POST /submit?id=7&name=abc HTTP/1.1
        Host: 127.0.0.1:8080
        Content-Type: application/x-www-form-urlencoded
        X-Folded: part one
          part two
        Content-Length: 3

        "##});

        let (expected_status, _, expected) = parse_all(&input);
        assert_eq!(expected_status, ParseStatus::Complete);

        for split in 0..=input.len() {
            let (status, request) = parse_chunks(&[&input[..split], &input[split..]]);
            assert_eq!(status, expected_status, "split at {split}");
            assert_eq!(request, expected, "split at {split}");
        }
    }

    #[test]
    fn chunk_invariance_byte_by_byte() {
        let input = b"GET /a?x=1&y=2 HTTP/1.1\r\nHost: a\r\nConnection: keep-alive\r\n\r\n";
        let (_, _, expected) = parse_all(input);

        let chunks: Vec<&[u8]> = input.chunks(1).collect();
        let (status, request) = parse_chunks(&chunks);

        assert_eq!(status, ParseStatus::Complete);
        assert_eq!(request, expected);
    }

    #[test]
    fn chunk_invariance_for_invalid_input() {
        let input = b"GET / HTTP/1.1\r\nBad Name: a\r\n\r\n";
        for split in 0..=input.len() {
            let (status, _) = parse_chunks(&[&input[..split], &input[split..]]);
            assert_eq!(status, ParseStatus::Invalid, "split at {split}");
        }
    }

    #[test]
    fn reset_allows_reuse() {
        let mut parser = RequestParser::new();

        let mut first = Request::new();
        assert_eq!(parser.parse(&mut first, b"GET /a HTTP/1.1\r\n\r\n").0, ParseStatus::Complete);

        parser.reset();
        let mut second = Request::new();
        assert_eq!(parser.parse(&mut second, b"GET /b HTTP/1.0\r\n\r\n").0, ParseStatus::Complete);
        assert_eq!(second.uri(), "/b");
        assert_eq!(second.version(), HttpVersion::HTTP_10);
    }
}
