//! Incremental HTTP/1.x request parser.
//!
//! # Responsibilities
//! - Accept client bytes chunk by chunk, in arrival order
//! - Recognize the request head (request line + headers) via `httparse`
//! - Follow Content-Length and chunked framing to the end of the body
//! - Report the CONNECT boundary as an ordinary event
//!
//! # Design Decisions
//! - Pull-based: every `feed` returns an [`Event`], no callbacks
//! - The parser never forwards or rewrites bytes; the caller owns the buffer
//! - Bytes after a complete body (pipelined requests) are not interpreted

use thiserror::Error;

/// Maximum number of headers accepted in a request head.
const MAX_HEADERS: usize = 64;

/// Request line fields captured once the head is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Method token as sent by the client (e.g. `GET`, `CONNECT`).
    pub method: String,
    /// On-wire request target: absolute URI, authority, or origin-form path.
    pub target: String,
}

impl RequestHead {
    /// Whether this request asks for an opaque tunnel. Method tokens are case-sensitive.
    pub fn is_connect(&self) -> bool {
        self.method == "CONNECT"
    }
}

/// Outcome of feeding one chunk to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// More bytes are required.
    NeedMore,
    /// A complete request (head plus any delimited body) was recognized.
    HeaderComplete { head: RequestHead },
    /// CONNECT head complete; bytes from `offset` in the current chunk are tunnel payload.
    UpgradeRequested { head: RequestHead, offset: usize },
    /// The request is malformed. Fatal for the session.
    ParseError(ParseError),
}

impl Event {
    /// True for every event after which no more bytes may be fed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::NeedMore)
    }
}

/// Reasons a request cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request head: {0}")]
    Head(String),

    #[error("request line is missing the {0}")]
    MissingField(&'static str),

    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("invalid Content-Length header")]
    InvalidContentLength,

    #[error("malformed chunked body: {0}")]
    Chunked(&'static str),

    #[error("bytes fed after the request was complete")]
    AlreadyComplete,
}

#[derive(Debug)]
enum State {
    Head,
    Body { head: RequestHead, body: BodyState },
    Done,
}

#[derive(Debug)]
enum BodyState {
    Length(u64),
    Chunked(ChunkedDecoder),
}

/// Incremental request parser for one session.
#[derive(Debug)]
pub struct RequestParser {
    state: State,
    /// Bytes of the head seen so far (reset once the head is parsed).
    head_buf: Vec<u8>,
    max_head_bytes: usize,
}

impl RequestParser {
    /// Create a parser that rejects heads larger than `max_head_bytes`.
    pub fn new(max_head_bytes: usize) -> Self {
        Self {
            state: State::Head,
            head_buf: Vec::new(),
            max_head_bytes,
        }
    }

    /// Feed the next chunk read from the client.
    pub fn feed(&mut self, chunk: &[u8]) -> Event {
        match self.advance(chunk) {
            Ok(event) => event,
            Err(e) => {
                self.state = State::Done;
                Event::ParseError(e)
            }
        }
    }

    fn advance(&mut self, chunk: &[u8]) -> Result<Event, ParseError> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Head => self.parse_head(chunk),
            State::Body { head, body } => self.continue_body(head, body, chunk),
            State::Done => Err(ParseError::AlreadyComplete),
        }
    }

    fn parse_head(&mut self, chunk: &[u8]) -> Result<Event, ParseError> {
        let seen_before = self.head_buf.len();
        self.head_buf.extend_from_slice(chunk);

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let head_len = match req.parse(&self.head_buf) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => {
                if self.head_buf.len() > self.max_head_bytes {
                    return Err(ParseError::HeadTooLarge {
                        limit: self.max_head_bytes,
                    });
                }
                self.state = State::Head;
                return Ok(Event::NeedMore);
            }
            Err(e) => return Err(ParseError::Head(e.to_string())),
        };
        if head_len > self.max_head_bytes {
            return Err(ParseError::HeadTooLarge {
                limit: self.max_head_bytes,
            });
        }

        let head = RequestHead {
            method: req.method.ok_or(ParseError::MissingField("method"))?.to_string(),
            target: req.path.ok_or(ParseError::MissingField("target"))?.to_string(),
        };

        if head.is_connect() {
            // head_len >= seen_before: an earlier chunk would have completed otherwise.
            let offset = head_len - seen_before;
            self.head_buf = Vec::new();
            return Ok(Event::UpgradeRequested { head, offset });
        }

        let body = body_framing(req.headers)?;
        let rest = self.head_buf.split_off(head_len);
        self.head_buf = Vec::new();
        match body {
            None => Ok(Event::HeaderComplete { head }),
            Some(body) => self.continue_body(head, body, &rest),
        }
    }

    fn continue_body(
        &mut self,
        head: RequestHead,
        mut body: BodyState,
        input: &[u8],
    ) -> Result<Event, ParseError> {
        let done = match &mut body {
            BodyState::Length(remaining) => {
                let take = (*remaining).min(input.len() as u64);
                *remaining -= take;
                *remaining == 0
            }
            BodyState::Chunked(decoder) => decoder.push(input)?,
        };

        if done {
            Ok(Event::HeaderComplete { head })
        } else {
            self.state = State::Body { head, body };
            Ok(Event::NeedMore)
        }
    }
}

/// Determine how the body following the head is delimited.
fn body_framing(headers: &[httparse::Header<'_>]) -> Result<Option<BodyState>, ParseError> {
    let chunked = headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("transfer-encoding"))
        .filter_map(|h| std::str::from_utf8(h.value).ok())
        .flat_map(|v| v.split(','))
        .last()
        .map(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);
    if chunked {
        return Ok(Some(BodyState::Chunked(ChunkedDecoder::default())));
    }

    let mut length: Option<u64> = None;
    for header in headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("content-length"))
    {
        let value = std::str::from_utf8(header.value)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or(ParseError::InvalidContentLength)?;
        match length {
            Some(existing) if existing != value => return Err(ParseError::InvalidContentLength),
            _ => length = Some(value),
        }
    }

    Ok(match length {
        None | Some(0) => None,
        Some(n) => Some(BodyState::Length(n)),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data(u64),
    DataEnd,
    Trailers,
}

/// Tracks chunked transfer coding until the terminating chunk and trailers.
#[derive(Debug)]
struct ChunkedDecoder {
    state: ChunkState,
    /// Partial size or trailer line carried between chunks.
    pending: Vec<u8>,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self {
            state: ChunkState::Size,
            pending: Vec::new(),
        }
    }
}

impl ChunkedDecoder {
    /// Consume `input`; returns true once the whole body has been seen.
    fn push(&mut self, input: &[u8]) -> Result<bool, ParseError> {
        self.pending.extend_from_slice(input);
        let mut pos = 0;

        let done = loop {
            let buf = &self.pending[pos..];
            match self.state {
                ChunkState::Size => match httparse::parse_chunk_size(buf) {
                    Ok(httparse::Status::Complete((used, 0))) => {
                        pos += used;
                        self.state = ChunkState::Trailers;
                    }
                    Ok(httparse::Status::Complete((used, size))) => {
                        pos += used;
                        self.state = ChunkState::Data(size);
                    }
                    Ok(httparse::Status::Partial) => break false,
                    Err(_) => return Err(ParseError::Chunked("invalid chunk size")),
                },
                ChunkState::Data(remaining) => {
                    if buf.is_empty() {
                        break false;
                    }
                    let take = remaining.min(buf.len() as u64);
                    pos += take as usize;
                    self.state = if take == remaining {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::Data(remaining - take)
                    };
                }
                ChunkState::DataEnd => {
                    if buf.len() < 2 {
                        break false;
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(ParseError::Chunked("missing CRLF after chunk data"));
                    }
                    pos += 2;
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailers => match buf.windows(2).position(|w| w == b"\r\n") {
                    Some(0) => {
                        pos += 2;
                        break true;
                    }
                    Some(line_end) => pos += line_end + 2,
                    None => break false,
                },
            }
        };

        self.pending.drain(..pos);
        Ok(done)
    }
}
