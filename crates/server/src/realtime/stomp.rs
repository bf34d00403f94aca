//! STOMP 1.2 frame codec over WebSocket text messages.
//!
//! A frame is `COMMAND EOL *(header EOL) EOL body NUL`, optionally followed
//! by EOLs. A message consisting only of EOLs is a heart-beat.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while parsing a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StompError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("malformed header line: {0}")]
    MalformedHeader(String),

    #[error("invalid escape sequence in header")]
    InvalidEscape,

    #[error("frame is not NUL-terminated")]
    Unterminated,

    #[error("invalid content-length")]
    InvalidContentLength,

    #[error("invalid heart-beat header: {0}")]
    InvalidHeartBeat(String),
}

/// Frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    const ALL: [Self; 15] = [
        Self::Connect,
        Self::Stomp,
        Self::Connected,
        Self::Send,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::Ack,
        Self::Nack,
        Self::Begin,
        Self::Commit,
        Self::Abort,
        Self::Disconnect,
        Self::Message,
        Self::Receipt,
        Self::Error,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED headers are never escaped.
    const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Command {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| StompError::UnknownCommand(s.to_string()))
    }
}

/// A STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header. Repeated headers keep the first occurrence.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// An `ERROR` frame with a short message and optional detail body.
    #[must_use]
    pub fn error(message: &str, detail: &str) -> Self {
        Self::new(Command::Error)
            .header("message", message)
            .header("content-type", "text/plain")
            .body(detail)
    }

    /// A `RECEIPT` for the frame's `receipt` header, if it asked for one.
    #[must_use]
    pub fn receipt_for(&self) -> Option<Self> {
        self.get("receipt")
            .map(|id| Self::new(Command::Receipt).header("receipt-id", id))
    }

    /// Serialize to wire text. `content-length` is added for non-empty bodies.
    #[must_use]
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Parse every frame in one WebSocket message. Heart-beat EOLs are skipped.
///
/// # Errors
///
/// Returns a `StompError` for the first malformed frame.
pub fn parse_frames(input: &str) -> Result<Vec<Frame>, StompError> {
    let mut frames = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(frames);
        }
        let (frame, remaining) = parse_one(rest)?;
        frames.push(frame);
        rest = remaining;
    }
}

fn parse_one(input: &str) -> Result<(Frame, &str), StompError> {
    let (command_line, mut rest) = split_line(input).ok_or(StompError::Unterminated)?;
    let command: Command = command_line.parse()?;
    let unescape = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, remaining) = split_line(rest).ok_or(StompError::Unterminated)?;
        rest = remaining;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
        if unescape {
            headers.push((unescape_header(name)?, unescape_header(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let declared_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| StompError::InvalidContentLength)
        })
        .transpose()?;

    let body_end = match declared_length {
        Some(length) => {
            if rest.as_bytes().get(length) != Some(&0) || !rest.is_char_boundary(length) {
                return Err(StompError::InvalidContentLength);
            }
            length
        }
        None => rest.find('\0').ok_or(StompError::Unterminated)?,
    };

    let body = rest.get(..body_end).ok_or(StompError::Unterminated)?.to_string();
    let remaining = rest.get(body_end + 1..).unwrap_or_default();

    Ok((
        Frame {
            command,
            headers,
            body,
        },
        remaining,
    ))
}

/// Split off one line, accepting both LF and CRLF.
fn split_line(input: &str) -> Option<(&str, &str)> {
    let (line, rest) = input.split_once('\n')?;
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(value: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape),
        }
    }
    Ok(out)
}

/// A `heart-beat` header value: `<can send every>,<want to receive every>`
/// in milliseconds. Zero means "cannot" or "do not want".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    pub send_ms: u64,
    pub receive_ms: u64,
}

impl HeartBeat {
    #[must_use]
    pub const fn new(send_ms: u64, receive_ms: u64) -> Self {
        Self {
            send_ms,
            receive_ms,
        }
    }

    /// Parse a header value. A missing header means `0,0`.
    ///
    /// # Errors
    ///
    /// Returns `StompError::InvalidHeartBeat` for anything but two integers.
    pub fn parse(value: Option<&str>) -> Result<Self, StompError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let invalid = || StompError::InvalidHeartBeat(value.to_string());
        let (send, receive) = value.split_once(',').ok_or_else(invalid)?;
        Ok(Self {
            send_ms: send.trim().parse().map_err(|_| invalid())?,
            receive_ms: receive.trim().parse().map_err(|_| invalid())?,
        })
    }

    /// Header value form.
    #[must_use]
    pub fn header_value(self) -> String {
        format!("{},{}", self.send_ms, self.receive_ms)
    }

    /// Negotiate with a client's offer.
    ///
    /// Returns `(outgoing, incoming)`: how often this side must send a
    /// heart-beat and how often it should expect one. Each direction uses the
    /// larger of the two intervals, and is disabled when either side says 0.
    #[must_use]
    pub fn negotiate(self, client: Self) -> (Option<Duration>, Option<Duration>) {
        (
            pick(self.send_ms, client.receive_ms),
            pick(client.send_ms, self.receive_ms),
        )
    }
}

fn pick(a: u64, b: u64) -> Option<Duration> {
    (a != 0 && b != 0).then(|| Duration::from_millis(a.max(b)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_frame() {
        let text = "CONNECT\naccept-version:1.2\nheart-beat:4000,4000\nAuthorization:Bearer a.b.c\n\n\0";
        let frames = parse_frames(text).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Connect);
        assert_eq!(frames[0].get("heart-beat"), Some("4000,4000"));
        assert_eq!(frames[0].get("Authorization"), Some("Bearer a.b.c"));
        assert!(frames[0].body.is_empty());
    }

    #[test]
    fn test_encode_then_parse_preserves_frame() {
        let frame = Frame::new(Command::Message)
            .header("destination", "/user/shopper_01/queue/notifications")
            .header("subscription", "sub-0")
            .header("note", "a:b\\c\nd")
            .body(r#"{"title":"주문 완료"}"#);

        let parsed = parse_frames(&frame.encode()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].command, frame.command);
        assert_eq!(parsed[0].get("note"), Some("a:b\\c\nd"));
        assert_eq!(parsed[0].body, frame.body);
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let encoded = Frame::new(Command::Message).body("알림").encode();
        assert!(encoded.contains("content-length:6\n"));
    }

    #[test]
    fn test_body_may_contain_nul_with_content_length() {
        let text = "SEND\ndestination:/app/x\ncontent-length:3\n\na\0b\0";
        let frames = parse_frames(text).unwrap();
        assert_eq!(frames[0].body, "a\0b");
    }

    #[test]
    fn test_heartbeats_and_crlf_are_tolerated() {
        assert!(parse_frames("\n").unwrap().is_empty());
        assert!(parse_frames("\r\n\r\n").unwrap().is_empty());

        let frames = parse_frames("\nSUBSCRIBE\r\nid:0\r\ndestination:/topic/a\r\n\r\n\0\n").unwrap();
        assert_eq!(frames[0].command, Command::Subscribe);
        assert_eq!(frames[0].get("id"), Some("0"));
    }

    #[test]
    fn test_several_frames_in_one_message() {
        let text = "SUBSCRIBE\nid:0\ndestination:/a\n\n\0UNSUBSCRIBE\nid:0\n\n\0";
        let frames = parse_frames(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].command, Command::Unsubscribe);
    }

    #[test]
    fn test_repeated_header_keeps_first() {
        let frames = parse_frames("SEND\nfoo:1\nfoo:2\n\n\0").unwrap();
        assert_eq!(frames[0].get("foo"), Some("1"));
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(
            parse_frames("HELLO\n\n\0"),
            Err(StompError::UnknownCommand(_))
        ));
        assert_eq!(parse_frames("SEND\nfoo:1\n\nbody"), Err(StompError::Unterminated));
        assert!(matches!(
            parse_frames("SEND\nnocolon\n\n\0"),
            Err(StompError::MalformedHeader(_))
        ));
        assert_eq!(
            parse_frames("SEND\nfoo:bad\\t\n\n\0"),
            Err(StompError::InvalidEscape)
        );
    }

    #[test]
    fn test_connected_headers_are_not_escaped() {
        let encoded = Frame::new(Command::Connected)
            .header("server", "onandhome:1")
            .encode();
        assert!(encoded.contains("server:onandhome:1\n"));
    }

    #[test]
    fn test_heartbeat_negotiation_picks_larger_interval() {
        let server = HeartBeat::new(10_000, 10_000);
        let client = HeartBeat::parse(Some("4000,4000")).unwrap();

        let (outgoing, incoming) = server.negotiate(client);
        assert_eq!(outgoing, Some(Duration::from_secs(10)));
        assert_eq!(incoming, Some(Duration::from_secs(10)));

        let (outgoing, _) = HeartBeat::new(1000, 0).negotiate(HeartBeat::new(0, 4000));
        assert_eq!(outgoing, Some(Duration::from_millis(4000)));
    }

    #[test]
    fn test_heartbeat_zero_disables() {
        let server = HeartBeat::new(10_000, 10_000);
        assert_eq!(server.negotiate(HeartBeat::new(0, 0)), (None, None));
        assert_eq!(
            HeartBeat::new(0, 0).negotiate(HeartBeat::new(4000, 4000)),
            (None, None)
        );
        assert_eq!(HeartBeat::parse(None).unwrap(), HeartBeat::default());
        assert!(HeartBeat::parse(Some("fast")).is_err());
    }
}
