// ============================
// gameofthree-client/src/stomp.rs
// ============================
//! Minimal STOMP 1.2 framing.
//!
//! The game server exposes a STOMP broker over WebSocket. Each WebSocket text
//! message carries one frame:
//!
//! ```text
//! COMMAND
//! header:value
//!
//! body^@
//! ```
//!
//! A message consisting only of end-of-line characters is a heart-beat and
//! decodes to `None`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Frame terminator
const NUL: char = '\0';

/// Possible framing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StompError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    #[error("Invalid content-length: {0}")]
    InvalidContentLength(String),

    #[error("Frame is not NUL terminated")]
    Unterminated,
}

/// STOMP commands this client sends or understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    // CONNECT and CONNECTED headers are never escaped
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "SEND" => Command::Send,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            "DISCONNECT" => Command::Disconnect,
            other => return Err(StompError::UnknownCommand(other.to_string())),
        })
    }
}

/// A single STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    /// Headers in wire order; repeated keys are kept
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of a header; the first occurrence wins
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize the frame, NUL terminator included
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(key));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    /// Parse one frame; `Ok(None)` for a heart-beat
    pub fn decode(text: &str) -> Result<Option<Self>, StompError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let (head, rest) = split_head(text).ok_or(StompError::Unterminated)?;
        let mut lines = head.lines().map(|l| l.strip_suffix('\r').unwrap_or(l));

        let command: Command = lines.next().unwrap_or_default().parse()?;
        let unescape = command.escapes_headers();

        let mut headers = Vec::new();
        for line in lines {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            if unescape {
                headers.push((unescape_header(key)?, unescape_header(value)?));
            } else {
                headers.push((key.to_string(), value.to_string()));
            }
        }

        let mut frame = Frame {
            command,
            headers,
            body: String::new(),
        };

        frame.body = match frame.get("content-length") {
            Some(len) => {
                let len: usize = len
                    .trim()
                    .parse()
                    .map_err(|_| StompError::InvalidContentLength(len.to_string()))?;
                let body = rest
                    .get(..len)
                    .ok_or_else(|| StompError::InvalidContentLength(len.to_string()))?;
                if !rest[len..].starts_with(NUL) {
                    return Err(StompError::Unterminated);
                }
                body.to_string()
            },
            None => {
                let end = rest.find(NUL).ok_or(StompError::Unterminated)?;
                rest[..end].to_string()
            },
        };

        Ok(Some(frame))
    }
}

/// Split at the blank line ending the header section
fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (at, sep) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 < b.0 {
                a
            } else {
                b
            }
        },
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&text[..at], &text[at + sep..]))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
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
            _ => return Err(StompError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
