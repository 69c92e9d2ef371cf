//! Wire protocol spoken between the network driver and the cache server.
//!
//! Every frame starts with a CRLF-terminated header line whose words are
//! separated by spaces. `set` requests and `VALUE` replies carry a
//! length-prefixed body followed by CRLF:
//!
//! ```text
//! set <key> <ttl> <len>\r\n<bytes>\r\n   ->  STORED | ERR <msg>
//! get <key>\r\n                          ->  VALUE <len>\r\n<bytes>\r\n | NOT_FOUND
//! delete <key>\r\n                       ->  DELETED | NOT_FOUND
//! ping\r\n                               ->  PONG
//! stats\r\n                              ->  STATS <name>:<value> ...
//! ```
//!
//! Parsers take a `BytesMut` that may hold a partial frame and return
//! `Ok(None)` until a complete frame is buffered; a complete frame is
//! consumed from the buffer.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::ttl::Ttl;

/// Longest header line accepted before a terminator is seen.
pub const MAX_LINE: usize = 1024;

/// Largest body a `set` request or `VALUE` reply may announce.
pub const MAX_BODY: usize = 64 * 1024 * 1024;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("header line exceeds {} bytes", MAX_LINE)]
    LineTooLong,

    #[error("body of {0} bytes exceeds {max} bytes", max = MAX_BODY)]
    BodyTooLarge(usize),
}

/// Request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Get,
    Set,
    Delete,
    Ping,
    Stats,
}

impl Command {
    /// Case-insensitive; accepts `del` and `info` as aliases.
    pub fn parse(s: &str) -> Result<Command, ProtocolError> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Command::Get),
            "set" => Ok(Command::Set),
            "delete" | "del" => Ok(Command::Delete),
            "ping" => Ok(Command::Ping),
            "stats" | "info" => Ok(Command::Stats),
            _ => Err(ProtocolError::UnknownCommand(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Get => "get",
            Command::Set => "set",
            Command::Delete => "delete",
            Command::Ping => "ping",
            Command::Stats => "stats",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get { key: String },
    Set { key: String, ttl: Ttl, value: Bytes },
    Delete { key: String },
    Ping,
    Stats,
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::Get { .. } => Command::Get,
            Request::Set { .. } => Command::Set,
            Request::Delete { .. } => Command::Delete,
            Request::Ping => Command::Ping,
            Request::Stats => Command::Stats,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Request::Get { key } | Request::Delete { key } => {
                put_line(dst, &format!("{} {}", self.command(), key));
            }
            Request::Set { key, ttl, value } => {
                put_line(dst, &format!("set {} {} {}", key, ttl.secs(), value.len()));
                put_body(dst, value);
            }
            Request::Ping | Request::Stats => put_line(dst, self.command().as_str()),
        }
    }

    pub fn parse(buf: &mut BytesMut) -> Result<Option<Request>, ProtocolError> {
        let Some(end) = find_line(buf)? else {
            return Ok(None);
        };
        let words = split_words(&buf[..end])?;
        let Some((verb, args)) = words.split_first() else {
            return Err(ProtocolError::Malformed("empty command".to_string()));
        };

        let request = match Command::parse(verb)? {
            Command::Get => Request::Get {
                key: single_key(verb, args)?,
            },
            Command::Delete => Request::Delete {
                key: single_key(verb, args)?,
            },
            Command::Ping => Request::Ping,
            Command::Stats => Request::Stats,
            Command::Set => {
                let [key, ttl, len] = args else {
                    return Err(ProtocolError::Malformed(
                        "set requires: set <key> <ttl> <len>".to_string(),
                    ));
                };
                let ttl: i64 = parse_number("ttl", ttl)?;
                let len: usize = parse_number("length", len)?;
                let key = key.clone();
                let Some(value) = take_body(buf, end, len)? else {
                    return Ok(None);
                };
                return Ok(Some(Request::Set {
                    key,
                    ttl: Ttl::from_secs(ttl),
                    value,
                }));
            }
        };

        buf.advance(end + CRLF.len());
        Ok(Some(request))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Stored,
    Value(Bytes),
    NotFound,
    Deleted,
    Pong,
    Stats(Vec<(String, String)>),
    Error(String),
}

impl Response {
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Response::Stored => put_line(dst, "STORED"),
            Response::Value(value) => {
                put_line(dst, &format!("VALUE {}", value.len()));
                put_body(dst, value);
            }
            Response::NotFound => put_line(dst, "NOT_FOUND"),
            Response::Deleted => put_line(dst, "DELETED"),
            Response::Pong => put_line(dst, "PONG"),
            Response::Stats(pairs) => {
                let mut line = String::from("STATS");
                for (name, value) in pairs {
                    line.push(' ');
                    line.push_str(name);
                    line.push(':');
                    line.push_str(value);
                }
                put_line(dst, &line);
            }
            Response::Error(msg) => {
                // Keep the reply on one line whatever the message holds.
                let msg = msg.replace(['\r', '\n'], " ");
                put_line(dst, &format!("ERR {}", msg));
            }
        }
    }

    pub fn parse(buf: &mut BytesMut) -> Result<Option<Response>, ProtocolError> {
        let Some(end) = find_line(buf)? else {
            return Ok(None);
        };
        let line = std::str::from_utf8(&buf[..end])
            .map_err(|_| ProtocolError::Malformed("reply is not UTF-8".to_string()))?
            .to_string();

        if let Some(msg) = line.strip_prefix("ERR ").or((line == "ERR").then_some("")) {
            buf.advance(end + CRLF.len());
            return Ok(Some(Response::Error(msg.trim_start().to_string())));
        }

        let words = split_words(line.as_bytes())?;
        let Some((head, args)) = words.split_first() else {
            return Err(ProtocolError::Malformed("empty reply".to_string()));
        };

        let response = match (head.as_str(), args) {
            ("STORED", []) => Response::Stored,
            ("NOT_FOUND", []) => Response::NotFound,
            ("DELETED", []) => Response::Deleted,
            ("PONG", []) => Response::Pong,
            ("STATS", pairs) => Response::Stats(
                pairs
                    .iter()
                    .map(|pair| match pair.split_once(':') {
                        Some((name, value)) => Ok((name.to_string(), value.to_string())),
                        None => Err(ProtocolError::Malformed(format!("stat '{}'", pair))),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            ("VALUE", [len]) => {
                let len: usize = parse_number("length", len)?;
                return Ok(take_body(buf, end, len)?.map(Response::Value));
            }
            _ => return Err(ProtocolError::Malformed(format!("reply '{}'", line))),
        };

        buf.advance(end + CRLF.len());
        Ok(Some(response))
    }
}

/// Position of the first CRLF, or `None` if the line is still incomplete.
fn find_line(buf: &[u8]) -> Result<Option<usize>, ProtocolError> {
    match buf.windows(CRLF.len()).position(|w| w == CRLF) {
        Some(end) if end > MAX_LINE => Err(ProtocolError::LineTooLong),
        Some(end) => Ok(Some(end)),
        None if buf.len() > MAX_LINE => Err(ProtocolError::LineTooLong),
        None => Ok(None),
    }
}

/// Split a header line on spaces. Runs of spaces count as one separator.
fn split_words(line: &[u8]) -> Result<Vec<String>, ProtocolError> {
    line.split(|b| *b == b' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            std::str::from_utf8(word)
                .map(str::to_string)
                .map_err(|_| ProtocolError::Malformed("header is not UTF-8".to_string()))
        })
        .collect()
}

fn single_key(verb: &str, args: &[String]) -> Result<String, ProtocolError> {
    match args {
        [key] => Ok(key.clone()),
        _ => Err(ProtocolError::Malformed(format!("{} requires exactly one key", verb))),
    }
}

fn parse_number<T: std::str::FromStr>(what: &str, raw: &str) -> Result<T, ProtocolError> {
    raw.parse()
        .map_err(|_| ProtocolError::Malformed(format!("invalid {} '{}'", what, raw)))
}

/// Consume a header of `header_len` bytes and its `len`-byte body.
///
/// `len` is checked against [`MAX_BODY`] before anything is buffered.
fn take_body(
    buf: &mut BytesMut,
    header_len: usize,
    len: usize,
) -> Result<Option<Bytes>, ProtocolError> {
    if len > MAX_BODY {
        return Err(ProtocolError::BodyTooLarge(len));
    }
    let body_start = header_len + CRLF.len();
    let frame_len = body_start
        .checked_add(len)
        .and_then(|n| n.checked_add(CRLF.len()))
        .ok_or_else(|| ProtocolError::Malformed("body length overflows".to_string()))?;
    if buf.len() < frame_len {
        return Ok(None);
    }
    if &buf[body_start + len..frame_len] != CRLF {
        return Err(ProtocolError::Malformed(
            "body is not terminated by CRLF".to_string(),
        ));
    }

    let mut frame = buf.split_to(frame_len);
    frame.advance(body_start);
    frame.truncate(len);
    Ok(Some(frame.freeze()))
}

fn put_line(dst: &mut BytesMut, line: &str) {
    dst.reserve(line.len() + CRLF.len());
    dst.put_slice(line.as_bytes());
    dst.put_slice(CRLF);
}

fn put_body(dst: &mut BytesMut, body: &[u8]) {
    dst.reserve(body.len() + CRLF.len());
    dst.put_slice(body);
    dst.put_slice(CRLF);
}
