//! Byte-level parsing of mboxrd data.
//!
//! RFC 4155 leaves the envelope ("From ") line loosely defined. The layout
//! accepted here is the one written by the mboxrd tools:
//!
//! ```text
//! From <id> Mon Jan 02 15:04:05 -0700 2006
//! ```
//!
//! Body lines matching `>*From ` get one extra `>` when written, so the only
//! thing left to do on the way out is to strip it again.

use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use memchr::memmem;
use regex::bytes::Regex;
use thiserror::Error;

pub const ENVELOPE_PREFIX: &[u8] = b"From ";

/// strftime layout of the envelope date.
pub const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

const CRLF: &[u8] = b"\r\n";

lazy_static! {
    static ref QUOTED_FROM: Regex = Regex::new("^>+From ").unwrap();
    static ref DATE_LAYOUT: Regex = Regex::new(
        "^[A-Za-z]{3} [A-Za-z]{3} [0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2} [+-][0-9]{4} [0-9]{4}$"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: String,
    pub date: DateTime<FixedOffset>,
}

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("missing prefix \"From \"")]
    MissingPrefix,
    #[error("missing ' ' after message id")]
    MissingIdentifierTerminator,
    #[error("invalid date {date:?} for message {id:?}: {source}")]
    InvalidDate {
        id: String,
        date: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("date {date:?} of message {id:?} does not match \"Mon Jan 02 15:04:05 -0700 2006\"")]
    DateLayout { id: String, date: String },
    #[error("date of message {id:?} is not valid UTF-8")]
    NonUtf8Date { id: String },
}

impl EnvelopeError {
    /// The message id, if the line got far enough to have one.
    pub fn id(&self) -> Option<&str> {
        match self {
            EnvelopeError::InvalidDate { id, .. }
            | EnvelopeError::DateLayout { id, .. }
            | EnvelopeError::NonUtf8Date { id } => Some(id),
            _ => None,
        }
    }
}

/// Parses an envelope line, without its trailing CRLF.
pub fn parse_envelope(line: &[u8]) -> Result<Envelope, EnvelopeError> {
    if !line.starts_with(ENVELOPE_PREFIX) {
        return Err(EnvelopeError::MissingPrefix);
    }
    let rest = &line[ENVELOPE_PREFIX.len()..];

    let sp = memchr::memchr(b' ', rest).ok_or(EnvelopeError::MissingIdentifierTerminator)?;
    let id = String::from_utf8_lossy(&rest[..sp]).into_owned();

    let date = match std::str::from_utf8(&rest[sp + 1..]) {
        Ok(date) => date,
        Err(_) => return Err(EnvelopeError::NonUtf8Date { id }),
    };
    // chrono accepts unpadded fields, extra spaces and "-07:00" offsets.
    if !DATE_LAYOUT.is_match(date.as_bytes()) {
        return Err(EnvelopeError::DateLayout {
            date: date.to_owned(),
            id,
        });
    }
    match DateTime::parse_from_str(date, DATE_FORMAT) {
        Ok(date) => Ok(Envelope { id, date }),
        Err(source) => Err(EnvelopeError::InvalidDate {
            date: date.to_owned(),
            id,
            source,
        }),
    }
}

/// Reverses mboxrd quoting: every CRLF-delimited line starting with one or
/// more `>` followed by `From ` loses its first `>`. Everything else is
/// copied through untouched.
pub fn unescape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;

    while !rest.is_empty() {
        let end = memmem::find(rest, CRLF).map_or(rest.len(), |idx| idx + CRLF.len());
        let (line, tail) = rest.split_at(end);
        if QUOTED_FROM.is_match(line) {
            out.extend_from_slice(&line[1..]);
        } else {
            out.extend_from_slice(line);
        }
        rest = tail;
    }

    out
}
