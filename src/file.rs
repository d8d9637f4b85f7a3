use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use log::{debug, trace};

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::parser::{parse_envelope, unescape, Envelope};

const CRLF: &[u8] = b"\r\n";

/// Start of the next message: the line break ending the previous body, then
/// the envelope prefix.
const BOUNDARY: &[u8] = b"\r\nFrom ";

/// Quoting convention of an mbox file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Mboxrd,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Format> {
        match s {
            "mboxrd" => Ok(Format::Mboxrd),
            _ => Err(Error::UnknownFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Format::Mboxrd => f.write_str("mboxrd"),
        }
    }
}

/// One message of a mailbox, with quoting already removed.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    id: String,
    date: DateTime<FixedOffset>,
    data: Vec<u8>,
}

impl Message {
    pub fn new(id: String, date: DateTime<FixedOffset>, data: Vec<u8>) -> Message {
        Message { id, date, data }
    }

    /// Token following "From " on the envelope line.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> &DateTime<FixedOffset> {
        &self.date
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Message {} {} {:?}",
            self.id,
            self.date.to_rfc3339(),
            String::from_utf8_lossy(&self.data[..self.data.len().min(10)])
        )
    }
}

/// An open mailbox, read front to back one message at a time.
pub struct Mbox<R = File> {
    format: Format,
    cursor: Cursor<R>,
    done: bool,
}

impl Mbox<File> {
    pub fn open<P: AsRef<Path>>(path: P, format: Format) -> Result<Mbox<File>> {
        let path = path.as_ref();
        debug!("opening {} mailbox {}", format, path.display());
        let file = File::open(path)?;
        Ok(Mbox::from_reader(file, format))
    }
}

impl<R: Read> Mbox<R> {
    pub fn from_reader(reader: R, format: Format) -> Mbox<R> {
        Mbox {
            format,
            cursor: Cursor::new(reader),
            done: false,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Bytes of the file consumed so far.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Reads the next message, or `None` once the mailbox is exhausted.
    pub fn read(&mut self) -> Result<Option<Message>> {
        let line = match self.cursor.read_until_and_consume(CRLF)? {
            Some(line) => line,
            None => {
                // Either a clean end, or an envelope line with nothing after
                // it and no line break.
                let rest = self.cursor.read_all()?;
                if rest.is_empty() {
                    return Ok(None);
                }
                rest
            }
        };

        let Envelope { id, date } = parse_envelope(&line)?;

        let data = match self.cursor.read_until(BOUNDARY) {
            Ok(Some(data)) => {
                if let Err(source) = self.cursor.skip(CRLF.len()) {
                    return Err(Error::Read { id, source });
                }
                data
            }
            Ok(None) => match self.cursor.read_all() {
                Ok(data) => {
                    trace!("message {} is the last one", id);
                    data
                }
                Err(source) => return Err(Error::Read { id, source }),
            },
            Err(source) => return Err(Error::Read { id, source }),
        };

        let data = match self.format {
            Format::Mboxrd => unescape(&data),
        };
        trace!("read message {} ({} bytes)", id, data.len());

        Ok(Some(Message::new(id, date, data)))
    }

    /// Releases the underlying reader.
    pub fn close(self) {
        debug!("closing mailbox at offset {}", self.cursor.position());
    }
}

impl<R: Read> Iterator for Mbox<R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let res = self.read().transpose();
        // Boundaries can't be found again after a failure.
        if !matches!(res, Some(Ok(_))) {
            self.done = true;
        }
        res
    }
}
