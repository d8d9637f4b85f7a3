//! Streaming reader for mboxrd mailboxes.
//!
//! An mbox file is a concatenation of RFC 2822 messages, each introduced by
//! an envelope line of the form `From <id> <date>`. [`Mbox`] pulls one
//! [`Message`] at a time from the file, splitting on `\r\nFrom ` and
//! reversing the `>From ` quoting of body lines.

pub mod cursor;
pub mod error;
pub mod file;
pub mod maildir;
pub mod parser;
pub mod template;

pub use crate::error::{Error, Result};
pub use crate::file::{Format, Mbox, Message};
pub use crate::maildir::Maildir;
pub use crate::parser::{parse_envelope, unescape, Envelope, EnvelopeError};
pub use crate::template::{Template, TemplateError};
