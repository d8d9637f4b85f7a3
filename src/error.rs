use std::io;

use thiserror::Error;

use crate::parser::EnvelopeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("cannot read message {id:?}: {source}")]
    Read {
        id: String,
        #[source]
        source: io::Error,
    },
    #[error("unknown format {0:?}")]
    UnknownFormat(String),
    #[error("invalid message header: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),
}

impl Error {
    /// Id of the message being read when the error happened, if known.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Error::Read { id, .. } => Some(id),
            Error::MalformedEnvelope(e) => e.id(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
