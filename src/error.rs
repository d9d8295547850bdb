use std::fmt;

use crate::types::EntityId;

#[derive(Debug)]
pub enum Error {
    /// A read returned unknown/unavailable, or the source is missing.
    Unavailable {
        entity: EntityId,
        attribute: Option<&'static str>,
    },
    /// A read returned a value that cannot be interpreted as a number.
    NotNumeric { entity: EntityId, value: String },
    /// The mode source yielded a value outside on/off/auto/eco/vacation.
    UnknownMode(String),
    InvalidConfig(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unavailable { entity, attribute } => match attribute {
                Some(attr) => write!(f, "source unavailable: {entity} (attribute {attr})"),
                None => write!(f, "source unavailable: {entity}"),
            },
            Error::NotNumeric { entity, value } => {
                write!(f, "non-numeric reading from {entity}: {value:?}")
            }
            Error::UnknownMode(mode) => write!(f, "unknown heating mode: {mode:?}"),
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
