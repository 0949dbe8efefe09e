use crate::track::Owner;
use thiserror::Error;

/// A defect in calling logic or authored data. These are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{kind} {id} is held by {owner}, cannot reserve it for {requested}")]
    AlreadyReserved {
        kind: &'static str,
        id: u16,
        owner: Owner,
        requested: Owner,
    },
    #[error("{kind} {id} out of range 1..={count}")]
    OutOfRange {
        kind: &'static str,
        id: u16,
        count: u16,
    },
    #[error("train id {0} is not a valid train")]
    InvalidTrain(u8),
    #[error("{kind} {id} record has bad {field} byte {value:#04x}")]
    MalformedRecord {
        kind: &'static str,
        id: u16,
        field: &'static str,
        value: u8,
    },
    #[error("{kind} {id} record has unsupported layout version {version}")]
    UnsupportedVersion {
        kind: &'static str,
        id: u16,
        version: u8,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record access at {offset}+{len} exceeds store capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("record store: {0}")]
    Storage(#[from] StorageError),
    #[error("layout: {0}")]
    Layout(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }

    pub fn invariant(&self) -> Option<&InvariantViolation> {
        match self {
            Error::Invariant(v) => Some(v),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
