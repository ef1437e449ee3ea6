use chrono::NaiveDate;

use crate::model::RoomId;

/// One rejected input field, named so the presentation layer can attach the
/// message to the right form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// The query or stay range is empty or inverted (`end <= start`).
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// Guest input rejected before any store access.
    Validation(Vec<FieldError>),
    /// The interval overlaps a committed restriction. Raised only after the
    /// store has proven no concurrent writer interleaved; not retryable.
    Conflict { room_id: RoomId },
    /// Unknown room / reservation / restriction / draft.
    NotFound { entity: &'static str, key: String },
    LimitExceeded(&'static str),
    /// I/O or transaction failure, surfaced untouched. Callers may retry.
    Storage(String),
}

impl Error {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Error::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidRange { start, end } => {
                write!(f, "invalid range: [{start}, {end}) is empty or inverted")
            }
            Error::Validation(errors) => {
                write!(f, "validation failed:")?;
                for e in errors {
                    write!(f, " {}: {};", e.field, e.message)?;
                }
                Ok(())
            }
            Error::Conflict { room_id } => {
                write!(f, "room {room_id} is already restricted for those dates")
            }
            Error::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Error::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            Error::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for Error {}
