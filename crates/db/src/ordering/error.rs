use thiserror::Error;

/// SQLite primary and extended result codes that indicate a competing writer.
const CONFLICT_CODES: &[&str] = &["5", "6", "261", "262", "517"];

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("cannot edit a completed item")]
    LockedByCompletion,
    #[error("conflicting concurrent edit, please retry")]
    ConcurrencyConflict,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("position index corrupted: {0}")]
    InvariantViolated(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl OrderingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns true if the whole operation may be retried with fresh reads.
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }
}

impl From<sqlx::Error> for OrderingError {
    fn from(e: sqlx::Error) -> Self {
        let conflict = match &e {
            sqlx::Error::Database(db) => db
                .code()
                .is_some_and(|code| CONFLICT_CODES.contains(&&*code)),
            _ => false,
        };
        if conflict {
            Self::ConcurrencyConflict
        } else {
            Self::Database(e)
        }
    }
}
