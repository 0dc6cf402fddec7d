use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    PermissionDenied,
    Conflict,
    InvalidArgument,
    Internal,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::PermissionDenied => ErrorKind::PermissionDenied,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidCursor(_) | Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Database(_) | Self::Serialization(_) | Self::LockPoisoned => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::Conflict(msg.unwrap_or_else(|| "unique constraint".into()))
            }
            other => Self::Database(other),
        }
    }
}
