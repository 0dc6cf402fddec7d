use thiserror::Error;

use threadkit_db::{ErrorKind, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("blocking task failed: {0}")]
    Join(String),
}

impl ServiceError {
    /// `None` for failures outside the store's taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Store(e) => Some(e.kind()),
            Self::Unauthorized(_) => Some(ErrorKind::PermissionDenied),
            Self::Join(_) => None,
        }
    }
}
