use thiserror::Error;

/// Admin-facing error taxonomy.
///
/// Kept separate from the `anyhow::Error` used for I/O-boundary
/// plumbing so the REST layer can map a variant to a status code
/// without string-matching a message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bot not found: {0}")]
    NotFound(String),

    #[error("bot already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::Conflict(_) => "Conflict",
            Self::BadRequest(_) => "BadRequest",
            Self::Unauthorized(_) => "Unauthorized",
        }
    }
}
