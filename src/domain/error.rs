use thiserror::Error;

/// Failures of [`CodeGenerator::generate`](crate::domain::generator::CodeGenerator::generate).
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("code length must be greater than 0")]
    InvalidLength,
    #[error("could not allocate a unique code after {rounds} rounds")]
    Exhausted { rounds: usize },
    #[error("code store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Unique-constraint outcomes of inserting a shortened URL.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("unique code is already taken")]
    CodeTaken,
    #[error("long URL is already shortened")]
    LongUrlTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    NotFound,
    Forbidden,
    /// The caller may try the same request again.
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("You are not authorized to access this resource")]
    Forbidden,
    #[error(transparent)]
    Generate(#[from] GenerateError),
    /// Every freshly checked code was inserted by someone else first.
    #[error("unique code was taken at insert on all {attempts} attempts")]
    InsertAttemptsExhausted { attempts: usize },
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::InvalidInput,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Forbidden => ErrorKind::Forbidden,
            DomainError::Generate(GenerateError::Exhausted { .. }) => ErrorKind::Unavailable,
            DomainError::InsertAttemptsExhausted { .. } => ErrorKind::Unavailable,
            // The configured length is ours, not the caller's.
            DomainError::Generate(GenerateError::InvalidLength) => ErrorKind::Internal,
            DomainError::Generate(GenerateError::Store(_)) => ErrorKind::Internal,
            DomainError::Storage(_) => ErrorKind::Internal,
        }
    }
}
