use tablero_shared::validation::ValidationError;
use tablero_shared::{AppError, ErrorCode, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("user {0} cannot report themselves")]
    CannotReportSelf(i64),

    #[error("sanction {0} not found")]
    SanctionNotFound(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ModerationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::CannotReportSelf(_) => ErrorCode::CannotReportSelf,
            Self::SanctionNotFound(_) => ErrorCode::SanctionNotFound,
            Self::Repository(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

impl From<ModerationError> for AppError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::Repository(e) => AppError::Repository(e),
            ModerationError::Validation(e) => AppError::Validation(e),
            other => AppError::new(other.code(), other.to_string()),
        }
    }
}
