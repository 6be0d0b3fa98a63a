use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::OperationResult;
use crate::validation::ValidationError;

/// Failure reasons shared between the server and every client.
///
/// The integer values are part of the wire contract: clients map them to
/// localized messages, so existing values never change and new variants are
/// only ever appended inside their range.
///
/// Ranges:
/// - 0: Success
/// - 1-99: Shared/infrastructure
/// - 1xxx: Login
/// - 2xxx: Friends
/// - 3xxx: Lobby
/// - 4xxx: Match
/// - 5xxx: Chat
/// - 6xxx: Moderation
/// - 7xxx: Ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrorCode {
    Success,

    // Shared
    UnknownError,
    InternalError,
    ValidationError,
    NotFound,
    DatabaseError,
    ServiceUnavailable,
    BadRequest,

    // Login
    InvalidCredentials,
    UserBanned,
    SessionAlreadyActive,
    UsernameTaken,

    // Friends
    UserNotFound,
    CannotFriendSelf,
    AlreadyFriends,
    FriendRequestPending,
    FriendRequestNotFound,
    FriendRequestNotPending,
    FriendshipNotFound,

    // Lobby
    LobbyNotFound,
    LobbyFull,
    LobbyAlreadyStarted,
    NotEnoughPlayers,
    NotLobbyHost,

    // Match
    MatchNotFound,
    NotYourTurn,
    InvalidMove,
    CoordinatesOutOfBoard,
    JumpRequired,

    // Chat
    MessageTooLong,
    ChatUnavailable,

    // Moderation
    ReportNotFound,
    CannotReportSelf,
    SanctionNotFound,

    // Ranking
    RankingUnavailable,
}

impl ErrorCode {
    pub fn value(&self) -> i32 {
        match self {
            Self::Success => 0,

            Self::UnknownError => 1,
            Self::InternalError => 2,
            Self::ValidationError => 3,
            Self::NotFound => 4,
            Self::DatabaseError => 5,
            Self::ServiceUnavailable => 6,
            Self::BadRequest => 7,

            Self::InvalidCredentials => 1001,
            Self::UserBanned => 1002,
            Self::SessionAlreadyActive => 1003,
            Self::UsernameTaken => 1004,

            Self::UserNotFound => 2001,
            Self::CannotFriendSelf => 2002,
            Self::AlreadyFriends => 2003,
            Self::FriendRequestPending => 2004,
            Self::FriendRequestNotFound => 2005,
            Self::FriendRequestNotPending => 2006,
            Self::FriendshipNotFound => 2007,

            Self::LobbyNotFound => 3001,
            Self::LobbyFull => 3002,
            Self::LobbyAlreadyStarted => 3003,
            Self::NotEnoughPlayers => 3004,
            Self::NotLobbyHost => 3005,

            Self::MatchNotFound => 4001,
            Self::NotYourTurn => 4002,
            Self::InvalidMove => 4003,
            Self::CoordinatesOutOfBoard => 4004,
            Self::JumpRequired => 4005,

            Self::MessageTooLong => 5001,
            Self::ChatUnavailable => 5002,

            Self::ReportNotFound => 6001,
            Self::CannotReportSelf => 6002,
            Self::SanctionNotFound => 6003,

            Self::RankingUnavailable => 7001,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::UnknownError | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceUnavailable | Self::ChatUnavailable | Self::RankingUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::ValidationError | Self::BadRequest | Self::MessageTooLong
            | Self::InvalidMove | Self::CoordinatesOutOfBoard | Self::JumpRequired => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::FriendRequestNotFound
            | Self::FriendshipNotFound | Self::LobbyNotFound | Self::MatchNotFound
            | Self::ReportNotFound | Self::SanctionNotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserBanned | Self::NotLobbyHost | Self::NotYourTurn
            | Self::CannotFriendSelf | Self::CannotReportSelf => StatusCode::FORBIDDEN,
            Self::SessionAlreadyActive | Self::UsernameTaken | Self::AlreadyFriends
            | Self::FriendRequestPending | Self::FriendRequestNotPending | Self::LobbyFull
            | Self::LobbyAlreadyStarted | Self::NotEnoughPlayers => StatusCode::CONFLICT,
        }
    }

    const ALL: [ErrorCode; 35] = [
        Self::Success,
        Self::UnknownError,
        Self::InternalError,
        Self::ValidationError,
        Self::NotFound,
        Self::DatabaseError,
        Self::ServiceUnavailable,
        Self::BadRequest,
        Self::InvalidCredentials,
        Self::UserBanned,
        Self::SessionAlreadyActive,
        Self::UsernameTaken,
        Self::UserNotFound,
        Self::CannotFriendSelf,
        Self::AlreadyFriends,
        Self::FriendRequestPending,
        Self::FriendRequestNotFound,
        Self::FriendRequestNotPending,
        Self::FriendshipNotFound,
        Self::LobbyNotFound,
        Self::LobbyFull,
        Self::LobbyAlreadyStarted,
        Self::NotEnoughPlayers,
        Self::NotLobbyHost,
        Self::MatchNotFound,
        Self::NotYourTurn,
        Self::InvalidMove,
        Self::CoordinatesOutOfBoard,
        Self::JumpRequired,
        Self::MessageTooLong,
        Self::ChatUnavailable,
        Self::ReportNotFound,
        Self::CannotReportSelf,
        Self::SanctionNotFound,
        Self::RankingUnavailable,
    ];
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.value()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.value() == value)
            .ok_or_else(|| format!("unknown error code: {value}"))
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.value())
    }
}

/// Failure of the persistence layer itself, as opposed to a rejected request.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{repository} repository: {operation} failed: {source}")]
    Storage {
        repository: &'static str,
        operation: &'static str,
        #[source]
        source: diesel::result::Error,
    },

    #[error("could not acquire persistence context: {0}")]
    Context(String),
}

impl RepositoryError {
    pub fn storage(
        repository: &'static str,
        operation: &'static str,
    ) -> impl FnOnce(diesel::result::Error) -> Self {
        move |source| Self::Storage { repository, operation, source }
    }
}

/// An invalid replacement was handed to a context registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("a context factory must be supplied")]
    MissingFactory,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Repository(_) => ErrorCode::DatabaseError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl From<&AppError> for OperationResult {
    fn from(err: &AppError) -> Self {
        let detail = match err {
            AppError::Known { message, .. } => message.clone(),
            AppError::Repository(_) => "storage unavailable".to_string(),
            AppError::Validation(e) => e.to_string(),
        };
        OperationResult::fail_with(detail, err.code())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Repository(err) = &self {
            tracing::error!(error = %err, "repository error");
        }

        let status = self.code().status_code();
        (status, Json(OperationResult::from(&self))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
