use tablero_shared::validation::ValidationError;
use tablero_shared::{AppError, ErrorCode, RepositoryError};

/// Failures of the user and friend repositories.
///
/// Validation and state-conflict variants describe a request that cannot be
/// honoured; `Repository` means the store itself failed.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("users cannot send friend requests to themselves")]
    SelfRequest,

    #[error("users {0} and {1} are already friends")]
    AlreadyFriends(i64, i64),

    #[error("a pending friend request already exists between users {0} and {1}")]
    RequestAlreadyPending(i64, i64),

    #[error("friend request {0} not found")]
    RequestNotFound(i64),

    #[error("friend request {id} is {status}, not pending")]
    RequestNotPending { id: i64, status: String },

    #[error("users {0} and {1} are not friends")]
    FriendshipNotFound(i64, i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SocialError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::UserNotFound(_) => ErrorCode::UserNotFound,
            Self::UsernameTaken(_) => ErrorCode::UsernameTaken,
            Self::SelfRequest => ErrorCode::CannotFriendSelf,
            Self::AlreadyFriends(..) => ErrorCode::AlreadyFriends,
            Self::RequestAlreadyPending(..) => ErrorCode::FriendRequestPending,
            Self::RequestNotFound(_) => ErrorCode::FriendRequestNotFound,
            Self::RequestNotPending { .. } => ErrorCode::FriendRequestNotPending,
            Self::FriendshipNotFound(..) => ErrorCode::FriendshipNotFound,
            Self::Repository(_) => ErrorCode::DatabaseError,
        }
    }

    /// True when the store failed, false when the request itself was rejected.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

// Raised by diesel when a transaction cannot begin or commit.
impl From<diesel::result::Error> for SocialError {
    fn from(source: diesel::result::Error) -> Self {
        Self::Repository(RepositoryError::Storage {
            repository: "friends",
            operation: "transaction",
            source,
        })
    }
}

impl From<SocialError> for AppError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::Repository(e) => AppError::Repository(e),
            SocialError::Validation(e) => AppError::Validation(e),
            other => AppError::new(other.code(), other.to_string()),
        }
    }
}
