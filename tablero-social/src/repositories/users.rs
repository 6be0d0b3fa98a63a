use std::sync::Arc;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tablero_shared::persistence::ContextFactory;
use tablero_shared::validation;
use tablero_shared::RepositoryError;

use crate::error::SocialError;
use crate::models::{NewUser, User};
use crate::schema::users;

use super::{is_unique_violation, utc_now};

const REPOSITORY: &str = "users";

/// Users are owned by the login service; this repository only registers and
/// resolves them. Rows are never deleted.
pub struct UserRepository {
    contexts: Arc<dyn ContextFactory>,
}

impl UserRepository {
    pub fn new(contexts: Arc<dyn ContextFactory>) -> Self {
        Self { contexts }
    }

    pub fn create(&self, username: &str) -> Result<User, SocialError> {
        let username = validation::username("username", username)?;
        let mut conn = self.contexts.create()?;

        let new_user = NewUser {
            username,
            created_at: utc_now(),
        };

        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(&mut conn)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    SocialError::UsernameTaken(username.to_string())
                } else {
                    RepositoryError::storage(REPOSITORY, "create")(e).into()
                }
            })?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, SocialError> {
        let username = validation::username("username", username)?;
        let mut conn = self.contexts.create()?;
        lookup_username(&mut conn, username)
    }

    pub fn find_by_id(&self, user_id: i64) -> Result<Option<User>, SocialError> {
        let mut conn = self.contexts.create()?;
        users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .optional()
            .map_err(|e| RepositoryError::storage(REPOSITORY, "find_by_id")(e).into())
    }
}

fn lookup_username(conn: &mut SqliteConnection, username: &str) -> Result<Option<User>, SocialError> {
    users::table
        .filter(users::username.eq(username))
        .first::<User>(conn)
        .optional()
        .map_err(|e| RepositoryError::storage(REPOSITORY, "find_by_username")(e).into())
}

/// Resolves a username inside an already opened context.
pub(crate) fn require_username(conn: &mut SqliteConnection, username: &str) -> Result<User, SocialError> {
    lookup_username(conn, username)?.ok_or_else(|| SocialError::UserNotFound(username.to_string()))
}
