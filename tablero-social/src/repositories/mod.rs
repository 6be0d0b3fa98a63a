mod friends;
mod users;

pub use friends::FriendRepository;
pub use users::UserRepository;

use chrono::{NaiveDateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

pub(crate) fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn is_unique_violation(err: &DieselError) -> bool {
    matches!(err, DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tablero_shared::persistence::{apply_schema, create_pool, ContextFactory, DbPool, PoolContextFactory};

    pub fn pool() -> DbPool {
        let pool = create_pool(":memory:", 1).unwrap();
        apply_schema(&pool, crate::SCHEMA).unwrap();
        pool
    }

    pub fn contexts(pool: &DbPool) -> Arc<dyn ContextFactory> {
        Arc::new(PoolContextFactory::new(pool.clone()))
    }
}
