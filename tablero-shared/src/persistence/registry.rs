use std::sync::{Arc, PoisonError, RwLock};

use crate::errors::{ConfigurationError, RepositoryError};

use super::{DbContext, DbPool};

/// Produces a fresh persistence context on every call.
///
/// Repositories take an `Arc<dyn ContextFactory>` at construction; tests hand
/// them a closure or a registry instead of subclassing anything.
pub trait ContextFactory: Send + Sync {
    fn create(&self) -> Result<DbContext, RepositoryError>;
}

impl<F> ContextFactory for F
where
    F: Fn() -> Result<DbContext, RepositoryError> + Send + Sync,
{
    fn create(&self) -> Result<DbContext, RepositoryError> {
        self()
    }
}

/// Default strategy: check a connection out of the pool.
#[derive(Clone)]
pub struct PoolContextFactory {
    pool: DbPool,
}

impl PoolContextFactory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ContextFactory for PoolContextFactory {
    fn create(&self) -> Result<DbContext, RepositoryError> {
        self.pool
            .get()
            .map_err(|e| RepositoryError::Context(e.to_string()))
    }
}

/// A default construction strategy plus one replaceable override slot.
///
/// The slot sits behind a lock, but `configure`/`reset` still change behavior
/// for every repository sharing the registry. Parallel tests should each own
/// a registry rather than share one.
pub struct ContextRegistry {
    default: Arc<dyn ContextFactory>,
    replacement: RwLock<Option<Arc<dyn ContextFactory>>>,
}

impl ContextRegistry {
    pub fn new(default: Arc<dyn ContextFactory>) -> Self {
        Self {
            default,
            replacement: RwLock::new(None),
        }
    }

    /// Replaces the construction strategy until the next [`reset`](Self::reset).
    pub fn configure(
        &self,
        factory: Option<Arc<dyn ContextFactory>>,
    ) -> Result<(), ConfigurationError> {
        let factory = factory.ok_or(ConfigurationError::MissingFactory)?;
        *self.replacement.write().unwrap_or_else(PoisonError::into_inner) = Some(factory);
        tracing::debug!("context factory override installed");
        Ok(())
    }

    pub fn reset(&self) {
        *self.replacement.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!("context factory override cleared");
    }

    pub fn is_overridden(&self) -> bool {
        self.replacement
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn current(&self) -> Arc<dyn ContextFactory> {
        self.replacement
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl ContextFactory for ContextRegistry {
    fn create(&self) -> Result<DbContext, RepositoryError> {
        // The lock is released before the strategy runs.
        let factory = self.current();
        factory.create()
    }
}
