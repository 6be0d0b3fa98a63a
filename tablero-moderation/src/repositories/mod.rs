mod reports;
mod sanctions;

pub use reports::ReportRepository;
pub use sanctions::SanctionRepository;

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
