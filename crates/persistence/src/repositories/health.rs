//! Database liveness probe.

use async_trait::async_trait;
use domain::ports::HealthProbe;
use domain::BackendError;
use sqlx::PgPool;

use crate::error::backend_error;
use crate::metrics::{record_pool_metrics, QueryTimer};

#[derive(Clone)]
pub struct PoolHealthProbe {
    pool: PgPool,
}

impl PoolHealthProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for PoolHealthProbe {
    async fn ping(&self) -> Result<(), BackendError> {
        let timer = QueryTimer::new("health_check");
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        timer.record();
        record_pool_metrics(&self.pool);
        result.map(|_| ()).map_err(backend_error)
    }
}
