//! Query and pool metrics for the PostgreSQL backend.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Exports pool size, idle and active connection gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_total").set(size as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
}

/// Measures one query and records it under `database_query_duration_seconds`
/// with a `query` label.
///
/// ```ignore
/// let timer = QueryTimer::new("find_user_by_id");
/// let row = sqlx::query_as::<_, UserEntity>(SQL).fetch_optional(&pool).await;
/// timer.record();
/// ```
#[derive(Debug)]
pub struct QueryTimer {
    query: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            started: Instant::now(),
        }
    }

    pub fn query(&self) -> &'static str {
        self.query
    }

    pub fn record(self) {
        histogram!("database_query_duration_seconds", "query" => self.query)
            .record(self.started.elapsed().as_secs_f64());
    }
}
