//! Persistence layer for the Study Groups backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repositories implementing the domain backend ports
//! - SQL migrations (`src/migrations`)

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

use std::sync::Arc;

use domain::ports::Backend;
use sqlx::PgPool;

use repositories::{
    AuthRepository, GroupRepository, PoolHealthProbe, StudySessionRepository, UserRepository,
};

/// Builds a [`Backend`] whose ports are served by PostgreSQL.
pub fn postgres_backend(pool: PgPool) -> Backend {
    Backend {
        users: Arc::new(UserRepository::new(pool.clone())),
        groups: Arc::new(GroupRepository::new(pool.clone())),
        sessions: Arc::new(StudySessionRepository::new(pool.clone())),
        auth: Arc::new(AuthRepository::new(pool.clone())),
        health: Arc::new(PoolHealthProbe::new(pool)),
    }
}
