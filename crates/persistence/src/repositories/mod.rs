//! Repository implementations for database operations.
//!
//! Each repository implements one backend port from `domain::ports`.

pub mod auth;
pub mod group;
pub mod health;
pub mod study_session;
pub mod user;

pub use auth::AuthRepository;
pub use group::GroupRepository;
pub use health::PoolHealthProbe;
pub use study_session::StudySessionRepository;
pub use user::UserRepository;
