//! Domain layer for the Study Groups backend.
//!
//! This crate contains:
//! - Domain models (User, Group, StudySession, ranking entries)
//! - Backend ports and an in-memory implementation of them
//! - Business logic services (timer, session recording, ranking, membership, accounts)
//! - Domain error types

pub mod error;
pub mod models;
pub mod ports;
pub mod services;

pub use error::{BackendError, DomainError};
