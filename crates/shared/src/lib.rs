//! Shared utilities for the Study Groups backend.
//!
//! This crate provides functionality used across the other crates:
//! - Password hashing with Argon2id
//! - Access token issuing and validation
//! - Common validation logic

pub mod jwt;
pub mod password;
pub mod validation;
