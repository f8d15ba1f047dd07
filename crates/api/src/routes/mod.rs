pub mod auth;
pub mod groups;
pub mod health;
pub mod study_sessions;
pub mod users;
