//! Background jobs.

mod auth_events;
mod backend_health;
mod runner;

pub use auth_events::listen_auth_events;
pub use backend_health::{probe_backend, BACKEND_PROBE_INTERVAL};
pub use runner::{shutdown_requested, JobRunner};
