//! Mapping of sqlx errors onto backend port errors.

use domain::BackendError;
use tracing::error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Converts a sqlx error into the port error reported to services.
pub fn backend_error(err: sqlx::Error) -> BackendError {
    if let Some(db_err) = err.as_database_error() {
        let constraint = db_err.constraint().unwrap_or("record").to_string();
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return BackendError::Duplicate(constraint),
            Some(FOREIGN_KEY_VIOLATION) => return BackendError::MissingReference(constraint),
            _ => {}
        }
    }
    error!(error = %err, "Database error");
    BackendError::Unavailable(err.to_string())
}
