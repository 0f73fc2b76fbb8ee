//! PostgreSQL repository implementations of the store traits.

pub mod access;
pub mod file;
pub mod user;

pub use access::AccessRepository;
pub use file::FileRepository;
pub use user::UserRepository;

use defdrive_core::error::{AppError, ErrorKind};

/// Map an INSERT failure, turning constraint violations into client errors.
pub(crate) fn map_insert_error(err: sqlx::Error, entity: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::conflict(format!("{entity} already exists"));
        }
        if db.is_foreign_key_violation() {
            return AppError::not_found(format!("Referenced row for {entity} not found"));
        }
    }
    AppError::with_source(ErrorKind::Database, format!("Failed to create {entity}"), err)
}
