//! User domain entities.

pub mod model;

pub use model::{CreateUser, DEFAULT_MAX_FILES, DEFAULT_MAX_STORAGE_BYTES, User};
