//! Access-link domain entities.

pub mod model;

pub use model::{AccessRecord, CreateAccess, parse_expiry};
