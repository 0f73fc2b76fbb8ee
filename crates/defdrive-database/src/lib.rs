//! # defdrive-database
//!
//! Metadata persistence for DefDrive: the store traits consumed by the
//! service layer, their PostgreSQL implementations, and a process-local
//! in-memory backend with the same compare-and-save guarantees.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{AccessStore, CasOutcome, FileStore, StoreHealth, Stores, UserStore};
