//! Core traits defined in `defdrive-core` and implemented by other crates.

pub mod storage;

pub use storage::{ByteStream, StorageProvider, WrittenObject};
