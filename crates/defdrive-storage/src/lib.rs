//! # defdrive-storage
//!
//! Blob storage for uploaded files. Only the local filesystem provider is
//! implemented; callers depend on [`StorageProvider`] so others can be added.

pub mod mime;
pub mod providers;

pub use defdrive_core::traits::storage::{ByteStream, StorageProvider, WrittenObject};
pub use providers::local::LocalStorageProvider;
