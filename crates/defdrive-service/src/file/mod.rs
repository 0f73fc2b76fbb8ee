//! File upload and management.

pub mod service;

pub use service::{FileService, UploadRequest};
