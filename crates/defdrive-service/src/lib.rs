//! # defdrive-service
//!
//! Business logic for DefDrive. The `link` module holds the access-link
//! authorization engine: a pure restriction evaluator, the committer that
//! persists admission side effects with compare-and-save, and the resolver
//! that drives one public link request end to end. The remaining modules
//! are the owner-facing CRUD services.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod access;
pub mod context;
pub mod file;
pub mod link;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{AccessService, AccessSettings, CreatedAccess};
pub use context::RequestContext;
pub use file::{FileService, UploadRequest};
pub use link::{
    Caller, Decision, DenyReason, LinkOutcome, LinkRequest, LinkService, MutationCommitter,
    Mutations, ServedFile, StoreGuard, evaluate,
};
pub use user::{LoginResult, SignupRequest, UserService};
