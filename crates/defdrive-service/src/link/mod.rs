//! Access-link authorization engine.

pub mod committer;
pub mod evaluator;
pub mod guard;
pub mod resolver;
pub mod token;

pub use committer::{CommitOutcome, MutationCommitter};
pub use evaluator::{Caller, Decision, DenyReason, LinkRequest, Mutations, evaluate};
pub use guard::StoreGuard;
pub use resolver::{LinkOutcome, LinkService, ServedFile};
