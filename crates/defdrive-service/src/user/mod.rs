//! User registration and login.

pub mod service;

pub use service::{LoginResult, SignupRequest, UserService};
