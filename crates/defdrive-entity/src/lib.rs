//! # defdrive-entity
//!
//! Domain entity models for DefDrive. Every struct in this crate
//! represents a database table row or the data needed to insert one.
//! Row types derive `sqlx::FromRow`.

pub mod access;
pub mod file;
pub mod user;
