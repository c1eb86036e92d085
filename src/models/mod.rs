//! Core data models for the bucket gateway.
//!
//! These entities map cleanly to database tables via `sqlx::FromRow` and
//! serialize as JSON via `serde`. Internal ids, stored file paths and secret
//! hashes are skipped during serialization so they never leave the process.

pub mod access_key;
pub mod bucket;
pub mod object;
