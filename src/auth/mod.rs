//! Authentication and authorization.
//!
//! - [`role`]: the ordered permission tiers and the admission rule
//! - [`secret`]: secret hashing, constant-time comparison and key generation
//! - [`gate`]: credential parsing, verification and bucket scoping
//! - [`extract`]: the `Authorized<L>` axum extractor that runs the gate per request

pub mod extract;
pub mod gate;
pub mod role;
pub mod secret;

pub use extract::{Authorized, FullAccess, Open, ReadOnly, ReadWrite};
pub use role::Role;
