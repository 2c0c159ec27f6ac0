//! `keystone-core`: building blocks shared by every other crate.
//!
//! This crate contains **pure** primitives (no I/O): password hashing,
//! token identifiers and the domain error model.

pub mod error;
pub mod hashing;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use hashing::{HashedPassword, PasswordHasher};
pub use id::{TOKEN_ID_LEN, TokenId};
