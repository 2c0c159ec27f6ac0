//! `keystone-auth`: user accounts and session tokens.
//!
//! No HTTP or storage code lives here. The crate owns the
//! record shapes persisted by the store and the rules applied to them.

pub mod token;
pub mod user;

pub use token::{TOKEN_TTL, Token, TokenError};
pub use user::{PublicUser, Signup, User, UserUpdate};
