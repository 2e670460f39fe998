//! Core types for Warden
//!
//! Shared between the directory protocol crate and the service embedding it:
//! the immutable directory configuration, the resolved-identity struct and
//! the authentication failure taxonomy.

pub mod config;
pub mod error;
pub mod user;

pub use config::{DirectoryConfig, RoleMapping, TransportMode};
pub use error::{AuthError, Result, TransportKind};
pub use user::AuthenticatedUser;
