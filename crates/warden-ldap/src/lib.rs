//! Directory authentication for Warden
//!
//! Authenticates a username/password pair against one or more LDAP
//! servers, resolves group memberships, and maps them to an application
//! role:
//! - LDAPS, STARTTLS and plaintext transports, with optional custom trust
//!   anchors and mutual TLS
//! - multi-server failover on transport errors
//! - attribute-mode and search-mode group resolution
//! - ordered, first-match-wins group-to-role mappings
//!
//! The blocking protocol work is isolated on worker threads behind a small
//! admission gate, so the embedding service's event loop never stalls on a
//! directory server.

pub mod authenticator;
pub mod client;
pub mod dn;
pub mod entry;
pub mod roles;
pub mod transport;

pub use authenticator::{Authenticator, ServerHealth};
pub use client::DirectoryClient;
pub use entry::DirEntry;
pub use transport::{BindOutcome, Directory, DirectoryConn, SearchOutcome, SearchScope};

pub use warden_core::{AuthError, AuthenticatedUser, DirectoryConfig, RoleMapping, TransportMode};
