//! Resolved identity handed to the caller on successful authentication.

use serde::{Deserialize, Serialize};

/// The outcome of a successful authentication.
///
/// Created once per login and handed straight to the session layer; nothing
/// here is retained by the subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// The username as supplied at login.
    pub username: String,

    /// The entry's DN. For audit logs only, never for identity matching.
    pub user_dn: String,

    /// Email, when an email attribute is configured.
    pub email: Option<String>,

    /// Display name; falls back to the username.
    pub display_name: String,

    /// Raw group DNs in directory order.
    pub groups: Vec<String>,

    /// The resolved application role.
    pub role: String,

    /// Stable unique identifier, when configured (e.g. objectGUID).
    pub unique_id: Option<String>,
}
