//! Error types for Warden
//!
//! Every internal failure is converted to one of these kinds before it
//! leaves the subsystem. The textual payload of protocol-library errors is
//! never carried here: logs and callers only ever see the category, so
//! server addresses or DNs embedded in library messages cannot leak.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Category of a per-server transport/protocol failure.
///
/// Only the category is retained; the originating error's message is
/// deliberately discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// TCP connect or TLS handshake (including STARTTLS upgrade) failed.
    Connect,
    /// A bind request could not be completed.
    Bind,
    /// A search request could not be completed.
    Search,
    /// The server answered with an unexpected result code.
    Protocol,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportKind::Connect => "connect",
            TransportKind::Bind => "bind",
            TransportKind::Search => "search",
            TransportKind::Protocol => "protocol",
        };
        f.write_str(s)
    }
}

/// Authentication failure taxonomy.
///
/// Only `Transport` participates in server failover; every other kind is
/// terminal for the whole authentication attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("directory server failure ({0})")]
    Transport(TransportKind),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("ambiguous user match")]
    AmbiguousUser,

    #[error("configured attribute missing on entry: {0}")]
    MissingRequiredAttribute(String),

    #[error("no role mapping matched")]
    NoRoleMapping,

    #[error("authentication deadline exceeded")]
    Timeout,

    #[error("all directory servers exhausted")]
    AllServersExhausted,

    #[error("internal error")]
    Internal,
}

impl AuthError {
    /// Stable label for structured logs and operator alerting.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Transport(_) => "transport",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UserNotFound => "user_not_found",
            AuthError::AmbiguousUser => "ambiguous_user",
            AuthError::MissingRequiredAttribute(_) => "missing_required_attribute",
            AuthError::NoRoleMapping => "no_role_mapping",
            AuthError::Timeout => "timeout",
            AuthError::AllServersExhausted => "all_servers_exhausted",
            AuthError::Internal => "internal",
        }
    }

    /// True when the failure should be retried against the next server.
    pub fn is_failover(&self) -> bool {
        matches!(self, AuthError::Transport(_))
    }

    /// The uniform end-user message. Every kind maps to the same string so
    /// response content cannot be used to probe the directory.
    pub fn user_message(&self) -> &'static str {
        "authentication failed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failover_only_for_transport() {
        assert!(AuthError::Transport(TransportKind::Connect).is_failover());
        assert!(!AuthError::InvalidCredentials.is_failover());
        assert!(!AuthError::UserNotFound.is_failover());
        assert!(!AuthError::AmbiguousUser.is_failover());
        assert!(!AuthError::NoRoleMapping.is_failover());
        assert!(!AuthError::Timeout.is_failover());
    }

    #[test]
    fn test_uniform_user_message() {
        let errors = [
            AuthError::InvalidCredentials,
            AuthError::UserNotFound,
            AuthError::Timeout,
            AuthError::MissingRequiredAttribute("mail".into()),
        ];
        for e in &errors {
            assert_eq!(e.user_message(), "authentication failed");
        }
    }

    #[test]
    fn test_kind_labels_are_distinct() {
        let labels = [
            AuthError::Transport(TransportKind::Bind).kind(),
            AuthError::InvalidCredentials.kind(),
            AuthError::UserNotFound.kind(),
            AuthError::AmbiguousUser.kind(),
            AuthError::NoRoleMapping.kind(),
            AuthError::Timeout.kind(),
            AuthError::AllServersExhausted.kind(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
