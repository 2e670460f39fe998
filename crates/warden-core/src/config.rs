//! Directory configuration for Warden
//!
//! The configuration is produced by the service's loader and handed to the
//! authenticator once, immutably. `validate()` is expected to run at load
//! time so misconfiguration surfaces at startup, not on the first login.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the connection to a directory server is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// No encryption. Development and testing only.
    Plaintext,
    /// Connect in plaintext, upgrade via STARTTLS before any bind.
    StartTls,
    /// TLS from the first byte (ldaps://).
    #[default]
    Ldaps,
}

impl TransportMode {
    /// URL scheme for this mode.
    pub fn scheme(&self) -> &'static str {
        match self {
            TransportMode::Ldaps => "ldaps",
            TransportMode::Plaintext | TransportMode::StartTls => "ldap",
        }
    }
}

/// One ordered group-to-role mapping entry.
///
/// `group` is a group DN or the wildcard `"*"`. Entries are evaluated in
/// configured order and the first match wins, so administrators must list
/// the most privileged mappings first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMapping {
    pub group: String,
    pub role: String,
}

/// Directory server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryConfig {
    /// Directory server hostnames, assumed to be identical replicas.
    pub hosts: Vec<String>,

    /// Port shared by all hosts (389 for ldap://, 636 for ldaps://).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport encryption mode.
    #[serde(default)]
    pub transport: TransportMode,

    /// Verify the server certificate. Disabling this is for test setups
    /// and cannot be combined with a custom trust anchor or client
    /// certificate, which always verify.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Custom trust anchor (PEM). When unset the system trust store is used.
    #[serde(default)]
    pub ca_cert_file: Option<PathBuf>,

    /// Client certificate for mutual TLS (PEM). Requires `client_key_file`.
    #[serde(default)]
    pub client_cert_file: Option<PathBuf>,

    /// Client private key for mutual TLS (PEM).
    #[serde(default)]
    pub client_key_file: Option<PathBuf>,

    /// Service account DN. Absent means anonymous bind for the user search.
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Service account password.
    #[serde(default)]
    pub bind_password: Option<String>,

    /// Base DNs searched for the user, in order.
    pub user_search_bases: Vec<String>,

    /// User search filter with a `{username}` placeholder.
    /// Example: "(uid={username})" or "(sAMAccountName={username})"
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Email attribute. When configured, its absence on the located entry is
    /// a hard failure.
    #[serde(default)]
    pub email_attr: Option<String>,

    /// Display name attribute. Falls back to the login username when absent.
    #[serde(default = "default_display_name_attr")]
    pub display_name_attr: String,

    /// Multi-valued group membership attribute (attribute-mode resolution).
    #[serde(default = "default_group_attr")]
    pub group_attr: String,

    /// Unique identifier attribute (e.g. objectGUID or entryUUID). When
    /// configured, its absence on the located entry is a hard failure.
    #[serde(default)]
    pub unique_id_attr: Option<String>,

    /// Group search filter with a `{value}` placeholder. Presence selects
    /// search-mode group resolution over the membership attribute.
    #[serde(default)]
    pub group_filter: Option<String>,

    /// Base DNs for the group search.
    #[serde(default)]
    pub group_search_bases: Vec<String>,

    /// User attribute whose value fills the group filter placeholder.
    /// Unset means the login username is used.
    #[serde(default)]
    pub group_filter_user_attr: Option<String>,

    /// Ordered group-DN-to-role mappings; first match wins.
    #[serde(default)]
    pub role_mappings: Vec<RoleMapping>,

    /// Maximum simultaneous authentication attempts; callers beyond the
    /// limit wait for a slot.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-operation (bind/search) timeout in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Overall deadline in seconds for one authentication call.
    #[serde(default = "default_overall_timeout")]
    pub overall_timeout_secs: u64,
}

fn default_port() -> u16 {
    636
}

fn default_true() -> bool {
    true
}

fn default_user_filter() -> String {
    "(uid={username})".to_string()
}

fn default_display_name_attr() -> String {
    "cn".to_string()
}

fn default_group_attr() -> String {
    "memberOf".to_string()
}

fn default_max_concurrent() -> usize {
    8
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_operation_timeout() -> u64 {
    15
}

fn default_overall_timeout() -> u64 {
    30
}

impl DirectoryConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }

    /// True when group resolution goes through a group search instead of
    /// the membership attribute on the user entry.
    pub fn group_search_mode(&self) -> bool {
        self.group_filter.is_some()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.hosts.is_empty() {
            return Err("at least one directory host is required".to_string());
        }

        if self.hosts.iter().any(|h| h.is_empty()) {
            return Err("directory host must not be empty".to_string());
        }

        if self.user_search_bases.is_empty() {
            return Err("at least one user search base is required".to_string());
        }

        if !self.user_filter.contains("{username}") {
            return Err("user filter must contain the {username} placeholder".to_string());
        }

        if let Some(filter) = &self.group_filter {
            if !filter.contains("{value}") {
                return Err("group filter must contain the {value} placeholder".to_string());
            }
            if self.group_search_bases.is_empty() {
                return Err("group filter requires at least one group search base".to_string());
            }
        }

        if self.bind_dn.is_some() != self.bind_password.is_some() {
            return Err("bind_dn and bind_password must be set together".to_string());
        }

        if self.client_cert_file.is_some() != self.client_key_file.is_some() {
            return Err("client_cert_file and client_key_file must be set together".to_string());
        }

        // A custom trust anchor or client certificate installs a TLS
        // configuration that always verifies the server, so a disabled
        // verify_tls would be silently ignored.
        if !self.verify_tls && (self.ca_cert_file.is_some() || self.client_cert_file.is_some()) {
            return Err(
                "verify_tls = false cannot be combined with ca_cert_file or a client certificate"
                    .to_string(),
            );
        }

        if self.max_concurrent == 0 {
            return Err("max_concurrent must be at least 1".to_string());
        }

        if self.connect_timeout_secs == 0
            || self.operation_timeout_secs == 0
            || self.overall_timeout_secs == 0
        {
            return Err("timeouts must be non-zero".to_string());
        }

        if self.connect_timeout_secs > self.operation_timeout_secs
            || self.operation_timeout_secs > self.overall_timeout_secs
        {
            return Err(
                "timeouts must be ordered: connect <= operation <= overall".to_string(),
            );
        }

        Ok(())
    }

    /// Build the user search filter for an already-escaped username.
    pub fn build_user_filter(&self, escaped_username: &str) -> String {
        self.user_filter.replace("{username}", escaped_username)
    }

    /// Build the group search filter for an already-escaped value.
    pub fn build_group_filter(&self, escaped_value: &str) -> Option<String> {
        self.group_filter
            .as_ref()
            .map(|f| f.replace("{value}", escaped_value))
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            port: default_port(),
            transport: TransportMode::default(),
            verify_tls: true,
            ca_cert_file: None,
            client_cert_file: None,
            client_key_file: None,
            bind_dn: None,
            bind_password: None,
            user_search_bases: Vec::new(),
            user_filter: default_user_filter(),
            email_attr: None,
            display_name_attr: default_display_name_attr(),
            group_attr: default_group_attr(),
            unique_id_attr: None,
            group_filter: None,
            group_search_bases: Vec::new(),
            group_filter_user_attr: None,
            role_mappings: Vec::new(),
            max_concurrent: default_max_concurrent(),
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_secs: default_operation_timeout(),
            overall_timeout_secs: default_overall_timeout(),
        }
    }
}
