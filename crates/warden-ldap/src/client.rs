//! Directory client operations
//!
//! Issues the bind and search operations one authentication attempt needs
//! against connections produced by the transport. Usernames and any other
//! caller-supplied values are escaped before they reach a filter template.

use ldap3::ldap_escape;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::{AuthError, DirectoryConfig, Result, TransportKind};

use crate::entry::DirEntry;
use crate::transport::{BindOutcome, Directory, DirectoryConn, SearchScope};

/// "No attributes" selector per RFC 4511.
const NO_ATTRS: &str = "1.1";

pub struct DirectoryClient {
    config: Arc<DirectoryConfig>,
    directory: Arc<dyn Directory>,
}

impl DirectoryClient {
    pub fn new(config: Arc<DirectoryConfig>, directory: Arc<dyn Directory>) -> Self {
        Self { config, directory }
    }

    /// Connect to `host` and bind with the service account, or anonymously
    /// when none is configured. The connection is closed before an error
    /// propagates.
    pub fn open_bound(&self, host: &str) -> Result<Box<dyn DirectoryConn>> {
        let mut conn = self.directory.connect(host)?;

        let (dn, password) = match (&self.config.bind_dn, &self.config.bind_password) {
            (Some(dn), Some(password)) => (dn.as_str(), password.as_str()),
            _ => ("", ""),
        };

        match conn.simple_bind(dn, password) {
            Ok(BindOutcome::Success) => Ok(conn),
            Ok(BindOutcome::InvalidCredentials) => {
                // A rejected service account is a per-server problem, not a
                // statement about the end user's credentials.
                conn.unbind();
                warn!(%host, "service account bind rejected");
                Err(AuthError::Transport(TransportKind::Bind))
            }
            Err(e) => {
                conn.unbind();
                Err(e)
            }
        }
    }

    /// Locate the user entry, iterating the configured bases in order.
    ///
    /// The first base yielding exactly one match wins; more than one match
    /// at any base fails closed as ambiguous, because replica result
    /// ordering is not stable enough to justify picking the first entry.
    pub fn search_user(&self, conn: &mut dyn DirectoryConn, username: &str) -> Result<DirEntry> {
        let filter = self.config.build_user_filter(&ldap_escape(username));
        let attrs = self.request_attrs();

        for base in &self.config.user_search_bases {
            let outcome = conn.search(base, SearchScope::Subtree, &filter, &attrs)?;
            let mut entries = outcome.entries;
            match entries.len() {
                0 => continue,
                1 => {
                    debug!(%base, "user entry located");
                    return Ok(entries.remove(0));
                }
                n => {
                    warn!(%base, matches = n, "user search returned multiple entries");
                    return Err(AuthError::AmbiguousUser);
                }
            }
        }

        Err(AuthError::UserNotFound)
    }

    /// Verify a password by binding as the user on a fresh connection,
    /// independent of the service-bound one.
    ///
    /// Returns `false` only for a credential rejection; transport and
    /// protocol failures propagate so they can drive failover.
    pub fn verify_password(&self, host: &str, user_dn: &str, password: &str) -> Result<bool> {
        let mut conn = self.directory.connect(host)?;
        let outcome = conn.simple_bind(user_dn, password);
        conn.unbind();

        match outcome? {
            BindOutcome::Success => Ok(true),
            BindOutcome::InvalidCredentials => Ok(false),
        }
    }

    /// Resolve the user's group DNs.
    ///
    /// Attribute mode reads the membership attribute off the entry; search
    /// mode runs the configured group filter over the group bases, filling
    /// the placeholder from the login username or a configured attribute.
    pub fn resolve_groups(
        &self,
        conn: &mut dyn DirectoryConn,
        entry: &DirEntry,
        username: &str,
    ) -> Result<Vec<String>> {
        if !self.config.group_search_mode() {
            return Ok(entry.multi(&self.config.group_attr).to_vec());
        }

        let value = match &self.config.group_filter_user_attr {
            Some(attr) => entry
                .scalar(attr)
                .ok_or_else(|| AuthError::MissingRequiredAttribute(attr.clone()))?,
            None => username,
        };

        let filter = match self.config.build_group_filter(&ldap_escape(value)) {
            Some(filter) => filter,
            None => return Ok(Vec::new()),
        };

        let attrs = vec![NO_ATTRS.to_string()];
        let mut groups: Vec<String> = Vec::new();
        for base in &self.config.group_search_bases {
            let outcome = conn.search(base, SearchScope::Subtree, &filter, &attrs)?;
            if outcome.truncated {
                warn!(
                    %base,
                    "group search truncated at server size limit; role mapping may be incomplete"
                );
            }
            for found in outcome.entries {
                if !groups.contains(&found.dn) {
                    groups.push(found.dn);
                }
            }
        }

        debug!(count = groups.len(), "groups resolved");
        Ok(groups)
    }

    fn request_attrs(&self) -> Vec<String> {
        let mut attrs = vec![
            self.config.display_name_attr.clone(),
            self.config.group_attr.clone(),
        ];
        if let Some(attr) = &self.config.email_attr {
            attrs.push(attr.clone());
        }
        if let Some(attr) = &self.config.unique_id_attr {
            attrs.push(attr.clone());
        }
        if let Some(attr) = &self.config.group_filter_user_attr {
            attrs.push(attr.clone());
        }
        attrs
    }
}
