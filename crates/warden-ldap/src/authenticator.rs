//! Authentication orchestrator
//!
//! Drives the end-to-end flow: input validation, admission control, server
//! failover, the user search/verify/groups/role sequence, and the
//! timing-parity bind for unknown usernames.
//!
//! The directory protocol client is blocking, so each attempt runs on a
//! `spawn_blocking` worker behind a small semaphore. The overall deadline
//! bounds what the caller waits for; a worker past the deadline keeps
//! running until its own per-operation timeout fires, holding its admission
//! slot the whole time.

use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::{AuthError, AuthenticatedUser, DirectoryConfig, Result, TransportMode};

use crate::client::DirectoryClient;
use crate::roles;
use crate::transport::{Directory, DirectoryConn, LdapDirectory, SearchScope};

/// Caps on credential sizes; anything beyond is rejected before any
/// network traffic.
const MAX_USERNAME_BYTES: usize = 256;
const MAX_PASSWORD_BYTES: usize = 1024;

/// Per-host health as reported by [`Authenticator::test_connection`].
#[derive(Debug, Clone)]
pub struct ServerHealth {
    pub host: String,
    pub healthy: bool,
}

/// The authentication entry point owned by the service.
///
/// Explicitly constructed at startup and dependency-injected into the
/// request layer; there is no ambient global state. Cloning is cheap and
/// shares the admission gate.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Inner>,
    gate: Arc<Semaphore>,
    overall_timeout: Duration,
}

struct Inner {
    config: Arc<DirectoryConfig>,
    client: DirectoryClient,
}

impl Authenticator {
    /// Build an authenticator over the real LDAP transport.
    pub fn new(config: DirectoryConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid directory configuration: {e}"))?;
        if config.transport == TransportMode::Plaintext {
            warn!("plaintext directory transport configured; credentials will not be encrypted");
        }
        if !config.verify_tls {
            warn!("directory TLS certificate verification is disabled");
        }
        let config = Arc::new(config);
        let directory: Arc<dyn Directory> =
            Arc::new(LdapDirectory::from_config(config.clone())?);
        Ok(Self::with_directory(config, directory))
    }

    /// Build an authenticator over an arbitrary transport. Used by tests
    /// and by embedders that supply their own connection layer.
    pub fn with_directory(config: Arc<DirectoryConfig>, directory: Arc<dyn Directory>) -> Self {
        let gate = Arc::new(Semaphore::new(config.max_concurrent));
        let overall_timeout = config.overall_timeout();
        let client = DirectoryClient::new(config.clone(), directory);
        Self {
            inner: Arc::new(Inner { config, client }),
            gate,
            overall_timeout,
        }
    }

    /// Authenticate a username/password pair.
    ///
    /// Non-blocking for the caller: the protocol work runs on a dedicated
    /// blocking worker. Callers past the concurrency ceiling wait for a
    /// slot rather than being rejected.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthenticatedUser> {
        if username.is_empty() || password.is_empty() {
            // An empty password must never reach a bind: some servers treat
            // it as a successful anonymous bind.
            debug!("rejecting empty credentials");
            return Err(AuthError::InvalidCredentials);
        }
        if username.len() > MAX_USERNAME_BYTES || password.len() > MAX_PASSWORD_BYTES {
            debug!("rejecting oversized credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AuthError::Internal)?;

        let inner = self.inner.clone();
        let username = username.to_string();
        let password = password.to_string();
        let worker = task::spawn_blocking(move || {
            // The permit rides with the worker: an attempt that outlives the
            // caller's deadline still occupies its admission slot.
            let _permit = permit;
            inner.run(&username, &password)
        });

        match time::timeout(self.overall_timeout, worker).await {
            Ok(Ok(result)) => {
                if let Err(e) = &result {
                    info!(kind = e.kind(), "authentication failed");
                }
                result
            }
            Ok(Err(_)) => {
                warn!("authentication worker panicked");
                Err(AuthError::Internal)
            }
            Err(_) => {
                warn!("authentication deadline exceeded; worker runs on until its operation timeout");
                Err(AuthError::Timeout)
            }
        }
    }

    /// Probe every configured host: connect, service bind, root DSE read.
    pub async fn test_connection(&self) -> Vec<ServerHealth> {
        let mut results = Vec::with_capacity(self.inner.config.hosts.len());
        for host in &self.inner.config.hosts {
            let inner = self.inner.clone();
            let probe_host = host.clone();
            let healthy = task::spawn_blocking(move || inner.probe(&probe_host))
                .await
                .unwrap_or(false);
            results.push(ServerHealth {
                host: host.clone(),
                healthy,
            });
        }
        results
    }
}

impl Inner {
    /// Blocking worker body: try servers in randomized order, failing over
    /// only on transport errors.
    fn run(&self, username: &str, password: &str) -> Result<AuthenticatedUser> {
        let mut hosts = self.config.hosts.clone();
        // Randomized per call so load spreads across replicas.
        hosts.shuffle(&mut rand::rng());

        for host in &hosts {
            match self.try_server(host, username, password) {
                Ok(user) => {
                    info!(user = %username, role = %user.role, "authentication succeeded");
                    return Ok(user);
                }
                Err(e) if e.is_failover() => {
                    warn!(%host, kind = e.kind(), "directory server failed, trying next");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AuthError::AllServersExhausted)
    }

    fn try_server(&self, host: &str, username: &str, password: &str) -> Result<AuthenticatedUser> {
        let mut conn = self.client.open_bound(host)?;
        let result = self.authenticate_on(conn.as_mut(), host, username, password);
        conn.unbind();
        result
    }

    fn authenticate_on(
        &self,
        conn: &mut dyn DirectoryConn,
        host: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser> {
        let entry = match self.client.search_user(conn, username) {
            Ok(entry) => entry,
            Err(AuthError::UserNotFound) => {
                // Unknown user and wrong password must cost the same wall
                // clock, or response time enumerates valid usernames. Burn
                // the verification bind an existing user would have caused.
                self.equalizing_bind(host, password);
                return Err(AuthError::UserNotFound);
            }
            Err(e) => return Err(e),
        };

        if !self.client.verify_password(host, &entry.dn, password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let email = match &self.config.email_attr {
            Some(attr) => Some(
                entry
                    .scalar(attr)
                    .ok_or_else(|| AuthError::MissingRequiredAttribute(attr.clone()))?
                    .to_string(),
            ),
            None => None,
        };

        let display_name = entry
            .scalar(&self.config.display_name_attr)
            .unwrap_or(username)
            .to_string();

        let unique_id = match &self.config.unique_id_attr {
            Some(attr) => Some(
                entry
                    .unique_id(attr)
                    .ok_or_else(|| AuthError::MissingRequiredAttribute(attr.clone()))?,
            ),
            None => None,
        };

        let groups = self.client.resolve_groups(conn, &entry, username)?;
        let role =
            roles::map_role(&groups, &self.config.role_mappings).ok_or(AuthError::NoRoleMapping)?;

        Ok(AuthenticatedUser {
            username: username.to_string(),
            user_dn: entry.dn.clone(),
            email,
            display_name,
            groups,
            role,
            unique_id,
        })
    }

    /// Bind against a freshly randomized DN that cannot exist, with the
    /// caller's password, and discard the result.
    fn equalizing_bind(&self, host: &str, password: &str) {
        let dn = format!("uid={},dc=warden-nonexistent", Uuid::new_v4());
        let _ = self.client.verify_password(host, &dn, password);
    }

    fn probe(&self, host: &str) -> bool {
        let mut conn = match self.client.open_bound(host) {
            Ok(conn) => conn,
            Err(_) => return false,
        };
        let root_dse = conn.search(
            "",
            SearchScope::Base,
            "(objectClass=*)",
            &["vendorName".to_string(), "vendorVersion".to_string()],
        );
        conn.unbind();
        root_dse.is_ok()
    }
}
