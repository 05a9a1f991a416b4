//! SSH login target

use std::collections::BTreeMap;
use std::fmt;

/// Default SSH port used when none is configured
pub const DEFAULT_SSH_PORT: &str = "22";

/// The SSH login target used to reach the remote network
///
/// Two tunnels with equal connections share one `ssh` process.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    user: String,
    ssh_key: String,
    ssh_key_passphrase: Option<String>,
    host: String,
    port: String,
}

impl Connection {
    /// Create a connection, defaulting a blank port to 22
    ///
    /// An empty passphrase is treated as no passphrase.
    pub fn new(
        user: impl Into<String>,
        ssh_key: impl Into<String>,
        ssh_key_passphrase: Option<String>,
        host: impl Into<String>,
        port: Option<String>,
    ) -> Self {
        let port = port
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SSH_PORT.to_string());
        Self {
            user: user.into(),
            ssh_key: ssh_key.into(),
            ssh_key_passphrase: ssh_key_passphrase.filter(|p| !p.is_empty()),
            host: host.into(),
            port,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Name of the key identifying the user
    pub fn ssh_key(&self) -> &str {
        &self.ssh_key
    }

    pub fn ssh_key_passphrase(&self) -> Option<&str> {
        self.ssh_key_passphrase.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Configuration parameters under `prefix`; the passphrase is never published
    pub fn config_parameters(&self, prefix: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (format!("{prefix}user"), self.user.clone()),
            (format!("{prefix}sshKey"), self.ssh_key.clone()),
            (format!("{prefix}host"), self.host.clone()),
            (format!("{prefix}port"), self.port.clone()),
        ])
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("user", &self.user)
            .field("ssh_key", &self.ssh_key)
            .field(
                "ssh_key_passphrase",
                &self.ssh_key_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
