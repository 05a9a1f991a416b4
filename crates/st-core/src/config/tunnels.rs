//! Tunnel configuration file

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ReferenceError;
use crate::keys::KeyRing;
use crate::params::Properties;
use crate::reference::{env_lookup, resolve_references};
use crate::ssh::SshExecutable;

/// How long a fresh `ssh` process must survive to count as established
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Configuration of the `ssh-tunnels` host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelsConfig {
    /// Path to the `ssh` executable
    pub ssh_executable: Option<String>,

    /// Parent directory for per-build temp directories
    pub temp_dir: Option<PathBuf>,

    /// Establishment liveness probe, in milliseconds
    #[serde(with = "super::serde_utils::duration_millis")]
    pub probe_timeout: Duration,

    /// Values for `%name%` references
    pub parameters: BTreeMap<String, String>,

    /// Known SSH keys by name
    pub keys: BTreeMap<String, KeyConfig>,

    /// One flat property map per tunnel
    pub tunnel: Vec<Properties>,
}

impl Default for TunnelsConfig {
    fn default() -> Self {
        Self {
            ssh_executable: None,
            temp_dir: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            parameters: BTreeMap::new(),
            keys: BTreeMap::new(),
            tunnel: Vec::new(),
        }
    }
}

impl TunnelsConfig {
    /// The key ring described by the `keys` table
    pub fn key_ring(&self) -> KeyRing {
        KeyRing::from_config(&self.keys)
    }

    /// The `ssh` executable resolver
    pub fn executable(&self) -> SshExecutable {
        SshExecutable::new(self.ssh_executable.clone())
    }

    /// Parent directory for build temp directories
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Value of a reference: the `parameters` table first, then `env.<VAR>`
    pub fn lookup(&self, name: &str) -> Option<String> {
        self.parameters
            .get(name)
            .cloned()
            .or_else(|| env_lookup(name))
    }

    /// Tunnel property maps with every reference substituted
    pub fn resolved_tunnels(&self) -> Result<Vec<Properties>, ReferenceError> {
        self.tunnel
            .iter()
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, value)| {
                        let value = resolve_references(value, |r| self.lookup(r))?;
                        Ok::<_, ReferenceError>((name.clone(), value))
                    })
                    .collect()
            })
            .collect()
    }
}

/// One entry of the `keys` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Private key file; `~` expands to the home directory
    pub path: PathBuf,

    /// Whether the key needs a passphrase; detected from the file when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
}
