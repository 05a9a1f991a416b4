//! Tunnel model

use std::collections::BTreeMap;
use std::fmt;

use super::{Connection, Part};
use crate::error::ModelError;
use crate::params::{sanitize_name, PARAMETER_PREFIX};

/// One local-port-forward over one connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tunnel {
    name: String,
    connection: Connection,
    local_part: Part,
    remote_part: Part,
}

impl Tunnel {
    /// Create a tunnel; a missing local part defaults to a dynamic local port
    pub fn new(
        name: impl Into<String>,
        connection: Connection,
        local_part: Option<Part>,
        remote_part: Part,
    ) -> Self {
        Self {
            name: name.into(),
            connection,
            local_part: local_part.unwrap_or_default(),
            remote_part,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn local_part(&self) -> &Part {
        &self.local_part
    }

    pub fn remote_part(&self) -> &Part {
        &self.remote_part
    }

    /// The `-L` argument, `<local>:<remote>`
    pub fn forward_spec(&self) -> Result<String, ModelError> {
        Ok(format!(
            "{}:{}",
            self.local_part.forward_spec()?,
            self.remote_part.forward_spec()?
        ))
    }

    /// Prefix of this tunnel's published parameters, `sshTunnel.<name>.`
    pub fn parameter_prefix(&self) -> String {
        format!("{}.{}.", PARAMETER_PREFIX, sanitize_name(&self.name))
    }

    /// All `sshTunnel.<name>.{connection,local,remote}.*` parameters
    pub fn config_parameters(
        &self,
        emulation: bool,
    ) -> Result<BTreeMap<String, String>, ModelError> {
        let prefix = self.parameter_prefix();
        let mut result = self
            .connection
            .config_parameters(&format!("{prefix}connection."));
        result.extend(
            self.local_part
                .config_parameters(&format!("{prefix}local."), emulation)?,
        );
        result.extend(
            self.remote_part
                .config_parameters(&format!("{prefix}remote."), emulation)?,
        );
        Ok(result)
    }
}

impl fmt::Display for Tunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:#}:{:#}", self.local_part, self.remote_part)
        } else {
            write!(
                f,
                "Open an SSH tunnel via '{}' identified by key '{}' from '{}' to '{}' with name '{}'",
                self.connection,
                self.connection.ssh_key(),
                self.local_part,
                self.remote_part,
                self.name
            )
        }
    }
}
