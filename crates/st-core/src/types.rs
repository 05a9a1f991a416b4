//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque identity of one build
///
/// Identities are never reused while an orchestrator lives; use
/// [`BuildId::generate`] for every new build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(pub String);

impl BuildId {
    /// Create a build ID from a host-provided identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh, globally unique build ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().as_hyphenated().to_string())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BuildId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BuildId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Tunnel lifecycle state of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    /// Tunnel specs computed, no processes yet
    Registered,
    /// Tunnel processes are being started
    Establishing,
    /// Establishment finished, zero or more processes alive
    Running,
    /// Tunnel processes are being terminated
    TearingDown,
    /// All processes reaped and temp files removed
    Closed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Registered => write!(f, "registered"),
            BuildState::Establishing => write!(f, "establishing"),
            BuildState::Running => write!(f, "running"),
            BuildState::TearingDown => write!(f, "tearing down"),
            BuildState::Closed => write!(f, "closed"),
        }
    }
}

/// What the orchestrator needs to know about a running build
#[derive(Debug, Clone)]
pub struct Build {
    /// Build identity
    pub id: BuildId,
    /// Build-private temporary directory for key files and captures
    pub temp_dir: PathBuf,
    /// Resolved path of the ssh executable
    pub ssh_executable: String,
}

impl Build {
    /// Describe a build with a freshly generated identity
    pub fn new(temp_dir: impl Into<PathBuf>, ssh_executable: impl Into<String>) -> Self {
        Self {
            id: BuildId::generate(),
            temp_dir: temp_dir.into(),
            ssh_executable: ssh_executable.into(),
        }
    }
}
