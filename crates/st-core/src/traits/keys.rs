//! Key material and executable collaborators

use std::path::{Path, PathBuf};

use crate::error::KeyError;

/// Read-only view of the known SSH keys, used by validation
pub trait KeyStore: Send + Sync {
    /// Whether a key with this name exists
    fn is_valid_key_name(&self, name: &str) -> bool;

    /// Whether the named key is protected by a passphrase
    ///
    /// Fails when the key cannot be inspected.
    fn is_encrypted(&self, name: &str) -> Result<bool, KeyError>;
}

/// Writes private key material for the tunnel processes
pub trait KeyProvider: KeyStore {
    /// Write the named key into `destination_dir` and return the file path
    fn materialize(&self, name: &str, destination_dir: &Path) -> Result<PathBuf, KeyError>;
}

/// Yields the path of an `ssh` compatible executable
pub trait ExecutableResolver: Send + Sync {
    fn resolve(&self) -> String;
}
