//! Core error types for ssh-tunnels

use std::path::PathBuf;
use thiserror::Error;

use crate::validate::ValidationErrors;

/// Top-level error type for tunnel setup and supervision
#[derive(Error, Debug)]
pub enum TunnelError {
    /// Tunnel properties failed validation
    #[error("Invalid tunnel parameters:\n{0}")]
    Invalid(ValidationErrors),

    /// Model construction error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Key material error
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Process spawn or runtime error
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Registry bookkeeping error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reference resolution error
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationErrors> for TunnelError {
    fn from(errors: ValidationErrors) -> Self {
        TunnelError::Invalid(errors)
    }
}

/// Errors raised while building or resolving the tunnel model
#[derive(Error, Debug)]
pub enum ModelError {
    /// The part kind was not settled by validation before building
    #[error("missing case: {side} part kind '{value}'")]
    UnsettledPart { side: &'static str, value: String },

    /// A port value could not be interpreted as a port number
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    /// No ephemeral port could be allocated for a part without a port
    #[error("could not determine dynamic local port for {address}: {source}")]
    PortAllocation {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Key material errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// The key name is not known to the key provider
    #[error("SSH Key '{0}' not found")]
    NotFound(String),

    /// The key file configured for a name could not be read
    #[error("Failed to read SSH key '{name}' from {path:?}: {source}")]
    Read {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key file is not a valid OpenSSH private key
    #[error("Failed to parse SSH key '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: ssh_key::Error,
    },

    /// The key could not be written to the build's temp directory
    #[error("Failed to write SSH key '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tunnel process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The ssh process could not be started
    #[error("Failed to spawn {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The ssh process exited during the establishment probe
    #[error("Tunnel via '{connection}' exited during establishment ({status})")]
    EarlyExit { connection: String, status: String },

    /// The ssh process exited on its own with a failure status before teardown
    #[error("Tunnel via '{connection}' terminated abnormally ({status})")]
    AbnormalExit { connection: String, status: String },
}

/// Build registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The build identity already has registry entries
    #[error("Build already registered: {0}")]
    AlreadyRegistered(String),
}

/// Deferred reference resolution errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReferenceError {
    /// A reference names a parameter that has no value
    #[error("Unresolved reference: %{0}%")]
    Unresolved(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
