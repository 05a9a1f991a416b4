//! `ssh` executable resolution

use crate::traits::ExecutableResolver;

/// Environment variable overriding the `ssh` executable
pub const SSH_EXECUTABLE_ENV: &str = "SSH_EXECUTABLE";

/// Executable used when nothing else is configured, looked up on `PATH`
pub const DEFAULT_SSH_EXECUTABLE: &str = "ssh";

/// Resolves the configured path, then `SSH_EXECUTABLE`, then plain `ssh`
#[derive(Debug, Clone, Default)]
pub struct SshExecutable {
    configured: Option<String>,
}

impl SshExecutable {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured.filter(|p| !p.trim().is_empty()),
        }
    }
}

impl ExecutableResolver for SshExecutable {
    fn resolve(&self) -> String {
        if let Some(path) = &self.configured {
            return path.clone();
        }
        match std::env::var(SSH_EXECUTABLE_ENV) {
            Ok(path) if !path.trim().is_empty() => path,
            _ => DEFAULT_SSH_EXECUTABLE.to_string(),
        }
    }
}
