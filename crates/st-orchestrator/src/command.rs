//! `ssh` command line synthesis

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use st_core::Connection;
use tokio::process::Command;

use crate::askpass::{SSH_ASKPASS, SSH_ASKPASS_REQUIRE};

/// One `ssh -N` invocation forwarding every tunnel of a connection
#[derive(Debug, Clone)]
pub struct SshCommand {
    executable: String,
    args: Vec<String>,
    askpass: Option<PathBuf>,
}

impl SshCommand {
    /// `<ssh> -N -L <fwd>.. -p <port> -l <user> -i <key file> <host>`
    pub fn new(
        executable: impl Into<String>,
        connection: &Connection,
        key_file: &Path,
        forwards: &[String],
    ) -> Self {
        let mut args = Vec::with_capacity(forwards.len() * 2 + 8);
        args.push("-N".to_string());
        for forward in forwards {
            args.push("-L".to_string());
            args.push(forward.clone());
        }
        args.extend([
            "-p".to_string(),
            connection.port().to_string(),
            "-l".to_string(),
            connection.user().to_string(),
            "-i".to_string(),
            key_file.to_string_lossy().into_owned(),
            connection.host().to_string(),
        ]);

        Self {
            executable: executable.into(),
            args,
            askpass: None,
        }
    }

    /// Supply the key passphrase through an askpass script
    pub fn with_askpass(mut self, script: PathBuf) -> Self {
        self.askpass = Some(script);
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn askpass(&self) -> Option<&Path> {
        self.askpass.as_deref()
    }

    /// Process builder running in `working_dir` with output captured to files
    pub fn to_command(&self, working_dir: &Path, stdout: File, stderr: File) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        if let Some(script) = &self.askpass {
            command
                .env(SSH_ASKPASS, script)
                .env(SSH_ASKPASS_REQUIRE, "force");
            // OpenSSH before 8.4 ignores SSH_ASKPASS without a display
            if std::env::var_os("DISPLAY").is_none() {
                command.env("DISPLAY", ":0");
            }
        }
        command
    }
}

impl fmt::Display for SshCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
