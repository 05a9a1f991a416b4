//! Tunnel process orchestration
//!
//! A build goes through `register_build` (tunnels computed, parameters
//! published), `establish` (one `ssh` process per distinct connection) and
//! `teardown` (processes reaped, temp files deleted). Failures never escape
//! as panics; they are reported to the build's [`BuildReporter`] together
//! with a stop request, and teardown still runs to completion.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use st_core::config::DEFAULT_PROBE_TIMEOUT;
use st_core::error::{ModelError, ProcessError};
use st_core::traits::{Activity, BuildReporter, KeyProvider};
use st_core::{Build, BuildId, BuildState, Connection, Tunnel, TunnelError};

use crate::askpass;
use crate::command::SshCommand;
use crate::registry::{BuildRegistry, ProcessId, TunnelProcess};

pub const ESTABLISHING_ACTIVITY: &str = "Establishing SSH Tunnels";
pub const TERMINATING_ACTIVITY: &str = "Terminating SSH Tunnels";
pub const TUNNEL_NOT_ESTABLISHED: &str = "SSH Tunnel could not be established";
pub const TUNNEL_NOT_TERMINATED: &str = "SSH Tunnel could not be terminated";

/// Supervises the `ssh` processes of every live build
pub struct TunnelOrchestrator {
    registry: BuildRegistry,
    keys: Arc<dyn KeyProvider>,
    probe_timeout: Duration,
}

impl TunnelOrchestrator {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self {
            registry: BuildRegistry::new(),
            keys,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// How long a new process must stay alive to count as established
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn registry(&self) -> &BuildRegistry {
        &self.registry
    }

    /// Lifecycle state of a live build
    pub fn state(&self, build_id: &BuildId) -> Option<BuildState> {
        self.registry.state(build_id)
    }

    /// Register the build's tunnels and return the parameters to publish
    ///
    /// Dynamic local ports are allocated here, so the published values are
    /// the ones `establish` forwards.
    pub fn register_build(
        &self,
        build: &Build,
        tunnels: Vec<Tunnel>,
    ) -> Result<BTreeMap<String, String>, TunnelError> {
        let parameters = published_parameters(&tunnels, false)?;
        self.registry.register(&build.id, tunnels)?;
        tracing::info!(
            "Registered build {} with {} tunnel parameter(s)",
            build.id,
            parameters.len()
        );
        Ok(parameters)
    }

    /// Start one `ssh` process per distinct connection of the build
    ///
    /// Returns the number of processes that survived the liveness probe.
    /// A process exiting during the probe stops the build but does not
    /// prevent the remaining connections from being tried. Any other error
    /// abandons the remaining connections; processes already started are
    /// left for [`teardown`](Self::teardown).
    pub async fn establish(
        &self,
        build: &Build,
        reporter: &dyn BuildReporter,
    ) -> Result<usize, TunnelError> {
        let _activity = Activity::start(reporter, ESTABLISHING_ACTIVITY);

        let tunnels = self.registry.take_tunnels(&build.id);
        if tunnels.is_empty() {
            tracing::debug!("No tunnels to establish for build {}", build.id);
            return Ok(0);
        }
        self.registry.set_state(&build.id, BuildState::Establishing);

        let mut alive = 0;
        for (connection, forwards) in group_by_connection(&tunnels) {
            let _tunnel_activity = Activity::start(reporter, tunnel_activity(connection));
            match self.start_tunnel(build, connection, &forwards, reporter).await {
                Ok(true) => alive += 1,
                Ok(false) => {
                    reporter.failure(TUNNEL_NOT_ESTABLISHED);
                    reporter.stop_build(TUNNEL_NOT_ESTABLISHED);
                }
                Err(e) => {
                    tracing::error!("Establishing tunnels of build {} failed: {}", build.id, e);
                    reporter.internal_error(TUNNEL_NOT_ESTABLISHED, &e.to_string());
                    reporter.failure(TUNNEL_NOT_ESTABLISHED);
                    reporter.stop_build(TUNNEL_NOT_ESTABLISHED);
                    self.registry.set_state(&build.id, BuildState::Running);
                    return Err(e);
                }
            }
        }

        self.registry.set_state(&build.id, BuildState::Running);
        Ok(alive)
    }

    /// Terminate the build's processes and delete its temp files
    ///
    /// A build that never established anything is a no-op. Errors are
    /// reported to `reporter` before being returned; cleanup of the
    /// remaining processes and files happens regardless.
    pub async fn teardown(
        &self,
        build_id: &BuildId,
        reporter: &dyn BuildReporter,
    ) -> Result<(), TunnelError> {
        let activity = Activity::start(reporter, TERMINATING_ACTIVITY);
        let mut result = Ok(());

        if let Some(processes) = self.registry.take_processes(build_id) {
            self.registry.set_state(build_id, BuildState::TearingDown);

            for mut process in processes {
                let _tunnel_activity =
                    Activity::start(reporter, tunnel_activity(&process.connection));

                let terminated = self.terminate(&mut process, reporter).await;
                let drained = self.drain_output(process.id, reporter).await;

                if let Err(e) = terminated.and(drained) {
                    tracing::error!("Terminating tunnel via '{}' failed: {}", process.connection, e);
                    reporter.internal_error(TUNNEL_NOT_TERMINATED, &e.to_string());
                    reporter.failure(TUNNEL_NOT_TERMINATED);
                    reporter.stop_build(TUNNEL_NOT_TERMINATED);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }

        for path in self.registry.take_files(build_id) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!("Could not delete {:?}: {}", path, e);
            }
        }

        self.registry.take_tunnels(build_id);
        self.registry.close(build_id);
        drop(activity);
        result
    }

    /// Spawn and probe the process for one connection
    ///
    /// `Ok(false)` means the process exited within the probe window.
    async fn start_tunnel(
        &self,
        build: &Build,
        connection: &Connection,
        tunnels: &[&Tunnel],
        reporter: &dyn BuildReporter,
    ) -> Result<bool, TunnelError> {
        let mut forwards = Vec::with_capacity(tunnels.len());
        for tunnel in tunnels {
            let forward = tunnel.forward_spec()?;
            reporter.progress(&format!("Forwarding '{}'", forward));
            forwards.push(forward);
        }

        let key_file = self.keys.materialize(connection.ssh_key(), &build.temp_dir)?;
        self.registry.track_file(&build.id, key_file.clone());

        let mut command = SshCommand::new(&build.ssh_executable, connection, &key_file, &forwards);
        if let Some(passphrase) = connection.ssh_key_passphrase() {
            let script = askpass::write_script(&build.temp_dir, passphrase)?;
            self.registry.track_file(&build.id, script.clone());
            command = command.with_askpass(script);
        }

        let (stdout, stdout_path) = self.capture_file(build, "sshTunnelStdout")?;
        let (stderr, stderr_path) = self.capture_file(build, "sshTunnelStderr")?;

        tracing::debug!("Spawning: {}", command);
        let mut child = command
            .to_command(&build.temp_dir, stdout, stderr)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                executable: build.ssh_executable.clone(),
                source,
            })?;

        let id = self.registry.next_process_id();
        self.registry.set_output(id, stdout_path, stderr_path);

        let probe = match tokio::time::timeout(self.probe_timeout, child.wait()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(status)) => Ok(Some(status)),
            Ok(Err(e)) => Err(e),
        };

        self.registry.add_process(
            &build.id,
            TunnelProcess {
                id,
                connection: connection.clone(),
                child,
            },
        );

        match probe? {
            None => {
                tracing::info!("Tunnel via '{}' is up ({})", connection, id);
                Ok(true)
            }
            Some(status) => {
                let error = ProcessError::EarlyExit {
                    connection: connection.to_string(),
                    status: exit_code(&status),
                };
                tracing::warn!("{}", error);
                Ok(false)
            }
        }
    }

    fn capture_file(&self, build: &Build, prefix: &str) -> Result<(File, PathBuf), TunnelError> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".log")
            .tempfile_in(&build.temp_dir)?;
        let (file, path) = file.keep().map_err(|e| e.error)?;
        self.registry.track_file(&build.id, path.clone());
        Ok((file, path))
    }

    async fn terminate(
        &self,
        process: &mut TunnelProcess,
        reporter: &dyn BuildReporter,
    ) -> Result<(), TunnelError> {
        reporter.progress("Terminate SSH Tunnel");

        match process.child.try_wait()? {
            None => {
                process.child.kill().await?;
                tracing::debug!("Killed tunnel via '{}' ({})", process.connection, process.id);
            }
            Some(status) => {
                if !status.success() {
                    let error = ProcessError::AbnormalExit {
                        connection: process.connection.to_string(),
                        status: exit_code(&status),
                    };
                    tracing::warn!("{}", error);
                    reporter.failure(TUNNEL_NOT_ESTABLISHED);
                    reporter.stop_build(TUNNEL_NOT_ESTABLISHED);
                }
                reporter.progress(&format!("exit code: {}", exit_code(&status)));
            }
        }
        Ok(())
    }

    async fn drain_output(
        &self,
        process_id: ProcessId,
        reporter: &dyn BuildReporter,
    ) -> Result<(), TunnelError> {
        let output = self.registry.take_output(process_id);

        if let Some(path) = output.stdout {
            let stdout = read_capture(&path).await?;
            if !stdout.trim().is_empty() {
                reporter.progress(&format!("stdout: {}", stdout));
            }
        }
        if let Some(path) = output.stderr {
            let stderr = read_capture(&path).await?;
            if !stderr.trim().is_empty() {
                reporter.warning(&format!("stderr: {}", stderr));
            }
        }
        Ok(())
    }
}

/// The merged `sshTunnel.<name>.*` parameters of `tunnels`
///
/// In emulation mode no port is allocated. Tunnels whose names sanitize to
/// the same prefix overwrite each other; the later one wins.
pub fn published_parameters(
    tunnels: &[Tunnel],
    emulation: bool,
) -> Result<BTreeMap<String, String>, ModelError> {
    let mut parameters = BTreeMap::new();
    let mut prefixes = HashSet::new();
    for tunnel in tunnels {
        let prefix = tunnel.parameter_prefix();
        if !prefixes.insert(prefix.clone()) {
            tracing::warn!(
                "Tunnel '{}' publishes under '{}' which is already in use",
                tunnel.name(),
                prefix
            );
        }
        parameters.extend(tunnel.config_parameters(emulation)?);
    }
    Ok(parameters)
}

/// Group tunnels by connection, keeping first-seen order within and across groups
pub fn group_by_connection(tunnels: &[Tunnel]) -> Vec<(&Connection, Vec<&Tunnel>)> {
    let mut groups: Vec<(&Connection, Vec<&Tunnel>)> = Vec::new();
    for tunnel in tunnels {
        match groups.iter_mut().find(|(c, _)| *c == tunnel.connection()) {
            Some((_, group)) => group.push(tunnel),
            None => groups.push((tunnel.connection(), vec![tunnel])),
        }
    }
    groups
}

fn tunnel_activity(connection: &Connection) -> String {
    format!(
        "Tunnel via '{}' identified by key '{}'",
        connection,
        connection.ssh_key()
    )
}

fn exit_code(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => status.to_string(),
    }
}

async fn read_capture(path: &Path) -> Result<String, TunnelError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
