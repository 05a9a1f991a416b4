//! Run command implementation

use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::sync::Arc;

use anyhow::{Context, Result};
use st_core::config::TunnelsConfig;
use st_core::traits::ExecutableResolver;
use st_core::Build;
use st_orchestrator::{TracingReporter, TunnelOrchestrator};
use tokio::process::Command;

use super::load_tunnels;
use crate::output::{print_error, print_warning};

/// Run `command` with the configured tunnels up
///
/// Returns the command's exit code, or 1 if the build was stopped.
pub async fn run_command(config: &TunnelsConfig, command: &[String]) -> Result<i32> {
    let (program, args) = command.split_first().context("No command given")?;
    let tunnels = load_tunnels(config, true)?;

    let temp_root = config.temp_root();
    let temp_dir = tempfile::Builder::new()
        .prefix("ssh-tunnels-")
        .tempdir_in(&temp_root)
        .with_context(|| format!("Failed to create build directory in {:?}", temp_root))?;

    let build = Build::new(temp_dir.path(), config.executable().resolve());
    let orchestrator = TunnelOrchestrator::new(Arc::new(config.key_ring()))
        .with_probe_timeout(config.probe_timeout);
    let reporter = TracingReporter::new(build.id.clone());

    let parameters = orchestrator.register_build(&build, tunnels)?;
    tracing::info!("Build {} publishes {} parameter(s)", build.id, parameters.len());

    if let Err(e) = orchestrator.establish(&build, &reporter).await {
        tracing::debug!("Establishment failed: {}", e);
    }

    let outcome = if reporter.is_stopped() {
        Ok(None)
    } else {
        run_child(program, args, &parameters).await.map(Some)
    };

    if let Err(e) = orchestrator.teardown(&build.id, &reporter).await {
        tracing::debug!("Teardown failed: {}", e);
    }

    let status = outcome?;
    if let Some(reason) = reporter.stop_reason() {
        print_error(&format!("Build stopped: {}", reason));
        return Ok(1);
    }
    Ok(status.and_then(|s| s.code()).unwrap_or(1))
}

async fn run_child(
    program: &str,
    args: &[String],
    parameters: &BTreeMap<String, String>,
) -> Result<ExitStatus> {
    let mut child = Command::new(program)
        .args(args)
        .envs(
            parameters
                .iter()
                .map(|(name, value)| (environment_name(name), value)),
        )
        .spawn()
        .with_context(|| format!("Failed to run '{}'", program))?;

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = tokio::signal::ctrl_c() => {
            print_warning("Interrupted, terminating command");
            child.kill().await?;
            child.wait().await?
        }
    };
    Ok(status)
}

/// Environment variable carrying a published parameter
///
/// `sshTunnel.db.local.port` becomes `SSHTUNNEL_DB_LOCAL_PORT`.
pub fn environment_name(parameter: &str) -> String {
    parameter
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
