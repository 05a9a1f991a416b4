//! CLI command implementations

mod params;
mod run;
mod validate;

pub use params::params_command;
pub use run::{environment_name, run_command};
pub use validate::validate_command;

use anyhow::{Context, Result};
use st_core::config::TunnelsConfig;
use st_core::{Tunnel, Validator};

/// Validate and build every configured tunnel
///
/// With `resolve` set, `%name%` references are substituted first.
pub fn load_tunnels(config: &TunnelsConfig, resolve: bool) -> Result<Vec<Tunnel>> {
    let keys = config.key_ring();
    let validator = Validator::new(&keys);

    let properties = if resolve {
        config
            .resolved_tunnels()
            .context("Failed to resolve tunnel parameters")?
    } else {
        config.tunnel.clone()
    };

    properties
        .into_iter()
        .enumerate()
        .map(|(index, properties)| {
            validator
                .build(properties)
                .with_context(|| format!("Tunnel #{} is invalid", index + 1))
        })
        .collect()
}
