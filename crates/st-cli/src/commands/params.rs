//! Params command implementation

use anyhow::Result;
use st_core::config::TunnelsConfig;
use st_orchestrator::published_parameters;

use super::load_tunnels;
use crate::output::format_parameters;

/// Print the parameters the configured tunnels publish
///
/// In emulation mode references stay unresolved and dynamic ports read `0`.
pub fn params_command(config: &TunnelsConfig, emulate: bool) -> Result<()> {
    let tunnels = load_tunnels(config, !emulate)?;
    let parameters = published_parameters(&tunnels, emulate)?;
    println!("{}", format_parameters(&parameters));
    Ok(())
}
