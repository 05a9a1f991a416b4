//! Validate command implementation

use anyhow::Result;
use st_core::config::TunnelsConfig;
use st_core::params::NAME;
use st_core::Validator;

use crate::output::{format_errors, print_error, print_info, print_success, print_warning};

/// Validate every configured tunnel and print its description or errors
///
/// Returns whether all tunnels are valid.
pub fn validate_command(config: &TunnelsConfig) -> Result<bool> {
    let keys = config.key_ring();
    for name in keys.names() {
        if let Some(path) = keys.path(name) {
            print_info(&format!("SSH key '{}' from {}", name, path.display()));
        }
    }

    if config.tunnel.is_empty() {
        print_warning("No tunnels configured");
        return Ok(true);
    }

    let validator = Validator::new(&keys);
    let mut all_valid = true;

    for (index, properties) in config.tunnel.iter().enumerate() {
        let mut properties = properties.clone();
        let errors = validator.validate(&mut properties);
        let label = match properties.get(NAME).filter(|n| !n.is_empty()) {
            Some(name) => format!("'{}'", name),
            None => format!("#{}", index + 1),
        };

        if errors.is_empty() {
            print_success(&format!("Tunnel {}: {}", label, validator.describe(&mut properties)));
        } else {
            all_valid = false;
            print_error(&format!("Tunnel {} is invalid", label));
            println!("{}", format_errors(&errors));
        }
    }

    Ok(all_valid)
}
