//! ssh-tunnels: Command-line host for build-scoped SSH tunnels
//!
//! Loads a tunnel configuration, validates it, publishes tunnel parameters
//! and runs a command wrapped by tunnel establishment and teardown.

pub mod commands;
pub mod output;
