//! st-core: Tunnel model, validation and configuration for ssh-tunnels
//!
//! This crate turns flat tunnel property maps into validated tunnel models
//! and defines the collaborator traits the orchestrator consumes.

pub mod config;
pub mod error;
pub mod keys;
pub mod model;
pub mod params;
pub mod reference;
pub mod ssh;
pub mod traits;
pub mod types;
pub mod validate;

pub use error::TunnelError;
pub use model::{build_tunnel, Connection, Part, Tunnel};
pub use params::Properties;
pub use types::{Build, BuildId, BuildState};
pub use validate::{ValidationErrors, Validator};
