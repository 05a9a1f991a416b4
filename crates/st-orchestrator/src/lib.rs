//! st-orchestrator: Build-scoped supervision of `ssh` tunnel processes
//!
//! The orchestrator turns a build's validated tunnels into one `ssh -N`
//! process per distinct connection, tracks processes and temp files per
//! build, and guarantees they are reaped and deleted at teardown.

pub mod askpass;
pub mod command;
pub mod orchestrator;
pub mod registry;
pub mod reporter;

pub use command::SshCommand;
pub use orchestrator::{group_by_connection, published_parameters, TunnelOrchestrator};
pub use registry::{BuildRegistry, ProcessId, TunnelProcess};
pub use reporter::TracingReporter;
