//! Collaborator traits consumed by validation and orchestration

mod keys;
mod reporter;

pub use keys::{ExecutableResolver, KeyProvider, KeyStore};
pub use reporter::{Activity, BuildReporter};
