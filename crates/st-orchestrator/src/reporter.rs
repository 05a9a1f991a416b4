//! Tracing-backed build reporter

use std::sync::OnceLock;

use st_core::traits::BuildReporter;
use st_core::BuildId;

/// Reports a build's tunnel lifecycle as tracing events
///
/// The first stop request is remembered so a host can fail the build.
pub struct TracingReporter {
    build: BuildId,
    stop_reason: OnceLock<String>,
}

impl TracingReporter {
    pub fn new(build: BuildId) -> Self {
        Self {
            build,
            stop_reason: OnceLock::new(),
        }
    }

    /// Whether anything asked the build to stop
    pub fn is_stopped(&self) -> bool {
        self.stop_reason.get().is_some()
    }

    /// The first stop reason
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.get().map(String::as_str)
    }
}

impl BuildReporter for TracingReporter {
    fn activity_started(&self, name: &str) {
        tracing::info!(build = %self.build, activity = name, "{} ...", name);
    }

    fn activity_finished(&self, name: &str) {
        tracing::debug!(build = %self.build, activity = name, "Finished: {}", name);
    }

    fn progress(&self, message: &str) {
        tracing::info!(build = %self.build, "{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!(build = %self.build, "{}", message);
    }

    fn internal_error(&self, kind: &str, message: &str) {
        tracing::error!(build = %self.build, kind = kind, "{}: {}", kind, message);
    }

    fn failure(&self, description: &str) {
        tracing::error!(build = %self.build, "Build failure: {}", description);
    }

    fn stop_build(&self, reason: &str) {
        if self.stop_reason.set(reason.to_string()).is_ok() {
            tracing::warn!(build = %self.build, "Stopping build: {}", reason);
        }
    }
}
