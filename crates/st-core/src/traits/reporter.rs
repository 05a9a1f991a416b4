//! Build progress reporting

/// Sink for a build's progress and failure reporting
///
/// Every failure of the tunnel lifecycle ends up as a failure description
/// plus a stop request here; nothing is raised to the host.
pub trait BuildReporter: Send + Sync {
    /// A named activity begins
    fn activity_started(&self, name: &str);

    /// A named activity ends
    fn activity_finished(&self, name: &str);

    /// Informational progress line
    fn progress(&self, message: &str);

    /// Warning line
    fn warning(&self, message: &str);

    /// Unexpected error with its underlying detail
    fn internal_error(&self, kind: &str, message: &str);

    /// Describe why the build failed
    fn failure(&self, description: &str);

    /// Ask the owning build to stop
    fn stop_build(&self, reason: &str);
}

/// Guard that finishes an activity when dropped
///
/// The activity closes on every path out of the enclosing scope, including
/// early returns and errors.
pub struct Activity<'a> {
    reporter: &'a dyn BuildReporter,
    name: String,
}

impl<'a> Activity<'a> {
    /// Start an activity on the reporter
    pub fn start(reporter: &'a dyn BuildReporter, name: impl Into<String>) -> Self {
        let name = name.into();
        reporter.activity_started(&name);
        Self { reporter, name }
    }
}

impl Drop for Activity<'_> {
    fn drop(&mut self) {
        self.reporter.activity_finished(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl BuildReporter for Recorder {
        fn activity_started(&self, name: &str) {
            self.0.lock().unwrap().push(format!("start {name}"));
        }
        fn activity_finished(&self, name: &str) {
            self.0.lock().unwrap().push(format!("finish {name}"));
        }
        fn progress(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
        fn warning(&self, _message: &str) {}
        fn internal_error(&self, _kind: &str, _message: &str) {}
        fn failure(&self, _description: &str) {}
        fn stop_build(&self, _reason: &str) {}
    }

    fn run(reporter: &dyn BuildReporter, fail: bool) -> Result<(), ()> {
        let _activity = Activity::start(reporter, "outer");
        reporter.progress("working");
        if fail {
            return Err(());
        }
        reporter.progress("done");
        Ok(())
    }

    #[test]
    fn test_activity_closes_on_early_return() {
        let recorder = Recorder::default();
        assert!(run(&recorder, true).is_err());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["start outer", "working", "finish outer"]
        );
    }

    #[test]
    fn test_nested_activities_close_in_reverse_order() {
        let recorder = Recorder::default();
        {
            let _outer = Activity::start(&recorder, "outer");
            let _inner = Activity::start(&recorder, "inner");
        }
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["start outer", "start inner", "finish inner", "finish outer"]
        );
    }
}
