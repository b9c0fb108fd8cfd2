#[cfg(feature = "tokio")]
mod task;
#[cfg(not(feature = "tokio"))]
mod thread;

#[cfg(feature = "tokio")]
pub use task::{MonitorHandle, Shutdown};
#[cfg(not(feature = "tokio"))]
pub use thread::{MonitorHandle, Shutdown};

#[cfg(feature = "tokio")]
use self::task as runtime;
#[cfg(not(feature = "tokio"))]
use self::thread as runtime;

use crate::{
    config::{Composition, MonitorConfig},
    error::MonitorError,
    instrument,
    record::Metrics,
    sink::{Output, ReportWriter},
};
use std::{path::PathBuf, sync::Arc, time::Duration};

/// Configures and starts a monitor: a sampler refreshing the metrics on a
/// short interval and a reporter writing them out on a longer one.
#[derive(Debug, Default)]
pub struct MonitorBuilder {
    config: MonitorConfig,
    output: Output,
}

impl MonitorBuilder {
    /// How often a report line is written. Defaults to one second.
    #[must_use]
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.config.report_interval = interval;
        self
    }

    /// How often the metrics are refreshed. Defaults to 100ms and is never
    /// longer than the report interval.
    #[must_use]
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval = interval;
        self
    }

    /// Prefix each report line with the local date and time.
    #[must_use]
    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.config.timestamps = enabled;
        self
    }

    #[must_use]
    pub fn composition(mut self, composition: Composition) -> Self {
        self.config.composition = composition;
        self
    }

    /// Where report lines go. Defaults to standard output.
    #[must_use]
    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Writes report lines to a file, created or truncated on start.
    #[must_use]
    pub fn output_path(self, path: impl Into<PathBuf>) -> Self {
        self.output(Output::File(path.into()))
    }

    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Opens the output and starts the sampler and the reporter in the
    /// background. With the `tokio` feature they are spawned as tasks and
    /// this must be called from within a Tokio runtime.
    ///
    /// # Example
    /// ```no_run
    /// use memstats_monitor::{MemoryMonitor, MonitorBuilder};
    /// use std::{sync::Arc, time::Duration};
    ///
    /// let handle = MonitorBuilder::default()
    ///     .report_interval(Duration::from_secs(1))
    ///     .start(Arc::new(MemoryMonitor::new()))?;
    /// // ... foreground work ...
    /// # #[cfg(not(feature = "tokio"))]
    /// handle.stop()?;
    /// # Ok::<(), memstats_monitor::MonitorError>(())
    /// ```
    ///
    /// # Errors
    /// Returns an error, without starting anything, if an interval is zero or
    /// the output cannot be opened. Also fails if a thread cannot be spawned.
    pub fn start<M: Metrics>(self, metrics: Arc<M>) -> Result<MonitorHandle, MonitorError> {
        self.config.validate()?;
        let writer = ReportWriter::new(self.output.open()?, self.config.timestamps);
        instrument::describe();
        runtime::start(metrics, self.config, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_settings() {
        let builder = MonitorBuilder::default()
            .report_interval(Duration::from_millis(1000))
            .sample_interval(Duration::from_millis(5000))
            .timestamps(true)
            .composition(Composition::Nested);

        let config = builder.config();
        assert_eq!(config.effective_sample_interval(), Duration::from_millis(1000));
        assert!(config.timestamps);
        assert_eq!(config.composition, Composition::Nested);
    }

    #[test]
    fn zero_interval_fails_before_opening_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.log");
        let result = MonitorBuilder::default()
            .report_interval(Duration::ZERO)
            .output_path(&path)
            .start(Arc::new(crate::MemoryMonitor::new()));

        assert!(matches!(result, Err(MonitorError::InvalidInterval("report"))));
        assert!(!path.exists());
    }

    #[test]
    fn sink_creation_failure_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let result = MonitorBuilder::default()
            .output_path(dir.path().join("missing").join("stats.log"))
            .start(Arc::new(crate::MemoryMonitor::new()));

        assert!(matches!(result, Err(MonitorError::SinkCreation { .. })));
    }
}
