use crate::{
    error::MonitorError,
    source::{MetricsSource, RuntimeSource},
    stats::{MemoryStats, RawCounters},
};
use parking_lot::RwLock;

/// A kind of runtime metrics the monitor can drive.
///
/// The sampler calls [`Metrics::sample`] on every sample tick and the reporter
/// calls [`Metrics::serialize`] on every report tick, possibly at the same
/// time from another thread. Implementations decide what is measured; the
/// monitor only cares about the cadence.
pub trait Metrics: Send + Sync + 'static {
    /// Reads fresh values and stores them, replacing the previous sample.
    fn sample(&self);

    /// Encodes the current values as a single line of text.
    ///
    /// # Errors
    /// Returns [`MonitorError::Encoding`] if the values cannot be encoded.
    fn serialize(&self) -> Result<String, MonitorError>;
}

/// The shared record holding the latest [`MemoryStats`].
///
/// One writer refreshes it, any number of readers take snapshots. Every field
/// is replaced under the same write lock so readers never see a mix of two
/// samples.
#[derive(Debug, Default)]
pub struct MemoryRecord {
    stats: RwLock<MemoryStats>,
}

impl MemoryRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every field with the values of `raw`.
    pub fn refresh(&self, raw: RawCounters) {
        *self.stats.write() = MemoryStats::from(raw);
    }

    #[must_use]
    pub fn snapshot(&self) -> MemoryStats {
        *self.stats.read()
    }

    /// Encodes the current values as a JSON object.
    ///
    /// # Errors
    /// Returns [`MonitorError::Encoding`] if serialization fails.
    pub fn serialize(&self) -> Result<String, MonitorError> {
        let stats = self.stats.read();
        serde_json::to_string(&*stats).map_err(MonitorError::from)
    }
}

/// Memory statistics read from a [`MetricsSource`] into a [`MemoryRecord`].
#[derive(Debug, Default)]
pub struct MemoryMonitor<S = RuntimeSource> {
    record: MemoryRecord,
    source: S,
}

impl MemoryMonitor<RuntimeSource> {
    /// Creates an empty monitor reading the current process.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(RuntimeSource::new())
    }
}

impl<S: MetricsSource> MemoryMonitor<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            record: MemoryRecord::new(),
            source,
        }
    }

    pub const fn record(&self) -> &MemoryRecord {
        &self.record
    }
}

impl<S: MetricsSource + 'static> Metrics for MemoryMonitor<S> {
    fn sample(&self) {
        // Read outside the lock so writers hold it only for the copy.
        let raw = self.source.sample();
        self.record.refresh(raw);
    }

    fn serialize(&self) -> Result<String, MonitorError> {
        self.record.serialize()
    }
}
