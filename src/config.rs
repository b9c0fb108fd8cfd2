use crate::error::MonitorError;
use std::time::Duration;

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Who starts the sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Composition {
    /// The owner starts the sampler and the reporter side by side.
    #[default]
    Flat,
    /// The owner starts the reporter, which starts the sampler and waits for
    /// it before finishing.
    Nested,
}

/// Timing and wiring of a monitor, fixed once it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub report_interval: Duration,
    pub sample_interval: Duration,
    pub timestamps: bool,
    pub composition: Composition,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            report_interval: DEFAULT_REPORT_INTERVAL,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            timestamps: false,
            composition: Composition::Flat,
        }
    }
}

impl MonitorConfig {
    /// The sample interval actually used: never longer than the report interval.
    #[must_use]
    pub fn effective_sample_interval(&self) -> Duration {
        self.sample_interval.min(self.report_interval)
    }

    /// # Errors
    /// Returns [`MonitorError::InvalidInterval`] if either interval is zero.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.report_interval.is_zero() {
            return Err(MonitorError::InvalidInterval("report"));
        }
        if self.sample_interval.is_zero() {
            return Err(MonitorError::InvalidInterval("sample"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.report_interval, Duration::from_millis(1000));
        assert_eq!(config.effective_sample_interval(), Duration::from_millis(100));
    }

    #[test]
    fn sample_interval_is_clamped_to_report_interval() {
        let config = MonitorConfig {
            report_interval: Duration::from_millis(1000),
            sample_interval: Duration::from_millis(5000),
            ..MonitorConfig::default()
        };
        assert_eq!(config.effective_sample_interval(), Duration::from_millis(1000));

        let config = MonitorConfig {
            report_interval: Duration::from_millis(50),
            ..MonitorConfig::default()
        };
        assert_eq!(config.effective_sample_interval(), Duration::from_millis(50));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let config = MonitorConfig {
            report_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::InvalidInterval("report"))));

        let config = MonitorConfig {
            sample_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::InvalidInterval("sample"))));
    }
}
