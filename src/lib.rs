#![warn(clippy::pedantic, clippy::nursery, clippy::cargo, clippy::perf)]

//! # `memstats_monitor`
//!
//! Background memory statistics for a running process.
//!
//! A sampler refreshes a shared [`MemoryRecord`] on a short interval and a
//! reporter writes it out as one JSON line per report interval, while the
//! application does its own work in the foreground. One call to
//! [`MonitorHandle::stop`] stops both and waits for them.
//!
//! ```no_run
//! use memstats_monitor::{CountingAllocator, MemoryMonitor, MonitorBuilder};
//! use std::{sync::Arc, time::Duration};
//!
//! #[global_allocator]
//! static GLOBAL: CountingAllocator = CountingAllocator::system();
//!
//! # #[cfg(not(feature = "tokio"))]
//! fn main() -> Result<(), memstats_monitor::MonitorError> {
//!     let handle = MonitorBuilder::default()
//!         .report_interval(Duration::from_millis(500))
//!         .start(Arc::new(MemoryMonitor::new()))?;
//!
//!     std::thread::sleep(Duration::from_secs(2));
//!     handle.stop()
//! }
//! # #[cfg(feature = "tokio")]
//! # fn main() {}
//! ```
//!
//! Heap counters come from [`CountingAllocator`]; without it installed they
//! read zero. Other metrics can be driven by implementing [`Metrics`].
//!
//! ## Async Support
//!
//! Async support is available via the `tokio` feature flag. When enabled, the sampler and reporter run as tasks and require a Tokio runtime. Enable with:
//!
//! ```toml
//! [dependencies]
//! memstats_monitor = { version = "...", features = ["tokio"] }
//! ```
//!
//! If the `tokio` feature is not enabled, the monitor uses threads.

mod allocator;
mod config;
mod error;
mod instrument;
mod monitor;
mod record;
mod sink;
mod source;
mod stats;

pub use allocator::{AllocCounters, CountingAllocator, allocation_counters};
pub use config::{Composition, DEFAULT_REPORT_INTERVAL, DEFAULT_SAMPLE_INTERVAL, MonitorConfig};
pub use error::MonitorError;
pub use monitor::{MonitorBuilder, MonitorHandle, Shutdown};
pub use record::{MemoryMonitor, MemoryRecord, Metrics};
pub use sink::{Output, ReportWriter};
pub use source::{MetricsSource, RuntimeSource};
pub use stats::{MemoryStats, RawCounters};
