//! Drives the monitor with a metrics type of its own: CPU time of the process.
//!
//! Linux only, other platforms report zeros.

use memstats_monitor::{Metrics, MonitorBuilder, MonitorError};
use parking_lot::Mutex;
use serde::Serialize;
use std::{sync::Arc, thread, time::Duration};

#[derive(Debug, Default, Clone, Copy, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CpuTimes {
    user_ticks: u64,
    system_ticks: u64,
}

#[derive(Default)]
struct CpuMonitor {
    times: Mutex<CpuTimes>,
}

fn read_cpu_times() -> CpuTimes {
    let Ok(stat) = std::fs::read_to_string("/proc/self/stat") else {
        return CpuTimes::default();
    };
    // Fields after the parenthesised command name; utime and stime are the 12th and 13th.
    let mut fields = stat
        .rsplit_once(')')
        .map(|(_, rest)| rest)
        .unwrap_or_default()
        .split_whitespace()
        .skip(11);
    let mut next = || fields.next().and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    CpuTimes {
        user_ticks: next(),
        system_ticks: next(),
    }
}

impl Metrics for CpuMonitor {
    fn sample(&self) {
        let times = read_cpu_times();
        *self.times.lock() = times;
    }

    fn serialize(&self) -> Result<String, MonitorError> {
        serde_json::to_string(&*self.times.lock()).map_err(MonitorError::from)
    }
}

#[cfg(not(feature = "tokio"))]
fn main() -> Result<(), MonitorError> {
    let handle = MonitorBuilder::default()
        .report_interval(Duration::from_millis(500))
        .start(Arc::new(CpuMonitor::default()))?;

    // Burn some CPU so there is something to see.
    let start = std::time::Instant::now();
    let mut x = 0u64;
    while start.elapsed() < Duration::from_secs(2) {
        x = x.wrapping_mul(31).wrapping_add(7);
    }
    println!("done spinning ({x})");
    thread::sleep(Duration::from_millis(200));

    handle.stop()
}

#[cfg(feature = "tokio")]
#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    let handle = MonitorBuilder::default()
        .report_interval(Duration::from_millis(500))
        .start(Arc::new(CpuMonitor::default()))?;

    tokio::task::spawn_blocking(|| thread::sleep(Duration::from_secs(2)))
        .await
        .expect("sleeper panicked");

    handle.stop().await
}
