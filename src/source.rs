use crate::{allocator::allocation_counters, stats::RawCounters};
use parking_lot::Mutex;
use std::fmt;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Something that can read the current runtime counters.
pub trait MetricsSource: Send + Sync {
    fn sample(&self) -> RawCounters;
}

/// Reads counters for the current process.
///
/// | field | origin | sentinel |
/// |---|---|---|
/// | `alloc`, `total_alloc`, `mallocs`, `frees` | [`CountingAllocator`](crate::CountingAllocator) | `0` when not installed |
/// | `sys` | resident memory of the process (`sysinfo`) | `0` |
/// | `num_threads` | tasks of the process (`sysinfo`) | `1` |
/// | `pause_total_ns`, `num_gc` | no collector | always `0` |
pub struct RuntimeSource {
    system: Mutex<System>,
    pid: Option<Pid>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ProcessUsage {
    resident_bytes: Option<u64>,
    threads: Option<usize>,
}

impl Default for RuntimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuntimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSource")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl RuntimeSource {
    #[must_use]
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!("Failed to get current PID, process counters will read as unknown: {e}");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }

    fn process_usage(&self) -> ProcessUsage {
        let Some(pid) = self.pid else {
            return ProcessUsage::default();
        };

        let mut system = self.system.lock();
        if system.refresh_processes(ProcessesToUpdate::Some(&[pid])) == 0 {
            log::warn!("Process {pid} not found while reading memory stats");
            return ProcessUsage::default();
        }
        system
            .process(pid)
            .map(|process| ProcessUsage {
                resident_bytes: Some(process.memory()),
                threads: process.tasks().map(|tasks| tasks.len().max(1)),
            })
            .unwrap_or_default()
    }
}

impl MetricsSource for RuntimeSource {
    fn sample(&self) -> RawCounters {
        let heap = allocation_counters();
        let process = self.process_usage();

        RawCounters {
            alloc: heap.in_use,
            total_alloc: heap.total,
            sys: process.resident_bytes.unwrap_or(0),
            mallocs: heap.mallocs,
            frees: heap.frees,
            pause_total_ns: 0,
            num_gc: 0,
            // The sampling thread itself is always live.
            num_threads: process.threads.unwrap_or(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_source_reports_at_least_one_thread() {
        let raw = RuntimeSource::new().sample();
        assert!(raw.num_threads >= 1);
        assert_eq!(raw.num_gc, 0);
        assert_eq!(raw.pause_total_ns, 0);
    }

    #[test]
    fn resident_memory_of_a_running_process_is_known() {
        let source = RuntimeSource::new();
        assert!(source.pid.is_some());
        let usage = source.process_usage();
        assert!(usage.resident_bytes.is_some_and(|bytes| bytes > 0));
        assert!(source.sample().sys > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn extra_threads_are_counted() {
        let source = RuntimeSource::new();
        let (release, parked) = crossbeam::channel::bounded::<()>(0);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let parked = parked.clone();
                std::thread::spawn(move || {
                    let _ = parked.recv();
                })
            })
            .collect();

        assert!(source.sample().num_threads >= 4);

        drop(release);
        for worker in workers {
            worker.join().unwrap();
        }
    }

    #[test]
    fn unknown_process_falls_back_to_sentinels() {
        let source = RuntimeSource {
            system: Mutex::new(System::new()),
            pid: None,
        };
        assert_eq!(source.process_usage(), ProcessUsage::default());

        let raw = source.sample();
        assert_eq!(raw.sys, 0);
        assert_eq!(raw.num_threads, 1);
    }

    #[test]
    fn samples_can_be_taken_from_several_threads() {
        let source = std::sync::Arc::new(RuntimeSource::new());
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let source = std::sync::Arc::clone(&source);
                std::thread::spawn(move || source.sample().num_threads)
            })
            .collect();
        for reader in readers {
            assert!(reader.join().unwrap() >= 1);
        }
    }
}
