#![allow(dead_code)]

use memstats_monitor::{MonitorError, Output};
use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

pub const KEYS: [&str; 9] = [
    "Alloc",
    "TotalAlloc",
    "Sys",
    "Mallocs",
    "Frees",
    "LiveObjects",
    "PauseTotalNs",
    "NumGC",
    "NumGoroutine",
];

/// An in-memory sink that can be read while the reporter writes to it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn output(&self) -> Output {
        Output::Writer(Box::new(self.clone()))
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink whose writes always fail.
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Checks that `line` is a report with exactly the fixed keys, in order.
pub fn assert_report_line(line: &str) -> serde_json::Value {
    let value: serde_json::Value = serde_json::from_str(line).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), KEYS.len(), "{line}");

    let mut last = 0;
    for key in KEYS {
        assert!(object[key].is_u64(), "{key} is not an unsigned integer in {line}");
        let at = line.find(&format!("\"{key}\":")).unwrap();
        assert!(at >= last, "{key} out of order in {line}");
        last = at;
    }
    value
}

pub fn encoding_error() -> MonitorError {
    MonitorError::from(serde_json::from_str::<u64>("not a number").unwrap_err())
}
