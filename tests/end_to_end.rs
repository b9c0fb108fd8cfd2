#![cfg(not(feature = "tokio"))]

mod common;

use common::{SharedBuffer, assert_report_line};
use memstats_monitor::{Composition, CountingAllocator, MemoryMonitor, MonitorBuilder};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator::system();

fn run_for(composition: Composition, run: Duration) -> Vec<String> {
    let buffer = SharedBuffer::default();
    let handle = MonitorBuilder::default()
        .report_interval(Duration::from_millis(200))
        .composition(composition)
        .output(buffer.output())
        .start(Arc::new(MemoryMonitor::new()))
        .unwrap();

    thread::sleep(run);
    let stopping = Instant::now();
    handle.stop().unwrap();
    // Sample and report intervals are both 200ms, stop must not wait a full tick of either.
    assert!(stopping.elapsed() < Duration::from_millis(400));

    buffer.lines()
}

#[test]
fn reports_every_interval_until_stopped() {
    let lines = run_for(Composition::Flat, Duration::from_millis(650));
    assert!((3..=4).contains(&lines.len()), "got {} lines: {lines:?}", lines.len());

    for line in &lines {
        let report = assert_report_line(line);
        assert!(report["NumGoroutine"].as_u64().unwrap() >= 1);
        assert!(report["Mallocs"].as_u64().unwrap() > 0, "allocator counters missing: {line}");
        assert_eq!(
            report["LiveObjects"].as_u64().unwrap(),
            report["Mallocs"]
                .as_u64()
                .unwrap()
                .saturating_sub(report["Frees"].as_u64().unwrap())
        );
    }
}

#[test]
fn nested_composition_reports_the_same_way() {
    let lines = run_for(Composition::Nested, Duration::from_millis(650));
    assert!((3..=4).contains(&lines.len()), "got {} lines: {lines:?}", lines.len());
    for line in &lines {
        assert!(assert_report_line(line)["NumGoroutine"].as_u64().unwrap() >= 1);
    }
}

#[test]
fn report_file_holds_one_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memstats.log");

    let handle = MonitorBuilder::default()
        .report_interval(Duration::from_millis(50))
        .output_path(&path)
        .start(Arc::new(MemoryMonitor::new()))
        .unwrap();
    thread::sleep(Duration::from_millis(180));
    handle.stop().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.lines().count() >= 2, "{contents}");
    for line in contents.lines() {
        assert_report_line(line);
    }
}

#[test]
fn timestamped_lines_keep_the_report_intact() {
    let buffer = SharedBuffer::default();
    let handle = MonitorBuilder::default()
        .report_interval(Duration::from_millis(50))
        .timestamps(true)
        .output(buffer.output())
        .start(Arc::new(MemoryMonitor::new()))
        .unwrap();
    thread::sleep(Duration::from_millis(120));
    handle.stop().unwrap();

    let lines = buffer.lines();
    assert!(!lines.is_empty());
    for line in &lines {
        let (_, report) = line.split_at(line.find('{').unwrap());
        assert_report_line(report);
    }
}

#[test]
fn stopping_immediately_writes_nothing() {
    let buffer = SharedBuffer::default();
    let handle = MonitorBuilder::default()
        .output(buffer.output())
        .start(Arc::new(MemoryMonitor::new()))
        .unwrap();
    handle.stop().unwrap();
    assert!(buffer.lines().is_empty());
}
