//! Counters describing the monitor itself, published through the `metrics` facade.

pub const SAMPLES_TOTAL: &str = "memstats_samples_total";
pub const REPORTS_TOTAL: &str = "memstats_reports_total";
pub const REPORT_FAILURES_TOTAL: &str = "memstats_report_failures_total";

pub fn describe() {
    metrics::describe_counter!(SAMPLES_TOTAL, "Samples taken by the memory stats sampler");
    metrics::describe_counter!(REPORTS_TOTAL, "Report lines written by the memory stats reporter");
    metrics::describe_counter!(
        REPORT_FAILURES_TOTAL,
        "Reports that could not be encoded or written"
    );
}

pub fn sample_taken() {
    metrics::counter!(SAMPLES_TOTAL).increment(1);
}

pub fn report_written() {
    metrics::counter!(REPORTS_TOTAL).increment(1);
}

pub fn report_failed() {
    metrics::counter!(REPORT_FAILURES_TOTAL).increment(1);
}
