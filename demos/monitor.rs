//! Runs some foreground work while memory statistics are reported in the background.
//!
//! ```sh
//! cargo run --example monitor -- -f 500 --timestamps
//! cargo run --example monitor -- -o memstats.log --nested
//! ```
//!
//! Ctrl+C stops the monitor early; the foreground work carries on.

use clap::Parser;
use memstats_monitor::{Composition, CountingAllocator, MemoryMonitor, MonitorBuilder};
use std::{path::PathBuf, process, sync::Arc, time::Duration};
use tracing_subscriber::filter::LevelFilter;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator::system();

#[derive(Parser, Debug)]
#[command(about = "Report process memory statistics while doing some work")]
struct Args {
    /// Report frequency in milliseconds
    #[arg(short = 'f', long = "frequency", default_value_t = 1000)]
    frequency: u64,

    /// Sample frequency in milliseconds, capped at the report frequency
    #[arg(short = 's', long = "sample", default_value_t = 100)]
    sample: u64,

    /// Write reports to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Prefix reports with the date and time
    #[arg(long)]
    timestamps: bool,

    /// Let the reporter start the sampler
    #[arg(long)]
    nested: bool,
}

impl Args {
    fn builder(&self) -> MonitorBuilder {
        let builder = MonitorBuilder::default()
            .report_interval(Duration::from_millis(self.frequency))
            .sample_interval(Duration::from_millis(self.sample))
            .timestamps(self.timestamps)
            .composition(if self.nested {
                Composition::Nested
            } else {
                Composition::Flat
            });
        match &self.output {
            Some(path) => builder.output_path(path),
            None => builder,
        }
    }
}

// Placeholder for the real work of the application.
fn business_logic() -> Vec<Vec<u8>> {
    let mut retained = Vec::new();
    for round in 1..=5 {
        std::thread::sleep(Duration::from_secs(1));
        retained.push(vec![0u8; 64 * 1024 * round]);
        println!("Doing some crazy stuff to entertain you...");
    }
    retained
}

#[cfg(not(feature = "tokio"))]
fn main() {
    tracing_subscriber::fmt().with_max_level(LevelFilter::INFO).init();
    let args = Args::parse();

    let handle = match args.builder().start(Arc::new(MemoryMonitor::new())) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to start memory monitor: {e}");
            process::exit(1);
        }
    };

    let shutdown = handle.shutdown();
    ctrlc::set_handler(move || {
        shutdown.trigger();
    })
    .expect("Error setting Ctrl-C handler");

    let retained = business_logic();
    println!("Kept {} buffers alive", retained.len());

    if let Err(e) = handle.stop() {
        eprintln!("Memory monitor failed: {e}");
        process::exit(1);
    }
}

#[cfg(feature = "tokio")]
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(LevelFilter::INFO).init();
    let args = Args::parse();

    let handle = match args.builder().start(Arc::new(MemoryMonitor::new())) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to start memory monitor: {e}");
            process::exit(1);
        }
    };

    let shutdown = handle.shutdown();
    ctrlc::set_handler(move || {
        shutdown.trigger();
    })
    .expect("Error setting Ctrl-C handler");

    let retained = tokio::task::spawn_blocking(business_logic)
        .await
        .expect("business logic panicked");
    println!("Kept {} buffers alive", retained.len());

    if let Err(e) = handle.stop().await {
        eprintln!("Memory monitor failed: {e}");
        process::exit(1);
    }
}
