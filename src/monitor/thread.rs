use crate::{
    config::{Composition, MonitorConfig},
    error::MonitorError,
    instrument,
    record::Metrics,
    sink::ReportWriter,
};
use crossbeam::{
    channel::{self, Receiver, Sender, TryRecvError},
    select,
    sync::WaitGroup,
};
use parking_lot::Mutex;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

/// A stop signal observed by every loop of a monitor.
///
/// Triggering drops the only sender, which every listener sees as a
/// disconnect; there is no message to consume, so no listener can take the
/// signal away from another. Triggering more than once is a no-op.
#[derive(Debug, Clone)]
pub struct Shutdown {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    stopped: Receiver<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (sender, stopped) = channel::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(sender))),
            stopped,
        }
    }

    /// Signals every loop to stop. Returns `false` if already triggered.
    pub fn trigger(&self) -> bool {
        self.trigger.lock().take().is_some()
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(self.stopped.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until the signal is triggered.
    pub fn wait(&self) {
        let _ = self.stopped.recv();
    }
}

/// Triggers the stop signal when dropped, including while a loop unwinds, so
/// one loop panicking never leaves the other running.
struct StopOnDrop(Shutdown);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.trigger();
    }
}

/// Handle to a running monitor.
///
/// Dropping the handle does not stop the loops; call [`MonitorHandle::stop`].
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: Shutdown,
    done: WaitGroup,
    reporter: JoinHandle<Result<(), MonitorError>>,
    sampler: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// A clone of the stop signal, e.g. for a Ctrl+C handler.
    #[must_use]
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Whether both loops have exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.reporter.is_finished() && self.sampler.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops both loops and waits for them.
    ///
    /// # Errors
    /// Returns the error that made the reporter give up, if any, or
    /// [`MonitorError::Panicked`] if a loop panicked.
    pub fn stop(self) -> Result<(), MonitorError> {
        self.shutdown.trigger();
        self.join()
    }

    /// Waits for both loops without stopping them.
    ///
    /// Returns once the stop signal is triggered elsewhere, the reporter
    /// fails, or either loop panics.
    ///
    /// # Errors
    /// Same as [`MonitorHandle::stop`].
    pub fn join(self) -> Result<(), MonitorError> {
        self.done.wait();
        let sampler = self.sampler.map(JoinHandle::join);
        let reported = self
            .reporter
            .join()
            .map_err(|_| MonitorError::Panicked("reporter"))?;
        if matches!(sampler, Some(Err(_))) {
            return Err(MonitorError::Panicked("sampler"));
        }
        reported
    }
}

pub fn start<M: Metrics>(
    metrics: Arc<M>,
    config: MonitorConfig,
    writer: ReportWriter,
) -> Result<MonitorHandle, MonitorError> {
    let shutdown = Shutdown::new();
    let done = WaitGroup::new();

    let sampler = match config.composition {
        Composition::Flat => Some(spawn_sampler(
            Arc::clone(&metrics),
            config.effective_sample_interval(),
            shutdown.clone(),
            done.clone(),
        )?),
        Composition::Nested => None,
    };

    let reporter = match spawn_reporter(metrics, config, writer, shutdown.clone(), done.clone()) {
        Ok(reporter) => reporter,
        Err(e) => {
            shutdown.trigger();
            if let Some(sampler) = sampler {
                let _ = sampler.join();
            }
            return Err(e.into());
        }
    };

    Ok(MonitorHandle {
        shutdown,
        done,
        reporter,
        sampler,
    })
}

fn spawn_sampler<M: Metrics>(
    metrics: Arc<M>,
    interval: Duration,
    shutdown: Shutdown,
    done: WaitGroup,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("memstats-sampler".into())
        .spawn(move || {
            let _stop = StopOnDrop(shutdown.clone());
            run_sampler(&*metrics, interval, &shutdown);
            drop(done);
        })
}

fn spawn_reporter<M: Metrics>(
    metrics: Arc<M>,
    config: MonitorConfig,
    mut writer: ReportWriter,
    shutdown: Shutdown,
    done: WaitGroup,
) -> std::io::Result<JoinHandle<Result<(), MonitorError>>> {
    thread::Builder::new()
        .name("memstats-reporter".into())
        .spawn(move || -> Result<(), MonitorError> {
            let _stop = StopOnDrop(shutdown.clone());
            let sampler = match config.composition {
                Composition::Flat => None,
                Composition::Nested => Some(spawn_sampler(
                    Arc::clone(&metrics),
                    config.effective_sample_interval(),
                    shutdown.clone(),
                    done.clone(),
                )?),
            };

            let mut result = run_reporter(&*metrics, config.report_interval, &mut writer, &shutdown);

            if let Some(sampler) = sampler {
                shutdown.trigger();
                if sampler.join().is_err() && result.is_ok() {
                    result = Err(MonitorError::Panicked("sampler"));
                }
            }
            drop(done);
            result
        })
}

fn run_sampler<M: Metrics>(metrics: &M, interval: Duration, shutdown: &Shutdown) {
    log::info!("Starting memory stats sampler every {interval:?}");
    let ticker = channel::tick(interval);

    // Take the first sample right away so the first report is never empty.
    metrics.sample();
    instrument::sample_taken();

    loop {
        if shutdown.is_triggered() {
            break;
        }
        select! {
            recv(shutdown.stopped) -> _ => break,
            recv(ticker) -> _ => {
                // A stop that raced the tick wins.
                if shutdown.is_triggered() {
                    break;
                }
                metrics.sample();
                instrument::sample_taken();
                log::trace!("Sampled memory stats");
            }
        }
    }
    log::info!("Stopping memory stats sampler");
}

fn run_reporter<M: Metrics>(
    metrics: &M,
    interval: Duration,
    writer: &mut ReportWriter,
    shutdown: &Shutdown,
) -> Result<(), MonitorError> {
    log::info!("Starting memory stats reporter every {interval:?}");
    let ticker = channel::tick(interval);

    loop {
        if shutdown.is_triggered() {
            break;
        }
        select! {
            recv(shutdown.stopped) -> _ => break,
            recv(ticker) -> _ => {
                if shutdown.is_triggered() {
                    break;
                }
                if let Err(e) = report(metrics, writer) {
                    log::error!("Memory stats reporter failed: {e}");
                    instrument::report_failed();
                    shutdown.trigger();
                    return Err(e);
                }
            }
        }
    }
    log::info!("Stopping memory stats reporter");
    Ok(())
}

fn report<M: Metrics>(metrics: &M, writer: &mut ReportWriter) -> Result<(), MonitorError> {
    let line = metrics.serialize()?;
    writer.write_line(&line)?;
    instrument::report_written();
    log::trace!("Reported memory stats");
    Ok(())
}
