use crate::{
    config::{Composition, MonitorConfig},
    error::MonitorError,
    instrument,
    record::Metrics,
    sink::ReportWriter,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::{self, JoinHandle},
    time::{self, Instant, MissedTickBehavior},
};

/// A stop signal observed by every task of a monitor.
///
/// Backed by a `watch` channel, so any number of tasks can wait on it and none
/// of them consumes it. Triggering more than once is a no-op.
#[derive(Debug, Clone)]
pub struct Shutdown {
    state: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Signals every task to stop. Returns `false` if already triggered.
    pub fn trigger(&self) -> bool {
        !self.state.send_replace(true)
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes once the signal is triggered.
    pub async fn wait(&self) {
        let mut stopped = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }
}

/// Triggers the stop signal when dropped, including when a task panics and
/// its future is dropped, so one task failing never leaves the other running.
struct StopOnDrop(Shutdown);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.trigger();
    }
}

/// Handle to a running monitor.
///
/// Dropping the handle does not stop the tasks; call [`MonitorHandle::stop`].
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: Shutdown,
    reporter: JoinHandle<Result<(), MonitorError>>,
    sampler: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// A clone of the stop signal, e.g. for a Ctrl+C handler.
    #[must_use]
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Whether both tasks have exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.reporter.is_finished() && self.sampler.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops both tasks and waits for them.
    ///
    /// # Errors
    /// Returns the error that made the reporter give up, if any, or
    /// [`MonitorError::Panicked`] if a task panicked.
    pub async fn stop(self) -> Result<(), MonitorError> {
        self.shutdown.trigger();
        self.join().await
    }

    /// Waits for both tasks without stopping them.
    ///
    /// Returns once the stop signal is triggered elsewhere, the reporter
    /// fails, or either task panics.
    ///
    /// # Errors
    /// Same as [`MonitorHandle::stop`].
    pub async fn join(self) -> Result<(), MonitorError> {
        let sampler = match self.sampler {
            Some(sampler) => Some(sampler.await),
            None => None,
        };
        let reported = self
            .reporter
            .await
            .map_err(|_| MonitorError::Panicked("reporter"))?;
        if matches!(sampler, Some(Err(_))) {
            return Err(MonitorError::Panicked("sampler"));
        }
        reported
    }
}

/// Spawns the monitor tasks on the current Tokio runtime.
pub fn start<M: Metrics>(
    metrics: Arc<M>,
    config: MonitorConfig,
    writer: ReportWriter,
) -> Result<MonitorHandle, MonitorError> {
    let shutdown = Shutdown::new();

    let sampler = match config.composition {
        Composition::Flat => Some(task::spawn(run_sampler(
            Arc::clone(&metrics),
            config.effective_sample_interval(),
            shutdown.clone(),
        ))),
        Composition::Nested => None,
    };
    let reporter = task::spawn(run_reporter(metrics, config, writer, shutdown.clone()));

    Ok(MonitorHandle {
        shutdown,
        reporter,
        sampler,
    })
}

async fn run_sampler<M: Metrics>(metrics: Arc<M>, period: Duration, shutdown: Shutdown) {
    let _stop = StopOnDrop(shutdown.clone());
    log::info!("Starting memory stats sampler every {period:?}");
    // The first tick completes immediately, so the first report is never empty.
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shutdown.wait() => break,
            _ = ticker.tick() => {
                metrics.sample();
                instrument::sample_taken();
                log::trace!("Sampled memory stats");
            }
        }
    }
    log::info!("Stopping memory stats sampler");
}

async fn run_reporter<M: Metrics>(
    metrics: Arc<M>,
    config: MonitorConfig,
    mut writer: ReportWriter,
    shutdown: Shutdown,
) -> Result<(), MonitorError> {
    let _stop = StopOnDrop(shutdown.clone());
    let sampler = match config.composition {
        Composition::Flat => None,
        Composition::Nested => Some(task::spawn(run_sampler(
            Arc::clone(&metrics),
            config.effective_sample_interval(),
            shutdown.clone(),
        ))),
    };

    let period = config.report_interval;
    log::info!("Starting memory stats reporter every {period:?}");
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut result = Ok(());
    loop {
        tokio::select! {
            biased;
            () = shutdown.wait() => break,
            _ = ticker.tick() => {
                if let Err(e) = report(&*metrics, &mut writer) {
                    log::error!("Memory stats reporter failed: {e}");
                    instrument::report_failed();
                    shutdown.trigger();
                    result = Err(e);
                    break;
                }
            }
        }
    }

    if let Some(sampler) = sampler {
        shutdown.trigger();
        if sampler.await.is_err() && result.is_ok() {
            result = Err(MonitorError::Panicked("sampler"));
        }
    }
    log::info!("Stopping memory stats reporter");
    result
}

fn report<M: Metrics>(metrics: &M, writer: &mut ReportWriter) -> Result<(), MonitorError> {
    let line = metrics.serialize()?;
    writer.write_line(&line)?;
    instrument::report_written();
    log::trace!("Reported memory stats");
    Ok(())
}
