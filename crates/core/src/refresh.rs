//! Self-rescheduling refresh loop
//!
//! A `RefreshScheduler` runs an async action forever at a fixed cadence
//! until stopped. The next run is scheduled only after the previous one has
//! settled, so the cadence is "interval after completion" and two runs never
//! overlap, even when the action takes longer than the interval.
//!
//! Failures don't stop the schedule and there is no backoff: the cadence is
//! a configuration value, not something the loop adapts.

use anyhow::Result;
use arc_swap::ArcSwap;
use log::{debug, error, trace};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Boxed future returned by refresh actions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type ActionFn<T> = dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync;
type SuccessFn<T> = dyn Fn(T) + Send + Sync;
type ErrorFn = dyn Fn(anyhow::Error) + Send + Sync;

/// The latest action and callbacks, swapped as a unit
struct RefreshCallbacks<T> {
    action: Arc<ActionFn<T>>,
    on_success: Arc<SuccessFn<T>>,
    on_error: Arc<ErrorFn>,
}

/// State shared between the scheduler handle and its task
struct Shared<T> {
    name: String,
    callbacks: ArcSwap<RefreshCallbacks<T>>,
    /// Set while an action is in flight. Survives restarts of the loop task.
    running: AtomicBool,
    trigger: Notify,
    settled: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of a scheduler's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSession {
    /// Whether the loop task is started
    pub is_active: bool,
    /// Whether an action is in flight right now
    pub is_running: bool,
    pub interval: Duration,
    /// Runs that settled and were reported (success or failure)
    pub settled: u64,
    /// Runs that settled with an error
    pub failed: u64,
}

/// Periodic, overlap-free runner for an async refresh action
pub struct RefreshScheduler<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    interval_tx: watch::Sender<Duration>,
    immediate: bool,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> RefreshScheduler<T> {
    /// Create a stopped scheduler. Call `start()` from inside a tokio runtime.
    pub fn new<F, Fut>(name: &str, interval: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let success_name = name.to_string();
        let error_name = name.to_string();
        let callbacks = RefreshCallbacks {
            action: box_action(action),
            on_success: Arc::new(move |_| debug!("Refresh of {} successful", success_name)),
            on_error: Arc::new(move |e| error!("Refresh of {} failed: {:#}", error_name, e)),
        };

        Self {
            shared: Arc::new(Shared {
                name: name.to_string(),
                callbacks: ArcSwap::from_pointee(callbacks),
                running: AtomicBool::new(false),
                trigger: Notify::new(),
                settled: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
            interval_tx: watch::channel(interval).0,
            immediate: true,
            stop_tx: None,
            task: None,
        }
    }

    /// Whether the first run fires on start (default) or after one interval
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Callback for each successful run
    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.set_on_success(callback);
        self
    }

    /// Callback for each failed run
    pub fn on_error<F>(self, callback: F) -> Self
    where
        F: Fn(anyhow::Error) + Send + Sync + 'static,
    {
        self.set_on_error(callback);
        self
    }

    /// Replace the action. The next run uses it, even if the loop is running.
    pub fn set_action<F, Fut>(&self, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let action = box_action(action);
        self.shared.callbacks.rcu(|current| RefreshCallbacks {
            action: Arc::clone(&action),
            on_success: Arc::clone(&current.on_success),
            on_error: Arc::clone(&current.on_error),
        });
    }

    pub fn set_on_success<F>(&self, callback: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let callback: Arc<SuccessFn<T>> = Arc::new(callback);
        self.shared.callbacks.rcu(|current| RefreshCallbacks {
            action: Arc::clone(&current.action),
            on_success: Arc::clone(&callback),
            on_error: Arc::clone(&current.on_error),
        });
    }

    pub fn set_on_error<F>(&self, callback: F)
    where
        F: Fn(anyhow::Error) + Send + Sync + 'static,
    {
        let callback: Arc<ErrorFn> = Arc::new(callback);
        self.shared.callbacks.rcu(|current| RefreshCallbacks {
            action: Arc::clone(&current.action),
            on_success: Arc::clone(&current.on_success),
            on_error: Arc::clone(&callback),
        });
    }

    /// Start the loop. Does nothing if already started.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let interval_rx = self.interval_tx.subscribe();
        let immediate = self.immediate;

        debug!(
            "Starting refresh of {} every {:?} (immediate: {})",
            self.shared.name,
            self.interval(),
            immediate
        );
        self.task = Some(tokio::spawn(run_loop(shared, interval_rx, immediate, stop_rx)));
        self.stop_tx = Some(stop_tx);
    }

    /// Stop the loop. Pending runs are cancelled; a run already in flight
    /// completes but its result is not reported.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            debug!("Stopped refresh of {}", self.shared.name);
        }
        // Detach rather than abort so an in-flight action can finish
        self.task = None;
    }

    /// Change the interval without restarting the loop.
    ///
    /// A run in flight settles and is reported as usual; the next run starts
    /// the new interval after the last one settled.
    pub fn set_interval(&self, interval: Duration) {
        let previous = self.interval_tx.send_replace(interval);
        if previous != interval {
            debug!(
                "Refresh interval of {} changed from {:?} to {:?}",
                self.shared.name, previous, interval
            );
        }
    }

    /// Request a run now.
    ///
    /// Returns `false` and drops the request when a run is in flight or the
    /// loop isn't started. Requests are never queued.
    pub fn trigger(&self) -> bool {
        if self.task.is_none() {
            return false;
        }
        if self.shared.running.load(Ordering::SeqCst) {
            trace!("Refresh of {} already running, trigger dropped", self.shared.name);
            return false;
        }
        self.shared.trigger.notify_one();
        true
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    pub fn session(&self) -> RefreshSession {
        RefreshSession {
            is_active: self.task.is_some(),
            is_running: self.shared.running.load(Ordering::SeqCst),
            interval: self.interval(),
            settled: self.shared.settled.load(Ordering::SeqCst),
            failed: self.shared.failed.load(Ordering::SeqCst),
        }
    }
}

impl<T: Send + 'static> Drop for RefreshScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn box_action<T, F, Fut>(action: F) -> Arc<ActionFn<T>>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || Box::pin(action()) as BoxFuture<'static, Result<T>>)
}

async fn run_loop<T: Send + 'static>(
    shared: Arc<Shared<T>>,
    mut interval_rx: watch::Receiver<Duration>,
    immediate: bool,
    mut stop_rx: watch::Receiver<bool>,
) {
    if !immediate {
        let started_at = Instant::now();
        if !wait_for_next(&shared, started_at, &mut interval_rx, &mut stop_rx).await {
            return;
        }
    }

    loop {
        // Stopped before the task was first polled
        if *stop_rx.borrow() {
            break;
        }
        run_once(&shared, &stop_rx).await;
        if *stop_rx.borrow() {
            break;
        }
        let settled_at = Instant::now();
        if !wait_for_next(&shared, settled_at, &mut interval_rx, &mut stop_rx).await {
            break;
        }
    }
    trace!("Refresh loop of {} exited", shared.name);
}

/// Sleep until one interval after `from`, or until triggered.
/// An interval change re-targets the sleep. Returns `false` when stopped.
async fn wait_for_next<T>(
    shared: &Shared<T>,
    from: Instant,
    interval_rx: &mut watch::Receiver<Duration>,
    stop_rx: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        let deadline = from + *interval_rx.borrow_and_update();
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return true,
            _ = shared.trigger.notified() => return true,
            _ = stop_rx.changed() => return false,
            Ok(()) = interval_rx.changed() => continue,
        }
    }
}

/// Clears the in-flight flag however the run ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn run_once<T: Send + 'static>(shared: &Shared<T>, stop_rx: &watch::Receiver<bool>) {
    if shared.running.swap(true, Ordering::SeqCst) {
        trace!("Refresh of {} still in flight, run skipped", shared.name);
        return;
    }

    let result = {
        let _guard = RunningGuard(&shared.running);
        let action = Arc::clone(&shared.callbacks.load().action);
        // A panicking action is reported as a failed run
        match tokio::spawn(action()).await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("refresh action did not complete: {}", e)),
        }
    };

    if *stop_rx.borrow() {
        debug!("Refresh of {} settled after stop, result discarded", shared.name);
        return;
    }

    let callbacks = shared.callbacks.load_full();
    shared.settled.fetch_add(1, Ordering::SeqCst);
    match result {
        Ok(value) => (callbacks.on_success)(value),
        Err(e) => {
            shared.failed.fetch_add(1, Ordering::SeqCst);
            (callbacks.on_error)(e)
        }
    }
}
