//! Batch Execution Engine
//!
//! Runs a batch of units on a bounded pool of worker threads under a single
//! wall-clock deadline and returns exactly one result per unit, in
//! submission order.
//!
//! - At most `pool_size` units are in flight at any time
//! - Errors and panics inside a unit become that unit's result
//! - Units still outstanding at the deadline are reported as cancelled
//! - The pool is torn down on every exit path
//!
//! Cancellation is cooperative: a unit blocked inside an external process is
//! no longer waited for, but the process itself is not killed.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::error::{Result, SmokeError};

use super::result::{State, UnitResult};
use super::unit::{Executable, StepError};

/// How long teardown waits for idle workers to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Poll interval while waiting for workers during teardown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(5);

/// A unit paired with its submission index.
type Job = (usize, Box<dyn Executable>);

/// A result paired with the submission index it belongs to.
type Completion = (usize, UnitResult);

/// Runs every unit and returns one result per unit, index-aligned with `units`.
///
/// # Errors
///
/// * [`SmokeError::InvalidArgument`] - `pool_size` or `timeout_seconds` is
///   zero, or a unit id is empty or repeated. No unit runs.
/// * [`SmokeError::EngineFailure`] - the worker pool could not be started.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use smokerunner::execution::{run_batch, CommandUnit, ShellInvoker, Unit};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let units = vec![Unit::new("1", "echo hello")?, Unit::new("2", "exit 1")?];
///     let batch = CommandUnit::boxed_batch(units, Arc::new(ShellInvoker::new()));
///
///     let results = run_batch(batch, 4, 30)?;
///     assert_eq!(results.len(), 2);
///     Ok(())
/// }
/// ```
pub fn run_batch(
    units: Vec<Box<dyn Executable>>,
    pool_size: usize,
    timeout_seconds: u64,
) -> Result<Vec<UnitResult>> {
    if pool_size < 1 {
        return Err(SmokeError::invalid("pool_size must be > 0"));
    }
    if timeout_seconds < 1 {
        return Err(SmokeError::invalid("timeout_seconds must be > 0"));
    }

    let ids: Vec<String> = units.iter().map(|u| u.id().to_string()).collect();
    check_ids(&ids)?;

    if ids.is_empty() {
        info!("No units to run");
        return Ok(Vec::new());
    }

    info!(
        "Processing {} unit(s) (pool size: {}, timeout: {}s, system threads: {})",
        ids.len(),
        pool_size,
        timeout_seconds,
        num_cpus::get()
    );

    // A deadline past the end of the clock means no deadline at all
    let deadline = Instant::now().checked_add(Duration::from_secs(timeout_seconds));
    if deadline.is_none() {
        debug!("Timeout of {}s is beyond the clock, waiting without a deadline", timeout_seconds);
    }

    // Queue every unit up front, in submission order
    let (job_tx, job_rx): (Sender<Job>, Receiver<Job>) = channel();
    for job in units.into_iter().enumerate() {
        job_tx
            .send(job)
            .map_err(|_| SmokeError::EngineFailure("job queue closed during submission".into()))?;
    }
    drop(job_tx);

    let (done_tx, done_rx): (Sender<Completion>, Receiver<Completion>) = channel();
    let pool = WorkerPool::start(pool_size.min(ids.len()), job_rx, done_tx)?;

    let (slots, timed_out) = collect(&done_rx, ids.len(), deadline);

    // Stop waiting before building synthetic results
    drop(pool);

    Ok(correlate(ids, slots, timed_out, timeout_seconds))
}

/// Rejects empty and duplicate ids.
fn check_ids(ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if id.is_empty() {
            return Err(SmokeError::invalid("unit id cannot be empty"));
        }
        if !seen.insert(id.as_str()) {
            return Err(SmokeError::invalid(format!("duplicate unit id '{}'", id)));
        }
    }
    Ok(())
}

/// Waits for completions until every slot is filled or the deadline passes.
///
/// Returns the slots and whether the deadline expired. Without a deadline
/// it waits until every slot is filled or the pool stops.
fn collect(
    done_rx: &Receiver<Completion>,
    count: usize,
    deadline: Option<Instant>,
) -> (Vec<Option<UnitResult>>, bool) {
    let mut slots: Vec<Option<UnitResult>> = vec![None; count];
    let mut outstanding = count;

    while outstanding > 0 {
        let received = match deadline {
            Some(deadline) => {
                let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                    return (slots, true);
                };
                done_rx.recv_timeout(remaining)
            }
            None => done_rx
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok((index, result)) => match slots.get_mut(index) {
                Some(slot) => {
                    if slot.is_none() {
                        outstanding -= 1;
                    }
                    *slot = Some(result);
                }
                None => error!("Discarding result for unknown submission index {}", index),
            },
            Err(RecvTimeoutError::Timeout) => return (slots, true),
            Err(RecvTimeoutError::Disconnected) => {
                error!(
                    "Worker pool stopped with {} unit(s) outstanding",
                    outstanding
                );
                return (slots, false);
            }
        }
    }

    (slots, false)
}

/// Pairs every submitted id with exactly one result.
fn correlate(
    ids: Vec<String>,
    slots: Vec<Option<UnitResult>>,
    timed_out: bool,
    timeout_seconds: u64,
) -> Vec<UnitResult> {
    ids.into_iter()
        .zip(slots)
        .map(|(id, slot)| match slot {
            Some(result) if result.id() == id => result,
            Some(result) => {
                error!(
                    "Internal consistency error: unit [{}] produced a result for [{}]",
                    id,
                    result.id()
                );
                let message = format!(
                    "EXEC_ERROR: id [{}], internal consistency error, result reported for [{}]",
                    id,
                    result.id()
                );
                UnitResult::new(id, State::ExecError, result.elapsed(), message)
            }
            None if timed_out => {
                warn!(
                    "Unit [{}] cancelled due to batch timeout of {}s",
                    id, timeout_seconds
                );
                let message = format!(
                    "EXEC_ERROR: id [{}], cancelled after batch timeout of {} second(s)",
                    id, timeout_seconds
                );
                UnitResult::new(id, State::ExecError, Duration::ZERO, message)
            }
            None => {
                let message = format!(
                    "EXEC_ERROR: id [{}], engine error, worker pool stopped before the unit completed",
                    id
                );
                UnitResult::new(id, State::ExecError, Duration::ZERO, message)
            }
        })
        .collect()
}

/// Drives one unit through its lifecycle, never letting an error or panic escape.
fn run_adapter(mut unit: Box<dyn Executable>) -> UnitResult {
    let start = Instant::now();
    let id = unit.id().to_string();

    debug!("Processing unit [{}]", id);

    let outcome = panic::catch_unwind(AssertUnwindSafe(
        || -> std::result::Result<UnitResult, StepError> {
            unit.pre_execute()?;
            unit.execute()?;
            unit.post_execute()?;
            unit.validate()
        },
    ));

    let message = match outcome {
        Ok(Ok(result)) => {
            debug!(
                "Unit [{}] finished with {} in {:.2?}",
                id,
                result.state(),
                start.elapsed()
            );
            return result;
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };

    warn!(
        "Problem running unit [{}] after {:.2?}: {}",
        id,
        start.elapsed(),
        message
    );
    UnitResult::new(id, State::UserError, start.elapsed(), message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unit panicked".to_string()
    }
}

/// Fixed-size pool of worker threads pulling from a shared job queue.
struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

impl WorkerPool {
    fn start(size: usize, jobs: Receiver<Job>, done: Sender<Completion>) -> Result<Self> {
        let jobs = Arc::new(Mutex::new(jobs));
        let mut pool = Self {
            handles: Vec::with_capacity(size),
            cancelled: Arc::new(AtomicBool::new(false)),
        };

        for n in 0..size {
            let jobs = Arc::clone(&jobs);
            let done = done.clone();
            let cancelled = Arc::clone(&pool.cancelled);

            let handle = thread::Builder::new()
                .name(format!("smoke-worker-{}", n))
                .spawn(move || worker_loop(&jobs, &done, &cancelled))
                .map_err(|e| {
                    SmokeError::EngineFailure(format!("failed to start worker {}: {}", n, e))
                })?;

            pool.handles.push(handle);
        }

        Ok(pool)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);

        let grace_end = Instant::now() + SHUTDOWN_GRACE;
        let mut detached = 0;

        for handle in self.handles.drain(..) {
            while !handle.is_finished() && Instant::now() < grace_end {
                thread::sleep(SHUTDOWN_POLL);
            }

            if handle.is_finished() {
                if handle.join().is_err() {
                    error!("Worker thread panicked");
                }
            } else {
                detached += 1;
            }
        }

        if detached > 0 {
            warn!(
                "{} worker(s) still busy with cancelled units were detached",
                detached
            );
        }
    }
}

fn worker_loop(jobs: &Mutex<Receiver<Job>>, done: &Sender<Completion>, cancelled: &AtomicBool) {
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };

        let Ok((index, unit)) = job else {
            break;
        };

        if cancelled.load(Ordering::SeqCst) {
            debug!("Skipping unit [{}], batch cancelled", unit.id());
            break;
        }

        let result = run_adapter(unit);

        if done.send((index, result)).is_err() {
            break;
        }
    }
}
