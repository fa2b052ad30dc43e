// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Worker thread running a task periodically or on demand.
//!
//! [`PeriodicTask`] owns one named OS thread. Each iteration:
//! 1. waits while suspended, unless signaled (a signal grants one run)
//! 2. runs the task
//! 3. sleeps `period - execution_time` (no sleep on overrun)
//!
//! Signals are counted: a suspended task runs once per signal, including
//! signals that arrive while it is running. A suspended task with a zero
//! period therefore runs exactly as often as it is signaled,
//! which is how the asynchronous publisher drives its push loop.
//!
//! # Example
//!
//! ```rust
//! use rtm_core::task::PeriodicTask;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&runs);
//!
//! let task = PeriodicTask::new("doc-task");
//! task.set_task(move || {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! task.suspend();
//! task.activate().expect("spawn worker");
//!
//! task.signal();
//! std::thread::sleep(Duration::from_millis(50));
//! task.finalize();
//! assert!(runs.load(Ordering::Relaxed) >= 1);
//! ```

use crate::error::{Error, Result};
use crate::properties::Properties;
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Period of a task running at `rate` Hz, or `None` when the rate is not
/// a positive finite number or its period does not fit a `Duration`.
pub fn period_from_rate(rate: f64) -> Option<Duration> {
    if !(rate.is_finite() && rate > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(rate.recip()).ok()
}

/// Maximum samples kept by a [`TimeMeasure`].
pub const TIME_MEASURE_CAPACITY: usize = 1000;

/// Summary of recorded intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub max: Duration,
    pub min: Duration,
    pub mean: Duration,
    pub stddev: Duration,
    pub count: usize,
}

/// Rolling record of time intervals (execution time, period jitter).
#[derive(Debug, Clone)]
pub struct TimeMeasure {
    samples: Vec<Duration>,
    next: usize,
    started: Option<Instant>,
    last_tick: Option<Instant>,
}

impl TimeMeasure {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(TIME_MEASURE_CAPACITY),
            next: 0,
            started: None,
            last_tick: None,
        }
    }

    /// Start an interval.
    pub fn tick(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the interval opened by [`tick`](Self::tick) and record it.
    pub fn tack(&mut self) -> Option<Duration> {
        let elapsed = self.started.take()?.elapsed();
        self.record(elapsed);
        Some(elapsed)
    }

    /// Record the time since the previous `lap` (period measurement).
    pub fn lap(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let interval = self.last_tick.map(|t| now.duration_since(t));
        self.last_tick = Some(now);
        if let Some(d) = interval {
            self.record(d);
        }
        interval
    }

    pub fn record(&mut self, interval: Duration) {
        if self.samples.len() < TIME_MEASURE_CAPACITY {
            self.samples.push(interval);
        } else {
            self.samples[self.next] = interval;
        }
        self.next = (self.next + 1) % TIME_MEASURE_CAPACITY;
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.next = 0;
        self.started = None;
        self.last_tick = None;
    }

    /// `None` until at least one interval was recorded.
    pub fn statistics(&self) -> Option<Statistics> {
        let n = self.samples.len();
        if n == 0 {
            return None;
        }
        let secs: Vec<f64> = self.samples.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / n as f64;
        let var = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        Some(Statistics {
            max: self.samples.iter().copied().max().unwrap_or_default(),
            min: self.samples.iter().copied().min().unwrap_or_default(),
            mean: Duration::from_secs_f64(mean),
            stddev: Duration::from_secs_f64(var.sqrt()),
            count: n,
        })
    }
}

impl Default for TimeMeasure {
    fn default() -> Self {
        Self::new()
    }
}

type TaskFn = Box<dyn FnMut() + Send + 'static>;

#[derive(Debug)]
struct TaskState {
    alive: bool,
    suspended: bool,
    /// Runs owed to `signal` calls.
    signaled: usize,
    period: Duration,
    measure_exec: bool,
    measure_period: bool,
}

struct Shared {
    state: Mutex<TaskState>,
    cond: Condvar,
    exec_time: Mutex<TimeMeasure>,
    period_time: Mutex<TimeMeasure>,
}

/// Named worker thread with suspend / resume / signal control.
pub struct PeriodicTask {
    name: String,
    shared: Arc<Shared>,
    task: Mutex<Option<TaskFn>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                state: Mutex::new(TaskState {
                    alive: false,
                    suspended: false,
                    signaled: 0,
                    period: Duration::ZERO,
                    measure_exec: false,
                    measure_period: false,
                }),
                cond: Condvar::new(),
                exec_time: Mutex::new(TimeMeasure::new()),
                period_time: Mutex::new(TimeMeasure::new()),
            }),
            task: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body run on every iteration. Must be set before [`activate`](Self::activate).
    pub fn set_task(&self, task: impl FnMut() + Send + 'static) {
        *self.task.lock() = Some(Box::new(task));
    }

    /// Interval between iteration starts. Zero means back to back.
    pub fn set_period(&self, period: Duration) {
        self.shared.state.lock().period = period;
        self.shared.cond.notify_all();
    }

    pub fn period(&self) -> Duration {
        self.shared.state.lock().period
    }

    /// Spawn the worker thread.
    pub fn activate(&self) -> Result<()> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Err(Error::PreconditionNotMet(format!(
                "task '{}' already active",
                self.name
            )));
        }
        let mut task = self.task.lock().take().ok_or_else(|| {
            Error::PreconditionNotMet(format!("task '{}' has no body", self.name))
        })?;
        self.shared.state.lock().alive = true;

        let shared = Arc::clone(&self.shared);
        let name = self.name.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run(&name, &shared, &mut task));
        match spawned {
            Ok(h) => {
                *handle = Some(h);
                log::debug!("[PeriodicTask::activate] '{}' started", self.name);
                Ok(())
            }
            Err(e) => {
                self.shared.state.lock().alive = false;
                Err(Error::ThreadSpawn(e))
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.shared.state.lock().alive
    }

    /// Stop running iterations until resumed or signaled.
    pub fn suspend(&self) {
        self.shared.state.lock().suspended = true;
    }

    pub fn resume(&self) {
        self.shared.state.lock().suspended = false;
        self.shared.cond.notify_all();
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.state.lock().suspended
    }

    /// Request one run of a suspended task.
    pub fn signal(&self) {
        self.shared.state.lock().signaled += 1;
        self.shared.cond.notify_all();
    }

    /// Stop the worker and wait for the running iteration to finish.
    pub fn finalize(&self) {
        {
            let mut st = self.shared.state.lock();
            st.alive = false;
            st.suspended = false;
        }
        self.shared.cond.notify_all();
        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() == thread::current().id() {
                // Finalized from inside the task: the loop exits on its own.
                return;
            }
            if handle.join().is_err() {
                log::error!("[PeriodicTask::finalize] '{}' task panicked", self.name);
            }
        }
    }

    pub fn execution_measure(&self, enable: bool) {
        self.shared.state.lock().measure_exec = enable;
    }

    pub fn period_measure(&self, enable: bool) {
        self.shared.state.lock().measure_period = enable;
    }

    /// Apply `measurement.exec_time` / `measurement.period_time`
    /// (`enable` | `disable`, default disabled).
    pub fn configure_measurement(&self, props: &Properties) {
        self.execution_measure(props.flag("measurement.exec_time", "enable", "disable", false));
        self.period_measure(props.flag("measurement.period_time", "enable", "disable", false));
    }

    pub fn execution_statistics(&self) -> Option<Statistics> {
        self.shared.exec_time.lock().statistics()
    }

    pub fn period_statistics(&self) -> Option<Statistics> {
        self.shared.period_time.lock().statistics()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}

fn run(name: &str, shared: &Shared, task: &mut TaskFn) {
    loop {
        let (period, measure_exec, measure_period) = {
            let mut st = shared.state.lock();
            while st.alive && st.suspended && st.signaled == 0 {
                shared.cond.wait(&mut st);
            }
            if !st.alive {
                break;
            }
            st.signaled = st.signaled.saturating_sub(1);
            (st.period, st.measure_exec, st.measure_period)
        };

        if measure_period {
            shared.period_time.lock().lap();
        }
        let started = Instant::now();
        if catch_unwind(AssertUnwindSafe(|| task())).is_err() {
            log::error!("[PeriodicTask] '{}' iteration panicked", name);
        }
        let exec = started.elapsed();
        if measure_exec {
            shared.exec_time.lock().record(exec);
        }

        if let Some(rest) = period.checked_sub(exec).filter(|d| !d.is_zero()) {
            let deadline = Instant::now() + rest;
            let mut st = shared.state.lock();
            while st.alive {
                if shared.cond.wait_until(&mut st, deadline).timed_out() {
                    break;
                }
            }
        }
    }
    log::trace!("[PeriodicTask] '{}' worker exiting", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(name: &str) -> (PeriodicTask, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let task = PeriodicTask::new(name);
        task.set_task(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (task, count)
    }

    #[test]
    fn test_suspended_task_runs_on_signal_only() {
        let (task, count) = counting_task("t-signal");
        task.suspend();
        task.activate().expect("activate");
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        task.signal();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        task.finalize();
    }

    #[test]
    fn test_periodic_rate() {
        let (task, count) = counting_task("t-period");
        task.set_period(Duration::from_millis(10));
        task.activate().expect("activate");
        thread::sleep(Duration::from_millis(105));
        task.finalize();
        let n = count.load(Ordering::SeqCst);
        assert!((5..=13).contains(&n), "ran {} times", n);
    }

    #[test]
    fn test_activate_twice_fails() {
        let (task, _count) = counting_task("t-twice");
        task.suspend();
        task.activate().expect("activate");
        assert!(matches!(task.activate(), Err(Error::PreconditionNotMet(_))));
    }

    #[test]
    fn test_activate_without_body_fails() {
        let task = PeriodicTask::new("t-empty");
        assert!(task.activate().is_err());
    }

    #[test]
    fn test_finalize_interrupts_sleep() {
        let (task, _count) = counting_task("t-long");
        task.set_period(Duration::from_secs(10));
        task.activate().expect("activate");
        thread::sleep(Duration::from_millis(10));
        let start = Instant::now();
        task.finalize();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!task.is_alive());
    }

    #[test]
    fn test_panicking_iteration_keeps_worker() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let task = PeriodicTask::new("t-panic");
        task.set_task(move || {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first run fails");
            }
        });
        task.suspend();
        task.activate().expect("activate");
        task.signal();
        task.signal();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(task.is_alive());
        task.finalize();
    }

    #[test]
    fn test_period_from_rate() {
        assert_eq!(period_from_rate(10.0), Some(Duration::from_millis(100)));
        assert_eq!(period_from_rate(1000.0), Some(Duration::from_millis(1)));
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY, 1e-30] {
            assert_eq!(period_from_rate(bad), None, "rate {}", bad);
        }
    }

    #[test]
    fn test_time_measure_statistics() {
        let mut tm = TimeMeasure::new();
        assert!(tm.statistics().is_none());
        tm.record(Duration::from_millis(10));
        tm.record(Duration::from_millis(30));
        let stats = tm.statistics().expect("two samples");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max, Duration::from_millis(30));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert!((stats.mean.as_secs_f64() - 0.020).abs() < 1e-9);
        assert!((stats.stddev.as_secs_f64() - 0.010).abs() < 1e-9);
    }

    #[test]
    fn test_time_measure_capacity() {
        let mut tm = TimeMeasure::new();
        for _ in 0..(TIME_MEASURE_CAPACITY + 10) {
            tm.record(Duration::from_micros(1));
        }
        assert_eq!(tm.count(), TIME_MEASURE_CAPACITY);
    }
}
