//! Stop signalling and fixed-cadence pacing for worker threads
//!
//! [`StopSignal`] is the one piece of mutable state shared by every worker in
//! a run. [`Pacer`] turns "wait until the interval has elapsed" into a call
//! that returns as soon as the signal fires, so shutdown never has to wait
//! out a full interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct StopState {
    stopped: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

/// Shared run/stop flag.
///
/// Goes from running to stopped at most once. A new run gets a new signal.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    state: Arc<StopState>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal stop. Returns true only for the call that flipped the flag.
    pub fn stop(&self) -> bool {
        let flipped = !self.state.stopped.swap(true, Ordering::SeqCst);
        if flipped {
            // Taking the lock orders the store before any waiter re-checks.
            let _guard = self.state.lock.lock().unwrap_or_else(|e| e.into_inner());
            self.state.wake.notify_all();
        }
        flipped
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`. Returns true if stop was signalled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match self.state.wake.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Result of waiting for the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The interval elapsed; run one cycle
    Ready,
    /// Stop was signalled; leave the loop
    Cancelled,
}

/// Deadline timer producing one tick per interval.
///
/// The next deadline is set when a tick is handed out, so a cycle that
/// overruns the interval starts the next one right away instead of
/// accumulating a backlog.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    deadline: Instant,
    stop: StopSignal,
}

impl Pacer {
    /// First tick fires one interval from now
    pub fn new(interval: Duration, stop: StopSignal) -> Self {
        Self {
            interval,
            deadline: Instant::now() + interval,
            stop,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the current deadline, or until stop is signalled
    pub fn wait_next_tick(&mut self) -> Tick {
        if self.stop.is_stopped() {
            return Tick::Cancelled;
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if self.stop.wait_timeout(remaining) {
            return Tick::Cancelled;
        }
        self.deadline = Instant::now() + self.interval;
        Tick::Ready
    }

    /// Signal stop for every pacer sharing this signal
    pub fn cancel(&self) {
        self.stop.stop();
    }
}
