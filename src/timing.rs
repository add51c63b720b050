//! Coarse timing base shared by the state machines.
//!
//! A single background thread increments a monotonic tick count once per
//! period (nominally one second). Waiting is a blocking call on a condition
//! variable, so the state machines never spin while they wait. There is
//! exactly one writer (the tick thread) and the waits only read.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use log::trace;

#[derive(Debug, Default)]
struct Shared {
    ticks: Mutex<u64>,
    tick: Condvar,
    stopped: AtomicBool,
}

/// The tick source. Dropping it stops the tick thread.
#[derive(Debug)]
pub struct Ticker {
    shared: Arc<Shared>,
    period: Duration,
}

impl Ticker {
    pub fn start(period: Duration) -> Self {
        let shared = Arc::new(Shared::default());
        let writer = Arc::clone(&shared);
        thread::spawn(move || loop {
            thread::sleep(period);
            if writer.stopped.load(Ordering::Acquire) {
                break;
            }
            // A poisoned lock only means a waiter panicked, the count itself is
            // still valid.
            let mut ticks = writer.ticks.lock().unwrap_or_else(|e| e.into_inner());
            *ticks += 1;
            writer.tick.notify_all();
        });
        Ticker { shared, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks elapsed since the ticker started.
    pub fn now(&self) -> u64 {
        *self.shared.ticks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until `seconds` full ticks have elapsed from now.
    ///
    /// The tick thread never stops, so a wait starting just before a tick
    /// boundary would see that boundary almost at once. The wait therefore
    /// also lasts at least `seconds` whole periods of wall time, which makes
    /// every wait start its own tick phase.
    pub fn wait_seconds(&self, seconds: u32) {
        trace!("waiting {} tick(s)", seconds);
        let deadline = Instant::now() + self.period * seconds;
        let mut ticks = self.shared.ticks.lock().unwrap_or_else(|e| e.into_inner());
        let target = *ticks + u64::from(seconds);
        loop {
            let now = Instant::now();
            if *ticks >= target && now >= deadline {
                return;
            }
            ticks = if *ticks < target {
                self.shared
                    .tick
                    .wait(ticks)
                    .unwrap_or_else(|e| e.into_inner())
            } else {
                self.shared
                    .tick
                    .wait_timeout(ticks, deadline - now)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|e| e.into_inner().0)
            };
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shared.stopped.store(true, Ordering::Release);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
