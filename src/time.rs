//! Monotonic time sources.
//!
//! Time is expressed as the `Duration` elapsed since the clock was created. Call deadlines are
//! computed from and compared against `Clock::now`, so a clock must never go backwards.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Current monotonic time
    fn now(&self) -> Duration;

    /// Let `duration` pass. The scheduling driver calls this between spins.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::time::Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    start_time: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated clock that only moves when told to. Clones share the same time, so several nodes
/// can run against one timeline.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<Duration>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[test]
fn test_sim_clock_shared() {
    let clock = SimClock::new();
    let other = clock.clone();
    assert_eq!(Duration::ZERO, other.now());

    clock.advance(Duration::from_millis(20));
    other.sleep(Duration::from_millis(5));
    assert_eq!(Duration::from_millis(25), clock.now());
}

#[test]
fn test_system_clock_monotonic() {
    let clock = SystemClock::new();
    let t0 = clock.now();
    clock.sleep(Duration::from_millis(1));
    assert!(clock.now() > t0);
}
