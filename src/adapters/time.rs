//! Millisecond clocks.
//!
//! - [`SystemClock`]: `std::time::Instant` since construction, for the
//!   simulation binary.
//! - [`ManualClock`]: stepped by hand, for deterministic timeout tests.

use crate::app::ports::ClockPort;

/// Monotonic wall clock.
pub struct SystemClock {
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now_ms: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    pub fn set(&mut self, ms: u64) {
        self.now_ms = ms;
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}
