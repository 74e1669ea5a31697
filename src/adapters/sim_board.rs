//! Simulated local board.
//!
//! Pin levels are injected by tests or the simulation binary; every write
//! is recorded so callers can assert on the full command history without
//! touching real GPIO/PWM registers.

use std::collections::HashMap;

use crate::app::ports::{HardwarePort, PinMode};

/// One local pin write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalWrite {
    pub pin: u8,
    pub value: i32,
    pub analog: bool,
}

#[derive(Debug, Default)]
pub struct SimBoard {
    levels: HashMap<u8, i32>,
    modes: HashMap<u8, PinMode>,
    writes: Vec<LocalWrite>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the next read of `pin` returns.  Unset pins read 0.
    pub fn set_level(&mut self, pin: u8, value: i32) {
        self.levels.insert(pin, value);
    }

    pub fn level(&self, pin: u8) -> i32 {
        self.levels.get(&pin).copied().unwrap_or(0)
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.modes.get(&pin).copied()
    }

    pub fn writes(&self) -> &[LocalWrite] {
        &self.writes
    }

    pub fn last_write(&self, pin: u8) -> Option<LocalWrite> {
        self.writes.iter().rev().find(|w| w.pin == pin).copied()
    }

    fn record(&mut self, pin: u8, value: i32, analog: bool) {
        self.levels.insert(pin, value);
        self.writes.push(LocalWrite { pin, value, analog });
    }
}

impl HardwarePort for SimBoard {
    fn configure(&mut self, pin: u8, mode: PinMode) {
        self.modes.insert(pin, mode);
    }

    fn digital_read(&mut self, pin: u8) -> i32 {
        self.level(pin)
    }

    fn analog_read(&mut self, pin: u8) -> i32 {
        self.level(pin)
    }

    fn digital_write(&mut self, pin: u8, value: i32) {
        self.record(pin, value, false);
    }

    fn analog_write(&mut self, pin: u8, value: i32) {
        self.record(pin, value, true);
    }
}
