//! PID controller for PID-type rules
//!
//! Sample-time gated proportional-integral-derivative controller.
//! Gains are pre-scaled by the sample period, the integrator is clamped to
//! the output limits, and switching to automatic is bumpless.

use crate::config::{Direction, PidTuning, ProportionalOn};

/// Whether [`PidController::compute`] does anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidMode {
    Manual,
    Automatic,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    proportional_on: ProportionalOn,
    sample_time_ms: u32,
    output_min: f32,
    output_max: f32,
    mode: PidMode,
    output_sum: f32,
    last_input: f32,
    last_compute_ms: Option<u64>,
    output: f32,
}

impl PidController {
    /// Build a controller in [`PidMode::Manual`].
    pub fn new(tuning: &PidTuning) -> Self {
        let mut pid = Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            proportional_on: tuning.proportional_on,
            sample_time_ms: tuning.sample_time_ms.max(1),
            output_min: 0.0,
            output_max: 0.0,
            mode: PidMode::Manual,
            output_sum: 0.0,
            last_input: 0.0,
            last_compute_ms: None,
            output: 0.0,
        };
        pid.set_limits(tuning.output_min, tuning.output_max);
        pid.set_tunings(tuning.kp, tuning.ki, tuning.kd, tuning.direction);
        pid
    }

    /// Set gains in per-second units.  Negative gains are ignored.
    pub fn set_tunings(&mut self, kp: f32, ki: f32, kd: f32, direction: Direction) {
        if kp < 0.0 || ki < 0.0 || kd < 0.0 {
            return;
        }
        let sample_secs = self.sample_time_ms as f32 / 1000.0;
        self.kp = kp;
        self.ki = ki * sample_secs;
        self.kd = kd / sample_secs;
        if direction == Direction::Reverse {
            self.kp = -self.kp;
            self.ki = -self.ki;
            self.kd = -self.kd;
        }
    }

    /// Set output limits; the current output and integrator are pulled in.
    pub fn set_limits(&mut self, min: f32, max: f32) {
        if min >= max {
            return;
        }
        self.output_min = min;
        self.output_max = max;
        if self.mode == PidMode::Automatic {
            self.output = self.output.clamp(min, max);
            self.output_sum = self.output_sum.clamp(min, max);
        }
    }

    /// Switch mode.  Entering automatic seeds the integrator from the current
    /// output so the first step does not kick.
    pub fn set_mode(&mut self, mode: PidMode, input: f32) {
        if mode == PidMode::Automatic && self.mode == PidMode::Manual {
            self.output_sum = self.output.clamp(self.output_min, self.output_max);
            self.last_input = input;
        }
        self.mode = mode;
    }

    pub fn mode(&self) -> PidMode {
        self.mode
    }

    /// Latest output.
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Run one step if automatic and a sample period has passed.
    /// Returns `true` when the output was recomputed.
    pub fn compute(&mut self, input: f32, setpoint: f32, now_ms: u64) -> bool {
        if self.mode == PidMode::Manual {
            return false;
        }
        if let Some(last) = self.last_compute_ms {
            if now_ms.wrapping_sub(last) < u64::from(self.sample_time_ms) {
                return false;
            }
        }

        let error = setpoint - input;
        let d_input = input - self.last_input;

        self.output_sum += self.ki * error;
        if self.proportional_on == ProportionalOn::Measurement {
            self.output_sum -= self.kp * d_input;
        }
        self.output_sum = self.output_sum.clamp(self.output_min, self.output_max);

        let p = match self.proportional_on {
            ProportionalOn::Error => self.kp * error,
            ProportionalOn::Measurement => 0.0,
        };
        self.output = (p + self.output_sum - self.kd * d_input)
            .clamp(self.output_min, self.output_max);

        self.last_input = input;
        self.last_compute_ms = Some(now_ms);
        true
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.output_sum = 0.0;
        self.last_input = 0.0;
        self.last_compute_ms = None;
        self.output = 0.0;
    }
}
