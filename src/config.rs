//! Node configuration parameters
//!
//! All tunable parameters of the control core.
//! Values come from code defaults or a JSON document.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins::MAX_DEVICE_ID;

/// Where the proportional term is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProportionalOn {
    Error,
    Measurement,
}

/// Sign of the process gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Output up drives the input up.
    Direct,
    Reverse,
}

/// Gains and limits applied to every PID rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidTuning {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub proportional_on: ProportionalOn,
    pub direction: Direction,
    /// Minimum time between two controller steps
    pub sample_time_ms: u32,
    pub output_min: f32,
    pub output_max: f32,
}

impl Default for PidTuning {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 5.0,
            kd: 1.0,
            proportional_on: ProportionalOn::Error,
            direction: Direction::Direct,
            sample_time_ms: 100,
            output_min: 1.0,
            output_max: 1023.0,
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity of this device on the peer link (0-16)
    pub device_id: u8,

    // --- Comparison rules ---
    /// Written when a comparison holds
    pub actuation_high: i32,
    /// Written when a comparison fails
    pub actuation_low: i32,

    // --- PID rules ---
    pub pid: PidTuning,

    // --- Setpoint adjustment ---
    /// Raw steps `SetPointAdd` may take before giving up
    pub setpoint_adjust_limit: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            actuation_high: 1000,
            actuation_low: 0,
            pid: PidTuning::default(),
            setpoint_adjust_limit: 4096,
        }
    }
}

impl NodeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed JSON"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the core cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.device_id > MAX_DEVICE_ID {
            return Err(Error::Config("device_id must be 0–16"));
        }
        if self.actuation_high == self.actuation_low {
            return Err(Error::Config(
                "actuation_high must differ from actuation_low",
            ));
        }
        if self.pid.sample_time_ms == 0 {
            return Err(Error::Config("pid.sample_time_ms must be > 0"));
        }
        if self.pid.output_min >= self.pid.output_max {
            return Err(Error::Config("pid.output_min must be < pid.output_max"));
        }
        if self.setpoint_adjust_limit == 0 {
            return Err(Error::Config("setpoint_adjust_limit must be > 0"));
        }
        Ok(())
    }
}
