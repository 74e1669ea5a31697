//! Automation rules: read one pin, drive another.
//!
//! A [`Rule`] holds only its own state: setpoint, on/off status, optional
//! PID controller and its fixed registry slot and storage offset.  Pins are
//! referenced by [`PinId`] handles, and the pin writes a rule asks for are
//! returned as [`Actuation`]s for the [`Node`](crate::app::node::Node) to
//! dispatch.

use log::{info, warn};

use crate::app::node::PinId;
use crate::app::ports::{NvStorePort, StatusTag};
use crate::config::{NodeConfig, PidTuning};
use crate::error::{Error, Result};
use crate::pin::ReadState;

use super::pid::{PidController, PidMode};
use super::record::RuleRecord;
use super::registry::RuleRegistry;

/// The policy a rule applies on every [`Rule::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    LessThan,
    GreaterThan,
    EqualTo,
    NotEqualTo,
    /// Continuously write the setpoint, regardless of on/off status.
    DirectSet,
    Pid,
}

/// One write a rule wants performed on its output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actuation {
    pub value: i32,
    pub status: StatusTag,
}

/// Snapshot of the input pin taken just before evaluation.
#[derive(Debug, Clone, Copy)]
pub struct InputSample {
    pub state: ReadState,
    pub raw: i32,
}

/// Wiring of a rule being created.
#[derive(Debug, Clone, Copy)]
pub struct RuleWiring {
    pub input: PinId,
    pub output: PinId,
    pub store: Option<PinId>,
    pub control: ControlType,
    /// Shown in the registry while the rule is on.
    pub id: Option<char>,
}

pub struct Rule {
    wiring: RuleWiring,
    setpoint: i32,
    status: StatusTag,
    pid: Option<PidController>,
    slot: usize,
    offset: u16,
}

impl Rule {
    /// Claim a slot and a storage offset, then restore setpoint and status
    /// from the store.  Uninitialised cells are zeroed.
    pub fn load(
        wiring: RuleWiring,
        tuning: &PidTuning,
        registry: &mut RuleRegistry,
        storage: &mut impl NvStorePort,
    ) -> Self {
        let offset = registry.allocate_offset();
        let mut rule = Self {
            wiring,
            setpoint: 0,
            status: StatusTag::Off,
            pid: (wiring.control == ControlType::Pid).then(|| PidController::new(tuning)),
            slot: 0,
            offset,
        };

        match read_record(storage, offset) {
            Ok(Some(rec)) => {
                rule.setpoint = rec.setpoint;
                rule.status = rec.status;
            }
            Ok(None) => {
                info!("Rule @{}: blank storage, initialising", offset);
                if let Err(e) = write_record(storage, offset, [0, 0]) {
                    warn!("Rule @{}: could not initialise storage: {}", offset, e);
                }
            }
            Err(e) => warn!("Rule @{}: storage read failed ({}), using defaults", offset, e),
        }

        if wiring.control == ControlType::DirectSet {
            rule.status = StatusTag::Ok;
        }

        rule.slot = registry.allocate_slot();
        if rule.status == StatusTag::On {
            if let Some(id) = wiring.id {
                registry.activate(rule.slot, id);
            }
        }
        rule
    }

    /// Decide the write for this cycle, if any.
    ///
    /// Non-direct-set rules only run while on, and nothing runs on a pending
    /// or failed input.
    pub fn evaluate(
        &mut self,
        input: InputSample,
        config: &NodeConfig,
        now_ms: u64,
    ) -> Option<Actuation> {
        if self.wiring.control != ControlType::DirectSet && self.status != StatusTag::On {
            return None;
        }
        if input.state != ReadState::Ok {
            return None;
        }

        let holds = match self.wiring.control {
            ControlType::LessThan => input.raw < self.setpoint,
            ControlType::GreaterThan => input.raw > self.setpoint,
            ControlType::EqualTo => input.raw == self.setpoint,
            ControlType::NotEqualTo => input.raw != self.setpoint,
            ControlType::DirectSet => {
                return Some(Actuation {
                    value: self.setpoint,
                    status: self.status,
                });
            }
            ControlType::Pid => {
                let pid = self.pid.as_mut()?;
                if pid.mode() == PidMode::Manual {
                    return None;
                }
                pid.compute(input.raw as f32, self.setpoint as f32, now_ms);
                return Some(Actuation {
                    value: pid.output().round() as i32,
                    status: StatusTag::Ok,
                });
            }
        };

        Some(Actuation {
            value: if holds {
                config.actuation_high
            } else {
                config.actuation_low
            },
            status: StatusTag::Ok,
        })
    }

    pub fn setpoint(&self) -> i32 {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, value: i32) {
        self.setpoint = value;
    }

    /// Move the setpoint by `delta` display units.
    ///
    /// Boolean inputs toggle between 0 and 1 on any nonzero delta.  Otherwise
    /// the raw setpoint is stepped until `modify` of it crosses the target;
    /// `modify` must be monotonic.  After `limit` steps the setpoint is
    /// restored and [`Error::AdjustLimit`] returned.
    pub fn adjust_setpoint(
        &mut self,
        delta: i32,
        input_is_boolean: bool,
        modify: impl Fn(i32) -> i32,
        limit: u16,
    ) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        if input_is_boolean {
            self.setpoint = i32::from(self.setpoint == 0);
            return Ok(());
        }

        let start = self.setpoint;
        let target = modify(start).saturating_add(delta);
        let step = delta.signum();
        let mut steps: u16 = 0;
        while (step < 0 && modify(self.setpoint) > target)
            || (step > 0 && modify(self.setpoint) < target)
        {
            if steps == limit {
                warn!(
                    "Rule slot {}: setpoint adjust by {} stuck after {} steps",
                    self.slot, delta, steps
                );
                self.setpoint = start;
                return Err(Error::AdjustLimit { steps });
            }
            self.setpoint += step;
            steps += 1;
        }
        Ok(())
    }

    pub fn status(&self) -> StatusTag {
        self.status
    }

    /// Locally held on/off state.
    pub fn is_on(&self) -> bool {
        self.status == StatusTag::On
    }

    /// Switch on or off and update the registry slot.
    pub fn set_on(&mut self, on: bool, registry: &mut RuleRegistry) {
        self.status = if on { StatusTag::On } else { StatusTag::Off };
        match self.wiring.id {
            Some(id) if on => registry.activate(self.slot, id),
            _ => registry.deactivate(self.slot),
        }
    }

    /// Put the PID controller in automatic (`true`) or manual mode.
    /// Going manual clears the controller state.  No effect on other rule
    /// types.
    pub fn enable_pid(&mut self, enabled: bool, input: i32) {
        if let Some(pid) = self.pid.as_mut() {
            let mode = if enabled {
                PidMode::Automatic
            } else {
                PidMode::Manual
            };
            pid.set_mode(mode, input as f32);
            if !enabled {
                pid.reset();
            }
        }
    }

    pub fn record(&self) -> RuleRecord {
        RuleRecord {
            setpoint: self.setpoint,
            status: self.status,
        }
    }

    /// Write the record at this rule's offset.
    pub fn persist(&self, storage: &mut impl NvStorePort) -> Result<()> {
        write_record(storage, self.offset, self.record().encode())?;
        info!(
            "Rule slot {} saved @{} (setpoint={}, status={:?})",
            self.slot, self.offset, self.setpoint, self.status
        );
        Ok(())
    }

    pub fn control(&self) -> ControlType {
        self.wiring.control
    }

    pub fn input(&self) -> PinId {
        self.wiring.input
    }

    pub fn output(&self) -> PinId {
        self.wiring.output
    }

    pub fn store(&self) -> Option<PinId> {
        self.wiring.store
    }

    pub fn id(&self) -> Option<char> {
        self.wiring.id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn storage_offset(&self) -> u16 {
        self.offset
    }
}

fn read_record(
    storage: &impl NvStorePort,
    offset: u16,
) -> core::result::Result<Option<RuleRecord>, crate::app::ports::StorageError> {
    let lo = storage.read(offset)?;
    let hi = storage.read(offset + 1)?;
    Ok(RuleRecord::decode([lo, hi]))
}

fn write_record(
    storage: &mut impl NvStorePort,
    offset: u16,
    [lo, hi]: [u8; 2],
) -> core::result::Result<(), crate::app::ports::StorageError> {
    storage.write(offset, lo)?;
    storage.write(offset + 1, hi)
}
