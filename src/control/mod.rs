//! Control rules and their persistence.
//!
//! - [`rule`]: comparator, direct-set and PID rules bound to pins
//! - [`pid`]: the sample-time PID controller behind `Pid` rules
//! - [`record`]: the two-byte EEPROM record of setpoint + status
//! - [`registry`]: node-wide rule-id slots and EEPROM offset allocation

pub mod pid;
pub mod record;
pub mod registry;
pub mod rule;
