//! Persisted rule record: two EEPROM bytes per rule.
//!
//! ```text
//!  byte 0 (lo)   b7..b0  setpoint bits 7..0
//!  byte 1 (hi)   b3..b0  setpoint bits 11..8
//!                b5..b4  status code
//!                b7..b6  zero; any set bit marks an erased / foreign cell
//! ```
//!
//! Status codes: `0` off, `1` on, `2` ok (direct-set), `3` reserved and read
//! back as off.

use crate::app::ports::StatusTag;

/// Bytes each rule occupies in the non-volatile store.
pub const RECORD_LEN: u16 = 2;

/// Largest setpoint the record can hold.
pub const SETPOINT_MAX: i32 = 0x0FFF;

/// Any high byte above this is uninitialised storage.
const HI_VALID_MAX: u8 = 0x3F;
const HI_SETPOINT_MASK: u8 = 0x0F;
const HI_STATUS_MASK: u8 = 0x30;
const HI_STATUS_SHIFT: u8 = 4;

const CODE_OFF: u8 = 0;
const CODE_ON: u8 = 1;
const CODE_OK: u8 = 2;

/// Decoded contents of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleRecord {
    pub setpoint: i32,
    pub status: StatusTag,
}

impl RuleRecord {
    /// Pack into `[lo, hi]`.  Setpoints outside `0..=4095` keep their low
    /// twelve bits.
    pub fn encode(&self) -> [u8; 2] {
        let raw = (self.setpoint & SETPOINT_MAX) as u16;
        let lo = (raw & 0xFF) as u8;
        let hi = ((status_code(self.status) << HI_STATUS_SHIFT) & HI_STATUS_MASK)
            | ((raw >> 8) as u8 & HI_SETPOINT_MASK);
        [lo, hi]
    }

    /// Unpack `[lo, hi]`, or `None` if the cell was never written.
    pub fn decode(bytes: [u8; 2]) -> Option<Self> {
        let [lo, hi] = bytes;
        if hi > HI_VALID_MAX {
            return None;
        }
        Some(Self {
            setpoint: (i32::from(hi & HI_SETPOINT_MASK) << 8) | i32::from(lo),
            status: status_from_code((hi & HI_STATUS_MASK) >> HI_STATUS_SHIFT),
        })
    }
}

fn status_code(status: StatusTag) -> u8 {
    match status {
        StatusTag::Off => CODE_OFF,
        StatusTag::On => CODE_ON,
        StatusTag::Ok => CODE_OK,
    }
}

fn status_from_code(code: u8) -> StatusTag {
    match code {
        CODE_ON => StatusTag::On,
        CODE_OK => StatusTag::Ok,
        _ => StatusTag::Off,
    }
}
