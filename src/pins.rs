//! Pin-number map of the node board.
//!
//! Single source of truth for the numeric thresholds that decide how a pin
//! number is dispatched.  Every [`Pin`](crate::pin::Pin) classifies itself
//! against these constants rather than hard-coding ranges.

// ---------------------------------------------------------------------------
// Address ranges
// ---------------------------------------------------------------------------

/// First analog-capable pin (`A0` on the ATmega328 layout).
/// Numbers below are digital and boolean.
pub const A0: u8 = 14;

/// Numbers above this address the transport's virtual-pin store instead of
/// physical hardware.
pub const LAST_PHYSICAL_PIN: u8 = 63;

/// Highest addressable device id.  Larger ids make a pin inert.
pub const MAX_DEVICE_ID: u8 = 16;

/// Highest addressable pin number.  Larger numbers make a pin inert.
pub const MAX_PIN: u8 = 127;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Reported by reads that produced nothing.
pub const NO_VALUE: i32 = -1;

/// Whether `number` is read and written through the analog primitives.
pub const fn is_analog(number: u8) -> bool {
    number >= A0
}

/// Whether `number` lives in the transport's virtual-pin store.
pub const fn is_virtual(number: u8) -> bool {
    number > LAST_PHYSICAL_PIN
}

/// Whether `(device, number)` can be read or written at all.
pub const fn is_addressable(device: u8, number: u8) -> bool {
    device <= MAX_DEVICE_ID && number <= MAX_PIN
}
