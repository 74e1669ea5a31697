//! Port traits: the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Node (domain)
//! ```
//!
//! The peer-link codec, the board's GPIO/ADC, the ranging sensor, the EEPROM
//! and the millisecond clock all live behind these traits.  The
//! [`Node`](super::node::Node) owns one implementation of each inside its
//! [`NodeContext`](super::context::NodeContext), so the core never touches
//! hardware directly.

use core::time::Duration;

// ───────────────────────────────────────────────────────────────
// Shared transport types
// ───────────────────────────────────────────────────────────────

/// Opaque handle for an in-flight non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub u16);

/// Status attached to a value written to a virtual pin.
///
/// Rules reuse it as their on/off status, so a direct-set rule can forward
/// its own status alongside the setpoint.  It is unrelated to the transient
/// [`ReadState`](crate::pin::ReadState) of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTag {
    /// Plain value, no on/off meaning.
    #[default]
    Ok,
    On,
    Off,
}

/// Initial hardware configuration of a local pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullUp,
    Output,
}

// ───────────────────────────────────────────────────────────────
// Transport port (peer link + virtual-pin store)
// ───────────────────────────────────────────────────────────────

/// Request/reply link to peer devices on a shared half-duplex medium.
///
/// One target device is selected at a time; callers must select before every
/// remote read or write.  Reads return `None` when the peer produced no
/// value.
pub trait TransportPort {
    /// Device the next request goes to.
    fn target(&self) -> u8;

    /// Select the device the next request goes to.
    fn select_target(&mut self, device: u8);

    fn read_digital_blocking(&mut self, pin: u8) -> Option<i32>;

    fn read_analog_blocking(&mut self, pin: u8) -> Option<i32>;

    /// Issue a non-blocking digital read.  `None` if the request could not be
    /// queued; the caller still waits out the timeout.
    fn read_digital_async(&mut self, pin: u8) -> Option<Ticket>;

    /// Issue a non-blocking analog read.  See [`read_digital_async`].
    ///
    /// [`read_digital_async`]: TransportPort::read_digital_async
    fn read_analog_async(&mut self, pin: u8) -> Option<Ticket>;

    /// Reply value for `ticket`, `None` while it is still outstanding.
    fn poll_ticket(&mut self, ticket: Ticket) -> Option<i32>;

    fn write_digital_blocking(&mut self, pin: u8, value: i32);

    fn write_analog_blocking(&mut self, pin: u8, value: i32);

    /// Store `value` with `status` on a local virtual pin, visible to peers.
    fn set_virtual(&mut self, pin: u8, value: i32, status: StatusTag);

    /// Last value stored on a local virtual pin.
    fn virtual_value(&self, pin: u8) -> Option<i32>;

    /// Last status stored on a local virtual pin.
    fn virtual_status(&self, pin: u8) -> Option<StatusTag>;

    /// Drain and decode arrived bytes, resolving pending tickets.
    fn advance(&mut self);

    /// How long a non-blocking read may stay unanswered.
    fn timeout(&self) -> Duration;
}

// ───────────────────────────────────────────────────────────────
// Hardware port (local GPIO / ADC / PWM)
// ───────────────────────────────────────────────────────────────

/// The board's own pins.  Reads return [`NO_VALUE`](crate::pins::NO_VALUE)
/// on failure.
pub trait HardwarePort {
    fn configure(&mut self, pin: u8, mode: PinMode);

    fn digital_read(&mut self, pin: u8) -> i32;

    fn analog_read(&mut self, pin: u8) -> i32;

    fn digital_write(&mut self, pin: u8, value: i32);

    /// PWM duty write.
    fn analog_write(&mut self, pin: u8, value: i32);
}

// ───────────────────────────────────────────────────────────────
// Ranging port
// ───────────────────────────────────────────────────────────────

/// A distance sensor owned by a ranging pin.
pub trait RangingPort {
    /// One blocking measurement, `None` when no echo came back.
    fn measure_distance(&mut self) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Non-volatile store port (EEPROM)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed non-volatile memory.
///
/// Erased cells read `0xFF`.  Capacity planning is the integrator's job: the
/// core allocates two bytes per rule and never checks the size.
pub trait NvStorePort {
    fn read(&self, offset: u16) -> Result<u8, StorageError>;

    fn write(&mut self, offset: u16, byte: u8) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`NvStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Offset lies past the end of the store.
    OutOfBounds(u16),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds(offset) => write!(f, "offset {} out of bounds", offset),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
