//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements    | Connects to                  |
//! |-----------------|---------------|------------------------------|
//! | `eeprom`        | NvStorePort   | In-memory EEPROM image       |
//! | `sim_board`     | HardwarePort  | Injected local pin levels    |
//! | `sim_transport` | TransportPort | Table-driven peer devices    |
//! | `time`          | ClockPort     | `Instant` / hand-stepped ms  |
//!
//! Ranging sensors live under [`crate::drivers`] since they sit directly
//! on `embedded-hal` pins.

pub mod eeprom;
pub mod sim_board;
pub mod sim_transport;
pub mod time;
