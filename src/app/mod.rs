//! Application core: pin/rule domain logic, zero direct I/O.
//!
//! [`node::Node`] owns every pin and rule and drives them against the
//! collaborators bundled in [`context::NodeContext`].  All interaction with
//! the link, the local board, EEPROM and the clock happens through the
//! **port traits** defined in [`ports`].

pub mod context;
pub mod node;
pub mod ports;
