//! Agnode: networked pin/rule engine for small agricultural controllers.
//!
//! A node mirrors local and remote pins, evaluates control rules between
//! them, and persists rule setpoints in EEPROM.  Every collaborator is a
//! port trait, so the whole engine runs on the host against the simulation
//! adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod pin;
pub mod pins;

mod error;

pub use error::{Error, Result};
