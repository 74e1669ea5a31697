//! Peripheral drivers over `embedded-hal` traits.

pub mod hcsr04;
