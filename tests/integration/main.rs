//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulation adapters.  All tests run on the host with no
//! real hardware or peer link required.

mod persistence_tests;
mod rule_engine_tests;
