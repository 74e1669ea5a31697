//! Unified error types for the node control core.
//!
//! Address-range violations and failed reads never surface here: the former
//! are silent no-ops and the latter show up as [`ReadState::Error`] on the
//! pin. What remains are handle misuse, storage failures, configuration
//! mistakes and an unconverged setpoint adjustment.
//!
//! [`ReadState::Error`]: crate::pin::ReadState::Error

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible node operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A [`PinId`](crate::app::node::PinId) that this node never issued.
    UnknownPin(usize),
    /// A [`RuleId`](crate::app::node::RuleId) with no rule behind it.
    UnknownRule { pin: usize, index: usize },
    /// The non-volatile store rejected a read or write.
    Storage(StorageError),
    /// `SetPointAdd` gave up after this many raw steps.
    AdjustLimit { steps: u16 },
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPin(id) => write!(f, "unknown pin #{id}"),
            Self::UnknownRule { pin, index } => write!(f, "pin #{pin} has no rule #{index}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::AdjustLimit { steps } => {
                write!(f, "setpoint adjustment did not converge in {steps} steps")
            }
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
