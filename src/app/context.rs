//! Node-wide shared state.
//!
//! [`NodeContext`] is built once at startup and passed by reference into
//! every pin and rule operation.  It carries the ports plus the two pieces
//! of state all rules share: the local device identity and the
//! [`RuleRegistry`].

use crate::control::registry::RuleRegistry;

/// Ports and shared state of one node.
///
/// * `T`: [`TransportPort`](super::ports::TransportPort), peer link and
///   virtual pins
/// * `H`: [`HardwarePort`](super::ports::HardwarePort), local GPIO/ADC
/// * `S`: [`NvStorePort`](super::ports::NvStorePort), rule records
/// * `C`: [`ClockPort`](super::ports::ClockPort), read timeouts and PID
///   sampling
pub struct NodeContext<T, H, S, C> {
    pub transport: T,
    pub hardware: H,
    pub storage: S,
    pub clock: C,
    /// Identity of this device; pins with this device id are local.
    pub local_id: u8,
    pub registry: RuleRegistry,
}

impl<T, H, S, C> NodeContext<T, H, S, C> {
    pub fn new(local_id: u8, transport: T, hardware: H, storage: S, clock: C) -> Self {
        Self {
            transport,
            hardware,
            storage,
            clock,
            local_id,
            registry: RuleRegistry::new(),
        }
    }
}
