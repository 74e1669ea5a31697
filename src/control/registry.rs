//! Rule registry: which rules are switched on, and where each one persists.
//!
//! Display and menu code enumerate [`RuleRegistry::active_ids`] to show the
//! activation identifiers of running rules.  Slots and storage offsets are
//! handed out once, in creation order, and never reused.

use super::record::RECORD_LEN;

/// Number of activation slots.
pub const RULE_SLOTS: usize = 16;

/// Marks an inactive slot.
pub const INACTIVE: char = ' ';

/// Bounded slot table plus the storage-offset allocator.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    active: [char; RULE_SLOTS],
    count: usize,
    next_offset: u16,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            active: [INACTIVE; RULE_SLOTS],
            count: 0,
            next_offset: 0,
        }
    }

    /// Next slot index.  Past the last slot every rule shares slot 15.
    pub fn allocate_slot(&mut self) -> usize {
        let slot = self.count;
        if self.count < RULE_SLOTS - 1 {
            self.count += 1;
        }
        slot
    }

    /// Next free record offset.
    pub fn allocate_offset(&mut self) -> u16 {
        let offset = self.next_offset;
        self.next_offset = self.next_offset.wrapping_add(RECORD_LEN);
        offset
    }

    /// Show `id` in `slot`.
    pub fn activate(&mut self, slot: usize, id: char) {
        if let Some(cell) = self.active.get_mut(slot) {
            *cell = id;
        }
    }

    pub fn deactivate(&mut self, slot: usize) {
        self.activate(slot, INACTIVE);
    }

    /// Activation identifier in `slot`, `None` if inactive.
    pub fn id_at(&self, slot: usize) -> Option<char> {
        self.active.get(slot).copied().filter(|&c| c != INACTIVE)
    }

    /// Raw slot table, blanks included.
    pub fn slots(&self) -> &[char; RULE_SLOTS] {
        &self.active
    }

    /// Activation identifiers of every active slot, in slot order.
    pub fn active_ids(&self) -> impl Iterator<Item = char> + '_ {
        self.active.iter().copied().filter(|&c| c != INACTIVE)
    }

    /// Slots handed out so far (saturates at 15).
    pub fn live_count(&self) -> usize {
        self.count
    }

    /// Bytes of non-volatile storage claimed so far.
    pub fn storage_used(&self) -> u16 {
        self.next_offset
    }
}
