//! Fuzz target: rule construction over arbitrary EEPROM contents
//!
//! Boots a node whose EEPROM holds the fuzz input, chains one rule per
//! record that fits, and verifies:
//! - No panics on any image, including odd lengths and truncated records
//! - Every restored setpoint is within 0..=4095
//! - Every slot whose high byte was foreign is zeroed on construction
//! - Setpoints and statuses survive `save_all` + reboot unchanged
//!
//! cargo fuzz run fuzz_rule_record

#![no_main]

use std::time::Duration;

use agnode::adapters::eeprom::MemoryEeprom;
use agnode::adapters::sim_board::SimBoard;
use agnode::adapters::sim_transport::SimTransport;
use agnode::adapters::time::ManualClock;
use agnode::app::node::{Node, RuleId};
use agnode::config::NodeConfig;
use agnode::control::record::{RuleRecord, SETPOINT_MAX};
use agnode::control::rule::ControlType;
use agnode::pin::PinKind;
use libfuzzer_sys::fuzz_target;

type SimNode = Node<SimTransport, SimBoard, MemoryEeprom, ManualClock>;

const MAX_RULES: usize = 32;

fn boot(image: Vec<u8>, rules: usize) -> (SimNode, Vec<RuleId>) {
    let mut node = Node::new(
        NodeConfig::default(),
        SimTransport::new(Duration::from_millis(100)),
        SimBoard::new(),
        MemoryEeprom::from_bytes(image),
        ManualClock::new(),
    )
    .expect("default config is valid");
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    let ids = (0..rules)
        .map(|_| {
            node.controls(input, output, ControlType::EqualTo, Some('F'), None)
                .expect("pins exist")
        })
        .collect();
    (node, ids)
}

fuzz_target!(|data: &[u8]| {
    let rules = (data.len() / 2).min(MAX_RULES);
    let (mut node, ids) = boot(data.to_vec(), rules);

    for (i, &id) in ids.iter().enumerate() {
        let rule = node.rule(id).expect("rule exists");
        assert!((0..=SETPOINT_MAX).contains(&rule.setpoint()));

        let original = [data[2 * i], data[2 * i + 1]];
        let stored = &node.context().storage.bytes()[2 * i..2 * i + 2];
        match RuleRecord::decode(original) {
            Some(rec) => {
                assert_eq!(rec, rule.record());
                assert_eq!(stored, original);
            }
            None => assert_eq!(stored, [0, 0]),
        }
    }

    let before: Vec<RuleRecord> = ids
        .iter()
        .map(|&id| node.rule(id).expect("rule exists").record())
        .collect();
    node.save_all().expect("every record fits");

    let image = node.context().storage.bytes().to_vec();
    let (reloaded, ids) = boot(image, rules);
    for (&id, rec) in ids.iter().zip(&before) {
        assert_eq!(reloaded.rule(id).expect("rule exists").record(), *rec);
    }
});
