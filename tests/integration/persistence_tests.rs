//! Rule records in EEPROM across power cycles.

use agnode::Error;
use agnode::adapters::eeprom::MemoryEeprom;
use agnode::app::node::RuleId;
use agnode::app::ports::{NvStorePort, StatusTag, StorageError, TransportPort};
use agnode::config::NodeConfig;
use agnode::control::rule::ControlType;
use agnode::pin::PinKind;

use crate::support::{SimNode, eeprom_of, node, node_with};

/// d2 → d3 greater-than rule with id 'G', at storage offset 0.
fn topology(node: &mut SimNode) -> RuleId {
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    node.controls(input, output, ControlType::GreaterThan, Some('G'), None)
        .unwrap()
}

#[test]
fn saved_rule_survives_power_cycle() {
    let mut before = node();
    let rule = topology(&mut before);
    before.set_point(rule, 0xABC).unwrap();
    before.set_on(rule, true).unwrap();
    before.save(rule).unwrap();
    assert_eq!(before.context().storage.bytes()[..2], [0xBC, 0x1A]);

    let mut after = node_with(NodeConfig::default(), eeprom_of(&before));
    let rule = topology(&mut after);
    assert_eq!(after.setpoint(rule).unwrap(), 0xABC);
    assert!(after.is_on(rule).unwrap());
    assert_eq!(after.registry().id_at(0), Some('G'));
}

#[test]
fn unsaved_changes_are_lost() {
    let mut before = node();
    let rule = topology(&mut before);
    before.set_point(rule, 99).unwrap();

    let mut after = node_with(NodeConfig::default(), eeprom_of(&before));
    let rule = topology(&mut after);
    assert_eq!(after.setpoint(rule).unwrap(), 0);
    assert!(!after.is_on(rule).unwrap());
}

#[test]
fn erased_storage_is_zeroed_on_construction() {
    let mut node = node();
    let rule = topology(&mut node);
    assert_eq!(node.setpoint(rule).unwrap(), 0);
    assert_eq!(node.rule(rule).unwrap().status(), StatusTag::Off);
    assert_eq!(node.context().storage.bytes()[..2], [0, 0]);
    assert_eq!(node.context().storage.bytes()[2], 0xFF);
}

#[test]
fn foreign_high_byte_is_treated_as_blank() {
    let mut image = vec![0xFF; 16];
    image[0] = 0x12;
    image[1] = 0x40;
    let mut node = node_with(NodeConfig::default(), MemoryEeprom::from_bytes(image));
    let rule = topology(&mut node);
    assert_eq!(node.setpoint(rule).unwrap(), 0);
    assert_eq!(node.context().storage.bytes()[..2], [0, 0]);
}

#[test]
fn legacy_status_codes_decode() {
    // Offsets 0, 2, 4: code 2 (ok), code 3 (reserved), code 1 (on).
    let image = vec![0x05, 0x20, 0x06, 0x30, 0x07, 0x10];
    let mut node = node_with(NodeConfig::default(), MemoryEeprom::from_bytes(image));
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let rules: Vec<RuleId> = (0..3)
        .map(|_| {
            node.controls(input, input, ControlType::EqualTo, None, None)
                .unwrap()
        })
        .collect();

    let restored: Vec<(i32, StatusTag)> = rules
        .iter()
        .map(|&r| {
            let rule = node.rule(r).unwrap();
            (rule.setpoint(), rule.status())
        })
        .collect();
    assert_eq!(
        restored,
        vec![(5, StatusTag::Ok), (6, StatusTag::Off), (7, StatusTag::On)]
    );
}

#[test]
fn direct_set_rule_ignores_stored_on_status() {
    let image = vec![0x10, 0x10];
    let mut node = node_with(NodeConfig::default(), MemoryEeprom::from_bytes(image));
    let lamp = node.add_pin(0, 6, PinKind::Settable, "lamp", Some('L'));
    let rule = node.rule_ids(lamp).unwrap()[0];

    assert_eq!(node.setpoint(rule).unwrap(), 16);
    assert_eq!(node.rule(rule).unwrap().status(), StatusTag::Ok);
    assert_eq!(node.registry().live_count(), 1);
    assert_eq!(node.registry().id_at(0), None);
}

#[test]
fn save_mirrors_to_store_pin() {
    let mut node = node();
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    let store = node.add_pin(0, 100, PinKind::Input, "mirror", None);
    let rule = node
        .controls(input, output, ControlType::LessThan, Some('S'), Some(store))
        .unwrap();
    node.set_point(rule, 5).unwrap();
    node.set_on(rule, false).unwrap();
    node.save(rule).unwrap();

    let link = &node.context().transport;
    assert_eq!(link.virtual_value(100), Some(5));
    assert_eq!(link.virtual_status(100), Some(StatusTag::Off));
}

#[test]
fn save_all_writes_every_rule() {
    let mut node = node();
    let a = topology(&mut node);
    let lamp = node.add_pin(0, 6, PinKind::Settable, "lamp", None);
    let b = node.rule_ids(lamp).unwrap()[0];
    node.set_point(a, 300).unwrap();
    node.set_point(b, 0x7FF).unwrap();
    node.save_all().unwrap();

    let storage = &node.context().storage;
    assert_eq!(storage.read(0), Ok(0x2C));
    assert_eq!(storage.read(1), Ok(0x01));
    assert_eq!(storage.read(2), Ok(0xFF));
    assert_eq!(storage.read(3), Ok(0x27));
}

#[test]
fn save_surfaces_storage_failure() {
    let mut node = node_with(NodeConfig::default(), MemoryEeprom::new(1));
    let rule = topology(&mut node);
    assert_eq!(node.setpoint(rule).unwrap(), 0);
    assert_eq!(
        node.save(rule),
        Err(Error::Storage(StorageError::OutOfBounds(1)))
    );
}
