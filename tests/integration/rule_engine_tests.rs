//! Rule evaluation, setpoint handling and the activation registry.

use agnode::Error;
use agnode::adapters::eeprom::MemoryEeprom;
use agnode::app::node::{PinId, RuleId};
use agnode::app::ports::{StatusTag, TransportPort};
use agnode::config::NodeConfig;
use agnode::control::registry::RULE_SLOTS;
use agnode::control::rule::ControlType;
use agnode::pin::{PinKind, ReadState};
use agnode::pins::A0;

use crate::support::{SimNode, TIMEOUT_MS, node, node_with};

/// Local d2 → rule → local d3.
fn wired(control: ControlType, setpoint: i32) -> (SimNode, PinId, RuleId) {
    let mut node = node();
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    let rule = node.controls(input, output, control, Some('R'), None).unwrap();
    node.set_point(rule, setpoint).unwrap();
    (node, input, rule)
}

fn writes_to(node: &SimNode, pin: u8) -> Vec<i32> {
    node.context()
        .hardware
        .writes()
        .iter()
        .filter(|w| w.pin == pin)
        .map(|w| w.value)
        .collect()
}

#[test]
fn off_rule_never_writes() {
    let (mut node, input, _) = wired(ControlType::GreaterThan, 500);
    node.context_mut().hardware.set_level(2, 600);
    node.read_value(input, false).unwrap();
    node.apply_all().unwrap();
    assert!(writes_to(&node, 3).is_empty());
}

#[test]
fn comparison_selects_configured_levels() {
    let config = NodeConfig {
        actuation_high: 255,
        actuation_low: 10,
        ..NodeConfig::default()
    };
    let mut node = node_with(config, MemoryEeprom::new(64));
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    let rule = node
        .controls(input, output, ControlType::NotEqualTo, None, None)
        .unwrap();
    node.set_point(rule, 1).unwrap();
    node.set_on(rule, true).unwrap();

    for level in [0, 1] {
        node.context_mut().hardware.set_level(2, level);
        node.read_value(input, false).unwrap();
        node.apply(rule).unwrap();
    }
    assert_eq!(writes_to(&node, 3), vec![255, 10]);
}

#[test]
fn pending_or_timed_out_input_leaves_output_alone() {
    let mut node = node();
    node.context_mut().transport.set_offline(6, true);
    let input = node.add_pin(6, A0, PinKind::Input, "remote", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    let rule = node
        .controls(input, output, ControlType::LessThan, Some('L'), None)
        .unwrap();
    node.set_on(rule, true).unwrap();

    node.read_value(input, false).unwrap();
    node.apply_all().unwrap();
    node.context_mut().clock.advance(TIMEOUT_MS + 1);
    assert_eq!(node.update_all(), 1);
    assert_eq!(node.status(input).unwrap(), ReadState::Error);
    node.apply_all().unwrap();

    assert!(writes_to(&node, 3).is_empty());
}

#[test]
fn chain_runs_in_creation_order() {
    let (mut node, input, first) = wired(ControlType::GreaterThan, 500);
    let output = node.rule(first).unwrap().output();
    let second = node
        .controls(input, output, ControlType::LessThan, Some('S'), None)
        .unwrap();
    node.set_point(second, 500).unwrap();
    node.set_on(first, true).unwrap();
    node.set_on(second, true).unwrap();

    assert_eq!(node.rule_ids(input).unwrap(), vec![first, second]);

    node.context_mut().hardware.set_level(2, 600);
    node.read_value(input, false).unwrap();
    node.apply_rules(input).unwrap();
    assert_eq!(writes_to(&node, 3), vec![1000, 0]);
}

#[test]
fn settable_pin_gets_direct_set_rule() {
    let mut node = node();
    let lamp = node.add_pin(0, 6, PinKind::Settable, "lamp", Some('L'));
    let ids = node.rule_ids(lamp).unwrap();
    assert_eq!(ids.len(), 1);

    let rule = node.rule(ids[0]).unwrap();
    assert_eq!(rule.control(), ControlType::DirectSet);
    assert_eq!((rule.input(), rule.output()), (lamp, lamp));
    assert_eq!(rule.status(), StatusTag::Ok);

    node.set_point(ids[0], 200).unwrap();
    node.read_value(lamp, false).unwrap();
    node.apply_all().unwrap();
    assert_eq!(writes_to(&node, 6), vec![200]);
}

#[test]
fn user_control_direct_set_forwards_status_to_virtual_pin() {
    let mut node = node();
    let knob = node.add_pin(0, 72, PinKind::UserControl, "knob", Some('K'));
    let rule = node.rule_ids(knob).unwrap()[0];

    node.set_to(knob, 0, StatusTag::Ok).unwrap();
    node.read_value(knob, false).unwrap();
    node.set_point(rule, 9).unwrap();
    node.apply(rule).unwrap();

    let link = &node.context().transport;
    assert_eq!(link.virtual_value(72), Some(9));
    assert_eq!(link.virtual_status(72), Some(StatusTag::Ok));
}

#[test]
fn pid_rule_is_inert_until_enabled() {
    let mut node = node();
    node.context_mut().hardware.set_level(A0, 100);
    let input = node.add_pin(0, A0, PinKind::Input, "temp", None);
    let heater = node.add_pin(0, A0 + 1, PinKind::Output, "heater", None);
    let rule = node
        .controls(input, heater, ControlType::Pid, Some('H'), None)
        .unwrap();
    node.set_point(rule, 600).unwrap();
    node.set_on(rule, true).unwrap();

    node.read_value(input, false).unwrap();
    node.apply(rule).unwrap();
    assert!(writes_to(&node, A0 + 1).is_empty());

    node.enable_pid(rule, true).unwrap();
    node.apply(rule).unwrap();
    let written = writes_to(&node, A0 + 1);
    assert_eq!(written.len(), 1);
    assert!((1..=1023).contains(&written[0]));

    node.enable_pid(rule, false).unwrap();
    node.apply(rule).unwrap();
    assert_eq!(writes_to(&node, A0 + 1).len(), 1);
}

#[test]
fn setpoint_add_in_display_units() {
    let mut node = node();
    let input = node.add_pin(0, A0, PinKind::Input, "level", None);
    let output = node.add_pin(0, 3, PinKind::Output, "out", None);
    node.pin_mut(input).unwrap().attach_value_modifier(|v| v / 4);
    let rule = node
        .controls(input, output, ControlType::GreaterThan, None, None)
        .unwrap();

    node.set_point(rule, 40).unwrap();
    node.set_point_add(rule, 3).unwrap();
    assert_eq!(node.setpoint(rule).unwrap(), 52);
    node.set_point_add(rule, -2).unwrap();
    assert_eq!(node.setpoint(rule).unwrap(), 47);
}

#[test]
fn setpoint_add_on_boolean_input_toggles() {
    let (mut node, _, rule) = wired(ControlType::EqualTo, 7);
    for (delta, expected) in [(100, 0), (-1, 1), (5, 0), (0, 0)] {
        node.set_point_add(rule, delta).unwrap();
        assert_eq!(node.setpoint(rule).unwrap(), expected, "delta {delta}");
    }
}

#[test]
fn setpoint_add_gives_up_on_flat_transform() {
    let mut node = node();
    let input = node.add_pin(0, A0, PinKind::Input, "stuck", None);
    node.pin_mut(input).unwrap().attach_value_modifier(|_| 0);
    let rule = node
        .controls(input, input, ControlType::LessThan, None, None)
        .unwrap();
    node.set_point(rule, 12).unwrap();

    let limit = node.config().setpoint_adjust_limit;
    assert_eq!(
        node.set_point_add(rule, 1),
        Err(Error::AdjustLimit { steps: limit })
    );
    assert_eq!(node.setpoint(rule).unwrap(), 12);
}

#[test]
fn registry_tracks_active_rules() {
    let (mut node, input, a) = wired(ControlType::GreaterThan, 1);
    let output = node.rule(a).unwrap().output();
    let b = node
        .controls(input, output, ControlType::LessThan, Some('B'), None)
        .unwrap();
    let anonymous = node
        .controls(input, output, ControlType::LessThan, None, None)
        .unwrap();

    node.set_on(a, true).unwrap();
    node.set_on(b, true).unwrap();
    node.set_on(anonymous, true).unwrap();
    assert_eq!(node.registry().active_ids().collect::<String>(), "RB");

    node.set_on(a, false).unwrap();
    assert_eq!(node.registry().active_ids().collect::<String>(), "B");
    assert!(node.is_on(b).unwrap());
    assert!(!node.is_on(a).unwrap());
}

#[test]
fn registry_slots_clamp_at_capacity() {
    let mut node = node();
    let input = node.add_pin(0, 2, PinKind::Input, "in", None);
    let mut last = None;
    for _ in 0..RULE_SLOTS + 2 {
        last = Some(
            node.controls(input, input, ControlType::EqualTo, Some('X'), None)
                .unwrap(),
        );
    }
    let last = node.rule(last.unwrap()).unwrap();
    assert_eq!(last.slot(), RULE_SLOTS - 1);
    assert_eq!(last.storage_offset(), 2 * (RULE_SLOTS as u16 + 1));
    assert_eq!(node.registry().storage_used(), 2 * (RULE_SLOTS as u16 + 2));
}

#[test]
fn store_pin_mirrors_setpoint_and_status() {
    let mut node = node();
    let input = node.add_pin(0, A0, PinKind::Input, "moisture", None);
    let pump = node.add_pin(0, A0 + 1, PinKind::Output, "pump", None);
    let store = node.add_pin(0, 70, PinKind::UserControl, "pump set", None);
    let rule = node
        .controls(input, pump, ControlType::GreaterThan, Some('P'), Some(store))
        .unwrap();

    assert!(!node.is_on(rule).unwrap(), "no mirror yet, local status");

    node.set_point(rule, 321).unwrap();
    assert_eq!(node.context().transport.virtual_value(70), Some(321));
    assert_eq!(
        node.context().transport.virtual_status(70),
        Some(StatusTag::Ok)
    );

    node.set_on(rule, true).unwrap();
    let last = node.context().hardware.last_write(A0 + 1).unwrap();
    assert_eq!((last.value, last.analog), (321, true));
    assert!(
        !node.is_on(rule).unwrap(),
        "store still holds the plain setpoint status"
    );

    node.save(rule).unwrap();
    assert_eq!(
        node.context().transport.virtual_status(70),
        Some(StatusTag::On)
    );
    assert!(node.is_on(rule).unwrap());
}

#[test]
fn remote_store_pin_does_not_read_local_virtual_cell() {
    let mut node = node();
    let local_cell = node.add_pin(0, 70, PinKind::Input, "local 70", None);
    node.set_to(local_cell, 1, StatusTag::On).unwrap();

    let input = node.add_pin(0, A0, PinKind::Input, "moisture", None);
    let pump = node.add_pin(0, A0 + 1, PinKind::Output, "pump", None);
    let store = node.add_pin(4, 70, PinKind::Input, "remote set", None);
    let rule = node
        .controls(input, pump, ControlType::GreaterThan, Some('P'), Some(store))
        .unwrap();

    assert!(!node.is_on(rule).unwrap());
    node.set_on(rule, true).unwrap();
    assert!(node.is_on(rule).unwrap());
}

#[test]
fn unknown_rule_is_rejected() {
    let (node, input, _) = wired(ControlType::EqualTo, 0);
    let missing = RuleId { pin: input, index: 4 };
    assert!(matches!(
        node.rule(missing),
        Err(Error::UnknownRule { index: 4, .. })
    ));
}

#[test]
fn controls_rejects_foreign_pins() {
    let (mut node, input, _) = wired(ControlType::EqualTo, 0);
    assert_eq!(
        node.controls(input, PinId(40), ControlType::EqualTo, None, None)
            .map(|_| ()),
        Err(Error::UnknownPin(40))
    );
}
