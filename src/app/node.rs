//! The node: pin topology plus rule engine.
//!
//! [`Node`] owns the [`NodeContext`] and an arena of [`Pin`]s.  Pins are
//! addressed by [`PinId`], rules by [`RuleId`] (owning pin + chain index).
//! Topology is wired once at startup and never torn down.
//!
//! ```text
//!  outer loop ──▶ read_value ──▶ update_all ──▶ apply_all
//!                     │               │              │
//!                 Hardware/       Transport      Rule::evaluate
//!                 Transport       tickets        ──▶ set_to(output)
//! ```

use log::info;

use crate::app::context::NodeContext;
use crate::app::ports::{
    ClockPort, HardwarePort, NvStorePort, RangingPort, StatusTag, TransportPort,
};
use crate::config::NodeConfig;
use crate::control::registry::RuleRegistry;
use crate::control::rule::{ControlType, InputSample, Rule, RuleWiring};
use crate::error::{Error, Result};
use crate::pin::{Pin, PinKind, ReadState};
use crate::pins;

/// Handle to a pin of one [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId(pub usize);

/// Handle to a rule: the pin whose chain holds it, and its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId {
    pub pin: PinId,
    pub index: usize,
}

pub struct Node<T, H, S, C> {
    ctx: NodeContext<T, H, S, C>,
    pins: Vec<Pin>,
    config: NodeConfig,
}

impl<T, H, S, C> Node<T, H, S, C>
where
    T: TransportPort,
    H: HardwarePort,
    S: NvStorePort,
    C: ClockPort,
{
    /// Validate `config` and take ownership of the ports.
    pub fn new(config: NodeConfig, transport: T, hardware: H, storage: S, clock: C) -> Result<Self> {
        config.validate()?;
        info!("Node {} starting", config.device_id);
        Ok(Self {
            ctx: NodeContext::new(config.device_id, transport, hardware, storage, clock),
            pins: Vec::new(),
            config,
        })
    }

    // ── Topology ──────────────────────────────────────────────

    /// Create a pin.  Local physical pins get their hardware mode; settable
    /// and user-control pins get a direct-set rule on themselves.
    pub fn add_pin(
        &mut self,
        device: u8,
        number: u8,
        kind: PinKind,
        name: &str,
        tag: Option<char>,
    ) -> PinId {
        self.insert(Pin::new(device, number, kind, name, tag))
    }

    /// Create a [`PinKind::Ranging`] pin reading from `sensor`.
    pub fn add_ranging_pin(
        &mut self,
        device: u8,
        number: u8,
        name: &str,
        tag: Option<char>,
        sensor: Box<dyn RangingPort>,
    ) -> PinId {
        self.insert(Pin::new(device, number, PinKind::Ranging, name, tag).with_ranging(sensor))
    }

    fn insert(&mut self, pin: Pin) -> PinId {
        let id = PinId(self.pins.len());
        if pin.is_addressable()
            && pin.device() == self.ctx.local_id
            && !pins::is_virtual(pin.number())
        {
            if let Some(mode) = pin.kind().initial_mode() {
                self.ctx.hardware.configure(pin.number(), mode);
            }
        }
        info!(
            "Pin #{} '{}' = device {} pin {} ({:?})",
            id.0,
            pin.name(),
            pin.device(),
            pin.number(),
            pin.kind()
        );
        let implicit = pin.kind().has_implicit_rule();
        let tag = pin.tag();
        self.pins.push(pin);

        if implicit {
            self.chain(RuleWiring {
                input: id,
                output: id,
                store: None,
                control: ControlType::DirectSet,
                id: tag,
            });
        }
        id
    }

    /// Chain a new rule reading `input` and driving `output`.
    pub fn controls(
        &mut self,
        input: PinId,
        output: PinId,
        control: ControlType,
        id: Option<char>,
        store: Option<PinId>,
    ) -> Result<RuleId> {
        self.pin(input)?;
        self.pin(output)?;
        if let Some(store) = store {
            self.pin(store)?;
        }
        Ok(self.chain(RuleWiring {
            input,
            output,
            store,
            control,
            id,
        }))
    }

    fn chain(&mut self, wiring: RuleWiring) -> RuleId {
        let rule = Rule::load(
            wiring,
            &self.config.pid,
            &mut self.ctx.registry,
            &mut self.ctx.storage,
        );
        info!(
            "Rule {:?}: pin #{} -> pin #{} (slot {}, @{})",
            wiring.control,
            wiring.input.0,
            wiring.output.0,
            rule.slot(),
            rule.storage_offset()
        );
        let index = self.pins[wiring.input.0].controls(rule);
        RuleId {
            pin: wiring.input,
            index,
        }
    }

    // ── Lookup ────────────────────────────────────────────────

    pub fn pin(&self, id: PinId) -> Result<&Pin> {
        self.pins.get(id.0).ok_or(Error::UnknownPin(id.0))
    }

    pub fn pin_mut(&mut self, id: PinId) -> Result<&mut Pin> {
        self.pins.get_mut(id.0).ok_or(Error::UnknownPin(id.0))
    }

    /// Every pin, in creation order.
    pub fn pins(&self) -> impl Iterator<Item = (PinId, &Pin)> {
        self.pins.iter().enumerate().map(|(i, p)| (PinId(i), p))
    }

    pub fn rule(&self, id: RuleId) -> Result<&Rule> {
        self.pin(id.pin)?.rules().get(id.index).ok_or(Error::UnknownRule {
            pin: id.pin.0,
            index: id.index,
        })
    }

    fn rule_mut(&mut self, id: RuleId) -> Result<&mut Rule> {
        self.pin_mut(id.pin)?
            .rules
            .get_mut(id.index)
            .ok_or(Error::UnknownRule {
                pin: id.pin.0,
                index: id.index,
            })
    }

    /// Handles of every rule `pin` feeds.
    pub fn rule_ids(&self, pin: PinId) -> Result<Vec<RuleId>> {
        let count = self.pin(pin)?.rules().len();
        Ok((0..count).map(|index| RuleId { pin, index }).collect())
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.ctx.registry
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn context(&self) -> &NodeContext<T, H, S, C> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut NodeContext<T, H, S, C> {
        &mut self.ctx
    }

    // ── Pin I/O ───────────────────────────────────────────────

    pub fn read_value(&mut self, pin: PinId, force_blocking: bool) -> Result<()> {
        let p = self.pins.get_mut(pin.0).ok_or(Error::UnknownPin(pin.0))?;
        p.read_value(&mut self.ctx, force_blocking);
        Ok(())
    }

    pub fn update_available(&mut self, pin: PinId) -> Result<bool> {
        let p = self.pins.get_mut(pin.0).ok_or(Error::UnknownPin(pin.0))?;
        Ok(p.update_available(&mut self.ctx))
    }

    /// Poll every pin; returns how many changed state.
    pub fn update_all(&mut self) -> usize {
        let mut changed = 0;
        for p in &mut self.pins {
            if p.update_available(&mut self.ctx) {
                changed += 1;
            }
        }
        changed
    }

    pub fn set_to(&mut self, pin: PinId, value: i32, status: StatusTag) -> Result<()> {
        let p = self.pins.get(pin.0).ok_or(Error::UnknownPin(pin.0))?;
        p.set_to(&mut self.ctx, value, status);
        Ok(())
    }

    pub fn status(&self, pin: PinId) -> Result<ReadState> {
        Ok(self.pin(pin)?.status())
    }

    pub fn raw_value(&self, pin: PinId) -> Result<i32> {
        Ok(self.pin(pin)?.raw_value())
    }

    pub fn modified_value(&self, pin: PinId) -> Result<i32> {
        Ok(self.pin(pin)?.modified_value())
    }

    // ── Rule evaluation ───────────────────────────────────────

    /// Evaluate one rule and perform its write, if any.
    pub fn apply(&mut self, id: RuleId) -> Result<()> {
        let now = self.ctx.clock.now_ms();
        let pin = self.pins.get_mut(id.pin.0).ok_or(Error::UnknownPin(id.pin.0))?;
        let sample = InputSample {
            state: pin.status(),
            raw: pin.raw_value(),
        };
        let rule = pin.rules.get_mut(id.index).ok_or(Error::UnknownRule {
            pin: id.pin.0,
            index: id.index,
        })?;
        let output = rule.output();
        if let Some(act) = rule.evaluate(sample, &self.config, now) {
            self.set_to(output, act.value, act.status)?;
        }
        Ok(())
    }

    /// Evaluate `pin`'s chain in order.
    pub fn apply_rules(&mut self, pin: PinId) -> Result<()> {
        for id in self.rule_ids(pin)? {
            self.apply(id)?;
        }
        Ok(())
    }

    /// Evaluate every chain, pins in creation order.
    pub fn apply_all(&mut self) -> Result<()> {
        for i in 0..self.pins.len() {
            self.apply_rules(PinId(i))?;
        }
        Ok(())
    }

    // ── Rule settings ─────────────────────────────────────────

    pub fn setpoint(&self, id: RuleId) -> Result<i32> {
        Ok(self.rule(id)?.setpoint())
    }

    /// Set the setpoint and mirror it to the store pin straight away.
    pub fn set_point(&mut self, id: RuleId, value: i32) -> Result<()> {
        let rule = self.rule_mut(id)?;
        rule.set_setpoint(value);
        if let Some(store) = rule.store() {
            self.set_to(store, value, StatusTag::Ok)?;
        }
        Ok(())
    }

    /// Move the setpoint by `delta` in the input pin's display units.
    pub fn set_point_add(&mut self, id: RuleId, delta: i32) -> Result<()> {
        let limit = self.config.setpoint_adjust_limit;
        let pin = self.pin(id.pin)?;
        let boolean = pin.is_boolean();
        let modifier = pin.modifier();
        let rule = self.rule_mut(id)?;
        rule.adjust_setpoint(delta, boolean, |v| modifier.map_or(v, |f| f(v)), limit)
    }

    /// Switch a rule on or off.  With a store pin, `(setpoint, status)` is
    /// pushed to the output pin at once.
    pub fn set_on(&mut self, id: RuleId, on: bool) -> Result<()> {
        let pin = self.pins.get_mut(id.pin.0).ok_or(Error::UnknownPin(id.pin.0))?;
        let rule = pin.rules.get_mut(id.index).ok_or(Error::UnknownRule {
            pin: id.pin.0,
            index: id.index,
        })?;
        rule.set_on(on, &mut self.ctx.registry);
        if rule.store().is_some() {
            let (output, setpoint, status) = (rule.output(), rule.setpoint(), rule.status());
            self.set_to(output, setpoint, status)?;
        }
        Ok(())
    }

    /// On/off state, as observed on the store pin when it is a local
    /// virtual pin.  Any other store pin falls back to the rule's status.
    pub fn is_on(&self, id: RuleId) -> Result<bool> {
        let rule = self.rule(id)?;
        if let Some(store) = rule.store() {
            let store = self.pin(store)?;
            if store.device() == self.ctx.local_id && pins::is_virtual(store.number()) {
                if let Some(status) = self.ctx.transport.virtual_status(store.number()) {
                    return Ok(status == StatusTag::On);
                }
            }
        }
        Ok(rule.is_on())
    }

    /// Automatic (`true`) or manual mode for a PID rule.
    pub fn enable_pid(&mut self, id: RuleId, enabled: bool) -> Result<()> {
        let input = self.raw_value(id.pin)?;
        self.rule_mut(id)?.enable_pid(enabled, input);
        Ok(())
    }

    /// Persist the rule and mirror `(setpoint, status)` to its store pin.
    pub fn save(&mut self, id: RuleId) -> Result<()> {
        let pin = self.pins.get(id.pin.0).ok_or(Error::UnknownPin(id.pin.0))?;
        let rule = pin.rules().get(id.index).ok_or(Error::UnknownRule {
            pin: id.pin.0,
            index: id.index,
        })?;
        rule.persist(&mut self.ctx.storage)?;
        if let Some(store) = rule.store() {
            let (setpoint, status) = (rule.setpoint(), rule.status());
            self.set_to(store, setpoint, status)?;
        }
        Ok(())
    }

    /// [`save`](Node::save) every rule; stops at the first storage failure.
    pub fn save_all(&mut self) -> Result<()> {
        for i in 0..self.pins.len() {
            for id in self.rule_ids(PinId(i))? {
                self.save(id)?;
            }
        }
        Ok(())
    }
}
