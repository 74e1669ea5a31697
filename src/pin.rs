//! Pins: one read/write surface over local, virtual and remote I/O.
//!
//! A [`Pin`] is addressed by `(device, number)`.  Local pins hit the board
//! through [`HardwarePort`], numbers above
//! [`LAST_PHYSICAL_PIN`](crate::pins::LAST_PHYSICAL_PIN) hit the transport's
//! virtual-pin store, and pins on other devices go over the peer link.
//!
//! Remote reads are either blocking or ticketed.  A ticketed read leaves the
//! pin [`ReadState::Pending`] until [`Pin::update_available`] sees the reply
//! or the transport timeout runs out.
//!
//! ```text
//!   read_value ──▶ Pending ──reply──▶ Ok
//!                     └────timeout──▶ Error
//! ```
//!
//! Pins with `device > 16` or `number > 127` ignore every read and write.

use log::{debug, trace, warn};

use crate::app::context::NodeContext;
use crate::app::ports::{
    ClockPort, HardwarePort, PinMode, RangingPort, StatusTag, Ticket, TransportPort,
};
use crate::control::rule::Rule;
use crate::pins::{self, NO_VALUE};

/// Raw-to-display conversion attached to a pin.
pub type ValueModifier = fn(i32) -> i32;

/// Fixed-capacity display label.
pub type PinName = heapless::String<16>;

/// What a pin is wired to, which fixes its hardware setup and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Input,
    InputPullUp,
    Output,
    /// Accepts writes without driving anything.
    Buzzer,
    /// Output whose value the user sets; gets a direct-set rule.
    Settable,
    /// Pure user value; gets a direct-set rule, no hardware setup.
    UserControl,
    /// Distance sensor; reads go to the attached [`RangingPort`].
    Ranging,
}

impl PinKind {
    /// Hardware configuration applied at construction, if any.
    pub fn initial_mode(self) -> Option<PinMode> {
        match self {
            Self::Input => Some(PinMode::Input),
            Self::InputPullUp => Some(PinMode::InputPullUp),
            Self::Output | Self::Buzzer | Self::Settable => Some(PinMode::Output),
            Self::UserControl | Self::Ranging => None,
        }
    }

    /// Whether construction chains an implicit direct-set rule.
    pub fn has_implicit_rule(self) -> bool {
        matches!(self, Self::Settable | Self::UserControl)
    }
}

/// Outcome of the last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Ok,
    /// Ticketed remote read in flight.
    Pending,
    /// Read failed, timed out, or never ran.
    Error,
}

pub struct Pin {
    device: u8,
    number: u8,
    kind: PinKind,
    name: PinName,
    tag: Option<char>,
    is_boolean: bool,
    value: i32,
    state: ReadState,
    ticket: Option<Ticket>,
    wait_start_ms: u64,
    modifier: Option<ValueModifier>,
    ranging: Option<Box<dyn RangingPort>>,
    pub(crate) rules: Vec<Rule>,
}

impl Pin {
    pub fn new(device: u8, number: u8, kind: PinKind, name: &str, tag: Option<char>) -> Self {
        let mut label = PinName::new();
        for c in name.chars() {
            if label.push(c).is_err() {
                break;
            }
        }
        Self {
            device,
            number,
            kind,
            name: label,
            tag,
            is_boolean: !pins::is_analog(number),
            value: NO_VALUE,
            state: ReadState::Error,
            ticket: None,
            wait_start_ms: 0,
            modifier: None,
            ranging: None,
            rules: Vec::new(),
        }
    }

    /// Attach the distance sensor a [`PinKind::Ranging`] pin reads from.
    pub fn with_ranging(mut self, sensor: Box<dyn RangingPort>) -> Self {
        self.ranging = Some(sensor);
        self
    }

    pub fn is_addressable(&self) -> bool {
        pins::is_addressable(self.device, self.number)
    }

    fn is_local(&self, local_id: u8) -> bool {
        self.device == local_id
    }

    // ── Reads ─────────────────────────────────────────────────

    /// Start a read.  Local and forced remote reads complete before
    /// returning; other remote reads leave the pin pending.
    ///
    /// Any earlier pending read is abandoned.
    pub fn read_value<T, H, S, C>(&mut self, ctx: &mut NodeContext<T, H, S, C>, force_blocking: bool)
    where
        T: TransportPort,
        H: HardwarePort,
        C: ClockPort,
    {
        if !self.is_addressable() {
            return;
        }
        self.state = ReadState::Error;
        self.ticket = None;

        if self.is_local(ctx.local_id) {
            let value = if self.kind == PinKind::Ranging {
                self.measure(&mut ctx.transport)
            } else if pins::is_virtual(self.number) {
                Some(ctx.transport.virtual_value(self.number).unwrap_or(0))
            } else if pins::is_analog(self.number) {
                Some(ctx.hardware.analog_read(self.number))
            } else {
                Some(ctx.hardware.digital_read(self.number))
            };
            self.complete(value);
            debug!("Pin {}: local read -> {:?}", self.name, self.state);
            return;
        }

        if ctx.transport.target() != self.device {
            ctx.transport.select_target(self.device);
        }
        let analog = pins::is_analog(self.number);

        if force_blocking {
            let value = if analog {
                ctx.transport.read_analog_blocking(self.number)
            } else {
                ctx.transport.read_digital_blocking(self.number)
            };
            self.complete(value);
            debug!(
                "Pin {}: blocking read from device {} -> {}",
                self.name, self.device, self.value
            );
        } else {
            self.wait_start_ms = ctx.clock.now_ms();
            self.ticket = if analog {
                ctx.transport.read_analog_async(self.number)
            } else {
                ctx.transport.read_digital_async(self.number)
            };
            self.state = ReadState::Pending;
            debug!(
                "Pin {}: read issued to device {} ({:?})",
                self.name, self.device, self.ticket
            );
        }
    }

    fn measure(&mut self, transport: &mut impl TransportPort) -> Option<i32> {
        let distance = self.ranging.as_mut()?.measure_distance()?;
        transport.set_virtual(self.number, distance, StatusTag::Ok);
        Some(distance)
    }

    fn complete(&mut self, value: Option<i32>) {
        match value {
            Some(v) if v != NO_VALUE => {
                self.value = v;
                self.state = ReadState::Ok;
            }
            _ => self.state = ReadState::Error,
        }
    }

    /// Advance the transport, then settle a pending read.
    /// Returns `true` when the read state changed.
    pub fn update_available<T, H, S, C>(&mut self, ctx: &mut NodeContext<T, H, S, C>) -> bool
    where
        T: TransportPort,
        C: ClockPort,
    {
        ctx.transport.advance();
        if self.state != ReadState::Pending {
            return false;
        }

        if let Some(ticket) = self.ticket {
            if let Some(value) = ctx.transport.poll_ticket(ticket) {
                self.value = value;
                self.state = ReadState::Ok;
                debug!("Pin {}: {:?} resolved -> {}", self.name, ticket, value);
                return true;
            }
        }

        let waited = ctx.clock.now_ms().wrapping_sub(self.wait_start_ms);
        if u128::from(waited) > ctx.transport.timeout().as_millis() {
            warn!(
                "Pin {}: no reply from device {} after {} ms",
                self.name, self.device, waited
            );
            self.ticket = None;
            self.state = ReadState::Error;
            return true;
        }
        false
    }

    // ── Writes ────────────────────────────────────────────────

    /// Drive the pin.  `status` only reaches virtual pins.
    pub fn set_to<T, H, S, C>(&self, ctx: &mut NodeContext<T, H, S, C>, value: i32, status: StatusTag)
    where
        T: TransportPort,
        H: HardwarePort,
    {
        if !self.is_addressable() {
            return;
        }

        if self.kind == PinKind::Buzzer {
            trace!("Pin {}: buzzer write {} ignored", self.name, value);
        } else if self.is_local(ctx.local_id) {
            if pins::is_virtual(self.number) {
                ctx.transport.set_virtual(self.number, value, status);
            } else if pins::is_analog(self.number) {
                ctx.hardware.analog_write(self.number, value);
            } else {
                ctx.hardware.digital_write(self.number, value);
            }
        } else {
            if ctx.transport.target() != self.device {
                ctx.transport.select_target(self.device);
            }
            if pins::is_analog(self.number) {
                ctx.transport.write_analog_blocking(self.number, value);
            } else {
                ctx.transport.write_digital_blocking(self.number, value);
            }
        }
    }

    // ── Values ────────────────────────────────────────────────

    pub fn status(&self) -> ReadState {
        self.state
    }

    pub fn raw_value(&self) -> i32 {
        self.value
    }

    pub fn attach_value_modifier(&mut self, modifier: ValueModifier) {
        self.modifier = Some(modifier);
    }

    pub fn modifier(&self) -> Option<ValueModifier> {
        self.modifier
    }

    /// Cached value in display units.
    pub fn modified_value(&self) -> i32 {
        self.modify_value(self.value)
    }

    /// `value` in display units.
    pub fn modify_value(&self, value: i32) -> i32 {
        self.modifier.map_or(value, |f| f(value))
    }

    // ── Identity ──────────────────────────────────────────────

    pub fn device(&self) -> u8 {
        self.device
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn kind(&self) -> PinKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<char> {
        self.tag
    }

    pub fn is_boolean(&self) -> bool {
        self.is_boolean
    }

    /// Rules this pin feeds, in creation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Append a rule to the end of the chain.
    pub fn controls(&mut self, rule: Rule) -> usize {
        self.rules.push(rule);
        self.rules.len() - 1
    }
}
