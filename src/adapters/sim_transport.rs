//! In-memory peer link.
//!
//! [`SimTransport`] stands in for the serial request/reply codec on the host.
//! Peers are tables of pin values; a ticketed read is answered after a
//! configurable number of [`advance`](TransportPort::advance) calls, and an
//! offline peer never answers.  Every remote write is recorded.

use core::time::Duration;
use std::collections::{HashMap, HashSet};

use log::debug;

use crate::app::ports::{StatusTag, Ticket, TransportPort};

/// One blocking write that went out on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteWrite {
    pub device: u8,
    pub pin: u8,
    pub value: i32,
    pub analog: bool,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    remaining: u32,
    /// `None` when the peer will never answer.
    reply: Option<i32>,
}

pub struct SimTransport {
    target: u8,
    timeout: Duration,
    latency: u32,
    peers: HashMap<(u8, u8), i32>,
    offline: HashSet<u8>,
    in_flight: HashMap<Ticket, InFlight>,
    replies: HashMap<Ticket, i32>,
    next_ticket: u16,
    virtual_pins: HashMap<u8, (i32, StatusTag)>,
    writes: Vec<RemoteWrite>,
}

impl SimTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            target: 0,
            timeout,
            latency: 1,
            peers: HashMap::new(),
            offline: HashSet::new(),
            in_flight: HashMap::new(),
            replies: HashMap::new(),
            next_ticket: 0,
            virtual_pins: HashMap::new(),
            writes: Vec::new(),
        }
    }

    /// Value a peer reports for one of its pins.
    pub fn set_remote(&mut self, device: u8, pin: u8, value: i32) {
        self.peers.insert((device, pin), value);
    }

    pub fn remote(&self, device: u8, pin: u8) -> Option<i32> {
        self.peers.get(&(device, pin)).copied()
    }

    /// `advance` calls before a ticketed read is answered (minimum 1).
    pub fn set_latency(&mut self, advances: u32) {
        self.latency = advances;
    }

    pub fn set_offline(&mut self, device: u8, offline: bool) {
        if offline {
            self.offline.insert(device);
        } else {
            self.offline.remove(&device);
        }
    }

    /// Blocking writes sent so far.
    pub fn writes(&self) -> &[RemoteWrite] {
        &self.writes
    }

    /// Tickets issued but never answered or collected.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn lookup(&self, pin: u8) -> Option<i32> {
        if self.offline.contains(&self.target) {
            return None;
        }
        self.remote(self.target, pin)
    }

    fn issue(&mut self, pin: u8) -> Option<Ticket> {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let reply = self.lookup(pin);
        self.in_flight.insert(
            ticket,
            InFlight {
                remaining: self.latency,
                reply,
            },
        );
        debug!("sim link: {:?} -> device {} pin {}", ticket, self.target, pin);
        Some(ticket)
    }

    fn write(&mut self, pin: u8, value: i32, analog: bool) {
        if self.offline.contains(&self.target) {
            return;
        }
        self.peers.insert((self.target, pin), value);
        self.writes.push(RemoteWrite {
            device: self.target,
            pin,
            value,
            analog,
        });
    }
}

impl TransportPort for SimTransport {
    fn target(&self) -> u8 {
        self.target
    }

    fn select_target(&mut self, device: u8) {
        self.target = device;
    }

    fn read_digital_blocking(&mut self, pin: u8) -> Option<i32> {
        self.lookup(pin)
    }

    fn read_analog_blocking(&mut self, pin: u8) -> Option<i32> {
        self.lookup(pin)
    }

    fn read_digital_async(&mut self, pin: u8) -> Option<Ticket> {
        self.issue(pin)
    }

    fn read_analog_async(&mut self, pin: u8) -> Option<Ticket> {
        self.issue(pin)
    }

    fn poll_ticket(&mut self, ticket: Ticket) -> Option<i32> {
        self.replies.remove(&ticket)
    }

    fn write_digital_blocking(&mut self, pin: u8, value: i32) {
        self.write(pin, value, false);
    }

    fn write_analog_blocking(&mut self, pin: u8, value: i32) {
        self.write(pin, value, true);
    }

    fn set_virtual(&mut self, pin: u8, value: i32, status: StatusTag) {
        self.virtual_pins.insert(pin, (value, status));
    }

    fn virtual_value(&self, pin: u8) -> Option<i32> {
        self.virtual_pins.get(&pin).map(|&(v, _)| v)
    }

    fn virtual_status(&self, pin: u8) -> Option<StatusTag> {
        self.virtual_pins.get(&pin).map(|&(_, s)| s)
    }

    fn advance(&mut self) {
        let mut arrived = Vec::new();
        for (ticket, req) in &mut self.in_flight {
            let Some(value) = req.reply else { continue };
            if req.remaining <= 1 {
                arrived.push((*ticket, value));
            } else {
                req.remaining -= 1;
            }
        }
        for (ticket, value) in arrived {
            self.in_flight.remove(&ticket);
            self.replies.insert(ticket, value);
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
