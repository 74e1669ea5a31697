//! Agnode simulator: runs the rule engine against in-memory peers.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                    │
//! │                                                          │
//! │  SimTransport   SimBoard    MemoryEeprom   SystemClock   │
//! │  (peer link)    (GPIO/ADC)  (rule records) (timeouts)    │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ───────────────    │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │        Node (pins · rules · registry)          │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `agnode-sim [config.json]`.  Set `RUST_LOG=debug` for per-read
//! traces.

#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use agnode::adapters::eeprom::MemoryEeprom;
use agnode::adapters::sim_board::SimBoard;
use agnode::adapters::sim_transport::SimTransport;
use agnode::adapters::time::SystemClock;
use agnode::app::node::Node;
use agnode::config::NodeConfig;
use agnode::control::rule::ControlType;
use agnode::pin::{PinKind, ReadState};
use agnode::pins::A0;

const EEPROM_BYTES: usize = 1024;
const LINK_TIMEOUT: Duration = Duration::from_millis(250);
const CYCLES: u32 = 20;
const CYCLE_PERIOD: Duration = Duration::from_millis(50);

/// Remote soil-moisture node.
const FIELD_DEVICE: u8 = 5;

fn load_config() -> Result<NodeConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("No config file given, using defaults");
        return Ok(NodeConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let cfg = NodeConfig::from_json(&text).with_context(|| format!("parsing {path}"))?;
    info!("Config loaded from {}", path);
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("=== Agnode simulator v{} ===", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let local = config.device_id;

    let mut link = SimTransport::new(LINK_TIMEOUT);
    link.set_remote(FIELD_DEVICE, A0, 742);
    link.set_latency(3);

    let mut board = SimBoard::new();
    board.set_level(2, 0);

    let mut node = Node::new(
        config,
        link,
        board,
        MemoryEeprom::new(EEPROM_BYTES),
        SystemClock::new(),
    )?;

    // ── Topology ──────────────────────────────────────────────
    let float_switch = node.add_pin(local, 2, PinKind::Input, "float", None);
    let valve = node.add_pin(local, 3, PinKind::Output, "valve", None);
    let moisture = node.add_pin(FIELD_DEVICE, A0, PinKind::Input, "moisture", None);
    let pump = node.add_pin(local, A0 + 1, PinKind::Output, "pump", None);
    let pump_store = node.add_pin(local, 70, PinKind::UserControl, "pump set", Some('P'));

    let fill = node.controls(float_switch, valve, ControlType::LessThan, Some('F'), None)?;
    node.set_point(fill, 1)?;
    node.set_on(fill, true)?;

    let irrigate = node.controls(
        moisture,
        pump,
        ControlType::GreaterThan,
        Some('M'),
        Some(pump_store),
    )?;
    node.set_point(irrigate, 500)?;
    node.set_on(irrigate, true)?;
    node.save_all()?;

    info!(
        "Active rules: {}",
        node.registry().active_ids().collect::<String>()
    );

    // ── Main loop ─────────────────────────────────────────────
    for cycle in 0..CYCLES {
        if cycle == CYCLES / 2 {
            info!("Float switch closes");
            node.context_mut().hardware.set_level(2, 1);
        }

        node.read_value(float_switch, false)?;
        if node.status(moisture)? != ReadState::Pending {
            node.read_value(moisture, false)?;
        }
        let settled = node.update_all();
        if settled > 0 {
            info!(
                "cycle {}: moisture {:?} = {}",
                cycle,
                node.status(moisture)?,
                node.raw_value(moisture)?
            );
        }
        if let Err(e) = node.apply_all() {
            warn!("cycle {}: rule evaluation failed: {}", cycle, e);
        }
        std::thread::sleep(CYCLE_PERIOD);
    }

    let board = &node.context().hardware;
    info!(
        "valve={:?} pump={:?}",
        board.last_write(3).map(|w| w.value),
        board.last_write(A0 + 1).map(|w| w.value)
    );
    Ok(())
}
