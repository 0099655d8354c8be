// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/signals.rs
// Version: 1.0.0
//
// This file provides the runtime signals the throttle controller reacts to:
// host visibility, battery state and hardware temperature.
//
// Battery state comes from the kernel's power-supply class
// (/sys/class/power_supply); hosts without it report no battery.
//
// Tree Location:
// - src/miner/signals.rs (power and thermal signal sources)
// - Depends on: sysinfo

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use sysinfo::Components;
use tracing::debug;

const LOG_TARGET: &str = "poolbridge::miner::signals";

/// Where Linux exposes batteries and adapters
pub const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// One sample of host conditions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeSignals {
    /// Whether the host considers the miner in the foreground
    pub visible: bool,
    /// Battery charge as a fraction in `[0, 1]`, when known
    pub battery_level: Option<f32>,
    pub charging: bool,
    /// Hottest component temperature in Celsius, when known
    pub temperature_c: Option<f32>,
}

impl Default for RuntimeSignals {
    fn default() -> Self {
        Self {
            visible: true,
            battery_level: None,
            charging: false,
            temperature_c: None,
        }
    }
}

pub trait SignalSource: Send + Sync {
    fn sample(&self) -> RuntimeSignals;
}

/// Signals pushed by the embedding application.
///
/// Clones share the same values, so the host keeps one clone and updates it
/// while the scheduler samples another.
#[derive(Clone, Default)]
pub struct ManualSignals {
    current: Arc<Mutex<RuntimeSignals>>,
}

impl ManualSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, signals: RuntimeSignals) {
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = signals;
    }

    pub fn update(&self, apply: impl FnOnce(&mut RuntimeSignals)) {
        apply(&mut self.current.lock().unwrap_or_else(|p| p.into_inner()));
    }
}

impl SignalSource for ManualSignals {
    fn sample(&self) -> RuntimeSignals {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Temperature from the machine's sensors via sysinfo, battery level and
/// charging state from the power-supply class.
pub struct SystemSignals {
    components: Mutex<Components>,
    power_supply: PathBuf,
}

impl Default for SystemSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSignals {
    pub fn new() -> Self {
        Self {
            components: Mutex::new(Components::new_with_refreshed_list()),
            power_supply: PathBuf::from(POWER_SUPPLY_DIR),
        }
    }

    /// Read batteries from another power-supply directory
    pub fn with_power_supply_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.power_supply = dir.into();
        self
    }
}

/// Battery reading: charge fraction of the emptiest battery and whether any
/// battery is charging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub level: f32,
    pub charging: bool,
}

/// Scan a power-supply directory for batteries. `None` when there are none.
pub fn read_battery(dir: &Path) -> Option<BatteryReading> {
    let entries = fs::read_dir(dir).ok()?;
    let mut reading: Option<BatteryReading> = None;

    for entry in entries.flatten() {
        let supply = entry.path();
        if read_attr(&supply, "type").as_deref() != Some("Battery") {
            continue;
        }
        let Some(capacity) = read_attr(&supply, "capacity").and_then(|c| c.parse::<f32>().ok()) else {
            debug!(target: LOG_TARGET, "Battery {} has no readable capacity", supply.display());
            continue;
        };
        let level = (capacity / 100.0).clamp(0.0, 1.0);
        let charging = matches!(read_attr(&supply, "status").as_deref(), Some("Charging") | Some("Full"));

        reading = Some(match reading {
            Some(current) => BatteryReading {
                level: current.level.min(level),
                charging: current.charging || charging,
            },
            None => BatteryReading { level, charging },
        });
    }
    reading
}

fn read_attr(supply: &Path, name: &str) -> Option<String> {
    fs::read_to_string(supply.join(name)).ok().map(|v| v.trim().to_string())
}

impl SignalSource for SystemSignals {
    fn sample(&self) -> RuntimeSignals {
        let mut components = self.components.lock().unwrap_or_else(|p| p.into_inner());
        components.refresh(false);
        let temperature_c = components
            .list()
            .iter()
            .filter_map(|c| c.temperature())
            .filter(|t| t.is_finite())
            .reduce(f32::max);
        drop(components);

        let battery = read_battery(&self.power_supply);
        RuntimeSignals {
            temperature_c,
            battery_level: battery.map(|b| b.level),
            charging: battery.is_some_and(|b| b.charging),
            ..RuntimeSignals::default()
        }
    }
}
