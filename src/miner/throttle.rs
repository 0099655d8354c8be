// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/throttle.rs
// Version: 1.0.0
//
// This file computes the pause a hash worker takes between iterations.
//
// The throttle factor is an intensity: 1.0 mines flat out, 0.0 waits the
// whole base interval after every iteration. Low battery, heat and a hidden
// host lower the effective factor; it recovers in small steps once the
// signals clear. Adjustments happen at most once per adjustment interval.
//
// Tree Location:
// - src/miner/throttle.rs (throttle controller)
// - Depends on: std

use super::signals::RuntimeSignals;
use std::time::{Duration, Instant};
use tracing::debug;

const LOG_TARGET: &str = "poolbridge::miner::throttle";

/// Full pause at throttle factor 0
pub const BASE_INTERVAL: Duration = Duration::from_millis(100);

/// Minimum spacing between two factor adjustments
pub const ADJUST_INTERVAL: Duration = Duration::from_secs(1);

/// Battery fraction below which intensity is capped hard
pub const BATTERY_CRITICAL: f32 = 0.20;
pub const BATTERY_LOW: f32 = 0.50;

/// Component temperatures in Celsius
pub const TEMP_CRITICAL: f32 = 85.0;
pub const TEMP_HIGH: f32 = 75.0;

/// Largest increase of the effective factor per adjustment
pub const RECOVERY_STEP: f64 = 0.1;

/// Throttle settings supplied when mining starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Declared intensity in `[0, 1]`
    pub throttle_factor: f64,
    pub battery_aware: bool,
    pub thermal_aware: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ThrottleConfig {
    pub fn new(throttle_factor: f64) -> Self {
        Self {
            throttle_factor,
            battery_aware: false,
            thermal_aware: false,
        }
    }

    pub fn with_battery_aware(mut self, enabled: bool) -> Self {
        self.battery_aware = enabled;
        self
    }

    pub fn with_thermal_aware(mut self, enabled: bool) -> Self {
        self.thermal_aware = enabled;
        self
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.throttle_factor)
    }
}

/// Wait before the next iteration: `max(0, (1 - factor) * base - elapsed)`.
pub fn compute_delay(throttle_factor: f64, elapsed: Duration, base_interval: Duration) -> Duration {
    let factor = if throttle_factor.is_nan() { 0.0 } else { throttle_factor.clamp(0.0, 1.0) };
    base_interval.mul_f64(1.0 - factor).saturating_sub(elapsed)
}

/// Intensity the signals allow for a declared configuration
pub fn target_factor(config: &ThrottleConfig, signals: &RuntimeSignals) -> f64 {
    let mut factor = config.throttle_factor.clamp(0.0, 1.0);

    if config.battery_aware && !signals.charging {
        match signals.battery_level {
            Some(level) if level < BATTERY_CRITICAL => factor = factor.min(0.25),
            Some(level) if level < BATTERY_LOW => factor = factor.min(0.5),
            _ => {}
        }
    }

    if config.thermal_aware {
        match signals.temperature_c {
            Some(temp) if temp >= TEMP_CRITICAL => factor = factor.min(0.1),
            Some(temp) if temp >= TEMP_HIGH => factor = factor.min(0.5),
            _ => {}
        }
    }

    if !signals.visible {
        factor *= 0.5;
    }

    factor
}

pub struct ThrottleController {
    config: ThrottleConfig,
    base_interval: Duration,
    adjust_interval: Duration,
    effective_factor: f64,
    last_adjust: Option<Instant>,
}

impl ThrottleController {
    pub fn new(config: ThrottleConfig, base_interval: Duration, adjust_interval: Duration) -> Self {
        Self {
            effective_factor: config.throttle_factor.clamp(0.0, 1.0),
            config,
            base_interval,
            adjust_interval,
            last_adjust: None,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn effective_factor(&self) -> f64 {
        self.effective_factor
    }

    /// Pause after an iteration that took `elapsed`, at the effective factor
    pub fn delay_for(&self, elapsed: Duration) -> Duration {
        compute_delay(self.effective_factor, elapsed, self.base_interval)
    }

    /// Fold new signals into the effective factor.
    ///
    /// Returns the new factor when it changed. Calls closer together than the
    /// adjustment interval are ignored. Reductions apply at once, increases
    /// are limited to `RECOVERY_STEP` per adjustment.
    pub fn adjust(&mut self, signals: &RuntimeSignals, now: Instant) -> Option<f64> {
        if let Some(last) = self.last_adjust {
            if now.saturating_duration_since(last) < self.adjust_interval {
                return None;
            }
        }
        self.last_adjust = Some(now);

        let target = target_factor(&self.config, signals);
        let next = if target < self.effective_factor {
            target
        } else {
            (self.effective_factor + RECOVERY_STEP).min(target)
        };

        if (next - self.effective_factor).abs() < f64::EPSILON {
            return None;
        }
        debug!(
            target: LOG_TARGET,
            "Throttle factor {:.2} -> {:.2} (target {:.2})", self.effective_factor, next, target
        );
        self.effective_factor = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_intensity_has_no_delay() {
        assert_eq!(compute_delay(1.0, Duration::ZERO, BASE_INTERVAL), Duration::ZERO);
    }

    #[test]
    fn zero_intensity_waits_base_interval_minus_elapsed() {
        assert_eq!(compute_delay(0.0, Duration::ZERO, BASE_INTERVAL), Duration::from_millis(100));
        assert_eq!(compute_delay(0.0, Duration::from_millis(30), BASE_INTERVAL), Duration::from_millis(70));
        assert_eq!(compute_delay(0.0, Duration::from_millis(250), BASE_INTERVAL), Duration::ZERO);
    }

    #[test]
    fn delay_never_increases_with_factor() {
        for elapsed_ms in [0u64, 10, 50, 99, 150] {
            let elapsed = Duration::from_millis(elapsed_ms);
            let mut previous = Duration::MAX;
            for step in 0..=20 {
                let delay = compute_delay(step as f64 / 20.0, elapsed, BASE_INTERVAL);
                assert!(delay <= previous, "delay rose at factor {}", step as f64 / 20.0);
                previous = delay;
            }
        }
    }

    #[test]
    fn out_of_range_factors_are_clamped() {
        assert_eq!(compute_delay(2.0, Duration::ZERO, BASE_INTERVAL), Duration::ZERO);
        assert_eq!(compute_delay(-1.0, Duration::ZERO, BASE_INTERVAL), BASE_INTERVAL);
        assert_eq!(compute_delay(f64::NAN, Duration::ZERO, BASE_INTERVAL), BASE_INTERVAL);
    }

    #[test]
    fn signals_lower_target_only_when_enabled() {
        let hot = RuntimeSignals {
            temperature_c: Some(90.0),
            battery_level: Some(0.1),
            ..RuntimeSignals::default()
        };
        assert_eq!(target_factor(&ThrottleConfig::new(1.0), &hot), 1.0);

        let thermal = ThrottleConfig::new(1.0).with_thermal_aware(true);
        assert_eq!(target_factor(&thermal, &hot), 0.1);

        let battery = ThrottleConfig::new(1.0).with_battery_aware(true);
        assert_eq!(target_factor(&battery, &hot), 0.25);

        let charging = RuntimeSignals { charging: true, ..hot };
        assert_eq!(target_factor(&battery, &charging), 1.0);
    }

    #[test]
    fn hidden_host_halves_intensity() {
        let hidden = RuntimeSignals {
            visible: false,
            ..RuntimeSignals::default()
        };
        assert_eq!(target_factor(&ThrottleConfig::new(0.8), &hidden), 0.4);
    }

    #[test]
    fn adjustments_are_rate_limited_and_recover_gradually() {
        let config = ThrottleConfig::new(1.0).with_thermal_aware(true);
        let mut controller = ThrottleController::new(config, BASE_INTERVAL, ADJUST_INTERVAL);
        let start = Instant::now();
        let hot = RuntimeSignals {
            temperature_c: Some(80.0),
            ..RuntimeSignals::default()
        };
        let cool = RuntimeSignals {
            temperature_c: Some(40.0),
            ..RuntimeSignals::default()
        };

        assert_eq!(controller.adjust(&hot, start), Some(0.5));
        // Too soon for another change
        assert_eq!(controller.adjust(&cool, start + Duration::from_millis(500)), None);
        assert_eq!(controller.effective_factor(), 0.5);

        let mut now = start;
        for _ in 0..5 {
            now += ADJUST_INTERVAL;
            assert!(controller.adjust(&cool, now).is_some());
        }
        assert!((controller.effective_factor() - 1.0).abs() < 1e-9);
        now += ADJUST_INTERVAL;
        assert_eq!(controller.adjust(&cool, now), None);
    }

    #[test]
    fn controller_delay_follows_effective_factor() {
        let config = ThrottleConfig::new(1.0).with_thermal_aware(true);
        let mut controller = ThrottleController::new(config, BASE_INTERVAL, ADJUST_INTERVAL);
        assert_eq!(controller.delay_for(Duration::from_millis(10)), Duration::ZERO);

        let hot = RuntimeSignals {
            temperature_c: Some(80.0),
            ..RuntimeSignals::default()
        };
        controller.adjust(&hot, Instant::now());
        assert_eq!(controller.delay_for(Duration::from_millis(10)), Duration::from_millis(40));
    }
}
