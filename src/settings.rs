use crate::detector::{ProbeWindow, STABLE_TICK_THRESHOLD};
use crate::state::Gravity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;
pub const MIN_THRESHOLD: u32 = 1;
pub const MAX_THRESHOLD: u32 = 255;

/// Engine parameters fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Fall direction at startup
    pub gravity: Gravity,
    /// Static ticks tolerated before gravity reverses
    pub stable_threshold: u32,
    /// Cells inspected by the oscillation detector
    pub probe: ProbeWindow,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: Gravity::Forward,
            stable_threshold: STABLE_TICK_THRESHOLD,
            probe: ProbeWindow::default(),
        }
    }
}

impl SimulationSettings {
    /// Adjust threshold (clamped to 1-255)
    pub fn adjust_stable_threshold(&mut self, delta: i32) {
        let value = self.stable_threshold as i64 + delta as i64;
        self.stable_threshold = value.clamp(MIN_THRESHOLD as i64, MAX_THRESHOLD as i64) as u32;
    }
}

/// Timer cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSettings {
    pub fps: u32,
    /// Delay before the first tick
    pub startup_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            fps: 15,
            startup_delay_ms: 10,
        }
    }
}

impl TimingSettings {
    /// Period between ticks, truncated to whole milliseconds
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / self.fps.clamp(MIN_FPS, MAX_FPS) as u64)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Adjust fps (clamped to 1-60)
    pub fn adjust_fps(&mut self, delta: i32) {
        let value = self.fps as i64 + delta as i64;
        self.fps = value.clamp(MIN_FPS as i64, MAX_FPS as i64) as u32;
    }
}
