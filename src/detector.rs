use crate::grid::Grid;
use crate::state::SimulationState;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Static ticks tolerated before gravity reverses
pub const STABLE_TICK_THRESHOLD: u32 = 15;

/// Two adjacent columns over a short run of rows
///
/// The defaults sit on the neck of the 68x136 reference hourglass. They are
/// not rescaled for other board sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeWindow {
    pub first_row: usize,
    pub row_count: usize,
    /// The window covers `left_col` and `left_col + 1`
    pub left_col: usize,
}

impl Default for ProbeWindow {
    fn default() -> Self {
        Self {
            first_row: 32,
            row_count: 4,
            left_col: 67,
        }
    }
}

impl ProbeWindow {
    pub fn rows(&self) -> Range<usize> {
        self.first_row..self.first_row + self.row_count
    }

    pub fn right_col(&self) -> usize {
        self.left_col + 1
    }

    /// Whether every probed cell lies inside a grid of the given size
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.row_count > 0 && self.rows().end <= rows && self.right_col() < cols
    }
}

/// Outcome of one stability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// The window changed; counter reset
    Active,
    /// The window has been static for this many ticks
    Settling(u32),
    /// The counter passed the threshold and gravity reversed
    Flipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OscillationDetector {
    probe: ProbeWindow,
    threshold: u32,
}

impl OscillationDetector {
    pub fn new(probe: ProbeWindow, threshold: u32) -> Self {
        Self { probe, threshold }
    }

    pub fn probe(&self) -> ProbeWindow {
        self.probe
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// A window is static when both columns agree on every probed row and
    /// each column is uniform down the run.
    pub fn is_static(&self, grid: &Grid) -> bool {
        let left = self.probe.left_col;
        let right = self.probe.right_col();

        let columns_agree = self
            .probe
            .rows()
            .all(|row| grid.cell_at(row, left) == grid.cell_at(row, right));
        if !columns_agree {
            return false;
        }

        self.probe.rows().skip(1).all(|row| {
            grid.cell_at(row - 1, left) == grid.cell_at(row, left)
                && grid.cell_at(row - 1, right) == grid.cell_at(row, right)
        })
    }

    /// Update the stable-tick counter and reverse gravity once it exceeds
    /// the threshold.
    pub fn evaluate(&self, grid: &Grid, state: &mut SimulationState) -> Stability {
        if !self.is_static(grid) {
            state.stable_ticks = 0;
            return Stability::Active;
        }

        state.stable_ticks += 1;
        if state.stable_ticks > self.threshold {
            state.stable_ticks = 0;
            state.gravity = state.gravity.flipped();
            return Stability::Flipped;
        }
        Stability::Settling(state.stable_ticks)
    }
}

impl Default for OscillationDetector {
    fn default() -> Self {
        Self::new(ProbeWindow::default(), STABLE_TICK_THRESHOLD)
    }
}
