use crate::lcg::Lcg;
use serde::{Deserialize, Serialize};

/// Direction sand falls along the column axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gravity {
    /// Toward higher column indices (+1)
    #[default]
    Forward,
    /// Toward lower column indices (-1)
    Backward,
}

impl Gravity {
    /// Signed column step
    pub fn step(self) -> isize {
        match self {
            Gravity::Forward => 1,
            Gravity::Backward => -1,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Gravity::Forward => Gravity::Backward,
            Gravity::Backward => Gravity::Forward,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Gravity::Forward => "Forward",
            Gravity::Backward => "Backward",
        }
    }
}

/// Mutable per-run state, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationState {
    pub gravity: Gravity,
    pub lcg: Lcg,
    /// Consecutive ticks the probe window showed no change
    pub stable_ticks: u32,
}

impl SimulationState {
    pub fn new(seed: u32, gravity: Gravity) -> Self {
        Self {
            gravity,
            lcg: Lcg::new(seed),
            stable_ticks: 0,
        }
    }
}
