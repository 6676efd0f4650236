//! Falling-sand hourglass for 1-bit status displays.
//!
//! [`SandSimulation`] owns the board, the particle list and the packed
//! bitmap. Each timer tick moves every grain once in a shuffled order,
//! toggles exactly the changed pixels, and lets the oscillation detector
//! reverse gravity once the probe window has been static for too long.
//! [`Animation`] wires a simulation to a host timer and render sink.

pub mod animation;
pub mod bitmap;
pub mod config;
pub mod detector;
pub mod engine;
pub mod grid;
pub mod layout;
pub mod lcg;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use animation::{Animation, EntropySource, FixedSeed, NullSink, RenderSink, ThreadRngEntropy};
pub use bitmap::{FrameView, PackedBitmap};
pub use engine::{SandSimulation, SimulationError, TickReport};
pub use layout::{Layout, LayoutPreset, LayoutSource};
pub use scheduler::{IntervalTimer, Scheduler, TimerHandler};
pub use settings::{SimulationSettings, TimingSettings};
pub use state::Gravity;
