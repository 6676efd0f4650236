use crate::bitmap::PackedBitmap;
use crate::detector::Stability;
use crate::engine::SandSimulation;
use crate::scheduler::{Scheduler, TimerHandler};
use crate::settings::TimingSettings;
use rand::Rng;
use std::time::Duration;

/// Consumer of finished frames
pub trait RenderSink {
    /// Called once per tick, after every toggle for the tick is applied
    fn blit(&mut self, frame: &PackedBitmap);
}

/// One-shot seed supplier for the generator
pub trait EntropySource {
    fn seed(&mut self) -> u32;
}

/// Seeds from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngEntropy;

impl EntropySource for ThreadRngEntropy {
    fn seed(&mut self) -> u32 {
        rand::thread_rng().gen()
    }
}

/// Always hands out the same seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSeed(pub u32);

impl EntropySource for FixedSeed {
    fn seed(&mut self) -> u32 {
        self.0
    }
}

/// Discards frames
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn blit(&mut self, _frame: &PackedBitmap) {}
}

/// Timer-driven orchestration: tick, blit, re-arm
#[derive(Debug)]
pub struct Animation<S: RenderSink> {
    simulation: SandSimulation,
    sink: S,
    frame_period: Duration,
    startup_delay: Duration,
    running: bool,
}

impl<S: RenderSink> Animation<S> {
    pub fn new(simulation: SandSimulation, sink: S, timing: &TimingSettings) -> Self {
        Self {
            simulation,
            sink,
            frame_period: timing.frame_period(),
            startup_delay: timing.startup_delay(),
            running: false,
        }
    }

    /// Arm the first expiry after the startup delay
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        self.running = true;
        scheduler.schedule_periodic(self.startup_delay);
    }

    /// Stop ticking. Ticks are atomic, so there is nothing to roll back.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        self.running = false;
        scheduler.cancel();
    }

    /// Change cadence; a running timer is re-armed with the new period
    pub fn set_timing(&mut self, timing: &TimingSettings, scheduler: &mut dyn Scheduler) {
        self.frame_period = timing.frame_period();
        self.startup_delay = timing.startup_delay();
        if self.running {
            log::debug!("frame period now {:?}", self.frame_period);
            scheduler.schedule_periodic(self.frame_period);
        }
    }

    /// Swap in a fresh simulation, e.g. after a reset. The new board is
    /// blitted right away so the sink never shows the old one.
    pub fn replace_simulation(&mut self, simulation: SandSimulation) {
        self.simulation = simulation;
        self.sink.blit(self.simulation.bitmap());
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_period(&self) -> Duration {
        self.frame_period
    }

    pub fn simulation(&self) -> &SandSimulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut SandSimulation {
        &mut self.simulation
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (SandSimulation, S) {
        (self.simulation, self.sink)
    }
}

impl<S: RenderSink> TimerHandler for Animation<S> {
    fn on_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if !self.running {
            return;
        }

        let report = self.simulation.tick();
        self.sink.blit(self.simulation.bitmap());
        if report.stability == Stability::Flipped {
            log::info!(
                "gravity reversed to {} after {} ticks",
                self.simulation.gravity().name(),
                self.simulation.ticks()
            );
        }

        scheduler.schedule_periodic(self.frame_period);
    }
}
