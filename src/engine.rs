use crate::bitmap::{BitmapError, PackedBitmap};
use crate::detector::{OscillationDetector, ProbeWindow, Stability};
use crate::grid::{Cell, Coord, Grid};
use crate::layout::{Layout, LayoutError};
use crate::lcg::{pick_index, spill_up};
use crate::settings::SimulationSettings;
use crate::state::{Gravity, SimulationState};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Bitmap(#[from] BitmapError),
    #[error("probe window {probe:?} does not fit a {rows}x{cols} board")]
    ProbeOutOfBounds {
        probe: ProbeWindow,
        rows: usize,
        cols: usize,
    },
}

/// Grid, particle list and bitmap disagree. Always a bug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{found} sand cells for {expected} particles")]
    SandCount { expected: usize, found: usize },
    #[error("particle at {0:?} does not sit on a sand cell")]
    Orphan(Coord),
    #[error("two particles share {0:?}")]
    Duplicate(Coord),
    #[error("bitmap pixel ({row}, {col}) disagrees with the grid")]
    BitmapMismatch { row: usize, col: usize },
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub moved: usize,
    pub bits_toggled: usize,
    pub stability: Stability,
}

/// Owns the board and advances it one tick at a time
#[derive(Debug, Clone)]
pub struct SandSimulation {
    grid: Grid,
    particles: Vec<Coord>,
    bitmap: PackedBitmap,
    state: SimulationState,
    detector: OscillationDetector,
    ticks: u64,
    flips: u64,
}

impl SandSimulation {
    pub fn new(
        layout: Layout,
        seed: u32,
        settings: &SimulationSettings,
    ) -> Result<Self, SimulationError> {
        let (grid, particles) = layout.into_parts();
        if !settings.probe.fits(grid.rows(), grid.cols()) {
            return Err(SimulationError::ProbeOutOfBounds {
                probe: settings.probe,
                rows: grid.rows(),
                cols: grid.cols(),
            });
        }

        let bitmap = PackedBitmap::from_grid(&grid)?;
        Ok(Self {
            grid,
            particles,
            bitmap,
            state: SimulationState::new(seed, settings.gravity),
            detector: OscillationDetector::new(settings.probe, settings.stable_threshold),
            ticks: 0,
            flips: 0,
        })
    }

    /// Advance every particle once, then check the probe window.
    ///
    /// All bitmap toggles for the tick happen before this returns, so the
    /// bitmap is never observable half-updated.
    pub fn tick(&mut self) -> TickReport {
        let moved = self.step_particles();
        let stability = self.detector.evaluate(&self.grid, &mut self.state);
        if stability == Stability::Flipped {
            self.flips += 1;
            log::debug!(
                "tick {}: probe static for over {} ticks, gravity now {}",
                self.ticks,
                self.detector.threshold(),
                self.state.gravity.name()
            );
        }
        self.ticks += 1;

        if cfg!(debug_assertions) {
            if let Err(violation) = self.verify() {
                panic!("sand invariant violated after tick {}: {violation}", self.ticks);
            }
        }

        log::trace!("tick {}: {moved} grains moved, {stability:?}", self.ticks);
        TickReport {
            moved,
            bits_toggled: moved * 2,
            stability,
        }
    }

    /// Fisher-Yates walk over the particle list: each draw picks one of the
    /// unvisited entries, swaps it to the end of the unvisited prefix and
    /// processes it. Every particle is evaluated exactly once.
    fn step_particles(&mut self) -> usize {
        let mut moved = 0;
        for remaining in (1..=self.particles.len()).rev() {
            let draw = self.state.lcg.next_u32();
            let last = remaining - 1;
            self.particles.swap(pick_index(draw, remaining), last);

            let from = self.particles[last];
            if let Some(to) = self.choose_move(from, draw) {
                self.apply_move(from, to);
                self.particles[last] = to;
                moved += 1;
            }
        }
        moved
    }

    /// Fall one column along gravity, else spill one row up or down
    fn choose_move(&self, at: Coord, draw: u32) -> Option<Coord> {
        let (row, col) = (at.row(), at.col());
        debug_assert!(
            row > 0 && row + 1 < self.grid.rows(),
            "particle {at:?} on the border"
        );

        let ahead = col.wrapping_add_signed(self.state.gravity.step());
        if self.grid.cell_at(row, ahead).is_blank() {
            return Some(Coord::new(ahead, row));
        }

        let up = self.grid.cell_at(row - 1, col).is_blank();
        let down = self.grid.cell_at(row + 1, col).is_blank();
        match (up, down) {
            (true, true) if spill_up(draw) => Some(Coord::new(col, row - 1)),
            (true, true) => Some(Coord::new(col, row + 1)),
            (true, false) => Some(Coord::new(col, row - 1)),
            (false, true) => Some(Coord::new(col, row + 1)),
            (false, false) => None,
        }
    }

    fn apply_move(&mut self, from: Coord, to: Coord) {
        debug_assert_eq!(self.grid.cell_at(from.row(), from.col()), Cell::Sand);
        debug_assert!(self.grid.cell_at(to.row(), to.col()).is_blank());
        debug_assert!(self.bitmap.get(from.row(), from.col()));
        debug_assert!(!self.bitmap.get(to.row(), to.col()));

        self.grid.set_cell(from.row(), from.col(), Cell::Blank);
        self.grid.set_cell(to.row(), to.col(), Cell::Sand);
        self.bitmap.toggle(from.row(), from.col());
        self.bitmap.toggle(to.row(), to.col());
    }

    /// Full consistency check of grid, particle list and bitmap
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let found = self.grid.count(Cell::Sand);
        if found != self.particles.len() {
            return Err(InvariantViolation::SandCount {
                expected: self.particles.len(),
                found,
            });
        }

        let mut seen = HashSet::with_capacity(self.particles.len());
        for &particle in &self.particles {
            if self.grid.cell_at(particle.row(), particle.col()) != Cell::Sand {
                return Err(InvariantViolation::Orphan(particle));
            }
            if !seen.insert(particle) {
                return Err(InvariantViolation::Duplicate(particle));
            }
        }

        for (row, col, cell) in self.grid.iter() {
            if self.bitmap.get(row, col) != cell.is_lit() {
                return Err(InvariantViolation::BitmapMismatch { row, col });
            }
        }
        Ok(())
    }

    /// Reverse gravity by hand; the stable-tick counter restarts
    pub fn flip_gravity(&mut self) {
        self.state.gravity = self.state.gravity.flipped();
        self.state.stable_ticks = 0;
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn particles(&self) -> &[Coord] {
        &self.particles
    }

    pub fn bitmap(&self) -> &PackedBitmap {
        &self.bitmap
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn detector(&self) -> &OscillationDetector {
        &self.detector
    }

    pub fn gravity(&self) -> Gravity {
        self.state.gravity
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn flips(&self) -> u64 {
        self.flips
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_for(probe: ProbeWindow) -> SimulationSettings {
        SimulationSettings {
            probe,
            ..Default::default()
        }
    }

    fn corner_probe() -> ProbeWindow {
        ProbeWindow {
            first_row: 1,
            row_count: 2,
            left_col: 1,
        }
    }

    fn sim_from(text: &str, seed: u32) -> SandSimulation {
        let layout = Layout::parse(text).unwrap();
        SandSimulation::new(layout, seed, &settings_for(corner_probe())).unwrap()
    }

    #[test]
    fn test_probe_must_fit() {
        let layout = Layout::parse("#####\n#.o.#\n#####\n").unwrap();
        let err = SandSimulation::new(layout, 1, &SimulationSettings::default()).unwrap_err();
        assert!(matches!(err, SimulationError::ProbeOutOfBounds { rows: 3, cols: 5, .. }));
    }

    #[test]
    fn test_fall_takes_priority() {
        let sim = sim_from("######\n#....#\n#.o..#\n#....#\n######\n", 1);
        let at = Coord::new(2, 2);
        // Up and down are open too, but falling wins regardless of the draw
        assert_eq!(sim.choose_move(at, 0), Some(Coord::new(3, 2)));
        assert_eq!(sim.choose_move(at, u32::MAX), Some(Coord::new(3, 2)));
    }

    #[test]
    fn test_spill_tie_uses_bit_16() {
        let sim = sim_from("#####\n#...#\n#.o=#\n#...#\n#####\n", 1);
        let at = Coord::new(2, 2);
        assert_eq!(sim.choose_move(at, 1 << 16), Some(Coord::new(2, 1)));
        assert_eq!(sim.choose_move(at, 0), Some(Coord::new(2, 3)));
    }

    #[test]
    fn test_single_open_spill_is_deterministic() {
        let sim = sim_from("#####\n#.=.#\n#.o=#\n#...#\n#####\n", 1);
        let at = Coord::new(2, 2);
        assert_eq!(sim.choose_move(at, 1 << 16), Some(Coord::new(2, 3)));
        assert_eq!(sim.choose_move(at, 0), Some(Coord::new(2, 3)));
    }

    #[test]
    fn test_boxed_in_particle_stays() {
        let mut sim = sim_from("#####\n#.=.#\n#.o=#\n#.=.#\n#####\n", 1);
        assert_eq!(sim.choose_move(Coord::new(2, 2), 0), None);

        let before = sim.bitmap().clone();
        let report = sim.tick();
        assert_eq!(report.moved, 0);
        assert_eq!(report.bits_toggled, 0);
        assert_eq!(sim.bitmap(), &before);
    }

    #[test]
    fn test_backward_gravity_falls_left() {
        let layout = Layout::parse("######\n#....#\n#..o.#\n#....#\n######\n").unwrap();
        let settings = SimulationSettings {
            gravity: Gravity::Backward,
            ..settings_for(corner_probe())
        };
        let mut sim = SandSimulation::new(layout, 3, &settings).unwrap();
        sim.tick();
        assert_eq!(sim.particles(), &[Coord::new(2, 2)]);
        assert_eq!(sim.grid().cell_at(2, 2), Cell::Sand);
        assert_eq!(sim.grid().cell_at(2, 3), Cell::Blank);
    }

    #[test]
    fn test_column_of_grains_moves_together() {
        // Three grains in column 5, rows 5-7, nothing ahead of them
        let mut grid = Grid::bordered(12, 16);
        for row in 5..=7 {
            grid.set_cell(row, 5, Cell::Sand);
        }
        let layout = Layout::from_grid(grid).unwrap();
        let mut sim = SandSimulation::new(layout, 42, &settings_for(corner_probe())).unwrap();
        let before = sim.bitmap().clone();

        let report = sim.tick();
        assert_eq!(report.moved, 3);
        assert_eq!(report.bits_toggled, 6);

        let mut positions = sim.particles().to_vec();
        positions.sort();
        assert_eq!(
            positions,
            vec![Coord::new(6, 5), Coord::new(6, 6), Coord::new(6, 7)]
        );

        let changed: u32 = before
            .payload()
            .iter()
            .zip(sim.bitmap().payload())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert_eq!(changed, 6);
    }

    #[test]
    fn test_every_particle_visited_once() {
        // Fully packed box: nothing can move, so the tick only permutes the list
        let mut grid = Grid::bordered(6, 6);
        for row in 1..5 {
            for col in 1..5 {
                grid.set_cell(row, col, Cell::Sand);
            }
        }
        let layout = Layout::from_grid(grid).unwrap();
        let mut sim = SandSimulation::new(layout, 9, &settings_for(corner_probe())).unwrap();
        let mut before = sim.particles().to_vec();

        assert_eq!(sim.tick().moved, 0);
        let mut after = sim.particles().to_vec();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn test_verify_catches_desync() {
        let mut sim = sim_from("######\n#.o..#\n#....#\n######\n", 5);
        assert_eq!(sim.verify(), Ok(()));

        sim.grid.set_cell(2, 3, Cell::Sand);
        assert_eq!(
            sim.verify(),
            Err(InvariantViolation::SandCount {
                expected: 1,
                found: 2
            })
        );

        sim.grid.set_cell(2, 3, Cell::Blank);
        sim.bitmap.toggle(2, 3);
        assert_eq!(
            sim.verify(),
            Err(InvariantViolation::BitmapMismatch { row: 2, col: 3 })
        );
    }

    #[test]
    fn test_manual_flip_resets_counter() {
        let mut sim = sim_from("######\n#.o..#\n#....#\n######\n", 5);
        sim.state.stable_ticks = 7;
        sim.flip_gravity();
        assert_eq!(sim.gravity(), Gravity::Backward);
        assert_eq!(sim.state().stable_ticks, 0);
    }
}
