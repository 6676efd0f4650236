use hourglass_sand::bitmap::{FrameView, HEADER_LEN};
use hourglass_sand::detector::{ProbeWindow, Stability};
use hourglass_sand::engine::SandSimulation;
use hourglass_sand::grid::{Cell, Grid};
use hourglass_sand::layout::{Layout, LayoutPreset, BOARD_COLS, BOARD_ROWS, DEFAULT_GRAINS};
use hourglass_sand::settings::SimulationSettings;
use hourglass_sand::state::Gravity;
use tempfile::NamedTempFile;

fn hourglass(seed: u32) -> SandSimulation {
    let layout = LayoutPreset::Hourglass.build(DEFAULT_GRAINS).unwrap();
    SandSimulation::new(layout, seed, &SimulationSettings::default()).unwrap()
}

fn obstacles(grid: &Grid) -> Vec<(usize, usize, Cell)> {
    grid.iter().filter(|(_, _, cell)| cell.is_obstacle()).collect()
}

#[test]
fn grain_count_is_conserved() {
    let mut sim = hourglass(1);
    for _ in 0..300 {
        sim.tick();
        assert_eq!(sim.particles().len(), DEFAULT_GRAINS);
        assert_eq!(sim.grid().count(Cell::Sand), DEFAULT_GRAINS);
    }
    assert_eq!(sim.verify(), Ok(()));
}

#[test]
fn obstacles_never_change() {
    let mut sim = {
        let layout = LayoutPreset::Pegboard.build(1500).unwrap();
        SandSimulation::new(layout, 99, &SimulationSettings::default()).unwrap()
    };
    let before = obstacles(sim.grid());
    for _ in 0..200 {
        sim.tick();
    }
    assert_eq!(obstacles(sim.grid()), before);
}

#[test]
fn frame_decodes_to_grid() {
    let mut sim = hourglass(7);
    for _ in 0..50 {
        sim.tick();
    }

    let bytes = sim.bitmap().as_bytes();
    assert_eq!(bytes.len(), HEADER_LEN + BOARD_ROWS * BOARD_COLS / 8);

    let view = FrameView::parse(bytes).unwrap();
    assert_eq!((view.width(), view.height()), (BOARD_COLS, BOARD_ROWS));
    for (row, col, cell) in sim.grid().iter() {
        assert_eq!(view.get(row, col), cell.is_lit(), "pixel ({row}, {col})");
    }
}

#[test]
fn only_moved_grains_toggle_pixels() {
    let mut sim = hourglass(2024);
    for _ in 0..100 {
        let before = sim.bitmap().clone();
        let report = sim.tick();
        let changed: u32 = before
            .payload()
            .iter()
            .zip(sim.bitmap().payload())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert_eq!(changed as usize, report.bits_toggled);
        assert_eq!(report.bits_toggled, report.moved * 2);
    }
}

#[test]
fn same_seed_same_frames() {
    let mut a = hourglass(0xC0FFEE);
    let mut b = hourglass(0xC0FFEE);
    for _ in 0..250 {
        a.tick();
        b.tick();
        assert_eq!(a.bitmap(), b.bitmap());
    }
    assert_eq!(a.state(), b.state());
}

#[test]
fn settled_probe_flips_gravity_on_sixteenth_tick() {
    // A full column against the right wall cannot fall or spill
    let mut grid = Grid::bordered(8, 8);
    for row in 1..7 {
        grid.set_cell(row, 6, Cell::Sand);
    }
    let settings = SimulationSettings {
        probe: ProbeWindow {
            first_row: 2,
            row_count: 4,
            left_col: 3,
        },
        ..Default::default()
    };
    let mut sim = SandSimulation::new(Layout::from_grid(grid).unwrap(), 3, &settings).unwrap();

    for k in 1..=15 {
        let report = sim.tick();
        assert_eq!(report.moved, 0);
        assert_eq!(report.stability, Stability::Settling(k));
        assert_eq!(sim.gravity(), Gravity::Forward);
    }

    assert_eq!(sim.tick().stability, Stability::Flipped);
    assert_eq!(sim.gravity(), Gravity::Backward);
    assert_eq!(sim.state().stable_ticks, 0);

    // With gravity reversed every grain can fall away from the wall
    assert_eq!(sim.tick().moved, 6);
}

#[test]
fn hourglass_turns_itself_over() {
    let mut sim = hourglass(12345);
    let mut first_flip = None;
    for _ in 0..1200 {
        if sim.tick().stability == Stability::Flipped {
            first_flip = Some(sim.ticks());
            break;
        }
    }

    let Some(tick) = first_flip else {
        panic!("gravity never reversed in 1200 ticks");
    };
    assert!(tick > 100, "flipped before any sand crossed: tick {tick}");
    assert_eq!(sim.gravity(), Gravity::Backward);

    // Sand has crossed the neck into the right bulb
    let right = sim
        .particles()
        .iter()
        .filter(|p| p.col() >= BOARD_COLS / 2)
        .count();
    assert!(right > 0);
}

#[test]
fn exported_layout_replays_identically() {
    let layout = LayoutPreset::Pegboard.build(800).unwrap();
    let file = NamedTempFile::new().unwrap();
    layout.save(file.path()).unwrap();
    let loaded = Layout::load(file.path()).unwrap();
    assert_eq!(loaded.grid(), layout.grid());

    let settings = SimulationSettings::default();
    let mut a = SandSimulation::new(layout, 5, &settings).unwrap();
    let mut b = SandSimulation::new(loaded, 5, &settings).unwrap();
    for _ in 0..60 {
        a.tick();
        b.tick();
    }
    assert_eq!(a.bitmap(), b.bitmap());
}
