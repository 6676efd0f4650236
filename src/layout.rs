//! Initial layout supplier.
//!
//! A [`Layout`] is a validated starting board: a WALL-framed grid plus the
//! particle list that matches its sand cells. Layouts come from the built-in
//! presets or from a text file with one character per cell:
//!
//! ```text
//! #  wall       =  barrier
//! o  sand       .  blank
//! ```

use crate::bitmap::MAX_DIMENSION;
use crate::grid::{Cell, Coord, Grid};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reference display board
pub const BOARD_ROWS: usize = 68;
pub const BOARD_COLS: usize = 136;
pub const DEFAULT_GRAINS: usize = 1654;

/// The neck spans rows `center - 2 .. center + 2`
const NECK_HALF_HEIGHT: usize = 2;
/// Columns from the neck to the far end of each bulb
const BULB_LENGTH: usize = 40;
const PEG_START: usize = 10;
const PEG_SPACING: usize = 6;
/// Minimum open cells between a peg and the glass wall
const PEG_MARGIN: usize = 3;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to access layout file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("layout is empty")]
    Empty,
    #[error("layout must be at least 3x3, got {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },
    #[error("layout {rows}x{cols} exceeds the {MAX_DIMENSION} pixel limit")]
    TooLarge { rows: usize, cols: usize },
    #[error("line {line} has {found} cells, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown symbol {symbol:?} at line {line}, column {column}")]
    UnknownSymbol {
        line: usize,
        column: usize,
        symbol: char,
    },
    #[error("border cell ({row}, {col}) is not a wall")]
    Unbordered { row: usize, col: usize },
    #[error("requested {requested} grains but the source bulb holds {capacity}")]
    Capacity { requested: usize, capacity: usize },
}

/// Validated starting board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    grid: Grid,
    particles: Vec<Coord>,
}

impl Layout {
    /// Validate a grid and derive its particle list
    pub fn from_grid(grid: Grid) -> Result<Self, LayoutError> {
        let (rows, cols) = (grid.rows(), grid.cols());
        if rows < 3 || cols < 3 {
            return Err(LayoutError::TooSmall { rows, cols });
        }
        if rows > MAX_DIMENSION || cols > MAX_DIMENSION {
            return Err(LayoutError::TooLarge { rows, cols });
        }
        if let Some((row, col)) = grid.first_open_border() {
            return Err(LayoutError::Unbordered { row, col });
        }

        let particles = grid.sand_coords();
        Ok(Self { grid, particles })
    }

    /// Parse the text layout format
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = lines.first() else {
            return Err(LayoutError::Empty);
        };

        let rows = lines.len();
        let cols = first.chars().count();
        if rows < 3 || cols < 3 {
            return Err(LayoutError::TooSmall { rows, cols });
        }

        let mut grid = Grid::new(rows, cols);
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != cols {
                return Err(LayoutError::Ragged {
                    line: row + 1,
                    expected: cols,
                    found,
                });
            }
            for (col, symbol) in line.chars().enumerate() {
                let cell = Cell::from_symbol(symbol).ok_or(LayoutError::UnknownSymbol {
                    line: row + 1,
                    column: col + 1,
                    symbol,
                })?;
                grid.set_cell(row, col, cell);
            }
        }

        Self::from_grid(grid)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), LayoutError> {
        fs::write(path, self.to_text()).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Render back to the text format, one line per row
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity((self.grid.cols() + 1) * self.grid.rows());
        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                text.push(self.grid.cell_at(row, col).symbol());
            }
            text.push('\n');
        }
        text
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn particles(&self) -> &[Coord] {
        &self.particles
    }

    pub fn grains(&self) -> usize {
        self.particles.len()
    }

    pub fn into_parts(self) -> (Grid, Vec<Coord>) {
        (self.grid, self.particles)
    }
}

/// Built-in boards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutPreset {
    /// Barrier silhouette of an hourglass lying on its side
    #[default]
    Hourglass,
    /// Hourglass with staggered pegs in both bulbs
    Pegboard,
}

impl LayoutPreset {
    pub fn name(&self) -> &str {
        match self {
            LayoutPreset::Hourglass => "Hourglass",
            LayoutPreset::Pegboard => "Pegboard",
        }
    }

    pub fn next(&self) -> LayoutPreset {
        match self {
            LayoutPreset::Hourglass => LayoutPreset::Pegboard,
            LayoutPreset::Pegboard => LayoutPreset::Hourglass,
        }
    }

    pub fn prev(&self) -> LayoutPreset {
        // Two presets: stepping back is stepping forward
        self.next()
    }

    pub fn parse(name: &str) -> Option<LayoutPreset> {
        match name.to_lowercase().as_str() {
            "hourglass" | "glass" => Some(LayoutPreset::Hourglass),
            "pegboard" | "pegs" => Some(LayoutPreset::Pegboard),
            _ => None,
        }
    }

    /// Grain count that leaves the neck clear once a bulb has filled
    pub fn default_grains(&self) -> usize {
        match self {
            LayoutPreset::Hourglass => DEFAULT_GRAINS,
            LayoutPreset::Pegboard => 1500,
        }
    }

    pub fn build(&self, grains: usize) -> Result<Layout, LayoutError> {
        let mut grid = hourglass_grid(BOARD_ROWS, BOARD_COLS);
        if *self == LayoutPreset::Pegboard {
            add_pegs(&mut grid);
        }
        fill_source_bulb(&mut grid, grains)?;
        Layout::from_grid(grid)
    }
}

/// Where a simulation gets its starting board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutSource {
    Preset(LayoutPreset),
    File(PathBuf),
}

impl Default for LayoutSource {
    fn default() -> Self {
        LayoutSource::Preset(LayoutPreset::default())
    }
}

impl LayoutSource {
    /// Build the layout. `grains` only applies to presets; files carry
    /// their own sand.
    pub fn load(&self, grains: Option<usize>) -> Result<Layout, LayoutError> {
        match self {
            LayoutSource::Preset(preset) => {
                preset.build(grains.unwrap_or_else(|| preset.default_grains()))
            }
            LayoutSource::File(path) => Layout::load(path),
        }
    }

    pub fn name(&self) -> String {
        match self {
            LayoutSource::Preset(preset) => preset.name().to_string(),
            LayoutSource::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

/// Columns between `col` and the nearest neck column
fn neck_distance(col: usize, cols: usize) -> usize {
    let left_mid = (cols - 1) / 2;
    let right_mid = cols / 2;
    if col <= left_mid {
        left_mid - col
    } else {
        col - right_mid
    }
}

/// Open rows of the glass at a given neck distance, if the column is
/// inside the glass at all
fn glass_rows(distance: usize, rows: usize) -> Option<std::ops::Range<usize>> {
    if distance > BULB_LENGTH {
        return None;
    }
    let center = rows / 2;
    let half = (NECK_HALF_HEIGHT + distance).min(center - 1);
    Some(center - half..center + half)
}

fn hourglass_grid(rows: usize, cols: usize) -> Grid {
    let mut grid = Grid::bordered(rows, cols);
    for col in 1..cols - 1 {
        let open = glass_rows(neck_distance(col, cols), rows);
        for row in 1..rows - 1 {
            let inside = open.as_ref().is_some_and(|range| range.contains(&row));
            if !inside {
                grid.set_cell(row, col, Cell::Barrier);
            }
        }
    }
    grid
}

fn add_pegs(grid: &mut Grid) {
    let (rows, cols) = (grid.rows(), grid.cols());
    for col in 1..cols - 1 {
        let distance = neck_distance(col, cols);
        if distance < PEG_START || (distance - PEG_START) % PEG_SPACING != 0 {
            continue;
        }
        let Some(open) = glass_rows(distance, rows) else {
            continue;
        };
        // Alternate peg columns are offset by half a spacing
        let stagger = if (distance - PEG_START) / PEG_SPACING % 2 == 0 {
            0
        } else {
            PEG_SPACING / 2
        };
        for row in open.start + PEG_MARGIN..open.end.saturating_sub(PEG_MARGIN) {
            if (row + stagger) % PEG_SPACING == 0 {
                grid.set_cell(row, col, Cell::Barrier);
            }
        }
    }
}

/// Pack grains into the left bulb, nearest the neck first, so the pile
/// front starts at the neck.
fn fill_source_bulb(grid: &mut Grid, grains: usize) -> Result<(), LayoutError> {
    let left_mid = (grid.cols() - 1) / 2;
    let mut placed = 0;
    for col in (1..=left_mid).rev() {
        for row in 1..grid.rows() - 1 {
            if placed == grains {
                return Ok(());
            }
            if grid.cell_at(row, col).is_blank() {
                grid.set_cell(row, col, Cell::Sand);
                placed += 1;
            }
        }
    }
    if placed < grains {
        return Err(LayoutError::Capacity {
            requested: grains,
            capacity: placed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ProbeWindow;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SMALL: &str = "\
#######
#..o..#
#.=.o.#
#######
";

    #[test]
    fn test_parse_small_layout() {
        let layout = Layout::parse(SMALL).unwrap();
        assert_eq!((layout.grid().rows(), layout.grid().cols()), (4, 7));
        assert_eq!(layout.grid().cell_at(2, 2), Cell::Barrier);
        assert_eq!(layout.particles(), &[Coord::new(3, 1), Coord::new(4, 2)]);
        assert_eq!(layout.to_text(), SMALL);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Layout::parse("\n\n"), Err(LayoutError::Empty)));
        assert!(matches!(
            Layout::parse("###\n###\n"),
            Err(LayoutError::TooSmall { rows: 2, cols: 3 })
        ));
        assert!(matches!(
            Layout::parse("####\n#..#\n###\n"),
            Err(LayoutError::Ragged {
                line: 3,
                expected: 4,
                found: 3
            })
        ));
        assert!(matches!(
            Layout::parse("####\n#.x#\n####\n"),
            Err(LayoutError::UnknownSymbol {
                line: 2,
                column: 3,
                symbol: 'x'
            })
        ));
        assert!(matches!(
            Layout::parse("####\n#...\n####\n"),
            Err(LayoutError::Unbordered { row: 1, col: 3 })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let layout = Layout::parse(SMALL).unwrap();
        let file = NamedTempFile::new().unwrap();
        layout.save(file.path()).unwrap();

        let loaded = Layout::load(file.path()).unwrap();
        assert_eq!(loaded, layout);
    }

    #[test]
    fn test_load_tolerates_trailing_whitespace() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "#####  \n#.o.#\n#####\n\n").unwrap();
        let layout = Layout::load(file.path()).unwrap();
        assert_eq!(layout.grains(), 1);
    }

    #[test]
    fn test_missing_layout_file() {
        let err = Layout::load(Path::new("/nonexistent/board.txt")).unwrap_err();
        assert!(matches!(err, LayoutError::Io { .. }));
    }

    #[test]
    fn test_hourglass_shape() {
        let layout = LayoutPreset::Hourglass.build(DEFAULT_GRAINS).unwrap();
        let grid = layout.grid();
        assert_eq!((grid.rows(), grid.cols()), (BOARD_ROWS, BOARD_COLS));
        assert_eq!(layout.grains(), DEFAULT_GRAINS);

        // Neck: four open rows on the probe columns
        let probe = ProbeWindow::default();
        for col in [probe.left_col, probe.right_col()] {
            assert_eq!(grid.cell_at(31, col), Cell::Barrier);
            assert_eq!(grid.cell_at(36, col), Cell::Barrier);
        }
        assert_eq!(grid.cell_at(32, 68), Cell::Blank);

        // Beyond the bulbs the glass is solid
        assert_eq!(grid.cell_at(34, 26), Cell::Barrier);
        assert_eq!(grid.cell_at(34, 109), Cell::Barrier);
    }

    #[test]
    fn test_hourglass_sand_starts_in_left_bulb_at_neck() {
        let layout = LayoutPreset::Hourglass.build(DEFAULT_GRAINS).unwrap();
        assert!(layout.particles().iter().all(|p| p.col() <= 67));
        for row in 32..36 {
            assert_eq!(layout.grid().cell_at(row, 67), Cell::Sand);
        }
    }

    #[test]
    fn test_hourglass_capacity() {
        // 2 * (2 + 3 + ... + 33) + 9 * 66 open cells per bulb
        assert!(LayoutPreset::Hourglass.build(1714).is_ok());
        assert!(matches!(
            LayoutPreset::Hourglass.build(1715),
            Err(LayoutError::Capacity {
                requested: 1715,
                capacity: 1714
            })
        ));
    }

    #[test]
    fn test_pegboard_adds_barriers() {
        let plain = LayoutPreset::Hourglass.build(100).unwrap();
        let pegs = LayoutPreset::Pegboard.build(100).unwrap();
        assert!(pegs.grid().count(Cell::Barrier) > plain.grid().count(Cell::Barrier));
        assert!(LayoutPreset::Pegboard
            .build(LayoutPreset::Pegboard.default_grains())
            .is_ok());
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(LayoutPreset::parse("PEGS"), Some(LayoutPreset::Pegboard));
        assert_eq!(LayoutPreset::parse("tray"), None);
        assert_eq!(LayoutPreset::Hourglass.next(), LayoutPreset::Pegboard);
        assert_eq!(
            LayoutSource::File(PathBuf::from("/tmp/boards/wide.txt")).name(),
            "wide.txt"
        );
    }
}
