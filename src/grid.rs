/// State of a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Cell {
    #[default]
    Blank = 0,
    /// Permanent frame around the board
    Wall,
    Sand,
    /// Static obstacle baked into the initial layout
    Barrier,
}

impl Cell {
    pub fn is_blank(self) -> bool {
        self == Cell::Blank
    }

    /// Walls and barriers never move and are never created or destroyed
    pub fn is_obstacle(self) -> bool {
        matches!(self, Cell::Wall | Cell::Barrier)
    }

    /// Whether the cell renders as a set pixel
    pub fn is_lit(self) -> bool {
        self != Cell::Blank
    }

    /// Character used by the text layout format
    pub fn symbol(self) -> char {
        match self {
            Cell::Blank => '.',
            Cell::Wall => '#',
            Cell::Sand => 'o',
            Cell::Barrier => '=',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Cell> {
        match symbol {
            '.' => Some(Cell::Blank),
            '#' => Some(Cell::Wall),
            'o' => Some(Cell::Sand),
            '=' => Some(Cell::Barrier),
            _ => None,
        }
    }
}

/// Position of a particle, stored as (column, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub col: u16,
    pub row: u16,
}

impl Coord {
    pub fn new(col: usize, row: usize) -> Self {
        debug_assert!(col <= u16::MAX as usize && row <= u16::MAX as usize);
        Self {
            col: col as u16,
            row: row as u16,
        }
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    pub fn row(self) -> usize {
        self.row as usize
    }
}

/// Row-major board of cells
///
/// Lookups never fail for in-bounds coordinates. Bordered grids keep a WALL
/// frame so neighbour probes of interior cells are always valid reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All-blank grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Blank; rows * cols],
        }
    }

    /// Blank grid framed by walls
    pub fn bordered(rows: usize, cols: usize) -> Self {
        let mut grid = Self::new(rows, cols);
        for col in 0..cols {
            grid.set_cell(0, col, Cell::Wall);
            grid.set_cell(rows - 1, col, Cell::Wall);
        }
        for row in 0..rows {
            grid.set_cell(row, 0, Cell::Wall);
            grid.set_cell(row, cols - 1, Cell::Wall);
        }
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(
            row < self.rows && col < self.cols,
            "cell ({row}, {col}) outside {}x{} grid",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    #[inline]
    pub fn cell_at(&self, row: usize, col: usize) -> Cell {
        self.cells[self.index(row, col)]
    }

    #[inline]
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        let idx = self.index(row, col);
        self.cells[idx] = cell;
    }

    /// Iterate all cells as (row, col, cell) in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, &cell)| (idx / cols, idx % cols, cell))
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// First border cell that is not a wall, if any
    pub fn first_open_border(&self) -> Option<(usize, usize)> {
        self.iter()
            .filter(|&(row, col, _)| {
                row == 0 || col == 0 || row + 1 == self.rows || col + 1 == self.cols
            })
            .find(|&(_, _, cell)| cell != Cell::Wall)
            .map(|(row, col, _)| (row, col))
    }

    pub fn is_bordered(&self) -> bool {
        self.first_open_border().is_none()
    }

    /// Coordinates of every sand cell, row-major
    pub fn sand_coords(&self) -> Vec<Coord> {
        self.iter()
            .filter(|&(_, _, cell)| cell == Cell::Sand)
            .map(|(row, col, _)| Coord::new(col, row))
            .collect()
    }
}
