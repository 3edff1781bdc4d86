//! Dense occupancy map and world/cell coordinate transforms.

use std::fmt;

use glam::Vec2;
use thiserror::Error;
use worm_bricks_core::{CellCoord, CellState, Direction, OccupancyView, Occupant};

/// Reasons a grid mutation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GridError {
    /// The cell lies outside the grid.
    #[error("cell ({column}, {row}) lies outside the grid")]
    OutOfBounds {
        /// Requested column.
        column: u32,
        /// Requested row.
        row: u32,
    },
    /// The world position does not round to any cell.
    #[error("world position ({x}, {y}) lies outside the grid")]
    OffGrid {
        /// Requested horizontal coordinate.
        x: f32,
        /// Requested vertical coordinate.
        y: f32,
    },
}

/// Fixed-size map from cells to the occupant claiming them.
///
/// The map never owns occupants. It records which pool entry claims a cell
/// and callers keep it consistent by probing with [`GridMap::check`] before
/// calling [`GridMap::set`].
#[derive(Clone, Debug)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    cell_size: f32,
    origin: Vec2,
    cells: Vec<Option<Occupant>>,
}

impl GridMap {
    /// Creates an empty map centred inside a viewport of the provided size.
    #[must_use]
    pub fn new(columns: u32, rows: u32, cell_size: f32, viewport: Vec2) -> Self {
        let extent = Vec2::new(columns as f32, rows as f32) * cell_size;
        let origin = (viewport - extent) * 0.5 + Vec2::splat(cell_size * 0.5);
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            cell_size,
            origin,
            cells: vec![None; capacity],
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Centre of the cell in world space.
    #[must_use]
    pub fn to_world(&self, cell: CellCoord) -> Vec2 {
        self.origin + Vec2::new(cell.column() as f32, cell.row() as f32) * self.cell_size
    }

    /// Cell whose centre is nearest to the world position.
    ///
    /// Rounds half away from zero and returns `None` off the grid or for
    /// non-finite positions.
    #[must_use]
    pub fn to_cell(&self, position: Vec2) -> Option<CellCoord> {
        let local = (position - self.origin) / self.cell_size;
        if !local.is_finite() {
            return None;
        }
        let column = local.x.round();
        let row = local.y.round();
        if column < 0.0 || row < 0.0 || column >= self.columns as f32 || row >= self.rows as f32 {
            return None;
        }
        Some(CellCoord::new(column as u32, row as u32))
    }

    /// Classifies a cell for movement checks.
    #[must_use]
    pub fn check(&self, cell: CellCoord) -> CellState {
        self.view().state(cell)
    }

    /// Classifies the cell one step away from `cell`.
    #[must_use]
    pub fn check_step(&self, cell: CellCoord, direction: Direction) -> CellState {
        cell.neighbor(direction)
            .map_or(CellState::OutOfBounds, |next| self.check(next))
    }

    /// Classifies the cell under a world position.
    #[must_use]
    pub fn check_world(&self, position: Vec2) -> CellState {
        self.to_cell(position)
            .map_or(CellState::OutOfBounds, |cell| self.check(cell))
    }

    /// Occupant claiming the cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Occupant> {
        self.index(cell).and_then(|index| self.cells[index])
    }

    /// Overwrites a cell.
    pub fn set(&mut self, cell: CellCoord, occupant: Option<Occupant>) -> Result<(), GridError> {
        let index = self.index(cell).ok_or(GridError::OutOfBounds {
            column: cell.column(),
            row: cell.row(),
        })?;
        self.cells[index] = occupant;
        Ok(())
    }

    /// Overwrites the cell under a world position.
    pub fn set_world(
        &mut self,
        position: Vec2,
        occupant: Option<Occupant>,
    ) -> Result<(), GridError> {
        let cell = self.to_cell(position).ok_or(GridError::OffGrid {
            x: position.x,
            y: position.y,
        })?;
        self.set(cell, occupant)
    }

    /// Empties the cell if `occupant` still claims it.
    pub fn release(&mut self, cell: CellCoord, occupant: Occupant) -> bool {
        match self.index(cell) {
            Some(index) if self.cells[index] == Some(occupant) => {
                self.cells[index] = None;
                true
            }
            _ => false,
        }
    }

    /// Number of cells claimed by `occupant`.
    #[must_use]
    pub fn claimed_by(&self, occupant: Occupant) -> usize {
        self.cells
            .iter()
            .filter(|cell| **cell == Some(occupant))
            .count()
    }

    /// Read-only view for systems.
    #[must_use]
    pub fn view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.cells, self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Diagnostic dump: `.` empty, `o` worm, `x` block, `*` fruit.
impl fmt::Display for GridMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = usize::try_from(self.columns).unwrap_or(0).max(1);
        for row in self.cells.chunks(width) {
            for cell in row {
                let glyph = match cell {
                    None => '.',
                    Some(Occupant::Worm(_)) => 'o',
                    Some(Occupant::Block(_)) => 'x',
                    Some(Occupant::Fruit(_)) => '*',
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
