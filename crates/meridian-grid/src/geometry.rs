//! Cell-rectangle geometry.

use serde::{Deserialize, Serialize};

/// Sentinel for "the last row of the table", used in open-ended regions.
pub const LAST_ROW: usize = usize::MAX;
/// Sentinel for "the last column of the table", used in open-ended regions.
pub const LAST_COLUMN: usize = usize::MAX;

/// An inclusive rectangle of cells.
///
/// A region is anchored at (`start_row`, `start_col`) and extends through
/// (`end_row`, `end_col`). Whole-row and whole-column regions use the
/// [`LAST_ROW`]/[`LAST_COLUMN`] sentinels for their open edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRegion {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRegion {
    /// Create a region from corner coordinates (both inclusive).
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    /// A region covering a single cell.
    pub fn cell(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    /// A region covering one entire row.
    pub fn entire_row(row: usize) -> Self {
        Self::new(row, 0, row, LAST_COLUMN)
    }

    /// A region covering one entire column.
    pub fn entire_column(col: usize) -> Self {
        Self::new(0, col, LAST_ROW, col)
    }

    /// A region covering the whole table.
    pub fn everything() -> Self {
        Self::new(0, 0, LAST_ROW, LAST_COLUMN)
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        self.end_row.saturating_sub(self.start_row).saturating_add(1)
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.end_col.saturating_sub(self.start_col).saturating_add(1)
    }

    /// `true` when the corners are ordered.
    pub fn is_valid(&self) -> bool {
        self.start_row <= self.end_row && self.start_col <= self.end_col
    }

    /// `true` when `(row, col)` lies inside the region.
    pub fn contains_cell(&self, row: usize, col: usize) -> bool {
        self.start_row <= row && row <= self.end_row && self.start_col <= col && col <= self.end_col
    }

    /// `true` when the two regions share at least one cell.
    pub fn intersects(&self, other: &CellRegion) -> bool {
        self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_col <= other.end_col
            && other.start_col <= self.end_col
    }
}
