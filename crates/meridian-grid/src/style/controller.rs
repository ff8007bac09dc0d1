//! Pluggable external attribute storage.

use crate::style::property::CellProperty;
use crate::style::value::PropertyValue;

/// Computes model-indexed row/column/cell/default properties externally,
/// e.g. straight from a live data source, instead of from stored records.
///
/// When a controller is installed on a cascade it *replaces* the model-layer
/// records for every property it [supports](Self::is_supported): lookups for
/// a supported property consult the controller exactly where the model
/// record would otherwise be read, and writes the controller reports as
/// handled never touch record storage.
///
/// Implementations use interior mutability; every method takes `&self`.
pub trait AttributeController: Send + Sync {
    /// The value of `id` for model cell `(row, col)`, if the controller has one.
    fn cell_property(&self, row: usize, col: usize, id: CellProperty) -> Option<PropertyValue>;

    /// The value of `id` for model row `row`.
    fn row_property(&self, row: usize, id: CellProperty) -> Option<PropertyValue>;

    /// The value of `id` for model column `col`.
    fn column_property(&self, col: usize, id: CellProperty) -> Option<PropertyValue>;

    /// The table-wide default value of `id`.
    fn default_property(&self, id: CellProperty) -> Option<PropertyValue>;

    /// Store a cell value. Returns `false` when the controller does not
    /// handle this property, in which case the cascade falls back to its
    /// own records.
    fn set_cell_property(&self, row: usize, col: usize, id: CellProperty, value: &PropertyValue)
    -> bool;

    /// Store a row value; `false` when unhandled.
    fn set_row_property(&self, row: usize, id: CellProperty, value: &PropertyValue) -> bool;

    /// Store a column value; `false` when unhandled.
    fn set_column_property(&self, col: usize, id: CellProperty, value: &PropertyValue) -> bool;

    /// Store a default value; `false` when unhandled.
    fn set_default_property(&self, id: CellProperty, value: &PropertyValue) -> bool;

    /// Clear a cell value; `false` when unhandled.
    fn clear_cell_property(&self, row: usize, col: usize, id: CellProperty) -> bool;

    /// Clear a row value; `false` when unhandled.
    fn clear_row_property(&self, row: usize, id: CellProperty) -> bool;

    /// Clear a column value; `false` when unhandled.
    fn clear_column_property(&self, col: usize, id: CellProperty) -> bool;

    /// `true` when the controller manages `id` for cell/row/column scopes.
    fn is_supported(&self, _id: CellProperty) -> bool {
        true
    }

    /// `true` when the controller also manages `id` at default scope.
    fn is_default_supported(&self, _id: CellProperty) -> bool {
        false
    }

    /// Rows were inserted into the model at `at`.
    fn insert_rows(&self, _num: usize, _at: usize) {}

    /// Columns were inserted into the model at `at`.
    fn insert_columns(&self, _num: usize, _at: usize) {}

    /// Rows `[at, at + num)` were deleted from the model.
    fn delete_rows(&self, _num: usize, _at: usize) {}

    /// Columns `[at, at + num)` were deleted from the model.
    fn delete_columns(&self, _num: usize, _at: usize) {}

    /// The model was replaced; resize to `rows` x `columns`.
    fn reinit(&self, _rows: usize, _columns: usize) {}
}
