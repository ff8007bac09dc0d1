//! The attribute cascade: layered property resolution for every cell.
//!
//! The cascade owns one property record per styled thing (cells, rows,
//! columns, repeating patterns, the table default, the grid itself), in
//! both the model and the visual coordinate space, and resolves "what is
//! the effective value of property P for cell (r, c)" through a fixed
//! precedence chain:
//!
//! - visual cell
//! - model cell
//! - visual column
//! - repeating column
//! - model column
//! - visual row
//! - repeating row
//! - model row
//! - default
//!
//! When the entire chain misses and a shadow cascade is attached, the whole
//! query is delegated to it (header grids shadow the main grid this way).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use meridian_core::{ConnectionId, Signal};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::batch::{self, BatchGuard};
use crate::coords::CoordinateSpace;
use crate::error::StyleError;
use crate::geometry::CellRegion;
use crate::style::controller::AttributeController;
use crate::style::property::{CellProperty, GridProperty, PropertyId};
use crate::style::repeating::RepeatingStyle;
use crate::style::store::PropertyStore;
use crate::style::value::PropertyValue;

type CellStore = PropertyStore<CellProperty>;
/// Per-column map of per-row records.
type CellTable = BTreeMap<usize, BTreeMap<usize, CellStore>>;

/// Change notifications emitted by an [`AttributeCascade`].
///
/// The rendering layer connects here to know what to repaint. Nothing is
/// emitted while a batch guard from
/// [`begin_batch`](AttributeCascade::begin_batch) is alive.
pub struct StyleSignals {
    /// A cell-scoped property changed somewhere in `(region, id, visual)`.
    /// `visual` is `true` when the region is in visual coordinates.
    pub cell_property_changed: Signal<(CellRegion, CellProperty, bool)>,
    /// A grid-scoped property changed.
    pub grid_property_changed: Signal<GridProperty>,
}

impl StyleSignals {
    fn new() -> Self {
        Self {
            cell_property_changed: Signal::new(),
            grid_property_changed: Signal::new(),
        }
    }
}

/// Identifies one property record in the serialization projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordScope {
    Default,
    Grid,
    ModelRow(usize),
    ModelColumn(usize),
    ModelCell { row: usize, col: usize },
    VisualRow(usize),
    VisualColumn(usize),
    VisualCell { row: usize, col: usize },
    RepeatingRow { start: usize, interval: usize },
    RepeatingColumn { start: usize, interval: usize },
}

/// All record storage, behind one lock.
#[derive(Default)]
struct Layers {
    model_cells: CellTable,
    visual_cells: CellTable,
    model_rows: BTreeMap<usize, CellStore>,
    visual_rows: BTreeMap<usize, CellStore>,
    model_columns: BTreeMap<usize, CellStore>,
    visual_columns: BTreeMap<usize, CellStore>,
    repeating_rows: Vec<RepeatingStyle>,
    repeating_columns: Vec<RepeatingStyle>,
    default_record: CellStore,
    grid_record: PropertyStore<GridProperty>,
}

/// The attribute cascade engine.
///
/// Methods take `&self`; storage sits behind interior mutability so the
/// cascade can be shared with views. The engine itself is synchronous:
/// every operation completes on the calling thread before returning, and
/// change notifications run inline.
pub struct AttributeCascade {
    layers: RwLock<Layers>,
    controller: RwLock<Option<Box<dyn AttributeController>>>,
    coords: RwLock<Option<Arc<dyn CoordinateSpace>>>,
    shadow: Option<Arc<AttributeCascade>>,
    signals: Arc<StyleSignals>,
    batch_depth: Arc<AtomicUsize>,
    shadow_cell_conn: Option<ConnectionId>,
    shadow_grid_conn: Option<ConnectionId>,
}

static_assertions::assert_impl_all!(AttributeCascade: Send, Sync);

impl Default for AttributeCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeCascade {
    /// Create the cascade for a main grid: default and grid records are
    /// populated with their baseline values.
    pub fn new() -> Self {
        Self {
            layers: RwLock::new(Layers {
                default_record: CellStore::with_cell_defaults(),
                grid_record: PropertyStore::with_grid_defaults(),
                ..Default::default()
            }),
            controller: RwLock::new(None),
            coords: RwLock::new(None),
            shadow: None,
            signals: Arc::new(StyleSignals::new()),
            batch_depth: Arc::new(AtomicUsize::new(0)),
            shadow_cell_conn: None,
            shadow_grid_conn: None,
        }
    }

    /// Create a cascade that falls back to `shadow` when its own chain
    /// yields nothing (used by header grids, which shadow the main grid).
    ///
    /// The new cascade starts with *empty* default and grid records, so
    /// unanswered queries reach the shadow. Changes announced by the shadow
    /// are re-emitted on this cascade's signals.
    pub fn with_shadow(shadow: Arc<AttributeCascade>) -> Self {
        let signals = Arc::new(StyleSignals::new());

        let fwd = signals.clone();
        let cell_conn = shadow
            .signals
            .cell_property_changed
            .connect(move |args| fwd.cell_property_changed.emit(args.clone()));
        let fwd = signals.clone();
        let grid_conn = shadow
            .signals
            .grid_property_changed
            .connect(move |&id| fwd.grid_property_changed.emit(id));

        Self {
            layers: RwLock::new(Layers::default()),
            controller: RwLock::new(None),
            coords: RwLock::new(None),
            shadow: Some(shadow),
            signals,
            batch_depth: Arc::new(AtomicUsize::new(0)),
            shadow_cell_conn: Some(cell_conn),
            shadow_grid_conn: Some(grid_conn),
        }
    }

    /// The signals this cascade emits.
    pub fn signals(&self) -> &StyleSignals {
        &self.signals
    }

    /// The shadow cascade, if one is attached.
    pub fn shadow(&self) -> Option<&Arc<AttributeCascade>> {
        self.shadow.as_ref()
    }

    /// Suppress change notifications until the returned guard is dropped.
    pub fn begin_batch(&self) -> BatchGuard {
        BatchGuard::acquire(&self.batch_depth)
    }

    /// Install the coordinate translation used to resolve model coordinates
    /// for renderer teardown notifications on visual-space writes.
    pub fn set_coordinate_space(&self, coords: Arc<dyn CoordinateSpace>) {
        *self.coords.write() = Some(coords);
    }

    /// Install an attribute controller, replacing model-layer record storage
    /// for the properties it supports. `rows` x `columns` is the current
    /// model size, passed through to the controller's `reinit`.
    pub fn set_attribute_controller(
        &self,
        controller: Box<dyn AttributeController>,
        rows: usize,
        columns: usize,
    ) {
        controller.reinit(rows, columns);
        *self.controller.write() = Some(controller);
    }

    /// Remove the attribute controller; model-layer lookups revert to
    /// record storage.
    pub fn clear_attribute_controller(&self) {
        *self.controller.write() = None;
    }

    pub fn has_attribute_controller(&self) -> bool {
        self.controller.read().is_some()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Effective value of `id` for the cell at model position `(row, col)`.
    ///
    /// Pass the cell's visual position too when it is known; the visual
    /// layers (and the repeating layers, which key on visual indices) only
    /// participate when it is.
    pub fn cell_property(
        &self,
        row: usize,
        col: usize,
        id: CellProperty,
        visual: Option<(usize, usize)>,
    ) -> Option<PropertyValue> {
        self.lookup_cell(Some((row, col)), visual, id)
    }

    fn lookup_cell(
        &self,
        model: Option<(usize, usize)>,
        visual: Option<(usize, usize)>,
        id: CellProperty,
    ) -> Option<PropertyValue> {
        let local = {
            let layers = self.layers.read();
            let ctrl_guard = self.controller.read();
            let ctrl = ctrl_guard.as_deref();
            let vrow = visual.map(|(r, _)| r);
            let vcol = visual.map(|(_, c)| c);

            visual
                .and_then(|(vr, vc)| cell_record_value(&layers.visual_cells, vc, vr, id))
                .or_else(|| {
                    model.and_then(|(r, c)| model_cell_value(&layers, ctrl, r, c, id))
                })
                .or_else(|| vcol.and_then(|vc| line_record_value(&layers.visual_columns, vc, id)))
                .or_else(|| repeating_value(&layers.repeating_columns, vcol, id))
                .or_else(|| model.and_then(|(_, c)| model_column_value(&layers, ctrl, c, id)))
                .or_else(|| vrow.and_then(|vr| line_record_value(&layers.visual_rows, vr, id)))
                .or_else(|| repeating_value(&layers.repeating_rows, vrow, id))
                .or_else(|| model.and_then(|(r, _)| model_row_value(&layers, ctrl, r, id)))
                .or_else(|| default_value(&layers, ctrl, id))
        };

        // The shadow is an all-or-nothing fallback: only consulted once the
        // entire local chain has missed, and then it runs its own full chain.
        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.lookup_cell(model, visual, id)),
        }
    }

    /// Effective value of `id` for model row `row`.
    pub fn row_property(
        &self,
        row: usize,
        id: CellProperty,
        visual_row: Option<usize>,
    ) -> Option<PropertyValue> {
        let local = {
            let layers = self.layers.read();
            let ctrl_guard = self.controller.read();
            let ctrl = ctrl_guard.as_deref();

            visual_row
                .and_then(|vr| line_record_value(&layers.visual_rows, vr, id))
                .or_else(|| repeating_value(&layers.repeating_rows, visual_row, id))
                .or_else(|| model_row_value(&layers, ctrl, row, id))
                .or_else(|| default_value(&layers, ctrl, id))
        };

        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.row_property(row, id, visual_row)),
        }
    }

    /// Effective value of `id` for model column `col`.
    pub fn column_property(
        &self,
        col: usize,
        id: CellProperty,
        visual_col: Option<usize>,
    ) -> Option<PropertyValue> {
        let local = {
            let layers = self.layers.read();
            let ctrl_guard = self.controller.read();
            let ctrl = ctrl_guard.as_deref();

            visual_col
                .and_then(|vc| line_record_value(&layers.visual_columns, vc, id))
                .or_else(|| repeating_value(&layers.repeating_columns, visual_col, id))
                .or_else(|| model_column_value(&layers, ctrl, col, id))
                .or_else(|| default_value(&layers, ctrl, id))
        };

        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.column_property(col, id, visual_col)),
        }
    }

    /// The table-wide default value of `id`.
    pub fn default_property(&self, id: CellProperty) -> Option<PropertyValue> {
        let local = {
            let layers = self.layers.read();
            let ctrl_guard = self.controller.read();
            default_value(&layers, ctrl_guard.as_deref(), id)
        };
        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.default_property(id)),
        }
    }

    /// The grid-scoped value of `id`.
    pub fn grid_property(&self, id: GridProperty) -> Option<PropertyValue> {
        let local = self.layers.read().grid_record.get(id).cloned();
        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.grid_property(id)),
        }
    }

    /// The value of `id` stored on the exact repeating row record
    /// `(start, interval)`, falling back to the default layer.
    pub fn repeating_row_property(
        &self,
        start: usize,
        interval: usize,
        id: CellProperty,
    ) -> Option<PropertyValue> {
        let local = {
            let layers = self.layers.read();
            exact_repeating_value(&layers.repeating_rows, start, interval, id).or_else(|| {
                let ctrl_guard = self.controller.read();
                default_value(&layers, ctrl_guard.as_deref(), id)
            })
        };
        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.repeating_row_property(start, interval, id)),
        }
    }

    /// The value of `id` stored on the exact repeating column record
    /// `(start, interval)`, falling back to the default layer.
    pub fn repeating_column_property(
        &self,
        start: usize,
        interval: usize,
        id: CellProperty,
    ) -> Option<PropertyValue> {
        let local = {
            let layers = self.layers.read();
            exact_repeating_value(&layers.repeating_columns, start, interval, id).or_else(|| {
                let ctrl_guard = self.controller.read();
                default_value(&layers, ctrl_guard.as_deref(), id)
            })
        };
        match local {
            Some(value) => Some(value),
            None => self
                .shadow
                .as_ref()
                .and_then(|shadow| shadow.repeating_column_property(start, interval, id)),
        }
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Set `id` on the cell record at `(row, col)`.
    ///
    /// `visual` selects the visual-space record instead of the model-space
    /// one. Records are created lazily. When `id` is the renderer property
    /// the currently effective renderer is notified (with resolved model
    /// coordinates) before the new value is installed.
    pub fn set_cell_property(
        &self,
        row: usize,
        col: usize,
        visual: bool,
        id: CellProperty,
        value: PropertyValue,
    ) -> Result<(), StyleError> {
        if value.kind() != id.kind() {
            return Err(StyleError::KindMismatch {
                property: id.name(),
                expected: id.kind(),
                got: value.kind(),
            });
        }

        if id == CellProperty::Renderer {
            self.notify_renderer_teardown(row, col, visual);
        }

        if !visual {
            let handled = {
                let ctrl = self.controller.read();
                ctrl.as_deref()
                    .map(|c| c.set_cell_property(row, col, id, &value))
                    .unwrap_or(false)
            };
            if handled {
                self.notify_cell(CellRegion::cell(row, col), id, visual);
                return Ok(());
            }
        }

        {
            let mut layers = self.layers.write();
            let table = if visual {
                &mut layers.visual_cells
            } else {
                &mut layers.model_cells
            };
            table
                .entry(col)
                .or_default()
                .entry(row)
                .or_default()
                .set(id, value)?;
        }

        self.notify_cell(CellRegion::cell(row, col), id, visual);
        Ok(())
    }

    /// Set `id` on the row record for `row`.
    ///
    /// When `override_cells` is true (the common case), the property is
    /// also cleared from every individual cell record in that row: row
    /// settings supersede existing cell-level overrides.
    pub fn set_row_property(
        &self,
        row: usize,
        visual: bool,
        id: CellProperty,
        value: PropertyValue,
        override_cells: bool,
    ) -> Result<(), StyleError> {
        if value.kind() != id.kind() {
            return Err(StyleError::KindMismatch {
                property: id.name(),
                expected: id.kind(),
                got: value.kind(),
            });
        }

        if !visual {
            let handled = {
                let ctrl = self.controller.read();
                ctrl.as_deref()
                    .map(|c| c.set_row_property(row, id, &value))
                    .unwrap_or(false)
            };
            if handled {
                self.notify_cell(CellRegion::entire_row(row), id, visual);
                return Ok(());
            }
        }

        {
            let mut layers = self.layers.write();
            let rows = if visual {
                &mut layers.visual_rows
            } else {
                &mut layers.model_rows
            };
            rows.entry(row).or_default().set(id, value)?;

            if override_cells {
                let table = if visual {
                    &mut layers.visual_cells
                } else {
                    &mut layers.model_cells
                };
                for col_map in table.values_mut() {
                    if let Some(store) = col_map.get_mut(&row) {
                        store.clear(id);
                    }
                }
            }
        }

        self.notify_cell(CellRegion::entire_row(row), id, visual);
        Ok(())
    }

    /// Set `id` on the column record for `col`; see
    /// [`set_row_property`](Self::set_row_property) for `override_cells`.
    pub fn set_column_property(
        &self,
        col: usize,
        visual: bool,
        id: CellProperty,
        value: PropertyValue,
        override_cells: bool,
    ) -> Result<(), StyleError> {
        if value.kind() != id.kind() {
            return Err(StyleError::KindMismatch {
                property: id.name(),
                expected: id.kind(),
                got: value.kind(),
            });
        }

        if !visual {
            let handled = {
                let ctrl = self.controller.read();
                ctrl.as_deref()
                    .map(|c| c.set_column_property(col, id, &value))
                    .unwrap_or(false)
            };
            if handled {
                self.notify_cell(CellRegion::entire_column(col), id, visual);
                return Ok(());
            }
        }

        {
            let mut layers = self.layers.write();
            let columns = if visual {
                &mut layers.visual_columns
            } else {
                &mut layers.model_columns
            };
            columns.entry(col).or_default().set(id, value)?;

            if override_cells {
                let table = if visual {
                    &mut layers.visual_cells
                } else {
                    &mut layers.model_cells
                };
                if let Some(col_map) = table.get_mut(&col) {
                    for store in col_map.values_mut() {
                        store.clear(id);
                    }
                }
            }
        }

        self.notify_cell(CellRegion::entire_column(col), id, visual);
        Ok(())
    }

    /// Set the table-wide default for `id`.
    ///
    /// This is a baseline reset, not a mere fallback write: the property is
    /// unconditionally cleared from every model row, column and cell record,
    /// so previously-established overrides are gone afterwards. Callers that
    /// need to keep per-cell overrides must re-apply them.
    pub fn set_default_property(
        &self,
        id: CellProperty,
        value: PropertyValue,
    ) -> Result<(), StyleError> {
        if value.kind() != id.kind() {
            return Err(StyleError::KindMismatch {
                property: id.name(),
                expected: id.kind(),
                got: value.kind(),
            });
        }

        let handled = {
            let ctrl = self.controller.read();
            ctrl.as_deref()
                .map(|c| c.set_default_property(id, &value))
                .unwrap_or(false)
        };

        if !handled {
            let mut layers = self.layers.write();
            layers.default_record.set(id, value)?;

            for col_map in layers.model_cells.values_mut() {
                for store in col_map.values_mut() {
                    store.clear(id);
                }
            }
            for store in layers.model_rows.values_mut() {
                store.clear(id);
            }
            for store in layers.model_columns.values_mut() {
                store.clear(id);
            }
        }

        self.notify_cell(CellRegion::everything(), id, false);
        Ok(())
    }

    /// Set `id` on the repeating row record `(start, interval)`, creating
    /// the record on first use. Individual row/cell records are untouched.
    pub fn set_repeating_row_property(
        &self,
        start: usize,
        interval: usize,
        id: CellProperty,
        value: PropertyValue,
    ) -> Result<(), StyleError> {
        {
            let mut layers = self.layers.write();
            let list = &mut layers.repeating_rows;
            let pos = match list
                .iter()
                .position(|r| r.start() == start && r.interval() == interval)
            {
                Some(pos) => pos,
                None => {
                    list.push(RepeatingStyle::new(start, interval));
                    list.len() - 1
                }
            };
            list[pos].store_mut().set(id, value)?;
        }

        self.notify_cell(CellRegion::everything(), id, true);
        Ok(())
    }

    /// Set `id` on the repeating column record `(start, interval)`.
    pub fn set_repeating_column_property(
        &self,
        start: usize,
        interval: usize,
        id: CellProperty,
        value: PropertyValue,
    ) -> Result<(), StyleError> {
        {
            let mut layers = self.layers.write();
            let list = &mut layers.repeating_columns;
            let pos = match list
                .iter()
                .position(|r| r.start() == start && r.interval() == interval)
            {
                Some(pos) => pos,
                None => {
                    list.push(RepeatingStyle::new(start, interval));
                    list.len() - 1
                }
            };
            list[pos].store_mut().set(id, value)?;
        }

        self.notify_cell(CellRegion::everything(), id, true);
        Ok(())
    }

    /// Set a grid-scoped property.
    pub fn set_grid_property(
        &self,
        id: GridProperty,
        value: PropertyValue,
    ) -> Result<(), StyleError> {
        self.layers.write().grid_record.set(id, value)?;
        if batch::reporting(&self.batch_depth) {
            self.signals.grid_property_changed.emit(id);
        }
        Ok(())
    }

    /// Remove `id` from the cell record at `(row, col)`.
    ///
    /// The record is pruned once it holds nothing, so sparse usage stays
    /// sparse.
    pub fn clear_cell_property(&self, row: usize, col: usize, visual: bool, id: CellProperty) {
        if id == CellProperty::Renderer {
            self.notify_renderer_teardown(row, col, visual);
        }

        if !visual {
            let handled = {
                let ctrl = self.controller.read();
                ctrl.as_deref()
                    .map(|c| c.clear_cell_property(row, col, id))
                    .unwrap_or(false)
            };
            if handled {
                self.notify_cell(CellRegion::cell(row, col), id, visual);
                return;
            }
        }

        let had_column = {
            let mut layers = self.layers.write();
            let table = if visual {
                &mut layers.visual_cells
            } else {
                &mut layers.model_cells
            };
            match table.get_mut(&col) {
                None => false,
                Some(col_map) => {
                    if let Some(store) = col_map.get_mut(&row) {
                        store.clear(id);
                        if store.is_empty() {
                            col_map.remove(&row);
                        }
                    }
                    if col_map.is_empty() {
                        table.remove(&col);
                    }
                    true
                }
            }
        };

        if had_column {
            self.notify_cell(CellRegion::cell(row, col), id, visual);
        }
    }

    /// Remove `id` from the row record for `row`.
    pub fn clear_row_property(&self, row: usize, visual: bool, id: CellProperty) {
        if !visual {
            let handled = {
                let ctrl = self.controller.read();
                ctrl.as_deref()
                    .map(|c| c.clear_row_property(row, id))
                    .unwrap_or(false)
            };
            if handled {
                self.notify_cell(CellRegion::entire_row(row), id, visual);
                return;
            }
        }

        let existed = {
            let mut layers = self.layers.write();
            let rows = if visual {
                &mut layers.visual_rows
            } else {
                &mut layers.model_rows
            };
            match rows.get_mut(&row) {
                Some(store) => {
                    store.clear(id);
                    true
                }
                None => false,
            }
        };

        if existed {
            self.notify_cell(CellRegion::entire_row(row), id, visual);
        }
    }

    /// Remove `id` from the column record for `col`.
    pub fn clear_column_property(&self, col: usize, visual: bool, id: CellProperty) {
        if !visual {
            let handled = {
                let ctrl = self.controller.read();
                ctrl.as_deref()
                    .map(|c| c.clear_column_property(col, id))
                    .unwrap_or(false)
            };
            if handled {
                self.notify_cell(CellRegion::entire_column(col), id, visual);
                return;
            }
        }

        let existed = {
            let mut layers = self.layers.write();
            let columns = if visual {
                &mut layers.visual_columns
            } else {
                &mut layers.model_columns
            };
            match columns.get_mut(&col) {
                Some(store) => {
                    store.clear(id);
                    true
                }
                None => false,
            }
        };

        if existed {
            self.notify_cell(CellRegion::entire_column(col), id, visual);
        }
    }

    /// Remove `id` from the repeating row record `(start, interval)`.
    pub fn clear_repeating_row_property(&self, start: usize, interval: usize, id: CellProperty) {
        let mut layers = self.layers.write();
        if let Some(rcs) = layers
            .repeating_rows
            .iter_mut()
            .find(|r| r.start() == start && r.interval() == interval)
        {
            rcs.store_mut().clear(id);
        }
    }

    /// Remove `id` from the repeating column record `(start, interval)`.
    pub fn clear_repeating_column_property(&self, start: usize, interval: usize, id: CellProperty) {
        let mut layers = self.layers.write();
        if let Some(rcs) = layers
            .repeating_columns
            .iter_mut()
            .find(|r| r.start() == start && r.interval() == interval)
        {
            rcs.store_mut().clear(id);
        }
    }

    // ------------------------------------------------------------------
    // Model resizing
    // ------------------------------------------------------------------

    /// Rows were inserted into the model at `at`: shift model-space records
    /// at or past `at` down by `num`.
    ///
    /// Visual-space records are never touched by model resizing; visual
    /// attributes are anchored to screen positions, not to data.
    pub fn insert_rows(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        {
            let ctrl = self.controller.read();
            if let Some(c) = ctrl.as_deref() {
                c.insert_rows(num, at);
            }
        }

        let mut layers = self.layers.write();
        for col_map in layers.model_cells.values_mut() {
            shift_keys_up(col_map, at, num);
        }
        shift_keys_up(&mut layers.model_rows, at, num);
    }

    /// Columns were inserted into the model at `at`.
    pub fn insert_columns(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        {
            let ctrl = self.controller.read();
            if let Some(c) = ctrl.as_deref() {
                c.insert_columns(num, at);
            }
        }

        let mut layers = self.layers.write();
        shift_keys_up(&mut layers.model_cells, at, num);
        shift_keys_up(&mut layers.model_columns, at, num);
    }

    /// Rows `[at, at + num)` were deleted from the model: drop their
    /// records and shift everything past them up by `num`.
    pub fn delete_rows(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        {
            let ctrl = self.controller.read();
            if let Some(c) = ctrl.as_deref() {
                c.delete_rows(num, at);
            }
        }

        let mut layers = self.layers.write();
        for col_map in layers.model_cells.values_mut() {
            delete_key_range(col_map, at, num);
        }
        layers.model_cells.retain(|_, col_map| !col_map.is_empty());
        delete_key_range(&mut layers.model_rows, at, num);
    }

    /// Columns `[at, at + num)` were deleted from the model.
    pub fn delete_columns(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        {
            let ctrl = self.controller.read();
            if let Some(c) = ctrl.as_deref() {
                c.delete_columns(num, at);
            }
        }

        let mut layers = self.layers.write();
        delete_key_range(&mut layers.model_cells, at, num);
        delete_key_range(&mut layers.model_columns, at, num);
    }

    // ------------------------------------------------------------------
    // Serialization projection
    // ------------------------------------------------------------------

    /// Enumerate every non-empty record as `(scope, entries)` pairs, where
    /// each entry is a `(property name, text)` pair.
    ///
    /// Non-serializable slots (handles, pixmaps, cursors) are skipped.
    /// Document framing is the caller's job; values computed by an attribute
    /// controller belong to the controller's owner and are not walked here.
    pub fn serialized_records(&self) -> Vec<(RecordScope, Vec<(String, String)>)> {
        let layers = self.layers.read();
        let mut records = Vec::new();

        let mut push = |scope: RecordScope, entries: Vec<(String, String)>| {
            if !entries.is_empty() {
                records.push((scope, entries));
            }
        };

        push(
            RecordScope::Default,
            layers.default_record.serialized_entries(),
        );

        for (&row, store) in &layers.model_rows {
            push(RecordScope::ModelRow(row), store.serialized_entries());
        }
        for (&col, store) in &layers.model_columns {
            push(RecordScope::ModelColumn(col), store.serialized_entries());
        }
        for (&col, col_map) in &layers.model_cells {
            for (&row, store) in col_map {
                push(
                    RecordScope::ModelCell { row, col },
                    store.serialized_entries(),
                );
            }
        }

        for (&row, store) in &layers.visual_rows {
            push(RecordScope::VisualRow(row), store.serialized_entries());
        }
        for (&col, store) in &layers.visual_columns {
            push(RecordScope::VisualColumn(col), store.serialized_entries());
        }
        for (&col, col_map) in &layers.visual_cells {
            for (&row, store) in col_map {
                push(
                    RecordScope::VisualCell { row, col },
                    store.serialized_entries(),
                );
            }
        }

        for rcs in &layers.repeating_rows {
            push(
                RecordScope::RepeatingRow {
                    start: rcs.start(),
                    interval: rcs.interval(),
                },
                rcs.store().serialized_entries(),
            );
        }
        for rcs in &layers.repeating_columns {
            push(
                RecordScope::RepeatingColumn {
                    start: rcs.start(),
                    interval: rcs.interval(),
                },
                rcs.store().serialized_entries(),
            );
        }

        push(RecordScope::Grid, layers.grid_record.serialized_entries());

        records
    }

    /// Restore one record from its `(property name, text)` entries.
    ///
    /// Notifications are suppressed for the duration; restoring writes the
    /// records directly and does not run the override-clearing of the live
    /// set paths.
    pub fn apply_record(
        &self,
        scope: RecordScope,
        entries: &[(String, String)],
    ) -> Result<(), StyleError> {
        let _batch = self.begin_batch();

        match scope {
            RecordScope::Grid => {
                let mut layers = self.layers.write();
                for (name, text) in entries {
                    layers.grid_record.apply_serialized(name, text)?;
                }
            }
            RecordScope::Default => {
                for (name, text) in entries {
                    let (id, value) = parse_cell_entry(name, text)?;
                    let handled = {
                        let ctrl = self.controller.read();
                        ctrl.as_deref()
                            .map(|c| c.set_default_property(id, &value))
                            .unwrap_or(false)
                    };
                    if !handled {
                        self.layers.write().default_record.set(id, value)?;
                    }
                }
            }
            RecordScope::ModelRow(row) => {
                for (name, text) in entries {
                    let (id, value) = parse_cell_entry(name, text)?;
                    let handled = {
                        let ctrl = self.controller.read();
                        ctrl.as_deref()
                            .map(|c| c.set_row_property(row, id, &value))
                            .unwrap_or(false)
                    };
                    if !handled {
                        self.layers
                            .write()
                            .model_rows
                            .entry(row)
                            .or_default()
                            .set(id, value)?;
                    }
                }
            }
            RecordScope::ModelColumn(col) => {
                for (name, text) in entries {
                    let (id, value) = parse_cell_entry(name, text)?;
                    let handled = {
                        let ctrl = self.controller.read();
                        ctrl.as_deref()
                            .map(|c| c.set_column_property(col, id, &value))
                            .unwrap_or(false)
                    };
                    if !handled {
                        self.layers
                            .write()
                            .model_columns
                            .entry(col)
                            .or_default()
                            .set(id, value)?;
                    }
                }
            }
            RecordScope::ModelCell { row, col } => {
                for (name, text) in entries {
                    let (id, value) = parse_cell_entry(name, text)?;
                    let handled = {
                        let ctrl = self.controller.read();
                        ctrl.as_deref()
                            .map(|c| c.set_cell_property(row, col, id, &value))
                            .unwrap_or(false)
                    };
                    if !handled {
                        self.layers
                            .write()
                            .model_cells
                            .entry(col)
                            .or_default()
                            .entry(row)
                            .or_default()
                            .set(id, value)?;
                    }
                }
            }
            RecordScope::VisualRow(row) => {
                let mut layers = self.layers.write();
                let store = layers.visual_rows.entry(row).or_default();
                for (name, text) in entries {
                    store.apply_serialized(name, text)?;
                }
            }
            RecordScope::VisualColumn(col) => {
                let mut layers = self.layers.write();
                let store = layers.visual_columns.entry(col).or_default();
                for (name, text) in entries {
                    store.apply_serialized(name, text)?;
                }
            }
            RecordScope::VisualCell { row, col } => {
                let mut layers = self.layers.write();
                let store = layers
                    .visual_cells
                    .entry(col)
                    .or_default()
                    .entry(row)
                    .or_default();
                for (name, text) in entries {
                    store.apply_serialized(name, text)?;
                }
            }
            RecordScope::RepeatingRow { start, interval } => {
                let mut layers = self.layers.write();
                let list = &mut layers.repeating_rows;
                let pos = match list
                    .iter()
                    .position(|r| r.start() == start && r.interval() == interval)
                {
                    Some(pos) => pos,
                    None => {
                        list.push(RepeatingStyle::new(start, interval));
                        list.len() - 1
                    }
                };
                for (name, text) in entries {
                    list[pos].store_mut().apply_serialized(name, text)?;
                }
            }
            RecordScope::RepeatingColumn { start, interval } => {
                let mut layers = self.layers.write();
                let list = &mut layers.repeating_columns;
                let pos = match list
                    .iter()
                    .position(|r| r.start() == start && r.interval() == interval)
                {
                    Some(pos) => pos,
                    None => {
                        list.push(RepeatingStyle::new(start, interval));
                        list.len() - 1
                    }
                };
                for (name, text) in entries {
                    list[pos].store_mut().apply_serialized(name, text)?;
                }
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn notify_cell(&self, region: CellRegion, id: CellProperty, visual: bool) {
        if batch::reporting(&self.batch_depth) {
            self.signals.cell_property_changed.emit((region, id, visual));
        }
    }

    /// Tell the effective renderer for a cell that its reference is about
    /// to go away, passing resolved model coordinates when they are known.
    fn notify_renderer_teardown(&self, row: usize, col: usize, visual: bool) {
        let effective = if visual {
            self.lookup_cell(None, Some((row, col)), CellProperty::Renderer)
        } else {
            self.lookup_cell(Some((row, col)), None, CellProperty::Renderer)
        };

        let Some(renderer) = effective.and_then(|v| v.as_renderer()) else {
            return;
        };

        let cell = if visual {
            let coords = self.coords.read();
            coords
                .as_ref()
                .and_then(|c| Some((c.model_row(row)?, c.model_column(col)?)))
        } else {
            Some((row, col))
        };

        renderer.about_to_clear(cell);
    }
}

impl Drop for AttributeCascade {
    fn drop(&mut self) {
        if let Some(shadow) = &self.shadow {
            if let Some(id) = self.shadow_cell_conn.take() {
                shadow.signals.cell_property_changed.disconnect(id);
            }
            if let Some(id) = self.shadow_grid_conn.take() {
                shadow.signals.grid_property_changed.disconnect(id);
            }
        }
    }
}

// ----------------------------------------------------------------------
// Layer lookup helpers
// ----------------------------------------------------------------------

fn cell_record_value(
    table: &CellTable,
    col: usize,
    row: usize,
    id: CellProperty,
) -> Option<PropertyValue> {
    table.get(&col)?.get(&row)?.get(id).cloned()
}

fn line_record_value(
    map: &BTreeMap<usize, CellStore>,
    index: usize,
    id: CellProperty,
) -> Option<PropertyValue> {
    map.get(&index)?.get(id).cloned()
}

/// First repeating record, in insertion order, that matches `index` *and*
/// actually has `id` set. Records that match but lack the property are
/// skipped in favor of later ones.
fn repeating_value(
    list: &[RepeatingStyle],
    index: Option<usize>,
    id: CellProperty,
) -> Option<PropertyValue> {
    let index = index?;
    list.iter()
        .filter(|rcs| rcs.matches(index))
        .find_map(|rcs| rcs.store().get(id).cloned())
}

fn exact_repeating_value(
    list: &[RepeatingStyle],
    start: usize,
    interval: usize,
    id: CellProperty,
) -> Option<PropertyValue> {
    list.iter()
        .find(|r| r.start() == start && r.interval() == interval)
        .and_then(|r| r.store().get(id).cloned())
}

fn model_cell_value(
    layers: &Layers,
    ctrl: Option<&dyn AttributeController>,
    row: usize,
    col: usize,
    id: CellProperty,
) -> Option<PropertyValue> {
    match ctrl {
        Some(c) if c.is_supported(id) => c.cell_property(row, col, id),
        _ => cell_record_value(&layers.model_cells, col, row, id),
    }
}

fn model_row_value(
    layers: &Layers,
    ctrl: Option<&dyn AttributeController>,
    row: usize,
    id: CellProperty,
) -> Option<PropertyValue> {
    match ctrl {
        Some(c) if c.is_supported(id) => c.row_property(row, id),
        _ => line_record_value(&layers.model_rows, row, id),
    }
}

fn model_column_value(
    layers: &Layers,
    ctrl: Option<&dyn AttributeController>,
    col: usize,
    id: CellProperty,
) -> Option<PropertyValue> {
    match ctrl {
        Some(c) if c.is_supported(id) => c.column_property(col, id),
        _ => line_record_value(&layers.model_columns, col, id),
    }
}

fn default_value(
    layers: &Layers,
    ctrl: Option<&dyn AttributeController>,
    id: CellProperty,
) -> Option<PropertyValue> {
    match ctrl {
        Some(c) if c.is_default_supported(id) => c.default_property(id),
        _ => layers.default_record.get(id).cloned(),
    }
}

fn parse_cell_entry(name: &str, text: &str) -> Result<(CellProperty, PropertyValue), StyleError> {
    let id =
        CellProperty::from_name(name).ok_or_else(|| StyleError::UnknownProperty(name.to_string()))?;
    let value = PropertyValue::from_text(id.kind(), text, id.name())?;
    Ok((id, value))
}

/// Insert `num` empty slots at `at`: every key at or past `at` moves up.
fn shift_keys_up<V>(map: &mut BTreeMap<usize, V>, at: usize, num: usize) {
    let tail = map.split_off(&at);
    for (key, value) in tail {
        map.insert(key + num, value);
    }
}

/// Erase keys in `[at, at + num)` and close the gap.
fn delete_key_range<V>(map: &mut BTreeMap<usize, V>, at: usize, num: usize) {
    let tail = map.split_off(&at);
    for (key, value) in tail {
        if key >= at + num {
            map.insert(key - num, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::paint::Color;

    fn color(v: u8) -> PropertyValue {
        Color::from_rgb8(v, v, v).into()
    }

    fn got_color(value: Option<PropertyValue>) -> Option<Color> {
        value.and_then(|v| v.as_color())
    }

    #[test]
    fn test_default_record_answers_fresh_table() {
        let cascade = AttributeCascade::new();
        assert_eq!(
            cascade
                .cell_property(3, 4, CellProperty::Enabled, None)
                .and_then(|v| v.as_bool()),
            Some(true)
        );
    }

    #[test]
    fn test_precedence_cell_over_column_over_row_over_default() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Background;

        cascade.set_default_property(id, color(10)).unwrap();
        cascade
            .set_row_property(1, false, id, color(20), true)
            .unwrap();
        cascade
            .set_column_property(2, false, id, color(30), true)
            .unwrap();
        cascade
            .set_cell_property(1, 2, false, id, color(40))
            .unwrap();

        let at = |r, c| got_color(cascade.cell_property(r, c, id, None));
        assert_eq!(at(1, 2), Some(Color::from_rgb8(40, 40, 40)));
        assert_eq!(at(1, 0), Some(Color::from_rgb8(20, 20, 20)));
        assert_eq!(at(0, 2), Some(Color::from_rgb8(30, 30, 30)));
        assert_eq!(at(0, 0), Some(Color::from_rgb8(10, 10, 10)));

        // Removing the cell value falls back through column, row, default.
        cascade.clear_cell_property(1, 2, false, id);
        assert_eq!(at(1, 2), Some(Color::from_rgb8(30, 30, 30)));
        cascade.clear_column_property(2, false, id);
        assert_eq!(at(1, 2), Some(Color::from_rgb8(20, 20, 20)));
        cascade.clear_row_property(1, false, id);
        assert_eq!(at(1, 2), Some(Color::from_rgb8(10, 10, 10)));
    }

    #[test]
    fn test_visual_cell_wins_over_model_layers() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Foreground;

        cascade
            .set_cell_property(5, 5, false, id, color(1))
            .unwrap();
        cascade.set_cell_property(0, 0, true, id, color(2)).unwrap();

        // Model cell (5,5) currently shown at visual (0,0).
        assert_eq!(
            got_color(cascade.cell_property(5, 5, id, Some((0, 0)))),
            Some(Color::from_rgb8(2, 2, 2))
        );
        // Without visual coordinates the model value is effective.
        assert_eq!(
            got_color(cascade.cell_property(5, 5, id, None)),
            Some(Color::from_rgb8(1, 1, 1))
        );
    }

    #[test]
    fn test_row_set_supersedes_cell_overrides() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Background;

        cascade
            .set_cell_property(3, 7, false, id, color(99))
            .unwrap();
        cascade
            .set_row_property(3, false, id, color(50), true)
            .unwrap();

        assert_eq!(
            got_color(cascade.cell_property(3, 7, id, None)),
            Some(Color::from_rgb8(50, 50, 50))
        );
    }

    #[test]
    fn test_row_set_without_override_keeps_cell() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Background;

        cascade
            .set_cell_property(3, 7, false, id, color(99))
            .unwrap();
        cascade
            .set_row_property(3, false, id, color(50), false)
            .unwrap();

        assert_eq!(
            got_color(cascade.cell_property(3, 7, id, None)),
            Some(Color::from_rgb8(99, 99, 99))
        );
    }

    #[test]
    fn test_default_reset_clears_model_overrides() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Foreground;

        cascade
            .set_row_property(2, false, id, color(11), true)
            .unwrap();
        cascade.set_default_property(id, color(22)).unwrap();

        assert_eq!(
            got_color(cascade.row_property(2, id, None)),
            Some(Color::from_rgb8(22, 22, 22))
        );
    }

    #[test]
    fn test_default_reset_leaves_visual_records() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Foreground;

        cascade.set_cell_property(1, 1, true, id, color(7)).unwrap();
        cascade.set_default_property(id, color(22)).unwrap();

        assert_eq!(
            got_color(cascade.cell_property(9, 9, id, Some((1, 1)))),
            Some(Color::from_rgb8(7, 7, 7))
        );
    }

    #[test]
    fn test_repeating_rows_match_on_visual_index() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Background;

        cascade
            .set_repeating_row_property(2, 3, id, color(60))
            .unwrap();

        let striped = |vr| {
            got_color(cascade.cell_property(0, 0, id, Some((vr, 0))))
                == Some(Color::from_rgb8(60, 60, 60))
        };
        assert!(striped(2));
        assert!(striped(5));
        assert!(striped(8));
        assert!(!striped(0));
        assert!(!striped(3));
        assert!(!striped(4));

        // Without visual coordinates the repeating layer is skipped.
        assert_ne!(
            got_color(cascade.cell_property(2, 0, id, None)),
            Some(Color::from_rgb8(60, 60, 60))
        );
    }

    #[test]
    fn test_repeating_record_lacking_property_is_skipped() {
        let cascade = AttributeCascade::new();

        cascade
            .set_repeating_row_property(0, 2, CellProperty::Label, "even".into())
            .unwrap();
        cascade
            .set_repeating_row_property(0, 1, CellProperty::Background, color(70))
            .unwrap();

        // Row 0 matches both records; the first lacks Background and must
        // not act as a final negative.
        assert_eq!(
            got_color(cascade.cell_property(0, 0, CellProperty::Background, Some((0, 0)))),
            Some(Color::from_rgb8(70, 70, 70))
        );
    }

    #[test]
    fn test_insert_rows_shifts_model_records_only() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Background;

        cascade
            .set_cell_property(4, 0, false, id, color(44))
            .unwrap();
        cascade.set_cell_property(4, 0, true, id, color(77)).unwrap();
        cascade
            .set_row_property(6, false, id, color(66), true)
            .unwrap();

        cascade.insert_rows(2, 3);

        // The record that was at model row 4 moved down with the insert.
        assert_eq!(
            got_color(cascade.cell_property(4, 0, id, None)),
            got_color(cascade.default_property(id))
        );
        assert_eq!(
            got_color(cascade.cell_property(6, 0, id, None)),
            Some(Color::from_rgb8(44, 44, 44))
        );
        assert_eq!(
            got_color(cascade.row_property(8, id, None)),
            Some(Color::from_rgb8(66, 66, 66))
        );
        // Visual record stays anchored at visual row 4.
        assert_eq!(
            got_color(cascade.cell_property(0, 0, id, Some((4, 0)))),
            Some(Color::from_rgb8(77, 77, 77))
        );
    }

    #[test]
    fn test_delete_rows_erases_and_shifts() {
        let cascade = AttributeCascade::new();
        let id = CellProperty::Background;

        cascade
            .set_cell_property(2, 1, false, id, color(2))
            .unwrap();
        cascade
            .set_cell_property(5, 1, false, id, color(5))
            .unwrap();

        cascade.delete_rows(2, 2);

        // Row 2's record was in the deleted range.
        assert_eq!(
            got_color(cascade.cell_property(2, 1, id, None)),
            got_color(cascade.default_property(id))
        );
        // Row 5's record moved up to row 3.
        assert_eq!(
            got_color(cascade.cell_property(3, 1, id, None)),
            Some(Color::from_rgb8(5, 5, 5))
        );
    }

    #[test]
    fn test_batch_guard_suppresses_notifications() {
        let cascade = AttributeCascade::new();
        let fired = Arc::new(Mutex::new(0));

        let fired_clone = fired.clone();
        cascade.signals().cell_property_changed.connect(move |_| {
            *fired_clone.lock() += 1;
        });

        {
            let _batch = cascade.begin_batch();
            cascade
                .set_cell_property(0, 0, false, CellProperty::Label, "a".into())
                .unwrap();
            cascade
                .set_cell_property(0, 1, false, CellProperty::Label, "b".into())
                .unwrap();
        }
        assert_eq!(*fired.lock(), 0);

        cascade
            .set_cell_property(0, 2, false, CellProperty::Label, "c".into())
            .unwrap();
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_shadow_consulted_after_full_local_miss() {
        let main = Arc::new(AttributeCascade::new());
        main.set_cell_property(1, 1, false, CellProperty::Label, "main".into())
            .unwrap();

        let header = AttributeCascade::with_shadow(main.clone());

        // Local chain has nothing: the whole query runs on the shadow.
        assert_eq!(
            header
                .cell_property(1, 1, CellProperty::Label, None)
                .and_then(|v| v.as_str().map(String::from)),
            Some("main".to_string())
        );

        // A local default beats the shadow's more specific layers: the
        // fallback is all-or-nothing, not per-layer.
        header
            .set_default_property(CellProperty::Label, "header".into())
            .unwrap();
        assert_eq!(
            header
                .cell_property(1, 1, CellProperty::Label, None)
                .and_then(|v| v.as_str().map(String::from)),
            Some("header".to_string())
        );
    }

    #[test]
    fn test_shadow_changes_are_reemitted() {
        let main = Arc::new(AttributeCascade::new());
        let header = AttributeCascade::with_shadow(main.clone());

        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        header.signals().cell_property_changed.connect(move |_| {
            *fired_clone.lock() += 1;
        });

        main.set_cell_property(0, 0, false, CellProperty::Label, "x".into())
            .unwrap();
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_kind_mismatch_reaches_caller() {
        let cascade = AttributeCascade::new();
        assert!(matches!(
            cascade.set_cell_property(0, 0, false, CellProperty::Enabled, "x".into()),
            Err(StyleError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_serialized_records_round_trip() {
        let cascade = AttributeCascade::new();
        cascade
            .set_cell_property(2, 3, false, CellProperty::Label, "cell".into())
            .unwrap();
        cascade
            .set_repeating_row_property(0, 2, CellProperty::Background, color(9))
            .unwrap();

        let records = cascade.serialized_records();

        let restored = AttributeCascade::new();
        for (scope, entries) in &records {
            restored.apply_record(*scope, entries).unwrap();
        }

        assert_eq!(
            restored
                .cell_property(2, 3, CellProperty::Label, None)
                .and_then(|v| v.as_str().map(String::from)),
            Some("cell".to_string())
        );
        assert_eq!(
            got_color(restored.cell_property(0, 0, CellProperty::Background, Some((0, 0)))),
            Some(Color::from_rgb8(9, 9, 9))
        );
    }
}
