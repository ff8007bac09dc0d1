//! Non-overlapping multi-cell regions rendered as one merged cell.
//!
//! Spans are stored in *model* coordinates: a span sticks to its data when
//! rows or columns are reordered on screen. Queries coming from the view
//! are in *visual* coordinates, so every query translates the stored
//! anchors through the [`CoordinateSpace`] collaborator rather than mapping
//! the incoming coordinates to the model. (Mapping the query instead gives
//! wrong answers as soon as the table is sorted: the cells of a span are
//! contiguous on screen, not in the model.)

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use meridian_core::Signal;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::batch::{self, BatchGuard};
use crate::coords::CoordinateSpace;
use crate::error::SpanError;
use crate::geometry::{CellRegion, LAST_COLUMN, LAST_ROW};

/// A rectangular run of cells anchored at `(row, col)`, `row_span` rows
/// tall and `col_span` columns wide, in model coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl Span {
    pub fn new(row: usize, col: usize, row_span: usize, col_span: usize) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
        }
    }

    /// `true` when the span covers more than one cell. 1x1 "spans" are
    /// degenerate and rejected by the index.
    pub fn is_valid(&self) -> bool {
        (self.row_span > 1 || self.col_span > 1) && self.row_span > 0 && self.col_span > 0
    }

    /// `true` when `(row, col)` (model coordinates) lies inside the span.
    pub fn contains_cell(&self, row: usize, col: usize) -> bool {
        self.row <= row
            && row < self.row + self.row_span
            && self.col <= col
            && col < self.col + self.col_span
    }

    /// Rectangle intersection test.
    ///
    /// Consider the 9 regions around this span: the other span misses only
    /// if it lies entirely above/below or entirely left/right; anything
    /// else touches.
    pub fn intersects(&self, other: &Span) -> bool {
        let my_end_row = self.row + self.row_span - 1;
        let other_end_row = other.row + other.row_span - 1;
        if other.row > my_end_row || self.row > other_end_row {
            return false;
        }

        let my_end_col = self.col + self.col_span - 1;
        let other_end_col = other.col + other.col_span - 1;
        if other.col > my_end_col || self.col > other_end_col {
            return false;
        }

        true
    }

    /// The span as an inclusive cell region.
    pub fn to_region(&self) -> CellRegion {
        CellRegion::new(
            self.row,
            self.col,
            self.row + self.row_span - 1,
            self.col + self.col_span - 1,
        )
    }
}

/// Result of a successful [`SpanIndex::inside_span`] query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanHit {
    /// The span's on-screen rectangle, in visual coordinates.
    pub region: CellRegion,
    /// `true` when the queried cell is the span's top-left (anchor) cell.
    pub is_anchor: bool,
}

/// Change notifications emitted by a [`SpanIndex`].
pub struct SpanSignals {
    /// A span was added, removed, replaced or resized.
    pub span_changed: Signal<Span>,
}

/// The set of non-overlapping spans of one grid.
///
/// Like the cascade, the index takes `&self` everywhere and keeps its
/// state behind interior mutability; all operations are synchronous.
pub struct SpanIndex {
    spans: RwLock<Vec<Span>>,
    signals: SpanSignals,
    batch_depth: Arc<AtomicUsize>,
}

static_assertions::assert_impl_all!(SpanIndex: Send, Sync);

impl Default for SpanIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            spans: RwLock::new(Vec::new()),
            signals: SpanSignals {
                span_changed: Signal::new(),
            },
            batch_depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A new index holding copies of this one's spans.
    ///
    /// Header grids start from the main grid's spans this way. Signal
    /// connections are not copied.
    pub fn cloned(&self) -> SpanIndex {
        let copy = SpanIndex::new();
        *copy.spans.write() = self.spans.read().clone();
        copy
    }

    /// The signals this index emits.
    pub fn signals(&self) -> &SpanSignals {
        &self.signals
    }

    /// Suppress change notifications until the returned guard is dropped.
    pub fn begin_batch(&self) -> BatchGuard {
        BatchGuard::acquire(&self.batch_depth)
    }

    /// Add `span` (model coordinates) to the index.
    ///
    /// A span anchored where an existing span is anchored *replaces* it in
    /// place. Otherwise the span must not intersect any stored span; on
    /// rejection the index is left untouched.
    pub fn add_span(&self, span: Span) -> Result<(), SpanError> {
        if !span.is_valid() {
            return Err(SpanError::Degenerate);
        }

        {
            let mut spans = self.spans.write();
            match spans
                .iter()
                .position(|s| s.row == span.row && s.col == span.col)
            {
                Some(pos) => spans[pos] = span,
                None => {
                    if spans.iter().any(|s| s.intersects(&span)) {
                        return Err(SpanError::Overlap {
                            row: span.row,
                            col: span.col,
                        });
                    }
                    spans.push(span);
                }
            }
        }

        self.notify(span);
        Ok(())
    }

    /// Remove the span anchored at `(row, col)`. Returns `true` when one
    /// was there.
    pub fn remove_span(&self, row: usize, col: usize) -> bool {
        let removed = {
            let mut spans = self.spans.write();
            spans
                .iter()
                .position(|s| s.row == row && s.col == col)
                .map(|pos| spans.remove(pos))
        };

        match removed {
            Some(span) => {
                self.notify(span);
                true
            }
            None => false,
        }
    }

    /// Remove every span.
    pub fn clear(&self) {
        self.spans.write().clear();
    }

    /// Snapshot of the stored spans, in insertion order.
    pub fn spans(&self) -> Vec<Span> {
        self.spans.read().clone()
    }

    pub fn len(&self) -> usize {
        self.spans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.read().is_empty()
    }

    /// Restore spans from a saved list, e.g. the deserialized output of
    /// [`spans`](Self::spans). Invalid or overlapping entries are skipped;
    /// nothing is announced.
    pub fn restore_spans<I: IntoIterator<Item = Span>>(&self, spans: I) {
        let _batch = self.begin_batch();
        for span in spans {
            if let Err(err) = self.add_span(span) {
                tracing::warn!(
                    target: "meridian_grid::span",
                    ?span,
                    %err,
                    "skipping span during restore"
                );
            }
        }
    }

    /// Does visual cell `(visual_row, visual_col)` fall inside a span?
    ///
    /// Each stored span's model anchor is translated to visual coordinates
    /// first: the apparent top-left is the first non-hidden model line of
    /// the span's extent, mapped through the sorter. At most one span can
    /// match, since spans never overlap.
    pub fn inside_span(
        &self,
        coords: &dyn CoordinateSpace,
        visual_row: usize,
        visual_col: usize,
    ) -> Option<SpanHit> {
        let spans = self.spans.read();

        for span in spans.iter() {
            // Visibility toggles can shrink a stored extent to zero; such a
            // span never contains anything, and the extent-end computation
            // must not wrap.
            let row_end = span.row + span.row_span.max(1) - 1;
            let col_end = span.col + span.col_span.max(1) - 1;

            let Some(top) = coords.visual_row(coords.first_visible_model_row(span.row, row_end))
            else {
                continue;
            };
            let Some(left) =
                coords.visual_column(coords.first_visible_model_column(span.col, col_end))
            else {
                continue;
            };

            if top <= visual_row
                && visual_row < top + span.row_span
                && left <= visual_col
                && visual_col < left + span.col_span
            {
                return Some(SpanHit {
                    region: CellRegion::new(
                        top,
                        left,
                        top + span.row_span - 1,
                        left + span.col_span - 1,
                    ),
                    is_anchor: visual_row == top && visual_col == left,
                });
            }
        }

        None
    }

    /// The tallest extent of any span anchored in the model row shown at
    /// `visual_row`, as a whole-row region (height 1 when none match).
    ///
    /// The geometry layer uses this to size a spanning row.
    pub fn max_span_for_row(&self, coords: &dyn CoordinateSpace, visual_row: usize) -> CellRegion {
        let mut height = 1;

        if let Some(model_row) = coords.model_row(visual_row) {
            let spans = self.spans.read();
            for span in spans.iter() {
                if span.row == model_row {
                    height = height.max(span.row_span);
                }
            }
        }

        CellRegion::new(visual_row, 0, visual_row + height - 1, LAST_COLUMN)
    }

    /// The widest extent of any span anchored in the model column shown at
    /// `visual_col`, as a whole-column region (width 1 when none match).
    pub fn max_span_for_column(
        &self,
        coords: &dyn CoordinateSpace,
        visual_col: usize,
    ) -> CellRegion {
        let mut width = 1;

        if let Some(model_col) = coords.model_column(visual_col) {
            let spans = self.spans.read();
            for span in spans.iter() {
                if span.col == model_col {
                    width = width.max(span.col_span);
                }
            }
        }

        CellRegion::new(0, visual_col, LAST_ROW, visual_col + width - 1)
    }

    /// Rows were inserted into the model at `at`.
    ///
    /// A span starting at or past `at` shifts down unchanged; a span whose
    /// interior contains `at` absorbs the inserted rows and grows.
    pub fn insert_rows(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        let mut spans = self.spans.write();
        for span in spans.iter_mut() {
            if span.row >= at {
                span.row += num;
            } else if span.row + span.row_span > at {
                span.row_span += num;
            }
        }
    }

    /// Columns were inserted into the model at `at`.
    pub fn insert_columns(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        let mut spans = self.spans.write();
        for span in spans.iter_mut() {
            if span.col >= at {
                span.col += num;
            } else if span.col + span.col_span > at {
                span.col_span += num;
            }
        }
    }

    /// Rows `[at, at + num)` were deleted from the model.
    ///
    /// Spans entirely inside the range disappear; spans straddling an edge
    /// are truncated; spans past the range shift up.
    pub fn delete_rows(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        let mut spans = self.spans.write();
        spans.retain_mut(|span| {
            let sl = span.row;
            let sr = span.row + span.row_span;
            let dl = at;
            let dr = at + num;

            if sr < dl {
                return true;
            }
            if sl >= dl {
                if sl > dr {
                    span.row -= num;
                    return true;
                }
                if sr <= dr {
                    return false;
                }
                // Deleted range covers the span's leading edge.
                span.row_span = sr - dr;
                span.row = dl;
                return true;
            }
            if sr <= dr {
                // Deleted range covers the span's trailing edge.
                span.row_span = dl - sl;
            } else {
                // Deleted range is strictly interior.
                span.row_span = (dl - sl) + (sr - dr);
            }
            true
        });
    }

    /// Columns `[at, at + num)` were deleted from the model.
    pub fn delete_columns(&self, num: usize, at: usize) {
        if num == 0 {
            return;
        }

        let mut spans = self.spans.write();
        spans.retain_mut(|span| {
            let sl = span.col;
            let sr = span.col + span.col_span;
            let dl = at;
            let dr = at + num;

            if sr < dl {
                return true;
            }
            if sl >= dl {
                if sl > dr {
                    span.col -= num;
                    return true;
                }
                if sr <= dr {
                    return false;
                }
                span.col_span = sr - dr;
                span.col = dl;
                return true;
            }
            if sr <= dr {
                span.col_span = dl - sl;
            } else {
                span.col_span = (dl - sl) + (sr - dr);
            }
            true
        });
    }

    /// Model row `index` was hidden or shown: adjust the stored extent of
    /// every span containing it and re-announce those spans.
    //
    // TODO: repeated hide/show cycles mutate the model-coordinate extent in
    // place, so an unbalanced sequence drifts the span's true size; a
    // per-view cache of apparent extents would avoid touching the model
    // span here.
    pub fn row_visibility_changed(&self, index: usize, visible: bool) {
        let changed = {
            let mut spans = self.spans.write();
            let mut changed = Vec::new();
            for span in spans.iter_mut() {
                if span.row <= index && span.row + span.row_span > index {
                    if visible {
                        span.row_span += 1;
                    } else {
                        span.row_span = span.row_span.saturating_sub(1);
                    }
                    changed.push(*span);
                }
            }
            changed
        };

        for span in changed {
            self.notify(span);
        }
    }

    /// Model column `index` was hidden or shown; see
    /// [`row_visibility_changed`](Self::row_visibility_changed).
    pub fn column_visibility_changed(&self, index: usize, visible: bool) {
        let changed = {
            let mut spans = self.spans.write();
            let mut changed = Vec::new();
            for span in spans.iter_mut() {
                if span.col <= index && span.col + span.col_span > index {
                    if visible {
                        span.col_span += 1;
                    } else {
                        span.col_span = span.col_span.saturating_sub(1);
                    }
                    changed.push(*span);
                }
            }
            changed
        };

        for span in changed {
            self.notify(span);
        }
    }

    fn notify(&self, span: Span) {
        if batch::reporting(&self.batch_depth) {
            self.signals.span_changed.emit(span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::coords::DirectCoordinates;

    #[test]
    fn test_degenerate_span_rejected() {
        let index = SpanIndex::new();
        assert_eq!(
            index.add_span(Span::new(0, 0, 1, 1)),
            Err(SpanError::Degenerate)
        );
        assert_eq!(
            index.add_span(Span::new(0, 0, 0, 5)),
            Err(SpanError::Degenerate)
        );
        assert!(index.is_empty());
    }

    #[test]
    fn test_overlap_rejected_without_mutation() {
        let index = SpanIndex::new();
        index.add_span(Span::new(2, 0, 3, 5)).unwrap();

        assert_eq!(
            index.add_span(Span::new(3, 2, 2, 2)),
            Err(SpanError::Overlap { row: 3, col: 2 })
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.spans()[0], Span::new(2, 0, 3, 5));
    }

    #[test]
    fn test_same_anchor_replaces_in_place() {
        let index = SpanIndex::new();
        index.add_span(Span::new(1, 1, 2, 2)).unwrap();
        index.add_span(Span::new(1, 1, 4, 3)).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.spans()[0], Span::new(1, 1, 4, 3));
    }

    #[test]
    fn test_disjoint_spans_coexist() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 2, 2)).unwrap();
        index.add_span(Span::new(0, 2, 2, 2)).unwrap();
        index.add_span(Span::new(2, 0, 2, 4)).unwrap();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_remove_span_by_anchor() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 2, 2)).unwrap();
        assert!(index.remove_span(0, 0));
        assert!(!index.remove_span(0, 0));
        assert!(index.is_empty());
    }

    #[test]
    fn test_inside_span_direct_coords() {
        let index = SpanIndex::new();
        index.add_span(Span::new(1, 1, 2, 3)).unwrap();
        let coords = DirectCoordinates;

        let hit = index.inside_span(&coords, 1, 1).unwrap();
        assert!(hit.is_anchor);
        assert_eq!(hit.region, CellRegion::new(1, 1, 2, 3));

        let hit = index.inside_span(&coords, 2, 3).unwrap();
        assert!(!hit.is_anchor);

        assert!(index.inside_span(&coords, 0, 0).is_none());
        assert!(index.inside_span(&coords, 3, 1).is_none());
        assert!(index.inside_span(&coords, 1, 4).is_none());
    }

    #[test]
    fn test_inside_span_with_reordered_rows() {
        // Two model rows shown swapped: model 0 at visual 1 and vice versa.
        struct Swapped;
        impl CoordinateSpace for Swapped {
            fn model_row(&self, visual: usize) -> Option<usize> {
                Some(match visual {
                    0 => 1,
                    1 => 0,
                    other => other,
                })
            }
            fn model_column(&self, visual: usize) -> Option<usize> {
                Some(visual)
            }
            fn visual_row(&self, model: usize) -> Option<usize> {
                self.model_row(model)
            }
            fn visual_column(&self, model: usize) -> Option<usize> {
                Some(model)
            }
            fn is_row_hidden(&self, _model: usize) -> bool {
                false
            }
            fn is_column_hidden(&self, _model: usize) -> bool {
                false
            }
        }

        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 2, 2)).unwrap();

        // The span's model anchor row 0 appears at visual row 1, so the
        // visual rectangle starts there.
        let hit = index.inside_span(&Swapped, 1, 0).unwrap();
        assert!(hit.is_anchor);
        assert_eq!(hit.region, CellRegion::new(1, 0, 2, 1));
        assert!(index.inside_span(&Swapped, 0, 0).is_none());
    }

    #[test]
    fn test_inside_span_skips_hidden_anchor_row() {
        // Model row 1 hidden; rows 0,2,3 visible at positions 0,1,2.
        struct HideRow1;
        impl CoordinateSpace for HideRow1 {
            fn model_row(&self, visual: usize) -> Option<usize> {
                [0usize, 2, 3].get(visual).copied()
            }
            fn model_column(&self, visual: usize) -> Option<usize> {
                Some(visual)
            }
            fn visual_row(&self, model: usize) -> Option<usize> {
                match model {
                    0 => Some(0),
                    2 => Some(1),
                    3 => Some(2),
                    _ => None,
                }
            }
            fn visual_column(&self, model: usize) -> Option<usize> {
                Some(model)
            }
            fn is_row_hidden(&self, model: usize) -> bool {
                model == 1
            }
            fn is_column_hidden(&self, _model: usize) -> bool {
                false
            }
        }

        let index = SpanIndex::new();
        // Span anchored on the hidden row: its apparent top-left is the
        // first visible row of its extent (model 2, shown at visual 1).
        index.add_span(Span::new(1, 0, 2, 2)).unwrap();

        let hit = index.inside_span(&HideRow1, 1, 0).unwrap();
        assert!(hit.is_anchor);
        assert_eq!(hit.region.start_row, 1);
    }

    #[test]
    fn test_max_span_for_row_and_column() {
        let index = SpanIndex::new();
        index.add_span(Span::new(2, 0, 4, 2)).unwrap();
        index.add_span(Span::new(2, 5, 2, 3)).unwrap();
        let coords = DirectCoordinates;

        let region = index.max_span_for_row(&coords, 2);
        assert_eq!(region.start_row, 2);
        assert_eq!(region.end_row, 5);

        let region = index.max_span_for_row(&coords, 0);
        assert_eq!(region.height(), 1);

        let region = index.max_span_for_column(&coords, 5);
        assert_eq!(region.start_col, 5);
        assert_eq!(region.end_col, 7);
    }

    #[test]
    fn test_insert_rows_shift_and_grow() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 5, 2)).unwrap();

        // Interior insertion grows the span.
        index.insert_rows(2, 3);
        assert_eq!(index.spans()[0], Span::new(0, 0, 7, 2));

        // Insertion at or before the anchor shifts it.
        index.insert_rows(2, 0);
        assert_eq!(index.spans()[0], Span::new(2, 0, 7, 2));
    }

    #[test]
    fn test_delete_rows_interior_shrink() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 5, 2)).unwrap();

        index.delete_rows(2, 1);
        assert_eq!(index.spans()[0], Span::new(0, 0, 3, 2));
    }

    #[test]
    fn test_delete_rows_leading_edge() {
        let index = SpanIndex::new();
        index.add_span(Span::new(3, 0, 4, 2)).unwrap();

        // Delete rows 2..4: the span's first row goes, the rest slides up.
        index.delete_rows(2, 2);
        assert_eq!(index.spans()[0], Span::new(2, 0, 3, 2));
    }

    #[test]
    fn test_delete_rows_trailing_edge() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 4, 2)).unwrap();

        index.delete_rows(3, 2);
        assert_eq!(index.spans()[0], Span::new(0, 0, 2, 2));
    }

    #[test]
    fn test_delete_rows_covering_span_removes_it() {
        let index = SpanIndex::new();
        index.add_span(Span::new(2, 0, 2, 2)).unwrap();

        index.delete_rows(4, 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_delete_rows_past_span_shifts_nothing() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 2, 2)).unwrap();

        index.delete_rows(3, 5);
        assert_eq!(index.spans()[0], Span::new(0, 0, 2, 2));
    }

    #[test]
    fn test_visibility_toggle_adjusts_extent() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 3, 2)).unwrap();

        let changed = Arc::new(Mutex::new(Vec::new()));
        let changed_clone = changed.clone();
        index.signals().span_changed.connect(move |span| {
            changed_clone.lock().push(*span);
        });

        index.row_visibility_changed(1, false);
        assert_eq!(index.spans()[0], Span::new(0, 0, 2, 2));
        index.row_visibility_changed(1, true);
        assert_eq!(index.spans()[0], Span::new(0, 0, 3, 2));
        assert_eq!(changed.lock().len(), 2);

        // A row outside every span changes nothing.
        index.row_visibility_changed(9, false);
        assert_eq!(changed.lock().len(), 2);
    }

    #[test]
    fn test_batch_guard_suppresses_span_changed() {
        let index = SpanIndex::new();
        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        index.signals().span_changed.connect(move |_| {
            *fired_clone.lock() += 1;
        });

        {
            let _batch = index.begin_batch();
            index.add_span(Span::new(0, 0, 2, 2)).unwrap();
        }
        assert_eq!(*fired.lock(), 0);

        index.add_span(Span::new(5, 5, 2, 2)).unwrap();
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_cloned_copies_spans_not_connections() {
        let index = SpanIndex::new();
        index.add_span(Span::new(0, 0, 2, 2)).unwrap();
        index.signals().span_changed.connect(|_| {});

        let copy = index.cloned();
        assert_eq!(copy.spans(), index.spans());
        assert_eq!(copy.signals().span_changed.connection_count(), 0);
    }
}
