//! Slot-array storage for the attributes set on one addressable thing.

use std::marker::PhantomData;

use cursor_icon::CursorIcon;

use crate::error::StyleError;
use crate::paint::{Color, Font, Pen};
use crate::style::property::{CellProperty, GridProperty, PropertyId};
use crate::style::value::PropertyValue;

/// The attributes set on one addressable thing: a cell, a row, a column, a
/// repeating pattern, or the table-wide default.
///
/// One fixed slot per property id of the set `P`. A live set-count makes
/// [`is_empty`](Self::is_empty) O(1); empty stores are pruned by their
/// owners to bound memory under sparse usage.
#[derive(Debug)]
pub struct PropertyStore<P: PropertyId> {
    slots: Box<[Option<PropertyValue>]>,
    set_count: usize,
    _ids: PhantomData<P>,
}

impl<P: PropertyId> Default for PropertyStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PropertyId> PropertyStore<P> {
    /// Create a store with every slot unset.
    pub fn new() -> Self {
        Self {
            slots: vec![None; P::COUNT].into_boxed_slice(),
            set_count: 0,
            _ids: PhantomData,
        }
    }

    /// The current value for `id`, if set.
    pub fn get(&self, id: P) -> Option<&PropertyValue> {
        self.slots[id.index()].as_ref()
    }

    /// Set `id` to `value`.
    ///
    /// Any prior value is cleared first: a renderer slot gets its
    /// `about_to_clear` notification before the old reference is dropped.
    /// Value kinds are copied in; handle kinds are stored as the weak
    /// reference they already are.
    pub fn set(&mut self, id: P, value: PropertyValue) -> Result<(), StyleError> {
        if value.kind() != id.kind() {
            return Err(StyleError::KindMismatch {
                property: id.name(),
                expected: id.kind(),
                got: value.kind(),
            });
        }

        self.clear(id);
        self.slots[id.index()] = Some(value);
        self.set_count += 1;
        Ok(())
    }

    /// Unset `id`, dropping (for value kinds) or forgetting (for handle
    /// kinds) the stored value.
    pub fn clear(&mut self, id: P) {
        if let Some(old) = self.slots[id.index()].take() {
            if let Some(renderer) = old.as_renderer() {
                renderer.about_to_clear(None);
            }
            self.set_count -= 1;
        }
    }

    /// Unset every slot.
    pub fn clear_all(&mut self) {
        for id in P::all() {
            self.clear(*id);
        }
    }

    /// `true` when no slot is set.
    pub fn is_empty(&self) -> bool {
        self.set_count == 0
    }

    /// Number of slots currently set.
    pub fn set_count(&self) -> usize {
        self.set_count
    }

    /// Enumerate `(name, text)` pairs for every set, serializable slot.
    ///
    /// Handles, pixmaps and cursors are skipped; document framing is the
    /// caller's business.
    pub fn serialized_entries(&self) -> Vec<(String, String)> {
        P::all()
            .iter()
            .filter_map(|&id| {
                let value = self.get(id)?;
                let text = value.to_text()?;
                Some((id.name().to_string(), text))
            })
            .collect()
    }

    /// Apply one `(name, text)` pair produced by
    /// [`serialized_entries`](Self::serialized_entries).
    pub fn apply_serialized(&mut self, name: &str, text: &str) -> Result<(), StyleError> {
        let id = P::from_name(name).ok_or_else(|| StyleError::UnknownProperty(name.to_string()))?;
        let value = PropertyValue::from_text(id.kind(), text, id.name())?;
        self.set(id, value)
    }
}

impl PropertyStore<CellProperty> {
    /// The default cell record for a fresh table: every visual property a
    /// renderer might ask for has a baseline value here, so the cascade
    /// bottoms out on something concrete.
    pub fn with_cell_defaults() -> Self {
        let mut store = Self::new();

        // The compile-time kind tables make these infallible.
        let defaults: &[(CellProperty, PropertyValue)] = &[
            (CellProperty::Foreground, Color::BLACK.into()),
            (CellProperty::Background, Color::WHITE.into()),
            (
                CellProperty::SelectedForeground,
                Color::WHITE.into(),
            ),
            (
                CellProperty::SelectedBackground,
                Color::from_rgb8(0x31, 0x6a, 0xc5).into(),
            ),
            (CellProperty::WindowText, Color::BLACK.into()),
            (
                CellProperty::Window,
                Color::from_rgb8(0xf0, 0xf0, 0xf0).into(),
            ),
            (
                CellProperty::HighlightedForeground,
                Color::WHITE.into(),
            ),
            (
                CellProperty::HighlightedBackground,
                Color::from_rgb8(0x31, 0x6a, 0xc5).into(),
            ),
            (CellProperty::Font, Font::default().into()),
            (CellProperty::SelectedFont, Font::default().into()),
            (CellProperty::Cursor, CursorIcon::Default.into()),
            (CellProperty::BorderWidth, 1.into()),
            (CellProperty::TopBorderPen, Pen::none().into()),
            (CellProperty::LeftBorderPen, Pen::none().into()),
            (CellProperty::RightBorderPen, Pen::none().into()),
            (CellProperty::BottomBorderPen, Pen::none().into()),
            (CellProperty::CellMargin, 1.into()),
            (CellProperty::Enabled, true.into()),
            (CellProperty::Selected, false.into()),
            (CellProperty::ReadOnly, false.into()),
            (
                CellProperty::Alignment,
                (crate::style::property::align::LEFT | crate::style::property::align::VCENTER)
                    .into(),
            ),
            (CellProperty::TextFlags, 0.into()),
            (CellProperty::PixmapSpacing, 6.into()),
            (CellProperty::MaxLength, 32767.into()),
            (CellProperty::Hidden, false.into()),
            (CellProperty::AutoRecognition, false.into()),
            (CellProperty::AcceptsDrops, false.into()),
        ];

        for (id, value) in defaults {
            let _ = store.set(*id, value.clone());
        }
        store
    }
}

impl PropertyStore<GridProperty> {
    /// The grid record for a fresh table, populated with its defaults.
    pub fn with_grid_defaults() -> Self {
        let mut store = Self::new();

        let line_pen = Pen::new(Color::from_rgb8(0xc0, 0xc0, 0xc0), 1, crate::paint::PenStyle::Solid);
        let defaults: &[(GridProperty, PropertyValue)] = &[
            (GridProperty::HorizontalGridLinesVisible, true.into()),
            (GridProperty::VerticalGridLinesVisible, true.into()),
            (GridProperty::HorizontalGridLineWidth, 1.into()),
            (GridProperty::VerticalGridLineWidth, 1.into()),
            (GridProperty::HorizontalGridLineStyle, 0.into()),
            (GridProperty::VerticalGridLineStyle, 0.into()),
            (GridProperty::HorizontalGridLinePen, line_pen.into()),
            (GridProperty::VerticalGridLinePen, line_pen.into()),
            (GridProperty::FillHandleVisible, false.into()),
            (GridProperty::CellClipping, 0.into()),
            (GridProperty::DrawPartialCells, true.into()),
            (GridProperty::AllowUserResize, true.into()),
            (GridProperty::AllowHeaderResize, true.into()),
            (GridProperty::AllowUserMove, false.into()),
            (GridProperty::AllowUserEdit, true.into()),
            (GridProperty::ClickToEdit, false.into()),
            (GridProperty::ResizeCursor, CursorIcon::ColResize.into()),
            (GridProperty::AutoSelectContents, true.into()),
            (GridProperty::TraversalKeyEditBehavior, 0.into()),
            (GridProperty::EnterTraversalDirection, 0.into()),
            (GridProperty::TabTraversalDirection, 1.into()),
            (GridProperty::EnterTraverseToBegin, false.into()),
            (GridProperty::TabTraverseToBegin, false.into()),
            (GridProperty::RepaintBehavior, 0.into()),
            (GridProperty::OverflowBehavior, 0.into()),
            (
                GridProperty::ToolTipOffset,
                crate::paint::Point::new(0, 20).into(),
            ),
            (GridProperty::MaxOverflowCells, 10.into()),
            (GridProperty::CurrentCellStyle, 0.into()),
            (GridProperty::CurrentCellBorderWidth, 3.into()),
            (GridProperty::FrameLineWidth, 2.into()),
            (GridProperty::FrameStyle, 0.into()),
            (GridProperty::DragEnabled, true.into()),
            (GridProperty::LayoutDirection, 0.into()),
            (GridProperty::SelectionStyle, 0.into()),
            (GridProperty::ExclusiveBorderWidth, 2.into()),
            (GridProperty::ExclusiveBorderColor, Color::BLACK.into()),
            (
                GridProperty::ExclusiveHandleBackground,
                Color::WHITE.into(),
            ),
            (GridProperty::ExclusiveHandleColor, Color::BLACK.into()),
            (
                GridProperty::ExclusiveDragBackground,
                Color::LIGHT_GRAY.into(),
            ),
            (GridProperty::ExclusiveDragPen, Pen::default().into()),
            (GridProperty::ExclusiveDragMode, 0.into()),
            (GridProperty::ExclusiveDragOpacity, 0.6f32.into()),
            (GridProperty::HighlightSelection, true.into()),
        ];

        for (id, value) in defaults {
            let _ = store.set(*id, value.clone());
        }
        store
    }
}
