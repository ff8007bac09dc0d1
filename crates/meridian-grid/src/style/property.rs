//! Property identifiers and their declared value kinds.
//!
//! Two disjoint id sets exist: [`CellProperty`] for everything that can vary
//! per cell, row or column, and [`GridProperty`] for table-wide display and
//! interaction settings. Every id has a fixed [`PropertyKind`]; consumers
//! must request values of the matching kind.

/// The kind of value a property holds.
///
/// Value kinds are owned by the store that holds them. Handle kinds
/// (renderer, formatter, validator, paste guard, opaque handle) are borrowed
/// references to externally-owned objects and are never freed by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Int,
    Float,
    Str,
    Bool,
    Color,
    Font,
    Pixmap,
    Cursor,
    Pen,
    Region,
    Point,
    Renderer,
    Formatter,
    Validator,
    PasteGuard,
    Handle,
}

impl PropertyKind {
    /// `true` for kinds stored as non-owning references.
    pub fn is_handle(self) -> bool {
        matches!(
            self,
            PropertyKind::Renderer
                | PropertyKind::Formatter
                | PropertyKind::Validator
                | PropertyKind::PasteGuard
                | PropertyKind::Handle
        )
    }

    /// `true` for kinds that round-trip through the textual projection.
    ///
    /// Handles are externally owned, pixmaps are raw pixel data and cursors
    /// are transient visuals; none of them serialize.
    pub fn is_serializable(self) -> bool {
        matches!(
            self,
            PropertyKind::Int
                | PropertyKind::Float
                | PropertyKind::Str
                | PropertyKind::Bool
                | PropertyKind::Color
                | PropertyKind::Font
                | PropertyKind::Pen
                | PropertyKind::Region
                | PropertyKind::Point
        )
    }
}

/// Common interface of the two property-id enums, used by the generic
/// property store.
pub trait PropertyId: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Number of ids in this set.
    const COUNT: usize;

    /// Dense slot index of this id.
    fn index(self) -> usize;

    /// The declared value kind.
    fn kind(self) -> PropertyKind;

    /// Stable name used by the serialization projection.
    fn name(self) -> &'static str;

    /// Inverse of [`name`](Self::name).
    fn from_name(name: &str) -> Option<Self>;

    /// All ids, in slot order.
    fn all() -> &'static [Self];
}

macro_rules! property_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($kind:ident, $text:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All ids, in slot order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];
        }

        impl PropertyId for $name {
            const COUNT: usize = $name::ALL.len();

            fn index(self) -> usize {
                self as usize
            }

            fn kind(self) -> PropertyKind {
                match self {
                    $( $name::$variant => PropertyKind::$kind ),+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $text => Some($name::$variant), )+
                    _ => None,
                }
            }

            fn all() -> &'static [Self] {
                $name::ALL
            }
        }
    };
}

property_set! {
    /// Properties that can be set per cell, per row, per column, on a
    /// repeating pattern, or as the table-wide default.
    pub enum CellProperty {
        /// Width of the cell border, in pixels.
        BorderWidth => (Int, "borderWidth"),
        TopBorderPen => (Pen, "topBorderPen"),
        LeftBorderPen => (Pen, "leftBorderPen"),
        RightBorderPen => (Pen, "rightBorderPen"),
        BottomBorderPen => (Pen, "bottomBorderPen"),
        /// Inner padding between border and content, in pixels.
        CellMargin => (Int, "cellMargin"),
        Enabled => (Bool, "enabled"),
        Selected => (Bool, "selected"),
        ReadOnly => (Bool, "readOnly"),
        /// Content alignment flags (see [`crate::style::align`]).
        Alignment => (Int, "alignment"),
        /// Text layout flags (wrapping, eliding).
        TextFlags => (Int, "textFlags"),
        Font => (Font, "font"),
        Cursor => (Cursor, "cursor"),
        /// The renderer drawing this cell. Borrowed; the owner is notified
        /// through `about_to_clear` before the reference is dropped.
        Renderer => (Renderer, "renderer"),
        /// Formats the cell's raw value for display. Borrowed.
        Formatter => (Formatter, "formatter"),
        Pixmap => (Pixmap, "pixmap"),
        PixmapName => (Str, "pixmapName"),
        /// Gap between pixmap and text, in pixels.
        PixmapSpacing => (Int, "pixmapSpacing"),
        /// Validates edits in progress. Borrowed.
        Validator => (Validator, "validator"),
        Label => (Str, "label"),
        MaxLength => (Int, "maxLength"),
        /// Arbitrary caller data attached to the cell. Borrowed.
        UserData => (Handle, "userData"),
        Hidden => (Bool, "hidden"),
        ToolTip => (Str, "toolTip"),
        EditBackground => (Color, "editBackground"),
        EditForeground => (Color, "editForeground"),
        /// Vets pasted content before it is committed. Borrowed.
        PasteGuard => (PasteGuard, "pasteGuard"),
        AutoRecognition => (Bool, "autoRecognition"),
        AcceptsDrops => (Bool, "acceptsDrops"),
        Foreground => (Color, "foreground"),
        Background => (Color, "background"),
        WindowText => (Color, "windowText"),
        Window => (Color, "window"),
        SelectedForeground => (Color, "selectedForeground"),
        SelectedBackground => (Color, "selectedBackground"),
        SelectedFont => (Font, "selectedFont"),
        HighlightedForeground => (Color, "highlightedForeground"),
        HighlightedBackground => (Color, "highlightedBackground"),
    }
}

property_set! {
    /// Table-wide display and interaction settings.
    pub enum GridProperty {
        HorizontalGridLinesVisible => (Bool, "horizontalGridLinesVisible"),
        VerticalGridLinesVisible => (Bool, "verticalGridLinesVisible"),
        HorizontalGridLineWidth => (Int, "horizontalGridLineWidth"),
        VerticalGridLineWidth => (Int, "verticalGridLineWidth"),
        HorizontalGridLineStyle => (Int, "horizontalGridLineStyle"),
        VerticalGridLineStyle => (Int, "verticalGridLineStyle"),
        HorizontalGridLinePen => (Pen, "horizontalGridLinePen"),
        VerticalGridLinePen => (Pen, "verticalGridLinePen"),
        FillHandleVisible => (Bool, "fillHandleVisible"),
        CellClipping => (Int, "cellClipping"),
        DrawPartialCells => (Bool, "drawPartialCells"),
        AllowUserResize => (Bool, "allowUserResize"),
        AllowHeaderResize => (Bool, "allowHeaderResize"),
        AllowUserMove => (Bool, "allowUserMove"),
        AllowUserEdit => (Bool, "allowUserEdit"),
        ClickToEdit => (Bool, "clickToEdit"),
        ResizeCursor => (Cursor, "resizeCursor"),
        AutoSelectContents => (Bool, "autoSelectContents"),
        TraversalKeyEditBehavior => (Int, "traversalKeyEditBehavior"),
        EnterTraversalDirection => (Int, "enterTraversalDirection"),
        TabTraversalDirection => (Int, "tabTraversalDirection"),
        EnterTraverseToBegin => (Bool, "enterTraverseToBegin"),
        TabTraverseToBegin => (Bool, "tabTraverseToBegin"),
        RepaintBehavior => (Int, "repaintBehavior"),
        OverflowBehavior => (Int, "overflowBehavior"),
        ToolTipOffset => (Point, "toolTipOffset"),
        MaxOverflowCells => (Int, "maxOverflowCells"),
        CurrentCellStyle => (Int, "currentCellStyle"),
        CurrentCellBorderWidth => (Int, "currentCellBorderWidth"),
        FrameLineWidth => (Int, "frameLineWidth"),
        FrameStyle => (Int, "frameStyle"),
        Viewport => (Region, "viewport"),
        OverflowPixmap => (Pixmap, "overflowPixmap"),
        DragEnabled => (Bool, "dragEnabled"),
        LayoutDirection => (Int, "layoutDirection"),
        SelectionStyle => (Int, "selectionStyle"),
        ExclusiveBorderWidth => (Int, "exclusiveBorderWidth"),
        ExclusiveBorderColor => (Color, "exclusiveBorderColor"),
        ExclusiveHandleBackground => (Color, "exclusiveHandleBackground"),
        ExclusiveHandleColor => (Color, "exclusiveHandleColor"),
        ExclusiveDragBackground => (Color, "exclusiveDragBackground"),
        ExclusiveDragPen => (Pen, "exclusiveDragPen"),
        ExclusiveDragMode => (Int, "exclusiveDragMode"),
        ExclusiveDragOpacity => (Float, "exclusiveDragOpacity"),
        HighlightSelection => (Bool, "highlightSelection"),
    }
}

/// Alignment flag constants for the `Alignment` property.
pub mod align {
    pub const LEFT: i32 = 0x01;
    pub const RIGHT: i32 = 0x02;
    pub const HCENTER: i32 = 0x04;
    pub const TOP: i32 = 0x10;
    pub const BOTTOM: i32 = 0x20;
    pub const VCENTER: i32 = 0x40;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_property_count() {
        assert_eq!(CellProperty::COUNT, 38);
        assert_eq!(CellProperty::ALL.len(), CellProperty::COUNT);
    }

    #[test]
    fn test_grid_property_count() {
        assert_eq!(GridProperty::COUNT, 45);
    }

    #[test]
    fn test_indices_are_dense() {
        for (i, id) in CellProperty::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        for (i, id) in GridProperty::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_name_round_trip() {
        for id in CellProperty::ALL {
            assert_eq!(CellProperty::from_name(id.name()), Some(*id));
        }
        for id in GridProperty::ALL {
            assert_eq!(GridProperty::from_name(id.name()), Some(*id));
        }
        assert_eq!(CellProperty::from_name("noSuchProperty"), None);
    }

    #[test]
    fn test_declared_kinds() {
        assert_eq!(CellProperty::Foreground.kind(), PropertyKind::Color);
        assert_eq!(CellProperty::Renderer.kind(), PropertyKind::Renderer);
        assert!(CellProperty::Renderer.kind().is_handle());
        assert!(!CellProperty::Font.kind().is_handle());
        assert_eq!(GridProperty::Viewport.kind(), PropertyKind::Region);
        assert!(!PropertyKind::Pixmap.is_serializable());
        assert!(PropertyKind::Pen.is_serializable());
    }
}
