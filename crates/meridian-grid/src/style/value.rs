//! Property values and the handle traits for externally-owned collaborators.

use std::any::Any;
use std::sync::{Arc, Weak};

use cursor_icon::CursorIcon;

use crate::error::StyleError;
use crate::geometry::CellRegion;
use crate::paint::{Color, Font, Pen, PenStyle, Pixmap, Point};
use crate::style::property::PropertyKind;

/// Draws a cell's content.
///
/// The engine stores renderers by reference only and never owns them.
/// [`about_to_clear`](Self::about_to_clear) is called synchronously just
/// before the engine drops or replaces its reference, giving the owner a
/// chance to tear down an in-progress edit for the affected cell.
pub trait CellRenderer: Send + Sync {
    /// Called before the engine's reference to this renderer is dropped.
    ///
    /// `cell` carries the resolved model coordinates when the caller knows
    /// them, `None` when the reference is being dropped without a cell
    /// context (e.g. a record being cleared wholesale).
    fn about_to_clear(&self, _cell: Option<(usize, usize)>) {}
}

/// Formats a cell's raw value for display.
pub trait ValueFormatter: Send + Sync {
    fn format(&self, raw: &str) -> String;
}

/// Validates an edit in progress.
pub trait EditValidator: Send + Sync {
    fn validate(&self, input: &str) -> bool;
}

/// Vets pasted content before it is committed to a cell.
pub trait PasteGuard: Send + Sync {
    fn accepts(&self, row: usize, col: usize, payload: &str) -> bool;
}

/// A single property value, tagged by kind.
///
/// Value kinds own their payload; cloning one deep-copies it (cheaply, for
/// the `Arc`-backed pixmap). Handle kinds hold [`Weak`] references to
/// externally-owned objects; cloning clones the reference only.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
    Color(Color),
    Font(Font),
    Pixmap(Pixmap),
    Cursor(CursorIcon),
    Pen(Pen),
    Region(CellRegion),
    Point(Point),
    Renderer(Weak<dyn CellRenderer>),
    Formatter(Weak<dyn ValueFormatter>),
    Validator(Weak<dyn EditValidator>),
    PasteGuard(Weak<dyn PasteGuard>),
    Handle(Weak<dyn Any + Send + Sync>),
}

impl PropertyValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::Str(_) => PropertyKind::Str,
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Font(_) => PropertyKind::Font,
            PropertyValue::Pixmap(_) => PropertyKind::Pixmap,
            PropertyValue::Cursor(_) => PropertyKind::Cursor,
            PropertyValue::Pen(_) => PropertyKind::Pen,
            PropertyValue::Region(_) => PropertyKind::Region,
            PropertyValue::Point(_) => PropertyKind::Point,
            PropertyValue::Renderer(_) => PropertyKind::Renderer,
            PropertyValue::Formatter(_) => PropertyKind::Formatter,
            PropertyValue::Validator(_) => PropertyKind::Validator,
            PropertyValue::PasteGuard(_) => PropertyKind::PasteGuard,
            PropertyValue::Handle(_) => PropertyKind::Handle,
        }
    }

    /// Store a non-owning reference to a renderer.
    pub fn from_renderer<R: CellRenderer + 'static>(renderer: &Arc<R>) -> Self {
        let arc: Arc<dyn CellRenderer> = renderer.clone();
        let weak: Weak<dyn CellRenderer> = Arc::downgrade(&arc);
        PropertyValue::Renderer(weak)
    }

    /// Store a non-owning reference to a formatter.
    pub fn from_formatter<F: ValueFormatter + 'static>(formatter: &Arc<F>) -> Self {
        let arc: Arc<dyn ValueFormatter> = formatter.clone();
        let weak: Weak<dyn ValueFormatter> = Arc::downgrade(&arc);
        PropertyValue::Formatter(weak)
    }

    /// Store a non-owning reference to a validator.
    pub fn from_validator<V: EditValidator + 'static>(validator: &Arc<V>) -> Self {
        let arc: Arc<dyn EditValidator> = validator.clone();
        let weak: Weak<dyn EditValidator> = Arc::downgrade(&arc);
        PropertyValue::Validator(weak)
    }

    /// Store a non-owning reference to a paste guard.
    pub fn from_paste_guard<G: PasteGuard + 'static>(guard: &Arc<G>) -> Self {
        let arc: Arc<dyn PasteGuard> = guard.clone();
        let weak: Weak<dyn PasteGuard> = Arc::downgrade(&arc);
        PropertyValue::PasteGuard(weak)
    }

    /// Store a non-owning reference to arbitrary caller data.
    pub fn from_handle<T: Any + Send + Sync>(handle: &Arc<T>) -> Self {
        let arc: Arc<dyn Any + Send + Sync> = handle.clone();
        let weak: Weak<dyn Any + Send + Sync> = Arc::downgrade(&arc);
        PropertyValue::Handle(weak)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            PropertyValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&Font> {
        match self {
            PropertyValue::Font(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_pixmap(&self) -> Option<&Pixmap> {
        match self {
            PropertyValue::Pixmap(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_cursor(&self) -> Option<CursorIcon> {
        match self {
            PropertyValue::Cursor(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_pen(&self) -> Option<Pen> {
        match self {
            PropertyValue::Pen(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_region(&self) -> Option<CellRegion> {
        match self {
            PropertyValue::Region(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            PropertyValue::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Upgrade the stored renderer reference, if it is still alive.
    pub fn as_renderer(&self) -> Option<Arc<dyn CellRenderer>> {
        match self {
            PropertyValue::Renderer(w) => w.upgrade(),
            _ => None,
        }
    }

    /// Upgrade the stored formatter reference, if it is still alive.
    pub fn as_formatter(&self) -> Option<Arc<dyn ValueFormatter>> {
        match self {
            PropertyValue::Formatter(w) => w.upgrade(),
            _ => None,
        }
    }

    /// Upgrade the stored validator reference, if it is still alive.
    pub fn as_validator(&self) -> Option<Arc<dyn EditValidator>> {
        match self {
            PropertyValue::Validator(w) => w.upgrade(),
            _ => None,
        }
    }

    /// Upgrade the stored paste guard reference, if it is still alive.
    pub fn as_paste_guard(&self) -> Option<Arc<dyn PasteGuard>> {
        match self {
            PropertyValue::PasteGuard(w) => w.upgrade(),
            _ => None,
        }
    }

    /// Upgrade the stored opaque handle, if it is still alive.
    pub fn as_handle(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        match self {
            PropertyValue::Handle(w) => w.upgrade(),
            _ => None,
        }
    }

    /// Textual projection of this value, `None` for non-serializable kinds.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PropertyValue::Int(n) => Some(n.to_string()),
            PropertyValue::Float(n) => Some(n.to_string()),
            PropertyValue::Str(s) => Some(s.clone()),
            PropertyValue::Bool(b) => Some(b.to_string()),
            PropertyValue::Color(c) => Some(c.to_hex()),
            PropertyValue::Font(f) => Some(format!(
                "{},{},{},{},{}",
                f.family, f.point_size, f.weight, f.italic, f.underline
            )),
            PropertyValue::Pen(p) => Some(format!(
                "{},{},{}",
                p.color.to_hex(),
                p.width,
                p.style.as_str()
            )),
            PropertyValue::Region(r) => Some(format!(
                "{},{},{},{}",
                r.start_row, r.start_col, r.end_row, r.end_col
            )),
            PropertyValue::Point(p) => Some(format!("{},{}", p.x, p.y)),
            _ => None,
        }
    }

    /// Parse a value of the given kind back from its textual projection.
    pub fn from_text(
        kind: PropertyKind,
        text: &str,
        property: &'static str,
    ) -> Result<Self, StyleError> {
        let bad = |message: &str| StyleError::invalid_value(property, text, message);

        match kind {
            PropertyKind::Int => text
                .parse::<i32>()
                .map(PropertyValue::Int)
                .map_err(|e| bad(&e.to_string())),
            PropertyKind::Float => text
                .parse::<f32>()
                .map(PropertyValue::Float)
                .map_err(|e| bad(&e.to_string())),
            PropertyKind::Str => Ok(PropertyValue::Str(text.to_string())),
            PropertyKind::Bool => text
                .parse::<bool>()
                .map(PropertyValue::Bool)
                .map_err(|e| bad(&e.to_string())),
            PropertyKind::Color => Color::from_hex(text)
                .map(PropertyValue::Color)
                .ok_or_else(|| bad("expected #rrggbb or #rrggbbaa")),
            PropertyKind::Font => {
                // family,size,weight,italic,underline; split from the right
                // so a comma in the family name survives.
                let mut fields = text.rsplitn(5, ',');
                let underline = fields.next().and_then(|s| s.parse().ok());
                let italic = fields.next().and_then(|s| s.parse().ok());
                let weight = fields.next().and_then(|s| s.parse().ok());
                let point_size = fields.next().and_then(|s| s.parse().ok());
                let family = fields.next();
                match (family, point_size, weight, italic, underline) {
                    (Some(family), Some(point_size), Some(weight), Some(italic), Some(underline)) => {
                        Ok(PropertyValue::Font(Font {
                            family: family.to_string(),
                            point_size,
                            weight,
                            italic,
                            underline,
                        }))
                    }
                    _ => Err(bad("expected family,size,weight,italic,underline")),
                }
            }
            PropertyKind::Pen => {
                let mut fields = text.splitn(3, ',');
                let color = fields.next().and_then(Color::from_hex);
                let width = fields.next().and_then(|s| s.parse().ok());
                let style = fields.next().and_then(PenStyle::from_str);
                match (color, width, style) {
                    (Some(color), Some(width), Some(style)) => {
                        Ok(PropertyValue::Pen(Pen::new(color, width, style)))
                    }
                    _ => Err(bad("expected color,width,style")),
                }
            }
            PropertyKind::Region => {
                let fields: Result<Vec<usize>, _> =
                    text.split(',').map(|s| s.parse()).collect();
                match fields.as_deref() {
                    Ok(&[sr, sc, er, ec]) => {
                        Ok(PropertyValue::Region(CellRegion::new(sr, sc, er, ec)))
                    }
                    _ => Err(bad("expected startRow,startCol,endRow,endCol")),
                }
            }
            PropertyKind::Point => {
                let fields: Result<Vec<i32>, _> = text.split(',').map(|s| s.parse()).collect();
                match fields.as_deref() {
                    Ok(&[x, y]) => Ok(PropertyValue::Point(Point::new(x, y))),
                    _ => Err(bad("expected x,y")),
                }
            }
            _ => Err(StyleError::NotSerializable(property)),
        }
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<f32> for PropertyValue {
    fn from(n: f32) -> Self {
        PropertyValue::Float(n)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<Color> for PropertyValue {
    fn from(c: Color) -> Self {
        PropertyValue::Color(c)
    }
}

impl From<Font> for PropertyValue {
    fn from(f: Font) -> Self {
        PropertyValue::Font(f)
    }
}

impl From<Pixmap> for PropertyValue {
    fn from(p: Pixmap) -> Self {
        PropertyValue::Pixmap(p)
    }
}

impl From<CursorIcon> for PropertyValue {
    fn from(c: CursorIcon) -> Self {
        PropertyValue::Cursor(c)
    }
}

impl From<Pen> for PropertyValue {
    fn from(p: Pen) -> Self {
        PropertyValue::Pen(p)
    }
}

impl From<CellRegion> for PropertyValue {
    fn from(r: CellRegion) -> Self {
        PropertyValue::Region(r)
    }
}

impl From<Point> for PropertyValue {
    fn from(p: Point) -> Self {
        PropertyValue::Point(p)
    }
}
