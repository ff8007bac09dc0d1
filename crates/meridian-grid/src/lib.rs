//! Attribute cascade and cell-span engine for the Meridian table widget.
//!
//! This crate is the styling and merged-cell core of a spreadsheet-style
//! table: it answers "what does cell (r, c) look like" and "which cells
//! render as one", and keeps both answers consistent under row/column
//! insertion, deletion, reordering and hiding.
//!
//! # The two coordinate spaces
//!
//! Everything here speaks two index languages. *Model* indices are tied to
//! the underlying data order and survive on-screen reordering; *visual*
//! indices are tied to what is on screen right now. Translation between
//! them (and hidden-line knowledge) belongs to the table's sorter and is
//! consumed through the [`CoordinateSpace`] trait, never owned here.
//!
//! # Components
//!
//! - [`AttributeCascade`]: per-cell/row/column/repeating/default property
//!   records and the precedence search across them
//! - [`SpanIndex`]: the non-overlapping merged-cell regions of one grid
//! - [`PropertyStore`]: the slot-array primitive both are built on
//!
//! # Example
//!
//! ```
//! use meridian_grid::style::{AttributeCascade, CellProperty};
//! use meridian_grid::paint::Color;
//!
//! let cascade = AttributeCascade::new();
//!
//! // Stripe every other row, then override one cell.
//! cascade
//!     .set_repeating_row_property(0, 2, CellProperty::Background, Color::LIGHT_GRAY.into())
//!     .unwrap();
//! cascade
//!     .set_cell_property(4, 2, false, CellProperty::Background, Color::WHITE.into())
//!     .unwrap();
//!
//! let effective = cascade.cell_property(4, 2, CellProperty::Background, Some((4, 2)));
//! assert_eq!(effective.and_then(|v| v.as_color()), Some(Color::WHITE));
//! ```
//!
//! # Threading
//!
//! The engine is synchronous and cooperative with a single UI thread:
//! every call completes before returning and notifications run inline.
//! Types are still `Send + Sync` so the cascade can be shared with views.

mod batch;
pub mod coords;
pub mod error;
pub mod geometry;
pub mod paint;
pub mod span;
pub mod style;

pub use batch::BatchGuard;
pub use coords::{CoordinateSpace, DirectCoordinates};
pub use error::{SpanError, StyleError};
pub use geometry::{CellRegion, LAST_COLUMN, LAST_ROW};
pub use span::{Span, SpanHit, SpanIndex, SpanSignals};
pub use style::{
    AttributeCascade, AttributeController, CellProperty, CellRenderer, EditValidator, GridProperty,
    PasteGuard, PropertyId, PropertyKind, PropertyStore, PropertyValue, RecordScope,
    RepeatingStyle, StyleSignals, ValueFormatter,
};
