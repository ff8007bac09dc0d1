//! Error types for the grid engine.

use crate::style::PropertyKind;

/// Errors that can occur when storing or restoring style properties.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    /// A value of the wrong kind was supplied for a property.
    #[error("property '{property}' expects {expected:?} values, got {got:?}")]
    KindMismatch {
        property: &'static str,
        expected: PropertyKind,
        got: PropertyKind,
    },

    /// A serialized entry named a property that does not exist.
    #[error("unknown property name '{0}'")]
    UnknownProperty(String),

    /// A serialized entry could not be parsed back into a value.
    #[error("invalid value '{value}' for property '{property}': {message}")]
    InvalidValue {
        property: &'static str,
        value: String,
        message: String,
    },

    /// The property's kind has no textual representation.
    #[error("property '{0}' cannot be restored from text")]
    NotSerializable(&'static str),
}

impl StyleError {
    /// Create an invalid-value error.
    pub fn invalid_value(
        property: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            property,
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by the span index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpanError {
    /// A span must cover more than one cell.
    #[error("a span must cover more than one cell")]
    Degenerate,

    /// The new span's rectangle intersects an existing span.
    #[error("span anchored at ({row}, {col}) overlaps an existing span")]
    Overlap { row: usize, col: usize },
}
