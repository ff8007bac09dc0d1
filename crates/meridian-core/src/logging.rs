//! Logging facilities for Meridian.
//!
//! Meridian uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! The constants in [`targets`] can be used with `tracing` filter
//! directives to narrow logs to a single subsystem, e.g.
//! `RUST_LOG=meridian_grid::style=trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "meridian_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "meridian_core::signal";
    /// Attribute cascade target.
    pub const STYLE: &str = "meridian_grid::style";
    /// Span index target.
    pub const SPAN: &str = "meridian_grid::span";
}
