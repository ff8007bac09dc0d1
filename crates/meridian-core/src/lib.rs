//! Core systems for the Meridian widget toolkit.
//!
//! This crate provides the foundation the table widget is built on:
//!
//! - [`Signal`]: a type-safe, Qt-inspired signal/slot mechanism used for
//!   change notification between the engine and its views
//! - [`logging`]: `tracing` targets for per-subsystem log filtering
//!
//! # Signals
//!
//! Signals are emitted by engine objects when their state changes, and
//! connected slots (callbacks) are invoked synchronously in response:
//!
//! ```
//! use meridian_core::Signal;
//!
//! let changed = Signal::<String>::new();
//! let id = changed.connect(|text| {
//!     println!("changed to: {text}");
//! });
//! changed.emit("hello".to_string());
//! changed.disconnect(id);
//! ```

pub mod logging;
mod signal;

pub use signal::{ConnectionGuard, ConnectionId, Signal};
