//! Device Location
//!
//! Wraps the platform's continuous position feed. The [`LocationSource`]
//! turns the poll-based [`LocationProvider`](crate::platform::LocationProvider)
//! into an ordered stream of [`LocationUpdate`]s, remembers the permission
//! outcome, and latches a permanent `Unavailable` state on platforms without
//! any location support so callers know to fall back to a default position.
//!
//! # Example
//!
//! ```rust,ignore
//! use captureshield_core::location::{LocationSource, LocationUpdate};
//!
//! let mut source = LocationSource::new(provider);
//! if source.start_watching().is_err() {
//!     // degraded mode: use a configured default position
//! }
//!
//! for update in source.poll() {
//!     match update {
//!         LocationUpdate::Fix(position) => evaluate(position),
//!         LocationUpdate::Error(e) => log::warn!("{}", e),
//!     }
//! }
//!
//! source.stop();
//! ```

mod position;
mod source;

pub use position::*;
pub use source::*;
