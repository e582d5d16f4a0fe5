//! Platform abstraction
//!
//! The core is driven by the host through three capabilities, each a small
//! poll-style trait with no async and no platform types in its signature:
//!
//! - [`LocationProvider`]: query/request location permission and watch positions
//! - [`CameraProvider`]: query/request camera permission and acquire/release a
//!   capture session
//! - [`ZoneStorage`]: read and write the serialized zone list
//!
//! A native server backs these with sockets, device nodes and files; tests
//! back them with in-memory fakes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::Position;

/// Answer of the platform's location permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not decided yet
    Prompt,
}

/// Handle of an active position watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u32);

/// Handle of an open capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

/// Location failures reported by the platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The platform cannot supply a location at all
    #[error("Location is not supported on this platform")]
    Unavailable,
    #[error("Location permission denied")]
    PermissionDenied,
    /// A transient failure; the watch keeps running
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("Location request timed out")]
    Timeout,
}

/// Continuous position source
pub trait LocationProvider {
    /// False when the platform has no location capability whatsoever
    fn is_supported(&self) -> bool;

    fn permission_state(&mut self) -> PermissionState;

    /// Ask the user for a grant.
    ///
    /// Returns the resulting state; `Err` when the platform refuses to ask.
    fn request_permission(&mut self) -> Result<PermissionState, LocationError>;

    fn watch_start(&mut self) -> Result<WatchId, LocationError>;

    /// Next pending sample for the watch, or `None` when nothing is queued
    fn watch_poll(&mut self, watch: &WatchId) -> Option<Result<Position, LocationError>>;

    /// Unregister the watch. No sample may be returned for it afterwards.
    fn watch_stop(&mut self, watch: WatchId);
}

/// Ternary camera permission as recorded by the access controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPermission {
    #[default]
    Unknown,
    Granted,
    Denied,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera API is not supported")]
    Unsupported,
    #[error("Camera permission denied")]
    PermissionDenied,
    #[error("Camera device error: {0}")]
    Device(String),
}

/// Camera permission and capture primitive
pub trait CameraProvider {
    fn is_supported(&self) -> bool;

    /// Current grant; `Unknown` when the platform cannot tell without asking
    fn permission_state(&mut self) -> CameraPermission;

    /// Ask for a grant. `Ok(false)` means the user declined.
    fn request_permission(&mut self) -> Result<bool, CameraError>;

    fn open_session(&mut self) -> Result<SessionId, CameraError>;

    /// Release the session. Unknown handles are ignored.
    fn close_session(&mut self, session: SessionId);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(String),
    #[error("Cannot encode zone list: {0}")]
    Encode(String),
}

/// Durable storage for the serialized zone list
pub trait ZoneStorage {
    /// Stored document, or `None` when nothing was ever written
    fn read(&mut self) -> Result<Option<String>, StorageError>;

    /// Replace the stored document. Must be durable when it returns `Ok`.
    fn write(&mut self, contents: &str) -> Result<(), StorageError>;
}
