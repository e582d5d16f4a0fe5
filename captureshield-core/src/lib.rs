//! CaptureShield Core
//!
//! Platform-independent geofence evaluation and camera access gating.
//!
//! The core never touches sockets, files or devices itself. Everything the
//! host platform provides (positions, camera grants, durable storage) comes in
//! through the traits in [`platform`], and everything the presentation layer
//! needs to know goes out as [`Event`]s.
//!
//! # Modules
//!
//! - **geo**: haversine distance, containment and nearest-zone queries
//! - **zones**: zone definitions and the persisted [`ZoneStore`]
//! - **location**: the [`LocationSource`] wrapping a platform position feed
//! - **access**: the [`AccessController`] state machine and notification cooldown
//! - **shield**: [`CaptureShield`], which wires the pieces together
//!
//! # Example
//!
//! ```rust,ignore
//! use captureshield_core::{CaptureShield, ShieldSettings};
//!
//! let mut shield = CaptureShield::new(location, camera, storage, ShieldSettings::default());
//! shield.start(now_ms);
//!
//! // In your main loop:
//! shield.poll(now_ms);
//! for event in shield.drain_events() {
//!     dispatch(event);
//! }
//! ```

pub mod access;
pub mod events;
pub mod geo;
pub mod location;
pub mod platform;
pub mod shield;
pub mod zones;

#[cfg(test)]
pub(crate) mod mock;

pub use access::{
    AccessController, AccessState, CaptureError, Cooldown, Notification, NotificationKind,
    Severity, DEFAULT_COOLDOWN_MS,
};
pub use events::Event;
pub use geo::{InvalidCoordinate, LatLon, Nearest, EARTH_RADIUS_METERS};
pub use location::{LocationSource, LocationUpdate, Position, WatchStatus};
pub use platform::{
    CameraError, CameraPermission, CameraProvider, LocationError, LocationProvider,
    PermissionState, SessionId, StorageError, WatchId, ZoneStorage,
};
pub use shield::{
    CaptureShield, DeniedLocationPolicy, NearestZone, PositionOrigin, ShieldSettings, ShieldStatus,
};
pub use zones::{
    demo_zones, FormValue, InvalidZoneError, Zone, ZoneError, ZoneForm, ZoneId, ZoneStore,
};
