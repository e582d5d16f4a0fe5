//! CaptureShield Orchestrator
//!
//! [`CaptureShield`] owns one [`LocationSource`], one [`ZoneStore`] and one
//! [`AccessController`] and keeps them consistent: every accepted position and
//! every zone mutation is followed by a re-evaluation against the current zone
//! set, and all component events come out of a single ordered queue.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut shield = CaptureShield::new(gps, camera, storage, ShieldSettings::default());
//! shield.start(now_ms);
//!
//! shield.simulate_location(37.7848, -122.4289, now_ms)?;
//! assert_eq!(shield.status().access_state, AccessState::Blocked);
//! ```

use serde::{Deserialize, Serialize};

use crate::access::{
    AccessController, AccessState, CaptureError, Cooldown, Notification, NotificationKind,
    DEFAULT_COOLDOWN_MS,
};
use crate::events::Event;
use crate::geo::{self, InvalidCoordinate, LatLon};
use crate::location::{LocationSource, LocationUpdate, Position, WatchStatus};
use crate::platform::{
    CameraPermission, CameraProvider, LocationError, LocationProvider, SessionId, StorageError,
    ZoneStorage,
};
use crate::zones::{demo_zones, Zone, ZoneError, ZoneForm, ZoneId, ZoneStore};

/// What to do once the user has refused location access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeniedLocationPolicy {
    /// Keep the access state `Unknown` until a position arrives
    #[default]
    StayUnknown,
    /// Evaluate the fallback coordinate, as for a platform without location
    UseFallback,
}

/// Where the current position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionOrigin {
    Device,
    Simulated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShieldSettings {
    /// Minimum spacing of access-change notifications
    pub cooldown_ms: u64,
    /// Assumed position when the platform cannot supply one
    pub fallback_position: Option<LatLon>,
    pub denied_policy: DeniedLocationPolicy,
    /// Zones seeded into empty storage on first run
    pub default_zones: Vec<Zone>,
}

impl Default for ShieldSettings {
    fn default() -> Self {
        ShieldSettings {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            fallback_position: Some(LatLon::new(37.7749, -122.4191)),
            denied_policy: DeniedLocationPolicy::default(),
            default_zones: demo_zones(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestZone {
    pub id: ZoneId,
    pub name: String,
    pub distance_meters: f64,
}

/// Snapshot for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldStatus {
    pub access_state: AccessState,
    pub position: Option<Position>,
    pub position_origin: Option<PositionOrigin>,
    pub inside: bool,
    pub nearest: Option<NearestZone>,
    pub camera_permission: CameraPermission,
    pub capturing: bool,
    pub location_permission: Option<bool>,
    pub location_status: WatchStatus,
    pub zone_count: usize,
}

pub struct CaptureShield<L: LocationProvider, C: CameraProvider, S: ZoneStorage> {
    location: LocationSource<L>,
    zones: ZoneStore<S>,
    access: AccessController<C>,
    settings: ShieldSettings,
    position: Option<Position>,
    origin: Option<PositionOrigin>,
    /// Set after the "Location Access Denied" notice, cleared by a grant
    denied_notified: bool,
    events: Vec<Event>,
}

impl<L: LocationProvider, C: CameraProvider, S: ZoneStorage> CaptureShield<L, C, S> {
    pub fn new(location: L, camera: C, storage: S, settings: ShieldSettings) -> Self {
        CaptureShield {
            location: LocationSource::new(location),
            zones: ZoneStore::new(storage),
            access: AccessController::new(camera, Cooldown::new(settings.cooldown_ms)),
            settings,
            position: None,
            origin: None,
            denied_notified: false,
            events: Vec::new(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        self.zones.zones()
    }

    pub fn access_state(&self) -> AccessState {
        self.access.state()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Load the zones, start watching and take the first verdict.
    ///
    /// Storage that cannot be read or seeded leaves the default zones in
    /// memory. Watching starts either way.
    pub fn start(&mut self, now_ms: u64) {
        let defaults = self.settings.default_zones.clone();
        if let Err(e) = self.zones.load(defaults) {
            log::error!("Unable to persist default zones: {}", e);
        }
        self.collect();

        match self.location.start_watching() {
            Ok(()) => {
                if self.location.permission() == Some(false) {
                    self.location_denied(now_ms);
                }
            }
            Err(e) => self.location_error(e, now_ms),
        }

        self.access.sync_camera_permission();
        self.reevaluate(now_ms);
    }

    /// Process everything the platform queued since the last call
    pub fn poll(&mut self, now_ms: u64) {
        for update in self.location.poll() {
            match update {
                LocationUpdate::Fix(position) => {
                    self.apply_position(position, PositionOrigin::Device, now_ms)
                }
                LocationUpdate::Error(e) => self.location_error(e, now_ms),
            }
        }

        self.access.sync_camera_permission();
        self.collect();
    }

    pub fn add_zone(&mut self, form: &ZoneForm, now_ms: u64) -> Result<Zone, ZoneError> {
        let zone = self.zones.add(form, now_ms)?;
        self.collect();
        self.reevaluate(now_ms);
        Ok(zone)
    }

    pub fn remove_zone(&mut self, id: &ZoneId, now_ms: u64) -> Result<Option<Zone>, StorageError> {
        let removed = self.zones.remove(id)?;
        self.collect();
        self.reevaluate(now_ms);
        Ok(removed)
    }

    /// Override the position by hand until the next device fix
    pub fn simulate_location(
        &mut self,
        latitude: f64,
        longitude: f64,
        now_ms: u64,
    ) -> Result<(), InvalidCoordinate> {
        let coords = LatLon::checked(latitude, longitude)?;
        log::info!(
            "Simulating position {:.6},{:.6}",
            coords.latitude,
            coords.longitude
        );
        let position = Position::new(coords.latitude, coords.longitude, now_ms);
        self.apply_position(position, PositionOrigin::Simulated, now_ms);
        Ok(())
    }

    /// Ask the user for location access, and start watching on a grant
    pub fn request_location_permission(&mut self, now_ms: u64) -> Result<bool, LocationError> {
        let result = self.location.request_permission();
        match &result {
            Ok(true) => {
                self.denied_notified = false;
                self.notify(NotificationKind::LocationGranted);
                if !self.location.is_watching() {
                    if let Err(e) = self.location.start_watching() {
                        self.location_error(e, now_ms);
                    }
                }
            }
            Ok(false) => log::debug!("Location permission prompt dismissed"),
            Err(e) => self.location_error(e.clone(), now_ms),
        }
        result
    }

    pub fn request_camera_capability(&mut self, now_ms: u64) -> bool {
        let granted = self.access.request_camera_capability(now_ms);
        self.collect();
        granted
    }

    pub fn start_capture(&mut self, now_ms: u64) -> Result<SessionId, CaptureError> {
        let session = self.access.start_capture(now_ms);
        self.collect();
        session
    }

    pub fn stop_capture(&mut self, now_ms: u64) -> bool {
        let stopped = self.access.stop_capture(now_ms);
        self.collect();
        stopped
    }

    pub fn status(&self) -> ShieldStatus {
        let zones = self.zones.zones();
        let position = self.position.as_ref();

        ShieldStatus {
            access_state: self.access.state(),
            position: self.position,
            position_origin: self.origin,
            inside: geo::is_inside_any(position, zones),
            nearest: geo::nearest(position, zones).map(|n| NearestZone {
                id: n.zone.id.clone(),
                name: n.zone.name.clone(),
                distance_meters: n.distance_meters,
            }),
            camera_permission: self.access.camera_permission(),
            capturing: self.access.is_capturing(),
            location_permission: self.location.permission(),
            location_status: self.location.status(),
            zone_count: zones.len(),
        }
    }

    /// Events produced since the previous call, oldest first
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.collect();
        std::mem::take(&mut self.events)
    }

    /// Stop watching and release the camera
    pub fn shutdown(&mut self, now_ms: u64) {
        self.access.stop_capture(now_ms);
        self.location.stop();
        self.collect();
        log::debug!("Shield shut down");
    }

    fn apply_position(&mut self, position: Position, origin: PositionOrigin, now_ms: u64) {
        log::debug!(
            "Position {:.6},{:.6} ({:?})",
            position.latitude,
            position.longitude,
            origin
        );
        self.position = Some(position);
        self.origin = Some(origin);
        self.events.push(Event::PositionChanged { position, origin });
        self.reevaluate(now_ms);
    }

    fn reevaluate(&mut self, now_ms: u64) {
        self.access
            .evaluate(self.position.as_ref(), self.zones.zones(), now_ms);
        self.collect();
    }

    fn location_error(&mut self, e: LocationError, now_ms: u64) {
        match e {
            LocationError::PermissionDenied => self.location_denied(now_ms),
            LocationError::Unavailable => {
                if self.position.is_none() {
                    self.notify(NotificationKind::LocationUnavailable);
                }
                self.apply_fallback(now_ms);
            }
            // Transient: only worth telling the user before the first fix
            LocationError::PositionUnavailable(_) if self.position.is_none() => {
                self.notify(NotificationKind::LocationUnavailable)
            }
            LocationError::Timeout if self.position.is_none() => {
                self.notify(NotificationKind::LocationTimeout)
            }
            _ => {}
        }
    }

    fn location_denied(&mut self, now_ms: u64) {
        if !self.denied_notified {
            self.denied_notified = true;
            self.notify(NotificationKind::LocationDenied);
        }
        if self.settings.denied_policy == DeniedLocationPolicy::UseFallback {
            self.apply_fallback(now_ms);
        }
    }

    fn apply_fallback(&mut self, now_ms: u64) {
        if self.position.is_some() {
            return;
        }
        if let Some(fallback) = self.settings.fallback_position {
            log::info!(
                "Using fallback position {:.6},{:.6}",
                fallback.latitude,
                fallback.longitude
            );
            let position = Position::new(fallback.latitude, fallback.longitude, now_ms);
            self.apply_position(position, PositionOrigin::Fallback, now_ms);
        }
    }

    fn notify(&mut self, kind: NotificationKind) {
        self.events.push(Event::NotificationRequested {
            notification: Notification::new(kind),
        });
    }

    /// Move component events into the shared queue
    fn collect(&mut self) {
        self.events.extend(self.zones.drain_events());
        self.events.extend(self.access.drain_events());
    }
}
