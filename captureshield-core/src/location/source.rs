use serde::{Deserialize, Serialize};

use super::position::{LocationUpdate, Position};
use crate::platform::{LocationError, LocationProvider, PermissionState, WatchId};

/// Watch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStatus {
    /// Not watching
    Idle,
    /// Receiving updates
    Watching,
    /// The platform has no location support; this state is permanent
    Unavailable,
}

/// Ordered position stream over a [`LocationProvider`]
pub struct LocationSource<P: LocationProvider> {
    provider: P,
    watch: Option<WatchId>,
    status: WatchStatus,
    /// `None` until the platform or the user has answered
    permission: Option<bool>,
    latest: Option<Position>,
}

impl<P: LocationProvider> LocationSource<P> {
    pub fn new(provider: P) -> Self {
        LocationSource {
            provider,
            watch: None,
            status: WatchStatus::Idle,
            permission: None,
            latest: None,
        }
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    pub fn permission(&self) -> Option<bool> {
        self.permission
    }

    /// Most recent accepted fix
    pub fn latest(&self) -> Option<&Position> {
        self.latest.as_ref()
    }

    /// Begin continuous reporting.
    ///
    /// Returns `Err(LocationError::Unavailable)`, and latches that state,
    /// when the platform has no location support. Calling it while already
    /// watching is a no-op.
    pub fn start_watching(&mut self) -> Result<(), LocationError> {
        if self.status == WatchStatus::Unavailable {
            return Err(LocationError::Unavailable);
        }
        if self.watch.is_some() {
            return Ok(());
        }
        if !self.provider.is_supported() {
            log::warn!("Location is not supported on this platform");
            self.status = WatchStatus::Unavailable;
            return Err(LocationError::Unavailable);
        }

        // A grant obtained through request_permission() stays in force
        if self.permission != Some(true) {
            self.permission = match self.provider.permission_state() {
                PermissionState::Granted => Some(true),
                PermissionState::Denied => Some(false),
                PermissionState::Prompt => None,
            };
        }

        match self.provider.watch_start() {
            Ok(watch) => {
                log::debug!("Location watch {:?} started", watch);
                self.watch = Some(watch);
                self.status = WatchStatus::Watching;
                Ok(())
            }
            Err(e) => {
                log::warn!("Unable to start location watch: {}", e);
                self.note_error(&e);
                Err(e)
            }
        }
    }

    /// Drain everything the provider has queued, in arrival order.
    ///
    /// Fixes older than the latest accepted one are dropped. Nothing is
    /// returned when not watching.
    pub fn poll(&mut self) -> Vec<LocationUpdate> {
        let mut updates = Vec::new();

        while let Some(watch) = self.watch {
            let Some(sample) = self.provider.watch_poll(&watch) else {
                break;
            };
            match sample {
                Ok(position) => {
                    if let Some(latest) = &self.latest {
                        if position.timestamp < latest.timestamp {
                            log::debug!(
                                "Dropping stale fix from {} (latest is {})",
                                position.timestamp,
                                latest.timestamp
                            );
                            continue;
                        }
                    }
                    self.permission = Some(true);
                    self.latest = Some(position);
                    updates.push(LocationUpdate::Fix(position));
                }
                Err(e) => {
                    log::warn!("Location error: {}", e);
                    self.note_error(&e);
                    updates.push(LocationUpdate::Error(e));
                }
            }
        }

        updates
    }

    /// Unregister the watch. Idempotent.
    pub fn stop(&mut self) {
        if let Some(watch) = self.watch.take() {
            self.provider.watch_stop(watch);
            log::debug!("Location watch {:?} stopped", watch);
        }
        if self.status == WatchStatus::Watching {
            self.status = WatchStatus::Idle;
        }
    }

    /// Ask the platform for a location grant.
    ///
    /// `Ok(true)` on a grant, `Ok(false)` when the prompt was dismissed
    /// without an answer, `Err` when unsupported or denied.
    pub fn request_permission(&mut self) -> Result<bool, LocationError> {
        if !self.provider.is_supported() {
            self.status = WatchStatus::Unavailable;
            return Err(LocationError::Unavailable);
        }

        match self.provider.request_permission() {
            Ok(PermissionState::Granted) => {
                log::info!("Location permission granted");
                self.permission = Some(true);
                Ok(true)
            }
            Ok(PermissionState::Denied) => {
                self.permission = Some(false);
                Err(LocationError::PermissionDenied)
            }
            Ok(PermissionState::Prompt) => Ok(false),
            Err(e) => {
                self.note_error(&e);
                Err(e)
            }
        }
    }

    fn note_error(&mut self, e: &LocationError) {
        match e {
            LocationError::PermissionDenied => self.permission = Some(false),
            LocationError::Unavailable => {
                if let Some(watch) = self.watch.take() {
                    self.provider.watch_stop(watch);
                }
                self.status = WatchStatus::Unavailable;
            }
            _ => {}
        }
    }
}
