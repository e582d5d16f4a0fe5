use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::notification::{Cooldown, Notification, NotificationKind};
use crate::events::Event;
use crate::geo;
use crate::location::Position;
use crate::platform::{CameraError, CameraPermission, CameraProvider, SessionId};
use crate::zones::Zone;

/// Verdict on whether camera capture may proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessState {
    /// No position evaluated yet
    #[default]
    Unknown,
    Allowed,
    Blocked,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Camera access is blocked inside a restricted zone")]
    Blocked,
    #[error("Camera permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Camera gating state machine
pub struct AccessController<C: CameraProvider> {
    camera: C,
    state: AccessState,
    camera_permission: CameraPermission,
    session: Option<SessionId>,
    cooldown: Cooldown,
    events: Vec<Event>,
}

impl<C: CameraProvider> AccessController<C> {
    pub fn new(camera: C, cooldown: Cooldown) -> Self {
        AccessController {
            camera,
            state: AccessState::Unknown,
            camera_permission: CameraPermission::Unknown,
            session: None,
            cooldown,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn camera_permission(&self) -> CameraPermission {
        self.camera_permission
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Re-evaluate access for a position against the current zone set.
    ///
    /// Without a position the state is left as it is.
    pub fn evaluate(
        &mut self,
        position: Option<&Position>,
        zones: &[Zone],
        now_ms: u64,
    ) -> AccessState {
        let Some(position) = position else {
            return self.state;
        };

        let next = if geo::is_inside_any(Some(position), zones) {
            AccessState::Blocked
        } else {
            AccessState::Allowed
        };
        if next == self.state {
            return self.state;
        }

        if next == AccessState::Blocked {
            self.terminate_capture();
        }

        let from = self.state;
        self.state = next;
        log::info!("Access {:?} -> {:?}", from, next);
        self.events.push(Event::AccessStateChanged { from, to: next });

        let kind = match next {
            AccessState::Blocked => NotificationKind::EnteredZone,
            _ => NotificationKind::LeftZone,
        };
        self.notify(kind, now_ms);

        self.state
    }

    /// Ask for the camera permission, failing closed while blocked.
    ///
    /// While `Blocked` nothing is asked and the recorded permission is left
    /// untouched. Failed requests are recorded as `Denied`.
    pub fn request_camera_capability(&mut self, now_ms: u64) -> bool {
        if self.state == AccessState::Blocked {
            log::info!("Camera capability refused inside a restricted zone");
            return false;
        }
        self.check_camera(now_ms).is_ok()
    }

    /// Pick up permission changes made outside the application
    pub fn sync_camera_permission(&mut self) {
        let permission = self.camera.permission_state();
        if permission != CameraPermission::Unknown {
            self.record_permission(permission);
        }
    }

    /// Open a capture session, reusing one that is already open
    pub fn start_capture(&mut self, now_ms: u64) -> Result<SessionId, CaptureError> {
        if self.state == AccessState::Blocked {
            self.notify(NotificationKind::CaptureRefused, now_ms);
            return Err(CaptureError::Blocked);
        }
        if let Some(session) = self.session {
            return Ok(session);
        }
        if self.camera_permission != CameraPermission::Granted {
            self.check_camera(now_ms)?;
        }

        match self.camera.open_session() {
            Ok(session) => {
                log::info!("Capture session {:?} started", session);
                self.session = Some(session);
                self.events.push(Event::CaptureStarted);
                self.notify(NotificationKind::CaptureStarted, now_ms);
                Ok(session)
            }
            Err(e) => {
                log::warn!("Unable to open capture session: {}", e);
                if e == CameraError::PermissionDenied {
                    self.record_permission(CameraPermission::Denied);
                }
                self.notify(NotificationKind::CaptureFailed, now_ms);
                Err(e.into())
            }
        }
    }

    /// Close the capture session. Idempotent; returns whether one was open.
    pub fn stop_capture(&mut self, now_ms: u64) -> bool {
        match self.session.take() {
            Some(session) => {
                self.camera.close_session(session);
                log::info!("Capture session {:?} stopped", session);
                self.events.push(Event::CaptureStopped { terminated: false });
                self.notify(NotificationKind::CaptureStopped, now_ms);
                true
            }
            None => false,
        }
    }

    /// Events produced since the previous call
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn terminate_capture(&mut self) {
        if let Some(session) = self.session.take() {
            self.camera.close_session(session);
            log::warn!("Capture session {:?} terminated: entered a restricted zone", session);
            self.events.push(Event::CaptureStopped { terminated: true });
            self.events.push(Event::NotificationRequested {
                notification: Notification::new(NotificationKind::CaptureTerminated),
            });
        }
    }

    fn check_camera(&mut self, now_ms: u64) -> Result<(), CaptureError> {
        if !self.camera.is_supported() {
            self.record_permission(CameraPermission::Denied);
            self.notify(NotificationKind::CameraUnsupported, now_ms);
            return Err(CameraError::Unsupported.into());
        }

        match self.camera.request_permission() {
            Ok(true) => {
                self.record_permission(CameraPermission::Granted);
                self.notify(NotificationKind::CameraGranted, now_ms);
                Ok(())
            }
            Ok(false) | Err(CameraError::PermissionDenied) => {
                self.record_permission(CameraPermission::Denied);
                self.notify(NotificationKind::CameraDenied, now_ms);
                Err(CaptureError::PermissionDenied)
            }
            Err(e) => {
                log::warn!("Camera permission request failed: {}", e);
                self.record_permission(CameraPermission::Denied);
                self.notify(NotificationKind::CameraDenied, now_ms);
                Err(e.into())
            }
        }
    }

    fn record_permission(&mut self, permission: CameraPermission) {
        if self.camera_permission != permission {
            log::debug!(
                "Camera permission {:?} -> {:?}",
                self.camera_permission,
                permission
            );
            self.camera_permission = permission;
            self.events.push(Event::CameraPermissionChanged { permission });
        }
    }

    fn notify(&mut self, kind: NotificationKind, now_ms: u64) {
        if kind.is_rate_limited() && !self.cooldown.try_fire(now_ms) {
            log::debug!(
                "Suppressed {:?} notification, last one at {:?}",
                kind,
                self.cooldown.last_fired()
            );
            return;
        }
        self.events.push(Event::NotificationRequested {
            notification: Notification::new(kind),
        });
    }
}
