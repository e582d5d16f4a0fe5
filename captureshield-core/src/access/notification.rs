use serde::{Deserialize, Serialize};

/// Minimum spacing between access-change notifications
pub const DEFAULT_COOLDOWN_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    /// Access became Blocked (rate-limited)
    EnteredZone,
    /// Access became Allowed (rate-limited)
    LeftZone,
    /// An open capture session was closed on entering a zone
    CaptureTerminated,
    /// Capture was requested while blocked
    CaptureRefused,
    CaptureStarted,
    CaptureStopped,
    CaptureFailed,
    CameraGranted,
    CameraDenied,
    CameraUnsupported,
    LocationGranted,
    LocationDenied,
    LocationUnavailable,
    LocationTimeout,
}

impl NotificationKind {
    /// Access-change notifications share the process-wide cooldown
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, NotificationKind::EnteredZone | NotificationKind::LeftZone)
    }
}

/// A message for the presentation layer's notification sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(kind: NotificationKind) -> Self {
        use NotificationKind::*;
        use Severity::*;

        let (title, body, severity) = match kind {
            EnteredZone => (
                "Restricted Area",
                "You are in a camera-restricted zone. Camera access disabled.",
                Error,
            ),
            LeftZone => ("Outside Restricted Zone", "Camera access enabled.", Info),
            CaptureTerminated => (
                "Camera Disabled",
                "You entered a restricted zone. Camera access has been disabled.",
                Error,
            ),
            CaptureRefused => (
                "Camera Access Denied",
                "You are in a restricted zone. Camera access is not allowed here.",
                Error,
            ),
            CaptureStarted => (
                "Camera Active",
                "Camera is now streaming. Stop it when done.",
                Info,
            ),
            CaptureStopped => ("Camera Stopped", "Camera stream has been stopped", Info),
            CaptureFailed => (
                "Camera Error",
                "Failed to access camera. Please check your permissions.",
                Error,
            ),
            CameraGranted => (
                "Camera Access Granted",
                "Camera permissions have been granted successfully",
                Info,
            ),
            CameraDenied => (
                "Camera Access Denied",
                "Camera permission was denied. Some features will be limited.",
                Error,
            ),
            CameraUnsupported => (
                "Camera Unsupported",
                "Camera API is not supported on this device",
                Error,
            ),
            LocationGranted => (
                "Location Access Granted",
                "Your device location will now be used for geofencing.",
                Info,
            ),
            LocationDenied => (
                "Location Access Denied",
                "Please enable location services to use all features of the app.",
                Error,
            ),
            LocationUnavailable => (
                "Location Unavailable",
                "Location information is unavailable.",
                Error,
            ),
            LocationTimeout => ("Location Timeout", "Location request timed out.", Error),
        };

        Notification {
            kind,
            title: title.to_string(),
            body: body.to_string(),
            severity,
        }
    }
}

/// Single process-wide "last alert" timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooldown {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl Cooldown {
    pub fn new(interval_ms: u64) -> Self {
        Cooldown {
            interval_ms,
            last_ms: None,
        }
    }

    pub fn last_fired(&self) -> Option<u64> {
        self.last_ms
    }

    pub fn is_ready(&self, now_ms: u64) -> bool {
        match self.last_ms {
            // A clock that went backwards reads as "just fired"
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    /// Claim the slot if the interval has elapsed
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        if self.is_ready(now_ms) {
            self.last_ms = Some(now_ms);
            true
        } else {
            false
        }
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Cooldown::new(DEFAULT_COOLDOWN_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_first_fire_is_free() {
        let mut cooldown = Cooldown::default();
        assert!(cooldown.try_fire(0));
        assert_eq!(cooldown.last_fired(), Some(0));
    }

    #[test]
    fn test_cooldown_window() {
        let mut cooldown = Cooldown::new(60_000);
        assert!(cooldown.try_fire(1_000));
        assert!(!cooldown.try_fire(30_000));
        assert!(!cooldown.try_fire(60_999));
        // Exactly one interval later counts as elapsed
        assert!(cooldown.try_fire(61_000));
        assert_eq!(cooldown.last_fired(), Some(61_000));
    }

    #[test]
    fn test_cooldown_suppressed_attempt_does_not_extend_window() {
        let mut cooldown = Cooldown::new(60_000);
        assert!(cooldown.try_fire(0));
        assert!(!cooldown.try_fire(59_000));
        assert!(cooldown.try_fire(60_000));
    }

    #[test]
    fn test_cooldown_clock_going_backwards() {
        let mut cooldown = Cooldown::new(60_000);
        assert!(cooldown.try_fire(100_000));
        assert!(!cooldown.try_fire(10_000));
    }

    #[test]
    fn test_only_access_changes_are_rate_limited() {
        assert!(NotificationKind::EnteredZone.is_rate_limited());
        assert!(NotificationKind::LeftZone.is_rate_limited());
        assert!(!NotificationKind::CaptureTerminated.is_rate_limited());
        assert!(!NotificationKind::LocationDenied.is_rate_limited());
    }

    #[test]
    fn test_notification_texts() {
        let n = Notification::new(NotificationKind::EnteredZone);
        assert_eq!(n.title, "Restricted Area");
        assert_eq!(n.severity, Severity::Error);

        let n = Notification::new(NotificationKind::LeftZone);
        assert_eq!(n.title, "Outside Restricted Zone");
        assert_eq!(n.severity, Severity::Info);

        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "leftZone");
        assert_eq!(json["severity"], "info");
    }
}
