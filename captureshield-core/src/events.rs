//! Domain events
//!
//! Everything the presentation layer reacts to leaves the core as an
//! [`Event`]. Components queue events internally and hand them out through
//! `drain_events()`, in the order they happened.

use serde::Serialize;

use crate::access::{AccessState, Notification};
use crate::location::Position;
use crate::platform::CameraPermission;
use crate::shield::PositionOrigin;
use crate::zones::{Zone, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    ZoneAdded {
        zone: Zone,
    },
    ZoneRemoved {
        id: ZoneId,
    },
    PositionChanged {
        position: Position,
        origin: PositionOrigin,
    },
    AccessStateChanged {
        from: AccessState,
        to: AccessState,
    },
    CameraPermissionChanged {
        permission: CameraPermission,
    },
    CaptureStarted,
    /// `terminated` is set when the session was closed by entering a zone
    CaptureStopped {
        terminated: bool,
    },
    NotificationRequested {
        notification: Notification,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::NotificationKind;

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(Event::AccessStateChanged {
            from: AccessState::Unknown,
            to: AccessState::Blocked,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "accessStateChanged", "from": "unknown", "to": "blocked"})
        );

        let json = serde_json::to_value(Event::CaptureStarted).unwrap();
        assert_eq!(json, serde_json::json!({"type": "captureStarted"}));

        let json = serde_json::to_value(Event::NotificationRequested {
            notification: Notification::new(NotificationKind::CaptureTerminated),
        })
        .unwrap();
        assert_eq!(json["notification"]["title"], "Camera Disabled");
    }
}
