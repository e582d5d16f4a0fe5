//! Camera backed by a capture device node.
//!
//! The operating system's file permissions are the camera permission: a
//! device that can be opened for reading is granted. The node is only opened
//! on an explicit request or a capture, since opening it can power up the
//! sensor; polling the permission reports the last answer. A capture session
//! is an open handle on the node and ends when the handle is dropped.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use captureshield_core::{CameraError, CameraPermission, CameraProvider, SessionId};

pub struct DeviceCamera {
    path: PathBuf,
    /// Outcome of the most recent open attempt
    permission: CameraPermission,
    sessions: HashMap<SessionId, File>,
    next_session: u32,
}

impl DeviceCamera {
    pub fn new(path: &Path) -> Self {
        DeviceCamera {
            path: path.to_path_buf(),
            permission: CameraPermission::Unknown,
            sessions: HashMap::new(),
            next_session: 1,
        }
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn open(&mut self) -> Result<File, CameraError> {
        let opened = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => CameraError::PermissionDenied,
                ErrorKind::NotFound => CameraError::Unsupported,
                _ => CameraError::Device(format!("{}: {}", self.path.display(), e)),
            });
        self.permission = match &opened {
            Ok(_) => CameraPermission::Granted,
            Err(CameraError::PermissionDenied) => CameraPermission::Denied,
            Err(_) => CameraPermission::Unknown,
        };
        opened
    }
}

impl CameraProvider for DeviceCamera {
    fn is_supported(&self) -> bool {
        self.path.exists()
    }

    fn permission_state(&mut self) -> CameraPermission {
        if !self.path.exists() {
            self.permission = CameraPermission::Unknown;
        }
        self.permission
    }

    fn request_permission(&mut self) -> Result<bool, CameraError> {
        match self.open() {
            Ok(_) => Ok(true),
            Err(CameraError::PermissionDenied) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn open_session(&mut self) -> Result<SessionId, CameraError> {
        let file = self.open()?;
        let session = SessionId(self.next_session);
        self.next_session += 1;
        self.sessions.insert(session, file);
        log::debug!("Opened {} as session {}", self.path.display(), session.0);
        Ok(session)
    }

    fn close_session(&mut self, session: SessionId) {
        if self.sessions.remove(&session).is_some() {
            log::debug!("Closed session {}", session.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = DeviceCamera::new(&dir.path().join("video0"));

        assert!(!camera.is_supported());
        assert_eq!(camera.permission_state(), CameraPermission::Unknown);
        assert_eq!(camera.request_permission(), Err(CameraError::Unsupported));
        assert_eq!(camera.open_session(), Err(CameraError::Unsupported));
    }

    #[test]
    fn test_readable_device_sessions() {
        let device = tempfile::NamedTempFile::new().unwrap();
        let mut camera = DeviceCamera::new(device.path());

        assert!(camera.is_supported());
        assert_eq!(camera.request_permission(), Ok(true));
        assert_eq!(camera.permission_state(), CameraPermission::Granted);

        let a = camera.open_session().unwrap();
        let b = camera.open_session().unwrap();
        assert_ne!(a, b);
        assert_eq!(camera.open_sessions(), 2);

        camera.close_session(a);
        camera.close_session(a);
        assert_eq!(camera.open_sessions(), 1);
    }

    #[test]
    fn test_permission_state_does_not_open_the_device() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("video0");
        std::fs::write(&device, b"").unwrap();
        let mut camera = DeviceCamera::new(&device);

        // Nothing asked yet, so nothing is known
        assert_eq!(camera.permission_state(), CameraPermission::Unknown);

        camera.open_session().unwrap();
        assert_eq!(camera.permission_state(), CameraPermission::Granted);

        std::fs::remove_file(&device).unwrap();
        assert_eq!(camera.permission_state(), CameraPermission::Unknown);
        assert!(!camera.is_supported());
    }
}
