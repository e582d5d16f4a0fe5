//! In-memory platform fakes for unit tests.
//!
//! Each fake is a cheap handle around shared state, so a test can keep a
//! clone and inspect or feed the provider after moving it into the core.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::location::Position;
use crate::platform::*;

#[derive(Default)]
pub struct StorageState {
    pub document: Option<String>,
    pub writes: usize,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStorage(pub Rc<RefCell<StorageState>>);

impl MemoryStorage {
    pub fn with_document(document: &str) -> Self {
        let storage = MemoryStorage::default();
        storage.0.borrow_mut().document = Some(document.to_string());
        storage
    }

    pub fn document(&self) -> Option<String> {
        self.0.borrow().document.clone()
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes
    }
}

impl ZoneStorage for MemoryStorage {
    fn read(&mut self) -> Result<Option<String>, StorageError> {
        let state = self.0.borrow();
        if state.fail_reads {
            return Err(StorageError::Io("read refused".to_string()));
        }
        Ok(state.document.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        let mut state = self.0.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::Io("disk full".to_string()));
        }
        state.document = Some(contents.to_string());
        state.writes += 1;
        Ok(())
    }
}

pub struct LocationState {
    pub supported: bool,
    pub permission: PermissionState,
    pub request_result: Result<PermissionState, LocationError>,
    pub queue: VecDeque<Result<Position, LocationError>>,
    pub watch: Option<WatchId>,
    pub next_watch: u32,
    pub stops: usize,
}

impl Default for LocationState {
    fn default() -> Self {
        LocationState {
            supported: true,
            permission: PermissionState::Prompt,
            request_result: Ok(PermissionState::Granted),
            queue: VecDeque::new(),
            watch: None,
            next_watch: 1,
            stops: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeLocation(pub Rc<RefCell<LocationState>>);

impl FakeLocation {
    pub fn unsupported() -> Self {
        let fake = FakeLocation::default();
        fake.0.borrow_mut().supported = false;
        fake
    }

    pub fn push_fix(&self, latitude: f64, longitude: f64, timestamp: u64) {
        self.0
            .borrow_mut()
            .queue
            .push_back(Ok(Position::new(latitude, longitude, timestamp)));
    }

    pub fn push_error(&self, error: LocationError) {
        self.0.borrow_mut().queue.push_back(Err(error));
    }

    pub fn is_watching(&self) -> bool {
        self.0.borrow().watch.is_some()
    }
}

impl LocationProvider for FakeLocation {
    fn is_supported(&self) -> bool {
        self.0.borrow().supported
    }

    fn permission_state(&mut self) -> PermissionState {
        self.0.borrow().permission
    }

    fn request_permission(&mut self) -> Result<PermissionState, LocationError> {
        let mut state = self.0.borrow_mut();
        let result = state.request_result.clone();
        if let Ok(granted) = result {
            state.permission = granted;
        }
        result
    }

    fn watch_start(&mut self) -> Result<WatchId, LocationError> {
        let mut state = self.0.borrow_mut();
        if !state.supported {
            return Err(LocationError::Unavailable);
        }
        let id = WatchId(state.next_watch);
        state.next_watch += 1;
        state.watch = Some(id);
        Ok(id)
    }

    fn watch_poll(&mut self, watch: &WatchId) -> Option<Result<Position, LocationError>> {
        let mut state = self.0.borrow_mut();
        if state.watch != Some(*watch) {
            return None;
        }
        state.queue.pop_front()
    }

    fn watch_stop(&mut self, watch: WatchId) {
        let mut state = self.0.borrow_mut();
        if state.watch == Some(watch) {
            state.watch = None;
            state.stops += 1;
        }
    }
}

pub struct CameraState {
    pub supported: bool,
    pub permission: CameraPermission,
    pub grant: Result<bool, CameraError>,
    pub open_fails: bool,
    pub open: Vec<SessionId>,
    pub next_session: u32,
    pub permission_requests: usize,
    pub closes: usize,
}

impl Default for CameraState {
    fn default() -> Self {
        CameraState {
            supported: true,
            permission: CameraPermission::Unknown,
            grant: Ok(true),
            open_fails: false,
            open: Vec::new(),
            next_session: 1,
            permission_requests: 0,
            closes: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeCamera(pub Rc<RefCell<CameraState>>);

impl FakeCamera {
    pub fn denying() -> Self {
        let fake = FakeCamera::default();
        fake.0.borrow_mut().grant = Ok(false);
        fake
    }

    pub fn unsupported() -> Self {
        let fake = FakeCamera::default();
        {
            let mut state = fake.0.borrow_mut();
            state.supported = false;
            state.grant = Err(CameraError::Unsupported);
        }
        fake
    }

    pub fn permission_requests(&self) -> usize {
        self.0.borrow().permission_requests
    }

    pub fn open_sessions(&self) -> usize {
        self.0.borrow().open.len()
    }

    pub fn set_permission(&self, permission: CameraPermission) {
        self.0.borrow_mut().permission = permission;
    }
}

impl CameraProvider for FakeCamera {
    fn is_supported(&self) -> bool {
        self.0.borrow().supported
    }

    fn permission_state(&mut self) -> CameraPermission {
        self.0.borrow().permission
    }

    fn request_permission(&mut self) -> Result<bool, CameraError> {
        let mut state = self.0.borrow_mut();
        state.permission_requests += 1;
        let result = state.grant.clone();
        match result {
            Ok(true) => state.permission = CameraPermission::Granted,
            Ok(false) | Err(CameraError::PermissionDenied) => {
                state.permission = CameraPermission::Denied
            }
            Err(_) => {}
        }
        result
    }

    fn open_session(&mut self) -> Result<SessionId, CameraError> {
        let mut state = self.0.borrow_mut();
        if state.open_fails {
            return Err(CameraError::Device("busy".to_string()));
        }
        let id = SessionId(state.next_session);
        state.next_session += 1;
        state.open.push(id);
        Ok(id)
    }

    fn close_session(&mut self, session: SessionId) {
        let mut state = self.0.borrow_mut();
        let before = state.open.len();
        state.open.retain(|s| *s != session);
        if state.open.len() != before {
            state.closes += 1;
        }
    }
}
