//! The shield controller task.
//!
//! One task owns the [`CaptureShield`]. HTTP handlers talk to it through a
//! cloneable [`ShieldHandle`] that sends [`Command`]s over an mpsc channel and
//! awaits the reply on a oneshot, so every operation on the shield is
//! serialized. A ticker drives location polling in between commands.
//!
//! Events drained from the shield after every step are broadcast to all
//! subscribers; notifications are also written to the log.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_graceful_shutdown::SubsystemHandle;

use captureshield_core::{
    CameraProvider, CaptureError, CaptureShield, Event, InvalidCoordinate, LocationError,
    LocationProvider, SessionId, Severity, ShieldStatus, StorageError, Zone, ZoneError, ZoneForm,
    ZoneId, ZoneStorage,
};

use crate::{now_ms, ServerError};

const COMMAND_QUEUE: usize = 32;
const EVENT_QUEUE: usize = 256;

type Reply<T> = oneshot::Sender<T>;

pub enum Command {
    Status(Reply<ShieldStatus>),
    Zones(Reply<Vec<Zone>>),
    AddZone(ZoneForm, Reply<Result<Zone, ZoneError>>),
    RemoveZone(ZoneId, Reply<Result<Option<Zone>, StorageError>>),
    Simulate {
        latitude: f64,
        longitude: f64,
        reply: Reply<Result<ShieldStatus, InvalidCoordinate>>,
    },
    RequestLocationPermission(Reply<Result<bool, LocationError>>),
    RequestCameraCapability(Reply<bool>),
    StartCapture(Reply<Result<SessionId, CaptureError>>),
    StopCapture(Reply<bool>),
}

/// Cloneable access to a running [`ShieldRunner`]
#[derive(Clone)]
pub struct ShieldHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl ShieldHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, ServerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| ServerError::ControllerGone)?;
        rx.await.map_err(|_| ServerError::ControllerGone)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> Result<ShieldStatus, ServerError> {
        self.request(Command::Status).await
    }

    pub async fn zones(&self) -> Result<Vec<Zone>, ServerError> {
        self.request(Command::Zones).await
    }

    pub async fn add_zone(&self, form: ZoneForm) -> Result<Result<Zone, ZoneError>, ServerError> {
        self.request(|reply| Command::AddZone(form, reply)).await
    }

    pub async fn remove_zone(
        &self,
        id: ZoneId,
    ) -> Result<Result<Option<Zone>, StorageError>, ServerError> {
        self.request(|reply| Command::RemoveZone(id, reply)).await
    }

    pub async fn simulate(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Result<ShieldStatus, InvalidCoordinate>, ServerError> {
        self.request(|reply| Command::Simulate {
            latitude,
            longitude,
            reply,
        })
        .await
    }

    pub async fn request_location_permission(
        &self,
    ) -> Result<Result<bool, LocationError>, ServerError> {
        self.request(Command::RequestLocationPermission).await
    }

    pub async fn request_camera_capability(&self) -> Result<bool, ServerError> {
        self.request(Command::RequestCameraCapability).await
    }

    pub async fn start_capture(&self) -> Result<Result<SessionId, CaptureError>, ServerError> {
        self.request(Command::StartCapture).await
    }

    pub async fn stop_capture(&self) -> Result<bool, ServerError> {
        self.request(Command::StopCapture).await
    }
}

pub struct ShieldRunner<L: LocationProvider, C: CameraProvider, S: ZoneStorage> {
    shield: CaptureShield<L, C, S>,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
    poll_interval: Duration,
}

impl<L, C, S> ShieldRunner<L, C, S>
where
    L: LocationProvider + Send + 'static,
    C: CameraProvider + Send + 'static,
    S: ZoneStorage + Send + 'static,
{
    pub fn new(shield: CaptureShield<L, C, S>, poll_interval: Duration) -> (Self, ShieldHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (event_tx, _) = broadcast::channel(EVENT_QUEUE);

        let runner = ShieldRunner {
            shield,
            commands: command_rx,
            events: event_tx.clone(),
            poll_interval,
        };
        let handle = ShieldHandle {
            commands: command_tx,
            events: event_tx,
        };
        (runner, handle)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), ServerError> {
        self.run_until(subsys.on_shutdown_requested()).await
    }

    /// Serve commands until `shutdown` completes or every handle is dropped
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        self.shield.start(now_ms());
        self.publish();

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::debug!("Shield controller: shutdown");
                    break;
                },

                _ = ticker.tick() => {
                    self.shield.poll(now_ms());
                },

                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => break,
                    }
                }
            }
            self.publish();
        }

        self.shield.shutdown(now_ms());
        self.publish();
        Ok(())
    }

    fn handle(&mut self, command: Command) {
        let now = now_ms();
        // A requester that went away is not our problem
        match command {
            Command::Status(reply) => {
                let _ = reply.send(self.shield.status());
            }
            Command::Zones(reply) => {
                let _ = reply.send(self.shield.zones().to_vec());
            }
            Command::AddZone(form, reply) => {
                let _ = reply.send(self.shield.add_zone(&form, now));
            }
            Command::RemoveZone(id, reply) => {
                let _ = reply.send(self.shield.remove_zone(&id, now));
            }
            Command::Simulate {
                latitude,
                longitude,
                reply,
            } => {
                let result = self
                    .shield
                    .simulate_location(latitude, longitude, now)
                    .map(|_| self.shield.status());
                let _ = reply.send(result);
            }
            Command::RequestLocationPermission(reply) => {
                let _ = reply.send(self.shield.request_location_permission(now));
            }
            Command::RequestCameraCapability(reply) => {
                let _ = reply.send(self.shield.request_camera_capability(now));
            }
            Command::StartCapture(reply) => {
                let _ = reply.send(self.shield.start_capture(now));
            }
            Command::StopCapture(reply) => {
                let _ = reply.send(self.shield.stop_capture(now));
            }
        }
    }

    fn publish(&mut self) {
        for event in self.shield.drain_events() {
            if let Event::NotificationRequested { notification } = &event {
                match notification.severity {
                    Severity::Info => log::info!("{}: {}", notification.title, notification.body),
                    Severity::Error => log::warn!("{}: {}", notification.title, notification.body),
                }
            }
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}
