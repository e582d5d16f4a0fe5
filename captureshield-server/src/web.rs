//! HTTP API
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/status` | current [`ShieldStatus`] |
//! | GET | `/api/zones` | zone list |
//! | POST | `/api/zones` | add a zone from a [`ZoneForm`] |
//! | DELETE | `/api/zones/{id}` | remove a zone |
//! | POST | `/api/simulate` | override the position |
//! | POST | `/api/location/permission` | request location access |
//! | POST | `/api/camera/permission` | request camera access |
//! | POST | `/api/camera/start` | open a capture session |
//! | POST | `/api/camera/stop` | close the capture session |
//! | GET | `/api/events` | WebSocket stream of events as JSON |

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::broadcast;

use captureshield_core::{
    CameraError, CaptureError, Event, InvalidCoordinate, InvalidZoneError, LocationError,
    ShieldStatus, StorageError, Zone, ZoneError, ZoneForm, ZoneId,
};

use crate::controller::ShieldHandle;
use crate::ServerError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    InvalidZone(#[from] InvalidZoneError),
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Zone(ZoneError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl From<ZoneError> for ApiError {
    fn from(e: ZoneError) -> Self {
        match e {
            ZoneError::Invalid(e) => ApiError::InvalidZone(e),
            ZoneError::Storage(e) => ApiError::Storage(e),
            e @ ZoneError::IdsExhausted => ApiError::Zone(e),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidZone(_) | ApiError::InvalidCoordinate(_) => StatusCode::BAD_REQUEST,
            ApiError::Capture(CaptureError::Blocked | CaptureError::PermissionDenied)
            | ApiError::Capture(CaptureError::Camera(CameraError::PermissionDenied))
            | ApiError::Location(LocationError::PermissionDenied) => StatusCode::FORBIDDEN,
            ApiError::Capture(CaptureError::Camera(CameraError::Unsupported)) => {
                StatusCode::NOT_IMPLEMENTED
            }
            ApiError::Storage(_) | ApiError::Zone(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Capture(_) | ApiError::Location(_) | ApiError::Server(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("API error: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
struct SimulateRequest {
    latitude: f64,
    longitude: f64,
}

pub fn router(handle: ShieldHandle) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/zones", get(list_zones).post(add_zone))
        .route("/api/zones/{id}", delete(remove_zone))
        .route("/api/simulate", post(simulate))
        .route("/api/location/permission", post(request_location))
        .route("/api/camera/permission", post(request_camera))
        .route("/api/camera/start", post(start_capture))
        .route("/api/camera/stop", post(stop_capture))
        .route("/api/events", get(events))
        .with_state(handle)
}

async fn status(State(shield): State<ShieldHandle>) -> Result<Json<ShieldStatus>, ApiError> {
    Ok(Json(shield.status().await?))
}

async fn list_zones(State(shield): State<ShieldHandle>) -> Result<Json<Vec<Zone>>, ApiError> {
    Ok(Json(shield.zones().await?))
}

async fn add_zone(
    State(shield): State<ShieldHandle>,
    Json(form): Json<ZoneForm>,
) -> Result<(StatusCode, Json<Zone>), ApiError> {
    let zone = shield.add_zone(form).await??;
    Ok((StatusCode::CREATED, Json(zone)))
}

/// Removing an unknown zone succeeds as well
async fn remove_zone(
    State(shield): State<ShieldHandle>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    shield.remove_zone(ZoneId::from(id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

async fn simulate(
    State(shield): State<ShieldHandle>,
    Json(request): Json<SimulateRequest>,
) -> Result<Json<ShieldStatus>, ApiError> {
    let status = shield
        .simulate(request.latitude, request.longitude)
        .await??;
    Ok(Json(status))
}

async fn request_location(
    State(shield): State<ShieldHandle>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let granted = shield.request_location_permission().await??;
    Ok(Json(json!({ "granted": granted })))
}

async fn request_camera(
    State(shield): State<ShieldHandle>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let granted = shield.request_camera_capability().await?;
    Ok(Json(json!({ "granted": granted })))
}

async fn start_capture(
    State(shield): State<ShieldHandle>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = shield.start_capture().await??;
    Ok(Json(json!({ "session": session.0 })))
}

async fn stop_capture(
    State(shield): State<ShieldHandle>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stopped = shield.stop_capture().await?;
    Ok(Json(json!({ "stopped": stopped })))
}

async fn events(ws: WebSocketUpgrade, State(shield): State<ShieldHandle>) -> Response {
    let events = shield.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

async fn forward_events(socket: WebSocket, mut events: broadcast::Receiver<Event>) {
    let (mut sender, mut receiver) = socket.split();
    log::debug!("Event stream client connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                log::error!("Cannot encode event {:?}: {}", event, e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("Event stream client lagging, {} event(s) dropped", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            },

            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    log::debug!("Event stream client disconnected");
}
