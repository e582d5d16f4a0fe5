use serde::{Deserialize, Serialize};

use crate::geo::LatLon;
use crate::platform::LocationError;

/// A single position sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,

    /// Horizontal accuracy in meters, when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// Capture time (milliseconds since epoch)
    pub timestamp: u64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, timestamp: u64) -> Self {
        Position {
            latitude,
            longitude,
            accuracy: None,
            timestamp,
        }
    }

    /// Attach an accuracy estimate; non-positive or non-finite values are dropped
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = (meters.is_finite() && meters > 0.0).then_some(meters);
        self
    }

    pub fn coords(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// One element of the location stream: a fix or an error condition
#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    Fix(Position),
    Error(LocationError),
}
