//! Geofence Geometry
//!
//! Great-circle distance, containment and nearest-zone queries over a
//! position and a zone snapshot. Nothing in here can fail: an absent position
//! or an empty zone list simply yields `false` or `None`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::Position;
use crate::zones::Zone;

/// Mean earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum InvalidCoordinate {
    #[error("Latitude {0} is not within -90..=90")]
    Latitude(f64),
    #[error("Longitude {0} is not within -180..=180")]
    Longitude(f64),
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LatLon {
            latitude,
            longitude,
        }
    }

    /// Build a point, rejecting values off the globe (NaN included)
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidCoordinate::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidCoordinate::Longitude(longitude));
        }
        Ok(LatLon::new(latitude, longitude))
    }
}

/// Containment of a position in one zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Containment {
    pub is_inside: bool,
    pub distance_meters: f64,
}

/// Closest zone to a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<'a> {
    pub zone: &'a Zone,
    pub distance_meters: f64,
}

/// Haversine distance in meters.
///
/// The deltas are taken as absolute values so that `distance(a, b)` and
/// `distance(b, a)` evaluate the exact same floating point expression.
pub fn distance(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).abs().to_radians();
    let delta_lambda = (b.longitude - a.longitude).abs().to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

pub fn containment(position: &Position, zone: &Zone) -> Containment {
    let distance_meters = distance(position.coords(), zone.center());
    Containment {
        is_inside: distance_meters <= zone.radius,
        distance_meters,
    }
}

/// True iff the position lies within the zone; the boundary counts as inside
pub fn is_inside(position: &Position, zone: &Zone) -> bool {
    containment(position, zone).is_inside
}

pub fn is_inside_any(position: Option<&Position>, zones: &[Zone]) -> bool {
    match position {
        Some(position) => zones.iter().any(|zone| is_inside(position, zone)),
        None => false,
    }
}

/// Zone with the smallest distance to the position.
///
/// Ties go to the zone that appears first in `zones`.
pub fn nearest<'a>(position: Option<&Position>, zones: &'a [Zone]) -> Option<Nearest<'a>> {
    let position = position?;
    let here = position.coords();

    let mut best: Option<Nearest<'a>> = None;
    for zone in zones {
        let distance_meters = distance(here, zone.center());
        match best {
            Some(ref b) if distance_meters >= b.distance_meters => {}
            _ => {
                best = Some(Nearest {
                    zone,
                    distance_meters,
                })
            }
        }
    }
    best
}
