use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::geo::{InvalidCoordinate, LatLon};

/// Stable zone identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        ZoneId(s.to_string())
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        ZoneId(s)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A circular camera-restricted zone
///
/// This is also the persisted record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,

    /// Display label, never empty
    pub name: String,

    /// Center latitude in decimal degrees
    pub latitude: f64,

    /// Center longitude in decimal degrees
    pub longitude: f64,

    /// Radius in meters, always > 0
    pub radius: f64,

    /// Creation time (milliseconds since epoch)
    pub created_at: u64,
}

impl Zone {
    pub fn center(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    /// Check the invariants a stored record must satisfy
    pub fn validate(&self) -> Result<(), InvalidZoneError> {
        if self.name.trim().is_empty() {
            return Err(InvalidZoneError::EmptyName);
        }
        LatLon::checked(self.latitude, self.longitude)?;
        check_radius(self.radius)?;
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidZoneError {
    #[error("Zone name must not be empty")]
    EmptyName,
    #[error("{field} '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("Radius must be greater than zero, got {0}")]
    NonPositiveRadius(f64),
    #[error(transparent)]
    Coordinate(#[from] InvalidCoordinate),
}

fn check_radius(radius: f64) -> Result<(), InvalidZoneError> {
    if !radius.is_finite() {
        return Err(InvalidZoneError::NotANumber {
            field: "radius",
            value: radius.to_string(),
        });
    }
    if radius <= 0.0 {
        return Err(InvalidZoneError::NonPositiveRadius(radius));
    }
    Ok(())
}

/// Numeric form input, either already a number or still text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    fn parse(&self, field: &'static str) -> Result<f64, InvalidZoneError> {
        let value = match self {
            FormValue::Number(n) => Some(*n),
            FormValue::Text(s) => s.trim().parse::<f64>().ok(),
        };
        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(InvalidZoneError::NotANumber {
                field,
                value: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValue::Number(n) => write!(f, "{}", n),
            FormValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FormValue {
    fn from(n: f64) -> Self {
        FormValue::Number(n)
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

/// Add-zone input as submitted by an administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneForm {
    pub name: String,
    pub latitude: FormValue,
    pub longitude: FormValue,
    pub radius: FormValue,
}

/// A form that passed validation, ready to become a [`Zone`]
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDraft {
    pub name: String,
    pub center: LatLon,
    pub radius: f64,
}

impl ZoneForm {
    pub fn new(
        name: impl Into<String>,
        latitude: impl Into<FormValue>,
        longitude: impl Into<FormValue>,
        radius: impl Into<FormValue>,
    ) -> Self {
        ZoneForm {
            name: name.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            radius: radius.into(),
        }
    }

    pub fn validate(&self) -> Result<ZoneDraft, InvalidZoneError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(InvalidZoneError::EmptyName);
        }

        let latitude = self.latitude.parse("latitude")?;
        let longitude = self.longitude.parse("longitude")?;
        let radius = self.radius.parse("radius")?;
        check_radius(radius)?;

        Ok(ZoneDraft {
            name: name.to_string(),
            center: LatLon::checked(latitude, longitude)?,
            radius,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_numbers() {
        let draft = ZoneForm::new("Lab", 37.7848, -122.4289, 150.0)
            .validate()
            .unwrap();
        assert_eq!(draft.name, "Lab");
        assert_eq!(draft.center, LatLon::new(37.7848, -122.4289));
        assert_eq!(draft.radius, 150.0);
    }

    #[test]
    fn test_validate_text_is_trimmed() {
        let draft = ZoneForm::new("  Server Room ", " 37.78 ", "-122.41", "75")
            .validate()
            .unwrap();
        assert_eq!(draft.name, "Server Room");
        assert_eq!(draft.center, LatLon::new(37.78, -122.41));
        assert_eq!(draft.radius, 75.0);
    }

    #[test]
    fn test_validate_rejects_non_positive_radius() {
        assert_eq!(
            ZoneForm::new("Lab", 37.0, -122.0, 0.0).validate(),
            Err(InvalidZoneError::NonPositiveRadius(0.0))
        );
        assert_eq!(
            ZoneForm::new("Lab", 37.0, -122.0, "-5").validate(),
            Err(InvalidZoneError::NonPositiveRadius(-5.0))
        );
    }

    #[test]
    fn test_validate_rejects_non_numeric() {
        let err = ZoneForm::new("Lab", "north", -122.0, 10.0)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            InvalidZoneError::NotANumber {
                field: "latitude",
                value: "north".to_string()
            }
        );

        // "NaN" and "inf" parse as f64 but are not usable numbers
        assert!(ZoneForm::new("Lab", 37.0, "NaN", 10.0).validate().is_err());
        assert!(ZoneForm::new("Lab", 37.0, -122.0, "inf").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_name_and_bad_coordinates() {
        assert_eq!(
            ZoneForm::new("   ", 37.0, -122.0, 10.0).validate(),
            Err(InvalidZoneError::EmptyName)
        );
        assert_eq!(
            ZoneForm::new("Pole", 90.5, 0.0, 10.0).validate(),
            Err(InvalidZoneError::Coordinate(InvalidCoordinate::Latitude(90.5)))
        );
    }

    #[test]
    fn test_form_deserializes_numbers_and_strings() {
        let form: ZoneForm = serde_json::from_str(
            r#"{"name":"Lab","latitude":37.7848,"longitude":"-122.4289","radius":150}"#,
        )
        .unwrap();
        assert_eq!(form.latitude, FormValue::Number(37.7848));
        assert_eq!(form.longitude, FormValue::Text("-122.4289".to_string()));
        assert_eq!(form.validate().unwrap().radius, 150.0);
    }

    #[test]
    fn test_zone_record_uses_camel_case() {
        let zone = Zone {
            id: ZoneId::from("7"),
            name: "Lab".to_string(),
            latitude: 1.5,
            longitude: -2.5,
            radius: 10.0,
            created_at: 42,
        };
        let json = serde_json::to_value(&zone).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["createdAt"], 42);
    }
}
