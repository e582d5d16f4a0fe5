use std::collections::HashSet;
use thiserror::Error;

use super::zone::{InvalidZoneError, Zone, ZoneForm, ZoneId};
use crate::events::Event;
use crate::platform::{StorageError, ZoneStorage};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneError {
    #[error(transparent)]
    Invalid(#[from] InvalidZoneError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("No zone ids left")]
    IdsExhausted,
}

/// Ordered zone collection, the single writer of zone definitions
///
/// Every successful mutation is written through [`ZoneStorage`] before the
/// call returns. When the write fails the in-memory change is rolled back, so
/// memory and storage never disagree.
pub struct ZoneStore<S: ZoneStorage> {
    storage: S,
    zones: Vec<Zone>,
    /// Highest numeric id seen or issued; new ids are always above it
    last_id: u64,
    events: Vec<Event>,
}

impl<S: ZoneStorage> ZoneStore<S> {
    pub fn new(storage: S) -> Self {
        ZoneStore {
            storage,
            zones: Vec::new(),
            last_id: 0,
            events: Vec::new(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn get(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.id == id)
    }

    /// Load the persisted zones.
    ///
    /// When nothing was ever stored, `defaults` are adopted and persisted.
    /// When the stored document cannot be parsed at all, `defaults` are
    /// adopted but the document is left alone until the next mutation. The
    /// same holds when the storage cannot be read.
    /// On a failed seeding write the defaults stay loaded and the error is
    /// returned.
    pub fn load(&mut self, defaults: Vec<Zone>) -> Result<(), StorageError> {
        let stored = match self.storage.read() {
            Ok(stored) => stored.map(|document| decode(&document)),
            Err(e) => {
                log::error!("Unable to read stored zones, using defaults: {}", e);
                Some(None)
            }
        };

        let (zones, seed) = match stored {
            Some(Some(zones)) => (zones, false),
            Some(None) => (defaults, false),
            None => {
                log::info!("No stored zones, seeding {} default zone(s)", defaults.len());
                (defaults, true)
            }
        };

        self.last_id = zones
            .iter()
            .filter_map(|z| z.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            .max(self.last_id);
        self.zones = zones;
        log::debug!("Loaded {} zone(s)", self.zones.len());

        if seed {
            self.persist()?;
        }
        Ok(())
    }

    /// Validate and append a new zone
    pub fn add(&mut self, form: &ZoneForm, now_ms: u64) -> Result<Zone, ZoneError> {
        let draft = form.validate()?;

        let zone = Zone {
            id: self.next_id(now_ms)?,
            name: draft.name,
            latitude: draft.center.latitude,
            longitude: draft.center.longitude,
            radius: draft.radius,
            created_at: now_ms,
        };

        self.zones.push(zone.clone());
        if let Err(e) = self.persist() {
            self.zones.pop();
            log::error!("Zone '{}' not added: {}", zone.name, e);
            return Err(e.into());
        }

        log::info!(
            "Added zone {} '{}' at {:.6},{:.6} r={}m",
            zone.id,
            zone.name,
            zone.latitude,
            zone.longitude,
            zone.radius
        );
        self.events.push(Event::ZoneAdded { zone: zone.clone() });
        Ok(zone)
    }

    /// Remove a zone by id. Removing an unknown id is not an error.
    ///
    /// Returns the removed zone, if there was one.
    pub fn remove(&mut self, id: &ZoneId) -> Result<Option<Zone>, StorageError> {
        let removed = self
            .zones
            .iter()
            .position(|z| &z.id == id)
            .map(|index| (index, self.zones.remove(index)));

        if let Err(e) = self.persist() {
            if let Some((index, zone)) = removed {
                self.zones.insert(index, zone);
            }
            log::error!("Zone {} not removed: {}", id, e);
            return Err(e);
        }

        match removed {
            Some((_, zone)) => {
                log::info!("Removed zone {} '{}'", zone.id, zone.name);
                self.events.push(Event::ZoneRemoved {
                    id: zone.id.clone(),
                });
                Ok(Some(zone))
            }
            None => {
                log::debug!("Zone {} not present, nothing removed", id);
                Ok(None)
            }
        }
    }

    /// Events produced since the previous call
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let document = encode(&self.zones)?;
        self.storage.write(&document)
    }

    fn next_id(&mut self, now_ms: u64) -> Result<ZoneId, ZoneError> {
        let id = self
            .last_id
            .checked_add(1)
            .ok_or(ZoneError::IdsExhausted)?
            .max(now_ms);
        self.last_id = id;
        Ok(ZoneId::from(id.to_string()))
    }
}

fn encode(zones: &[Zone]) -> Result<String, StorageError> {
    serde_json::to_string_pretty(zones).map_err(|e| StorageError::Encode(e.to_string()))
}

/// Parse a stored document, dropping records that are incomplete, invalid or
/// duplicated. Returns `None` when the document is not a JSON array at all.
fn decode(document: &str) -> Option<Vec<Zone>> {
    let records: Vec<serde_json::Value> = match serde_json::from_str(document) {
        Ok(records) => records,
        Err(e) => {
            log::error!("Stored zone list is unreadable, using defaults: {}", e);
            return None;
        }
    };

    let mut seen = HashSet::new();
    let mut zones = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let zone: Zone = match serde_json::from_value(record) {
            Ok(zone) => zone,
            Err(e) => {
                log::warn!("Skipping corrupt zone record #{}: {}", index, e);
                continue;
            }
        };
        if let Err(e) = zone.validate() {
            log::warn!("Skipping invalid zone record #{} ({}): {}", index, zone.id, e);
            continue;
        }
        if !seen.insert(zone.id.clone()) {
            log::warn!("Skipping duplicate zone id {} in record #{}", zone.id, index);
            continue;
        }
        zones.push(zone);
    }
    Some(zones)
}
