//! Restricted Zones
//!
//! Circular camera-restricted zones and their persisted collection.
//!
//! # Features
//!
//! - Form validation for admin input (numbers or text)
//! - Stable, never reused zone ids
//! - Synchronous persistence after every mutation through
//!   [`ZoneStorage`](crate::platform::ZoneStorage)
//! - Corrupt persisted records are skipped, not fatal
//!
//! # Example
//!
//! ```rust,ignore
//! use captureshield_core::zones::{ZoneStore, ZoneForm, demo_zones};
//!
//! let mut store = ZoneStore::new(storage);
//! store.load(demo_zones())?;
//!
//! let zone = store.add(ZoneForm::new("Research Lab", 37.7848, -122.4289, 150.0), now_ms)?;
//! store.remove(&zone.id)?;
//! ```

mod store;
mod zone;

pub use store::*;
pub use zone::*;

/// Zones seeded on first run when nothing has been persisted yet
pub fn demo_zones() -> Vec<Zone> {
    vec![
        Zone {
            id: ZoneId::from("1"),
            name: "Office Building".to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
            radius: 200.0,
            // 2023-01-15T00:00:00Z
            created_at: 1_673_740_800_000,
        },
        Zone {
            id: ZoneId::from("2"),
            name: "Research Lab".to_string(),
            latitude: 37.7848,
            longitude: -122.4289,
            radius: 150.0,
            // 2023-02-20T00:00:00Z
            created_at: 1_676_851_200_000,
        },
    ]
}
