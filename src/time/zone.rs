//! Timezone resolution
//!
//! Coordinates are mapped to an IANA zone name by a [`ZoneNameLookup`], and
//! names are turned into zones by a [`ZoneDatabase`]. [`ZoneCache`] sits in
//! front of the database and remembers every outcome, failures included.

use crate::error::{Error, Result};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};
use tracing::{debug, warn};
use tzf_rs::DefaultFinder;

static FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

/// Maps a coordinate to an IANA zone name, `""` when unknown
pub trait ZoneNameLookup: Send + Sync {
    fn zone_name(&self, latitude: f64, longitude: f64) -> String;
}

/// Loads a zone by IANA name
pub trait ZoneDatabase: Send + Sync {
    fn load_zone(&self, name: &str) -> Result<Tz>;
}

/// Coordinate lookup backed by the tzf-rs polygon finder
#[derive(Debug, Clone, Copy, Default)]
pub struct TzfLookup;

impl ZoneNameLookup for TzfLookup {
    fn zone_name(&self, latitude: f64, longitude: f64) -> String {
        FINDER.get_tz_name(longitude, latitude).to_string()
    }
}

/// The IANA database compiled into chrono-tz
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledZones;

impl ZoneDatabase for BundledZones {
    fn load_zone(&self, name: &str) -> Result<Tz> {
        name.parse::<Tz>().map_err(|e| Error::UnknownZone {
            zone: name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Zone-name keyed cache shared by every reconciliation of a run
///
/// Two callers missing on the same name at once both query the database and
/// both store the same answer; no lock is held during the query.
#[derive(Debug, Default)]
pub struct ZoneCache<D = BundledZones> {
    database: D,
    zones: RwLock<HashMap<String, Option<Tz>>>,
}

impl ZoneCache<BundledZones> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: ZoneDatabase> ZoneCache<D> {
    pub fn with_database(database: D) -> Self {
        Self {
            database,
            zones: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a zone name, `None` for `""` or a name that failed to load
    pub fn resolve(&self, zone_name: &str) -> Option<Tz> {
        if zone_name.is_empty() {
            return None;
        }

        let cached = self
            .zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(zone_name)
            .copied();
        if let Some(zone) = cached {
            return zone;
        }

        let zone = match self.database.load_zone(zone_name) {
            Ok(zone) => {
                debug!(zone = zone_name, "Loaded timezone");
                Some(zone)
            }
            Err(e) => {
                warn!(zone = zone_name, error = %e, "Failed to look up timezone");
                None
            }
        };

        self.zones
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(zone_name.to_string(), zone);
        zone
    }

    /// Number of cached names, failed ones included
    pub fn len(&self) -> usize {
        self.zones
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
