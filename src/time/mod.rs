//! Time reconciliation module
//!
//! This module cross-checks the camera clock against the GPS clock:
//! - Rational EXIF values converted to durations
//! - GPS date/time stamps assembled into a UTC instant
//! - Coordinates resolved to an IANA timezone, with a shared cache
//! - Naive camera time reinterpreted in that timezone
//! - The orchestration and classification of the outcome

pub mod gps;
pub mod local;
pub mod rational;
pub mod reconcile;
pub mod zone;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;
use std::fmt;

pub use gps::gps_date_time;
pub use local::local_time_in_zone;
pub use rational::rational_to_duration;
pub use reconcile::{
    Classification, CorrectionGap, Diagnostic, ReconciliationResult, Reconciler, Step,
};
pub use zone::{BundledZones, TzfLookup, ZoneCache, ZoneDatabase, ZoneNameLookup};

/// Camera capture time as recorded in the metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CaptureTime {
    /// Wall-clock time with no known offset
    Naive(NaiveDateTime),
    /// Wall-clock time whose offset the metadata itself records
    Zoned(DateTime<FixedOffset>),
}

impl CaptureTime {
    pub fn is_naive(&self) -> bool {
        matches!(self, CaptureTime::Naive(_))
    }
}

impl fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTime::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CaptureTime::Zoned(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S %:z")),
        }
    }
}
