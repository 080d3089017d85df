//! Reconciliation of camera time against GPS time
//!
//! [`Reconciler::reconcile`] runs a fixed sequence of independent steps over
//! one file's metadata. Only two outcomes abort the file: a metadata block
//! that cannot be decoded at all, and a file with neither a camera time nor a
//! GPS time. Every other failure leaves its field empty and is recorded as a
//! [`Diagnostic`].

use super::gps::gps_date_time;
use super::local::local_time_in_zone;
use super::zone::{BundledZones, TzfLookup, ZoneCache, ZoneDatabase, ZoneNameLookup};
use super::CaptureTime;
use crate::error::{Error, Result};
use crate::metadata::{ExifMetadata, FieldName, MetadataSource};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::io::{BufRead, Seek};
use std::path::Path;
use tracing::debug;

/// Step of the reconciliation a diagnostic belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Model,
    GpsTime,
    CaptureTime,
    Location,
    Zone,
    Correction,
}

/// A step that failed without aborting the reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub step: Step,
    pub message: String,
}

/// Collects degraded steps while a result is being assembled
#[derive(Debug, Default)]
struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Keep the value of a successful step, record the failure of another
    fn settle<T>(&mut self, step: Step, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.note(step, e.to_string());
                None
            }
        }
    }

    fn note(&mut self, step: Step, message: String) {
        debug!(?step, %message, "Reconciliation step degraded");
        self.0.push(Diagnostic { step, message });
    }
}

/// Times found in one file and how they relate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    /// Camera model, empty if absent
    pub model: String,
    /// Camera clock reading
    pub local_time: Option<CaptureTime>,
    /// `local_time` reinterpreted in the zone of the GPS coordinate
    pub corrected_time: Option<DateTime<FixedOffset>>,
    /// GPS clock reading, always UTC
    pub gps_time: Option<DateTime<Utc>>,
    /// A coordinate was present and parsed
    pub has_gps_location: bool,
    /// Zone used for the correction
    pub zone: Option<Tz>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Why a file with both clocks could not be reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionGap {
    /// A coordinate was present but no corrected time came out of it
    LocationWithoutCorrection,
    /// No coordinate to derive a zone from
    NoLocation,
}

/// Outcome of a reconciliation, in reporting priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    AllTimesMissing,
    OnlyGpsTime,
    CorrectionUnavailable(CorrectionGap),
    /// `delta` is corrected time minus GPS time
    Reconciled { delta: TimeDelta },
    /// The camera recorded its own UTC offset; `delta` is that time minus GPS time
    RecordedOffset { delta: TimeDelta },
    GpsTimeUnavailable,
}

impl Classification {
    /// Stable machine-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Classification::AllTimesMissing => "all-times-missing",
            Classification::OnlyGpsTime => "only-gps-time",
            Classification::CorrectionUnavailable(CorrectionGap::LocationWithoutCorrection) => {
                "correction-failed"
            }
            Classification::CorrectionUnavailable(CorrectionGap::NoLocation) => "no-location",
            Classification::Reconciled { .. } => "reconciled",
            Classification::RecordedOffset { .. } => "recorded-offset",
            Classification::GpsTimeUnavailable => "gps-time-unavailable",
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.delta().is_some()
    }

    /// Camera clock minus GPS clock, when both are absolute
    pub fn delta(&self) -> Option<TimeDelta> {
        match self {
            Classification::Reconciled { delta } | Classification::RecordedOffset { delta } => {
                Some(*delta)
            }
            _ => None,
        }
    }
}

impl ReconciliationResult {
    pub fn classify(&self) -> Classification {
        match (&self.local_time, &self.corrected_time, &self.gps_time) {
            (None, _, None) => Classification::AllTimesMissing,
            (None, _, Some(_)) => Classification::OnlyGpsTime,
            (Some(CaptureTime::Zoned(local)), None, Some(gps)) => Classification::RecordedOffset {
                delta: local.signed_duration_since(*gps),
            },
            (Some(_), None, Some(_)) => {
                Classification::CorrectionUnavailable(if self.has_gps_location {
                    CorrectionGap::LocationWithoutCorrection
                } else {
                    CorrectionGap::NoLocation
                })
            }
            (Some(_), Some(corrected), Some(gps)) => Classification::Reconciled {
                delta: corrected.signed_duration_since(*gps),
            },
            (Some(_), _, None) => Classification::GpsTimeUnavailable,
        }
    }
}

/// Outcome of the geographic correction step
#[derive(Debug, Default)]
struct Correction {
    has_gps_location: bool,
    zone: Option<Tz>,
    corrected_time: Option<DateTime<FixedOffset>>,
}

/// Runs reconciliations against a shared zone cache
pub struct Reconciler<'a, L = TzfLookup, D = BundledZones> {
    zones: &'a ZoneCache<D>,
    lookup: L,
}

impl<'a> Reconciler<'a> {
    /// Reconciler using the tzf-rs coordinate lookup
    pub fn with_zones(zones: &'a ZoneCache) -> Self {
        Self::new(zones, TzfLookup)
    }
}

impl<'a, L: ZoneNameLookup, D: ZoneDatabase> Reconciler<'a, L, D> {
    pub fn new(zones: &'a ZoneCache<D>, lookup: L) -> Self {
        Self { zones, lookup }
    }

    /// Decode and reconcile a file
    pub fn reconcile_file(&self, path: &Path) -> Result<ReconciliationResult> {
        let metadata = ExifMetadata::from_file(path)?;
        self.reconcile(&metadata)
    }

    /// Decode and reconcile an image container
    pub fn reconcile_reader<R: BufRead + Seek>(&self, reader: &mut R) -> Result<ReconciliationResult> {
        let metadata = ExifMetadata::decode(reader)?;
        self.reconcile(&metadata)
    }

    /// Reconcile already decoded metadata
    pub fn reconcile<S: MetadataSource + ?Sized>(&self, source: &S) -> Result<ReconciliationResult> {
        let mut diagnostics = Diagnostics::default();

        let model = source
            .field(FieldName::Model)
            .and_then(|field| diagnostics.settle(Step::Model, field.string_val()))
            .map(|model| model.trim().to_string())
            .unwrap_or_default();

        let gps_time = diagnostics.settle(Step::GpsTime, gps_date_time(source));

        let local_time = match source.capture_time() {
            Ok(time) => time,
            Err(e) if gps_time.is_some() => {
                diagnostics.note(Step::CaptureTime, e.to_string());
                return Ok(ReconciliationResult {
                    model,
                    local_time: None,
                    corrected_time: None,
                    gps_time,
                    has_gps_location: false,
                    zone: None,
                    diagnostics: diagnostics.0,
                });
            }
            Err(e) => {
                debug!(error = %e, "No camera time and no GPS time");
                return Err(Error::NoTimeAvailable);
            }
        };

        let correction = if local_time.is_naive() {
            self.correct(source, &mut diagnostics)
        } else {
            Correction {
                has_gps_location: diagnostics.settle(Step::Location, source.lat_long()).is_some(),
                ..Correction::default()
            }
        };

        Ok(ReconciliationResult {
            model,
            local_time: Some(local_time),
            corrected_time: correction.corrected_time,
            gps_time,
            has_gps_location: correction.has_gps_location,
            zone: correction.zone,
            diagnostics: diagnostics.0,
        })
    }

    /// Best-effort reinterpretation of the camera time in the zone of the
    /// file's own coordinate
    fn correct<S: MetadataSource + ?Sized>(
        &self,
        source: &S,
        diagnostics: &mut Diagnostics,
    ) -> Correction {
        let Some((latitude, longitude)) = diagnostics.settle(Step::Location, source.lat_long())
        else {
            return Correction::default();
        };

        let zone_name = self.lookup.zone_name(latitude, longitude);
        let Some(zone) = self.zones.resolve(&zone_name) else {
            let message = if zone_name.is_empty() {
                format!("no timezone known at {latitude:.5},{longitude:.5}")
            } else {
                format!("timezone {zone_name} could not be loaded")
            };
            diagnostics.note(Step::Zone, message);
            return Correction {
                has_gps_location: true,
                ..Correction::default()
            };
        };

        Correction {
            has_gps_location: true,
            zone: Some(zone),
            corrected_time: diagnostics.settle(Step::Correction, local_time_in_zone(source, &zone)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Field, FieldValue, MemorySource};
    use chrono::{NaiveDate, TimeZone};

    /// Zone lookup that ignores the coordinate
    struct FixedZoneName(&'static str);

    impl ZoneNameLookup for FixedZoneName {
        fn zone_name(&self, _latitude: f64, _longitude: f64) -> String {
            self.0.to_string()
        }
    }

    fn gps_fields(source: MemorySource) -> MemorySource {
        source
            .with_field(Field::ascii(FieldName::GpsDateStamp, "2014:05:02"))
            .with_field(Field::rational(
                FieldName::GpsTimeStamp,
                &[(14, 1), (30, 1), (0, 1)],
            ))
    }

    fn location_fields(source: MemorySource) -> MemorySource {
        source
            .with_field(Field::rational(
                FieldName::GpsLatitude,
                &[(40, 1), (42, 1), (4608, 100)],
            ))
            .with_field(Field::ascii(FieldName::GpsLatitudeRef, "N"))
            .with_field(Field::rational(
                FieldName::GpsLongitude,
                &[(74, 1), (0, 1), (2160, 100)],
            ))
            .with_field(Field::ascii(FieldName::GpsLongitudeRef, "W"))
    }

    fn camera(local: &str) -> MemorySource {
        MemorySource::new()
            .with_field(Field::ascii(FieldName::Model, "Acme X1"))
            .with_field(Field::ascii(FieldName::DateTimeOriginal, local))
    }

    fn reconcile_with(zone_name: &'static str, source: &MemorySource) -> Result<ReconciliationResult> {
        let zones = ZoneCache::new();
        Reconciler::new(&zones, FixedZoneName(zone_name)).reconcile(source)
    }

    #[test]
    fn test_model_only_has_no_time() {
        let source = MemorySource::new().with_field(Field::ascii(FieldName::Model, "Acme X1"));

        let err = reconcile_with("America/New_York", &source).unwrap_err();
        assert!(matches!(err, Error::NoTimeAvailable));

        let empty = ReconciliationResult {
            model: "Acme X1".to_string(),
            local_time: None,
            corrected_time: None,
            gps_time: None,
            has_gps_location: false,
            zone: None,
            diagnostics: Vec::new(),
        };
        assert_eq!(empty.classify(), Classification::AllTimesMissing);
    }

    #[test]
    fn test_only_gps_time() {
        let source = gps_fields(
            MemorySource::new().with_field(Field::ascii(FieldName::Model, "Acme X1")),
        );

        let result = reconcile_with("America/New_York", &source).unwrap();

        assert_eq!(result.model, "Acme X1");
        assert_eq!(
            result.gps_time,
            Some(Utc.with_ymd_and_hms(2014, 5, 2, 14, 30, 0).unwrap())
        );
        assert!(result.local_time.is_none());
        assert!(result.corrected_time.is_none());
        assert_eq!(result.classify(), Classification::OnlyGpsTime);
        assert!(result.diagnostics.iter().any(|d| d.step == Step::CaptureTime));
    }

    #[test]
    fn test_reconciled_in_new_york() {
        let source = location_fields(gps_fields(camera("2014:05:02 13:31:02")));

        let result = reconcile_with("America/New_York", &source).unwrap();

        let corrected = result.corrected_time.unwrap();
        assert_eq!(corrected.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(
            corrected.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2014, 5, 2, 17, 31, 2).unwrap()
        );
        assert!(result.has_gps_location);
        assert_eq!(result.zone, Some(Tz::America__New_York));
        assert_eq!(
            result.classify(),
            Classification::Reconciled {
                delta: TimeDelta::hours(3) + TimeDelta::minutes(1) + TimeDelta::seconds(2)
            }
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_correct_clock_has_small_negative_delta() {
        let source = location_fields(gps_fields(camera("2014:05:02 09:31:02")));

        let result = reconcile_with("America/New_York", &source).unwrap();

        assert_eq!(
            result.corrected_time.unwrap().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2014, 5, 2, 13, 31, 2).unwrap()
        );
        assert_eq!(
            result.classify(),
            Classification::Reconciled {
                delta: -(TimeDelta::minutes(58) + TimeDelta::seconds(58))
            }
        );
    }

    #[test]
    fn test_unknown_zone_name_with_location() {
        let source = location_fields(gps_fields(camera("2014:05:02 09:31:02")));

        let result = reconcile_with("", &source).unwrap();

        assert!(result.corrected_time.is_none());
        assert!(result.has_gps_location);
        assert_eq!(
            result.classify(),
            Classification::CorrectionUnavailable(CorrectionGap::LocationWithoutCorrection)
        );
        assert!(result.diagnostics.iter().any(|d| d.step == Step::Zone));
    }

    #[test]
    fn test_unloadable_zone_with_location() {
        let source = location_fields(gps_fields(camera("2014:05:02 09:31:02")));

        let result = reconcile_with("Mars/Olympus_Mons", &source).unwrap();

        assert!(result.has_gps_location);
        assert!(result.zone.is_none());
        assert_eq!(
            result.classify(),
            Classification::CorrectionUnavailable(CorrectionGap::LocationWithoutCorrection)
        );
    }

    #[test]
    fn test_no_location() {
        let source = gps_fields(camera("2014:05:02 09:31:02"));

        let result = reconcile_with("America/New_York", &source).unwrap();

        assert!(!result.has_gps_location);
        assert_eq!(
            result.classify(),
            Classification::CorrectionUnavailable(CorrectionGap::NoLocation)
        );
        assert!(result.diagnostics.iter().any(|d| d.step == Step::Location));
    }

    #[test]
    fn test_local_time_without_gps_time() {
        let source = location_fields(camera("2014:05:02 09:31:02"));

        let result = reconcile_with("America/New_York", &source).unwrap();

        assert!(result.local_time.is_some());
        assert!(result.corrected_time.is_some());
        assert!(result.gps_time.is_none());
        assert_eq!(result.classify(), Classification::GpsTimeUnavailable);
        assert!(!result.classify().is_reconciled());
    }

    #[test]
    fn test_correction_failure_is_not_fatal() {
        // Accepted by the camera parse, rejected by the strict EXIF layout
        let source = location_fields(gps_fields(camera("2014-05-02 09:31:02")));

        let result = reconcile_with("America/New_York", &source).unwrap();

        assert!(result.local_time.is_some());
        assert!(result.corrected_time.is_none());
        assert_eq!(
            result.classify(),
            Classification::CorrectionUnavailable(CorrectionGap::LocationWithoutCorrection)
        );
        assert!(result.diagnostics.iter().any(|d| d.step == Step::Correction));
    }

    #[test]
    fn test_zoned_camera_time_is_not_corrected() {
        let source = location_fields(gps_fields(camera("2014:05:02 09:31:02")))
            .with_field(Field::ascii(FieldName::OffsetTimeOriginal, "-04:00"));

        let result = reconcile_with("America/New_York", &source).unwrap();

        assert!(matches!(result.local_time, Some(CaptureTime::Zoned(_))));
        assert!(result.corrected_time.is_none());
        assert!(result.zone.is_none());
        assert!(result.has_gps_location);

        // 09:31:02-04:00 is 13:31:02Z, against GPS 14:30:00Z
        let expected = -(TimeDelta::minutes(58) + TimeDelta::seconds(58));
        assert_eq!(
            result.classify(),
            Classification::RecordedOffset { delta: expected }
        );
        assert!(result.classify().is_reconciled());
    }

    #[test]
    fn test_zoned_camera_time_without_location() {
        let source = gps_fields(camera("2014:05:02 09:31:02"))
            .with_field(Field::ascii(FieldName::OffsetTimeOriginal, "-04:00"));

        let result = reconcile_with("America/New_York", &source).unwrap();
        assert!(!result.has_gps_location);
        assert!(matches!(
            result.classify(),
            Classification::RecordedOffset { .. }
        ));
    }

    #[test]
    fn test_missing_model_is_empty() {
        let source = gps_fields(MemorySource::new());
        let result = reconcile_with("", &source).unwrap();
        assert_eq!(result.model, "");
    }

    #[test]
    fn test_malformed_gps_time_is_absorbed() {
        let source = camera("2014:05:02 09:31:02")
            .with_field(Field::ascii(FieldName::GpsDateStamp, "2014:05:02"))
            .with_field(Field::new(FieldName::GpsTimeStamp, FieldValue::Other));

        let result = reconcile_with("", &source).unwrap();

        assert!(result.gps_time.is_none());
        assert_eq!(result.classify(), Classification::GpsTimeUnavailable);
        assert!(result.diagnostics.iter().any(|d| d.step == Step::GpsTime));
    }

    #[test]
    fn test_corrected_implies_local() {
        let sources = [
            location_fields(gps_fields(camera("2014:05:02 09:31:02"))),
            location_fields(gps_fields(MemorySource::new())),
            gps_fields(camera("2014:05:02 09:31:02")),
        ];
        for source in &sources {
            let result = reconcile_with("America/New_York", source).unwrap();
            if result.corrected_time.is_some() {
                assert!(result.local_time.is_some());
            }
        }
    }

    #[test]
    fn test_shared_cache_across_reconciliations() {
        let zones = ZoneCache::new();
        let reconciler = Reconciler::new(&zones, FixedZoneName("America/New_York"));
        let source = location_fields(gps_fields(camera("2014:05:02 09:31:02")));

        let first = reconciler.reconcile(&source).unwrap();
        let second = reconciler.reconcile(&source).unwrap();

        assert_eq!(first, second);
        assert_eq!(zones.len(), 1);
    }

    #[test]
    fn test_decode_failure_produces_no_result() {
        let zones = ZoneCache::new();
        let reconciler = Reconciler::with_zones(&zones);
        let mut reader = std::io::Cursor::new(b"definitely not an image".to_vec());

        let err = reconciler.reconcile_reader(&mut reader).unwrap_err();
        assert!(matches!(err, Error::DecodeFailed(_)));
    }

    #[test]
    fn test_serializes_result() {
        let source = location_fields(gps_fields(camera("2014:05:02 09:31:02")));
        let result = reconcile_with("America/New_York", &source).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["model"], "Acme X1");
        assert_eq!(json["hasGpsLocation"], true);
        assert_eq!(json["zone"], "America/New_York");
        assert_eq!(json["localTime"]["kind"], "naive");
        assert!(json.get("diagnostics").is_none());

        let local = NaiveDate::from_ymd_opt(2014, 5, 2)
            .unwrap()
            .and_hms_opt(9, 31, 2)
            .unwrap();
        assert_eq!(result.local_time, Some(CaptureTime::Naive(local)));
    }
}
