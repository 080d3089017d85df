//! Camera local time parsing and zone reinterpretation

use crate::error::{Error, Result};
use crate::metadata::{FieldFormat, FieldName, MetadataSource};
use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use tracing::trace;

/// EXIF date/time layout: "YYYY:MM:DD HH:MM:SS"
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layouts some writers use instead of the EXIF one
const ALTERNATE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a date/time field using the strict EXIF layout
pub fn parse_exif_datetime(field: FieldName, value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT).map_err(|e| {
        Error::MalformedDateTime {
            field,
            value: value.to_string(),
            message: e.to_string(),
        }
    })
}

/// Parse a camera date/time, accepting the layouts cameras are known to write
pub fn parse_camera_datetime(field: FieldName, value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim().trim_matches('"');

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT) {
        return Ok(dt);
    }

    for format in ALTERNATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            trace!(%field, format, "Parsed date/time with alternate layout");
            return Ok(dt);
        }
    }

    parse_exif_datetime(field, trimmed)
}

/// Read DateTimeOriginal (or DateTime) as a wall-clock time in `zone`
///
/// The offset comes from the zone's rules at that date. A repeated
/// wall-clock time resolves to its earlier instant. One skipped by a DST
/// transition is read with the offset in force before the transition, so a
/// camera still on standard time lands on the same instant.
pub fn local_time_in_zone<S: MetadataSource + ?Sized>(
    source: &S,
    zone: &Tz,
) -> Result<DateTime<FixedOffset>> {
    let field = source
        .field(FieldName::DateTimeOriginal)
        .or_else(|| source.field(FieldName::DateTime))
        .ok_or(Error::MissingField(FieldName::DateTimeOriginal))?;

    if field.format() != FieldFormat::String {
        return Err(Error::UnsupportedFormat {
            field: field.name(),
            expected: "a string",
        });
    }
    let raw = field.raw_bytes().unwrap_or_default();
    let value = String::from_utf8_lossy(raw);
    let naive = parse_exif_datetime(field.name(), value.trim_end_matches('\0'))?;

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            Ok(dt.with_timezone(&dt.offset().fix()))
        }
        LocalResult::None => across_gap(naive, zone).ok_or_else(|| Error::MalformedDateTime {
            field: field.name(),
            value: naive.to_string(),
            message: format!("wall-clock time out of range in {}", zone.name()),
        }),
    }
}

/// Place a wall-clock time skipped by a forward transition
fn across_gap(naive: NaiveDateTime, zone: &Tz) -> Option<DateTime<FixedOffset>> {
    let before = naive.checked_sub_signed(TimeDelta::days(1))?;
    let offset = zone.offset_from_utc_datetime(&before).fix();
    let utc = naive.checked_sub_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))?;
    trace!(%naive, zone = zone.name(), "Wall-clock time falls in a DST gap");
    let dt = zone.from_utc_datetime(&utc);
    Some(dt.with_timezone(&dt.offset().fix()))
}
