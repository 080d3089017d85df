//! Metadata field access
//!
//! The reconciliation engine never touches a container format directly. It
//! reads named fields through [`MetadataSource`], which is implemented by the
//! kamadak-exif adapter in [`exif`] and by the in-memory [`MemorySource`].

pub mod exif;

use crate::error::{Error, Result};
use crate::time::CaptureTime;
use crate::time::local::parse_camera_datetime;
use crate::time::rational::rational_to_f64;
use chrono::{FixedOffset, TimeZone};
use std::collections::HashMap;
use std::fmt;

pub use self::exif::ExifMetadata;

/// EXIF fields read by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Model,
    DateTimeOriginal,
    DateTime,
    OffsetTimeOriginal,
    OffsetTime,
    GpsDateStamp,
    GpsTimeStamp,
    GpsLatitude,
    GpsLatitudeRef,
    GpsLongitude,
    GpsLongitudeRef,
}

impl FieldName {
    /// Tag name as written in the EXIF specification
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Model => "Model",
            FieldName::DateTimeOriginal => "DateTimeOriginal",
            FieldName::DateTime => "DateTime",
            FieldName::OffsetTimeOriginal => "OffsetTimeOriginal",
            FieldName::OffsetTime => "OffsetTime",
            FieldName::GpsDateStamp => "GPSDateStamp",
            FieldName::GpsTimeStamp => "GPSTimeStamp",
            FieldName::GpsLatitude => "GPSLatitude",
            FieldName::GpsLatitudeRef => "GPSLatitudeRef",
            FieldName::GpsLongitude => "GPSLongitude",
            FieldName::GpsLongitudeRef => "GPSLongitudeRef",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage format of a field, as far as the engine cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    String,
    Other,
}

/// Decoded value of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// ASCII bytes, possibly NUL padded
    Ascii(Vec<u8>),
    /// Numerator/denominator pairs
    Rational(Vec<(i64, i64)>),
    /// Opaque bytes
    Undefined(Vec<u8>),
    /// Any other numeric type
    Other,
}

/// A single named field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: FieldName,
    value: FieldValue,
}

impl Field {
    pub fn new(name: FieldName, value: FieldValue) -> Self {
        Self { name, value }
    }

    /// Build an ASCII field from a string
    pub fn ascii(name: FieldName, value: &str) -> Self {
        Self::new(name, FieldValue::Ascii(value.as_bytes().to_vec()))
    }

    /// Build a rational field from numerator/denominator pairs
    pub fn rational(name: FieldName, values: &[(i64, i64)]) -> Self {
        Self::new(name, FieldValue::Rational(values.to_vec()))
    }

    pub fn name(&self) -> FieldName {
        self.name
    }

    pub fn format(&self) -> FieldFormat {
        match self.value {
            FieldValue::Ascii(_) => FieldFormat::String,
            _ => FieldFormat::Other,
        }
    }

    /// Raw bytes of a byte-oriented field; `None` for numeric fields
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            FieldValue::Ascii(bytes) | FieldValue::Undefined(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The field as a string with trailing NUL padding removed
    pub fn string_val(&self) -> Result<String> {
        match &self.value {
            FieldValue::Ascii(bytes) => Ok(String::from_utf8_lossy(bytes)
                .trim_end_matches('\0')
                .to_string()),
            _ => Err(Error::UnsupportedFormat {
                field: self.name,
                expected: "a string",
            }),
        }
    }

    /// The `index`-th numerator/denominator pair of a rational field
    pub fn rat2(&self, index: usize) -> Result<(i64, i64)> {
        match &self.value {
            FieldValue::Rational(values) => {
                values.get(index).copied().ok_or(Error::UnsupportedFormat {
                    field: self.name,
                    expected: "enough rational components",
                })
            }
            _ => Err(Error::UnsupportedFormat {
                field: self.name,
                expected: "rationals",
            }),
        }
    }
}

/// Named-field access to a decoded metadata block
///
/// Implementors only provide [`MetadataSource::field`]; the camera's own
/// capture-time parse and the coordinate parse are derived from it.
pub trait MetadataSource {
    /// Look up a field, `None` if the block does not contain it
    fn field(&self, name: FieldName) -> Option<Field>;

    /// Like [`MetadataSource::field`] but absence is an error
    fn get(&self, name: FieldName) -> Result<Field> {
        self.field(name).ok_or(Error::MissingField(name))
    }

    /// Camera capture time, naive unless the block records its UTC offset
    fn capture_time(&self) -> Result<CaptureTime> {
        let field = self
            .field(FieldName::DateTimeOriginal)
            .or_else(|| self.field(FieldName::DateTime))
            .ok_or(Error::MissingField(FieldName::DateTimeOriginal))?;
        let naive = parse_camera_datetime(field.name(), &field.string_val()?)?;

        let offset_field = match field.name() {
            FieldName::DateTimeOriginal => FieldName::OffsetTimeOriginal,
            _ => FieldName::OffsetTime,
        };
        let offset = self
            .field(offset_field)
            .and_then(|f| f.string_val().ok())
            .and_then(|s| parse_offset(&s));

        Ok(match offset.and_then(|o| o.from_local_datetime(&naive).single()) {
            Some(zoned) => CaptureTime::Zoned(zoned),
            None => CaptureTime::Naive(naive),
        })
    }

    /// Signed decimal latitude and longitude
    fn lat_long(&self) -> Result<(f64, f64)> {
        let latitude = coordinate(self, FieldName::GpsLatitude, FieldName::GpsLatitudeRef, "S")?;
        let longitude = coordinate(self, FieldName::GpsLongitude, FieldName::GpsLongitudeRef, "W")?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok((latitude, longitude))
    }
}

/// Degrees + minutes/60 + seconds/3600, negated for the `negative` hemisphere
fn coordinate<S: MetadataSource + ?Sized>(
    source: &S,
    name: FieldName,
    reference: FieldName,
    negative: &str,
) -> Result<f64> {
    let field = source.get(name)?;
    let hemisphere = source.get(reference)?.string_val()?;

    let mut value = 0.0;
    for (index, scale) in [1.0, 60.0, 3600.0].into_iter().enumerate() {
        let (num, denom) = field.rat2(index)?;
        value += rational_to_f64(num, denom)? / scale;
    }

    if hemisphere.trim().eq_ignore_ascii_case(negative) {
        value = -value;
    }
    Ok(value)
}

/// Parse an EXIF offset string such as `+09:00` or `-04:30`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Metadata held in memory, keyed by field name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    fields: HashMap<FieldName, Field>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any previous field with the same name
    pub fn insert(&mut self, field: Field) {
        self.fields.insert(field.name(), field);
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.insert(field);
        self
    }
}

impl MetadataSource for MemorySource {
    fn field(&self, name: FieldName) -> Option<Field> {
        self.fields.get(&name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn new_york() -> MemorySource {
        MemorySource::new()
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

    #[test]
    fn test_string_val_trims_nul_padding() {
        let field = Field::new(
            FieldName::Model,
            FieldValue::Ascii(b"Acme X1\0\0".to_vec()),
        );
        assert_eq!(field.string_val().unwrap(), "Acme X1");
        assert_eq!(field.format(), FieldFormat::String);
        assert_eq!(field.raw_bytes(), Some(&b"Acme X1\0\0"[..]));
    }

    #[test]
    fn test_rat2_errors() {
        let field = Field::rational(FieldName::GpsTimeStamp, &[(14, 1)]);
        assert_eq!(field.rat2(0).unwrap(), (14, 1));
        assert!(matches!(
            field.rat2(2),
            Err(Error::UnsupportedFormat { .. })
        ));

        let ascii = Field::ascii(FieldName::GpsTimeStamp, "14:30:00");
        assert!(matches!(ascii.rat2(0), Err(Error::UnsupportedFormat { .. })));
        assert!(ascii.raw_bytes().is_some());
        assert_eq!(field.format(), FieldFormat::Other);
        assert!(field.raw_bytes().is_none());
    }

    #[test]
    fn test_get_missing_field() {
        let source = MemorySource::new();
        assert!(matches!(
            source.get(FieldName::Model),
            Err(Error::MissingField(FieldName::Model))
        ));
    }

    #[test]
    fn test_capture_time_prefers_original() {
        let source = MemorySource::new()
            .with_field(Field::ascii(FieldName::DateTime, "2020:01:01 00:00:00"))
            .with_field(Field::ascii(
                FieldName::DateTimeOriginal,
                "2014:05:02 09:31:02\0",
            ));

        let time = source.capture_time().unwrap();
        let expected = NaiveDate::from_ymd_opt(2014, 5, 2)
            .unwrap()
            .and_hms_opt(9, 31, 2)
            .unwrap();
        assert_eq!(time, CaptureTime::Naive(expected));
    }

    #[test]
    fn test_capture_time_with_offset_is_zoned() {
        let source = MemorySource::new()
            .with_field(Field::ascii(
                FieldName::DateTimeOriginal,
                "2014:05:02 09:31:02",
            ))
            .with_field(Field::ascii(FieldName::OffsetTimeOriginal, "+09:00"));

        match source.capture_time().unwrap() {
            CaptureTime::Zoned(dt) => {
                assert_eq!(dt.offset().local_minus_utc(), 9 * 3600);
                assert_eq!(dt.hour(), 9);
            }
            other => panic!("expected zoned time, got {other:?}"),
        }
    }

    #[test]
    fn test_capture_time_ignores_offset_of_other_field() {
        let source = MemorySource::new()
            .with_field(Field::ascii(FieldName::DateTime, "2014:05:02 09:31:02"))
            .with_field(Field::ascii(FieldName::OffsetTimeOriginal, "+09:00"));

        assert!(source.capture_time().unwrap().is_naive());
    }

    #[test]
    fn test_capture_time_missing() {
        let source = MemorySource::new().with_field(Field::ascii(FieldName::Model, "X"));
        assert!(matches!(
            source.capture_time(),
            Err(Error::MissingField(FieldName::DateTimeOriginal))
        ));
    }

    #[test]
    fn test_lat_long() {
        let (lat, long) = new_york().lat_long().unwrap();
        assert!((lat - 40.712_8).abs() < 1e-4, "lat = {lat}");
        assert!((long + 74.006).abs() < 1e-4, "long = {long}");
    }

    #[test]
    fn test_lat_long_requires_reference() {
        let mut source = new_york();
        source.insert(Field::rational(FieldName::GpsLatitude, &[(40, 1), (0, 1), (0, 0)]));
        assert!(matches!(
            source.lat_long(),
            Err(Error::InvalidRational { .. })
        ));

        let source = MemorySource::new()
            .with_field(Field::rational(FieldName::GpsLatitude, &[(40, 1), (0, 1), (0, 1)]));
        assert!(matches!(
            source.lat_long(),
            Err(Error::MissingField(FieldName::GpsLatitudeRef))
        ));
    }

    #[test]
    fn test_lat_long_out_of_range() {
        let mut source = new_york();
        source.insert(Field::rational(FieldName::GpsLatitude, &[(95, 1), (0, 1), (0, 1)]));
        assert!(matches!(
            source.lat_long(),
            Err(Error::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+09:00").unwrap().local_minus_utc(), 32400);
        assert_eq!(parse_offset("-04:30").unwrap().local_minus_utc(), -16200);
        assert!(parse_offset("09:00").is_none());
        assert!(parse_offset("+25:00").is_none());
        assert!(parse_offset("").is_none());
    }
}
