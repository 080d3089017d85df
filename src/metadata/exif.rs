//! EXIF metadata decoded with kamadak-exif

use super::{Field, FieldName, FieldValue, MetadataSource};
use crate::error::{Error, Result};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;
use tracing::{debug, trace};

/// EXIF tag backing each field name
fn tag_for(name: FieldName) -> Tag {
    match name {
        FieldName::Model => Tag::Model,
        FieldName::DateTimeOriginal => Tag::DateTimeOriginal,
        FieldName::DateTime => Tag::DateTime,
        FieldName::OffsetTimeOriginal => Tag::OffsetTimeOriginal,
        FieldName::OffsetTime => Tag::OffsetTime,
        FieldName::GpsDateStamp => Tag::GPSDateStamp,
        FieldName::GpsTimeStamp => Tag::GPSTimeStamp,
        FieldName::GpsLatitude => Tag::GPSLatitude,
        FieldName::GpsLatitudeRef => Tag::GPSLatitudeRef,
        FieldName::GpsLongitude => Tag::GPSLongitude,
        FieldName::GpsLongitudeRef => Tag::GPSLongitudeRef,
    }
}

fn convert(value: &Value) -> FieldValue {
    match value {
        Value::Ascii(strings) => FieldValue::Ascii(strings.first().cloned().unwrap_or_default()),
        Value::Rational(values) => FieldValue::Rational(
            values
                .iter()
                .map(|r| (i64::from(r.num), i64::from(r.denom)))
                .collect(),
        ),
        Value::SRational(values) => FieldValue::Rational(
            values
                .iter()
                .map(|r| (i64::from(r.num), i64::from(r.denom)))
                .collect(),
        ),
        Value::Undefined(bytes, _) => FieldValue::Undefined(bytes.clone()),
        _ => FieldValue::Other,
    }
}

/// Keep the metadata of a partially readable block, reject everything else
fn accept_recoverable(result: std::result::Result<exif::Exif, exif::Error>) -> Result<exif::Exif> {
    match result {
        Ok(exif) => Ok(exif),
        Err(exif::Error::PartialResult(partial)) => {
            let (exif, errors) = partial.into_inner();
            for error in &errors {
                debug!(error = %error, "Ignoring recoverable EXIF error");
            }
            Ok(exif)
        }
        Err(e) => Err(Error::DecodeFailed(e.to_string())),
    }
}

/// A decoded EXIF block
pub struct ExifMetadata {
    exif: exif::Exif,
}

impl ExifMetadata {
    /// Decode the EXIF block of an image container (JPEG, TIFF, HEIF, PNG, WebP)
    pub fn decode<R: BufRead + Seek>(reader: &mut R) -> Result<Self> {
        let exif = accept_recoverable(
            Reader::new()
                .continue_on_error(true)
                .read_from_container(reader),
        )?;
        trace!(fields = exif.fields().count(), "Decoded EXIF");
        Ok(Self { exif })
    }

    /// Decode a bare TIFF-structured EXIF block
    pub fn from_raw(data: Vec<u8>) -> Result<Self> {
        let exif = accept_recoverable(Reader::new().continue_on_error(true).read_raw(data))?;
        Ok(Self { exif })
    }

    /// Open and decode a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::decode(&mut reader)
    }
}

impl MetadataSource for ExifMetadata {
    fn field(&self, name: FieldName) -> Option<Field> {
        self.exif
            .get_field(tag_for(name), In::PRIMARY)
            .map(|field| Field::new(name, convert(&field.value)))
    }
}
