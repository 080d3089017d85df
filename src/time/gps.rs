//! GPS date/time assembly
//!
//! GPSDateStamp holds the UTC date as `YYYY:MM:DD` and GPSTimeStamp holds
//! the UTC time of day as three rationals (hour, minute, second). Per the
//! EXIF 2.3 specification the combined value is always UTC.

use super::rational::rational_to_duration;
use crate::error::{Error, Result};
use crate::metadata::{FieldName, MetadataSource};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use tracing::trace;

/// GPSDateStamp layout
pub const GPS_DATE_FORMAT: &str = "%Y:%m:%d";

/// Units of the three GPSTimeStamp components, in order
fn component_units() -> [TimeDelta; 3] {
    [TimeDelta::hours(1), TimeDelta::minutes(1), TimeDelta::seconds(1)]
}

/// Assemble the GPS UTC instant from GPSDateStamp and GPSTimeStamp
pub fn gps_date_time<S: MetadataSource + ?Sized>(source: &S) -> Result<DateTime<Utc>> {
    let date_field = source.get(FieldName::GpsDateStamp)?;
    let time_field = source.get(FieldName::GpsTimeStamp)?;

    let date_value = date_field.string_val()?;
    let date = NaiveDate::parse_from_str(date_value.trim(), GPS_DATE_FORMAT).map_err(|_| {
        Error::MalformedDate {
            field: FieldName::GpsDateStamp,
            value: date_value.clone(),
        }
    })?;

    let time_of_day = component_units().into_iter().enumerate().try_fold(
        TimeDelta::zero(),
        |total, (index, unit)| -> Result<TimeDelta> {
            let (num, denom) = time_field.rat2(index)?;
            Ok(total + rational_to_duration(num, denom, unit)?)
        },
    )?;

    let instant = date
        .and_time(NaiveTime::MIN)
        .and_utc()
        .checked_add_signed(time_of_day)
        .ok_or_else(|| Error::MalformedDate {
            field: FieldName::GpsTimeStamp,
            value: format!("{date_value} + {time_of_day}"),
        })?;

    trace!(%instant, "Assembled GPS time");
    Ok(instant)
}
