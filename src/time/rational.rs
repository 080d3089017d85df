//! EXIF rational values

use crate::error::{Error, Result};
use chrono::TimeDelta;

fn invalid(numerator: i64, denominator: i64, reason: &'static str) -> Error {
    Error::InvalidRational {
        numerator,
        denominator,
        reason,
    }
}

/// Convert `numerator / denominator` units into a duration
///
/// The product is computed on 128-bit nanoseconds, so any pair of 32-bit
/// EXIF components times an hour fits before the division.
pub fn rational_to_duration(numerator: i64, denominator: i64, unit: TimeDelta) -> Result<TimeDelta> {
    if denominator == 0 {
        return Err(invalid(numerator, denominator, "zero denominator"));
    }
    let unit_nanos = unit
        .num_nanoseconds()
        .ok_or_else(|| invalid(numerator, denominator, "unit out of range"))?;

    let nanos = i128::from(numerator) * i128::from(unit_nanos) / i128::from(denominator);
    let nanos = i64::try_from(nanos)
        .map_err(|_| invalid(numerator, denominator, "duration out of range"))?;

    Ok(TimeDelta::nanoseconds(nanos))
}

/// Convert `numerator / denominator` into a float
pub fn rational_to_f64(numerator: i64, denominator: i64) -> Result<f64> {
    if denominator == 0 {
        return Err(invalid(numerator, denominator, "zero denominator"));
    }
    Ok(numerator as f64 / denominator as f64)
}
