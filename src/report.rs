//! Per-file report lines

use crate::error::Result;
use crate::process::FileReport;
use crate::time::{Classification, CorrectionGap, ReconciliationResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;

/// Format a signed duration as `+3h01m02s` / `-58m58s` / `0s`
pub fn format_delta(delta: TimeDelta) -> String {
    let total = delta.num_seconds();
    if total == 0 {
        return "0s".to_string();
    }
    let sign = if total < 0 { '-' } else { '+' };
    let abs = total.unsigned_abs();
    let (hours, minutes, seconds) = (abs / 3600, abs % 3600 / 60, abs % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes:02}m{seconds:02}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds:02}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

fn format_gps(time: &Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

/// One-line description of a reconciliation; lines that need attention start with `!`
pub fn describe(result: &ReconciliationResult) -> String {
    let model = &result.model;
    let gps = format_gps(&result.gps_time);

    match result.classify() {
        Classification::AllTimesMissing => "! all times missing".to_string(),
        Classification::OnlyGpsTime => format!("! {model} only GPS time, gps={gps}"),
        Classification::CorrectionUnavailable(gap) => {
            let reason = match gap {
                CorrectionGap::LocationWithoutCorrection => "coordinate present but correction failed",
                CorrectionGap::NoLocation => "no coordinate available",
            };
            format!("! {model} {reason}, gps={gps}")
        }
        Classification::Reconciled { delta } => {
            format!("{model} delta={}, gps={gps}", format_delta(delta))
        }
        Classification::RecordedOffset { delta } => {
            format!("{model} delta={} (recorded offset), gps={gps}", format_delta(delta))
        }
        Classification::GpsTimeUnavailable => {
            let local = result
                .local_time
                .map(|t| t.to_string())
                .unwrap_or_default();
            format!("! {model} GPS time unavailable, local={local}")
        }
    }
}

/// Text line for a file
pub fn render_text(report: &FileReport) -> String {
    let path = report.relative.display();
    match &report.outcome {
        Ok(result) => format!("{path}: {}", describe(result)),
        Err(e) => format!("{path} {}: {e}", e.kind()),
    }
}

/// JSON line for a file
pub fn render_json(report: &FileReport) -> Result<String> {
    let path = report.relative.display().to_string();
    let value = match &report.outcome {
        Ok(result) => {
            let classification = result.classify();
            let delta = classification.delta().map(|d| d.num_seconds());
            json!({
                "path": path,
                "status": classification.label(),
                "deltaSeconds": delta,
                "result": result,
            })
        }
        Err(e) => json!({
            "path": path,
            "status": "error",
            "kind": e.kind(),
            "error": e.to_string(),
        }),
    };
    Ok(serde_json::to_string(&value)?)
}
