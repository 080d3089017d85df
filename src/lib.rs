//! EXIF clock check - camera clock drift from photo metadata
//!
//! This library reconciles the local capture time a camera writes into EXIF
//! with the GPS timestamp recorded next to it:
//! - EXIF decoding with kamadak-exif behind a small field-accessor trait
//! - GPS date/time assembly from rational components
//! - Coordinate to timezone resolution with tzf-rs and a shared zone cache
//! - Parallel directory processing with Rayon

pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod process;
pub mod report;
pub mod time;

pub use cli::Cli;
pub use config::{Config, ConfigError, OutputFormat};
pub use error::{Error, Result};
pub use metadata::{ExifMetadata, MetadataSource};
pub use process::{FileReport, Processor};
pub use time::{Classification, ReconciliationResult, Reconciler, ZoneCache};
