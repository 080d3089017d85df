//! Configuration types for the clock checker

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Output format for per-file reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human readable line per file
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Configuration for the clock checker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files or directories to inspect
    pub roots: Vec<PathBuf>,

    /// Directories to exclude from scanning (can be absolute paths or folder names)
    pub exclude_dirs: Vec<PathBuf>,

    /// File extensions to inspect (case-insensitive)
    pub extensions: Vec<String>,

    /// Inspect every file regardless of extension
    pub all_files: bool,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// Number of threads for parallel processing (0 = auto)
    pub threads: usize,

    /// Report format
    pub output: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: vec![],
            exclude_dirs: vec![],
            extensions: vec![
                "jpg".into(), "jpeg".into(), "tiff".into(), "tif".into(),
                "heic".into(), "heif".into(), "avif".into(), "png".into(),
                "webp".into(), "dng".into(), "nef".into(), "arw".into(),
                "cr2".into(), "orf".into(), "rw2".into(), "pef".into(),
            ],
            all_files: false,
            follow_links: false,
            threads: 0, // Auto-detect
            output: OutputFormat::default(),
            verbose: false,
        }
    }
}

impl Config {
    /// Check if a file extension should be inspected; an empty list accepts everything
    pub fn is_supported(&self, ext: &str) -> bool {
        if self.all_files || self.extensions.is_empty() {
            return true;
        }
        let ext_lower = ext.to_lowercase();
        self.extensions.iter().any(|e| e.to_lowercase() == ext_lower)
    }

    /// Check if a path should be inspected, judging by its extension
    pub fn accepts(&self, path: &Path) -> bool {
        if self.all_files || self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.is_supported(ext))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# EXIF clock check configuration file
# This file uses TOML format (https://toml.io)

# Files or directories to inspect
roots = [
    "D:/Photos",
]

# Directories to exclude from scanning
# Can be absolute paths or folder names (will match any folder with that name)
exclude_dirs = [
    ".thumbnails",
    "@eaDir",
]

# File extensions to inspect (case-insensitive)
extensions = ["jpg", "jpeg", "tiff", "tif", "heic", "heif", "avif", "png", "webp", "dng", "nef", "arw", "cr2", "orf", "rw2", "pef"]

# Inspect every file regardless of extension
all_files = false

# Follow symbolic links while walking
follow_links = false

# Number of threads for parallel processing (0 = auto-detect)
threads = 0

# Report format: "text" or "json"
output = "text"

# Verbose output - log every degraded reconciliation step
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}
