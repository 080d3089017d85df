//! CLI argument parsing with clap

use crate::config::{Config, OutputFormat};
use clap::Parser;
use std::path::PathBuf;

/// EXIF clock check - find out how far off your camera clock was
///
/// Compares the camera's local capture time with the GPS timestamp recorded
/// alongside it. When the photo carries a coordinate, the local time is
/// placed in that location's timezone and the clock offset is reported.
#[derive(Parser, Debug)]
#[command(name = "exif-clock-check")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Files or directories to inspect
    pub roots: Vec<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Number of threads for parallel processing (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Directories to skip (absolute paths or folder names)
    #[arg(long, num_args = 1..)]
    pub exclude: Vec<PathBuf>,

    /// Inspect every file regardless of extension
    #[arg(long)]
    pub all_files: bool,

    /// Follow symbolic links while walking
    #[arg(long)]
    pub follow_links: bool,

    /// Print one JSON object per file instead of text lines
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if !self.roots.is_empty() {
            config.roots = self.roots.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude_dirs = self.exclude.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.all_files {
            config.all_files = true;
        }
        if self.follow_links {
            config.follow_links = true;
        }
        if self.json {
            config.output = OutputFormat::Json;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "exif-clock-check",
            "/photos",
            "/more",
            "-t",
            "4",
            "--exclude",
            "@eaDir",
            ".thumbnails",
            "--json",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.roots, vec![PathBuf::from("/photos"), PathBuf::from("/more")]);
        assert_eq!(cli.exclude.len(), 2);

        let config = cli.to_config();
        assert_eq!(config.threads, 4);
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.verbose);
        assert!(!config.all_files);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file_config = Config {
            roots: vec![PathBuf::from("/from-file")],
            threads: 2,
            follow_links: true,
            ..Config::default()
        };

        let cli = Cli::try_parse_from(["exif-clock-check", "--all-files"]).unwrap();
        let config = cli.merge_with_config(file_config.clone());
        assert_eq!(config.roots, file_config.roots);
        assert_eq!(config.threads, 2);
        assert!(config.follow_links);
        assert!(config.all_files);

        let cli = Cli::try_parse_from(["exif-clock-check", "/cli", "-t", "8"]).unwrap();
        let config = cli.merge_with_config(file_config);
        assert_eq!(config.roots, vec![PathBuf::from("/cli")]);
        assert_eq!(config.threads, 8);
    }

    #[test]
    fn test_print_config_needs_no_roots() {
        let cli = Cli::try_parse_from(["exif-clock-check", "--print-config"]).unwrap();
        assert!(cli.print_config);
        assert!(cli.roots.is_empty());
    }
}
