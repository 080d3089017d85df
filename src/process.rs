//! File processing pipeline

use crate::config::Config;
use crate::error::{Error, Result};
use crate::time::{Reconciler, ReconciliationResult, ZoneCache};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Files reconciled per worker thread before reports are handed out
const BATCH_PER_THREAD: usize = 16;

/// Outcome of reconciling one file
#[derive(Debug)]
pub struct FileReport {
    /// Path as found on disk
    pub source: PathBuf,
    /// Path relative to the root it was found under
    pub relative: PathBuf,
    pub outcome: Result<ReconciliationResult>,
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub total_files: AtomicUsize,
    pub reconciled: AtomicUsize,
    pub unreconciled: AtomicUsize,
    pub failed: AtomicUsize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, outcome: &Result<ReconciliationResult>) {
        let counter = match outcome {
            Ok(result) if result.classify().is_reconciled() => &self.reconciled,
            Ok(_) => &self.unreconciled,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Reconciled: {}, Unreconciled: {}, Failed: {}",
            self.total_files.load(Ordering::Relaxed),
            self.reconciled.load(Ordering::Relaxed),
            self.unreconciled.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        )
    }
}

/// Walks the configured roots and reconciles every accepted file
pub struct Processor {
    config: Config,
    zones: ZoneCache,
    stats: ProcessingStats,
}

impl Processor {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Self {
        // Configure Rayon thread pool
        if config.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build_global()
                .ok(); // Ignore if already initialized
        }

        Self {
            config,
            zones: ZoneCache::new(),
            stats: ProcessingStats::new(),
        }
    }

    /// Run the processing pipeline, collecting every report in traversal order
    pub fn run(&self) -> Result<Vec<FileReport>> {
        let mut reports = Vec::new();
        self.run_each(|report| reports.push(report))?;
        Ok(reports)
    }

    /// Run the processing pipeline, handing reports to `emit` in traversal order
    ///
    /// Files are reconciled in parallel one batch at a time, so the first
    /// lines come out before the whole tree is done.
    pub fn run_each<F: FnMut(FileReport)>(&self, mut emit: F) -> Result<()> {
        let _span = span!(Level::INFO, "processor_run").entered();

        info!("Scanning input paths...");
        let files = self.collect_files()?;
        info!(count = files.len(), "Found candidate files");

        self.stats.total_files.store(files.len(), Ordering::Relaxed);
        if files.is_empty() {
            info!("No files to process");
            return Ok(());
        }

        let reconciler = Reconciler::with_zones(&self.zones);
        let batch_size = rayon::current_num_threads() * BATCH_PER_THREAD;
        for batch in files.chunks(batch_size) {
            let reports: Vec<FileReport> = batch
                .par_iter()
                .map(|(source, relative)| {
                    let _span = span!(Level::DEBUG, "file", path = %relative.display()).entered();
                    let outcome = reconciler.reconcile_file(source);
                    if let Err(e) = &outcome {
                        debug!(error = %e, "File not reconciled");
                    }
                    self.stats.record(&outcome);
                    FileReport {
                        source: source.clone(),
                        relative: relative.clone(),
                        outcome,
                    }
                })
                .collect();
            reports.into_iter().for_each(&mut emit);
        }

        debug!(zones = self.zones.len(), "Zones loaded during run");
        info!("{}", self.stats.summary());

        Ok(())
    }

    /// Collect (source, relative) pairs from every root
    fn collect_files(&self) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut files = Vec::new();

        for root in &self.config.roots {
            if !root.exists() {
                return Err(Error::InputNotFound { path: root.clone() });
            }

            if root.is_file() {
                let relative = root.file_name().map(PathBuf::from).unwrap_or_else(|| root.clone());
                files.push((root.clone(), relative));
                continue;
            }

            for entry in WalkDir::new(root)
                .follow_links(self.config.follow_links)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !self.is_excluded_dir(root, e.path()))
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                let path = entry.path();
                if entry.file_type().is_file() || (self.config.follow_links && path.is_file()) {
                    if self.config.accepts(path) {
                        files.push((path.to_path_buf(), relative_to(root, path)));
                    } else {
                        debug!(?path, "Skipping unsupported extension");
                    }
                }
            }
        }

        Ok(files)
    }

    /// Check if a path should be excluded based on exclude_dirs configuration
    ///
    /// Folder names only match below `root`, never the root's own components.
    fn is_excluded_dir(&self, root: &Path, path: &Path) -> bool {
        if self.config.exclude_dirs.is_empty() {
            return false;
        }
        let below_root = path.strip_prefix(root).unwrap_or(path);

        for exclude in &self.config.exclude_dirs {
            if exclude.is_absolute() {
                if path.starts_with(exclude) {
                    debug!(?path, ?exclude, "Excluding directory (absolute path match)");
                    return true;
                }
            } else if let Some(exclude_name) = exclude.file_name() {
                for component in below_root.components() {
                    if let std::path::Component::Normal(name) = component
                        && name == exclude_name
                    {
                        debug!(?path, ?exclude, "Excluding directory (folder name match)");
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Get processing statistics reference
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
        _ => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}
