//! EXIF clock check - cross-checks camera clocks against GPS time
//!
//! Walks photo folders, reconciles each file's local capture time with its
//! GPS timestamp and prints one line per file.

use anyhow::Result;
use clap::Parser;
use exif_clock_check::config::OutputFormat;
use exif_clock_check::process::FileReport;
use exif_clock_check::report::{render_json, render_text};
use exif_clock_check::{Cli, Config, Processor};
use std::path::Path;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Coloured report lines for terminals

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::{IsTerminal, stdout};

    /// CLI theme colours
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
    }

    /// Print a line, coloured only when stdout is a terminal
    pub fn print_line(line: &str, color: Color) {
        let mut out = stdout();
        if out.is_terminal() {
            let _ = out.execute(Print(style(line).with(color)));
            let _ = out.execute(Print("\n"));
        } else {
            println!("{line}");
        }
    }

    /// Print a statistic under the report
    pub fn print_stat(key: &str, value: usize, color: Color) {
        let mut out = stdout();
        if out.is_terminal() {
            let _ = out.execute(Print("  "));
            let _ = out.execute(Print(style(key).with(CliTheme::HINT)));
            let _ = out.execute(Print(": "));
            let _ = out.execute(Print(style(value.to_string()).with(color).bold()));
            let _ = out.execute(Print("\n"));
        } else {
            println!("  {key}: {value}");
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    // Logging is configured from the merged config, so the file is read first
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    };

    let _guard = setup_logging(&cli, log_level(&config))?;

    info!(version = env!("CARGO_PKG_VERSION"), "EXIF clock check starting");
    if let Some(ref config_path) = cli.config {
        info!(config_file = %config_path.display(), "Loaded configuration from file");
    }
    if config.verbose {
        info!(?config, "Configuration loaded");
    }

    let output = config.output;
    let processor = Processor::new(config);

    match processor.run_each(|report| print_report(&report, output)) {
        Ok(()) => {
            if output == OutputFormat::Text {
                use cli_output::*;
                use std::sync::atomic::Ordering;

                let stats = processor.stats();
                println!();
                print_stat("Reconciled", stats.reconciled.load(Ordering::Relaxed), CliTheme::SUCCESS);
                print_stat("Unreconciled", stats.unreconciled.load(Ordering::Relaxed), CliTheme::WARNING);
                print_stat("Failed", stats.failed.load(Ordering::Relaxed), CliTheme::ERROR);
            }

            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_report(report: &FileReport, output: OutputFormat) {
    use cli_output::*;

    match output {
        OutputFormat::Json => match render_json(report) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(path = %report.relative.display(), error = %e, "Failed to render report"),
        },
        OutputFormat::Text => {
            let line = render_text(report);
            let color = match &report.outcome {
                Err(_) => CliTheme::ERROR,
                Ok(result) if result.classify().is_reconciled() => CliTheme::SUCCESS,
                Ok(_) => CliTheme::WARNING,
            };
            print_line(&line, color);
        }
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let file_config = Config::load_from_file(config_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.roots.is_empty() {
        anyhow::bail!("no input paths given; pass files or directories, or set `roots` in a config file");
    }

    Ok(config)
}

/// Default log level; `verbose` from either the CLI or the config file enables debug
fn log_level(config: &Config) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Setup logging (console, plus a file when requested)
fn setup_logging(cli: &Cli, level: Level) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    let Some(log_path) = cli.log_file.as_deref() else {
        subscriber.init();
        return Ok(None);
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(open_log_file(log_path)?);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(Some(guard))
}

fn open_log_file(log_path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    Ok(std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?)
}
