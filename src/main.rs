//! Command-line entry point

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use control_locator::config::{resolve_config_path, LayoutFile};
use control_locator::platform::Desktop;
use control_locator::{
    CancelHandle, CoordinateCorrector, DpiContext, LocatorConfig, ManualMeasurement, Resolver,
    Result, WindowLocator,
};

/// Control Locator - record the screen coordinates of a window's controls
#[derive(Parser, Debug)]
#[command(name = "control-locator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Locate the window, resolve every control and write the coordinate file
    Resolve {
        /// Resolve and validate without writing any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Record control offsets by clicking on each control
    Measure {
        /// Where to write the measured layout
        #[arg(short, long, default_value = "layout.toml")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let desktop = Desktop::new();
    let cancel = interrupt_handle();

    match cli.command {
        Commands::Resolve { dry_run } => resolve(&config, &desktop, dry_run, cancel),
        Commands::Measure { output } => measure(&config, &desktop, &output, cancel),
    }
}

/// Cancel handle tripped by Ctrl-C
fn interrupt_handle() -> CancelHandle {
    let cancel = CancelHandle::default();
    let handler_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("Interrupted, stopping");
        handler_cancel.cancel();
    }) {
        log::warn!("Cannot install Ctrl-C handler: {}", e);
    }
    cancel
}

fn load_config(explicit: Option<&Path>) -> Result<LocatorConfig> {
    match explicit {
        Some(path) => LocatorConfig::load(path),
        None => match resolve_config_path() {
            Some(path) => LocatorConfig::load(&path),
            None => {
                log::info!("No config file found, using defaults");
                Ok(LocatorConfig::default())
            }
        },
    }
}

fn resolve(
    config: &LocatorConfig,
    desktop: &Desktop,
    dry_run: bool,
    cancel: CancelHandle,
) -> Result<()> {
    let dpi = DpiContext::process(desktop, config.dpi_aware);
    let resolver = Resolver::new(config, dpi)?
        .dry_run(dry_run)
        .with_cancel_handle(cancel);

    let report = resolver.run(desktop, desktop)?;
    log::info!(
        "{} accepted ({} refined), {} rejected, {} warnings",
        report.accepted(),
        report.refined(),
        report.rejected(),
        report.warnings.len()
    );
    Ok(())
}

fn measure(
    config: &LocatorConfig,
    desktop: &Desktop,
    output: &Path,
    cancel: CancelHandle,
) -> Result<()> {
    let window = WindowLocator::new(&config.window_title, &config.child_window_pattern)
        .locate(desktop)?;
    let names: Vec<String> = config.layout()?.names().map(str::to_string).collect();
    let dpi = DpiContext::process(desktop, config.dpi_aware);

    let layout = ManualMeasurement::new(desktop)
        .with_corrector(CoordinateCorrector::new(dpi, config.border_offset()))
        .with_cancel_handle(cancel)
        .measure(window.rect.origin(), names.iter().map(String::as_str))?;

    LayoutFile::from_layout(&layout).save(output)
}
