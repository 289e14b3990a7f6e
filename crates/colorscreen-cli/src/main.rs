//! Batch command-line front-end for the additive-color-screen
//! reconstruction pipeline: render a tile, run lattice detection,
//! validate/convert `.par` parameter files, and import Capture One LCC
//! backlight calibrations.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod ppm;

/// Exit code used for a cancelled run, distinct from the generic
/// non-zero failure code any other error produces.
const EXIT_CANCELLED: i32 = 2;

#[derive(Parser)]
#[command(name = "colorscreen")]
#[command(author, version, about = "Reconstruct color images from additive color-screen scans")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write log to this file instead of stderr
    #[arg(short = 'l', long = "log", global = true)]
    log: Option<PathBuf>,

    /// Number of worker threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one output tile from a scan and a known screen geometry
    RenderTile(commands::render_tile::RenderTileArgs),
    /// Search a scan for a regular additive-color-screen lattice
    Detect(commands::detect::DetectArgs),
    /// Validate or round-trip a `.par` parameter file
    Par(commands::par::ParArgs),
    /// Import a Capture One LCC file and emit a `.par` backlight block
    Lcc(commands::lcc::LccArgs),
}

fn init_tracing(verbose: u8, log_path: Option<&PathBuf>) {
    let filter = match verbose {
        0 => "warn",
        1 => "colorscreen=info",
        2 => "colorscreen=debug",
        _ => "colorscreen=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if let Some(path) = log_path {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
        let name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("colorscreen.log"));
        let appender = tracing_appender::rolling::never(dir, name);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(fmt::time::uptime())
            .with_ansi(false)
            .with_writer(appender)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(fmt::time::uptime())
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log.as_ref());

    if cli.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(cli.threads).build_global() {
            tracing::warn!("failed to configure thread pool: {e}");
        }
    }

    let result = match cli.command {
        Commands::RenderTile(args) => commands::render_tile::run(args),
        Commands::Detect(args) => commands::detect::run(args),
        Commands::Par(args) => commands::par::run(args),
        Commands::Lcc(args) => commands::lcc::run(args),
    };

    match result {
        Ok(()) => {}
        Err(e) if is_cancellation(&e) => {
            eprintln!("cancelled");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn is_cancellation(e: &anyhow::Error) -> bool {
    e.to_string().contains("cancel")
}
