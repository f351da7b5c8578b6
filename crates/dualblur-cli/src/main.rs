//! dualblur - continuous-radius dual filtering blur CLI
//!
//! Runs the blur on image files through the CPU backend and prints the
//! pass plans a request would execute.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "dualblur")]
#[command(author, version, about = "Continuous-radius dual filtering blur")]
#[command(long_about = "
Blurs images with a fixed-pass dual filtering (dual Kawase) chain, scaling
the working resolution so the radius behaves continuously.

Examples:
  dualblur blur photo.png -o soft.png -r 0.5       # fade path
  dualblur blur photo.png -o softer.png -r 6       # pre-scale path
  dualblur blur photo.png -o out.png -r 3 --iterations 3 --stats
  dualblur plan -W 1920 -H 1080 --radius 4         # show pass plans
  dualblur plan -W 1920 -H 1080 --scale 3
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Blur an image file
    #[command(visible_alias = "b")]
    Blur(BlurArgs),

    /// Print the pass plans for a blur request
    #[command(visible_alias = "p")]
    Plan(PlanArgs),
}

/// Blur settings shared by every command.
#[derive(Args, Clone)]
struct ConfigArgs {
    /// Fixed dual filtering passes
    #[arg(short, long)]
    iterations: Option<i32>,

    /// Image height at which radius 1 is the full fixed blur
    #[arg(long)]
    reference_height: Option<i32>,

    /// YAML config file (iterations, reference_height)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct BlurArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Blur radius (1 = fixed blur strength at the reference height)
    #[arg(short, long, default_value = "1.0")]
    radius: f32,

    #[command(flatten)]
    config: ConfigArgs,

    /// Print scratch pool statistics
    #[arg(long)]
    stats: bool,
}

#[derive(Args)]
struct PlanArgs {
    /// Source width
    #[arg(short = 'W', long)]
    width: u32,

    /// Source height
    #[arg(short = 'H', long)]
    height: u32,

    /// Blur radius
    #[arg(short, long, conflicts_with = "scale", required_unless_present = "scale")]
    radius: Option<f32>,

    /// Raw reduction factor, planned directly
    #[arg(short, long)]
    scale: Option<f32>,

    #[command(flatten)]
    config: ConfigArgs,
}

fn init_logging(verbose: u8, log: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let default = match verbose {
        0 => "warn",
        1 => "info,dualblur=debug",
        _ => "debug,dualblur=trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log.as_ref())?;

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Blur(args) => commands::blur::run(args, cli.verbose),
        Commands::Plan(args) => commands::plan::run(args, cli.verbose),
    }
}
