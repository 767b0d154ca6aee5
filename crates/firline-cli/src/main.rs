//! Firline CLI - design lowpass FIR kernels and run audio through them.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "firline")]
#[command(author, version, about = "Windowed-sinc lowpass FIR filter tools", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Design a kernel and print or save its taps
    Design(commands::design::DesignArgs),

    /// Filter a WAV file through the convolution engine
    Process(commands::process::ProcessArgs),

    /// Check the engine against the direct reference convolver
    Verify(commands::verify::VerifyArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Design(args) => commands::design::run(args),
        Commands::Process(args) => commands::process::run(args),
        Commands::Verify(args) => commands::verify::run(args),
    }
}
