//! Kernel design command.

use super::common::FilterArgs;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TapFormat {
    /// One tap per line
    Text,
    /// JSON document with design metadata
    Json,
}

#[derive(Args)]
pub struct DesignArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Output format for the taps
    #[arg(long, value_enum, default_value = "text")]
    format: TapFormat,

    /// Write taps to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct DesignReport<'a> {
    sample_rate: f32,
    cutoff: f32,
    transition_band: f32,
    order: usize,
    length: usize,
    latency_samples: usize,
    dc_gain: f32,
    taps: &'a [f32],
}

pub fn run(args: DesignArgs) -> anyhow::Result<()> {
    let config = args.filter.resolve()?;
    let params = config.filter_parameters()?;
    let kernel = params.design();

    let report = DesignReport {
        sample_rate: params.sample_rate(),
        cutoff: params.cutoff(),
        transition_band: params.transition_band(),
        order: kernel.order(),
        length: kernel.len(),
        latency_samples: kernel.center(),
        dc_gain: kernel.dc_gain(),
        taps: kernel.taps(),
    };

    let body = match args.format {
        TapFormat::Json => serde_json::to_string_pretty(&report)? + "\n",
        TapFormat::Text => kernel.taps().iter().map(|t| format!("{t:e}\n")).collect(),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, body)?;
            print_summary(&report);
            println!("Taps written to {}", path.display());
        }
        None => {
            tracing::info!(
                order = report.order,
                length = report.length,
                latency_samples = report.latency_samples,
                "kernel designed"
            );
            std::io::stdout().write_all(body.as_bytes())?;
        }
    }

    Ok(())
}

fn print_summary(report: &DesignReport<'_>) {
    println!(
        "Lowpass {:.1} Hz, transition {:.1} Hz @ {} Hz",
        report.cutoff, report.transition_band, report.sample_rate
    );
    println!("  Order:   {}", report.order);
    println!("  Length:  {} taps", report.length);
    println!(
        "  Latency: {} samples ({:.2} ms)",
        report.latency_samples,
        1000.0 * report.latency_samples as f32 / report.sample_rate
    );
    println!("  DC gain: {:.6}", report.dc_gain);
}
