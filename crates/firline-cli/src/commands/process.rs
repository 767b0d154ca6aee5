//! File-based filtering command.

use super::common::{FilterArgs, linear_to_db, peak, rms};
use crate::wav;
use clap::Args;
use firline_engine::{
    FilterLifecycle, PartitionedConvolver, ReadinessState, SchedulingPolicy, ThreadScheduling,
};
use std::path::PathBuf;

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file (32-bit float stereo)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    filter: FilterArgs,

    /// Processing block size
    #[arg(long)]
    block_size: Option<usize>,

    /// Worker scheduling policy (fifo or normal)
    #[arg(long)]
    scheduling: Option<SchedulingPolicy>,

    /// FIFO priority for the worker thread
    #[arg(long)]
    priority: Option<i32>,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let mut config = args.filter.resolve()?;
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    if let Some(policy) = args.scheduling {
        config.engine.scheduling.policy = policy;
    }
    if let Some(priority) = args.priority {
        config.engine.scheduling.priority = priority;
    }

    println!("Reading {}...", args.input.display());
    let audio = wav::read_stereo(&args.input)?;
    let sample_rate = audio.sample_rate as f32;
    println!(
        "  {} frames, {} channel(s), {} Hz, {:.2}s",
        audio.len(),
        audio.source_channels,
        audio.sample_rate,
        audio.len() as f32 / sample_rate
    );

    // the file's rate wins over the configured one
    config.sample_rate = sample_rate;
    config.validate()?;
    let params = config.filter_parameters()?;

    let scheduling: ThreadScheduling = config.scheduling();
    let mut filter = FilterLifecycle::new(config.tag.clone(), PartitionedConvolver::new())
        .with_scheduling(scheduling)
        .with_options(config.engine_options());

    let state = filter.setup(params, config.block_size);
    println!(
        "Filter: {} taps, latency {} samples, block {}",
        filter.kernel().len(),
        filter.latency_samples(),
        config.block_size
    );
    if state != ReadinessState::EngineReady {
        tracing::warn!(
            tag = %config.tag,
            %state,
            policy = ?scheduling.policy,
            "convolution engine unavailable, copying audio through unfiltered"
        );
    }

    let (left, right) = run_blocks(&mut filter, &audio.left, &audio.right, config.block_size);
    filter.release();

    println!("\nStats:");
    for (name, input, output) in [("Left", &audio.left, &left), ("Right", &audio.right, &right)] {
        println!(
            "  {name:<5} in: RMS {:.1} dB, Peak {:.1} dB | out: RMS {:.1} dB, Peak {:.1} dB",
            linear_to_db(rms(input)),
            linear_to_db(peak(input)),
            linear_to_db(rms(output)),
            linear_to_db(peak(output)),
        );
    }

    println!("\nWriting {}...", args.output.display());
    wav::write_stereo_f32(&args.output, &left, &right, audio.sample_rate)?;
    println!("Done!");

    Ok(())
}

/// Feed whole blocks through `filter`, zero-padding the last one.
fn run_blocks(
    filter: &mut FilterLifecycle<PartitionedConvolver>,
    left: &[f32],
    right: &[f32],
    block_size: usize,
) -> (Vec<f32>, Vec<f32>) {
    let mut out_left = Vec::with_capacity(left.len());
    let mut out_right = Vec::with_capacity(right.len());

    let (mut in_l, mut in_r) = (vec![0.0; block_size], vec![0.0; block_size]);
    let (mut buf_l, mut buf_r) = (vec![0.0; block_size], vec![0.0; block_size]);

    for (chunk_l, chunk_r) in left.chunks(block_size).zip(right.chunks(block_size)) {
        let n = chunk_l.len();
        in_l.fill(0.0);
        in_r.fill(0.0);
        in_l[..n].copy_from_slice(chunk_l);
        in_r[..n].copy_from_slice(chunk_r);

        filter.process(&in_l, &in_r, &mut buf_l, &mut buf_r);

        out_left.extend_from_slice(&buf_l[..n]);
        out_right.extend_from_slice(&buf_r[..n]);
    }

    (out_left, out_right)
}
