//! Engine self-check against the direct reference convolver.

use super::common::FilterArgs;
use clap::Args;
use firline_core::convolve;
use firline_engine::{
    FilterLifecycle, PartitionedConvolver, ReadinessState, SchedulingPolicy, ThreadScheduling,
};

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Processing block size
    #[arg(long)]
    block_size: Option<usize>,

    /// Worker scheduling policy (fifo or normal)
    #[arg(long, default_value = "normal")]
    scheduling: SchedulingPolicy,

    /// Largest acceptable absolute difference
    #[arg(long, default_value = "1e-4")]
    tolerance: f32,
}

pub fn run(args: VerifyArgs) -> anyhow::Result<()> {
    let mut config = args.filter.resolve()?;
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }
    config.engine.scheduling = ThreadScheduling {
        policy: args.scheduling,
        ..config.engine.scheduling
    };
    config.validate()?;

    let params = config.filter_parameters()?;
    let mut filter = FilterLifecycle::new(config.tag.clone(), PartitionedConvolver::new())
        .with_scheduling(config.scheduling())
        .with_options(config.engine_options());

    let state = filter.setup(params, config.block_size);
    if state != ReadinessState::EngineReady {
        anyhow::bail!("convolution engine did not start (state: {state})");
    }

    let kernel = filter.kernel().clone();
    let m = kernel.len();
    let signal = test_signal(m, params.sample_rate());

    let mut reference = vec![0.0; 2 * m - 1];
    convolve(&signal, kernel.taps(), &mut reference);

    let engine_out = run_left(&mut filter, &signal, reference.len());
    filter.release();

    let (max_err, worst) = reference
        .iter()
        .zip(&engine_out)
        .map(|(r, e)| (r - e).abs())
        .enumerate()
        .fold((0.0_f32, 0), |(max, at), (n, err)| if err > max { (err, n) } else { (max, at) });

    println!(
        "Kernel: {} taps, block {} ({} blocks)",
        m,
        config.block_size,
        reference.len().div_ceil(config.block_size)
    );
    println!("Max abs error: {max_err:.3e} at sample {worst} (tolerance {:.1e})", args.tolerance);

    if max_err > args.tolerance {
        anyhow::bail!("engine output differs from reference by {max_err:.3e}");
    }
    println!("OK");
    Ok(())
}

/// Two-tone test signal of `len` samples with `signal[0] == 0`.
///
/// The reference convolver never reads the first sample, so it is kept at
/// zero for both paths to agree.
fn test_signal(len: usize, sample_rate: f32) -> Vec<f32> {
    let tau = std::f32::consts::TAU;
    (0..len)
        .map(|n| {
            let t = n as f32 / sample_rate;
            0.5 * (tau * 220.0 * t).sin() + 0.25 * (tau * 0.37 * sample_rate * t).sin()
        })
        .collect()
}

/// Left-channel engine output for `signal` followed by silence, `len` samples.
fn run_left(
    filter: &mut FilterLifecycle<PartitionedConvolver>,
    signal: &[f32],
    len: usize,
) -> Vec<f32> {
    let block = filter.block_size();
    let mut padded = signal.to_vec();
    padded.resize(len.next_multiple_of(block), 0.0);

    let (mut l, mut r) = (vec![0.0; block], vec![0.0; block]);
    let mut out = Vec::with_capacity(padded.len());
    for chunk in padded.chunks_exact(block) {
        filter.process(chunk, chunk, &mut l, &mut r);
        out.extend_from_slice(&l);
    }
    out.truncate(len);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_starts_at_zero() {
        let s = test_signal(100, 48000.0);
        assert_eq!(s.len(), 100);
        assert_eq!(s[0], 0.0);
        assert!(s.iter().any(|&v| v != 0.0));
    }
}
