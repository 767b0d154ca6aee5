//! End-to-end tests: designed kernels through the partitioned engine,
//! checked against the direct convolvers in firline-core.

use firline_core::{FilterParameters, convolve, convolve_full, design_lowpass};
use firline_engine::{
    ConvolutionEngine, EngineLayout, FilterLifecycle, PartitionedConvolver, ReadinessState,
    ThreadScheduling,
};

const SAMPLE_RATE: f32 = 48000.0;

fn test_signal(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE;
            0.6 * (std::f32::consts::TAU * 440.0 * t).sin()
                + 0.3 * (std::f32::consts::TAU * 9000.0 * t).sin()
        })
        .collect()
}

/// Run `signal` through a lifecycle block by block, left channel only.
fn run_lifecycle(filter: &mut FilterLifecycle<PartitionedConvolver>, signal: &[f32]) -> Vec<f32> {
    let block = filter.block_size();
    let mut out = Vec::with_capacity(signal.len());
    let (mut l, mut r) = (vec![0.0; block], vec![0.0; block]);

    for chunk in signal.chunks(block) {
        let mut input = chunk.to_vec();
        input.resize(block, 0.0);
        filter.process(&input, &input, &mut l, &mut r);
        out.extend_from_slice(&l[..chunk.len()]);
    }
    out
}

#[test]
fn lifecycle_output_matches_linear_convolution() {
    let params = FilterParameters::new(SAMPLE_RATE, 2000.0, 1500.0).unwrap();
    let mut filter = FilterLifecycle::new("it", PartitionedConvolver::new())
        .with_scheduling(ThreadScheduling::normal());
    assert_eq!(filter.setup(params, 64), ReadinessState::EngineReady);

    let signal = test_signal(2048);
    let out = run_lifecycle(&mut filter, &signal);

    let mut expected = vec![0.0; signal.len() + filter.kernel().len() - 1];
    convolve_full(&signal, filter.kernel().taps(), &mut expected);

    let max_err = out
        .iter()
        .zip(&expected)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f32, f32::max);
    assert!(max_err < 1e-4, "max abs error {max_err}");
}

#[test]
fn engine_matches_reference_convolver() {
    let kernel = design_lowpass(SAMPLE_RATE, 3000.0, 3000.0);
    let m = kernel.len();

    // the reference convolver never reads signal[0]
    let mut signal = test_signal(m);
    signal[0] = 0.0;

    let mut reference = vec![0.0; 2 * m - 1];
    convolve(&signal, kernel.taps(), &mut reference);

    let mut engine = PartitionedConvolver::new();
    engine.configure(&EngineLayout::stereo(m, 32)).unwrap();
    engine.load_impulse(0, 0, 1.0, kernel.taps(), 0, m).unwrap();
    engine.load_impulse(1, 1, 1.0, kernel.taps(), 0, m).unwrap();
    engine.start(ThreadScheduling::normal()).unwrap();

    let mut padded = signal.clone();
    padded.resize(reference.len().next_multiple_of(32), 0.0);

    let mut out = Vec::new();
    let (mut l, mut r) = ([0.0; 32], [0.0; 32]);
    for block in padded.chunks_exact(32) {
        engine.process(&[block, block], &mut [&mut l, &mut r]).unwrap();
        out.extend_from_slice(&l);
    }

    for (n, (y, e)) in out.iter().zip(&reference).enumerate() {
        assert!((y - e).abs() < 1e-4, "sample {n}: {y} vs {e}");
    }
}

#[test]
fn high_frequency_is_removed() {
    let params = FilterParameters::new(SAMPLE_RATE, 1000.0, 1000.0).unwrap();
    let mut filter = FilterLifecycle::new("it", PartitionedConvolver::new())
        .with_scheduling(ThreadScheduling::normal());
    filter.setup(params, 256);

    let tone: Vec<f32> = (0..8192)
        .map(|n| (std::f32::consts::TAU * 8000.0 * n as f32 / SAMPLE_RATE).sin())
        .collect();
    let out = run_lifecycle(&mut filter, &tone);

    let settled = &out[filter.kernel().len()..];
    let peak = settled.iter().fold(0.0_f32, |p, &y| p.max(y.abs()));
    assert!(peak < 1e-3, "8 kHz leaked through at {peak}");
}

#[test]
fn fifo_scheduling_either_runs_or_falls_back() {
    let params = FilterParameters::new(SAMPLE_RATE, 1000.0, 2000.0).unwrap();
    let mut filter = FilterLifecycle::new("it", PartitionedConvolver::new())
        .with_scheduling(ThreadScheduling::fifo(1));

    // without rtprio the engine refuses to start and the filter passes through
    match filter.setup(params, 128) {
        ReadinessState::EngineReady => {
            assert_eq!(filter.engine_state(), Some(firline_engine::EngineState::Running));
        }
        ReadinessState::KernelBuilt => {
            let input = vec![0.25; 128];
            let (mut l, mut r) = (vec![0.0; 128], vec![0.0; 128]);
            filter.process(&input, &input, &mut l, &mut r);
            assert_eq!(l, input);
        }
        other => panic!("unexpected state {other}"),
    }
}
