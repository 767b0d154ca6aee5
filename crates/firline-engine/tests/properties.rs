//! Property-based tests for the partitioned engine.
//!
//! For random impulses, partition sizes and signals the engine must agree
//! with plain linear convolution, whatever the partition count.

use firline_core::convolve_full;
use firline_engine::{
    ConvolutionEngine, EngineLayout, EngineOptions, PartitionedConvolver, ThreadScheduling,
};
use proptest::prelude::*;

fn run(
    taps: &[f32],
    signal: &[f32],
    block: usize,
    options: EngineOptions,
) -> Vec<f32> {
    let mut engine = PartitionedConvolver::new();
    engine.set_options(options);
    engine.configure(&EngineLayout::stereo(taps.len(), block)).unwrap();
    engine.load_impulse(1, 0, 1.0, taps, 0, taps.len()).unwrap();
    engine.start(ThreadScheduling::normal()).unwrap();

    let silent = vec![0.0; block];
    let (mut l, mut r) = (vec![0.0; block], vec![0.0; block]);
    let mut out = Vec::new();

    for chunk in signal.chunks(block) {
        let mut input = chunk.to_vec();
        input.resize(block, 0.0);
        engine.process(&[&input, &silent], &mut [&mut l, &mut r]).unwrap();
        // only route in0 -> out1 is loaded
        assert!(l.iter().all(|&y| y == 0.0));
        out.extend_from_slice(&r[..chunk.len()]);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Engine output equals direct linear convolution for any impulse length
    /// and partition size, in scalar and vector mode.
    #[test]
    fn engine_matches_linear_convolution(
        taps in prop::collection::vec(-1.0f32..=1.0f32, 1..200),
        signal in prop::collection::vec(-1.0f32..=1.0f32, 1..600),
        block_pow in 2u32..8,
        vector in any::<bool>(),
    ) {
        let block = 1usize << block_pow;
        let options = EngineOptions { vector_mode: vector };
        let out = run(&taps, &signal, block, options);

        let mut expected = vec![0.0; signal.len() + taps.len() - 1];
        convolve_full(&signal, &taps, &mut expected);

        for (n, (y, e)) in out.iter().zip(&expected).enumerate() {
            prop_assert!(
                (y - e).abs() < 1e-3,
                "sample {} differs: {} vs {} (block {}, taps {})",
                n, y, e, block, taps.len()
            );
        }
    }

    /// Scaling the impulse gain scales the output.
    #[test]
    fn gain_is_linear(
        taps in prop::collection::vec(-1.0f32..=1.0f32, 1..64),
        gain in -4.0f32..4.0f32,
    ) {
        let block = 16;
        let mut engine = PartitionedConvolver::new();
        engine.configure(&EngineLayout::stereo(taps.len(), block)).unwrap();
        engine.load_impulse(0, 0, gain, &taps, 0, taps.len()).unwrap();
        engine.start(ThreadScheduling::normal()).unwrap();

        let mut impulse = vec![0.0; block];
        impulse[0] = 1.0;
        let silent = vec![0.0; block];
        let (mut l, mut r) = (vec![0.0; block], vec![0.0; block]);

        let mut out = Vec::new();
        for n in 0..taps.len().div_ceil(block) {
            let input = if n == 0 { &impulse } else { &silent };
            engine.process(&[input, &silent], &mut [&mut l, &mut r]).unwrap();
            out.extend_from_slice(&l);
        }

        for (y, &h) in out.iter().zip(&taps) {
            prop_assert!((y - gain * h).abs() < 1e-4);
        }
    }
}
