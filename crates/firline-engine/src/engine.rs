//! Convolution engine control surface.
//!
//! [`ConvolutionEngine`] is the contract the filter lifecycle drives. It is
//! shaped after block-based partitioned convolvers: the engine is configured
//! with a channel layout and partition sizes, impulse responses are loaded per
//! output/input route, and processing runs on threads the engine owns.
//!
//! ## State machine
//!
//! ```text
//!            configure            start
//!   Idle ───────────────▶ Stopped ──────▶ Running
//!    ▲                     │  ▲             │
//!    └──── cleanup ────────┘  └──── stop ───┘
//! ```
//!
//! Control calls are synchronous and take `&mut self`, so one caller
//! serializes them. [`PartitionedConvolver`](crate::PartitionedConvolver) is
//! the bundled implementation; tests substitute recording mocks.

use crate::ThreadScheduling;
use serde::{Deserialize, Serialize};

/// Maximum number of input or output channels an engine layout may declare.
pub const MAX_CHANNELS: usize = 8;

/// Lifecycle state reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not configured. Only `configure` is accepted.
    Idle,
    /// Configured but not processing. Impulses can be loaded.
    Stopped,
    /// Worker thread running; `process` is accepted.
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Processing options applied before configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Prefer batched/vectorized execution where the engine offers it.
    #[serde(default)]
    pub vector_mode: bool,
}

impl EngineOptions {
    /// Options with batched/vectorized processing enabled.
    pub const VECTOR: Self = Self { vector_mode: true };
}

/// Channel layout and partitioning passed to [`ConvolutionEngine::configure`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineLayout {
    /// Number of input channels.
    pub inputs: usize,
    /// Number of output channels.
    pub outputs: usize,
    /// Longest impulse response, in samples, the engine must hold.
    pub max_size: usize,
    /// Smallest partition size in samples.
    pub block_min: usize,
    /// Largest partition size in samples.
    pub block_max: usize,
    /// Partition size used for the first (lowest-latency) partition.
    pub block_default: usize,
    /// Expected fraction of non-empty routes, `0.0` meaning dense.
    pub density: f32,
}

impl EngineLayout {
    /// Stereo layout with uniform partitions of `block_size` samples.
    pub fn stereo(max_size: usize, block_size: usize) -> Self {
        Self {
            inputs: 2,
            outputs: 2,
            max_size,
            block_min: block_size,
            block_max: block_size,
            block_default: block_size,
            density: 0.0,
        }
    }
}

/// Status returned by a failed engine control or processing call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The call is not allowed in the engine's current state.
    #[error("engine is {actual}, expected {expected}")]
    InvalidState {
        /// State the call requires.
        expected: EngineState,
        /// State the engine was in.
        actual: EngineState,
    },

    /// Channel layout or partition sizes were rejected.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Channel index outside the configured layout.
    #[error("channel out{output}/in{input} outside configured layout")]
    InvalidChannel {
        /// Output channel index.
        output: usize,
        /// Input channel index.
        input: usize,
    },

    /// Impulse data does not fit the configured maximum size.
    #[error("impulse range {offset}..{end} exceeds capacity {capacity}")]
    ImpulseOutOfRange {
        /// First sample position written.
        offset: usize,
        /// One past the last sample position written.
        end: usize,
        /// Configured maximum impulse length.
        capacity: usize,
    },

    /// The engine does not implement the requested configuration.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// A processed block did not match the partition size or channel count.
    #[error("block mismatch: expected {expected} samples x {channels} channels")]
    BlockMismatch {
        /// Partition size in samples.
        expected: usize,
        /// Channel count expected on that side.
        channels: usize,
    },

    /// The operating system refused the requested thread scheduling.
    #[error("thread scheduling denied: {0}")]
    SchedulingDenied(#[source] std::io::Error),

    /// The worker thread could not be created.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread exited or panicked while running.
    #[error("worker thread lost")]
    WorkerLost,

    /// Raw non-zero status reported by an external engine.
    #[error("engine status {0}")]
    Status(i32),
}

impl EngineError {
    /// Numeric status code for logs, negative for errors raised by this crate.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidState { .. } => -1,
            Self::InvalidLayout(_)
            | Self::InvalidChannel { .. }
            | Self::ImpulseOutOfRange { .. }
            | Self::BlockMismatch { .. } => -2,
            Self::Unsupported(_) => -3,
            Self::SchedulingDenied(_) => -4,
            Self::Spawn(_) => -5,
            Self::WorkerLost => -6,
            Self::Status(code) => *code,
        }
    }
}

/// Convenience result type for engine calls.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Control and processing surface of a block convolution engine.
///
/// ## Contract
///
/// - `configure` only succeeds from [`EngineState::Idle`].
/// - `load_impulse` only succeeds from [`EngineState::Stopped`]. Loading the
///   same route twice accumulates.
/// - `start` moves `Stopped` to `Running` and spawns the worker(s) with the
///   given scheduling. On failure the engine is left `Stopped` or `Idle`.
/// - `stop` is a no-op unless `Running`; `cleanup` releases the
///   configuration (stopping first if needed) and returns to `Idle`.
/// - `process` accepts one block per channel of exactly `block_default`
///   samples while `Running`.
pub trait ConvolutionEngine: Send {
    /// Set processing options. Takes effect at the next `configure`/`start`.
    fn set_options(&mut self, options: EngineOptions);

    /// Allocate partitions for `layout`.
    fn configure(&mut self, layout: &EngineLayout) -> Result<()>;

    /// Add `gain * data[..length]` to the impulse of route `input → output`,
    /// starting at sample `offset`.
    fn load_impulse(
        &mut self,
        output: usize,
        input: usize,
        gain: f32,
        data: &[f32],
        offset: usize,
        length: usize,
    ) -> Result<()>;

    /// Start processing on engine-owned threads.
    fn start(&mut self, scheduling: ThreadScheduling) -> Result<()>;

    /// Stop processing, keeping the configuration.
    fn stop(&mut self);

    /// Drop the configuration and internal buffers.
    fn cleanup(&mut self);

    /// Current state.
    fn state(&self) -> EngineState;

    /// Convolve one block: `inputs[i]` in, `outputs[o]` out.
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> Result<()>;
}

impl<E: ConvolutionEngine + ?Sized> ConvolutionEngine for Box<E> {
    fn set_options(&mut self, options: EngineOptions) {
        (**self).set_options(options);
    }

    fn configure(&mut self, layout: &EngineLayout) -> Result<()> {
        (**self).configure(layout)
    }

    fn load_impulse(
        &mut self,
        output: usize,
        input: usize,
        gain: f32,
        data: &[f32],
        offset: usize,
        length: usize,
    ) -> Result<()> {
        (**self).load_impulse(output, input, gain, data, offset, length)
    }

    fn start(&mut self, scheduling: ThreadScheduling) -> Result<()> {
        (**self).start(scheduling)
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn cleanup(&mut self) {
        (**self).cleanup();
    }

    fn state(&self) -> EngineState {
        (**self).state()
    }

    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> Result<()> {
        (**self).process(inputs, outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_layout_is_uniform_and_dense() {
        let layout = EngineLayout::stereo(1921, 256);
        assert_eq!((layout.inputs, layout.outputs), (2, 2));
        assert_eq!(layout.max_size, 1921);
        assert_eq!(layout.block_min, 256);
        assert_eq!(layout.block_max, 256);
        assert_eq!(layout.block_default, 256);
        assert_eq!(layout.density, 0.0);
    }

    #[test]
    fn status_codes() {
        let err = EngineError::InvalidState {
            expected: EngineState::Idle,
            actual: EngineState::Running,
        };
        assert_eq!(err.code(), -1);
        assert_eq!(err.to_string(), "engine is running, expected idle");
        assert_eq!(EngineError::Status(1).code(), 1);
        assert_eq!(EngineError::WorkerLost.code(), -6);
    }

    #[test]
    fn vector_options() {
        assert!(EngineOptions::VECTOR.vector_mode);
        assert!(!EngineOptions::default().vector_mode);
    }
}
