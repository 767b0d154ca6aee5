//! Firline Engine - real-time convolution for designed FIR kernels
//!
//! Runs kernels from `firline-core` on a block convolution engine that owns
//! its own worker thread, and wraps the engine in a lifecycle that an audio
//! host can drive without ever seeing a failure: anything that goes wrong
//! degrades to pass-through.
//!
//! # Layers
//!
//! - [`ConvolutionEngine`] - Control surface: configure, load impulses, start, stop
//! - [`PartitionedConvolver`] - Uniformly-partitioned FFT engine on a worker thread
//! - [`ThreadScheduling`] - FIFO or normal scheduling for the worker
//! - [`ConvolutionEngineAdapter`] - Brings an engine from a kernel to running
//! - [`FilterLifecycle`] - Readiness state, pass-through fallback, guaranteed release
//!
//! # Example
//!
//! ```rust
//! use firline_core::FilterParameters;
//! use firline_engine::{FilterLifecycle, PartitionedConvolver, ReadinessState, ThreadScheduling};
//!
//! let params = FilterParameters::new(48000.0, 1000.0, 1000.0).unwrap();
//! let mut filter = FilterLifecycle::new("example", PartitionedConvolver::new())
//!     .with_scheduling(ThreadScheduling::normal());
//!
//! assert_eq!(filter.setup(params, 128), ReadinessState::EngineReady);
//! ```

pub mod adapter;
pub mod engine;
pub mod lifecycle;
pub mod partitioned;
pub mod scheduling;

pub use adapter::{ConvolutionEngineAdapter, SetupError};
pub use engine::{
    ConvolutionEngine, EngineError, EngineLayout, EngineOptions, EngineState, MAX_CHANNELS,
};
pub use lifecycle::{FilterLifecycle, ReadinessState};
pub use partitioned::PartitionedConvolver;
pub use scheduling::{SchedulingPolicy, ThreadScheduling};
