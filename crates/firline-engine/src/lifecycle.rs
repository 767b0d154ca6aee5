//! Filter lifecycle: parameters to kernel to running engine, and back down.
//!
//! [`FilterLifecycle`] is what an audio host holds. It owns the engine for its
//! whole life, tracks one [`ReadinessState`], and degrades to pass-through
//! whenever the engine is not ready.
//!
//! ```text
//!  Uninitialized ──set_parameters──▶ KernelBuilt ──configure ok──▶ EngineReady
//!                                        ▲                            │
//!                                        └──── configure failed ──────┘
//!                                              engine error
//!                                              set_parameters
//!
//!  any state ──release / drop──▶ Released
//! ```

use crate::ThreadScheduling;
use crate::adapter::{ConvolutionEngineAdapter, SetupError};
use crate::engine::{ConvolutionEngine, EngineOptions, EngineState};
use firline_core::{FilterParameters, Kernel};

/// Where a [`FilterLifecycle`] is in its setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadinessState {
    /// No kernel yet.
    Uninitialized,
    /// Kernel designed; engine not running. Audio passes through.
    KernelBuilt,
    /// Engine running with the current kernel.
    EngineReady,
    /// Engine released. Terminal.
    Released,
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::KernelBuilt => "kernel built",
            Self::EngineReady => "engine ready",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

/// Stereo lowpass FIR filter running on a convolution engine.
///
/// # Example
///
/// ```rust
/// use firline_core::FilterParameters;
/// use firline_engine::{FilterLifecycle, PartitionedConvolver, ReadinessState, ThreadScheduling};
///
/// let mut filter = FilterLifecycle::new("doc", PartitionedConvolver::new())
///     .with_scheduling(ThreadScheduling::normal());
///
/// filter.set_parameters(FilterParameters::new(48000.0, 1000.0, 2000.0).unwrap());
/// filter.set_block_size(256);
/// assert_eq!(filter.configure(), ReadinessState::EngineReady);
///
/// let input = vec![0.0; 256];
/// let (mut left, mut right) = (vec![0.0; 256], vec![0.0; 256]);
/// filter.process(&input, &input, &mut left, &mut right);
///
/// filter.release();
/// assert_eq!(filter.state(), ReadinessState::Released);
/// ```
pub struct FilterLifecycle<E: ConvolutionEngine> {
    state: ReadinessState,
    params: Option<FilterParameters>,
    kernel: Kernel,
    block_size: usize,
    /// `None` once released.
    adapter: Option<ConvolutionEngineAdapter<E>>,
    tag: String,
}

impl<E: ConvolutionEngine> FilterLifecycle<E> {
    /// Take ownership of `engine`. `tag` identifies this filter in logs.
    pub fn new(tag: impl Into<String>, engine: E) -> Self {
        let tag = tag.into();
        Self {
            state: ReadinessState::Uninitialized,
            params: None,
            kernel: Kernel::default(),
            block_size: 0,
            adapter: Some(ConvolutionEngineAdapter::new(engine, tag.clone())),
            tag,
        }
    }

    /// Scheduling for the engine worker.
    pub fn with_scheduling(mut self, scheduling: ThreadScheduling) -> Self {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.set_scheduling(scheduling);
        }
        self
    }

    /// Engine options used at configure.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.adapter = self.adapter.take().map(|a| a.with_options(options));
        self
    }

    /// Design a new kernel from `params`.
    ///
    /// A running engine is stopped first; call [`configure`](Self::configure)
    /// to bring it back with the new kernel.
    pub fn set_parameters(&mut self, params: FilterParameters) -> ReadinessState {
        let Some(adapter) = self.adapter.as_mut() else {
            tracing::warn!(tag = %self.tag, "set_parameters after release ignored");
            return self.state;
        };

        if self.state == ReadinessState::EngineReady {
            adapter.shutdown();
        }

        self.kernel = params.design();
        self.params = Some(params);
        self.state = ReadinessState::KernelBuilt;

        tracing::debug!(
            tag = %self.tag,
            sample_rate = params.sample_rate(),
            cutoff = params.cutoff(),
            transition_band = params.transition_band(),
            taps = self.kernel.len(),
            "kernel built"
        );
        self.state
    }

    /// Samples per block for the next [`configure`](Self::configure).
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size;
    }

    /// Stop and clean any previous engine, then configure and start it with
    /// the current kernel and block size.
    ///
    /// With no kernel or a zero block size the engine is not configured; a
    /// running engine is shut down so it never outlives
    /// [`ReadinessState::EngineReady`].
    pub fn configure(&mut self) -> ReadinessState {
        let Some(adapter) = self.adapter.as_mut() else {
            tracing::warn!(tag = %self.tag, "configure after release ignored");
            return self.state;
        };

        match adapter.configure_and_start(&self.kernel, self.block_size) {
            Ok(()) => self.state = ReadinessState::EngineReady,
            Err(SetupError::NotReady { .. }) => {
                if self.state == ReadinessState::EngineReady {
                    adapter.shutdown();
                }
                self.state = if self.kernel.is_empty() {
                    ReadinessState::Uninitialized
                } else {
                    ReadinessState::KernelBuilt
                };
            }
            Err(err) => {
                tracing::debug!(tag = %self.tag, error = %err, "filter passes audio through");
                self.state = ReadinessState::KernelBuilt;
            }
        }
        self.state
    }

    /// [`set_parameters`](Self::set_parameters), [`set_block_size`](Self::set_block_size)
    /// and [`configure`](Self::configure) in one call.
    pub fn setup(&mut self, params: FilterParameters, block_size: usize) -> ReadinessState {
        if self.adapter.is_none() {
            tracing::warn!(tag = %self.tag, "setup after release ignored");
            return self.state;
        }
        self.set_parameters(params);
        self.set_block_size(block_size);
        self.configure()
    }

    /// Filter one stereo block.
    ///
    /// Runs through the engine when ready and all four buffers are exactly
    /// `block_size` long; otherwise copies input to output. An engine failure
    /// shuts the engine down and drops back to [`ReadinessState::KernelBuilt`].
    pub fn process(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        debug_assert_eq!(left_in.len(), left_out.len());
        debug_assert_eq!(right_in.len(), right_out.len());

        let whole_block = [left_in.len(), right_in.len(), left_out.len(), right_out.len()]
            .iter()
            .all(|&len| len == self.block_size);

        if self.state == ReadinessState::EngineReady && whole_block {
            if let Some(adapter) = self.adapter.as_mut() {
                match adapter.process([left_in, right_in], [&mut *left_out, &mut *right_out]) {
                    Ok(()) => return,
                    Err(err) => {
                        tracing::warn!(
                            tag = %self.tag,
                            code = err.code(),
                            error = %err,
                            "convolution engine failed, passing audio through"
                        );
                        adapter.shutdown();
                        self.state = ReadinessState::KernelBuilt;
                    }
                }
            }
        }

        pass_through(left_in, left_out);
        pass_through(right_in, right_out);
    }

    /// Stop, clean up and drop the engine. Idempotent.
    pub fn release(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.shutdown();
            tracing::debug!(tag = %self.tag, "engine released");
        }
        self.state = ReadinessState::Released;
    }

    /// Current readiness.
    pub fn state(&self) -> ReadinessState {
        self.state
    }

    /// Current kernel; empty before the first [`set_parameters`](Self::set_parameters).
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Parameters the current kernel was designed from.
    pub fn parameters(&self) -> Option<FilterParameters> {
        self.params
    }

    /// Block size for the next configure.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Log tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Group delay of the linear-phase kernel, `M/2` samples.
    pub fn latency_samples(&self) -> usize {
        self.kernel.center()
    }

    /// State of the owned engine, `None` after release.
    pub fn engine_state(&self) -> Option<EngineState> {
        self.adapter.as_ref().map(|a| a.engine().state())
    }

    /// The owned engine, `None` after release.
    pub fn engine(&self) -> Option<&E> {
        self.adapter.as_ref().map(ConvolutionEngineAdapter::engine)
    }
}

impl<E: ConvolutionEngine> Drop for FilterLifecycle<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E: ConvolutionEngine> std::fmt::Debug for FilterLifecycle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterLifecycle")
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("taps", &self.kernel.len())
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

fn pass_through(input: &[f32], output: &mut [f32]) {
    for (dst, &src) in output.iter_mut().zip(input) {
        *dst = src;
    }
}
