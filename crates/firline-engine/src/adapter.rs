//! Drives a [`ConvolutionEngine`] from a designed kernel to a running engine.
//!
//! [`ConvolutionEngineAdapter::configure_and_start`] is the only path that
//! brings an engine up. It always tears down whatever the engine held before,
//! loads the kernel on both stereo routes, and starts the worker. Every failure
//! is logged and leaves the engine either unconfigured or stopped, never half
//! running, so the caller can keep passing audio through and try again later.

use crate::engine::{ConvolutionEngine, EngineError, EngineLayout, EngineOptions, EngineState};
use crate::ThreadScheduling;
use firline_core::Kernel;

/// Stereo channel count the adapter configures.
const CHANNELS: usize = 2;

/// Why [`ConvolutionEngineAdapter::configure_and_start`] did not reach ready.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Empty kernel or zero block size; the engine was not touched.
    #[error("nothing to configure (kernel length {kernel_len}, block size {block_size})")]
    NotReady {
        /// Taps in the kernel.
        kernel_len: usize,
        /// Requested block size.
        block_size: usize,
    },

    /// The engine rejected the channel layout.
    #[error("can't initialise convolution engine: {0}")]
    Configure(#[source] EngineError),

    /// Loading the impulse for one channel failed.
    #[error("can't load impulse for channel {channel}: {source}")]
    LoadImpulse {
        /// Channel index, 0 = left.
        channel: usize,
        /// Engine status.
        #[source]
        source: EngineError,
    },

    /// The engine was configured and loaded but would not start.
    #[error("can't start convolution engine: {0}")]
    Start(#[source] EngineError),
}

impl SetupError {
    /// Engine status code behind this error, `0` when the engine was not called.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotReady { .. } => 0,
            Self::Configure(e) | Self::LoadImpulse { source: e, .. } | Self::Start(e) => e.code(),
        }
    }
}

/// Owns a convolution engine and tracks whether it is ready to process.
pub struct ConvolutionEngineAdapter<E: ConvolutionEngine> {
    engine: E,
    tag: String,
    scheduling: ThreadScheduling,
    options: EngineOptions,
    ready: bool,
}

impl<E: ConvolutionEngine> ConvolutionEngineAdapter<E> {
    /// Wrap `engine`. `tag` is attached to every log event.
    pub fn new(engine: E, tag: impl Into<String>) -> Self {
        Self {
            engine,
            tag: tag.into(),
            scheduling: ThreadScheduling::default(),
            options: EngineOptions::VECTOR,
            ready: false,
        }
    }

    /// Use `scheduling` for the engine worker at the next start.
    pub fn with_scheduling(mut self, scheduling: ThreadScheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Use `options` at the next configure.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Change the scheduling used at the next start.
    pub fn set_scheduling(&mut self, scheduling: ThreadScheduling) {
        self.scheduling = scheduling;
    }

    /// Scheduling used at the next start.
    pub fn scheduling(&self) -> ThreadScheduling {
        self.scheduling
    }

    /// Engine options applied at the next configure.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Log tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether the last `configure_and_start` left the engine running.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Tear down, configure a stereo layout for `kernel`, load it on both
    /// channels and start.
    ///
    /// An empty kernel or a zero `block_size` returns
    /// [`SetupError::NotReady`] without calling the engine.
    pub fn configure_and_start(
        &mut self,
        kernel: &Kernel,
        block_size: usize,
    ) -> Result<(), SetupError> {
        self.ready = false;

        if kernel.is_empty() || block_size == 0 {
            return Err(SetupError::NotReady {
                kernel_len: kernel.len(),
                block_size,
            });
        }

        let tag = self.tag.as_str();

        self.engine.stop();
        self.engine.cleanup();
        self.engine.set_options(self.options);

        let layout = EngineLayout::stereo(kernel.len(), block_size);
        if let Err(err) = self.engine.configure(&layout) {
            tracing::warn!(
                tag,
                code = err.code(),
                error = %err,
                "can't initialise convolution engine"
            );
            return Err(SetupError::Configure(err));
        }

        for channel in 0..CHANNELS {
            if let Err(err) = self
                .engine
                .load_impulse(channel, channel, 1.0, kernel.taps(), 0, kernel.len())
            {
                let side = if channel == 0 { "left" } else { "right" };
                tracing::debug!(tag, code = err.code(), error = %err, "can't load {side} impulse");
                return Err(SetupError::LoadImpulse { channel, source: err });
            }
        }

        if let Err(err) = self.engine.start(self.scheduling) {
            tracing::debug!(
                tag,
                code = err.code(),
                error = %err,
                policy = ?self.scheduling.policy,
                priority = self.scheduling.priority,
                "can't start convolution engine"
            );
            self.engine.stop();
            self.engine.cleanup();
            return Err(SetupError::Start(err));
        }

        self.ready = true;
        tracing::debug!(tag, kernel_len = kernel.len(), block_size, "engine is ready");
        Ok(())
    }

    /// Stop and clean up the engine.
    pub fn shutdown(&mut self) {
        self.ready = false;
        self.engine.stop();
        self.engine.cleanup();
    }

    /// Run one stereo block through the engine.
    ///
    /// Fails with [`EngineError::InvalidState`] when not ready.
    pub fn process(
        &mut self,
        inputs: [&[f32]; CHANNELS],
        outputs: [&mut [f32]; CHANNELS],
    ) -> Result<(), EngineError> {
        if !self.ready {
            return Err(EngineError::InvalidState {
                expected: EngineState::Running,
                actual: self.engine.state(),
            });
        }
        let [left, right] = outputs;
        self.engine.process(&inputs, &mut [left, right])
    }
}

impl<E: ConvolutionEngine> Drop for ConvolutionEngineAdapter<E> {
    fn drop(&mut self) {
        if self.engine.state() != EngineState::Idle {
            self.shutdown();
        }
    }
}

impl<E: ConvolutionEngine + std::fmt::Debug> std::fmt::Debug for ConvolutionEngineAdapter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvolutionEngineAdapter")
            .field("engine", &self.engine)
            .field("tag", &self.tag)
            .field("scheduling", &self.scheduling)
            .field("options", &self.options)
            .field("ready", &self.ready)
            .finish()
    }
}
