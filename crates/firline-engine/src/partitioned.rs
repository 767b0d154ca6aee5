//! Partitioned convolution engine running on a worker thread.
//!
//! Impulse responses are kept per route (`output * inputs + input`) in the
//! time domain while the engine is stopped. `start` builds one
//! [`FFTConvolver`] per loaded route, so every start begins from silence, and
//! moves them into a named worker thread. The convolver partitions the impulse
//! into blocks of the configured partition size and adds no latency beyond the
//! impulse response itself.
//!
//! ## Threading
//!
//! The worker applies the requested [`ThreadScheduling`] before reporting
//! back. `process` hands a pair of preallocated buffers to the worker over a
//! bounded channel and waits for them to come back filled, so steady-state
//! processing does not allocate. `stop` joins the worker.

use crate::engine::{
    ConvolutionEngine, EngineError, EngineLayout, EngineOptions, EngineState, MAX_CHANNELS, Result,
};
use crate::ThreadScheduling;
use crossbeam_channel::{Receiver, Sender, bounded};
use fft_convolution::Convolution;
use fft_convolution::fft_convolver::FFTConvolver;
use std::thread::JoinHandle;

/// Name given to worker threads.
const WORKER_NAME: &str = "firline-conv";

/// Routing matrix for one configured layout.
struct Routes {
    inputs: usize,
    outputs: usize,
    /// Partition size in samples.
    partition: usize,
    /// Longest impulse a route can hold, in whole partitions.
    capacity: usize,
    /// Time-domain impulse per route, `capacity` long once loaded.
    impulses: Vec<Option<Vec<f32>>>,
}

impl Routes {
    fn new(layout: &EngineLayout) -> Self {
        let partition = layout.block_default;
        Self {
            inputs: layout.inputs,
            outputs: layout.outputs,
            partition,
            capacity: layout.max_size.div_ceil(partition) * partition,
            impulses: vec![None; layout.inputs * layout.outputs],
        }
    }

    fn partition_count(&self) -> usize {
        self.capacity / self.partition
    }

    /// Accumulate `gain * data` into a route starting at `offset`.
    fn add_impulse(&mut self, route: usize, gain: f32, data: &[f32], offset: usize) {
        let capacity = self.capacity;
        let impulse = self.impulses[route].get_or_insert_with(|| vec![0.0; capacity]);
        for (dst, &src) in impulse[offset..offset + data.len()].iter_mut().zip(data) {
            *dst += gain * src;
        }
    }

    /// Convolvers for every loaded route, with no signal history.
    fn convolvers(&self) -> Convolvers {
        let routes = self
            .impulses
            .iter()
            .map(|impulse| {
                impulse
                    .as_deref()
                    .map(|h| FFTConvolver::init(h, self.partition, self.capacity))
            })
            .collect();

        Convolvers {
            inputs: self.inputs,
            partition: self.partition,
            routes,
            scratch: vec![0.0; self.partition],
        }
    }

    fn buffers(&self) -> BlockBuffers {
        BlockBuffers {
            input: vec![0.0; self.inputs * self.partition],
            output: vec![0.0; self.outputs * self.partition],
        }
    }
}

/// Per-route convolvers, owned by the worker while running.
struct Convolvers {
    inputs: usize,
    partition: usize,
    routes: Vec<Option<FFTConvolver>>,
    scratch: Vec<f32>,
}

impl Convolvers {
    fn process(&mut self, block: &mut BlockBuffers) {
        let p = self.partition;

        for (out, output) in block.output.chunks_exact_mut(p).enumerate() {
            output.fill(0.0);

            for (input, signal) in block.input.chunks_exact(p).enumerate() {
                let Some(route) = self.routes[out * self.inputs + input].as_mut() else {
                    continue;
                };
                route.process(signal, &mut self.scratch);
                for (y, &s) in output.iter_mut().zip(&self.scratch) {
                    *y += s;
                }
            }
        }
    }
}

/// Interleaved-by-channel buffers exchanged with the worker.
struct BlockBuffers {
    input: Vec<f32>,
    output: Vec<f32>,
}

enum Job {
    Process(BlockBuffers),
    Stop,
}

struct Worker {
    jobs: Sender<Job>,
    done: Receiver<BlockBuffers>,
    handle: JoinHandle<()>,
}

/// Partitioned FFT convolver running on its own worker thread.
///
/// Supports up to [`MAX_CHANNELS`] inputs and outputs with an independent
/// impulse response per route. Only uniform partitioning is implemented:
/// `block_min`, `block_max` and `block_default` must be equal. The engine has
/// a single processing path, so [`EngineOptions`] are recorded but do not
/// change the output.
///
/// # Example
///
/// ```rust
/// use firline_engine::{
///     ConvolutionEngine, EngineLayout, PartitionedConvolver, ThreadScheduling,
/// };
///
/// let mut engine = PartitionedConvolver::new();
/// engine.configure(&EngineLayout::stereo(3, 4)).unwrap();
/// engine.load_impulse(0, 0, 1.0, &[0.5, 0.25, 0.125], 0, 3).unwrap();
/// engine.load_impulse(1, 1, 1.0, &[1.0], 0, 1).unwrap();
/// engine.start(ThreadScheduling::normal()).unwrap();
///
/// let (left, right) = ([1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]);
/// let (mut out_l, mut out_r) = ([0.0; 4], [0.0; 4]);
/// engine
///     .process(&[&left, &right], &mut [&mut out_l, &mut out_r])
///     .unwrap();
///
/// assert!((out_l[1] - 0.25).abs() < 1e-6);
/// assert!((out_r[1] - 1.0).abs() < 1e-6);
/// ```
pub struct PartitionedConvolver {
    state: EngineState,
    options: EngineOptions,
    routes: Option<Routes>,
    buffers: Option<BlockBuffers>,
    worker: Option<Worker>,
}

impl PartitionedConvolver {
    /// Create an idle engine.
    pub fn new() -> Self {
        Self {
            state: EngineState::Idle,
            options: EngineOptions::default(),
            routes: None,
            buffers: None,
            worker: None,
        }
    }

    /// Options recorded by the last `set_options`.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Partition size in samples, if configured.
    pub fn partition_size(&self) -> Option<usize> {
        self.routes.as_ref().map(|r| r.partition)
    }

    /// Number of partitions per impulse, if configured.
    pub fn partition_count(&self) -> Option<usize> {
        self.routes.as_ref().map(Routes::partition_count)
    }

    fn expect_state(&self, expected: EngineState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Stop the worker without logging; used by `stop`, `cleanup` and drop.
    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // a dead worker has already dropped its receiver
        let _ = worker.jobs.send(Job::Stop);
        drop(worker.done);

        if worker.handle.join().is_err() {
            tracing::warn!("convolution worker panicked");
        }
        self.buffers = None;
        self.state = EngineState::Stopped;
    }
}

impl Default for PartitionedConvolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PartitionedConvolver {
    fn drop(&mut self) {
        self.join_worker();
    }
}

impl std::fmt::Debug for PartitionedConvolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedConvolver")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("partition_size", &self.partition_size())
            .field("partition_count", &self.partition_count())
            .finish_non_exhaustive()
    }
}

impl ConvolutionEngine for PartitionedConvolver {
    fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    fn configure(&mut self, layout: &EngineLayout) -> Result<()> {
        self.expect_state(EngineState::Idle)?;
        validate_layout(layout)?;

        self.routes = Some(Routes::new(layout));
        self.state = EngineState::Stopped;

        tracing::debug!(
            inputs = layout.inputs,
            outputs = layout.outputs,
            max_size = layout.max_size,
            partition = layout.block_default,
            "partitioned convolver configured"
        );
        Ok(())
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
        self.expect_state(EngineState::Stopped)?;
        let Some(routes) = self.routes.as_mut() else {
            return Err(EngineError::InvalidState {
                expected: EngineState::Stopped,
                actual: EngineState::Idle,
            });
        };

        if output >= routes.outputs || input >= routes.inputs {
            return Err(EngineError::InvalidChannel { output, input });
        }

        let capacity = routes.capacity;
        let end = offset.saturating_add(length);
        if length > data.len() || end > capacity {
            return Err(EngineError::ImpulseOutOfRange {
                offset,
                end,
                capacity,
            });
        }

        routes.add_impulse(output * routes.inputs + input, gain, &data[..length], offset);
        Ok(())
    }

    fn start(&mut self, scheduling: ThreadScheduling) -> Result<()> {
        self.expect_state(EngineState::Stopped)?;
        let Some(routes) = self.routes.as_ref() else {
            return Err(EngineError::InvalidState {
                expected: EngineState::Stopped,
                actual: EngineState::Idle,
            });
        };

        let mut convolvers = routes.convolvers();
        let buffers = routes.buffers();

        let (jobs_tx, jobs_rx) = bounded::<Job>(1);
        let (done_tx, done_rx) = bounded::<BlockBuffers>(1);
        let (ready_tx, ready_rx) = bounded::<std::io::Result<i32>>(1);

        let handle = std::thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || {
                let applied = scheduling.apply_to_current_thread();
                let accepted = applied.is_ok();
                let _ = ready_tx.send(applied);

                if accepted {
                    while let Ok(Job::Process(mut block)) = jobs_rx.recv() {
                        convolvers.process(&mut block);
                        if done_tx.send(block).is_err() {
                            break;
                        }
                    }
                }
            })
            .map_err(EngineError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(priority)) => {
                tracing::debug!(
                    policy = ?scheduling.policy,
                    priority,
                    "convolution worker started"
                );
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(EngineError::SchedulingDenied(err));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(EngineError::WorkerLost);
            }
        }

        self.buffers = Some(buffers);
        self.worker = Some(Worker {
            jobs: jobs_tx,
            done: done_rx,
            handle,
        });
        self.state = EngineState::Running;
        Ok(())
    }

    fn stop(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        self.join_worker();
        tracing::debug!("convolution worker stopped");
    }

    fn cleanup(&mut self) {
        self.join_worker();
        self.routes = None;
        self.buffers = None;
        self.state = EngineState::Idle;
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> Result<()> {
        self.expect_state(EngineState::Running)?;
        let routes = self.routes.as_ref().ok_or(EngineError::WorkerLost)?;
        let (p, n_in, n_out) = (routes.partition, routes.inputs, routes.outputs);

        if inputs.len() != n_in || inputs.iter().any(|ch| ch.len() != p) {
            return Err(EngineError::BlockMismatch {
                expected: p,
                channels: n_in,
            });
        }
        if outputs.len() != n_out || outputs.iter().any(|ch| ch.len() != p) {
            return Err(EngineError::BlockMismatch {
                expected: p,
                channels: n_out,
            });
        }

        let (Some(worker), Some(mut block)) = (self.worker.as_ref(), self.buffers.take()) else {
            return Err(EngineError::WorkerLost);
        };

        for (dst, src) in block.input.chunks_exact_mut(p).zip(inputs) {
            dst.copy_from_slice(src);
        }

        if worker.jobs.send(Job::Process(block)).is_err() {
            return Err(EngineError::WorkerLost);
        }
        let block = worker.done.recv().map_err(|_| EngineError::WorkerLost)?;

        for (dst, src) in outputs.iter_mut().zip(block.output.chunks_exact(p)) {
            dst.copy_from_slice(src);
        }

        self.buffers = Some(block);
        Ok(())
    }
}

fn validate_layout(layout: &EngineLayout) -> Result<()> {
    if layout.inputs == 0
        || layout.outputs == 0
        || layout.inputs > MAX_CHANNELS
        || layout.outputs > MAX_CHANNELS
    {
        return Err(EngineError::InvalidLayout(format!(
            "{} in / {} out, each must be 1..={MAX_CHANNELS}",
            layout.inputs, layout.outputs
        )));
    }

    if layout.max_size == 0 {
        return Err(EngineError::InvalidLayout("max_size must be > 0".into()));
    }

    if layout.block_default == 0
        || layout.block_min > layout.block_default
        || layout.block_default > layout.block_max
    {
        return Err(EngineError::InvalidLayout(format!(
            "partition sizes min={} default={} max={} must satisfy 0 < min <= default <= max",
            layout.block_min, layout.block_default, layout.block_max
        )));
    }

    if !(0.0..=1.0).contains(&layout.density) {
        return Err(EngineError::InvalidLayout(format!(
            "density {} outside [0, 1]",
            layout.density
        )));
    }

    if layout.block_min != layout.block_max {
        return Err(EngineError::Unsupported(
            "non-uniform partitioning (block_min != block_max)".into(),
        ));
    }

    Ok(())
}
