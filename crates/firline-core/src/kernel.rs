//! Windowed-sinc lowpass kernel design.
//!
//! Builds linear-phase FIR lowpass kernels from three numbers: sample rate,
//! cutoff frequency and transition bandwidth. The ideal (infinite) sinc
//! response is truncated to `M + 1` taps, centered at `M / 2`, tapered by a
//! Blackman window and normalized to unity DC gain.
//!
//! ```text
//! b  = transition_band / rate
//! M  = ceil(4 / b), rounded up to even
//! fc = cutoff / rate
//!
//! h[n] = sin(2π·fc·(n − M/2)) / (n − M/2)      n ≠ M/2
//! h[n] = 2π·fc                                 n = M/2
//! w[n] = 0.42 − 0.5·cos(2πn/M) + 0.08·cos(4πn/M)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use firline_core::{FilterParameters, design_lowpass};
//!
//! let kernel = design_lowpass(48000.0, 1000.0, 100.0);
//! assert_eq!(kernel.len(), 1921);
//! assert_eq!(kernel.order(), 1920);
//!
//! // Validated construction
//! let params = FilterParameters::new(48000.0, 1000.0, 100.0).unwrap();
//! assert_eq!(params.design(), kernel);
//! ```
//!
//! # Kernel size
//!
//! The order grows as `4 · rate / transition_band` and is not bounded here.
//! Very narrow transition bands produce very long kernels; callers that need
//! a ceiling use [`FilterParameters::check_kernel_len`].
//!
//! # Reference
//!
//! Steven W. Smith, "The Scientist and Engineer's Guide to Digital Signal
//! Processing", chapter 16: Windowed-Sinc Filters.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::f32::consts::PI;
use libm::{ceilf, cosf, sinf};

/// FIR kernel taps.
///
/// A designed kernel always has odd length `M + 1` with `M` even, so it is
/// symmetric around the center tap at index `M / 2`. The default value is the
/// empty kernel, meaning "not built yet".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kernel {
    taps: Vec<f32>,
}

impl Kernel {
    /// Wrap raw taps. No shape invariant is checked.
    pub fn from_taps(taps: Vec<f32>) -> Self {
        Self { taps }
    }

    /// The tap values.
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// Number of taps.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// True when no kernel has been built.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Filter order `M` (one less than the number of taps).
    pub fn order(&self) -> usize {
        self.taps.len().saturating_sub(1)
    }

    /// Index of the center tap, `M / 2`.
    ///
    /// This is also the group delay of the filter in samples.
    pub fn center(&self) -> usize {
        self.order() / 2
    }

    /// Sum of all taps, i.e. the gain at 0 Hz.
    pub fn dc_gain(&self) -> f32 {
        self.taps.iter().sum()
    }

    /// Consume the kernel and return its taps.
    pub fn into_taps(self) -> Vec<f32> {
        self.taps
    }
}

impl AsRef<[f32]> for Kernel {
    fn as_ref(&self) -> &[f32] {
        &self.taps
    }
}

/// Filter order `M` for a given sample rate and transition bandwidth.
///
/// `M = ceil(4 / b)` with `b = transition_band / rate`, bumped to the next
/// even integer when odd.
pub fn kernel_order(rate: f32, transition_band: f32) -> usize {
    let b = transition_band / rate;
    let m = ceilf(4.0 / b) as usize;

    if m % 2 == 0 { m } else { m + 1 }
}

/// Blackman window value at tap `n` of an order-`m` kernel.
#[inline]
pub fn blackman(n: usize, m: usize) -> f32 {
    let x = n as f32 / m as f32;
    0.42 - 0.5 * cosf(2.0 * PI * x) + 0.08 * cosf(4.0 * PI * x)
}

/// Design a windowed-sinc lowpass kernel.
///
/// # Arguments
/// * `rate` - Sample rate in Hz (> 0)
/// * `cutoff` - Cutoff frequency in Hz, in `(0, rate / 2)`
/// * `transition_band` - Transition bandwidth in Hz (> 0)
///
/// Pure and deterministic. Inputs are not validated; use
/// [`FilterParameters::new`] when they come from outside.
pub fn design_lowpass(rate: f32, cutoff: f32, transition_band: f32) -> Kernel {
    let m = kernel_order(rate, transition_band);
    let half = (m / 2) as i64;
    let fc = cutoff / rate;

    let mut taps = Vec::with_capacity(m + 1);
    // f64 accumulator keeps long kernels at unity gain
    let mut sum = 0.0_f64;

    for n in 0..=m {
        // signed offset, n < M/2 must go negative
        let k = n as i64 - half;

        let sinc = if k == 0 {
            2.0 * PI * fc
        } else {
            sinf(2.0 * PI * fc * k as f32) / k as f32
        };

        let tap = sinc * blackman(n, m);
        sum += f64::from(tap);
        taps.push(tap);
    }

    let sum = sum as f32;
    for tap in &mut taps {
        *tap /= sum;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "designed lowpass kernel: rate={rate} cutoff={cutoff} band={transition_band} order={m}"
    );

    Kernel { taps }
}

/// Reasons a set of filter parameters is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamError {
    /// Sample rate is not a positive finite number.
    InvalidSampleRate(f32),
    /// Cutoff is not inside `(0, rate / 2)`.
    CutoffOutOfRange {
        /// Requested cutoff in Hz.
        cutoff: f32,
        /// Nyquist frequency in Hz.
        nyquist: f32,
    },
    /// Transition bandwidth is not a positive finite number.
    InvalidTransitionBand(f32),
    /// The designed kernel would exceed a caller-imposed length ceiling.
    KernelTooLong {
        /// Kernel length the parameters would produce.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },
}

impl core::fmt::Display for ParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSampleRate(rate) => write!(f, "invalid sample rate {rate} Hz"),
            Self::CutoffOutOfRange { cutoff, nyquist } => {
                write!(f, "cutoff {cutoff} Hz outside (0, {nyquist}) Hz")
            }
            Self::InvalidTransitionBand(band) => {
                write!(f, "invalid transition bandwidth {band} Hz")
            }
            Self::KernelTooLong { len, max } => {
                write!(f, "kernel length {len} exceeds maximum {max}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParamError {}

/// Validated lowpass design parameters.
///
/// # Invariants
///
/// - `sample_rate > 0`
/// - `0 < cutoff < sample_rate / 2`
/// - `transition_band > 0`
/// - all values finite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParameters {
    sample_rate: f32,
    cutoff: f32,
    transition_band: f32,
}

impl FilterParameters {
    /// Validate and build a parameter set.
    pub fn new(sample_rate: f32, cutoff: f32, transition_band: f32) -> Result<Self, ParamError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ParamError::InvalidSampleRate(sample_rate));
        }

        let nyquist = sample_rate / 2.0;
        if !cutoff.is_finite() || cutoff <= 0.0 || cutoff >= nyquist {
            return Err(ParamError::CutoffOutOfRange { cutoff, nyquist });
        }

        if !transition_band.is_finite() || transition_band <= 0.0 {
            return Err(ParamError::InvalidTransitionBand(transition_band));
        }

        Ok(Self {
            sample_rate,
            cutoff,
            transition_band,
        })
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Transition bandwidth in Hz.
    pub fn transition_band(&self) -> f32 {
        self.transition_band
    }

    /// Order `M` the kernel will have.
    pub fn order(&self) -> usize {
        kernel_order(self.sample_rate, self.transition_band)
    }

    /// Number of taps the kernel will have (`M + 1`).
    pub fn kernel_len(&self) -> usize {
        self.order() + 1
    }

    /// Reject parameters whose kernel would be longer than `max` taps.
    pub fn check_kernel_len(&self, max: usize) -> Result<(), ParamError> {
        let len = self.kernel_len();
        if len > max {
            Err(ParamError::KernelTooLong { len, max })
        } else {
            Ok(())
        }
    }

    /// Design the kernel for these parameters.
    pub fn design(&self) -> Kernel {
        design_lowpass(self.sample_rate, self.cutoff, self.transition_band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_f64(kernel: &Kernel) -> f64 {
        kernel.taps().iter().map(|&t| f64::from(t)).sum()
    }

    #[test]
    fn reference_scenario_48k() {
        let kernel = design_lowpass(48000.0, 1000.0, 100.0);
        assert_eq!(kernel.order(), 1920);
        assert_eq!(kernel.len(), 1921);
        assert_eq!(kernel.center(), 960);
        assert!((sum_f64(&kernel) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn odd_order_is_rounded_up() {
        // 4 / (1000 / 44100) = 176.4 -> 177 -> 178
        assert_eq!(kernel_order(44100.0, 1000.0), 178);
        assert_eq!(design_lowpass(44100.0, 5000.0, 1000.0).len(), 179);
    }

    #[test]
    fn center_tap_is_largest() {
        let kernel = design_lowpass(48000.0, 4000.0, 800.0);
        let center = kernel.taps()[kernel.center()];
        assert!(kernel.taps().iter().all(|&t| t <= center));
    }

    #[test]
    fn symmetric_about_center() {
        let kernel = design_lowpass(44100.0, 2500.0, 300.0);
        let m = kernel.order();
        for n in 0..=m {
            let diff = (kernel.taps()[n] - kernel.taps()[m - n]).abs();
            assert!(diff < 1e-6, "tap {n} differs from mirror by {diff}");
        }
    }

    #[test]
    fn window_endpoints_are_near_zero() {
        assert!(blackman(0, 100).abs() < 1e-6);
        assert!(blackman(100, 100).abs() < 1e-6);
        assert!((blackman(50, 100) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_kernel_is_empty() {
        let kernel = Kernel::default();
        assert!(kernel.is_empty());
        assert_eq!(kernel.order(), 0);
        assert_eq!(kernel.center(), 0);
    }

    #[test]
    fn rejects_cutoff_at_nyquist() {
        let err = FilterParameters::new(48000.0, 24000.0, 100.0).unwrap_err();
        assert!(matches!(err, ParamError::CutoffOutOfRange { .. }));
    }

    #[test]
    fn rejects_bad_rate_and_band() {
        assert!(matches!(
            FilterParameters::new(0.0, 100.0, 10.0),
            Err(ParamError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            FilterParameters::new(48000.0, 100.0, -1.0),
            Err(ParamError::InvalidTransitionBand(_))
        ));
        assert!(matches!(
            FilterParameters::new(f32::NAN, 100.0, 10.0),
            Err(ParamError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn kernel_length_ceiling() {
        let params = FilterParameters::new(48000.0, 1000.0, 100.0).unwrap();
        assert_eq!(params.kernel_len(), 1921);
        assert!(params.check_kernel_len(1921).is_ok());
        assert_eq!(
            params.check_kernel_len(1024),
            Err(ParamError::KernelTooLong {
                len: 1921,
                max: 1024
            })
        );
    }

    #[test]
    fn parameters_design_matches_free_function() {
        let params = FilterParameters::new(96000.0, 12000.0, 2000.0).unwrap();
        assert_eq!(params.design(), design_lowpass(96000.0, 12000.0, 2000.0));
    }
}
