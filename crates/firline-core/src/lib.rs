//! Firline Core - FIR lowpass design primitives
//!
//! This crate holds the numeric half of firline: designing windowed-sinc
//! lowpass kernels and convolving signals with them in direct form. Nothing
//! here allocates threads or touches audio devices; the real-time
//! convolution engine lives in `firline-engine`.
//!
//! # Kernel Design
//!
//! - [`design_lowpass`] - Blackman-windowed sinc, unity DC gain, odd length
//! - [`FilterParameters`] - Validated sample rate / cutoff / transition band
//! - [`Kernel`] - Designed taps plus order, center and DC gain accessors
//! - [`kernel_order`] - Order `M` without building the taps
//!
//! # Direct Convolution
//!
//! - [`convolve`] - Half-length kernel reference convolution
//! - [`convolve_full`] - Plain full linear convolution
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! firline-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use firline_core::{FilterParameters, convolve_full};
//!
//! let params = FilterParameters::new(48000.0, 2000.0, 400.0).unwrap();
//! let kernel = params.design();
//!
//! let signal = vec![1.0_f32; 64];
//! let mut out = vec![0.0; signal.len() + kernel.len() - 1];
//! convolve_full(&signal, kernel.taps(), &mut out);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod direct;
pub mod kernel;

pub use direct::{convolve, convolve_full};
pub use kernel::{FilterParameters, Kernel, ParamError, blackman, design_lowpass, kernel_order};
