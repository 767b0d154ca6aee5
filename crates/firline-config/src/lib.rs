//! Configuration for firline lowpass filters.
//!
//! A [`FilterConfig`] captures everything needed to stand up a filter: the
//! log tag, sample rate and block size, the kernel design, and how the
//! convolution engine runs. It is stored as TOML.
//!
//! # Example
//!
//! ```rust,no_run
//! use firline_config::{FilterConfig, paths};
//!
//! let config = match paths::find_default_config() {
//!     Some(path) => FilterConfig::load(path).unwrap(),
//!     None => FilterConfig::default(),
//! };
//! config.validate().unwrap();
//!
//! let params = config.filter_parameters().unwrap();
//! println!("{} taps", params.kernel_len());
//! ```

mod error;
mod filter_config;

/// Platform-specific configuration paths.
pub mod paths;

/// Configuration validation.
pub mod validation;

pub use error::ConfigError;
pub use filter_config::{EngineSection, FilterConfig, FilterSection};
pub use validation::{MAX_BLOCK_SIZE, MAX_PRIORITY, ValidationError, ValidationResult};
