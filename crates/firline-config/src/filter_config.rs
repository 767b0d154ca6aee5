//! Filter configuration file format and operations.

use firline_core::{FilterParameters, kernel_order};
use firline_engine::{EngineOptions, SchedulingPolicy, ThreadScheduling};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::validation::{
    MAX_BLOCK_SIZE, MAX_PRIORITY, ValidationError, ValidationResult, check_range,
};

/// Lowpass filter and engine settings.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # TOML Format
///
/// ```toml
/// tag = "firline"
/// sample_rate = 48000.0
/// block_size = 512
///
/// [filter]
/// cutoff = 1000.0
/// transition_band = 100.0
/// max_kernel_len = 4097
///
/// [engine]
/// vector_mode = true
///
/// [engine.scheduling]
/// policy = "fifo"
/// priority = 0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    /// Identifies this filter in log events.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Sample rate in Hz. Audio file rates override this.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,

    /// Samples per processing block; the engine partition size.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Kernel design settings.
    #[serde(default)]
    pub filter: FilterSection,

    /// Convolution engine settings.
    #[serde(default)]
    pub engine: EngineSection,
}

/// `[filter]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSection {
    /// Cutoff frequency in Hz.
    #[serde(default = "default_cutoff")]
    pub cutoff: f32,

    /// Transition bandwidth in Hz.
    #[serde(default = "default_transition_band")]
    pub transition_band: f32,

    /// Reject designs longer than this many taps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_kernel_len: Option<usize>,
}

/// `[engine]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Batch channel FFTs per block.
    #[serde(default = "default_vector_mode")]
    pub vector_mode: bool,

    /// Worker thread scheduling.
    #[serde(default)]
    pub scheduling: ThreadScheduling,
}

fn default_tag() -> String {
    "firline".to_string()
}

fn default_sample_rate() -> f32 {
    48000.0
}

fn default_block_size() -> usize {
    512
}

fn default_cutoff() -> f32 {
    1000.0
}

fn default_transition_band() -> f32 {
    100.0
}

fn default_vector_mode() -> bool {
    true
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            transition_band: default_transition_band(),
            max_kernel_len: None,
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            vector_mode: default_vector_mode(),
            scheduling: ThreadScheduling::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            filter: FilterSection::default(),
            engine: EngineSection::default(),
        }
    }
}

impl FilterConfig {
    /// Set the log tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set cutoff and transition band.
    pub fn with_filter(mut self, cutoff: f32, transition_band: f32) -> Self {
        self.filter.cutoff = cutoff;
        self.filter.transition_band = transition_band;
        self
    }

    /// Set the worker scheduling.
    pub fn with_scheduling(mut self, scheduling: ThreadScheduling) -> Self {
        self.engine.scheduling = scheduling;
        self
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting, collecting all problems.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.tag.trim().is_empty() {
            errors.push(ValidationError::InvalidFormat {
                param: "tag".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        check_range(&mut errors, "sample_rate", self.sample_rate, 1.0, 768_000.0);

        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            errors.push(ValidationError::out_of_range(
                "block_size",
                self.block_size as f64,
                1.0,
                MAX_BLOCK_SIZE as f64,
            ));
        }

        let nyquist = self.sample_rate / 2.0;
        if self.filter.cutoff.is_finite() && self.filter.cutoff >= nyquist {
            errors.push(ValidationError::out_of_range(
                "filter.cutoff",
                self.filter.cutoff,
                0.0,
                nyquist,
            ));
        } else {
            check_range(
                &mut errors,
                "filter.cutoff",
                self.filter.cutoff,
                f32::MIN_POSITIVE,
                nyquist,
            );
        }

        check_range(
            &mut errors,
            "filter.transition_band",
            self.filter.transition_band,
            f32::MIN_POSITIVE,
            self.sample_rate.max(f32::MIN_POSITIVE),
        );

        if let Some(max) = self.filter.max_kernel_len
            && self.sample_rate > 0.0
            && self.filter.transition_band > 0.0
        {
            let len = kernel_order(self.sample_rate, self.filter.transition_band) + 1;
            if len > max {
                errors.push(ValidationError::KernelTooLong { len, max });
            }
        }

        let scheduling = self.engine.scheduling;
        if scheduling.policy == SchedulingPolicy::Fifo
            && !(0..=MAX_PRIORITY).contains(&scheduling.priority)
        {
            errors.push(ValidationError::out_of_range(
                "engine.scheduling.priority",
                scheduling.priority,
                0,
                MAX_PRIORITY,
            ));
        }

        ValidationError::collect(errors)
    }

    /// Validated design parameters at the configured sample rate.
    pub fn filter_parameters(&self) -> Result<FilterParameters, ConfigError> {
        self.filter_parameters_at(self.sample_rate)
    }

    /// Validated design parameters at `sample_rate`, honoring `max_kernel_len`.
    pub fn filter_parameters_at(&self, sample_rate: f32) -> Result<FilterParameters, ConfigError> {
        let params =
            FilterParameters::new(sample_rate, self.filter.cutoff, self.filter.transition_band)?;
        if let Some(max) = self.filter.max_kernel_len {
            params.check_kernel_len(max)?;
        }
        Ok(params)
    }

    /// Engine options.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            vector_mode: self.engine.vector_mode,
        }
    }

    /// Worker scheduling.
    pub fn scheduling(&self) -> ThreadScheduling {
        self.engine.scheduling
    }
}
