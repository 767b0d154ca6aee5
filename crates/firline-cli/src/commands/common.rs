//! Helpers shared by commands.

use clap::Args;
use firline_config::{FilterConfig, paths};
use std::path::PathBuf;

/// Filter settings accepted by every command. Flags override the config file.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Configuration file (TOML); defaults to the user config if present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long)]
    pub rate: Option<f32>,

    /// Cutoff frequency in Hz
    #[arg(long)]
    pub cutoff: Option<f32>,

    /// Transition bandwidth in Hz
    #[arg(long)]
    pub transition_band: Option<f32>,
}

impl FilterArgs {
    /// Load the config (explicit path, user default, or built-in defaults)
    /// and apply flag overrides.
    pub fn resolve(&self) -> anyhow::Result<FilterConfig> {
        let path = self.config.clone().or_else(paths::find_default_config);
        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                FilterConfig::load(&path)?
            }
            None => FilterConfig::default(),
        };

        if let Some(rate) = self.rate {
            config.sample_rate = rate;
        }
        if let Some(cutoff) = self.cutoff {
            config.filter.cutoff = cutoff;
        }
        if let Some(band) = self.transition_band {
            config.filter.transition_band = band;
        }
        Ok(config)
    }
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f.toml");
        std::fs::write(&path, "[filter]\ncutoff = 3000.0\ntransition_band = 300.0\n").unwrap();

        let args = FilterArgs {
            config: Some(path),
            rate: Some(44100.0),
            cutoff: None,
            transition_band: Some(600.0),
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.filter.cutoff, 3000.0);
        assert_eq!(config.filter.transition_band, 600.0);
    }

    #[test]
    fn db_conversion() {
        assert_eq!(linear_to_db(0.0), -120.0);
        assert!(linear_to_db(1.0).abs() < 1e-6);
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn level_stats() {
        assert_eq!(peak(&[0.1, -0.7, 0.3]), 0.7);
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
    }
}
