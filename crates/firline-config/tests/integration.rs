//! Integration tests for firline-config.
//!
//! Covers file round trips and standing up a filter from a loaded config.

use firline_config::{ConfigError, FilterConfig, ValidationError};
use firline_engine::{
    FilterLifecycle, PartitionedConvolver, ReadinessState, SchedulingPolicy, ThreadScheduling,
};
use tempfile::TempDir;

#[test]
fn save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("firline.toml");

    let config = FilterConfig::default().with_tag("saved").with_block_size(128);
    config.save(&path).unwrap();

    assert!(path.is_file());
    assert_eq!(FilterConfig::load(&path).unwrap(), config);
}

#[test]
fn load_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = FilterConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn load_malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "block_size = \"lots\"\n").unwrap();

    assert!(matches!(FilterConfig::load(&path), Err(ConfigError::TomlParse(_))));
}

#[test]
fn validation_error_converts_into_config_error() {
    fn check(config: &FilterConfig) -> Result<(), ConfigError> {
        config.validate()?;
        Ok(())
    }

    let config = FilterConfig::default().with_block_size(0);
    let err = check(&config).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Validation(ValidationError::OutOfRange { .. })
    ));
}

#[test]
fn loaded_config_drives_a_filter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter.toml");
    std::fs::write(
        &path,
        r#"
tag = "from-file"
block_size = 64

[filter]
cutoff = 4000.0
transition_band = 2000.0

[engine.scheduling]
policy = "normal"
"#,
    )
    .unwrap();

    let config = FilterConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.scheduling().policy, SchedulingPolicy::Normal);

    let mut filter = FilterLifecycle::new(config.tag.clone(), PartitionedConvolver::new())
        .with_scheduling(config.scheduling())
        .with_options(config.engine_options());

    let state = filter.setup(config.filter_parameters().unwrap(), config.block_size);
    assert_eq!(state, ReadinessState::EngineReady);
    assert_eq!(filter.tag(), "from-file");
    assert_eq!(filter.kernel().len(), 97);
}

#[test]
fn scheduling_serializes_lowercase() {
    let config = FilterConfig::default().with_scheduling(ThreadScheduling::fifo(20));
    let text = config.to_toml().unwrap();
    assert!(text.contains("policy = \"fifo\""), "got:\n{text}");
    assert!(text.contains("priority = 20"), "got:\n{text}");
}
