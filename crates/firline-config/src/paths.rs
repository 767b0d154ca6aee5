//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/firline/firline.toml`
//! - macOS: `~/Library/Application Support/firline/firline.toml`
//! - Windows: `%APPDATA%\firline\firline.toml`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "firline";

/// File name of the default configuration.
pub const CONFIG_FILE: &str = "firline.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the user's default configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// The default configuration file, if it exists.
pub fn find_default_config() -> Option<PathBuf> {
    let path = default_config_path();
    path.is_file().then_some(path)
}
