use std::path::Path;
use std::path::PathBuf;

use buildview_core::config::Config;

use crate::CliError;

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("buildview").join("config.toml"))
}

/// Loads settings from `explicit`, or from the per-user config file when it
/// exists. A missing default file yields the built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config, CliError> {
    match explicit {
        Some(path) => read(path),
        None => match default_path() {
            Some(path) if path.exists() => read(&path),
            _ => Ok(Config::default()),
        },
    }
}

fn read(path: &Path) -> Result<Config, CliError> {
    let config_error = |message: String| CliError::Config {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
    toml::from_str(&raw).map_err(|err| config_error(err.to_string()))
}
