use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};
use crate::fs_atomic;

const CONFIG_DIR_NAME: &str = "playshot";
const CONFIG_FILE_NAME: &str = "config.toml";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|path| path.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn parse_config(text: &str) -> Result<Config, String> {
    toml::from_str::<Config>(text)
        .map(sanitize_config)
        .map_err(|err| format!("Invalid config: {err}"))
}

fn write_default_config(path: &Path) -> Result<(), String> {
    let rendered = toml::to_string(&Config::default())
        .map_err(|err| format!("Failed to serialize default config: {err}"))?;
    fs_atomic::write_atomic(path, rendered.as_bytes())
}

/// Loads the config at `explicit_path`, or the per-user default location.
///
/// A missing default file is created with default values. An explicit path
/// that does not exist is an error.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config, String> {
    let config_file = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(format!("Config file not found: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => {
            let Some(path) = default_config_path() else {
                warn!("No user config directory available. Using built-in defaults");
                return Ok(Config::default());
            };
            if !path.exists() {
                info!(
                    "Config file not found. Creating default config. path={}",
                    path.display()
                );
                if let Err(err) = write_default_config(&path) {
                    warn!("{err}. Using built-in defaults");
                    return Ok(Config::default());
                }
            }
            path
        }
    };

    let content = fs::read_to_string(&config_file)
        .map_err(|err| format!("Failed to read {}: {err}", config_file.display()))?;
    parse_config(&content).map_err(|err| format!("{}: {err}", config_file.display()))
}
