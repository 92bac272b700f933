use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;

const APP_DIR: &str = "traycal";
const CONFIG_FILE: &str = "config.json";
const FIRST_RUN_MARKER: &str = "first-run";

/// Get the app's config directory.
/// On Windows: %APPDATA%/traycal
/// On other platforms: uses dirs::config_dir() equivalent.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Where downloaded updates are kept.
pub fn update_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("updates")
}

/// Load config from JSON. Missing file means defaults; a corrupt file is
/// logged and also yields defaults.
pub fn load_config() -> Config {
    load_config_from(&app_dir().join(CONFIG_FILE))
}

fn load_config_from(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

/// True exactly once per config directory: the marker is written on the
/// first call.
pub fn is_first_run() -> Result<bool> {
    is_first_run_in(&app_dir())
}

fn is_first_run_in(dir: &Path) -> Result<bool> {
    let marker = dir.join(FIRST_RUN_MARKER);
    if marker.exists() {
        return Ok(false);
    }
    fs::create_dir_all(dir)?;
    fs::write(&marker, env!("CARGO_PKG_VERSION"))?;
    Ok(true)
}
