use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::position::PositionStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window_width: f32,
    pub window_height: f32,
    pub icon_refresh_secs: u64,
    /// Directory holding `icons/tray/...`. Defaults to the executable's dir.
    pub icon_root: Option<PathBuf>,
    pub update_host: String,
    pub update_initial_delay_secs: u64,
    pub update_interval_secs: u64,
    /// Overrides the platform's popup placement.
    pub position_strategy: Option<PositionStrategy>,
    /// Height of the menu bar where the platform reports no work area.
    pub work_area_top_inset: f32,
    /// A content frame slower than this is reported as unresponsive.
    pub unresponsive_after_ms: u64,
    pub dev: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_width: 300.0,
            window_height: 290.0,
            icon_refresh_secs: 60,
            icon_root: None,
            update_host: "https://updates.traycal.app".into(),
            update_initial_delay_secs: 10,
            update_interval_secs: 60 * 60,
            position_strategy: None,
            work_area_top_inset: if cfg!(target_os = "macos") { 25.0 } else { 0.0 },
            unresponsive_after_ms: 2000,
            dev: false,
        }
    }
}

impl Config {
    /// Release build, not forced into development by config or
    /// `TRAYCAL_DEV=1`. Gates reporting, updates and login-item setup.
    pub fn is_production(&self) -> bool {
        let env_dev = std::env::var("TRAYCAL_DEV").is_ok_and(|v| v == "1");
        !(cfg!(debug_assertions) || self.dev || env_dev)
    }

    pub fn position_strategy(&self) -> PositionStrategy {
        self.position_strategy.unwrap_or_else(PositionStrategy::for_host)
    }

    pub fn icon_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.icon_refresh_secs.max(1))
    }

    pub fn icon_root(&self) -> PathBuf {
        self.icon_root.clone().unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}
