use auto_launch::AutoLaunchBuilder;

use crate::error::{Error, Result};

/// Registers the app to start at login. The app starts hidden anyway, so no
/// extra arguments are passed.
pub fn register_login_item() -> Result<()> {
    let exe = std::env::current_exe()?;
    let auto = AutoLaunchBuilder::new()
        .set_app_name("Traycal")
        .set_app_path(&exe.to_string_lossy())
        .build()
        .map_err(|e| Error::Autostart(e.to_string()))?;

    if auto.is_enabled().unwrap_or(false) {
        return Ok(());
    }
    auto.enable().map_err(|e| Error::Autostart(e.to_string()))?;
    tracing::info!(path = %exe.display(), "registered login item");
    Ok(())
}
