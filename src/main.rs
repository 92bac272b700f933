mod about;
mod alert;
mod app;
mod autostart;
mod calendar;
mod config;
mod coordinator;
mod error;
mod geometry;
mod platform;
mod popup;
mod position;
mod reporting;
mod signals;
mod storage;
mod surface;
mod tray;
mod updater;
mod weekday;

use std::sync::mpsc;

use eframe::egui;

use crate::signals::{Command, HostRequest};

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("traycal=info")),
        )
        .init();

    let config = storage::load_config();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        production = config.is_production(),
        "starting traycal"
    );

    if config.is_production() {
        match storage::is_first_run() {
            Ok(true) => {
                if let Err(e) = autostart::register_login_item() {
                    tracing::warn!(error = %e, "could not register login item");
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "could not check first-run marker"),
        }
    }

    let (tx, rx) = mpsc::channel();

    // Ctrl+C quits through the same path as the menu
    let ctrlc_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if ctrlc_tx.send(Command::Host(HostRequest::QuitApp)).is_ok() {
            platform::wake_event_loop();
        }
    }) {
        tracing::warn!(error = %e, "could not install Ctrl+C handler");
    }

    // The popup starts hidden; it is shown from the tray icon.
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(platform::POPUP_TITLE)
            .with_inner_size([config.window_width, config.window_height])
            .with_decorations(false)
            .with_transparent(true)
            .with_resizable(false)
            .with_visible(false)
            .with_taskbar(false)
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        platform::POPUP_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(app::TraycalApp::new(config, tx, rx)))),
    )
}
