use thiserror::Error;

/// Errors from config, icon, update feed and autostart helpers.
///
/// The coordinator logs these and keeps running.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("update feed answered with status {status}")]
    FeedStatus { status: u16 },

    #[error("icon image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("tray icon error: {0}")]
    Icon(#[from] tray_icon::BadIcon),

    #[error("tray error: {0}")]
    Tray(#[from] tray_icon::Error),

    #[error("tray menu error: {0}")]
    Menu(#[from] tray_icon::menu::Error),

    #[error("autostart error: {0}")]
    Autostart(String),

    #[error("no update has been downloaded")]
    NothingToInstall,
}

pub type Result<T> = std::result::Result<T, Error>;
