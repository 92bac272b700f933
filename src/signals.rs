//! Messages exchanged between the event sources, the coordinator and the
//! calendar content.

use std::path::PathBuf;

use crate::geometry::{Rect, ScreenPoint};

/// Work for the coordinator. Everything that changes window or tray state
/// arrives as one of these and is handled on the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Tray click or double-click.
    ToggleMain {
        tray_bounds: Rect,
        cursor: ScreenPoint,
    },
    /// Icon refresher tick.
    RefreshIcon,
    /// Request from the content or the tray menu.
    Host(HostRequest),
    /// Progress from the update poller.
    Update(UpdateEvent),
}

/// Requests the calendar content (or the tray menu) makes of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    ShowConfigMenu,
    ShowAbout,
    QuitApp,
    InstallUpdate,
    GetFirstWeekday,
}

/// Signals pushed into the popup's content. Delivered at most once and never
/// acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSignal {
    /// Resynchronise date state; sent while the popup is hidden.
    BackgroundUpdate,
    UpdateDownloaded,
    UpdateReady {
        release_notes: String,
        release_name: String,
    },
    SetFirstWeekday(u8),
    OpenConfigMenu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Checking,
    Available,
    NotAvailable,
    Downloaded {
        release_notes: String,
        release_name: String,
        artifact: PathBuf,
    },
    Error(String),
}
