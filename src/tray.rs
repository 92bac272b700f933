use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use chrono::{Datelike, Local};
use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent};

use crate::error::Result;
use crate::geometry::{Rect, ScreenPoint};
use crate::platform;
use crate::signals::{Command, HostRequest};

pub const ICON_NAME: &str = "TraycalIcon";
pub const TOOLTIP: &str = "Traycal";

/// Relative path of the tray glyph showing `day` of the month.
pub fn tray_icon_path(day: u32) -> String {
    format!("icons/tray/{ICON_NAME}{day}Template@2x.png")
}

pub fn today() -> u32 {
    Local::now().day()
}

/// The tray image, as the coordinator sees it.
pub trait TrayIconSink {
    /// Swaps the image to the asset at `path`, relative to the icon root.
    fn set_icon_path(&mut self, path: &str);
}

/// Generated fallback used when an icon asset is missing: a white page
/// with a dark header band, readable as a calendar at tray size.
fn create_default_icon() -> Result<Icon> {
    let size = 32u32;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let border = x < 2 || x >= size - 2 || y < 2 || y >= size - 2;
            let header = y < 10;
            let (r, g, b) = if border || header {
                (40, 40, 40)
            } else {
                (250, 250, 250)
            };
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    Ok(Icon::from_rgba(rgba, size, size)?)
}

fn load_icon(root: &Path, relative: &str) -> Result<Icon> {
    let image = image::open(root.join(relative))?.into_rgba8();
    let (width, height) = image.dimensions();
    Ok(Icon::from_rgba(image.into_raw(), width, height)?)
}

fn load_icon_or_default(root: &Path, relative: &str) -> Result<Icon> {
    match load_icon(root, relative) {
        Ok(icon) => Ok(icon),
        Err(e) => {
            tracing::warn!(path = relative, error = %e, "tray icon asset unavailable, using generated icon");
            create_default_icon()
        }
    }
}

struct MenuIds {
    open: MenuId,
    about: MenuId,
    quit: MenuId,
}

/// Owns the tray icon. Gestures and menu clicks are forwarded to the
/// coordinator as commands; the coordinator drives the icon image.
pub struct TrayController {
    tray: TrayIcon,
    icon_root: PathBuf,
    current: String,
}

impl TrayController {
    /// Builds the tray with today's glyph and starts forwarding its events.
    pub fn build(
        icon_root: PathBuf,
        tx: Sender<Command>,
        ctx: eframe::egui::Context,
    ) -> Result<Self> {
        let menu = Menu::new();
        // Trays that never report clicks (Linux) open the popup from here.
        let open_item = MenuItem::new("Open calendar", true, None);
        let about_item = MenuItem::new("About Traycal", true, None);
        let quit_item = MenuItem::new("Quit", true, None);
        let ids = MenuIds {
            open: open_item.id().clone(),
            about: about_item.id().clone(),
            quit: quit_item.id().clone(),
        };
        menu.append_items(&[
            &open_item,
            &PredefinedMenuItem::separator(),
            &about_item,
            &PredefinedMenuItem::separator(),
            &quit_item,
        ])?;

        let current = tray_icon_path(today());
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_menu_on_left_click(false)
            .with_tooltip(TOOLTIP)
            .with_icon(load_icon_or_default(&icon_root, &current)?)
            .with_icon_as_template(cfg!(target_os = "macos"))
            .build()?;

        spawn_event_pump(ids, tx, move || platform::wake(&ctx));
        tracing::info!(icon = %current, "system tray initialized");

        Ok(Self {
            tray,
            icon_root,
            current,
        })
    }
}

impl TrayIconSink for TrayController {
    fn set_icon_path(&mut self, path: &str) {
        if path == self.current {
            return;
        }
        match load_icon_or_default(&self.icon_root, path) {
            Ok(icon) => {
                if let Err(e) = self.tray.set_icon(Some(icon)) {
                    tracing::warn!(error = %e, "failed to swap tray icon");
                    return;
                }
                tracing::info!(icon = path, "tray icon updated");
                self.current = path.to_string();
            }
            Err(e) => tracing::warn!(error = %e, "failed to build tray icon"),
        }
    }
}

fn bounds_of(rect: &tray_icon::Rect) -> Rect {
    Rect::new(
        rect.position.x.round() as i32,
        rect.position.y.round() as i32,
        rect.size.width as i32,
        rect.size.height as i32,
    )
}

fn event_rect(event: &TrayIconEvent) -> Option<Rect> {
    match event {
        TrayIconEvent::Click { rect, .. }
        | TrayIconEvent::DoubleClick { rect, .. }
        | TrayIconEvent::Enter { rect, .. }
        | TrayIconEvent::Move { rect, .. }
        | TrayIconEvent::Leave { rect, .. } => Some(bounds_of(rect)),
        _ => None,
    }
}

/// Left click (on release) and double-click toggle the popup. Right-click is
/// left to the platform, which opens the attached menu.
fn gesture_command(event: &TrayIconEvent) -> Option<Command> {
    match event {
        TrayIconEvent::Click {
            position,
            rect,
            button: MouseButton::Left,
            button_state: MouseButtonState::Up,
            ..
        }
        | TrayIconEvent::DoubleClick {
            position,
            rect,
            button: MouseButton::Left,
            ..
        } => Some(Command::ToggleMain {
            tray_bounds: bounds_of(rect),
            cursor: ScreenPoint::new(position.x.round() as i32, position.y.round() as i32),
        }),
        _ => None,
    }
}

/// `tray_bounds` is the last rect the tray reported, empty if it never did.
fn menu_command(ids: &MenuIds, id: &MenuId, tray_bounds: Rect) -> Option<Command> {
    if id == &ids.open {
        Some(Command::ToggleMain {
            tray_bounds,
            cursor: tray_bounds.center(),
        })
    } else if id == &ids.about {
        Some(Command::Host(HostRequest::ShowAbout))
    } else if id == &ids.quit {
        Some(Command::Host(HostRequest::QuitApp))
    } else {
        None
    }
}

/// Queues `command` and wakes the UI thread. False once the receiver is gone.
fn forward(tx: &Sender<Command>, command: Command, wake: &impl Fn()) -> bool {
    tracing::debug!(?command, "tray event");
    if tx.send(command).is_err() {
        return false;
    }
    wake();
    true
}

/// Moves tray and menu events onto the command channel.
fn spawn_event_pump(ids: MenuIds, tx: Sender<Command>, wake: impl Fn() + Send + 'static) {
    thread::spawn(move || {
        let tray_events = TrayIconEvent::receiver();
        let menu_events = MenuEvent::receiver();
        let mut tray_bounds = Rect::default();

        loop {
            let mut commands = Vec::new();
            while let Ok(event) = tray_events.try_recv() {
                if let Some(rect) = event_rect(&event) {
                    tray_bounds = rect;
                }
                commands.extend(gesture_command(&event));
            }
            while let Ok(event) = menu_events.try_recv() {
                commands.extend(menu_command(&ids, event.id(), tray_bounds));
            }

            for command in commands {
                if !forward(&tx, command, &wake) {
                    return;
                }
            }

            thread::sleep(Duration::from_millis(30));
        }
    });
}

/// Fires `Command::RefreshIcon` on a fixed interval until cancelled.
pub struct IconRefresher {
    cancel: Option<Sender<()>>,
}

impl IconRefresher {
    pub fn start(interval: Duration, tx: Sender<Command>, wake: impl Fn() + Send + 'static) -> Self {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        thread::spawn(move || loop {
            match cancel_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if tx.send(Command::RefreshIcon).is_err() {
                        break;
                    }
                    wake();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            cancel: Some(cancel_tx),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            tracing::debug!("icon refresher cancelled");
        }
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}
