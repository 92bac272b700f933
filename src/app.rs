use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use eframe::egui::{self, ViewportCommand, ViewportId};

use crate::about::{AboutView, AboutWindow};
use crate::alert::DesktopAlert;
use crate::calendar::CalendarView;
use crate::config::Config;
use crate::coordinator::AppCoordinator;
use crate::platform::{self, ABOUT_TITLE, POPUP_TITLE};
use crate::popup::PopupWindow;
use crate::reporting::{ErrorReporter, LogSink, TcpConnectivity};
use crate::signals::Command;
use crate::storage;
use crate::surface::ViewportSurface;
use crate::tray::{IconRefresher, TrayController};
use crate::updater::{HttpFeed, Schedule, UpdateNotifier};

type PopupSurface = ViewportSurface<CalendarView>;
type AboutSurface = ViewportSurface<AboutView>;
type Coordinator = AppCoordinator<PopupSurface, AboutSurface, TrayController>;

const ABOUT_SIZE: egui::Vec2 = egui::vec2(280.0, 180.0);

pub struct TraycalApp {
    config: Config,
    production: bool,
    tx: Sender<Command>,
    rx: Receiver<Command>,
    coordinator: Option<Coordinator>,
    initialized: bool,
    was_focused: bool,
}

impl TraycalApp {
    pub fn new(config: Config, tx: Sender<Command>, rx: Receiver<Command>) -> Self {
        Self {
            production: config.is_production(),
            config,
            tx,
            rx,
            coordinator: None,
            initialized: false,
            was_focused: false,
        }
    }

    /// Builds the tray and the coordinator once the real egui context exists.
    fn init(&mut self, ctx: &egui::Context) {
        let tray = match TrayController::build(
            self.config.icon_root(),
            self.tx.clone(),
            ctx.clone(),
        ) {
            Ok(tray) => tray,
            Err(e) => {
                tracing::error!(error = %e, "failed to create the tray icon");
                ctx.send_viewport_cmd(ViewportCommand::Close);
                return;
            }
        };

        let popup_size = egui::vec2(self.config.window_width, self.config.window_height);
        let popup_ctx = ctx.clone();
        let popup_tx = self.tx.clone();
        let popup = PopupWindow::new(move || {
            ViewportSurface::new(
                popup_ctx.clone(),
                ViewportId::ROOT,
                POPUP_TITLE,
                popup_size,
                CalendarView::new(popup_tx.clone(), Local::now().date_naive()),
            )
        });
        let about = AboutWindow::new(ViewportSurface::new(
            ctx.clone(),
            ViewportId::from_hash_of("traycal-about"),
            ABOUT_TITLE,
            ABOUT_SIZE,
            AboutView::default(),
        ));

        let reporter = ErrorReporter::new(
            self.production,
            Arc::new(TcpConnectivity::default()),
            Arc::new(LogSink),
        );
        let mut coordinator = AppCoordinator::new(
            popup,
            about,
            tray,
            platform::work_area_source(ctx.clone(), self.config.work_area_top_inset),
            self.config.position_strategy(),
            reporter,
        )
        .with_update_alert(Box::new(DesktopAlert::new(self.tx.clone(), ctx.clone())));

        let wake_ctx = ctx.clone();
        let refresher = IconRefresher::start(
            self.config.icon_refresh_interval(),
            self.tx.clone(),
            move || platform::wake(&wake_ctx),
        );
        coordinator.start(refresher);

        if self.production {
            match HttpFeed::new(&self.config.update_host, storage::update_dir()) {
                Ok(feed) => {
                    let wake_ctx = ctx.clone();
                    coordinator.start_updates(
                        UpdateNotifier::new(Arc::new(feed)),
                        Schedule {
                            initial_delay: Duration::from_secs(self.config.update_initial_delay_secs),
                            interval: Duration::from_secs(self.config.update_interval_secs),
                        },
                        self.tx.clone(),
                        move || platform::wake(&wake_ctx),
                    );
                }
                Err(e) => tracing::warn!(error = %e, "update feed unavailable"),
            }
        }

        self.coordinator = Some(coordinator);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Draws the calendar into the root viewport. Panics and slow frames are
/// handed to the coordinator.
fn show_popup(ctx: &egui::Context, coordinator: &mut Coordinator, unresponsive_after: Duration) {
    let Some(surface) = coordinator.popup_mut().surface_mut() else {
        return;
    };
    let view = surface.content_mut();

    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        egui::CentralPanel::default()
            .frame(egui::Frame::window(&ctx.style()))
            .show(ctx, |ui| view.ui(ui));
    }));

    match result {
        Ok(()) => {
            coordinator.popup_frame_timed(started.elapsed() > unresponsive_after);
            coordinator.popup_painted();
        }
        Err(payload) => coordinator.popup_crashed(panic_message(payload.as_ref())),
    }
}

/// Shows the about window while it is visible. Closing it only hides it.
fn show_about(ctx: &egui::Context, coordinator: &mut Coordinator) {
    if !coordinator.about().is_visible() {
        return;
    }
    let surface = coordinator.about_mut().surface_mut();
    let id = surface.id();

    let monitor = ctx
        .input(|i| i.viewport().monitor_size)
        .unwrap_or(egui::vec2(1920.0, 1080.0));
    let centered = ((monitor - ABOUT_SIZE) / 2.0).to_pos2();
    let builder = egui::ViewportBuilder::default()
        .with_title(ABOUT_TITLE)
        .with_inner_size(ABOUT_SIZE)
        .with_position(centered)
        .with_resizable(false);

    let view = surface.content_mut();
    let mut close_requested = false;
    ctx.show_viewport_immediate(id, builder, |ctx, _class| {
        egui::CentralPanel::default().show(ctx, |ui| view.ui(ui));
        if ctx.input(|i| i.viewport().close_requested()) {
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
            close_requested = true;
        }
    });

    if close_requested {
        coordinator.about_close_requested();
    }
}

impl eframe::App for TraycalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.initialized {
            self.initialized = true;
            self.init(ctx);
        }
        let Some(coordinator) = self.coordinator.as_mut() else {
            return;
        };

        // Background threads only wake us; all state changes happen here.
        while let Ok(command) = self.rx.try_recv() {
            coordinator.handle(command);
        }
        if coordinator.is_quitting() {
            ctx.send_viewport_cmd(ViewportCommand::Close);
            return;
        }

        // Closing the popup destroys its content; the next toggle rebuilds it.
        if ctx.input(|i| i.viewport().close_requested()) {
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
            coordinator.popup_closed();
        }

        let focused = ctx.input(|i| i.viewport().focused.unwrap_or(false));
        let escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if (self.was_focused && !focused) || (escape && coordinator.popup_visible()) {
            coordinator.popup_blurred();
        }
        self.was_focused = focused;

        show_popup(
            ctx,
            coordinator,
            Duration::from_millis(self.config.unresponsive_after_ms),
        );
        show_about(ctx, coordinator);

        // Poll for commands from the tray and timer threads
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}
