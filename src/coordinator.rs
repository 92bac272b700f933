//! Owns the popup, the about window and the tray, and dispatches every
//! `Command` on the UI thread.

use std::sync::mpsc::Sender;

use crate::about::AboutWindow;
use crate::alert::UpdateAlert;
use crate::geometry::{Rect, ScreenPoint};
use crate::platform::WorkAreaSource;
use crate::popup::{PopupState, PopupWindow, ToggleOutcome};
use crate::position::{compute_position, place_without_tray, PositionStrategy};
use crate::reporting::{ErrorReporter, Report};
use crate::signals::{Command, ContentSignal, HostRequest, UpdateEvent};
use crate::surface::Surface;
use crate::tray::{tray_icon_path, IconRefresher, TrayIconSink};
use crate::updater::{Schedule, UpdateNotifier, UpdateState};

pub struct AppCoordinator<S, A, T> {
    popup: PopupWindow<S>,
    about: AboutWindow<A>,
    tray: T,
    display: Box<dyn WorkAreaSource>,
    strategy: PositionStrategy,
    reporter: ErrorReporter,
    updater: Option<UpdateNotifier>,
    refresher: Option<IconRefresher>,
    alert: Option<Box<dyn UpdateAlert>>,
    update: UpdateState,
    day_of_month: fn() -> u32,
    first_weekday: fn() -> u8,
    /// Toggle that recreated the popup, replayed once it has painted.
    pending_toggle: Option<(Rect, ScreenPoint)>,
    /// Set while frames run slow, so one hang is reported once.
    unresponsive: bool,
    quitting: bool,
}

impl<S: Surface, A: Surface, T: TrayIconSink> AppCoordinator<S, A, T> {
    pub fn new(
        popup: PopupWindow<S>,
        about: AboutWindow<A>,
        tray: T,
        display: Box<dyn WorkAreaSource>,
        strategy: PositionStrategy,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            popup,
            about,
            tray,
            display,
            strategy,
            reporter,
            updater: None,
            refresher: None,
            alert: None,
            update: UpdateState::default(),
            day_of_month: crate::tray::today,
            first_weekday: crate::weekday::first_weekday,
            pending_toggle: None,
            unresponsive: false,
            quitting: false,
        }
    }

    /// Replaces the clock and locale lookups.
    pub fn with_calendar(mut self, day_of_month: fn() -> u32, first_weekday: fn() -> u8) -> Self {
        self.day_of_month = day_of_month;
        self.first_weekday = first_weekday;
        self
    }

    pub fn with_update_alert(mut self, alert: Box<dyn UpdateAlert>) -> Self {
        self.alert = Some(alert);
        self
    }

    /// Creates the popup hidden; it becomes toggleable after its first paint.
    pub fn start(&mut self, refresher: IconRefresher) {
        self.popup.create();
        self.refresher = Some(refresher);
        tracing::info!(strategy = ?self.strategy, "coordinator started");
    }

    /// Installs the update notifier and starts polling. Later calls are
    /// ignored.
    pub fn start_updates(
        &mut self,
        mut updater: UpdateNotifier,
        schedule: Schedule,
        tx: Sender<Command>,
        wake: impl Fn() + Send + 'static,
    ) {
        if self.updater.is_some() {
            return;
        }
        updater.start_polling(schedule, tx, wake);
        self.updater = Some(updater);
    }

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::ToggleMain {
                tray_bounds,
                cursor,
            } => self.toggle_main_window(tray_bounds, cursor),
            Command::RefreshIcon => self.refresh_icon(),
            Command::Host(request) => self.host_request(request),
            Command::Update(event) => self.update_event(event),
        }
    }

    /// An empty `tray_bounds` means the tray never reported where it is; the
    /// popup then goes to the top-right corner of the work area.
    pub fn toggle_main_window(&mut self, tray_bounds: Rect, cursor: ScreenPoint) {
        let work_area = self.display.work_area_near(cursor);
        let strategy = self.strategy;
        let outcome = self.popup.toggle(|size| {
            if tray_bounds.is_empty() {
                place_without_tray(size, work_area)
            } else {
                compute_position(strategy, tray_bounds, size, work_area)
            }
        });

        match outcome {
            ToggleOutcome::Recreated => self.pending_toggle = Some((tray_bounds, cursor)),
            ToggleOutcome::NotReady => tracing::debug!("popup not ready; toggle ignored"),
            ToggleOutcome::Shown | ToggleOutcome::Hidden => {
                tracing::debug!(?outcome, ?work_area, "popup toggled")
            }
        }
    }

    fn refresh_icon(&mut self) {
        self.tray.set_icon_path(&tray_icon_path((self.day_of_month)()));
        if !self.popup.is_visible() {
            self.popup.send(ContentSignal::BackgroundUpdate);
        }
    }

    fn host_request(&mut self, request: HostRequest) {
        tracing::debug!(?request, "host request");
        match request {
            HostRequest::ShowConfigMenu => self.popup.send(ContentSignal::OpenConfigMenu),
            HostRequest::ShowAbout => self.about.toggle(),
            HostRequest::QuitApp => self.quit(),
            HostRequest::InstallUpdate => self.install_update(),
            HostRequest::GetFirstWeekday => {
                let day = (self.first_weekday)();
                self.popup.send(ContentSignal::SetFirstWeekday(day));
            }
        }
    }

    fn install_update(&mut self) {
        let Some(updater) = self.updater.as_ref() else {
            tracing::warn!("install requested without an update notifier");
            return;
        };
        match updater.install() {
            Ok(()) => self.quit(),
            Err(e) => {
                tracing::warn!(error = %e, "update install failed");
                self.reporter.report(Report::UpdateFailed(e.to_string()));
            }
        }
    }

    fn update_event(&mut self, event: UpdateEvent) {
        match event {
            UpdateEvent::Checking => tracing::debug!("checking for updates"),
            UpdateEvent::Available => tracing::info!("update available; downloading"),
            UpdateEvent::NotAvailable => tracing::debug!("no update available"),
            UpdateEvent::Downloaded {
                release_notes,
                release_name,
                artifact,
            } => {
                tracing::info!(release = %release_name, "update downloaded");
                if let Some(updater) = self.updater.as_mut() {
                    updater.set_downloaded(artifact);
                }
                if let Some(alert) = self.alert.as_ref() {
                    alert.update_ready(&release_name, &release_notes);
                }
                self.update = UpdateState {
                    available: true,
                    release_notes,
                    release_name,
                };
                self.send_update_state();
            }
            UpdateEvent::Error(message) => {
                tracing::warn!(error = %message, "update check failed");
                self.reporter.report(Report::UpdateFailed(message));
            }
        }
    }

    fn send_update_state(&mut self) {
        if !self.update.available {
            return;
        }
        self.popup.send(ContentSignal::UpdateDownloaded);
        self.popup.send(ContentSignal::UpdateReady {
            release_notes: self.update.release_notes.clone(),
            release_name: self.update.release_name.clone(),
        });
    }

    fn quit(&mut self) {
        if let Some(refresher) = self.refresher.as_mut() {
            refresher.cancel();
        }
        if let Some(updater) = self.updater.as_mut() {
            updater.stop();
        }
        self.quitting = true;
        tracing::info!("quitting");
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Called after every popup frame. The first paint of a new surface
    /// makes it toggleable and honours a toggle that arrived before it.
    pub fn popup_painted(&mut self) {
        let first = self.popup.state() == PopupState::CreatedNotReady;
        let show = self.popup.on_first_paint();
        if first {
            self.send_update_state();
        }
        if show {
            if let Some((tray_bounds, cursor)) = self.pending_toggle.take() {
                self.toggle_main_window(tray_bounds, cursor);
            }
        }
    }

    pub fn popup_blurred(&mut self) {
        if self.popup.is_visible() {
            self.popup.on_blur();
        }
    }

    pub fn popup_closed(&mut self) {
        self.popup.on_closed();
        self.pending_toggle = None;
    }

    pub fn popup_crashed(&mut self, message: String) {
        tracing::error!(%message, "popup content crashed");
        self.reporter.report(Report::ContentCrashed(message));
        self.popup_closed();
    }

    /// Reports once when frames turn slow. A fast frame ends the episode.
    pub fn popup_frame_timed(&mut self, slow: bool) {
        if slow && !self.unresponsive {
            tracing::warn!("popup content unresponsive");
            self.reporter.report(Report::ContentUnresponsive);
        } else if !slow && self.unresponsive {
            tracing::info!("popup content responsive again");
        }
        self.unresponsive = slow;
    }

    pub fn about_close_requested(&mut self) {
        self.about.on_close_requested();
    }

    pub fn popup_visible(&self) -> bool {
        self.popup.is_visible()
    }

    #[cfg(test)]
    pub fn popup(&self) -> &PopupWindow<S> {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut PopupWindow<S> {
        &mut self.popup
    }

    pub fn about(&self) -> &AboutWindow<A> {
        &self.about
    }

    pub fn about_mut(&mut self) -> &mut AboutWindow<A> {
        &mut self.about
    }

    #[cfg(test)]
    fn tray(&self) -> &T {
        &self.tray
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::platform::fake::FixedWorkArea;
    use crate::reporting::fake::{reporter, RecordingSink};
    use crate::surface::fake::FakeSurface;
    use crate::tray::fake::FakeTray;
    use crate::updater::fake::{release, FakeBackend};

    type Coordinator = AppCoordinator<FakeSurface, FakeSurface, FakeTray>;

    const TRAY: Rect = Rect {
        x: 500,
        y: 0,
        width: 30,
        height: 22,
    };
    const CURSOR: ScreenPoint = ScreenPoint { x: 510, y: 10 };

    fn toggle() -> Command {
        Command::ToggleMain {
            tray_bounds: TRAY,
            cursor: CURSOR,
        }
    }

    fn coordinator_with(
        strategy: PositionStrategy,
        production: bool,
    ) -> (Coordinator, Rc<Cell<u32>>, Arc<RecordingSink>) {
        let created = Rc::new(Cell::new(0));
        let counter = Rc::clone(&created);
        let popup = PopupWindow::new(move || {
            counter.set(counter.get() + 1);
            FakeSurface::new(counter.get())
        });
        let (reporter, sink) = reporter(production, true);
        let coordinator = AppCoordinator::new(
            popup,
            AboutWindow::new(FakeSurface::new(7)),
            FakeTray::default(),
            Box::new(FixedWorkArea(Rect::new(500, 500, 1024, 768))),
            strategy,
            reporter,
        )
        .with_calendar(|| 18, || 2);
        (coordinator, created, sink)
    }

    fn started(strategy: PositionStrategy) -> Coordinator {
        let (mut coordinator, _, _) = coordinator_with(strategy, false);
        coordinator.popup.create();
        coordinator.popup_painted();
        coordinator
    }

    fn popup_surface(coordinator: &Coordinator) -> &FakeSurface {
        coordinator.popup().surface().unwrap()
    }

    #[derive(Default)]
    struct RecordingAlert {
        shown: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl UpdateAlert for RecordingAlert {
        fn update_ready(&self, release_name: &str, release_notes: &str) {
            self.shown
                .borrow_mut()
                .push((release_name.to_string(), release_notes.to_string()));
        }
    }

    fn wait_for_reports(sink: &RecordingSink, count: usize) -> Vec<Report> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let reports = sink.reports.lock().unwrap().clone();
            if reports.len() >= count || Instant::now() > deadline {
                return reports;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_toggle_before_first_paint_is_ignored() {
        let (mut coordinator, _, _) = coordinator_with(PositionStrategy::CenterOnTray, false);
        coordinator.popup.create();
        coordinator.handle(toggle());
        assert_eq!(coordinator.popup().state(), PopupState::CreatedNotReady);
        assert_eq!(popup_surface(&coordinator).shows, 0);
    }

    #[test]
    fn test_two_toggles_show_then_hide_at_tray() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(toggle());
        assert!(coordinator.popup_visible());
        coordinator.handle(toggle());
        assert!(!coordinator.popup_visible());

        let surface = popup_surface(&coordinator);
        assert_eq!(surface.shows, 1);
        assert_eq!(surface.hides, 1);
        assert_eq!(surface.positions, vec![ScreenPoint::new(365, 505); 2]);
    }

    #[test]
    fn test_anchor_strategy_uses_work_area_corner() {
        let mut coordinator = started(PositionStrategy::AnchorToWorkArea);
        coordinator.handle(toggle());
        assert_eq!(
            popup_surface(&coordinator).positions,
            vec![ScreenPoint::new(1224, 978)]
        );
    }

    #[test]
    fn test_toggle_after_close_recreates_and_shows_on_paint() {
        let (mut coordinator, created, _) = coordinator_with(PositionStrategy::CenterOnTray, false);
        coordinator.popup.create();
        coordinator.popup_painted();
        coordinator.popup_closed();
        assert!(coordinator.popup().surface().is_none());

        coordinator.handle(toggle());
        assert_eq!(created.get(), 2);
        assert_eq!(popup_surface(&coordinator).shows, 0);

        coordinator.popup_painted();
        let surface = popup_surface(&coordinator);
        assert_eq!(surface.serial, 2);
        assert_eq!(surface.shows, 1);
        assert_eq!(surface.positions, vec![ScreenPoint::new(365, 505)]);

        // later paints do not replay anything
        coordinator.popup_painted();
        assert_eq!(popup_surface(&coordinator).shows, 1);
    }

    #[test]
    fn test_refresh_icon_while_hidden() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(Command::RefreshIcon);
        assert_eq!(
            coordinator.tray().paths,
            vec!["icons/tray/TraycalIcon18Template@2x.png".to_string()]
        );
        assert_eq!(
            popup_surface(&coordinator).signals,
            vec![ContentSignal::BackgroundUpdate]
        );
    }

    #[test]
    fn test_refresh_icon_while_visible_leaves_content_alone() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(toggle());
        coordinator.handle(Command::RefreshIcon);
        assert_eq!(coordinator.tray().paths.len(), 1);
        assert!(popup_surface(&coordinator).signals.is_empty());
    }

    #[test]
    fn test_blur_hides_visible_popup() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(toggle());
        coordinator.popup_blurred();
        assert!(!coordinator.popup_visible());
        assert_eq!(
            popup_surface(&coordinator).signals,
            vec![ContentSignal::BackgroundUpdate]
        );

        coordinator.popup_blurred();
        assert_eq!(popup_surface(&coordinator).signals.len(), 1);
    }

    #[test]
    fn test_about_close_keeps_handle_and_toggle_shows_it() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(Command::Host(HostRequest::ShowAbout));
        assert!(coordinator.about().is_visible());

        coordinator.about_close_requested();
        assert!(!coordinator.about().is_visible());

        coordinator.handle(Command::Host(HostRequest::ShowAbout));
        let about = coordinator.about().surface();
        assert!(about.visible);
        assert_eq!(about.serial, 7);
        assert_eq!(about.shows, 2);
        assert!(about.positions.is_empty());
    }

    #[test]
    fn test_content_requests() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(Command::Host(HostRequest::GetFirstWeekday));
        coordinator.handle(Command::Host(HostRequest::ShowConfigMenu));
        assert_eq!(
            popup_surface(&coordinator).signals,
            vec![
                ContentSignal::SetFirstWeekday(2),
                ContentSignal::OpenConfigMenu
            ]
        );
    }

    #[test]
    fn test_quit_cancels_icon_refresher() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        let (tx, rx) = mpsc::channel();
        coordinator.refresher = Some(IconRefresher::start(
            Duration::from_secs(3600),
            tx,
            || {},
        ));

        coordinator.handle(Command::Host(HostRequest::QuitApp));
        assert!(coordinator.is_quitting());
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(2)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_downloaded_update_reaches_content_and_installs() {
        let (mut coordinator, _, _) = coordinator_with(PositionStrategy::CenterOnTray, true);
        coordinator.popup.create();
        coordinator.popup_painted();

        let backend = Arc::new(FakeBackend {
            release: Some(release("2.0.0")),
            ..Default::default()
        });
        coordinator.updater = Some(UpdateNotifier::new(backend.clone()));

        coordinator.handle(Command::Update(UpdateEvent::Downloaded {
            release_notes: "Bug fixes".into(),
            release_name: "2.0.0".into(),
            artifact: PathBuf::from("/tmp/2.0.0"),
        }));
        assert_eq!(
            popup_surface(&coordinator).signals,
            vec![
                ContentSignal::UpdateDownloaded,
                ContentSignal::UpdateReady {
                    release_notes: "Bug fixes".into(),
                    release_name: "2.0.0".into(),
                }
            ]
        );

        coordinator.handle(Command::Host(HostRequest::InstallUpdate));
        assert_eq!(
            *backend.applied.lock().unwrap(),
            vec![PathBuf::from("/tmp/2.0.0")]
        );
        assert!(coordinator.is_quitting());
    }

    #[test]
    fn test_recreated_popup_learns_pending_update() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(Command::Update(UpdateEvent::Downloaded {
            release_notes: String::new(),
            release_name: "2.0.0".into(),
            artifact: PathBuf::from("/tmp/2.0.0"),
        }));
        coordinator.popup_closed();
        coordinator.handle(toggle());
        coordinator.popup_painted();

        let signals = &popup_surface(&coordinator).signals;
        assert_eq!(signals[0], ContentSignal::UpdateDownloaded);
        assert!(matches!(&signals[1], ContentSignal::UpdateReady { release_name, .. } if release_name == "2.0.0"));
    }

    #[test]
    fn test_install_without_download_is_reported() {
        let (mut coordinator, _, sink) = coordinator_with(PositionStrategy::CenterOnTray, true);
        coordinator.updater = Some(UpdateNotifier::new(Arc::new(FakeBackend::default())));
        coordinator.handle(Command::Host(HostRequest::InstallUpdate));
        assert!(!coordinator.is_quitting());

        let reports = wait_for_reports(&sink, 1);
        assert!(matches!(&reports[..], [Report::UpdateFailed(_)]));
    }

    #[test]
    fn test_update_error_is_reported_in_production() {
        let (mut coordinator, _, sink) = coordinator_with(PositionStrategy::CenterOnTray, true);
        coordinator.handle(Command::Update(UpdateEvent::Error("timeout".into())));
        assert_eq!(
            wait_for_reports(&sink, 1),
            vec![Report::UpdateFailed("timeout".into())]
        );
    }

    #[test]
    fn test_development_reports_nothing() {
        let (mut coordinator, _, sink) = coordinator_with(PositionStrategy::CenterOnTray, false);
        coordinator.handle(Command::Update(UpdateEvent::Error("timeout".into())));
        coordinator.popup_frame_timed(true);
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[test]
    fn test_crash_reports_and_drops_popup() {
        let (mut coordinator, _, sink) = coordinator_with(PositionStrategy::CenterOnTray, true);
        coordinator.popup.create();
        coordinator.popup_painted();
        coordinator.popup_crashed("index out of bounds".into());

        assert_eq!(coordinator.popup().state(), PopupState::Destroyed);
        assert_eq!(
            wait_for_reports(&sink, 1),
            vec![Report::ContentCrashed("index out of bounds".into())]
        );
    }

    #[test]
    fn test_toggle_without_tray_bounds_uses_top_right() {
        let mut coordinator = started(PositionStrategy::CenterOnTray);
        coordinator.handle(Command::ToggleMain {
            tray_bounds: Rect::default(),
            cursor: ScreenPoint::new(0, 0),
        });
        assert_eq!(
            popup_surface(&coordinator).positions,
            vec![ScreenPoint::new(1209, 505)]
        );
    }

    #[test]
    fn test_slow_frames_report_once_per_hang() {
        let (mut coordinator, _, sink) = coordinator_with(PositionStrategy::CenterOnTray, true);
        coordinator.popup_frame_timed(true);
        coordinator.popup_frame_timed(true);
        coordinator.popup_frame_timed(true);
        assert_eq!(wait_for_reports(&sink, 1), vec![Report::ContentUnresponsive]);

        coordinator.popup_frame_timed(false);
        coordinator.popup_frame_timed(true);
        assert_eq!(
            wait_for_reports(&sink, 2),
            vec![Report::ContentUnresponsive, Report::ContentUnresponsive]
        );
    }

    #[test]
    fn test_downloaded_update_raises_alert() {
        let alert = RecordingAlert::default();
        let shown = Rc::clone(&alert.shown);
        let mut coordinator =
            started(PositionStrategy::CenterOnTray).with_update_alert(Box::new(alert));

        coordinator.handle(Command::Update(UpdateEvent::Available));
        assert!(shown.borrow().is_empty());

        coordinator.handle(Command::Update(UpdateEvent::Downloaded {
            release_notes: "Bug fixes".into(),
            release_name: "2.0.0".into(),
            artifact: PathBuf::from("/tmp/2.0.0"),
        }));
        assert_eq!(
            *shown.borrow(),
            vec![("2.0.0".to_string(), "Bug fixes".to_string())]
        );
    }
}
