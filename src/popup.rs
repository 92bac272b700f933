//! Lifecycle of the main popup window.

use crate::geometry::{ScreenPoint, Size};
use crate::signals::ContentSignal;
use crate::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    Uninitialized,
    CreatedNotReady,
    CreatedReady,
    Hidden,
    Visible,
    Destroyed,
}

/// What a toggle request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Content has not painted yet; nothing happened.
    NotReady,
    Shown,
    Hidden,
    /// The handle was gone and a new surface was created. It is shown once
    /// its content paints.
    Recreated,
}

/// Owns the popup's handle slot. An empty slot is a valid state: the next
/// toggle recreates the surface instead of touching a stale handle.
pub struct PopupWindow<S> {
    slot: Option<S>,
    state: PopupState,
    show_when_ready: bool,
    create: Box<dyn FnMut() -> S>,
}

impl<S: Surface> PopupWindow<S> {
    pub fn new(create: impl FnMut() -> S + 'static) -> Self {
        Self {
            slot: None,
            state: PopupState::Uninitialized,
            show_when_ready: false,
            create: Box::new(create),
        }
    }

    /// Builds the surface, hidden, and waits for its first paint.
    pub fn create(&mut self) {
        if self.slot.is_some() {
            return;
        }
        let surface = (self.create)();
        self.slot = Some(surface);
        self.state = PopupState::CreatedNotReady;
        tracing::debug!("popup surface created");
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            self.state,
            PopupState::CreatedReady | PopupState::Hidden | PopupState::Visible
        )
    }

    pub fn is_visible(&self) -> bool {
        self.state == PopupState::Visible
    }

    #[cfg(test)]
    pub fn surface(&self) -> Option<&S> {
        self.slot.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.slot.as_mut()
    }

    /// Marks the content as painted. Returns true when a toggle arrived while
    /// the surface was being recreated and should now be replayed.
    pub fn on_first_paint(&mut self) -> bool {
        if self.state != PopupState::CreatedNotReady {
            return false;
        }
        self.state = PopupState::CreatedReady;
        tracing::debug!("popup ready to show");
        std::mem::take(&mut self.show_when_ready)
    }

    /// Positions the surface with `place` and flips its visibility.
    pub fn toggle(&mut self, place: impl FnOnce(Size) -> ScreenPoint) -> ToggleOutcome {
        if matches!(self.state, PopupState::Uninitialized | PopupState::Destroyed) {
            self.create();
            self.show_when_ready = true;
            return ToggleOutcome::Recreated;
        }
        if !self.is_ready() {
            return ToggleOutcome::NotReady;
        }
        let Some(surface) = self.slot.as_mut() else {
            return ToggleOutcome::NotReady;
        };

        let at = place(surface.size());
        surface.set_position(at);

        if surface.is_visible() {
            surface.hide();
            self.state = PopupState::Hidden;
            ToggleOutcome::Hidden
        } else {
            surface.show();
            self.state = PopupState::Visible;
            ToggleOutcome::Shown
        }
    }

    /// Focus left the popup: hide it and let the content reset itself.
    pub fn on_blur(&mut self) {
        let Some(surface) = self.slot.as_mut() else {
            return;
        };
        surface.hide();
        surface.send(ContentSignal::BackgroundUpdate);
        if self.state == PopupState::Visible {
            self.state = PopupState::Hidden;
        }
    }

    /// The user closed the popup. The handle is dropped.
    pub fn on_closed(&mut self) {
        if let Some(mut surface) = self.slot.take() {
            surface.hide();
        }
        self.state = PopupState::Destroyed;
        self.show_when_ready = false;
        tracing::info!("popup closed; it will be recreated on the next toggle");
    }

    /// Sends to the live content, if any.
    pub fn send(&mut self, signal: ContentSignal) {
        match self.slot.as_mut() {
            Some(surface) => surface.send(signal),
            None => tracing::debug!(?signal, "popup is gone; signal dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::surface::fake::FakeSurface;

    fn popup() -> (PopupWindow<FakeSurface>, Rc<Cell<u32>>) {
        let created = Rc::new(Cell::new(0));
        let counter = Rc::clone(&created);
        let popup = PopupWindow::new(move || {
            counter.set(counter.get() + 1);
            FakeSurface::new(counter.get())
        });
        (popup, created)
    }

    fn ready_popup() -> PopupWindow<FakeSurface> {
        let (mut popup, _) = popup();
        popup.create();
        popup.on_first_paint();
        popup
    }

    fn at_origin(_: Size) -> ScreenPoint {
        ScreenPoint::new(0, 0)
    }

    #[test]
    fn test_create_starts_hidden_and_not_ready() {
        let (mut popup, created) = popup();
        assert_eq!(popup.state(), PopupState::Uninitialized);
        popup.create();
        assert_eq!(popup.state(), PopupState::CreatedNotReady);
        assert_eq!(created.get(), 1);
        assert!(!popup.surface().unwrap().visible);
    }

    #[test]
    fn test_toggle_ignored_until_first_paint() {
        let (mut popup, _) = popup();
        popup.create();
        assert_eq!(popup.toggle(at_origin), ToggleOutcome::NotReady);
        let surface = popup.surface().unwrap();
        assert_eq!(surface.shows, 0);
        assert!(surface.positions.is_empty());
    }

    #[test]
    fn test_two_toggles_show_then_hide() {
        let mut popup = ready_popup();
        assert_eq!(popup.toggle(at_origin), ToggleOutcome::Shown);
        assert!(popup.is_visible());
        assert_eq!(popup.toggle(at_origin), ToggleOutcome::Hidden);
        assert_eq!(popup.state(), PopupState::Hidden);

        let surface = popup.surface().unwrap();
        assert_eq!(surface.shows, 1);
        assert_eq!(surface.hides, 1);
    }

    #[test]
    fn test_toggle_positions_before_flipping() {
        let mut popup = ready_popup();
        popup.toggle(|size| ScreenPoint::new(size.width, size.height));
        popup.toggle(|_| ScreenPoint::new(7, 8));
        assert_eq!(
            popup.surface().unwrap().positions,
            vec![ScreenPoint::new(300, 290), ScreenPoint::new(7, 8)]
        );
    }

    #[test]
    fn test_blur_hides_and_requests_background_update() {
        let mut popup = ready_popup();
        popup.toggle(at_origin);
        popup.on_blur();
        assert_eq!(popup.state(), PopupState::Hidden);
        let surface = popup.surface().unwrap();
        assert!(!surface.visible);
        assert_eq!(surface.signals, vec![ContentSignal::BackgroundUpdate]);
    }

    #[test]
    fn test_blur_while_hidden_is_harmless() {
        let mut popup = ready_popup();
        popup.on_blur();
        popup.on_blur();
        assert_eq!(popup.state(), PopupState::CreatedReady);
        assert_eq!(popup.surface().unwrap().hides, 2);
    }

    #[test]
    fn test_close_drops_handle() {
        let mut popup = ready_popup();
        popup.toggle(at_origin);
        popup.on_closed();
        assert_eq!(popup.state(), PopupState::Destroyed);
        assert!(popup.surface().is_none());
        popup.send(ContentSignal::BackgroundUpdate);
    }

    #[test]
    fn test_toggle_after_close_recreates_then_shows_on_paint() {
        let (mut popup, created) = popup();
        popup.create();
        popup.on_first_paint();
        popup.on_closed();

        assert_eq!(popup.toggle(at_origin), ToggleOutcome::Recreated);
        assert_eq!(created.get(), 2);
        assert_eq!(popup.state(), PopupState::CreatedNotReady);
        assert_eq!(popup.surface().unwrap().serial, 2);

        // a second click before paint does not queue a second show
        assert_eq!(popup.toggle(at_origin), ToggleOutcome::NotReady);
        assert!(popup.on_first_paint());
        assert!(!popup.on_first_paint());
    }

    #[test]
    fn test_first_paint_without_pending_toggle() {
        let (mut popup, _) = popup();
        popup.create();
        assert!(!popup.on_first_paint());
        assert_eq!(popup.state(), PopupState::CreatedReady);
    }
}
