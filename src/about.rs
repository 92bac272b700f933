//! The "About" window: created once, hidden instead of closed.

use crate::signals::ContentSignal;
use crate::surface::{Content, Surface};

pub struct AboutWindow<S> {
    surface: S,
}

impl<S: Surface> AboutWindow<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn is_visible(&self) -> bool {
        self.surface.is_visible()
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Shows or hides the window. It is always centered by the platform, so
    /// no position is set.
    pub fn toggle(&mut self) {
        if self.surface.is_visible() {
            self.surface.hide();
        } else {
            self.surface.show();
        }
    }

    /// Turns a close into a hide; the handle stays valid. The caller cancels
    /// the platform close.
    pub fn on_close_requested(&mut self) {
        self.surface.hide();
    }
}

/// Static content of the about window.
pub struct AboutView {
    pub name: &'static str,
    pub version: &'static str,
}

impl Default for AboutView {
    fn default() -> Self {
        Self {
            name: "Traycal",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl AboutView {
    pub fn ui(&self, ui: &mut eframe::egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading(self.name);
            ui.label(format!("Version {}", self.version));
            ui.add_space(12.0);
            ui.label("A calendar that lives in your menu bar.");
        });
    }
}

impl Content for AboutView {
    fn receive(&mut self, _signal: ContentSignal) {}
}
