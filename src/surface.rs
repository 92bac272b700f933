//! Window handles as the coordinator sees them.

use eframe::egui::{self, ViewportCommand, ViewportId};

use crate::geometry::{ScreenPoint, Size};
use crate::platform;
use crate::signals::ContentSignal;

/// A show/hide-able window with content behind it.
///
/// `hide` on a hidden surface and `show` on a visible one are harmless.
pub trait Surface {
    fn is_visible(&self) -> bool;
    fn show(&mut self);
    fn hide(&mut self);
    /// Moves the outer top-left corner, in device pixels.
    fn set_position(&mut self, at: ScreenPoint);
    /// Outer size in device pixels.
    fn size(&self) -> Size;
    fn send(&mut self, signal: ContentSignal);
}

/// Whatever is rendered inside a surface.
pub trait Content {
    fn receive(&mut self, signal: ContentSignal);
}

/// An egui viewport driven through viewport commands.
pub struct ViewportSurface<C> {
    ctx: egui::Context,
    id: ViewportId,
    title: String,
    size: egui::Vec2,
    visible: bool,
    content: C,
}

impl<C: Content> ViewportSurface<C> {
    /// Wraps a viewport that starts hidden. `size` is in points.
    pub fn new(
        ctx: egui::Context,
        id: ViewportId,
        title: impl Into<String>,
        size: egui::Vec2,
        content: C,
    ) -> Self {
        Self {
            ctx,
            id,
            title: title.into(),
            size,
            visible: false,
            content,
        }
    }

    pub fn id(&self) -> ViewportId {
        self.id
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    fn pixels_per_point(&self) -> f32 {
        self.ctx.input_for(self.id, |i| i.pixels_per_point)
    }
}

impl<C: Content> Surface for ViewportSurface<C> {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn show(&mut self) {
        self.visible = true;
        self.ctx
            .send_viewport_cmd_to(self.id, ViewportCommand::Visible(true));
        self.ctx.send_viewport_cmd_to(self.id, ViewportCommand::Focus);
        self.ctx.request_repaint_of(self.id);
    }

    fn hide(&mut self) {
        self.visible = false;
        // Hide natively first so the clear color never flashes.
        platform::hide_window_native(&self.title);
        self.ctx
            .send_viewport_cmd_to(self.id, ViewportCommand::Visible(false));
    }

    fn set_position(&mut self, at: ScreenPoint) {
        let ppp = self.pixels_per_point();
        let pos = egui::pos2(at.x as f32 / ppp, at.y as f32 / ppp);
        self.ctx
            .send_viewport_cmd_to(self.id, ViewportCommand::OuterPosition(pos));
    }

    fn size(&self) -> Size {
        let ppp = self.pixels_per_point();
        Size::new(
            (self.size.x * ppp).round() as i32,
            (self.size.y * ppp).round() as i32,
        )
    }

    fn send(&mut self, signal: ContentSignal) {
        self.content.receive(signal);
    }
}
