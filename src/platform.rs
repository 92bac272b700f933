use crate::geometry::{Rect, ScreenPoint};

/// Native title of the popup window, used to find it from other threads.
pub const POPUP_TITLE: &str = "Traycal";
pub const ABOUT_TITLE: &str = "About Traycal";

/// Looks up the work area of the display nearest a point.
pub trait WorkAreaSource {
    fn work_area_near(&self, point: ScreenPoint) -> Rect;
}

/// Win32 does not deliver `WM_PAINT` to a window hidden with
/// `ViewportCommand::Visible(false)`, so `ctx.request_repaint()` alone never
/// reaches `update()` while the popup is hidden.
///
/// This posts an internal paint to the popup without showing it, so queued
/// commands are drained while it stays hidden.
///
/// No-op on other platforms, where the egui repaint request is enough.
pub fn wake_event_loop() {
    #[cfg(windows)]
    {
        use windows_sys::Win32::Graphics::Gdi::{RedrawWindow, RDW_INTERNALPAINT};

        let hwnd = find_window(POPUP_TITLE);
        if !hwnd.is_null() {
            unsafe {
                RedrawWindow(hwnd, std::ptr::null(), std::ptr::null_mut(), RDW_INTERNALPAINT);
            }
        }
    }
}

/// Wakes the UI thread after a background thread queued a command.
pub fn wake(ctx: &eframe::egui::Context) {
    wake_event_loop();
    ctx.request_repaint();
}

/// Hide the window immediately via Win32 `ShowWindow(SW_HIDE)`, before egui's
/// next frame can flash a black clear-color.
///
/// No-op on non-Windows platforms.
pub fn hide_window_native(title: &str) {
    #[cfg(windows)]
    {
        use windows_sys::Win32::UI::WindowsAndMessaging::{ShowWindow, SW_HIDE};

        let hwnd = find_window(title);
        if !hwnd.is_null() {
            unsafe {
                ShowWindow(hwnd, SW_HIDE);
            }
        }
    }
    #[cfg(not(windows))]
    let _ = title;
}

#[cfg(windows)]
fn find_window(title: &str) -> windows_sys::Win32::Foundation::HWND {
    use windows_sys::Win32::UI::WindowsAndMessaging::FindWindowW;

    let title: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();
    unsafe { FindWindowW(std::ptr::null(), title.as_ptr()) }
}

/// Work area from the monitor nearest the point, via `GetMonitorInfoW`.
#[cfg(windows)]
pub struct MonitorWorkArea;

#[cfg(windows)]
impl WorkAreaSource for MonitorWorkArea {
    fn work_area_near(&self, point: ScreenPoint) -> Rect {
        use windows_sys::Win32::Foundation::POINT;
        use windows_sys::Win32::Graphics::Gdi::{
            GetMonitorInfoW, MonitorFromPoint, MONITORINFO, MONITOR_DEFAULTTONEAREST,
        };

        let pt = POINT {
            x: point.x,
            y: point.y,
        };
        let mut info: MONITORINFO = unsafe { std::mem::zeroed() };
        info.cbSize = std::mem::size_of::<MONITORINFO>() as u32;

        let ok = unsafe {
            let monitor = MonitorFromPoint(pt, MONITOR_DEFAULTTONEAREST);
            GetMonitorInfoW(monitor, &mut info)
        };
        if ok == 0 {
            tracing::warn!(?point, "GetMonitorInfoW failed; assuming 1920x1080");
            return Rect::new(0, 0, 1920, 1080);
        }

        let work = info.rcWork;
        Rect::new(
            work.left,
            work.top,
            work.right - work.left,
            work.bottom - work.top,
        )
    }
}

/// Work area from the monitor egui reports for the popup, minus a fixed top
/// inset for the menu bar. Only knows about that one monitor.
#[cfg_attr(windows, allow(dead_code))]
pub struct ViewportWorkArea {
    ctx: eframe::egui::Context,
    top_inset: f32,
}

#[cfg_attr(windows, allow(dead_code))]
impl ViewportWorkArea {
    pub fn new(ctx: eframe::egui::Context, top_inset: f32) -> Self {
        Self { ctx, top_inset }
    }
}

impl WorkAreaSource for ViewportWorkArea {
    fn work_area_near(&self, point: ScreenPoint) -> Rect {
        let (monitor, ppp) = self.ctx.input(|i| {
            (
                i.viewport()
                    .monitor_size
                    .unwrap_or(eframe::egui::vec2(1920.0, 1080.0)),
                i.pixels_per_point,
            )
        });
        let inset = (self.top_inset * ppp).round() as i32;
        let area = Rect::new(
            0,
            inset,
            (monitor.x * ppp).round() as i32,
            (monitor.y * ppp).round() as i32 - inset,
        );
        if !area.contains(point) {
            tracing::debug!(?point, ?area, "cursor outside the popup's monitor");
        }
        area
    }
}

/// The work area source for the host platform.
pub fn work_area_source(ctx: eframe::egui::Context, top_inset: f32) -> Box<dyn WorkAreaSource> {
    #[cfg(windows)]
    {
        let _ = (ctx, top_inset);
        Box::new(MonitorWorkArea)
    }
    #[cfg(not(windows))]
    {
        Box::new(ViewportWorkArea::new(ctx, top_inset))
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;

    pub struct FixedWorkArea(pub Rect);

    impl WorkAreaSource for FixedWorkArea {
        fn work_area_near(&self, _point: ScreenPoint) -> Rect {
            self.0
        }
    }
}
