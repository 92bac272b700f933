//! Popup placement relative to the tray icon and the display work area.

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, ScreenPoint, Size};

/// Gap between the top of the work area and the popup.
pub const TOP_GAP: i32 = 5;

/// Margin kept between the popup's right edge and the work area's width.
pub const RIGHT_MARGIN: i32 = 15;

/// How the popup is anchored. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStrategy {
    /// Bottom-right corner of the work area. Tray bounds are ignored because
    /// the taskbar reports them unreliably.
    AnchorToWorkArea,
    /// Centered under the tray icon, just below the top of the work area.
    CenterOnTray,
}

impl PositionStrategy {
    pub fn for_host() -> Self {
        if cfg!(windows) {
            Self::AnchorToWorkArea
        } else {
            Self::CenterOnTray
        }
    }
}

/// Computes the popup's top-left corner.
///
/// `work_area` is the work area of the display nearest the cursor; the
/// caller looks it up. The vertical position never uses the tray bounds:
/// the macOS tray reports `y` as zero.
pub fn compute_position(
    strategy: PositionStrategy,
    tray_bounds: Rect,
    window: Size,
    work_area: Rect,
) -> ScreenPoint {
    match strategy {
        PositionStrategy::AnchorToWorkArea => ScreenPoint::new(
            work_area.x + work_area.width - window.width,
            work_area.y + work_area.height - window.height,
        ),
        PositionStrategy::CenterOnTray => {
            // tray.x + tray.width / 2 - window.width / 2, floored once
            let x = (tray_bounds.x * 2 + tray_bounds.width - window.width).div_euclid(2);
            let y = work_area.y + TOP_GAP;

            let right_edge = x + window.width;
            let max_right = work_area.width - RIGHT_MARGIN;

            // Not a clamp: subtracts both the right edge and max_right.
            if right_edge > max_right {
                return ScreenPoint::new(x - right_edge - max_right, y);
            }

            ScreenPoint::new(x, y)
        }
    }
}

/// Top-right corner of the work area, for when the tray icon never reported
/// its bounds (menu-only trays).
pub fn place_without_tray(window: Size, work_area: Rect) -> ScreenPoint {
    ScreenPoint::new(
        work_area.x + work_area.width - window.width - RIGHT_MARGIN,
        work_area.y + TOP_GAP,
    )
}
