//! Pointer interaction modes.
//!
//! The cursor is either passing events through to clients, dragging a
//! toplevel, resizing one, or panning the viewport. Grab data only exists
//! inside the mode that needs it, so a Passthrough cursor can never hold a
//! stale grabbed toplevel.

use bitflags::bitflags;
use tracing::debug;

use crate::state::Geometry;
use crate::toplevel::{Toplevel, ToplevelId};
use crate::viewport::Viewport;

bitflags! {
    /// Window edges taking part in an interactive resize.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ResizeEdges: u32 {
        const TOP    = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT   = 0b0100;
        const RIGHT  = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CursorMode {
    #[default]
    Passthrough,
    Move {
        toplevel: ToplevelId,
        /// Pointer position minus toplevel position at grab time.
        grab: (f64, f64),
    },
    Resize {
        toplevel: ToplevelId,
        /// Pointer position minus the grabbed border position.
        grab: (f64, f64),
        /// Window geometry box in scene coordinates at grab time.
        grab_box: Geometry,
        edges: ResizeEdges,
    },
    Pan,
}

impl CursorMode {
    pub const fn grabbed(&self) -> Option<ToplevelId> {
        match self {
            Self::Move { toplevel, .. } | Self::Resize { toplevel, .. } => Some(*toplevel),
            Self::Passthrough | Self::Pan => None,
        }
    }
}

/// Process-wide pointer state.
#[derive(Debug, Clone)]
pub struct CursorState {
    /// Layout coordinates.
    pub position: (f64, f64),
    pub mode: CursorMode,
    pub viewport: Viewport,
    /// Cursor image shown when no client surface is hovered.
    pub default_image: String,
    /// Whether the default image is what the pointer currently shows.
    default_shown: bool,
}

impl CursorState {
    pub fn new(default_image: String) -> Self {
        Self {
            position: (0.0, 0.0),
            mode: CursorMode::Passthrough,
            viewport: Viewport::default(),
            default_image,
            default_shown: false,
        }
    }

    /// The default image name, unless it is already on screen.
    pub fn show_default(&mut self) -> Option<String> {
        if self.default_shown {
            return None;
        }
        self.default_shown = true;
        Some(self.default_image.clone())
    }

    /// A client surface took over the cursor image.
    pub fn client_image(&mut self) {
        self.default_shown = false;
    }

    /// Pointer position with the viewport offset removed.
    pub fn scene_position(&self) -> (f64, f64) {
        self.viewport.to_scene(self.position.0, self.position.1)
    }

    /// Start dragging `toplevel`.
    pub fn begin_move(&mut self, toplevel: &Toplevel) {
        let (cx, cy) = self.scene_position();
        let grab = (
            cx - f64::from(toplevel.position.0),
            cy - f64::from(toplevel.position.1),
        );
        debug!("Begin move of {} with grab {:?}", toplevel.id, grab);
        self.mode = CursorMode::Move {
            toplevel: toplevel.id,
            grab,
        };
    }

    /// Start resizing `toplevel` along `edges`.
    pub fn begin_resize(&mut self, toplevel: &Toplevel, edges: ResizeEdges) {
        let (cx, cy) = self.scene_position();
        let frame = toplevel.frame();
        let border_x = if edges.contains(ResizeEdges::RIGHT) {
            frame.right()
        } else {
            frame.x
        };
        let border_y = if edges.contains(ResizeEdges::BOTTOM) {
            frame.bottom()
        } else {
            frame.y
        };
        let grab = (cx - f64::from(border_x), cy - f64::from(border_y));
        debug!("Begin resize of {} along {:?}, box {:?}", toplevel.id, edges, frame);
        self.mode = CursorMode::Resize {
            toplevel: toplevel.id,
            grab,
            grab_box: frame,
            edges,
        };
    }

    pub fn begin_pan(&mut self) {
        debug!("Begin pan");
        self.mode = CursorMode::Pan;
    }

    /// Back to Passthrough, dropping any grab.
    pub fn reset(&mut self) {
        if self.mode != CursorMode::Passthrough {
            debug!("Cursor mode {:?} reset", self.mode);
        }
        self.mode = CursorMode::Passthrough;
    }
}

/// New window geometry box for a resize in progress.
///
/// Starts from `grab_box` and moves only the edges in `edges` to the border
/// position. Top wins over bottom and left over right when both of a pair
/// are set. A moved edge never crosses its opposite edge, so the result is
/// at least one pixel on each axis.
pub fn resize_box(grab_box: Geometry, edges: ResizeEdges, border: (f64, f64)) -> Geometry {
    let border_x = border.0 as i32;
    let border_y = border.1 as i32;
    let mut left = grab_box.x;
    let mut right = grab_box.right();
    let mut top = grab_box.y;
    let mut bottom = grab_box.bottom();

    if edges.contains(ResizeEdges::TOP) {
        top = border_y.min(bottom - 1);
    } else if edges.contains(ResizeEdges::BOTTOM) {
        bottom = border_y.max(top + 1);
    }
    if edges.contains(ResizeEdges::LEFT) {
        left = border_x.min(right - 1);
    } else if edges.contains(ResizeEdges::RIGHT) {
        right = border_x.max(left + 1);
    }

    Geometry::new(left, top, (right - left) as u32, (bottom - top) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceId;
    use pretty_assertions::assert_eq;

    fn toplevel() -> Toplevel {
        let mut t = Toplevel::new(ToplevelId(1), SurfaceId(1), String::new(), String::new());
        t.position = (100, 100);
        t.geometry = Geometry::new(0, 0, 200, 150);
        t
    }

    #[test]
    fn right_edge_past_left_keeps_one_pixel() {
        let start = Geometry::new(0, 0, 100, 100);
        let out = resize_box(start, ResizeEdges::RIGHT, (-5.0, 50.0));
        assert_eq!(out, Geometry::new(0, 0, 1, 100));
    }

    #[test]
    fn top_edge_past_bottom_keeps_one_pixel() {
        let start = Geometry::new(0, 0, 100, 100);
        let out = resize_box(start, ResizeEdges::TOP, (0.0, 300.0));
        assert_eq!(out, Geometry::new(0, 99, 100, 1));
    }

    #[test]
    fn top_wins_over_bottom() {
        let start = Geometry::new(0, 0, 100, 100);
        let out = resize_box(start, ResizeEdges::TOP | ResizeEdges::BOTTOM, (0.0, 20.0));
        assert_eq!(out, Geometry::new(0, 20, 100, 80));
    }

    #[test]
    fn corner_resize_moves_origin() {
        let start = Geometry::new(10, 10, 100, 100);
        let out = resize_box(start, ResizeEdges::TOP | ResizeEdges::LEFT, (0.0, 5.0));
        assert_eq!(out, Geometry::new(0, 5, 110, 105));
    }

    #[test]
    fn resize_grab_measures_from_moving_border() {
        let mut cursor = CursorState::new("default".into());
        cursor.position = (310.0, 260.0);
        cursor.begin_resize(&toplevel(), ResizeEdges::BOTTOM | ResizeEdges::RIGHT);
        match cursor.mode {
            CursorMode::Resize { grab, grab_box, .. } => {
                assert_eq!(grab, (10.0, 10.0));
                assert_eq!(grab_box, Geometry::new(100, 100, 200, 150));
            }
            other => panic!("unexpected mode {other:?}"),
        }
    }

    #[test]
    fn move_grab_uses_scene_coordinates() {
        let mut cursor = CursorState::new("default".into());
        cursor.viewport.pan_by(50.0, 0.0);
        cursor.position = (200.0, 120.0);
        cursor.begin_move(&toplevel());
        assert_eq!(
            cursor.mode,
            CursorMode::Move {
                toplevel: ToplevelId(1),
                grab: (50.0, 20.0),
            }
        );

        cursor.reset();
        assert_eq!(cursor.mode.grabbed(), None);
    }
}
