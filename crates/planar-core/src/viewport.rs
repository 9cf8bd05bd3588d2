//! Desktop panning.
//!
//! The viewport offset is the displacement of all toplevel content on
//! screen. It is only applied while a frame is being captured; stored
//! toplevel positions always stay in unpanned scene coordinates so that
//! hit testing and grabs never see it.

use tracing::trace;

use crate::output::OutputId;
use crate::toplevel::{ToplevelId, ToplevelRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub offset: (f64, f64),
}

impl Viewport {
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.0 += dx;
        self.offset.1 += dy;
        trace!("Viewport offset {:?}", self.offset);
    }

    /// Offset rounded to whole pixels, as applied when rendering.
    pub fn rounded(&self) -> (i32, i32) {
        (self.offset.0.round() as i32, self.offset.1.round() as i32)
    }

    /// Convert a layout point to unpanned scene coordinates.
    pub fn to_scene(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.offset.0, y - self.offset.1)
    }
}

/// Positions of every mapped toplevel as they appear in one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub output: OutputId,
    /// Back-most first, in render order.
    pub toplevels: Vec<(ToplevelId, i32, i32)>,
}

/// Toplevel positions shifted by the viewport offset for as long as this
/// guard lives. Dropping it puts every position back.
pub struct Panned<'a> {
    toplevels: &'a mut ToplevelRegistry,
    delta: (i32, i32),
}

impl<'a> Panned<'a> {
    pub fn apply(toplevels: &'a mut ToplevelRegistry, viewport: &Viewport) -> Self {
        let delta = viewport.rounded();
        for toplevel in toplevels.iter_mut() {
            toplevel.position.0 = toplevel.position.0.wrapping_add(delta.0);
            toplevel.position.1 = toplevel.position.1.wrapping_add(delta.1);
        }
        Self { toplevels, delta }
    }

    pub fn snapshot(&self, output: OutputId) -> FrameSnapshot {
        let toplevels = self
            .toplevels
            .stack()
            .iter()
            .rev()
            .filter_map(|&id| self.toplevels.get(id))
            .map(|t| (t.id, t.position.0, t.position.1))
            .collect();
        FrameSnapshot { output, toplevels }
    }
}

impl Drop for Panned<'_> {
    fn drop(&mut self) {
        for toplevel in self.toplevels.iter_mut() {
            toplevel.position.0 = toplevel.position.0.wrapping_sub(self.delta.0);
            toplevel.position.1 = toplevel.position.1.wrapping_sub(self.delta.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceId;
    use crate::toplevel::Toplevel;

    #[test]
    fn frame_positions_shift_and_revert() {
        let mut reg = ToplevelRegistry::new();
        let mut t = Toplevel::new(ToplevelId(1), SurfaceId(1), String::new(), String::new());
        t.position = (10, 20);
        reg.insert(t);
        reg.map(ToplevelId(1));

        let mut viewport = Viewport::default();
        viewport.pan_by(5.4, -7.6);
        {
            let panned = Panned::apply(&mut reg, &viewport);
            let snap = panned.snapshot(OutputId(1));
            assert_eq!(snap.toplevels, vec![(ToplevelId(1), 15, 12)]);
        }
        assert_eq!(reg.get(ToplevelId(1)).unwrap().position, (10, 20));
    }

    #[test]
    fn huge_offset_reverts_exactly() {
        let mut reg = ToplevelRegistry::new();
        let mut t = Toplevel::new(ToplevelId(1), SurfaceId(1), String::new(), String::new());
        t.position = (100, -100);
        reg.insert(t);
        reg.map(ToplevelId(1));

        let mut viewport = Viewport::default();
        viewport.pan_by(1e12, -1e12);
        assert_eq!(viewport.rounded(), (i32::MAX, i32::MIN));
        drop(Panned::apply(&mut reg, &viewport));
        assert_eq!(reg.get(ToplevelId(1)).unwrap().position, (100, -100));
    }

    #[test]
    fn to_scene_removes_offset() {
        let mut viewport = Viewport::default();
        viewport.pan_by(30.0, -10.0);
        assert_eq!(viewport.to_scene(100.0, 100.0), (70.0, 110.0));
    }
}
