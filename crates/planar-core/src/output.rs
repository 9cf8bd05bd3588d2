//! Outputs (monitors) as seen by the core.

use crate::state::Geometry;

/// Opaque identifier of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u64);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "output:{}", self.0)
    }
}

/// Output state.
#[derive(Debug, Clone)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    /// Position in the output layout plus current mode size in pixels.
    pub geometry: Geometry,
    pub scale: f64,
    /// Space left for ordinary windows, relative to the output origin.
    /// Written by layer arrangement.
    pub usable_area: Geometry,
}

impl Output {
    pub fn new(id: OutputId, name: String, geometry: Geometry, scale: f64) -> Self {
        let mut output = Self {
            id,
            name,
            geometry,
            scale: if scale > 0.0 { scale } else { 1.0 },
            usable_area: Geometry::default(),
        };
        let (w, h) = output.effective_resolution();
        output.usable_area = Geometry::new(0, 0, w, h);
        output
    }

    /// Mode size divided by scale, rounded down.
    pub fn effective_resolution(&self) -> (u32, u32) {
        let w = (f64::from(self.geometry.width) / self.scale).floor();
        let h = (f64::from(self.geometry.height) / self.scale).floor();
        (w as u32, h as u32)
    }

    /// Update mode size and scale. Returns true if the effective resolution
    /// changed.
    pub fn set_mode(&mut self, width: u32, height: u32, scale: f64) -> bool {
        let before = self.effective_resolution();
        self.geometry.width = width;
        self.geometry.height = height;
        if scale > 0.0 {
            self.scale = scale;
        }
        before != self.effective_resolution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_resolution_honours_scale() {
        let output = Output::new(OutputId(1), "DP-1".into(), Geometry::new(0, 0, 2560, 1440), 2.0);
        assert_eq!(output.effective_resolution(), (1280, 720));
        assert_eq!(output.usable_area, Geometry::new(0, 0, 1280, 720));
    }

    #[test]
    fn bogus_scale_falls_back_to_one() {
        let mut output = Output::new(OutputId(1), "DP-1".into(), Geometry::new(0, 0, 800, 600), 0.0);
        assert_eq!(output.effective_resolution(), (800, 600));
        assert!(!output.set_mode(800, 600, -1.0));
        assert!(output.set_mode(1024, 768, 1.0));
    }
}
