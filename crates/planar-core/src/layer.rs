//! Layer surfaces and their arrangement.
//!
//! Layer surfaces are anchored overlays (panels, wallpapers, lock screens)
//! bound to one output. Arranging an output places every mapped layer
//! surface on it and derives the usable area left for ordinary windows.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::event::CoreAction;
use crate::output::{Output, OutputId};
use crate::state::Geometry;
use crate::surface::SurfaceId;
use crate::tree::NodeId;

/// Unique, opaque identifier for a layer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerSurfaceId(pub u64);

impl std::fmt::Display for LayerSurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer:{}", self.0)
    }
}

/// Stacking band, bottom-most first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Background,
    Bottom,
    #[default]
    Top,
    Overlay,
}

impl Layer {
    pub const ALL: [Self; 4] = [Self::Background, Self::Bottom, Self::Top, Self::Overlay];
}

bitflags! {
    /// Output edges a layer surface is anchored to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Anchor: u32 {
        const TOP    = 1;
        const BOTTOM = 2;
        const LEFT   = 4;
        const RIGHT  = 8;
    }
}

impl Anchor {
    /// The edge an exclusive zone is reserved against.
    ///
    /// A surface anchored to exactly one edge, or to one edge plus both
    /// edges perpendicular to it, reserves along that edge. Any other
    /// combination reserves nothing.
    pub fn exclusive_edge(self) -> Option<Self> {
        let horizontal = Self::LEFT | Self::RIGHT;
        let vertical = Self::TOP | Self::BOTTOM;
        for edge in [Self::TOP, Self::BOTTOM, Self::LEFT, Self::RIGHT] {
            let across = if vertical.contains(edge) { horizontal } else { vertical };
            if self == edge || self == edge | across {
                return Some(edge);
            }
        }
        None
    }
}

/// Committed double-buffered layer surface state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerSurfaceState {
    pub layer: Layer,
    pub anchor: Anchor,
    /// Pixels reserved along the anchored edge. Zero reserves nothing,
    /// negative asks to ignore other surfaces' reservations.
    pub exclusive_zone: i32,
    /// Requested size. Zero on an axis means "fill".
    pub desired_width: u32,
    pub desired_height: u32,
}

#[derive(Debug, Clone)]
pub struct LayerSurface {
    pub id: LayerSurfaceId,
    pub surface: SurfaceId,
    pub output: OutputId,
    pub namespace: String,
    pub current: LayerSurfaceState,
    pub mapped: bool,
    /// The initial configure has been sent.
    pub initialized: bool,
    pub tree: Option<NodeId>,
    /// Layout position of the surface origin, once arranged.
    pub position: Option<(i32, i32)>,
    /// Last size sent in a configure.
    pub configured: Option<(u32, u32)>,
}

impl LayerSurface {
    pub fn new(
        id: LayerSurfaceId,
        surface: SurfaceId,
        output: OutputId,
        namespace: String,
        current: LayerSurfaceState,
    ) -> Self {
        Self {
            id,
            surface,
            output,
            namespace,
            current,
            mapped: false,
            initialized: false,
            tree: None,
            position: None,
            configured: None,
        }
    }

    pub fn geometry(&self) -> Geometry {
        let (x, y) = self.position.unwrap_or_default();
        let (w, h) = self.configured.unwrap_or_default();
        Geometry::new(x, y, w, h)
    }
}

/// Size and output-local position of a layer surface inside `bounds`.
pub fn place(state: &LayerSurfaceState, bounds: Geometry) -> Geometry {
    let width = if state.desired_width == 0 {
        bounds.width
    } else {
        state.desired_width
    };
    let height = if state.desired_height == 0 {
        bounds.height
    } else {
        state.desired_height
    };

    let left = state.anchor.contains(Anchor::LEFT);
    let right = state.anchor.contains(Anchor::RIGHT);
    let x = match (left, right) {
        (true, false) => bounds.x,
        (false, true) => bounds.right() - width as i32,
        _ => bounds.x + (bounds.width as i32 - width as i32) / 2,
    };

    let top = state.anchor.contains(Anchor::TOP);
    let bottom = state.anchor.contains(Anchor::BOTTOM);
    let y = match (top, bottom) {
        (true, false) => bounds.y,
        (false, true) => bounds.bottom() - height as i32,
        _ => bounds.y + (bounds.height as i32 - height as i32) / 2,
    };

    Geometry::new(x, y, width, height)
}

/// Shrink `usable` by a surface's exclusive zone.
pub fn reserve(usable: &mut Geometry, state: &LayerSurfaceState) {
    if state.exclusive_zone <= 0 {
        return;
    }
    let zone = state.exclusive_zone;
    let amount = zone as u32;
    match state.anchor.exclusive_edge() {
        Some(Anchor::TOP) => {
            usable.y += zone;
            usable.height = usable.height.saturating_sub(amount);
        }
        Some(Anchor::BOTTOM) => {
            usable.height = usable.height.saturating_sub(amount);
        }
        Some(Anchor::LEFT) => {
            usable.x += zone;
            usable.width = usable.width.saturating_sub(amount);
        }
        Some(Anchor::RIGHT) => {
            usable.width = usable.width.saturating_sub(amount);
        }
        _ => {}
    }
}

/// All layer surfaces, in creation order.
#[derive(Debug, Default)]
pub struct LayerShell {
    surfaces: IndexMap<LayerSurfaceId, LayerSurface>,
}

impl LayerShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, surface: LayerSurface) {
        self.surfaces.insert(surface.id, surface);
    }

    pub fn remove(&mut self, id: LayerSurfaceId) -> Option<LayerSurface> {
        self.surfaces.shift_remove(&id)
    }

    pub fn get(&self, id: LayerSurfaceId) -> Option<&LayerSurface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: LayerSurfaceId) -> Option<&mut LayerSurface> {
        self.surfaces.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerSurface> {
        self.surfaces.values()
    }

    /// Mapped surfaces of one band, in creation order.
    pub fn in_band(&self, layer: Layer) -> impl Iterator<Item = &LayerSurface> {
        self.surfaces
            .values()
            .filter(move |s| s.mapped && s.current.layer == layer)
    }

    pub fn on_output(&self, output: OutputId) -> Vec<LayerSurfaceId> {
        self.surfaces
            .values()
            .filter(|s| s.output == output)
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Configure for a surface's first commit, sized against the output's
    /// current usable area.
    pub fn initial_configure(&mut self, id: LayerSurfaceId, output: &Output) -> Option<CoreAction> {
        let surface = self.surfaces.get_mut(&id)?;
        if surface.initialized {
            return None;
        }
        surface.initialized = true;
        let placed = place(&surface.current, output.usable_area);
        surface.configured = Some((placed.width, placed.height));
        debug!("Initial configure of {} at {}x{}", id, placed.width, placed.height);
        Some(CoreAction::ConfigureLayerSurface {
            id,
            width: placed.width,
            height: placed.height,
        })
    }

    /// Place every mapped layer surface of `output`, bottom band to top
    /// band, and write back the remaining usable area.
    pub fn arrange(&mut self, output: &mut Output) -> Vec<CoreAction> {
        let (width, height) = output.effective_resolution();
        let full = Geometry::new(0, 0, width, height);
        let mut usable = full;
        let mut actions = Vec::new();

        for layer in Layer::ALL {
            for surface in self.surfaces.values_mut() {
                if surface.output != output.id
                    || !surface.mapped
                    || !surface.initialized
                    || surface.current.layer != layer
                {
                    continue;
                }

                let bounds = if surface.current.exclusive_zone < 0 {
                    full
                } else {
                    usable
                };
                let placed = place(&surface.current, bounds);
                let position = (output.geometry.x + placed.x, output.geometry.y + placed.y);

                if surface.position != Some(position) {
                    surface.position = Some(position);
                    actions.push(CoreAction::SetLayerPosition {
                        id: surface.id,
                        x: position.0,
                        y: position.1,
                    });
                }
                let size = (placed.width, placed.height);
                if surface.configured != Some(size) {
                    surface.configured = Some(size);
                    actions.push(CoreAction::ConfigureLayerSurface {
                        id: surface.id,
                        width: size.0,
                        height: size.1,
                    });
                }

                reserve(&mut usable, &surface.current);
                trace!("{} placed at {:?}, usable now {:?}", surface.id, placed, usable);
            }
        }

        if output.usable_area != usable {
            debug!("Usable area of {} is now {:?}", output.id, usable);
        }
        output.usable_area = usable;
        actions
    }
}
