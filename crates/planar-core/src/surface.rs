//! Mirror of client surface state.
//!
//! The protocol collaborator owns the real surfaces. Core keeps just enough
//! of their committed state to build surface trees and hit-test them: the
//! role each surface plays, whether it is mapped, its buffer size, and the
//! ordered sub-surfaces stacked below and above it.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::layer::LayerSurfaceId;
use crate::toplevel::ToplevelId;

/// Opaque identifier of a client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface:{}", self.0)
    }
}

/// Opaque identifier of a sub-surface role object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsurfaceId(pub u64);

impl std::fmt::Display for SubsurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subsurface:{}", self.0)
    }
}

/// What a surface is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceRole {
    #[default]
    None,
    Toplevel(ToplevelId),
    Layer(LayerSurfaceId),
    Subsurface(SubsurfaceId),
}

/// Stacking band of a sub-surface relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Below,
    Above,
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub id: SurfaceId,
    pub role: SurfaceRole,
    pub mapped: bool,
    /// Committed buffer size in surface-local coordinates.
    pub size: (u32, u32),
    pub subsurfaces_below: Vec<SubsurfaceId>,
    pub subsurfaces_above: Vec<SubsurfaceId>,
}

impl Surface {
    pub const fn new(id: SurfaceId) -> Self {
        Self {
            id,
            role: SurfaceRole::None,
            mapped: false,
            size: (0, 0),
            subsurfaces_below: Vec::new(),
            subsurfaces_above: Vec::new(),
        }
    }

    /// Sub-surfaces in stacking order, bottom-most first.
    pub fn subsurfaces(&self) -> impl Iterator<Item = SubsurfaceId> + '_ {
        self.subsurfaces_below
            .iter()
            .chain(self.subsurfaces_above.iter())
            .copied()
    }

    pub fn contains_local(&self, sx: f64, sy: f64) -> bool {
        sx >= 0.0 && sy >= 0.0 && sx < f64::from(self.size.0) && sy < f64::from(self.size.1)
    }
}

#[derive(Debug, Clone)]
pub struct Subsurface {
    pub id: SubsurfaceId,
    pub surface: SurfaceId,
    pub parent: SurfaceId,
    pub placement: Placement,
    /// Offset of the child surface from its parent's origin.
    pub position: (i32, i32),
}

/// All surfaces the protocol collaborator has told us about.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<SurfaceId, Surface>,
    subsurfaces: HashMap<SubsurfaceId, Subsurface>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SurfaceId) {
        self.surfaces.entry(id).or_insert_with(|| Surface::new(id));
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    pub fn role(&self, id: SurfaceId) -> SurfaceRole {
        self.surfaces.get(&id).map_or(SurfaceRole::None, |s| s.role)
    }

    pub fn is_mapped(&self, id: SurfaceId) -> bool {
        self.surfaces.get(&id).is_some_and(|s| s.mapped)
    }

    /// Assign a role. A surface keeps the first role it was given.
    pub fn set_role(&mut self, id: SurfaceId, role: SurfaceRole) -> bool {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            warn!("Role {:?} assigned to unknown {}", role, id);
            return false;
        };
        if surface.role != SurfaceRole::None && surface.role != role {
            warn!("{} already has role {:?}, refusing {:?}", id, surface.role, role);
            return false;
        }
        surface.role = role;
        true
    }

    pub fn clear_role(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.role = SurfaceRole::None;
        }
    }

    pub fn subsurface(&self, id: SubsurfaceId) -> Option<&Subsurface> {
        self.subsurfaces.get(&id)
    }

    /// Register a sub-surface relation between two known surfaces.
    pub fn add_subsurface(&mut self, subsurface: Subsurface) -> bool {
        if !self.surfaces.contains_key(&subsurface.parent) {
            warn!("{} created on unknown parent {}", subsurface.id, subsurface.parent);
            return false;
        }
        if !self.set_role(subsurface.surface, SurfaceRole::Subsurface(subsurface.id)) {
            return false;
        }
        if let Some(parent) = self.surfaces.get_mut(&subsurface.parent) {
            match subsurface.placement {
                Placement::Below => parent.subsurfaces_below.push(subsurface.id),
                Placement::Above => parent.subsurfaces_above.push(subsurface.id),
            }
        }
        trace!("{} links {} under {}", subsurface.id, subsurface.surface, subsurface.parent);
        self.subsurfaces.insert(subsurface.id, subsurface);
        true
    }

    pub fn move_subsurface(&mut self, id: SubsurfaceId, x: i32, y: i32) {
        if let Some(sub) = self.subsurfaces.get_mut(&id) {
            sub.position = (x, y);
        }
    }

    pub fn remove_subsurface(&mut self, id: SubsurfaceId) -> Option<Subsurface> {
        let sub = self.subsurfaces.remove(&id)?;
        if let Some(parent) = self.surfaces.get_mut(&sub.parent) {
            parent.subsurfaces_below.retain(|&s| s != id);
            parent.subsurfaces_above.retain(|&s| s != id);
        }
        if self.role(sub.surface) == SurfaceRole::Subsurface(id) {
            self.clear_role(sub.surface);
        }
        Some(sub)
    }

    /// Forget a surface. Sub-surfaces hanging off it become inert and are
    /// dropped as well; the surface's own sub-surface record goes with it.
    pub fn remove(&mut self, id: SurfaceId) -> Option<Surface> {
        let surface = self.surfaces.remove(&id)?;
        for sub in surface.subsurfaces() {
            if let Some(record) = self.subsurfaces.remove(&sub) {
                self.clear_role(record.surface);
            }
        }
        if let SurfaceRole::Subsurface(sub) = surface.role {
            self.remove_subsurface(sub);
        }
        Some(surface)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}
