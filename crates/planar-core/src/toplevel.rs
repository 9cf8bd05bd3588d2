//! Toplevel windows and their stacking order.
//!
//! Protocol-agnostic toplevel representation. The registry owns every known
//! toplevel; only mapped ones are part of the stack.

use std::collections::HashMap;

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::state::Geometry;
use crate::surface::SurfaceId;
use crate::tree::NodeId;

/// Unique, opaque identifier for a toplevel.
///
/// Backends maintain a mapping from their protocol-specific handle to this
/// ID. Core never sees protocol handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToplevelId(pub u64);

impl std::fmt::Display for ToplevelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "toplevel:{}", self.0)
    }
}

bitflags! {
    /// Toplevel state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ToplevelState: u32 {
        const ACTIVATED   = 0b0001;
        const MAPPED      = 0b0010;
        /// The initial configure has been sent.
        const INITIALIZED = 0b0100;
    }
}

#[derive(Debug, Clone)]
pub struct Toplevel {
    pub id: ToplevelId,
    pub surface: SurfaceId,
    pub app_id: String,
    pub title: String,
    /// Scene position of the root surface.
    pub position: (i32, i32),
    /// Window geometry within the root surface, as committed by the client.
    pub geometry: Geometry,
    pub state: ToplevelState,
    pub tree: Option<NodeId>,
}

impl Toplevel {
    pub fn new(id: ToplevelId, surface: SurfaceId, app_id: String, title: String) -> Self {
        Self {
            id,
            surface,
            app_id,
            title,
            position: (0, 0),
            geometry: Geometry::default(),
            state: ToplevelState::empty(),
            tree: None,
        }
    }

    pub const fn is_mapped(&self) -> bool {
        self.state.contains(ToplevelState::MAPPED)
    }

    pub const fn is_activated(&self) -> bool {
        self.state.contains(ToplevelState::ACTIVATED)
    }

    /// Window geometry box in scene coordinates.
    pub const fn frame(&self) -> Geometry {
        Geometry::new(
            self.position.0 + self.geometry.x,
            self.position.1 + self.geometry.y,
            self.geometry.width,
            self.geometry.height,
        )
    }
}

/// All toplevels plus the z-order of the mapped ones.
#[derive(Debug, Default)]
pub struct ToplevelRegistry {
    toplevels: HashMap<ToplevelId, Toplevel>,
    /// Front-most first.
    stack: Vec<ToplevelId>,
}

impl ToplevelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, toplevel: Toplevel) {
        trace!("Track {} ({})", toplevel.id, toplevel.app_id);
        self.toplevels.insert(toplevel.id, toplevel);
    }

    pub fn remove(&mut self, id: ToplevelId) -> Option<Toplevel> {
        self.stack.retain(|&t| t != id);
        self.toplevels.remove(&id)
    }

    pub fn get(&self, id: ToplevelId) -> Option<&Toplevel> {
        self.toplevels.get(&id)
    }

    pub fn get_mut(&mut self, id: ToplevelId) -> Option<&mut Toplevel> {
        self.toplevels.get_mut(&id)
    }

    pub fn contains(&self, id: ToplevelId) -> bool {
        self.toplevels.contains_key(&id)
    }

    /// Mark mapped and put at the front of the stack.
    pub fn map(&mut self, id: ToplevelId) -> bool {
        let Some(toplevel) = self.toplevels.get_mut(&id) else {
            return false;
        };
        toplevel.state.insert(ToplevelState::MAPPED);
        if !self.stack.contains(&id) {
            self.stack.insert(0, id);
        }
        debug!("Stack {} at head, {} mapped", id, self.stack.len());
        true
    }

    /// Mark unmapped and drop from the stack. Activation is cleared as well.
    pub fn unmap(&mut self, id: ToplevelId) -> bool {
        let Some(toplevel) = self.toplevels.get_mut(&id) else {
            return false;
        };
        let was_mapped = toplevel.is_mapped();
        toplevel
            .state
            .remove(ToplevelState::MAPPED | ToplevelState::ACTIVATED);
        self.stack.retain(|&t| t != id);
        was_mapped
    }

    /// Move to the front of the stack.
    pub fn raise(&mut self, id: ToplevelId) {
        if let Some(pos) = self.stack.iter().position(|&t| t == id) {
            let id = self.stack.remove(pos);
            self.stack.insert(0, id);
        }
    }

    pub fn head(&self) -> Option<ToplevelId> {
        self.stack.first().copied()
    }

    /// The back-most mapped toplevel.
    pub fn tail(&self) -> Option<ToplevelId> {
        self.stack.last().copied()
    }

    pub fn activated(&self) -> impl Iterator<Item = ToplevelId> + '_ {
        self.toplevels
            .values()
            .filter(|t| t.is_activated())
            .map(|t| t.id)
    }

    /// Mapped toplevels, front-most first.
    pub fn stack(&self) -> &[ToplevelId] {
        &self.stack
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toplevel> {
        self.toplevels.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Toplevel> {
        self.toplevels.values_mut()
    }

    pub fn len(&self) -> usize {
        self.toplevels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toplevels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: u64) -> ToplevelRegistry {
        let mut reg = ToplevelRegistry::new();
        for i in 1..=n {
            reg.insert(Toplevel::new(ToplevelId(i), SurfaceId(i), String::new(), String::new()));
        }
        reg
    }

    #[test]
    fn map_puts_toplevel_at_head() {
        let mut reg = registry(3);
        reg.map(ToplevelId(1));
        reg.map(ToplevelId(2));
        reg.map(ToplevelId(3));
        assert_eq!(reg.stack(), &[ToplevelId(3), ToplevelId(2), ToplevelId(1)]);

        reg.map(ToplevelId(1));
        assert_eq!(reg.stack().len(), 3);
    }

    #[test]
    fn raise_and_unmap() {
        let mut reg = registry(3);
        for i in 1..=3 {
            reg.map(ToplevelId(i));
        }
        reg.raise(ToplevelId(1));
        assert_eq!(reg.head(), Some(ToplevelId(1)));
        assert_eq!(reg.tail(), Some(ToplevelId(2)));

        reg.get_mut(ToplevelId(1)).unwrap().state.insert(ToplevelState::ACTIVATED);
        assert!(reg.unmap(ToplevelId(1)));
        assert!(!reg.unmap(ToplevelId(1)));
        assert_eq!(reg.head(), Some(ToplevelId(3)));
        assert_eq!(reg.activated().count(), 0);
        assert!(reg.contains(ToplevelId(1)));
    }

    #[test]
    fn frame_is_geometry_in_scene() {
        let mut t = Toplevel::new(ToplevelId(1), SurfaceId(1), String::new(), String::new());
        t.position = (100, 50);
        t.geometry = Geometry::new(4, 4, 300, 200);
        assert_eq!(t.frame(), Geometry::new(104, 54, 300, 200));
    }
}
