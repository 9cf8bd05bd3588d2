//! Hit testing against the composed scene.
//!
//! Stacking, top-most first: overlay and top layer surfaces, the toplevel
//! stack, then bottom and background layer surfaces. Layer surfaces sit at
//! fixed layout positions; toplevels are tested in unpanned scene
//! coordinates.

use crate::layer::Layer;
use crate::state::State;
use crate::surface::SurfaceId;
use crate::toplevel::ToplevelId;
use crate::tree::{NodeId, Owner};

/// The top-most surface under a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub surface: SurfaceId,
    pub owner: Owner,
    /// Surface-local coordinates.
    pub sx: f64,
    pub sy: f64,
}

impl State {
    /// Top-most surface under the layout point `(x, y)`.
    pub fn surface_at(&self, x: f64, y: f64) -> Option<SceneHit> {
        if let Some(hit) = self.layer_surface_at(&[Layer::Overlay, Layer::Top], x, y) {
            return Some(hit);
        }

        let (sx, sy) = self.cursor.viewport.to_scene(x, y);
        for &id in self.toplevels.stack() {
            let Some(toplevel) = self.toplevels.get(id) else {
                continue;
            };
            let Some(root) = toplevel.tree else {
                continue;
            };
            if let Some(hit) = self.node_at(root, toplevel.position, sx, sy) {
                return Some(hit);
            }
        }

        self.layer_surface_at(&[Layer::Bottom, Layer::Background], x, y)
    }

    /// The toplevel whose tree holds the surface under `(x, y)`.
    pub fn toplevel_at(&self, x: f64, y: f64) -> Option<(ToplevelId, SceneHit)> {
        let hit = self.surface_at(x, y)?;
        match hit.owner {
            Owner::Toplevel(id) => Some((id, hit)),
            Owner::Layer(_) => None,
        }
    }

    fn layer_surface_at(&self, bands: &[Layer], x: f64, y: f64) -> Option<SceneHit> {
        for &band in bands {
            let in_band: Vec<_> = self.layers.in_band(band).collect();
            for layer in in_band.into_iter().rev() {
                let (Some(root), Some(position)) = (layer.tree, layer.position) else {
                    continue;
                };
                if let Some(hit) = self.node_at(root, position, x, y) {
                    return Some(hit);
                }
            }
        }
        None
    }

    /// Search one tree: sub-surfaces above, the node itself, then
    /// sub-surfaces below, each band top-most first.
    fn node_at(&self, id: NodeId, origin: (i32, i32), x: f64, y: f64) -> Option<SceneHit> {
        let node = self.forest.node(id)?;
        let surface = self.surfaces.get(node.surface)?;

        let child_at = |sub| {
            let relation = self.forest.relation(sub)?;
            let child = relation.child?;
            let offset = self.surfaces.subsurface(sub)?.position;
            self.node_at(child, (origin.0 + offset.0, origin.1 + offset.1), x, y)
        };

        if let Some(hit) = surface.subsurfaces_above.iter().rev().find_map(|&s| child_at(s)) {
            return Some(hit);
        }

        let sx = x - f64::from(origin.0);
        let sy = y - f64::from(origin.1);
        if surface.mapped && surface.contains_local(sx, sy) {
            return Some(SceneHit {
                surface: node.surface,
                owner: node.owner,
                sx,
                sy,
            });
        }

        surface.subsurfaces_below.iter().rev().find_map(|&s| child_at(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layer::{LayerSurface, LayerSurfaceId, LayerSurfaceState};
    use crate::output::OutputId;
    use crate::surface::{Placement, Subsurface, SubsurfaceId};
    use crate::toplevel::Toplevel;

    fn surface(state: &mut State, id: u64, size: (u32, u32)) -> SurfaceId {
        let id = SurfaceId(id);
        state.surfaces.insert(id);
        let s = state.surfaces.get_mut(id).unwrap();
        s.mapped = true;
        s.size = size;
        id
    }

    fn toplevel(state: &mut State, id: u64, surface: SurfaceId, position: (i32, i32)) -> ToplevelId {
        let id = ToplevelId(id);
        let mut t = Toplevel::new(id, surface, String::new(), String::new());
        t.position = position;
        t.tree = Some(
            state
                .forest
                .create_root(&state.surfaces, surface, Owner::Toplevel(id))
                .unwrap(),
        );
        state.toplevels.insert(t);
        state.toplevels.map(id);
        id
    }

    #[test]
    fn front_toplevel_wins() {
        let mut state = State::new(Config::default());
        let s1 = surface(&mut state, 1, (100, 100));
        let s2 = surface(&mut state, 2, (100, 100));
        toplevel(&mut state, 10, s1, (0, 0));
        let front = toplevel(&mut state, 11, s2, (50, 50));

        let (id, hit) = state.toplevel_at(60.0, 70.0).unwrap();
        assert_eq!(id, front);
        assert_eq!((hit.sx, hit.sy), (10.0, 20.0));
        assert_eq!(state.surface_at(10.0, 10.0).map(|h| h.surface), Some(s1));
        assert!(state.surface_at(400.0, 400.0).is_none());
    }

    #[test]
    fn subsurfaces_stack_around_parent() {
        let mut state = State::new(Config::default());
        let root = surface(&mut state, 1, (100, 100));
        let above = surface(&mut state, 2, (20, 20));
        let below = surface(&mut state, 3, (300, 300));
        state.surfaces.add_subsurface(Subsurface {
            id: SubsurfaceId(20),
            surface: above,
            parent: root,
            placement: Placement::Above,
            position: (10, 10),
        });
        state.surfaces.add_subsurface(Subsurface {
            id: SubsurfaceId(21),
            surface: below,
            parent: root,
            placement: Placement::Below,
            position: (0, 0),
        });
        toplevel(&mut state, 10, root, (0, 0));

        assert_eq!(state.surface_at(15.0, 15.0).map(|h| h.surface), Some(above));
        assert_eq!(state.surface_at(50.0, 50.0).map(|h| h.surface), Some(root));
        let hit = state.surface_at(150.0, 150.0).unwrap();
        assert_eq!(hit.surface, below);
        assert_eq!(hit.owner, Owner::Toplevel(ToplevelId(10)));
    }

    #[test]
    fn panned_toplevels_are_hit_in_scene_coordinates() {
        let mut state = State::new(Config::default());
        let s1 = surface(&mut state, 1, (100, 100));
        toplevel(&mut state, 10, s1, (0, 0));
        state.cursor.viewport.pan_by(200.0, 0.0);

        assert!(state.surface_at(50.0, 50.0).is_none());
        let hit = state.surface_at(250.0, 50.0).unwrap();
        assert_eq!((hit.sx, hit.sy), (50.0, 50.0));
    }

    #[test]
    fn top_layer_covers_toplevels_and_bottom_does_not() {
        let mut state = State::new(Config::default());
        let s1 = surface(&mut state, 1, (100, 100));
        toplevel(&mut state, 10, s1, (0, 0));

        for (id, layer) in [(2, Layer::Top), (3, Layer::Bottom)] {
            let s = surface(&mut state, id, (100, 10));
            let lid = LayerSurfaceId(id + 100);
            let mut ls = LayerSurface::new(
                lid,
                s,
                OutputId(1),
                String::new(),
                LayerSurfaceState {
                    layer,
                    ..LayerSurfaceState::default()
                },
            );
            ls.mapped = true;
            ls.position = Some((0, if layer == Layer::Top { 0 } else { 50 }));
            ls.tree = Some(
                state
                    .forest
                    .create_root(&state.surfaces, s, Owner::Layer(lid))
                    .unwrap(),
            );
            state.layers.insert(ls);
        }

        let top = state.surface_at(5.0, 5.0).unwrap();
        assert_eq!(top.owner, Owner::Layer(LayerSurfaceId(102)));
        assert!(state.toplevel_at(5.0, 5.0).is_none());

        let under = state.surface_at(5.0, 55.0).unwrap();
        assert_eq!(under.owner, Owner::Toplevel(ToplevelId(10)));
    }
}
