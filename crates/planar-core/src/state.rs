//! Core compositor state.

use indexmap::IndexMap;
use tracing::debug;

use crate::config::Config;
use crate::cursor::CursorState;
use crate::event::CoreAction;
use crate::input::Modifiers;
use crate::layer::LayerShell;
use crate::output::{Output, OutputId};
use crate::surface::{SurfaceId, SurfaceRegistry};
use crate::toplevel::{ToplevelId, ToplevelRegistry, ToplevelState};
use crate::tree::{Owner, SurfaceForest};

/// Geometry of a rectangular region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    pub const fn right(self) -> i32 {
        self.x + self.width as i32
    }

    #[allow(clippy::cast_possible_wrap)]
    pub const fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    #[allow(clippy::cast_possible_wrap)]
    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }

    pub fn contains_point(self, x: f64, y: f64) -> bool {
        x >= f64::from(self.x)
            && x < f64::from(self.right())
            && y >= f64::from(self.y)
            && y < f64::from(self.bottom())
    }

    /// Closest point inside the rectangle to `(x, y)`.
    pub fn clamp_point(self, x: f64, y: f64) -> (f64, f64) {
        let max_x = f64::from(self.right() - 1).max(f64::from(self.x));
        let max_y = f64::from(self.bottom() - 1).max(f64::from(self.y));
        (x.clamp(f64::from(self.x), max_x), y.clamp(f64::from(self.y), max_y))
    }

    #[allow(clippy::cast_possible_wrap)]
    pub const fn intersects(self, other: Self) -> bool {
        self.x < other.x + other.width as i32
            && self.x + self.width as i32 > other.x
            && self.y < other.y + other.height as i32
            && self.y + self.height as i32 > other.y
    }
}

/// Keyboard and pointer focus as last reported to the seat.
#[derive(Debug, Clone, Default)]
pub struct SeatFocus {
    pub keyboard: Option<SurfaceId>,
    pub pointer: Option<SurfaceId>,
}

impl SeatFocus {
    /// Drop any focus held by `surface`. Returns `(keyboard, pointer)` flags
    /// telling which focus was cleared.
    pub fn forget(&mut self, surface: SurfaceId) -> (bool, bool) {
        let keyboard = self.keyboard == Some(surface);
        let pointer = self.pointer == Some(surface);
        if keyboard {
            self.keyboard = None;
        }
        if pointer {
            self.pointer = None;
        }
        (keyboard, pointer)
    }
}

/// The central compositor state.
///
/// One value owned by the event-dispatch loop and handed by reference to
/// every handler.
pub struct State {
    pub config: Config,
    pub surfaces: SurfaceRegistry,
    pub forest: SurfaceForest,
    pub toplevels: ToplevelRegistry,
    pub layers: LayerShell,
    pub outputs: IndexMap<OutputId, Output>,
    pub focus: SeatFocus,
    pub cursor: CursorState,
    pub running: bool,
}

impl State {
    pub fn new(config: Config) -> Self {
        let forest = SurfaceForest::with_limit(config.limits.max_surface_nodes);
        let cursor = CursorState::new(config.general.default_cursor.clone());
        Self {
            config,
            surfaces: SurfaceRegistry::new(),
            forest,
            toplevels: ToplevelRegistry::new(),
            layers: LayerShell::new(),
            outputs: IndexMap::new(),
            focus: SeatFocus::default(),
            cursor,
            running: true,
        }
    }

    /// The toplevel owning the keyboard-focused surface, if any.
    pub fn keyboard_focused_toplevel(&self) -> Option<ToplevelId> {
        let surface = self.focus.keyboard?;
        match self.forest.owner_of(surface) {
            Some(Owner::Toplevel(id)) => Some(id),
            _ => None,
        }
    }

    /// Give `toplevel` keyboard focus, raise it and make it the only
    /// activated toplevel. `surface` is the surface that asked for focus,
    /// usually the one under the pointer.
    pub fn focus_toplevel(
        &mut self,
        toplevel: Option<ToplevelId>,
        surface: Option<SurfaceId>,
        modifiers: Modifiers,
    ) -> Vec<CoreAction> {
        let Some(id) = toplevel else {
            return Vec::new();
        };
        let Some(root) = self.toplevels.get(id).filter(|t| t.is_mapped()).map(|t| t.surface) else {
            return Vec::new();
        };
        if let Some(prev) = self.focus.keyboard {
            if Some(prev) == surface || self.keyboard_focused_toplevel() == Some(id) {
                return Vec::new();
            }
        }

        let mut actions = Vec::new();
        let previous: Vec<_> = self.toplevels.activated().filter(|&t| t != id).collect();
        for prev in previous {
            if let Some(t) = self.toplevels.get_mut(prev) {
                t.state.remove(ToplevelState::ACTIVATED);
            }
            actions.push(CoreAction::SetActivated {
                id: prev,
                activated: false,
            });
        }

        self.toplevels.raise(id);
        actions.push(CoreAction::RaiseToplevel { id });

        if let Some(t) = self.toplevels.get_mut(id) {
            if !t.is_activated() {
                t.state.insert(ToplevelState::ACTIVATED);
                actions.push(CoreAction::SetActivated {
                    id,
                    activated: true,
                });
            }
        }

        self.focus.keyboard = Some(root);
        actions.push(CoreAction::KeyboardEnter {
            surface: root,
            modifiers,
        });
        debug!("Focus {} ({})", id, root);
        actions
    }

    /// The output containing the given layout point.
    pub fn output_at(&self, x: f64, y: f64) -> Option<OutputId> {
        self.outputs
            .values()
            .find(|o| o.geometry.contains_point(x, y))
            .map(|o| o.id)
    }

    /// Clamp a layout point onto the closest output. Without outputs the
    /// point is returned unchanged.
    pub fn clamp_to_layout(&self, x: f64, y: f64) -> (f64, f64) {
        if self.output_at(x, y).is_some() {
            return (x, y);
        }
        self.outputs
            .values()
            .map(|o| o.geometry.clamp_point(x, y))
            .min_by(|a, b| {
                let da = (a.0 - x).powi(2) + (a.1 - y).powi(2);
                let db = (b.0 - x).powi(2) + (b.1 - y).powi(2);
                da.total_cmp(&db)
            })
            .unwrap_or((x, y))
    }

    /// Validate core invariants. See `invariants` module.
    pub fn validate_invariants(&self) -> Result<(), crate::invariants::InvariantError> {
        crate::invariants::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toplevel::Toplevel;

    fn mapped(state: &mut State, id: u64) -> ToplevelId {
        let id = ToplevelId(id);
        state.surfaces.insert(SurfaceId(id.0));
        state.toplevels.insert(Toplevel::new(id, SurfaceId(id.0), String::new(), String::new()));
        state.toplevels.map(id);
        id
    }

    #[test]
    fn focus_moves_activation() {
        let mut state = State::new(Config::default());
        let a = mapped(&mut state, 1);
        let b = mapped(&mut state, 2);

        state.focus_toplevel(Some(a), Some(SurfaceId(1)), Modifiers::empty());
        let actions = state.focus_toplevel(Some(b), Some(SurfaceId(2)), Modifiers::ALT);

        assert!(actions.contains(&CoreAction::SetActivated {
            id: a,
            activated: false,
        }));
        assert_eq!(
            actions.last(),
            Some(&CoreAction::KeyboardEnter {
                surface: SurfaceId(2),
                modifiers: Modifiers::ALT,
            })
        );
        assert_eq!(state.toplevels.head(), Some(b));
        assert_eq!(state.toplevels.activated().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn focus_is_noop_for_none_or_focused() {
        let mut state = State::new(Config::default());
        let a = mapped(&mut state, 1);
        assert!(state.focus_toplevel(None, None, Modifiers::empty()).is_empty());

        state.focus.keyboard = Some(SurfaceId(1));
        assert!(state
            .focus_toplevel(Some(a), Some(SurfaceId(1)), Modifiers::empty())
            .is_empty());
    }

    #[test]
    fn clamp_point_stays_inside() {
        let g = Geometry::new(0, 0, 100, 50);
        assert_eq!(g.clamp_point(-10.0, 20.0), (0.0, 20.0));
        assert_eq!(g.clamp_point(150.0, 70.0), (99.0, 49.0));
        assert_eq!(g.clamp_point(10.5, 10.5), (10.5, 10.5));
    }

    #[test]
    fn seat_focus_forget() {
        let mut focus = SeatFocus {
            keyboard: Some(SurfaceId(1)),
            pointer: Some(SurfaceId(2)),
        };
        assert_eq!(focus.forget(SurfaceId(1)), (true, false));
        assert_eq!(focus.keyboard, None);
        assert_eq!(focus.pointer, Some(SurfaceId(2)));
    }
}
