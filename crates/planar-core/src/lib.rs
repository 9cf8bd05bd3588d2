//! Planar Core - Protocol-agnostic compositor engine
//!
//! This crate contains the window/surface management logic of the
//! compositor: surface trees, layer arrangement, toplevel focus and
//! stacking, pointer interaction modes and keyboard routing. It has no
//! dependencies on display protocols.
//!
//! Protocol glue translates protocol events into [`CoreEvent`]s, feeds them
//! to [`Core`], and applies the returned [`CoreAction`]s back to the display
//! server.
//!
//! # Quick Start
//! ```
//! use planar_core::{Core, CoreAction, CoreEvent};
//! use planar_core::config::Config;
//! use planar_core::state::Geometry;
//!
//! let mut core = Core::new(Config::default());
//!
//! let output = core.next_output_id();
//! core.handle_event(CoreEvent::OutputAdded {
//!     id: output,
//!     name: "HDMI-A-1".into(),
//!     geometry: Geometry::new(0, 0, 1920, 1080),
//!     scale: 1.0,
//! });
//!
//! // A client creates a window and maps it
//! let surface = core.next_surface_id();
//! let toplevel = core.next_toplevel_id();
//! core.handle_event(CoreEvent::SurfaceCreated { id: surface });
//! core.handle_event(CoreEvent::ToplevelCreated {
//!     id: toplevel,
//!     surface,
//!     app_id: Some("foot".into()),
//!     title: None,
//! });
//! let actions = core.handle_event(CoreEvent::SurfaceMapped { id: surface });
//!
//! assert!(actions.contains(&CoreAction::SetActivated { id: toplevel, activated: true }));
//! assert_eq!(core.focused_toplevel(), Some(toplevel));
//! ```

pub mod config;
pub mod cursor;
pub mod event;
pub mod input;
pub mod invariants;
pub mod layer;
pub mod output;
pub mod scene;
pub mod state;
pub mod surface;
pub mod toplevel;
pub mod tree;
pub mod viewport;

// Re-export primary API types at crate root
pub use event::{CoreAction, CoreEvent};
pub use input::Command;
pub use layer::LayerSurfaceId;
pub use output::OutputId;
pub use state::Geometry;
pub use surface::{SubsurfaceId, SurfaceId};
pub use toplevel::ToplevelId;

use tracing::{debug, info, warn};

use config::Config;
use cursor::{resize_box, CursorMode, ResizeEdges};
use event::AxisOrientation;
use input::{InputRouter, KeyOutcome};
use layer::{LayerSurface, LayerSurfaceState};
use output::Output;
use state::State;
use surface::{Placement, Subsurface, SurfaceRole};
use toplevel::{Toplevel, ToplevelState};
use tree::Owner;
use viewport::Panned;

/// The protocol-agnostic compositor engine.
///
/// Owns all compositor state. Protocol glue drives it via
/// [`handle_event`](Core::handle_event) and [`exec`](Core::exec), then
/// applies the returned [`CoreAction`]s.
pub struct Core {
    /// All compositor state
    pub state: State,
    /// Key binding and pan key state
    pub input: InputRouter,
    /// Monotonic id counter shared by every id kind
    next_id: u64,
    /// Exit requested
    pub should_exit: bool,
}

impl Core {
    /// Create a new core engine with the given configuration.
    pub fn new(config: Config) -> Self {
        let input = InputRouter::new(&config);
        let state = State::new(config);

        Self {
            state,
            input,
            next_id: 1,
            should_exit: false,
        }
    }

    fn next_raw_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Generate a fresh, unique `SurfaceId`.
    pub fn next_surface_id(&mut self) -> SurfaceId {
        SurfaceId(self.next_raw_id())
    }

    pub fn next_subsurface_id(&mut self) -> SubsurfaceId {
        SubsurfaceId(self.next_raw_id())
    }

    pub fn next_toplevel_id(&mut self) -> ToplevelId {
        ToplevelId(self.next_raw_id())
    }

    pub fn next_layer_surface_id(&mut self) -> LayerSurfaceId {
        LayerSurfaceId(self.next_raw_id())
    }

    pub fn next_output_id(&mut self) -> OutputId {
        OutputId(self.next_raw_id())
    }

    // ── Event handling (protocol glue → core) ────────────────────────

    /// Process an event. Returns actions the caller must apply.
    pub fn handle_event(&mut self, event: CoreEvent) -> Vec<CoreAction> {
        let actions = match event {
            CoreEvent::OutputAdded {
                id,
                name,
                geometry,
                scale,
            } => self.on_output_added(id, name, geometry, scale),
            CoreEvent::OutputModeChanged {
                id,
                width,
                height,
                scale,
            } => self.on_output_mode_changed(id, width, height, scale),
            CoreEvent::OutputRemoved { id } => self.on_output_removed(id),
            CoreEvent::OutputFrame { id } => self.on_output_frame(id),

            CoreEvent::SurfaceCreated { id } => {
                self.state.surfaces.insert(id);
                Vec::new()
            }
            CoreEvent::SurfaceCommitted { id, width, height } => {
                if let Some(surface) = self.state.surfaces.get_mut(id) {
                    surface.size = (width, height);
                }
                Vec::new()
            }
            CoreEvent::SurfaceMapped { id } => self.on_surface_mapped(id),
            CoreEvent::SurfaceUnmapped { id } => self.on_surface_unmapped(id),
            CoreEvent::SurfaceDestroyed { id } => self.on_surface_destroyed(id),

            CoreEvent::SubsurfaceCreated {
                id,
                surface,
                parent,
                placement,
                x,
                y,
            } => self.on_subsurface_created(id, surface, parent, placement, (x, y)),
            CoreEvent::SubsurfaceMoved { id, x, y } => {
                self.state.surfaces.move_subsurface(id, x, y);
                Vec::new()
            }
            CoreEvent::SubsurfaceDestroyed { id } => self.on_subsurface_destroyed(id),

            CoreEvent::ToplevelCreated {
                id,
                surface,
                app_id,
                title,
            } => self.on_toplevel_created(id, surface, app_id, title),
            CoreEvent::ToplevelCommitted { id, geometry } => {
                self.on_toplevel_committed(id, geometry)
            }
            CoreEvent::ToplevelRequestMove { id } => self.begin_interactive(id, None),
            CoreEvent::ToplevelRequestResize { id, edges } => {
                self.begin_interactive(id, Some(edges))
            }
            CoreEvent::ToplevelRequestMaximize { id }
            | CoreEvent::ToplevelRequestFullscreen { id } => self.on_toplevel_state_request(id),
            CoreEvent::ToplevelDestroyed { id } => self.on_toplevel_destroyed(id),

            CoreEvent::LayerSurfaceCreated {
                id,
                surface,
                output,
                namespace,
                state,
            } => self.on_layer_surface_created(id, surface, output, namespace, state),
            CoreEvent::LayerSurfaceCommitted { id, state } => {
                self.on_layer_surface_committed(id, state)
            }
            CoreEvent::LayerSurfaceDestroyed { id } => self.on_layer_surface_destroyed(id),

            CoreEvent::PointerMotion { dx, dy, time } => self.on_pointer_motion(dx, dy, time),
            CoreEvent::PointerMotionAbsolute { x, y, time } => {
                self.on_pointer_motion_absolute(x, y, time)
            }
            CoreEvent::PointerButton {
                button,
                pressed,
                time,
            } => self.on_pointer_button(button, pressed, time),
            CoreEvent::PointerAxis {
                orientation,
                delta,
                discrete,
                time,
            } => Self::on_pointer_axis(orientation, delta, discrete, time),
            CoreEvent::PointerFrame => vec![CoreAction::PointerFrame],

            CoreEvent::KeyboardAdded => vec![CoreAction::SetRepeatInfo {
                rate: self.state.config.keyboard.client_repeat_rate,
                delay: self.state.config.keyboard.client_repeat_delay,
            }],
            CoreEvent::KeyboardModifiers { modifiers } => {
                self.input.set_modifiers(modifiers);
                vec![CoreAction::KeyboardModifiers { modifiers }]
            }
            CoreEvent::KeyboardKey {
                keycode,
                pressed,
                time,
            } => self.on_keyboard_key(keycode, pressed, time),
            CoreEvent::RepeatTimer => self.on_repeat_timer(),
        };

        #[cfg(debug_assertions)]
        if let Err(e) = self.state.validate_invariants() {
            warn!("Invariant violation after handle_event: {}", e);
        }

        actions
    }

    /// Execute a compositor command (from a key binding). Returns actions.
    pub fn exec(&mut self, command: Command) -> Vec<CoreAction> {
        debug!("exec: {:?}", command);
        let actions = self.execute_command(command);

        #[cfg(debug_assertions)]
        if let Err(e) = self.state.validate_invariants() {
            warn!("Invariant violation after exec: {}", e);
        }

        actions
    }

    // ── Outputs ──────────────────────────────────────────────────────

    fn on_output_added(
        &mut self,
        id: OutputId,
        name: String,
        geometry: Geometry,
        scale: f64,
    ) -> Vec<CoreAction> {
        info!("Output {} ({}) added at {:?}", id, name, geometry);
        let first = self.state.outputs.is_empty();
        self.state
            .outputs
            .insert(id, Output::new(id, name, geometry, scale));
        if first {
            let (x, y) = self.state.cursor.position;
            self.state.cursor.position = self.state.clamp_to_layout(x, y);
        }
        self.arrange_output(id)
    }

    fn on_output_mode_changed(
        &mut self,
        id: OutputId,
        width: u32,
        height: u32,
        scale: f64,
    ) -> Vec<CoreAction> {
        let Some(output) = self.state.outputs.get_mut(&id) else {
            return Vec::new();
        };
        if output.set_mode(width, height, scale) {
            debug!("{} is now {}x{} @ {}", id, width, height, output.scale);
            self.arrange_output(id)
        } else {
            Vec::new()
        }
    }

    fn on_output_removed(&mut self, id: OutputId) -> Vec<CoreAction> {
        let mut actions = Vec::new();
        for layer in self.state.layers.on_output(id) {
            actions.extend(self.close_layer_surface(layer));
        }
        if self.state.outputs.shift_remove(&id).is_some() {
            info!("Output {} removed", id);
        }
        let (x, y) = self.state.cursor.position;
        self.state.cursor.position = self.state.clamp_to_layout(x, y);
        actions
    }

    fn on_output_frame(&mut self, id: OutputId) -> Vec<CoreAction> {
        if !self.state.outputs.contains_key(&id) {
            return Vec::new();
        }
        let mut actions = self.arrange_output(id);

        let panned = Panned::apply(&mut self.state.toplevels, &self.state.cursor.viewport);
        let snapshot = panned.snapshot(id);
        drop(panned);

        actions.push(CoreAction::CommitFrame(snapshot));
        actions
    }

    fn arrange_output(&mut self, id: OutputId) -> Vec<CoreAction> {
        match self.state.outputs.get_mut(&id) {
            Some(output) => self.state.layers.arrange(output),
            None => Vec::new(),
        }
    }

    fn schedule_all_frames(&self) -> impl Iterator<Item = CoreAction> + '_ {
        self.state
            .outputs
            .keys()
            .map(|&output| CoreAction::ScheduleFrame { output })
    }

    // ── Surfaces ─────────────────────────────────────────────────────

    fn on_surface_mapped(&mut self, id: SurfaceId) -> Vec<CoreAction> {
        let Some(surface) = self.state.surfaces.get_mut(id) else {
            warn!("Map of unknown {}", id);
            return Vec::new();
        };
        if surface.mapped {
            return Vec::new();
        }
        surface.mapped = true;
        let role = surface.role;

        match role {
            SurfaceRole::Toplevel(toplevel) => self.map_toplevel(toplevel),
            SurfaceRole::Layer(layer) => self.map_layer_surface(layer),
            SurfaceRole::Subsurface(sub) => {
                self.state.forest.map_subsurface(&self.state.surfaces, sub);
                Vec::new()
            }
            SurfaceRole::None => Vec::new(),
        }
    }

    fn on_surface_unmapped(&mut self, id: SurfaceId) -> Vec<CoreAction> {
        let Some(surface) = self.state.surfaces.get_mut(id) else {
            return Vec::new();
        };
        if !surface.mapped {
            return Vec::new();
        }
        surface.mapped = false;
        let role = surface.role;

        let mut actions = match role {
            SurfaceRole::Toplevel(toplevel) => self.unmap_toplevel(toplevel),
            SurfaceRole::Layer(layer) => self.unmap_layer_surface(layer),
            SurfaceRole::Subsurface(sub) => {
                self.state.forest.unmap_subsurface(sub);
                Vec::new()
            }
            SurfaceRole::None => Vec::new(),
        };
        actions.extend(self.drop_stale_focus());
        actions
    }

    fn on_surface_destroyed(&mut self, id: SurfaceId) -> Vec<CoreAction> {
        let mut actions = self.on_surface_unmapped(id);

        if let SurfaceRole::Subsurface(sub) = self.state.surfaces.role(id) {
            self.state.forest.remove_subsurface(sub);
        }
        self.state.forest.surface_destroyed(id);
        self.state.surfaces.remove(id);

        actions.extend(self.drop_stale_focus());
        actions
    }

    fn on_subsurface_created(
        &mut self,
        id: SubsurfaceId,
        surface: SurfaceId,
        parent: SurfaceId,
        placement: Placement,
        position: (i32, i32),
    ) -> Vec<CoreAction> {
        let added = self.state.surfaces.add_subsurface(Subsurface {
            id,
            surface,
            parent,
            placement,
            position,
        });
        if !added {
            return Vec::new();
        }
        if let Some(node) = self.state.forest.node_for_surface(parent) {
            self.state
                .forest
                .add_subsurface(&self.state.surfaces, node, id);
        }
        Vec::new()
    }

    fn on_subsurface_destroyed(&mut self, id: SubsurfaceId) -> Vec<CoreAction> {
        self.state.forest.remove_subsurface(id);
        self.state.surfaces.remove_subsurface(id);
        self.drop_stale_focus()
    }

    /// Clear keyboard and pointer focus held by surfaces that are no
    /// longer part of any tree.
    fn drop_stale_focus(&mut self) -> Vec<CoreAction> {
        let focus = &self.state.focus;
        let stale: Vec<SurfaceId> = [focus.keyboard, focus.pointer]
            .into_iter()
            .flatten()
            .filter(|&s| self.state.forest.node_for_surface(s).is_none())
            .collect();

        let mut actions = Vec::new();
        for surface in stale {
            let (keyboard, pointer) = self.state.focus.forget(surface);
            if keyboard {
                actions.push(CoreAction::KeyboardClearFocus);
            }
            if pointer {
                actions.push(CoreAction::PointerClearFocus);
            }
        }
        actions
    }

    // ── Toplevels ────────────────────────────────────────────────────

    fn on_toplevel_created(
        &mut self,
        id: ToplevelId,
        surface: SurfaceId,
        app_id: Option<String>,
        title: Option<String>,
    ) -> Vec<CoreAction> {
        if !self
            .state
            .surfaces
            .set_role(surface, SurfaceRole::Toplevel(id))
        {
            return Vec::new();
        }
        self.state.toplevels.insert(Toplevel::new(
            id,
            surface,
            app_id.unwrap_or_default(),
            title.unwrap_or_default(),
        ));
        Vec::new()
    }

    fn on_toplevel_committed(&mut self, id: ToplevelId, geometry: Geometry) -> Vec<CoreAction> {
        let Some(toplevel) = self.state.toplevels.get_mut(id) else {
            return Vec::new();
        };
        toplevel.geometry = geometry;
        if toplevel.state.contains(ToplevelState::INITIALIZED) {
            return Vec::new();
        }
        toplevel.state.insert(ToplevelState::INITIALIZED);
        // 0x0 lets the client pick its own size
        vec![CoreAction::ConfigureToplevel {
            id,
            width: 0,
            height: 0,
        }]
    }

    fn on_toplevel_state_request(&mut self, id: ToplevelId) -> Vec<CoreAction> {
        // Maximize and fullscreen are not supported, but the protocol still
        // demands a configure in reply.
        match self.state.toplevels.get(id) {
            Some(t) if t.state.contains(ToplevelState::INITIALIZED) => {
                vec![CoreAction::ScheduleConfigure { id }]
            }
            _ => Vec::new(),
        }
    }

    fn on_toplevel_destroyed(&mut self, id: ToplevelId) -> Vec<CoreAction> {
        let mut actions = self.unmap_toplevel(id);
        if let Some(toplevel) = self.state.toplevels.remove(id) {
            if self.state.surfaces.role(toplevel.surface) == SurfaceRole::Toplevel(id) {
                self.state.surfaces.clear_role(toplevel.surface);
            }
            debug!("Destroyed {}", id);
        }
        actions.extend(self.drop_stale_focus());
        actions
    }

    fn map_toplevel(&mut self, id: ToplevelId) -> Vec<CoreAction> {
        let Some(surface) = self.state.toplevels.get(id).map(|t| t.surface) else {
            return Vec::new();
        };
        let tree = match self
            .state
            .forest
            .create_root(&self.state.surfaces, surface, Owner::Toplevel(id))
        {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Cannot map {}: {}", id, e);
                return Vec::new();
            }
        };
        if let Some(toplevel) = self.state.toplevels.get_mut(id) {
            toplevel.tree = Some(tree);
        }
        self.state.toplevels.map(id);
        info!("Mapped {}", id);

        self.state
            .focus_toplevel(Some(id), Some(surface), self.input.modifiers)
    }

    fn unmap_toplevel(&mut self, id: ToplevelId) -> Vec<CoreAction> {
        if !self.state.toplevels.unmap(id) {
            return Vec::new();
        }
        if let Some(tree) = self.state.toplevels.get_mut(id).and_then(|t| t.tree.take()) {
            self.state.forest.destroy(tree);
        }
        if self.state.cursor.mode.grabbed() == Some(id) {
            self.state.cursor.reset();
        }
        info!("Unmapped {}", id);
        self.drop_stale_focus()
    }

    /// Start an interactive move (`edges` is `None`) or resize.
    fn begin_interactive(&mut self, id: ToplevelId, edges: Option<ResizeEdges>) -> Vec<CoreAction> {
        if self.state.cursor.mode != CursorMode::Passthrough {
            debug!("Ignoring grab request from {} in {:?}", id, self.state.cursor.mode);
            return Vec::new();
        }
        if self.state.keyboard_focused_toplevel() != Some(id) {
            warn!("Denying grab request from unfocused {}", id);
            return Vec::new();
        }
        let Some(toplevel) = self.state.toplevels.get(id).filter(|t| t.is_mapped()) else {
            return Vec::new();
        };

        match edges {
            None => self.state.cursor.begin_move(toplevel),
            Some(edges) => self.state.cursor.begin_resize(toplevel, edges),
        }
        Vec::new()
    }

    // ── Layer surfaces ───────────────────────────────────────────────

    fn on_layer_surface_created(
        &mut self,
        id: LayerSurfaceId,
        surface: SurfaceId,
        output: Option<OutputId>,
        namespace: String,
        state: LayerSurfaceState,
    ) -> Vec<CoreAction> {
        let output = output
            .filter(|o| self.state.outputs.contains_key(o))
            .or_else(|| self.state.outputs.keys().next().copied());
        let Some(output) = output else {
            warn!("No output for layer surface {} ({}), closing", id, namespace);
            return vec![CoreAction::CloseLayerSurface { id }];
        };
        if !self.state.surfaces.set_role(surface, SurfaceRole::Layer(id)) {
            return vec![CoreAction::CloseLayerSurface { id }];
        }

        debug!("New layer surface {} ({}) on {}", id, namespace, output);
        self.state
            .layers
            .insert(LayerSurface::new(id, surface, output, namespace, state));
        Vec::new()
    }

    fn on_layer_surface_committed(
        &mut self,
        id: LayerSurfaceId,
        state: LayerSurfaceState,
    ) -> Vec<CoreAction> {
        let Some(layer) = self.state.layers.get_mut(id) else {
            return Vec::new();
        };
        let changed = layer.current != state;
        layer.current = state;
        let (output, initialized, mapped) = (layer.output, layer.initialized, layer.mapped);

        if !initialized {
            let Some(output) = self.state.outputs.get(&output) else {
                return Vec::new();
            };
            return self
                .state
                .layers
                .initial_configure(id, output)
                .into_iter()
                .collect();
        }
        if changed && mapped {
            self.arrange_output(output)
        } else {
            Vec::new()
        }
    }

    fn on_layer_surface_destroyed(&mut self, id: LayerSurfaceId) -> Vec<CoreAction> {
        let mut actions = self.unmap_layer_surface(id);
        if let Some(layer) = self.state.layers.remove(id) {
            if self.state.surfaces.role(layer.surface) == SurfaceRole::Layer(id) {
                self.state.surfaces.clear_role(layer.surface);
            }
        }
        actions.extend(self.drop_stale_focus());
        actions
    }

    fn map_layer_surface(&mut self, id: LayerSurfaceId) -> Vec<CoreAction> {
        let Some(surface) = self.state.layers.get(id).map(|l| l.surface) else {
            return Vec::new();
        };
        let tree = match self
            .state
            .forest
            .create_root(&self.state.surfaces, surface, Owner::Layer(id))
        {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Cannot map {}: {}", id, e);
                return Vec::new();
            }
        };
        let Some(layer) = self.state.layers.get_mut(id) else {
            return Vec::new();
        };
        layer.tree = Some(tree);
        layer.mapped = true;
        let output = layer.output;
        self.arrange_output(output)
    }

    fn unmap_layer_surface(&mut self, id: LayerSurfaceId) -> Vec<CoreAction> {
        let Some(layer) = self.state.layers.get_mut(id) else {
            return Vec::new();
        };
        if !layer.mapped {
            return Vec::new();
        }
        layer.mapped = false;
        let (tree, output) = (layer.tree.take(), layer.output);
        if let Some(tree) = tree {
            self.state.forest.destroy(tree);
        }
        let mut actions = self.arrange_output(output);
        actions.extend(self.drop_stale_focus());
        actions
    }

    /// Forget a layer surface whose output is going away and tell the
    /// client.
    fn close_layer_surface(&mut self, id: LayerSurfaceId) -> Vec<CoreAction> {
        let mut actions = self.on_layer_surface_destroyed(id);
        actions.push(CoreAction::CloseLayerSurface { id });
        actions
    }

    // ── Pointer ──────────────────────────────────────────────────────

    fn on_pointer_motion(&mut self, dx: f64, dy: f64, time: u32) -> Vec<CoreAction> {
        let (x, y) = self.state.cursor.position;
        let (x, y) = self.state.clamp_to_layout(x + dx, y + dy);
        self.state.cursor.position = (x, y);

        if self.state.cursor.mode == CursorMode::Pan {
            self.state.cursor.viewport.pan_by(dx, dy);
            return self
                .state
                .output_at(x, y)
                .map(|output| CoreAction::ScheduleFrame { output })
                .into_iter()
                .collect();
        }
        self.process_motion(time)
    }

    fn on_pointer_motion_absolute(&mut self, x: f64, y: f64, time: u32) -> Vec<CoreAction> {
        self.state.cursor.position = self.state.clamp_to_layout(x, y);
        self.process_motion(time)
    }

    fn process_motion(&mut self, time: u32) -> Vec<CoreAction> {
        let (cx, cy) = self.state.cursor.scene_position();

        match self.state.cursor.mode {
            CursorMode::Passthrough => self.passthrough_motion(time),
            CursorMode::Pan => Vec::new(),
            CursorMode::Move { toplevel, grab } => {
                let Some(t) = self.state.toplevels.get_mut(toplevel) else {
                    return Vec::new();
                };
                t.position = ((cx - grab.0) as i32, (cy - grab.1) as i32);
                vec![CoreAction::SetToplevelPosition {
                    id: toplevel,
                    x: t.position.0,
                    y: t.position.1,
                }]
            }
            CursorMode::Resize {
                toplevel,
                grab,
                grab_box,
                edges,
            } => {
                let Some(t) = self.state.toplevels.get_mut(toplevel) else {
                    return Vec::new();
                };
                let new = resize_box(grab_box, edges, (cx - grab.0, cy - grab.1));
                t.position = (new.x - t.geometry.x, new.y - t.geometry.y);
                vec![
                    CoreAction::SetToplevelPosition {
                        id: toplevel,
                        x: t.position.0,
                        y: t.position.1,
                    },
                    CoreAction::ConfigureToplevel {
                        id: toplevel,
                        width: new.width,
                        height: new.height,
                    },
                ]
            }
        }
    }

    fn passthrough_motion(&mut self, time: u32) -> Vec<CoreAction> {
        let (x, y) = self.state.cursor.position;
        let mut actions = Vec::new();

        if let Some(hit) = self.state.surface_at(x, y) {
            if self.state.focus.pointer != Some(hit.surface) {
                self.state.focus.pointer = Some(hit.surface);
                self.state.cursor.client_image();
                actions.push(CoreAction::PointerEnter {
                    surface: hit.surface,
                    sx: hit.sx,
                    sy: hit.sy,
                });
            }
            actions.push(CoreAction::PointerMotion {
                sx: hit.sx,
                sy: hit.sy,
                time,
            });
        } else {
            if let Some(name) = self.state.cursor.show_default() {
                actions.push(CoreAction::SetCursorImage { name });
            }
            if self.state.focus.pointer.take().is_some() {
                actions.push(CoreAction::PointerClearFocus);
            }
        }
        actions
    }

    fn on_pointer_button(&mut self, button: u32, pressed: bool, time: u32) -> Vec<CoreAction> {
        let mut actions = vec![CoreAction::PointerButton {
            button,
            pressed,
            time,
        }];

        if !pressed {
            self.state.cursor.reset();
            return actions;
        }

        if button == self.state.config.pan.button
            && self.state.cursor.mode == CursorMode::Passthrough
        {
            self.state.cursor.begin_pan();
        }

        let (x, y) = self.state.cursor.position;
        if let Some((toplevel, hit)) = self.state.toplevel_at(x, y) {
            actions.extend(self.state.focus_toplevel(
                Some(toplevel),
                Some(hit.surface),
                self.input.modifiers,
            ));
        }
        actions
    }

    fn on_pointer_axis(
        orientation: AxisOrientation,
        delta: f64,
        discrete: i32,
        time: u32,
    ) -> Vec<CoreAction> {
        vec![CoreAction::PointerAxis {
            orientation,
            delta,
            discrete,
            time,
        }]
    }

    // ── Keyboard ─────────────────────────────────────────────────────

    fn on_keyboard_key(&mut self, keycode: u32, pressed: bool, time: u32) -> Vec<CoreAction> {
        let was_panning = self.input.is_panning();
        let mut actions = match self.input.key(keycode, pressed) {
            KeyOutcome::Command(command) => self.execute_command(command),
            KeyOutcome::Forward => vec![CoreAction::KeyboardKey {
                keycode,
                pressed,
                time,
            }],
        };
        if was_panning && !self.input.is_panning() {
            actions.push(CoreAction::DisarmRepeatTimer);
        }
        actions
    }

    fn on_repeat_timer(&mut self) -> Vec<CoreAction> {
        if !self.input.is_panning() {
            return vec![CoreAction::DisarmRepeatTimer];
        }
        let (dx, dy) = self.input.pan_delta(self.state.config.pan.key_step);
        self.state.cursor.viewport.pan_by(dx, dy);

        let mut actions: Vec<_> = self.schedule_all_frames().collect();
        actions.push(CoreAction::ArmRepeatTimer {
            delay_ms: self.state.config.keyboard.repeat_rate_ms,
        });
        actions
    }

    // ── Command execution ────────────────────────────────────────────

    fn execute_command(&mut self, command: Command) -> Vec<CoreAction> {
        let mut actions = Vec::new();

        match command {
            Command::Exit => {
                info!("Exit requested");
                self.should_exit = true;
                self.state.running = false;
                actions.push(CoreAction::Exit);
            }
            Command::FocusNext => {
                if self.state.toplevels.stack().len() < 2 {
                    return actions;
                }
                if let Some(next) = self.state.toplevels.tail() {
                    let surface = self.state.toplevels.get(next).map(|t| t.surface);
                    actions.extend(self.state.focus_toplevel(
                        Some(next),
                        surface,
                        self.input.modifiers,
                    ));
                }
            }
            Command::Pan(direction) => {
                let (dx, dy) = direction.delta(self.state.config.pan.key_step);
                self.state.cursor.viewport.pan_by(dx, dy);
                actions.extend(self.schedule_all_frames());
                if self.input.is_panning() {
                    actions.push(CoreAction::ArmRepeatTimer {
                        delay_ms: self.state.config.keyboard.repeat_delay_ms,
                    });
                }
            }
            Command::Unknown(cmd) => {
                warn!("Unknown command: {}", cmd);
            }
        }

        actions
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The toplevel holding keyboard focus.
    pub fn focused_toplevel(&self) -> Option<ToplevelId> {
        self.state.keyboard_focused_toplevel()
    }

    pub const fn cursor_mode(&self) -> CursorMode {
        self.state.cursor.mode
    }

    pub const fn viewport_offset(&self) -> (f64, f64) {
        self.state.cursor.viewport.offset
    }
}
