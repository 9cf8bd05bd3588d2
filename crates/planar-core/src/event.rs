//! Protocol-agnostic events and actions.
//!
//! [`CoreEvent`] represents what the protocol glue tells core.
//! [`CoreAction`] represents what core tells its collaborators to do.

use crate::cursor::ResizeEdges;
use crate::input::Modifiers;
use crate::layer::{LayerSurfaceId, LayerSurfaceState};
use crate::output::OutputId;
use crate::state::Geometry;
use crate::surface::{Placement, SubsurfaceId, SurfaceId};
use crate::toplevel::ToplevelId;
use crate::viewport::FrameSnapshot;

/// Scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

/// Events that the protocol glue sends to the core engine.
///
/// Ids are allocated with the `Core::next_*_id` family before the creating
/// event is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A new output was connected. `geometry` is its layout position and
    /// mode size in pixels.
    OutputAdded {
        id: OutputId,
        name: String,
        geometry: Geometry,
        scale: f64,
    },

    /// An output changed mode or scale.
    OutputModeChanged {
        id: OutputId,
        width: u32,
        height: u32,
        scale: f64,
    },

    /// An output was disconnected.
    OutputRemoved { id: OutputId },

    /// An output is ready to draw a new frame.
    OutputFrame { id: OutputId },

    SurfaceCreated { id: SurfaceId },

    /// A surface committed a buffer of the given size.
    SurfaceCommitted { id: SurfaceId, width: u32, height: u32 },

    SurfaceMapped { id: SurfaceId },
    SurfaceUnmapped { id: SurfaceId },
    SurfaceDestroyed { id: SurfaceId },

    SubsurfaceCreated {
        id: SubsurfaceId,
        surface: SurfaceId,
        parent: SurfaceId,
        placement: Placement,
        x: i32,
        y: i32,
    },
    SubsurfaceMoved { id: SubsurfaceId, x: i32, y: i32 },
    SubsurfaceDestroyed { id: SubsurfaceId },

    ToplevelCreated {
        id: ToplevelId,
        surface: SurfaceId,
        app_id: Option<String>,
        title: Option<String>,
    },

    /// A toplevel committed; `geometry` is its window geometry within the
    /// root surface.
    ToplevelCommitted { id: ToplevelId, geometry: Geometry },

    ToplevelRequestMove { id: ToplevelId },
    ToplevelRequestResize { id: ToplevelId, edges: ResizeEdges },
    ToplevelRequestMaximize { id: ToplevelId },
    ToplevelRequestFullscreen { id: ToplevelId },
    ToplevelDestroyed { id: ToplevelId },

    LayerSurfaceCreated {
        id: LayerSurfaceId,
        surface: SurfaceId,
        /// Requested output, `None` to let the compositor pick.
        output: Option<OutputId>,
        namespace: String,
        state: LayerSurfaceState,
    },
    LayerSurfaceCommitted {
        id: LayerSurfaceId,
        state: LayerSurfaceState,
    },
    LayerSurfaceDestroyed { id: LayerSurfaceId },

    /// Relative pointer motion.
    PointerMotion { dx: f64, dy: f64, time: u32 },

    /// Absolute pointer motion in layout coordinates.
    PointerMotionAbsolute { x: f64, y: f64, time: u32 },

    /// Pointer button press/release. `button` uses Linux event codes.
    PointerButton { button: u32, pressed: bool, time: u32 },

    PointerAxis {
        orientation: AxisOrientation,
        delta: f64,
        discrete: i32,
        time: u32,
    },

    PointerFrame,

    /// A keyboard was attached to the seat.
    KeyboardAdded,

    KeyboardModifiers { modifiers: Modifiers },

    /// Key press/release. `keycode` is a Linux evdev code.
    KeyboardKey { keycode: u32, pressed: bool, time: u32 },

    /// The key repeat timer armed through [`CoreAction::ArmRepeatTimer`]
    /// fired.
    RepeatTimer,
}

/// Actions that core returns for execution.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreAction {
    /// Ask the client for a new window size. 0×0 lets it choose.
    ConfigureToplevel { id: ToplevelId, width: u32, height: u32 },

    /// Re-send the current configure.
    ScheduleConfigure { id: ToplevelId },

    SetActivated { id: ToplevelId, activated: bool },

    /// Move the toplevel's scene node.
    SetToplevelPosition { id: ToplevelId, x: i32, y: i32 },

    RaiseToplevel { id: ToplevelId },

    ConfigureLayerSurface {
        id: LayerSurfaceId,
        width: u32,
        height: u32,
    },

    /// Move the layer surface's scene node, in layout coordinates.
    SetLayerPosition { id: LayerSurfaceId, x: i32, y: i32 },

    CloseLayerSurface { id: LayerSurfaceId },

    KeyboardEnter {
        surface: SurfaceId,
        modifiers: Modifiers,
    },
    KeyboardClearFocus,
    KeyboardKey { keycode: u32, pressed: bool, time: u32 },
    KeyboardModifiers { modifiers: Modifiers },
    /// Client-side key repeat: `rate` keys per second after `delay` ms.
    SetRepeatInfo { rate: i32, delay: i32 },

    PointerEnter { surface: SurfaceId, sx: f64, sy: f64 },
    PointerMotion { sx: f64, sy: f64, time: u32 },
    PointerClearFocus,
    PointerButton { button: u32, pressed: bool, time: u32 },
    PointerAxis {
        orientation: AxisOrientation,
        delta: f64,
        discrete: i32,
        time: u32,
    },
    PointerFrame,

    SetCursorImage { name: String },

    /// Request a frame callback for the output.
    ScheduleFrame { output: OutputId },

    /// Draw the given frame.
    CommitFrame(FrameSnapshot),

    /// (Re-)arm the key repeat timer to fire once after `delay_ms`.
    ArmRepeatTimer { delay_ms: u64 },
    DisarmRepeatTimer,

    /// The compositor should exit.
    Exit,
}
