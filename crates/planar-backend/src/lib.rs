//! Planar Backend - Event-loop adapter between protocol glue and planar-core.
//!
//! This crate:
//! - Owns the calloop event loop that drives the core.
//! - Maintains a mapping from protocol surface handles to `SurfaceId`.
//! - Feeds `CoreEvent`s arriving over a channel into `Core`.
//! - Applies the loop-level `CoreAction`s itself (key repeat timer, frame
//!   scheduling) and queues the rest for the protocol side.
//!
//! **No protocol types leak into `planar-core`.**

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use calloop::channel::{self, Channel, Sender};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, RegistrationToken};
use indexmap::IndexSet;
use tracing::{debug, error, info, trace};

use planar_core::config::Config;
use planar_core::event::{CoreAction, CoreEvent};
use planar_core::{Core, OutputId, SurfaceId};

/// Interval between loop wake-ups when nothing is ready.
const DISPATCH_INTERVAL: Duration = Duration::from_millis(16);

/// Protocol-side handle for a client surface.
///
/// In a real protocol integration this would wrap a `WlSurface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Everything the event loop callbacks can reach.
pub struct BackendState {
    /// The protocol-agnostic core.
    pub core: Core,
    handle: LoopHandle<'static, BackendState>,
    /// Protocol surface → core SurfaceId mapping.
    surface_map: HashMap<SurfaceHandle, SurfaceId>,
    next_handle: u64,
    repeat_timer: Option<RegistrationToken>,
    /// Outputs with a frame already queued.
    pending_frames: IndexSet<OutputId>,
    /// Actions the protocol side has not picked up yet.
    outbox: Vec<CoreAction>,
}

impl BackendState {
    /// Process an event and apply the resulting actions.
    pub fn handle_event(&mut self, event: CoreEvent) {
        trace!("event: {:?}", event);
        let actions = self.core.handle_event(event);
        self.apply_actions(actions);
    }

    /// Register a new protocol surface with the core and return both ids.
    pub fn register_surface(&mut self) -> (SurfaceHandle, SurfaceId) {
        let handle = SurfaceHandle(self.next_handle);
        self.next_handle += 1;
        let id = self.core.next_surface_id();
        self.surface_map.insert(handle, id);
        self.handle_event(CoreEvent::SurfaceCreated { id });
        (handle, id)
    }

    /// Forget a protocol surface, destroying it in the core.
    pub fn unregister_surface(&mut self, handle: SurfaceHandle) -> Option<SurfaceId> {
        let id = self.surface_map.remove(&handle)?;
        self.handle_event(CoreEvent::SurfaceDestroyed { id });
        Some(id)
    }

    pub fn surface(&self, handle: SurfaceHandle) -> Option<SurfaceId> {
        self.surface_map.get(&handle).copied()
    }

    /// Take every action queued for the protocol side.
    pub fn drain_actions(&mut self) -> Vec<CoreAction> {
        std::mem::take(&mut self.outbox)
    }

    pub const fn repeat_armed(&self) -> bool {
        self.repeat_timer.is_some()
    }

    /// Apply a list of core actions.
    pub fn apply_actions(&mut self, actions: Vec<CoreAction>) {
        for action in actions {
            match action {
                CoreAction::ArmRepeatTimer { delay_ms } => self.arm_repeat(delay_ms),
                CoreAction::DisarmRepeatTimer => self.disarm_repeat(),
                CoreAction::ScheduleFrame { output } => self.schedule_frame(output),
                CoreAction::Exit => {
                    info!("Exit requested by core");
                    self.disarm_repeat();
                    self.outbox.push(CoreAction::Exit);
                }
                other => self.outbox.push(other),
            }
        }
    }

    fn arm_repeat(&mut self, delay_ms: u64) {
        self.disarm_repeat();
        let timer = Timer::from_duration(Duration::from_millis(delay_ms));
        let inserted = self.handle.insert_source(timer, |_, _, state| {
            state.repeat_timer = None;
            state.handle_event(CoreEvent::RepeatTimer);
            TimeoutAction::Drop
        });
        match inserted {
            Ok(token) => self.repeat_timer = Some(token),
            Err(e) => error!("Failed to arm key repeat timer: {}", e.error),
        }
    }

    fn disarm_repeat(&mut self) {
        if let Some(token) = self.repeat_timer.take() {
            self.handle.remove(token);
        }
    }

    fn schedule_frame(&mut self, output: OutputId) {
        if !self.pending_frames.insert(output) {
            return;
        }
        self.handle.insert_idle(move |state| {
            state.pending_frames.shift_remove(&output);
            state.handle_event(CoreEvent::OutputFrame { id: output });
        });
    }
}

/// The backend adapter.
///
/// Owns the event loop and the core engine.
pub struct Backend {
    event_loop: EventLoop<'static, BackendState>,
    state: BackendState,
}

impl Backend {
    /// Create the event loop and core. Events sent through the returned
    /// sender are fed to the core on the loop thread.
    pub fn new(config: Config) -> Result<(Self, Sender<CoreEvent>)> {
        let event_loop: EventLoop<'static, BackendState> = EventLoop::try_new()?;
        let handle = event_loop.handle();

        let (sender, receiver): (Sender<CoreEvent>, Channel<CoreEvent>) = channel::channel();
        handle
            .insert_source(receiver, |event, _, state| match event {
                channel::Event::Msg(event) => state.handle_event(event),
                channel::Event::Closed => {
                    info!("Event channel closed, shutting down");
                    state.core.should_exit = true;
                }
            })
            .map_err(|e| anyhow!("Failed to register event channel: {}", e.error))?;

        let state = BackendState {
            core: Core::new(config),
            handle,
            surface_map: HashMap::new(),
            next_handle: 1,
            repeat_timer: None,
            pending_frames: IndexSet::new(),
            outbox: Vec::new(),
        };

        Ok((Self { event_loop, state }, sender))
    }

    pub const fn state(&self) -> &BackendState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BackendState {
        &mut self.state
    }

    /// Run one loop iteration, waiting at most `timeout`.
    pub fn dispatch(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.event_loop.dispatch(timeout, &mut self.state)?;
        Ok(())
    }

    /// Run the backend event loop until the core asks to exit.
    ///
    /// Without protocol glue attached nothing consumes the outbox, so
    /// queued actions are logged and dropped after each iteration. Glue
    /// that wants them drives [`dispatch`](Self::dispatch) itself and calls
    /// [`BackendState::drain_actions`].
    pub fn run(&mut self) -> Result<()> {
        info!("Starting Planar event loop");
        while !self.state.core.should_exit {
            self.dispatch(Some(DISPATCH_INTERVAL))?;
            for action in self.state.drain_actions() {
                debug!("Unconsumed action: {:?}", action);
            }
        }
        info!("Planar shutdown complete");
        Ok(())
    }
}
