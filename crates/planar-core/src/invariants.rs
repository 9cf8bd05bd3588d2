//! Invariant validation for the core state.
//!
//! Called after every `handle_event` / `exec` in debug builds.

use crate::state::State;

/// Error indicating which invariant was violated.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("More than one toplevel is activated: {0}")]
    MultipleActivated(String),

    #[error("Activated toplevel {0} is not at the head of the stack")]
    ActivatedNotHead(String),

    #[error("Toplevel {0} is stacked but not mapped")]
    StackedUnmapped(String),

    #[error("Grabbed toplevel {0} does not exist or is not mapped")]
    GrabTargetMissing(String),

    #[error("Relation {0} points at a node that does not point back")]
    RelationMismatch(String),

    #[error("Node {0} is missing from the surface index")]
    NodeNotIndexed(String),

    #[error("Layer surface {0} is bound to a missing output")]
    LayerOutputMissing(String),
}

/// Validate all core invariants. Returns the first violation found.
pub fn validate(state: &State) -> Result<(), InvariantError> {
    // 1. At most one activated toplevel, and it is the front-most one
    let activated: Vec<_> = state.toplevels.activated().collect();
    if activated.len() > 1 {
        let ids: Vec<_> = activated.iter().map(ToString::to_string).collect();
        return Err(InvariantError::MultipleActivated(ids.join(", ")));
    }
    if let Some(&id) = activated.first() {
        if state.toplevels.head() != Some(id) {
            return Err(InvariantError::ActivatedNotHead(id.to_string()));
        }
    }

    // 2. Stacked toplevels are mapped
    for &id in state.toplevels.stack() {
        if !state.toplevels.get(id).is_some_and(|t| t.is_mapped()) {
            return Err(InvariantError::StackedUnmapped(id.to_string()));
        }
    }

    // 3. A grab always refers to a live, mapped toplevel
    if let Some(id) = state.cursor.mode.grabbed() {
        if !state.toplevels.get(id).is_some_and(|t| t.is_mapped()) {
            return Err(InvariantError::GrabTargetMissing(id.to_string()));
        }
    }

    // 4. Relations and their child nodes agree
    for relation in state.forest.relations() {
        if state.forest.node(relation.parent).is_none() {
            return Err(InvariantError::RelationMismatch(relation.id.to_string()));
        }
        if let Some(child) = relation.child {
            let consistent = state.forest.node(child).is_some_and(|n| {
                n.relation == Some(relation.id) && n.parent == Some(relation.parent)
            });
            if !consistent {
                return Err(InvariantError::RelationMismatch(relation.id.to_string()));
            }
        }
    }

    // 5. Every node can be found through its surface
    for node in state.forest.nodes() {
        if state.forest.node_for_surface(node.surface) != Some(node.id) {
            return Err(InvariantError::NodeNotIndexed(node.id.to_string()));
        }
    }

    // 6. Layer surfaces live on existing outputs
    for layer in state.layers.iter() {
        if !state.outputs.contains_key(&layer.output) {
            return Err(InvariantError::LayerOutputMissing(layer.id.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::cursor::CursorMode;
    use crate::surface::SurfaceId;
    use crate::toplevel::{Toplevel, ToplevelId, ToplevelState};

    fn state_with(ids: &[u64]) -> State {
        let mut state = State::new(Config::default());
        for &id in ids {
            let t = Toplevel::new(ToplevelId(id), SurfaceId(id), String::new(), String::new());
            state.toplevels.insert(t);
            state.toplevels.map(ToplevelId(id));
        }
        state
    }

    #[test]
    fn empty_state_is_valid() {
        assert!(validate(&State::new(Config::default())).is_ok());
    }

    #[test]
    fn activated_toplevel_must_be_head() {
        let mut state = state_with(&[1, 2]);
        // Stack is [2, 1]
        state
            .toplevels
            .get_mut(ToplevelId(1))
            .unwrap()
            .state
            .insert(ToplevelState::ACTIVATED);
        assert!(matches!(
            validate(&state),
            Err(InvariantError::ActivatedNotHead(_))
        ));
    }

    #[test]
    fn grab_on_unmapped_toplevel_is_reported() {
        let mut state = state_with(&[1]);
        state.cursor.mode = CursorMode::Move {
            toplevel: ToplevelId(9),
            grab: (0.0, 0.0),
        };
        assert!(matches!(
            validate(&state),
            Err(InvariantError::GrabTargetMissing(_))
        ));
    }
}
