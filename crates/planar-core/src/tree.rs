//! Surface trees.
//!
//! A tree wraps a root surface (a toplevel or layer surface) and every
//! sub-surface currently realised below it. Nodes live in an arena and refer
//! to each other by [`NodeId`]; sub-surface relations are keyed by the
//! protocol's [`SubsurfaceId`]. A relation outlives map/unmap cycles of its
//! child: unmapping tears down only the child tree, and a later map builds a
//! fresh one.
//!
//! The arena also serves as the drawable → owner side table: every live node
//! records which toplevel or layer surface it belongs to, so a hit on any
//! surface resolves to its logical owner with one lookup.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::layer::LayerSurfaceId;
use crate::surface::{Placement, SubsurfaceId, SurfaceId, SurfaceRegistry};
use crate::toplevel::ToplevelId;

/// Arena index of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Logical object a surface tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Toplevel(ToplevelId),
    Layer(LayerSurfaceId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Surface {0} is not known")]
    UnknownSurface(SurfaceId),

    #[error("Surface {0} already belongs to a tree")]
    AlreadyWrapped(SurfaceId),

    #[error("Surface node limit of {0} reached")]
    Exhausted(usize),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub surface: SurfaceId,
    pub owner: Owner,
    pub parent: Option<NodeId>,
    /// Relation through which this node hangs off its parent.
    pub relation: Option<SubsurfaceId>,
    /// Child relations in insertion order.
    pub children: Vec<SubsurfaceId>,
}

#[derive(Debug, Clone)]
pub struct SubsurfaceRelation {
    pub id: SubsurfaceId,
    pub parent: NodeId,
    pub surface: SurfaceId,
    pub placement: Placement,
    /// Present exactly while the sub-surface is mapped.
    pub child: Option<NodeId>,
}

/// Arena of all surface trees.
#[derive(Debug)]
pub struct SurfaceForest {
    nodes: HashMap<NodeId, TreeNode>,
    relations: HashMap<SubsurfaceId, SubsurfaceRelation>,
    by_surface: HashMap<SurfaceId, NodeId>,
    next_node: u64,
    max_nodes: usize,
}

impl Default for SurfaceForest {
    fn default() -> Self {
        Self::with_limit(usize::MAX)
    }
}

impl SurfaceForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_nodes: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            relations: HashMap::new(),
            by_surface: HashMap::new(),
            next_node: 1,
            max_nodes,
        }
    }

    /// Wrap `surface` and all of its currently existing sub-surfaces into a
    /// new tree. Future sub-surfaces of any wrapped surface are picked up by
    /// [`add_subsurface`](Self::add_subsurface).
    pub fn create_root(
        &mut self,
        surfaces: &SurfaceRegistry,
        surface: SurfaceId,
        owner: Owner,
    ) -> Result<NodeId, TreeError> {
        let id = self.create_node(surfaces, surface, owner, None)?;
        debug!("New tree {} for {} owned by {:?}", id, surface, owner);
        Ok(id)
    }

    fn create_node(
        &mut self,
        surfaces: &SurfaceRegistry,
        surface: SurfaceId,
        owner: Owner,
        parent: Option<(NodeId, SubsurfaceId)>,
    ) -> Result<NodeId, TreeError> {
        let Some(record) = surfaces.get(surface) else {
            return Err(TreeError::UnknownSurface(surface));
        };
        if self.by_surface.contains_key(&surface) {
            return Err(TreeError::AlreadyWrapped(surface));
        }
        if self.nodes.len() >= self.max_nodes {
            return Err(TreeError::Exhausted(self.max_nodes));
        }

        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            TreeNode {
                id,
                surface,
                owner,
                parent: parent.map(|(node, _)| node),
                relation: parent.map(|(_, rel)| rel),
                children: Vec::new(),
            },
        );
        self.by_surface.insert(surface, id);

        for sub in record.subsurfaces() {
            self.add_subsurface(surfaces, id, sub);
        }

        Ok(id)
    }

    /// Track a new sub-surface of `parent`. The child is realised right away
    /// when its surface is already mapped, otherwise on its map event.
    pub fn add_subsurface(&mut self, surfaces: &SurfaceRegistry, parent: NodeId, sub: SubsurfaceId) {
        if self.relations.contains_key(&sub) || !self.nodes.contains_key(&parent) {
            return;
        }
        let Some(record) = surfaces.subsurface(sub) else {
            warn!("Unknown {} offered to {}", sub, parent);
            return;
        };

        self.relations.insert(
            sub,
            SubsurfaceRelation {
                id: sub,
                parent,
                surface: record.surface,
                placement: record.placement,
                child: None,
            },
        );
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(sub);
        }
        debug!("{} tracked under {}", sub, parent);

        if surfaces.is_mapped(record.surface) {
            self.map_subsurface(surfaces, sub);
        }
    }

    /// Build the child tree of a mapped sub-surface.
    pub fn map_subsurface(&mut self, surfaces: &SurfaceRegistry, sub: SubsurfaceId) {
        let Some(relation) = self.relations.get(&sub) else {
            return;
        };
        if relation.child.is_some() {
            return;
        }
        let (parent, surface) = (relation.parent, relation.surface);
        let Some(owner) = self.nodes.get(&parent).map(|n| n.owner) else {
            return;
        };

        match self.create_node(surfaces, surface, owner, Some((parent, sub))) {
            Ok(child) => {
                if let Some(relation) = self.relations.get_mut(&sub) {
                    relation.child = Some(child);
                }
                debug!("Mapped {} creates {}", sub, child);
            }
            Err(e) => warn!("Could not realise {}: {}", sub, e),
        }
    }

    /// Tear down the child tree of an unmapped sub-surface. The relation
    /// stays so a later map can rebuild it.
    pub fn unmap_subsurface(&mut self, sub: SubsurfaceId) {
        let child = self.relations.get_mut(&sub).and_then(|r| r.child.take());
        if let Some(child) = child {
            debug!("Unmapped {} drops {}", sub, child);
            self.destroy(child);
        }
    }

    /// Forget a sub-surface relation and everything below it.
    pub fn remove_subsurface(&mut self, sub: SubsurfaceId) {
        self.unmap_subsurface(sub);
        if let Some(relation) = self.relations.remove(&sub) {
            if let Some(parent) = self.nodes.get_mut(&relation.parent) {
                parent.children.retain(|&s| s != sub);
            }
            debug!("Destroyed {}", sub);
        }
    }

    /// Destroy a node after all of its descendants. Safe to call on a node
    /// that is already gone.
    pub fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };

        for sub in &node.children {
            if let Some(relation) = self.relations.remove(sub) {
                if let Some(child) = relation.child {
                    self.destroy(child);
                }
            }
        }

        if self.by_surface.get(&node.surface) == Some(&id) {
            self.by_surface.remove(&node.surface);
        }
        if let Some(sub) = node.relation {
            if let Some(relation) = self.relations.get_mut(&sub) {
                if relation.child == Some(id) {
                    relation.child = None;
                }
            }
        }
        debug!("Destroy {} ({})", id, node.surface);
    }

    /// The underlying surface went away.
    pub fn surface_destroyed(&mut self, surface: SurfaceId) {
        if let Some(&id) = self.by_surface.get(&surface) {
            self.destroy(id);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn node_for_surface(&self, surface: SurfaceId) -> Option<NodeId> {
        self.by_surface.get(&surface).copied()
    }

    pub fn relation(&self, sub: SubsurfaceId) -> Option<&SubsurfaceRelation> {
        self.relations.get(&sub)
    }

    /// Resolve a drawable to the logical object owning its tree.
    pub fn owner_of(&self, surface: SurfaceId) -> Option<Owner> {
        self.by_surface
            .get(&surface)
            .and_then(|id| self.nodes.get(id))
            .map(|n| n.owner)
    }

    /// Surfaces that currently have a live node.
    pub fn live_surfaces(&self) -> HashSet<SurfaceId> {
        self.nodes.values().map(|n| n.surface).collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    pub fn relations(&self) -> impl Iterator<Item = &SubsurfaceRelation> {
        self.relations.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
