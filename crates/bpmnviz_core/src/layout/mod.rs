//! The layout pipeline: configuration, the per-container working scope the
//! stages mutate, and the stage implementations themselves.

pub mod boundary;
pub mod compact;
pub mod edge_fix;
pub mod gateway;
pub mod normalize;
pub mod pathfind;
pub mod pipeline;
pub mod propagate;
pub mod tree;

use indexmap::IndexMap;

use crate::geometry::Bounds;
use crate::model::{BoundaryEvent, Edge, EdgeKind, NodeKind};

/// Tunable gaps and toggles for the pipeline. All fields have defaults;
/// callers override individual fields with struct update syntax.
#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    /// Minimum horizontal gap between nodes connected by a sequence flow.
    pub horizontal_gap: f64,
    /// Minimum vertical gap between stacked nodes.
    pub vertical_gap: f64,
    /// Vertical offset reserved below a host for its boundary events.
    pub boundary_event_gap: f64,
    /// Padding between a container border and its content.
    pub container_padding: f64,
    /// Y from a host's bottom edge to the merging-branch layer.
    pub merge_layer_gap: f64,
    /// Extra Y below the merge layer for branches ending in an end event.
    pub end_layer_gap: f64,
    /// Extra Y below the end-event layer for dead-end branches.
    pub dead_end_layer_gap: f64,
    /// Y step applied when a branch collides with an already placed one.
    pub branch_push_gap: f64,
    /// Margin used when testing placed branches for collision.
    pub branch_inflate: f64,
    /// Whether the whitespace compactor runs.
    pub compaction: bool,
    /// Whether compaction honors dependency order via topological sort.
    pub dependency_compaction: bool,
    /// Whether the constraint solver refines positions after the stages.
    pub solver_refinement: bool,
    /// Extra stage logging.
    pub debug: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            horizontal_gap: 60.0,
            vertical_gap: 40.0,
            boundary_event_gap: 85.0,
            container_padding: 25.0,
            merge_layer_gap: 85.0,
            end_layer_gap: 80.0,
            dead_end_layer_gap: 100.0,
            branch_push_gap: 55.0,
            branch_inflate: 50.0,
            compaction: false,
            dependency_compaction: false,
            solver_refinement: false,
            debug: false,
        }
    }
}

/// A flow node as the layout stages see it: positioned bounds plus the kind
/// facts layout decisions switch on.
#[derive(Debug, Clone)]
pub struct ScopeNode {
    pub id: String,
    pub kind: NodeKind,
    pub bounds: Bounds,
    /// Rendered height when smaller than the layout height.
    pub visual_height: Option<f64>,
}

/// The mutable working set for one container: its direct flow children, the
/// edges it owns and the boundary events attached to those children.
///
/// Coordinates are local to the container. The orchestrator extracts a scope
/// from the tree, hands it through the stages in order, and writes the
/// results back.
#[derive(Debug, Clone, Default)]
pub struct FlowScope {
    pub nodes: IndexMap<String, ScopeNode>,
    pub edges: Vec<Edge>,
    pub boundary_events: Vec<BoundaryEvent>,
}

impl FlowScope {
    /// Bounds of a scope node.
    #[must_use]
    pub fn bounds(&self, id: &str) -> Option<Bounds> {
        self.nodes.get(id).map(|node| node.bounds)
    }

    /// Bounds of either a scope node or a positioned boundary event.
    #[must_use]
    pub fn element_bounds(&self, id: &str) -> Option<Bounds> {
        self.bounds(id).or_else(|| {
            self.boundary_events
                .iter()
                .find(|be| be.id == id)
                .and_then(BoundaryEvent::bounds)
        })
    }

    /// Whether the id names a boundary event in this scope.
    #[must_use]
    pub fn is_boundary_event(&self, id: &str) -> bool {
        self.boundary_events.iter().any(|be| be.id == id)
    }

    /// Sequence flows leaving `id`, in declaration order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |edge| edge.kind == EdgeKind::SequenceFlow && edge.source == id)
    }

    /// Sequence flows entering `id`, in declaration order.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |edge| edge.kind == EdgeKind::SequenceFlow && edge.target == id)
    }

    /// Moves a node by the given delta. Boundary events attached to it move
    /// with their host.
    pub fn translate_node(&mut self, id: &str, dx: f64, dy: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.bounds.x += dx;
            node.bounds.y += dy;
        }
        for be in &mut self.boundary_events {
            if be.attached_to == id {
                if let Some(x) = be.x.as_mut() {
                    *x += dx;
                }
                if let Some(y) = be.y.as_mut() {
                    *y += dy;
                }
            }
        }
    }

    /// Obstacle rectangles for routing: every flow node except the listed
    /// ids. Boundary events are too small to be meaningful obstacles.
    #[must_use]
    pub fn obstacles(&self, exclude: &[&str]) -> Vec<Bounds> {
        self.nodes
            .values()
            .filter(|node| !exclude.contains(&node.id.as_str()))
            .map(|node| node.bounds)
            .collect()
    }
}
