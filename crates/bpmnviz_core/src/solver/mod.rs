//! Declarative constraint solver over node X/Y positions.
//!
//! The solver runs in two phases: nodes are registered with their fixed
//! sizes and suggested initial positions, constraints are collected, and
//! [`LayoutSolver::solve`] lowers everything into pairwise linear relations
//! and resolves them by strength-ordered projection. Solved values are
//! cached until [`LayoutSolver::clear`] resets the state.
//!
//! Disjunctive relations (`noOverlap`, absolute-value distances) are out of
//! scope; callers lower them to an ordering choice before adding them.

mod engine;

use indexmap::IndexMap;
use tracing::debug;

use crate::errors::ConstraintClass;
use crate::model::{Edge, EdgeKind};

pub use engine::SolveOutcome;

/// Symbolic constraint strength. Stronger constraints win over weaker ones;
/// suggested initial positions act as weak edits below all of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
    Required,
}

/// Axis selector for [`Constraint::MinDistance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// The typed constraint vocabulary.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// All listed nodes share one X.
    AlignX { nodes: Vec<String>, strength: Strength },
    /// All listed nodes share one Y.
    AlignY { nodes: Vec<String>, strength: Strength },
    /// `reference.x − node.x ≥ node.width + min_gap`.
    LeftOf {
        node: String,
        reference: String,
        min_gap: f64,
        strength: Strength,
    },
    /// `node.x − reference.x ≥ reference.width + min_gap`.
    RightOf {
        node: String,
        reference: String,
        min_gap: f64,
        strength: Strength,
    },
    /// `reference.y − node.y ≥ node.height + min_gap`.
    Above {
        node: String,
        reference: String,
        min_gap: f64,
        strength: Strength,
    },
    /// `node.y − reference.y ≥ reference.height + min_gap`.
    Below {
        node: String,
        reference: String,
        min_gap: f64,
        strength: Strength,
    },
    /// Pins one or both coordinates of a node.
    FixedPosition {
        node: String,
        x: Option<f64>,
        y: Option<f64>,
        strength: Strength,
    },
    /// Constrains the node's box to lie inside the container's box minus
    /// `padding` on every side.
    InContainer {
        node: String,
        container: String,
        padding: f64,
        strength: Strength,
    },
    /// One-sided gap along an axis, preferring `second` on the positive side
    /// of `first`.
    MinDistance {
        first: String,
        second: String,
        axis: Axis,
        min_distance: f64,
        strength: Strength,
    },
}

impl Constraint {
    /// Classifies the constraint for failure reporting.
    #[must_use]
    pub fn class(&self) -> ConstraintClass {
        match self {
            Constraint::AlignX { .. } | Constraint::AlignY { .. } => ConstraintClass::Alignment,
            Constraint::LeftOf { .. }
            | Constraint::RightOf { .. }
            | Constraint::Above { .. }
            | Constraint::Below { .. } => ConstraintClass::Ordering,
            Constraint::FixedPosition { .. } => ConstraintClass::Fixed,
            Constraint::InContainer { .. } => ConstraintClass::Containment,
            Constraint::MinDistance { .. } => ConstraintClass::Distance,
        }
    }

    /// Every node id the constraint references.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        match self {
            Constraint::AlignX { nodes, .. } | Constraint::AlignY { nodes, .. } => {
                nodes.iter().map(String::as_str).collect()
            }
            Constraint::LeftOf { node, reference, .. }
            | Constraint::RightOf { node, reference, .. }
            | Constraint::Above { node, reference, .. }
            | Constraint::Below { node, reference, .. } => vec![node, reference],
            Constraint::FixedPosition { node, .. } => vec![node],
            Constraint::InContainer { node, container, .. } => vec![node, container],
            Constraint::MinDistance { first, second, .. } => vec![first, second],
        }
    }
}

/// A node registered with the solver: fixed size plus suggested position.
#[derive(Debug, Clone, Copy)]
pub struct SolverNode {
    pub width: f64,
    pub height: f64,
    pub suggested_x: f64,
    pub suggested_y: f64,
}

/// Two-phase position solver. See the module documentation.
#[derive(Debug, Default)]
pub struct LayoutSolver {
    nodes: IndexMap<String, SolverNode>,
    constraints: Vec<Constraint>,
    cached: Option<SolveOutcome>,
}

impl LayoutSolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node, contributing an X and a Y variable with the given
    /// suggested values. Re-registering an id replaces the earlier entry.
    pub fn register_node(
        &mut self,
        id: impl Into<String>,
        width: f64,
        height: f64,
        suggested_x: f64,
        suggested_y: f64,
    ) {
        self.cached = None;
        self.nodes.insert(
            id.into(),
            SolverNode {
                width,
                height,
                suggested_x,
                suggested_y,
            },
        );
    }

    /// Adds a constraint. Returns `false` (and drops the constraint) when it
    /// references a node that was never registered.
    pub fn add_constraint(&mut self, constraint: Constraint) -> bool {
        let known = constraint
            .references()
            .iter()
            .all(|id| self.nodes.contains_key(*id));
        if !known {
            debug!(?constraint, "dropping constraint with unknown node reference");
            return false;
        }
        self.cached = None;
        self.constraints.push(constraint);
        true
    }

    /// Solves the system, returning cached values on repeated calls.
    ///
    /// A system whose required constraints cannot converge is reported
    /// through [`SolveOutcome::converged`]; positions then fall back to the
    /// suggested values.
    pub fn solve(&mut self) -> SolveOutcome {
        if let Some(cached) = &self.cached {
            return cached.clone();
        }
        let outcome = engine::solve(&self.nodes, &self.constraints);
        if !outcome.converged {
            debug!(
                dominant = %outcome.dominant.map(|c| c.to_string()).unwrap_or_default(),
                "constraint system did not converge; using suggested positions"
            );
        }
        self.cached = Some(outcome.clone());
        outcome
    }

    /// Drops all nodes, constraints and cached results.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.constraints.clear();
        self.cached = None;
    }
}

/// Options consumed by [`generate_bpmn_constraints`].
#[derive(Debug, Clone, Copy)]
pub struct ConstraintOptions {
    /// Minimum horizontal gap along sequence flows.
    pub horizontal_gap: f64,
    /// Vertical gap between a host and its boundary-event targets.
    pub boundary_event_gap: f64,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            horizontal_gap: 60.0,
            boundary_event_gap: 85.0,
        }
    }
}

/// Emits the canonical constraint set for a BPMN flow:
///
/// - `leftOf` for every sequence flow source → target,
/// - required `below` for every boundary-event target under its host,
/// - required `below` between sibling lanes, in order, with no gap.
#[must_use]
pub fn generate_bpmn_constraints(
    edges: &[Edge],
    boundary_targets: &[(String, String)],
    lanes: &[String],
    options: &ConstraintOptions,
) -> Vec<Constraint> {
    let mut constraints = Vec::new();

    for edge in edges {
        if edge.kind != EdgeKind::SequenceFlow {
            continue;
        }
        constraints.push(Constraint::LeftOf {
            node: edge.source.clone(),
            reference: edge.target.clone(),
            min_gap: options.horizontal_gap,
            strength: Strength::Strong,
        });
    }

    for (host, target) in boundary_targets {
        constraints.push(Constraint::Below {
            node: target.clone(),
            reference: host.clone(),
            min_gap: options.boundary_event_gap,
            strength: Strength::Required,
        });
    }

    for pair in lanes.windows(2) {
        constraints.push(Constraint::Below {
            node: pair[1].clone(),
            reference: pair[0].clone(),
            min_gap: 0.0,
            strength: Strength::Required,
        });
    }

    constraints
}
