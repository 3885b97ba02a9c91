//! The pipeline orchestrator.
//!
//! Owns the graph through the whole run, extracts a [`FlowScope`] per
//! container, hands it through the stages in order, writes the results back
//! and finally folds everything into the diagram model. Containers are laid
//! out bottom-up so an expanded subprocess is sized from its content before
//! its parent scope runs.

use std::fmt;

use tracing::debug;

use crate::diagram::{BpmnDocument, build_diagram};
use crate::errors::LayoutError;
use crate::geometry::Bounds;
use crate::layered::{FirstPassLayout, LayeredLayout};
use crate::layout::{FlowScope, LayoutOptions, ScopeNode, boundary, compact, edge_fix, normalize, propagate};
use crate::model::{BpmnGraph, Node, NodeKind, SpacingHints};
use crate::solver::{Axis, ConstraintOptions, LayoutSolver, generate_bpmn_constraints};

/// States of a layout job. Errors short-circuit to [`Stage::Failed`] with
/// the failing stage recorded on the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Input,
    Sized,
    Layered,
    BoundaryFixed,
    GatewaysPropagated,
    Normalized,
    EdgesFixed,
    Compacted,
    Folded,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Sized => "sized",
            Stage::Layered => "layered",
            Stage::BoundaryFixed => "boundary-fixed",
            Stage::GatewaysPropagated => "gateways-propagated",
            Stage::Normalized => "normalized",
            Stage::EdgesFixed => "edges-fixed",
            Stage::Compacted => "compacted",
            Stage::Folded => "folded",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the monotone progress of one layout run.
#[derive(Debug)]
struct LayoutJob {
    state: Stage,
}

impl LayoutJob {
    fn new() -> Self {
        Self {
            state: Stage::Input,
        }
    }

    /// Advances forward only; nested containers re-announce earlier stages
    /// without rewinding the job.
    fn advance(&mut self, next: Stage) {
        if next > self.state {
            debug!(from = %self.state, to = %next, "pipeline stage");
            self.state = next;
        }
    }

    fn fail(&mut self) {
        self.state = Stage::Failed;
    }
}

/// Drives the stages over one graph. The default configuration uses the
/// built-in layered layout and default [`LayoutOptions`].
pub struct Pipeline {
    options: LayoutOptions,
    first_pass: Box<dyn FirstPassLayout>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            first_pass: Box::new(LayeredLayout),
        }
    }

    /// Replaces the layered-layout collaborator.
    #[must_use]
    pub fn with_first_pass(mut self, first_pass: Box<dyn FirstPassLayout>) -> Self {
        self.first_pass = first_pass;
        self
    }

    /// Lays out the graph and assembles the diagram document.
    pub fn to_bpmn(&self, mut graph: BpmnGraph) -> Result<BpmnDocument, LayoutError> {
        let mut job = LayoutJob::new();
        let result = self.run(&mut graph, &mut job);
        if let Err(error) = result {
            job.fail();
            return Err(error);
        }

        job.advance(Stage::Folded);
        let document = build_diagram(graph, &self.options);
        job.advance(Stage::Done);
        Ok(document)
    }

    fn run(&self, graph: &mut BpmnGraph, job: &mut LayoutJob) -> Result<(), LayoutError> {
        graph.validate()?;
        graph.apply_default_sizes();
        job.advance(Stage::Sized);

        let spacing = graph.spacing;
        let is_collaboration = graph.is_collaboration();
        for child in &mut graph.children {
            self.layout_container(child, &spacing, false, job)?;
        }

        if is_collaboration {
            stack_pools(graph, &self.options);
        }
        Ok(())
    }

    /// Recursive bottom-up container layout. `in_pool` distinguishes a
    /// process nested in a participant (an offsetting container) from a
    /// top-level process, whose children live in the global frame.
    fn layout_container(
        &self,
        node: &mut Node,
        spacing: &SpacingHints,
        in_pool: bool,
        job: &mut LayoutJob,
    ) -> Result<(), LayoutError> {
        match node.kind {
            NodeKind::Participant => self.layout_participant(node, spacing, job),
            NodeKind::Process => self.layout_flow_container(node, spacing, in_pool, job),
            NodeKind::Lane => self.layout_flow_container(node, spacing, true, job),
            NodeKind::SubProcess if node.is_expanded => {
                self.layout_flow_container(node, spacing, true, job)?;
                node.width = node.width.max(300.0);
                node.height = node.height.max(200.0);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn layout_participant(
        &self,
        pool: &mut Node,
        spacing: &SpacingHints,
        job: &mut LayoutJob,
    ) -> Result<(), LayoutError> {
        let lanes: Vec<usize> = pool
            .children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.kind == NodeKind::Lane)
            .map(|(i, _)| i)
            .collect();

        if pool.children.len() == 1 && pool.children[0].kind == NodeKind::Process {
            let process = &mut pool.children[0];
            self.layout_flow_container(process, spacing, true, job)?;
            process.x = Some(0.0);
            process.y = Some(0.0);
            pool.width = process.width;
            pool.height = process.height;
            return Ok(());
        }

        if !lanes.is_empty() {
            // Lanes stack vertically and stretch to the widest one.
            let mut cursor = 0.0;
            let mut max_width: f64 = 0.0;
            for index in lanes {
                let lane = &mut pool.children[index];
                self.layout_container(lane, spacing, true, job)?;
                lane.x = Some(0.0);
                lane.y = Some(cursor);
                cursor += lane.height;
                max_width = max_width.max(lane.width);
            }
            for lane in &mut pool.children {
                if lane.kind == NodeKind::Lane {
                    lane.width = max_width;
                }
            }
            pool.width = max_width;
            pool.height = cursor;
            return Ok(());
        }

        // A pool holding flow nodes directly behaves like a process.
        self.layout_flow_container(pool, spacing, true, job)
    }

    fn layout_flow_container(
        &self,
        container: &mut Node,
        spacing: &SpacingHints,
        offsetting: bool,
        job: &mut LayoutJob,
    ) -> Result<(), LayoutError> {
        // Nested containers first, so their sizes are known.
        for child in &mut container.children {
            self.layout_container(child, spacing, true, job)?;
        }

        let mut scope = extract_scope(container);
        if scope.nodes.is_empty() {
            return Ok(());
        }
        if self.options.debug {
            debug!(
                container = %container.id,
                nodes = scope.nodes.len(),
                edges = scope.edges.len(),
                boundary_events = scope.boundary_events.len(),
                "laying out container"
            );
        }

        let preserve = scope.nodes.values().all(|n| n.bounds.width > 0.0)
            && container.children.iter().all(|c| {
                !c.kind.is_flow_node() || (c.x.is_some() && c.y.is_some())
            })
            && !scope.edges.is_empty()
            && scope.edges.iter().all(|e| e.absolute_coords);

        if !preserve {
            self.first_pass.arrange(&mut scope, spacing);
            job.advance(Stage::Layered);
            check_positions(&scope, Stage::Layered)?;

            let boundary_result = boundary::process_boundary_events(&mut scope, &self.options);
            job.advance(Stage::BoundaryFixed);

            propagate::propagate_gateway_shift(&mut scope, &boundary_result.converging_gateways);
            job.advance(Stage::GatewaysPropagated);

            normalize::normalize_main_flow(&mut scope, &boundary_result.converging_gateways);
            job.advance(Stage::Normalized);

            edge_fix::fix_edges(&mut scope);
            job.advance(Stage::EdgesFixed);

            if self.options.compaction {
                if self.options.dependency_compaction {
                    compact::compact_with_dependencies(&mut scope, self.options.horizontal_gap);
                } else {
                    compact::compact(&mut scope, Axis::X, self.options.horizontal_gap);
                }
                edge_fix::fix_edges(&mut scope);
            }
            job.advance(Stage::Compacted);

            if self.options.solver_refinement {
                refine_with_solver(&mut scope, &self.options);
                edge_fix::fix_edges(&mut scope);
            }

            // Offsetting containers inset their content by the padding; the
            // top-level process keeps the coordinates the stages produced.
            if offsetting {
                normalize_origin(&mut scope, self.options.container_padding);
            }
        }

        write_back(container, scope);
        size_container(container, self.options.container_padding);
        Ok(())
    }
}

/// Builds the working scope from a container's direct flow children.
fn extract_scope(container: &Node) -> FlowScope {
    let mut scope = FlowScope::default();
    for child in &container.children {
        let placeable = child.kind.is_flow_node()
            || matches!(
                child.kind,
                NodeKind::DataObjectReference
                    | NodeKind::DataStoreReference
                    | NodeKind::TextAnnotation
            );
        if !placeable {
            continue;
        }
        // An ioSpecification host claims extra layout height for the data
        // stacks rendered below it; the rendered height stays the visual one.
        let mut height = child.height;
        let mut visual_height = child.visual_height;
        if let Some(spec) = &child.io_specification {
            let stack = spec.stack_height();
            if stack > 0.0 {
                visual_height = Some(child.height);
                height = child.height + stack;
            }
        }
        scope.nodes.insert(
            child.id.clone(),
            ScopeNode {
                id: child.id.clone(),
                kind: child.kind,
                bounds: Bounds::new(
                    child.x.unwrap_or(0.0),
                    child.y.unwrap_or(0.0),
                    child.width,
                    height,
                ),
                visual_height,
            },
        );
        scope.boundary_events.extend(child.boundary_events.iter().cloned());
    }
    scope.edges = container.edges.clone();
    scope
}

/// Writes scope positions and routed edges back onto the tree.
fn write_back(container: &mut Node, scope: FlowScope) {
    for child in &mut container.children {
        if let Some(placed) = scope.nodes.get(child.id.as_str()) {
            child.x = Some(placed.bounds.x);
            child.y = Some(placed.bounds.y);
            child.height = placed.bounds.height;
            child.visual_height = placed.visual_height;
        }
        for be in &mut child.boundary_events {
            if let Some(placed) = scope.boundary_events.iter().find(|b| b.id == be.id) {
                be.x = placed.x;
                be.y = placed.y;
            }
        }
    }
    container.edges = scope.edges;
}

/// Translates the scope so its content starts at the container padding.
fn normalize_origin(scope: &mut FlowScope, padding: f64) {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    for node in scope.nodes.values() {
        min_x = min_x.min(node.bounds.x);
        min_y = min_y.min(node.bounds.y);
    }
    for be in &scope.boundary_events {
        if let Some(bounds) = be.bounds() {
            min_x = min_x.min(bounds.x);
            min_y = min_y.min(bounds.y);
        }
    }
    if !min_x.is_finite() {
        return;
    }
    let dx = padding - min_x;
    let dy = padding - min_y;
    let ids: Vec<String> = scope.nodes.keys().cloned().collect();
    for id in ids {
        scope.translate_node(&id, dx, dy);
    }
    for edge in &mut scope.edges {
        if let Some(section) = edge.section.as_mut() {
            section.translate(dx, dy);
        }
    }
}

/// Grows the container to enclose its placed content plus padding.
fn size_container(container: &mut Node, padding: f64) {
    let mut max_x: f64 = 0.0;
    let mut max_y: f64 = 0.0;
    for child in &container.children {
        if let Some(bounds) = child.bounds() {
            max_x = max_x.max(bounds.right());
            max_y = max_y.max(bounds.bottom());
        }
        for be in &child.boundary_events {
            if let Some(bounds) = be.bounds() {
                max_x = max_x.max(bounds.right());
                max_y = max_y.max(bounds.bottom());
            }
        }
    }
    if max_x > 0.0 {
        container.width = container.width.max(max_x + padding);
        container.height = container.height.max(max_y + padding);
    }
}

/// Stacks collaboration pools vertically.
fn stack_pools(graph: &mut BpmnGraph, options: &LayoutOptions) {
    let mut cursor = 0.0;
    for child in &mut graph.children {
        if child.kind != NodeKind::Participant {
            continue;
        }
        child.x = Some(0.0);
        child.y = Some(cursor);
        cursor += child.height + options.vertical_gap * 2.0;
    }
}

/// Post-stage assertion: every flow node must have usable coordinates.
fn check_positions(scope: &FlowScope, stage: Stage) -> Result<(), LayoutError> {
    for node in scope.nodes.values() {
        if !node.bounds.x.is_finite() || !node.bounds.y.is_finite() {
            return Err(LayoutError::invariant(
                stage,
                format!("node {} has no coordinates", node.id),
            ));
        }
    }
    Ok(())
}

/// Optional C2 refinement: the canonical constraint set re-solved over the
/// current positions. Non-convergence keeps the stage results.
fn refine_with_solver(scope: &mut FlowScope, options: &LayoutOptions) {
    let mut solver = LayoutSolver::new();
    for node in scope.nodes.values() {
        solver.register_node(
            node.id.clone(),
            node.bounds.width,
            node.bounds.height,
            node.bounds.x,
            node.bounds.y,
        );
    }
    let boundary_targets: Vec<(String, String)> = scope
        .boundary_events
        .iter()
        .flat_map(|be| {
            let host = be.attached_to.clone();
            scope
                .outgoing(&be.id)
                .map(move |edge| (host.clone(), edge.target.clone()))
                .collect::<Vec<_>>()
        })
        .collect();
    let constraints = generate_bpmn_constraints(
        &scope.edges,
        &boundary_targets,
        &[],
        &ConstraintOptions {
            horizontal_gap: options.horizontal_gap,
            boundary_event_gap: options.boundary_event_gap,
        },
    );
    for constraint in constraints {
        solver.add_constraint(constraint);
    }
    let outcome = solver.solve();
    if !outcome.converged {
        return;
    }
    for (id, (x, y)) in outcome.positions {
        let Some(bounds) = scope.bounds(&id) else {
            continue;
        };
        let dx = x - bounds.x;
        let dy = y - bounds.y;
        if dx.abs() > f64::EPSILON || dy.abs() > f64::EPSILON {
            scope.translate_node(&id, dx, dy);
        }
    }
}
