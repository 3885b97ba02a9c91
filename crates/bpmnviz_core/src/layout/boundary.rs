//! Post-processing of boundary events and their branches.
//!
//! Runs after the first-pass layered layout. Boundary events are pinned to
//! their host's bottom edge, each branch is classified by where it ends up,
//! branch targets are stacked into Y layers below the hosts, downstream
//! nodes propagate rightward, converging gateways clear their incoming
//! sources, and every touched edge is rerouted with obstacle avoidance.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::geometry::{Bounds, Point, Side};
use crate::layout::edge_fix::{ensure_perpendicular_endpoints, reroute_edge};
use crate::layout::pathfind::collapse_collinear;
use crate::layout::tree::{TreeNode, layout_boundary_branch};
use crate::layout::{FlowScope, LayoutOptions};
use crate::model::Section;
use crate::model::node::{BOUNDARY_EVENT_SIZE, NodeKind};

/// Horizontal gap between a host and a merging branch target.
const MERGE_TARGET_GAP: f64 = 30.0;

/// Rightward bias applied to targets of branches that end in an end event.
const END_TARGET_BIAS: f64 = 20.0;

/// Gap between consecutive nodes of a propagated branch chain.
const CHAIN_GAP: f64 = 20.0;

/// Clearance a converging gateway keeps from its incoming sources.
const CONVERGING_CLEARANCE: f64 = 50.0;

/// Vertical layer a branch is assigned to, by destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DestinationClass {
    /// The branch rejoins the main flow at a merge point.
    MergeToMain,
    /// The branch terminates in an end event of its own.
    ToEndEvent,
    /// The branch peters out without reaching an end event.
    DeadEnd,
}

/// Facts collected per boundary event before any moves happen.
#[derive(Debug, Clone)]
pub struct BoundaryEventInfo {
    pub event_id: String,
    pub attached_to: String,
    /// Targets of the event's outgoing sequence flows, in order.
    pub targets: Vec<String>,
    /// Index of the event among its host's boundary events.
    pub boundary_index: usize,
    pub total_boundaries: usize,
}

/// Bounding box of an already placed branch, kept for collision checks.
#[derive(Debug, Clone, Copy)]
pub struct PlacedBranch {
    pub bbox: Bounds,
    pub class: DestinationClass,
}

/// A pending vertical (and optional horizontal) move for one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeMoveInfo {
    pub new_x: Option<f64>,
    pub new_y: f64,
    /// Applied Δy, recorded for waypoint adjustment.
    pub offset: f64,
}

/// What the stage did, consumed by the propagation and normalization stages.
#[derive(Debug, Default)]
pub struct BoundaryResult {
    /// Every node the stage moved.
    pub moved: IndexSet<String>,
    /// Converging gateways that receive at least one boundary branch.
    pub converging_gateways: Vec<String>,
}

/// Nodes reachable from the start events along sequence flows, boundary
/// branches excluded. Nodes with no incoming at all count as entry points.
#[must_use]
pub fn main_flow_nodes(scope: &FlowScope) -> IndexSet<String> {
    let mut roots: Vec<String> = Vec::new();
    for node in scope.nodes.values() {
        let is_start = node.kind == NodeKind::StartEvent;
        let has_incoming = scope.incoming(&node.id).next().is_some();
        if is_start || !has_incoming {
            roots.push(node.id.clone());
        }
    }

    let mut reached: IndexSet<String> = IndexSet::new();
    let mut queue: Vec<String> = roots;
    while let Some(id) = queue.pop() {
        if !reached.insert(id.clone()) {
            continue;
        }
        for edge in scope.outgoing(&id) {
            if scope.is_boundary_event(&edge.source) {
                continue;
            }
            if scope.nodes.contains_key(edge.target.as_str()) {
                queue.push(edge.target.clone());
            }
        }
    }
    reached
}

/// Phase A: collects [`BoundaryEventInfo`] records and pins every boundary
/// event onto its host's bottom edge, evenly spaced.
pub fn collect_boundary_info(scope: &mut FlowScope) -> Vec<BoundaryEventInfo> {
    let mut infos = Vec::new();
    let host_ids: Vec<String> = scope.nodes.keys().cloned().collect();
    for host_id in host_ids {
        let Some(host) = scope.bounds(&host_id) else {
            continue;
        };
        let events: Vec<String> = scope
            .boundary_events
            .iter()
            .filter(|be| be.attached_to == host_id)
            .map(|be| be.id.clone())
            .collect();
        let total = events.len();
        for (index, event_id) in events.iter().enumerate() {
            // Boundary i of N sits at W·(i+1)/(N+1) along the bottom edge,
            // centered on the edge line.
            let frac = (index + 1) as f64 / (total + 1) as f64;
            let x = host.x + host.width * frac - BOUNDARY_EVENT_SIZE / 2.0;
            let y = host.bottom() - BOUNDARY_EVENT_SIZE / 2.0;
            if let Some(be) = scope
                .boundary_events
                .iter_mut()
                .find(|be| be.id == *event_id)
            {
                be.x = Some(x);
                be.y = Some(y);
            }

            let targets: Vec<String> = scope
                .outgoing(event_id)
                .map(|edge| edge.target.clone())
                .collect();
            infos.push(BoundaryEventInfo {
                event_id: event_id.clone(),
                attached_to: host_id.clone(),
                targets,
                boundary_index: index,
                total_boundaries: total,
            });
        }
    }
    infos
}

/// Phase B: traces forward from the branch's first target and classifies
/// where the branch ends up.
#[must_use]
pub fn classify_branch(
    scope: &FlowScope,
    info: &BoundaryEventInfo,
    main_flow: &IndexSet<String>,
) -> DestinationClass {
    let Some(first) = info.targets.first() else {
        return DestinationClass::DeadEnd;
    };

    let mut visited: IndexSet<String> = IndexSet::new();
    let mut queue = vec![first.clone()];
    let mut merges = false;
    let mut reaches_end = false;
    while let Some(id) = queue.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if main_flow.contains(id.as_str()) {
            merges = true;
            continue;
        }
        if let Some(node) = scope.nodes.get(id.as_str()) {
            if node.kind == NodeKind::EndEvent {
                reaches_end = true;
            }
        }
        for edge in scope.outgoing(&id) {
            queue.push(edge.target.clone());
        }
    }

    if merges {
        DestinationClass::MergeToMain
    } else if reaches_end {
        DestinationClass::ToEndEvent
    } else {
        DestinationClass::DeadEnd
    }
}

/// The branch chain: the first target plus its downstream nodes up to (and
/// excluding) any merge point.
fn branch_chain(scope: &FlowScope, first: &str, main_flow: &IndexSet<String>) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    let mut queue: std::collections::VecDeque<String> =
        std::collections::VecDeque::from([first.to_owned()]);
    while let Some(id) = queue.pop_front() {
        if chain.contains(&id) || main_flow.contains(id.as_str()) {
            continue;
        }
        if !scope.nodes.contains_key(id.as_str()) {
            continue;
        }
        chain.push(id.clone());
        for edge in scope.outgoing(&id) {
            queue.push_back(edge.target.clone());
        }
    }
    chain
}

fn chain_is_tree_with_branching(scope: &FlowScope, chain: &[String]) -> bool {
    chain.iter().any(|id| {
        scope
            .outgoing(id)
            .filter(|edge| chain.contains(&edge.target))
            .count()
            >= 2
    })
}

fn build_tree(scope: &FlowScope, root: &str, chain: &[String]) -> TreeNode {
    let bounds = scope.bounds(root).unwrap_or_default();
    let children = scope
        .outgoing(root)
        .filter(|edge| chain.contains(&edge.target) && edge.target != root)
        .map(|edge| build_tree(scope, &edge.target, chain))
        .collect();
    TreeNode {
        id: root.to_owned(),
        width: bounds.width,
        height: bounds.height,
        children,
    }
}

/// Simulated or committed placement of one branch. Returns the branch AABB.
fn place_chain(
    scope: &mut FlowScope,
    info: &BoundaryEventInfo,
    class: DestinationClass,
    chain: &[String],
    layer_y: f64,
    commit: bool,
    moved: &mut IndexSet<String>,
) -> Bounds {
    let host = scope.bounds(&info.attached_to).unwrap_or_default();
    let be_x = scope
        .boundary_events
        .iter()
        .find(|be| be.id == info.event_id)
        .and_then(|be| be.x)
        .unwrap_or(host.x);

    let Some(first) = chain.first() else {
        return Bounds::new(be_x, layer_y, 0.0, 0.0);
    };

    let target_x = match class {
        DestinationClass::MergeToMain => host.right() + MERGE_TARGET_GAP,
        DestinationClass::ToEndEvent => be_x + END_TARGET_BIAS,
        DestinationClass::DeadEnd => be_x,
    };

    let mut moves: IndexMap<String, NodeMoveInfo> = IndexMap::new();

    if class == DestinationClass::DeadEnd && chain_is_tree_with_branching(scope, chain) {
        // Branching dead-ends hang as a tidy tree under the boundary event.
        let be_bounds = Bounds::new(be_x, layer_y, BOUNDARY_EVENT_SIZE, BOUNDARY_EVENT_SIZE);
        let tree = build_tree(scope, first, chain);
        let positions = layout_boundary_branch(&tree, &be_bounds, 0.0, 50.0, 40.0);
        for (id, position) in positions {
            let old_y = scope.bounds(&id).map_or(0.0, |b| b.y);
            moves.insert(
                id,
                NodeMoveInfo {
                    new_x: Some(position.x),
                    new_y: position.y,
                    offset: position.y - old_y,
                },
            );
        }
    } else {
        let first_bounds = scope.bounds(first).unwrap_or_default();
        moves.insert(
            first.clone(),
            NodeMoveInfo {
                new_x: Some(target_x),
                new_y: layer_y,
                offset: layer_y - first_bounds.y,
            },
        );

        // Breadth-first rightward propagation; revisits may only push a node
        // further right.
        let mut queue: std::collections::VecDeque<String> =
            std::collections::VecDeque::from([first.clone()]);
        while let Some(id) = queue.pop_front() {
            let source_move = moves[id.as_str()];
            let source_bounds = scope.bounds(&id).unwrap_or_default();
            let source_x = source_move.new_x.unwrap_or(source_bounds.x);
            let source_y = source_move.new_y;
            let targets: Vec<String> = scope
                .outgoing(&id)
                .map(|edge| edge.target.clone())
                .filter(|t| chain.contains(t) && t != &id)
                .collect();
            for target in targets {
                let target_bounds = scope.bounds(&target).unwrap_or_default();
                let candidate_x = source_x + source_bounds.width + CHAIN_GAP;
                let candidate_y =
                    source_y + (source_bounds.height - target_bounds.height) / 2.0;
                match moves.get_mut(target.as_str()) {
                    Some(existing) => {
                        if candidate_x > existing.new_x.unwrap_or(f64::NEG_INFINITY) {
                            existing.new_x = Some(candidate_x);
                            queue.push_back(target.clone());
                        }
                    }
                    None => {
                        moves.insert(
                            target.clone(),
                            NodeMoveInfo {
                                new_x: Some(candidate_x),
                                new_y: candidate_y,
                                offset: candidate_y - target_bounds.y,
                            },
                        );
                        queue.push_back(target.clone());
                    }
                }
            }
        }
    }

    let mut bbox: Option<Bounds> = None;
    for (id, move_info) in &moves {
        let old = scope.bounds(id).unwrap_or_default();
        let placed = Bounds::new(
            move_info.new_x.unwrap_or(old.x),
            move_info.new_y,
            old.width,
            old.height,
        );
        bbox = Some(match bbox {
            Some(b) => b.union(&placed),
            None => placed,
        });
        if commit {
            if let Some(node) = scope.nodes.get_mut(id.as_str()) {
                node.bounds.x = placed.x;
                node.bounds.y = placed.y;
            }
            moved.insert(id.clone());
        }
    }
    bbox.unwrap_or(Bounds::new(be_x, layer_y, 0.0, 0.0))
}

/// Runs phases A through F over one scope.
pub fn process_boundary_events(scope: &mut FlowScope, options: &LayoutOptions) -> BoundaryResult {
    let mut result = BoundaryResult::default();
    let infos = collect_boundary_info(scope);
    if infos.is_empty() {
        return result;
    }

    let main_flow = main_flow_nodes(scope);

    // Layer bases hang off the lowest host bottom.
    let hosts_bottom = infos
        .iter()
        .filter_map(|info| scope.bounds(&info.attached_to))
        .map(|b| b.bottom())
        .fold(f64::NEG_INFINITY, f64::max);
    let merge_base = hosts_bottom + options.merge_layer_gap;
    let end_base = merge_base + options.end_layer_gap;
    let dead_base = end_base + options.dead_end_layer_gap;

    // Stable order: destination class, then boundary event X, then index.
    let mut ordered: Vec<(DestinationClass, f64, usize, BoundaryEventInfo)> = infos
        .into_iter()
        .map(|info| {
            let class = classify_branch(scope, &info, &main_flow);
            let be_x = scope
                .boundary_events
                .iter()
                .find(|be| be.id == info.event_id)
                .and_then(|be| be.x)
                .unwrap_or(0.0);
            (class, be_x, info.boundary_index, info)
        })
        .collect();
    ordered.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.2.cmp(&b.2))
    });

    let mut placed: Vec<PlacedBranch> = Vec::new();
    for (class, _, _, info) in &ordered {
        let Some(first) = info.targets.first() else {
            continue;
        };
        let chain = branch_chain(scope, first, &main_flow);
        if chain.is_empty() {
            continue;
        }

        let base = match class {
            DestinationClass::MergeToMain => merge_base,
            DestinationClass::ToEndEvent => end_base,
            DestinationClass::DeadEnd => dead_base,
        };

        // Greedy collision resolution against the branches already placed.
        let trial = place_chain(scope, info, *class, &chain, base, false, &mut result.moved);
        let collides = placed
            .iter()
            .any(|p| p.bbox.overlaps_with_margin(&trial, options.branch_inflate));
        let layer_y = if collides {
            let max_y = placed
                .iter()
                .map(|p| p.bbox.bottom())
                .fold(f64::NEG_INFINITY, f64::max);
            max_y + options.branch_push_gap
        } else {
            base
        };

        debug!(
            event = %info.event_id,
            ?class,
            layer_y,
            "placing boundary branch"
        );
        let bbox = place_chain(scope, info, *class, &chain, layer_y, true, &mut result.moved);
        placed.push(PlacedBranch { bbox, class: *class });
    }

    reposition_converging_gateways(scope, &main_flow, &mut result);
    recalculate_edges(scope, &ordered, &result);
    result
}

/// Phase E: pushes every converging gateway past the right edge of all of
/// its incoming sources. Gateways are never moved leftward.
fn reposition_converging_gateways(
    scope: &mut FlowScope,
    main_flow: &IndexSet<String>,
    result: &mut BoundaryResult,
) {
    let ids: Vec<String> = scope.nodes.keys().cloned().collect();
    for id in ids {
        let sources: Vec<String> = scope.incoming(&id).map(|e| e.source.clone()).collect();
        if sources.len() < 2 {
            continue;
        }
        let from_branch = sources.iter().any(|s| {
            result.moved.contains(s.as_str()) || scope.is_boundary_event(s)
        });
        let from_main = sources
            .iter()
            .any(|s| main_flow.contains(s.as_str()) && !result.moved.contains(s.as_str()));
        if !from_branch || !from_main {
            continue;
        }

        let max_right = sources
            .iter()
            .filter_map(|s| scope.element_bounds(s))
            .map(|b| b.right())
            .fold(f64::NEG_INFINITY, f64::max);
        let new_x = max_right + CONVERGING_CLEARANCE;
        let current = scope.bounds(&id).unwrap_or_default();
        if new_x > current.x {
            scope.translate_node(&id, new_x - current.x, 0.0);
            result.moved.insert(id.clone());
        }
        result.converging_gateways.push(id);
    }
}

/// Phase F: reroutes every edge with a moved endpoint or a boundary-event
/// source, using the moved nodes and the hosts as obstacles.
fn recalculate_edges(
    scope: &mut FlowScope,
    ordered: &[(DestinationClass, f64, usize, BoundaryEventInfo)],
    result: &BoundaryResult,
) {
    let hosts: IndexSet<&str> = ordered
        .iter()
        .map(|(_, _, _, info)| info.attached_to.as_str())
        .collect();

    for index in 0..scope.edges.len() {
        let edge = scope.edges[index].clone();
        let from_boundary = scope.is_boundary_event(&edge.source);
        let touched = from_boundary
            || result.moved.contains(edge.source.as_str())
            || result.moved.contains(edge.target.as_str());
        if !touched {
            continue;
        }
        let (Some(source), Some(target)) = (
            scope.element_bounds(&edge.source),
            scope.element_bounds(&edge.target),
        ) else {
            continue;
        };

        let mut points = if from_boundary {
            // Leave through the boundary event's bottom, then run into the
            // target's left side.
            let start = source.connection_point(Side::Bottom);
            let entry = target.connection_point(Side::Left);
            if (start.x - entry.x).abs() < crate::geometry::ORTHO_EPS {
                vec![start, entry]
            } else {
                vec![start, Point::new(start.x, entry.y), entry]
            }
        } else {
            let obstacles: Vec<Bounds> = scope
                .nodes
                .values()
                .filter(|node| {
                    node.id != edge.source
                        && node.id != edge.target
                        && (result.moved.contains(node.id.as_str())
                            || hosts.contains(node.id.as_str()))
                })
                .map(|node| node.bounds)
                .collect();
            reroute_edge(&source, &target, &obstacles)
        };

        let source_diamond = scope
            .nodes
            .get(edge.source.as_str())
            .is_some_and(|n| n.kind.is_gateway());
        let target_diamond = scope
            .nodes
            .get(edge.target.as_str())
            .is_some_and(|n| n.kind.is_gateway());
        ensure_perpendicular_endpoints(
            &mut points,
            &source,
            &target,
            source_diamond,
            target_diamond,
        );
        scope.edges[index].section = Some(Section::from_points(&collapse_collinear(&points)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ScopeNode;
    use crate::model::{BoundaryEvent, Edge, EventDefinitionKind};

    fn node(id: &str, kind: NodeKind, x: f64, y: f64) -> ScopeNode {
        let (w, h) = kind.default_size(false);
        ScopeNode {
            id: id.into(),
            kind,
            bounds: Bounds::new(x, y, w, h),
            visual_height: None,
        }
    }

    fn boundary(id: &str, host: &str) -> BoundaryEvent {
        BoundaryEvent {
            id: id.into(),
            attached_to: host.into(),
            name: None,
            event_definition: EventDefinitionKind::Timer,
            interrupting: true,
            timer_definition: None,
            x: None,
            y: None,
        }
    }

    /// task_long (with timer boundary → task_escalate → end_esc), main flow
    /// task_long → end_ok.
    fn timer_scope() -> FlowScope {
        let mut scope = FlowScope::default();
        for n in [
            node("start_1", NodeKind::StartEvent, 0.0, 22.0),
            node("task_long", NodeKind::Task, 96.0, 0.0),
            node("end_ok", NodeKind::EndEvent, 256.0, 22.0),
            node("task_escalate", NodeKind::Task, 96.0, 140.0),
            node("end_esc", NodeKind::EndEvent, 256.0, 162.0),
        ] {
            scope.nodes.insert(n.id.clone(), n);
        }
        scope.boundary_events.push(boundary("boundary_timer_1", "task_long"));
        scope.edges = vec![
            Edge::sequence_flow("f1", "start_1", "task_long"),
            Edge::sequence_flow("f2", "task_long", "end_ok"),
            Edge::sequence_flow("f3", "boundary_timer_1", "task_escalate"),
            Edge::sequence_flow("f4", "task_escalate", "end_esc"),
        ];
        scope
    }

    #[test]
    fn test_boundary_event_centered_on_host_bottom() {
        let mut scope = timer_scope();
        collect_boundary_info(&mut scope);
        let host = scope.bounds("task_long").unwrap();
        let be = scope.boundary_events[0].bounds().unwrap();
        // Single boundary: centered horizontally, straddling the bottom edge.
        assert!((be.center().x - host.center().x).abs() < 0.5);
        assert!((be.center().y - host.bottom()).abs() < 0.5);
    }

    #[test]
    fn test_branch_ending_in_own_end_event_is_to_end() {
        let mut scope = timer_scope();
        let infos = collect_boundary_info(&mut scope);
        let main = main_flow_nodes(&scope);
        assert_eq!(
            classify_branch(&scope, &infos[0], &main),
            DestinationClass::ToEndEvent
        );
    }

    #[test]
    fn test_branch_target_lands_in_its_layer() {
        let mut scope = timer_scope();
        let options = LayoutOptions::default();
        process_boundary_events(&mut scope, &options);
        let host = scope.bounds("task_long").unwrap();
        let target = scope.bounds("task_escalate").unwrap();
        let be = scope.boundary_events[0].bounds().unwrap();
        // TO_END layer: host bottom + merge layer gap + end layer gap.
        let expected_y = host.bottom() + options.merge_layer_gap + options.end_layer_gap;
        assert!((target.y - expected_y).abs() < 0.5);
        assert!((target.x - (be.x + END_TARGET_BIAS)).abs() < 0.5);
    }

    #[test]
    fn test_downstream_chain_propagates_rightward() {
        let mut scope = timer_scope();
        process_boundary_events(&mut scope, &LayoutOptions::default());
        let target = scope.bounds("task_escalate").unwrap();
        let end = scope.bounds("end_esc").unwrap();
        assert!((end.x - (target.right() + CHAIN_GAP)).abs() < 0.5);
        // Vertically centered on its predecessor.
        assert!((end.center().y - target.center().y).abs() < 0.5);
    }

    #[test]
    fn test_boundary_edge_leaves_bottom_enters_left() {
        let mut scope = timer_scope();
        process_boundary_events(&mut scope, &LayoutOptions::default());
        let section = scope
            .edges
            .iter()
            .find(|e| e.id == "f3")
            .and_then(|e| e.section.clone())
            .unwrap();
        let points = section.points();
        let be = scope.boundary_events[0].bounds().unwrap();
        let target = scope.bounds("task_escalate").unwrap();
        assert!((points[0].y - be.bottom()).abs() < 0.5);
        let last = points[points.len() - 1];
        assert!((last.x - target.x).abs() < 0.5);
    }

    /// Converging gateway: task_a → gw_join on the main flow, boundary
    /// branch task_comp → gw_join.
    fn converging_scope() -> FlowScope {
        let mut scope = FlowScope::default();
        for n in [
            node("start_1", NodeKind::StartEvent, 0.0, 22.0),
            node("task_a", NodeKind::Task, 96.0, 0.0),
            node("gw_join", NodeKind::ExclusiveGateway, 256.0, 15.0),
            node("end_1", NodeKind::EndEvent, 366.0, 22.0),
            node("task_comp", NodeKind::Task, 96.0, 140.0),
        ] {
            scope.nodes.insert(n.id.clone(), n);
        }
        scope.boundary_events.push(boundary("boundary_err", "task_a"));
        scope.edges = vec![
            Edge::sequence_flow("f1", "start_1", "task_a"),
            Edge::sequence_flow("f2", "task_a", "gw_join"),
            Edge::sequence_flow("f3", "boundary_err", "task_comp"),
            Edge::sequence_flow("f4", "task_comp", "gw_join"),
            Edge::sequence_flow("f5", "gw_join", "end_1"),
        ];
        scope
    }

    #[test]
    fn test_merging_branch_classified_and_placed() {
        let mut scope = converging_scope();
        let options = LayoutOptions::default();
        let infos = collect_boundary_info(&mut scope);
        let main = main_flow_nodes(&scope);
        assert_eq!(
            classify_branch(&scope, &infos[0], &main),
            DestinationClass::MergeToMain
        );
        process_boundary_events(&mut scope, &options);
        let host = scope.bounds("task_a").unwrap();
        let target = scope.bounds("task_comp").unwrap();
        assert!((target.x - (host.right() + MERGE_TARGET_GAP)).abs() < 0.5);
        assert!((target.y - (host.bottom() + options.merge_layer_gap)).abs() < 0.5);
    }

    #[test]
    fn test_converging_gateway_clears_incoming_sources() {
        let mut scope = converging_scope();
        let result = process_boundary_events(&mut scope, &LayoutOptions::default());
        assert!(result.converging_gateways.contains(&"gw_join".to_owned()));
        let gw = scope.bounds("gw_join").unwrap();
        let task_a = scope.bounds("task_a").unwrap();
        let task_comp = scope.bounds("task_comp").unwrap();
        let max_right = task_a.right().max(task_comp.right());
        assert!(gw.x >= max_right + CONVERGING_CLEARANCE - 0.5);
    }

    #[test]
    fn test_merge_point_is_never_moved_by_placement() {
        let mut scope = converging_scope();
        let before = scope.bounds("gw_join").unwrap();
        let infos = collect_boundary_info(&mut scope);
        let main = main_flow_nodes(&scope);
        let chain = branch_chain(&scope, &infos[0].targets[0], &main);
        assert_eq!(chain, vec!["task_comp".to_owned()]);
        // gw_join sits on the main flow, so the chain stops before it.
        assert!(main.contains("gw_join"));
        assert_eq!(scope.bounds("gw_join").unwrap(), before);
    }
}
