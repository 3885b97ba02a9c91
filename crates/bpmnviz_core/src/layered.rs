//! First-pass layered layout.
//!
//! The pipeline treats the layered algorithm as a collaborator behind the
//! [`FirstPassLayout`] seam: all it requires is that every flow node gains a
//! position and every sequence flow a first waypoint section. The built-in
//! implementation ranks nodes left to right along sequence flows, orders
//! each rank by the barycenter of its predecessors, and centers ranks
//! vertically so single-row flows share a common centerline.

use indexmap::IndexMap;

use crate::geometry::l_path;
use crate::layout::FlowScope;
use crate::model::{Section, SpacingHints};

/// Seam for the layered-layout collaborator.
pub trait FirstPassLayout {
    /// Assigns first-pass coordinates and initial edge sections.
    fn arrange(&self, scope: &mut FlowScope, spacing: &SpacingHints);
}

/// Built-in Sugiyama-style layering.
#[derive(Debug, Default)]
pub struct LayeredLayout;

impl FirstPassLayout for LayeredLayout {
    fn arrange(&self, scope: &mut FlowScope, spacing: &SpacingHints) {
        let ranks = assign_ranks(scope);
        let order = order_ranks(scope, &ranks);
        assign_coordinates(scope, &order, spacing);
        route_initial_edges(scope);
    }
}

/// Edge ids closing a cycle, found by depth-first traversal. Back edges do
/// not constrain ranks; the edge fixer routes them around the flow later.
fn feedback_edges(scope: &FlowScope, ids: &[String]) -> indexmap::IndexSet<String> {
    const UNSEEN: u8 = 0;
    const ON_STACK: u8 = 1;
    const DONE: u8 = 2;

    fn visit(
        scope: &FlowScope,
        id: &str,
        state: &mut IndexMap<String, u8>,
        feedback: &mut indexmap::IndexSet<String>,
    ) {
        state.insert(id.to_owned(), ON_STACK);
        let edges: Vec<(String, String)> = scope
            .outgoing(id)
            .filter(|edge| !scope.is_boundary_event(&edge.source))
            .map(|edge| (edge.id.clone(), edge.target.clone()))
            .collect();
        for (edge_id, target) in edges {
            match state.get(target.as_str()).copied() {
                Some(UNSEEN) => visit(scope, &target, state, feedback),
                Some(ON_STACK) => {
                    feedback.insert(edge_id);
                }
                _ => {}
            }
        }
        state.insert(id.to_owned(), DONE);
    }

    let mut feedback = indexmap::IndexSet::new();
    let mut state: IndexMap<String, u8> = ids.iter().map(|id| (id.clone(), UNSEEN)).collect();
    for id in ids {
        if state.get(id.as_str()).copied() == Some(UNSEEN) {
            visit(scope, id, &mut state, &mut feedback);
        }
    }
    feedback
}

/// Longest-path ranking via Kahn's algorithm over the acyclic edge set.
/// Boundary-sourced and feedback edges do not constrain ranks.
fn assign_ranks(scope: &FlowScope) -> IndexMap<String, usize> {
    let ids: Vec<String> = scope
        .nodes
        .values()
        .filter(|node| node.kind.is_flow_node())
        .map(|node| node.id.clone())
        .collect();
    let feedback = feedback_edges(scope, &ids);

    let ranking_edge = |edge_id: &str, source: &str, target: &str| -> bool {
        source != target
            && !scope.is_boundary_event(source)
            && !feedback.contains(edge_id)
            && ids.iter().any(|id| id == source)
            && ids.iter().any(|id| id == target)
    };

    let mut indegree: IndexMap<String, usize> = ids.iter().map(|id| (id.clone(), 0)).collect();
    for edge in &scope.edges {
        if ranking_edge(&edge.id, &edge.source, &edge.target) {
            if let Some(count) = indegree.get_mut(edge.target.as_str()) {
                *count += 1;
            }
        }
    }

    let mut ranks: IndexMap<String, usize> = ids.iter().map(|id| (id.clone(), 0)).collect();
    let mut queue: std::collections::VecDeque<String> = ids
        .iter()
        .filter(|id| indegree[id.as_str()] == 0)
        .cloned()
        .collect();
    while let Some(id) = queue.pop_front() {
        let rank = ranks[id.as_str()];
        let targets: Vec<String> = scope
            .outgoing(&id)
            .filter(|edge| ranking_edge(&edge.id, &edge.source, &edge.target))
            .map(|edge| edge.target.clone())
            .collect();
        for target in targets {
            let entry = ranks.get_mut(target.as_str()).expect("ranked node");
            *entry = (*entry).max(rank + 1);
            if let Some(count) = indegree.get_mut(target.as_str()) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    queue.push_back(target);
                }
            }
        }
    }
    ranks
}

/// Nodes per rank, ordered by two barycenter sweeps over predecessors.
fn order_ranks(scope: &FlowScope, ranks: &IndexMap<String, usize>) -> Vec<Vec<String>> {
    let max_rank = ranks.values().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<String>> = vec![Vec::new(); max_rank + 1];
    for (id, rank) in ranks {
        layers[*rank].push(id.clone());
    }

    for _ in 0..2 {
        for rank in 1..layers.len() {
            let prev: IndexMap<&str, usize> = layers[rank - 1]
                .iter()
                .enumerate()
                .map(|(i, id)| (id.as_str(), i))
                .collect();
            let mut keyed: Vec<(f64, String)> = layers[rank]
                .iter()
                .map(|id| {
                    let positions: Vec<usize> = scope
                        .incoming(id)
                        .filter_map(|edge| prev.get(edge.source.as_str()).copied())
                        .collect();
                    let key = if positions.is_empty() {
                        f64::MAX
                    } else {
                        positions.iter().sum::<usize>() as f64 / positions.len() as f64
                    };
                    (key, id.clone())
                })
                .collect();
            keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            layers[rank] = keyed.into_iter().map(|(_, id)| id).collect();
        }
    }
    layers
}

/// Rank index → X, order index → Y. Ranks are centered against the tallest
/// one so a single-row flow lines up on a shared centerline.
fn assign_coordinates(scope: &mut FlowScope, layers: &[Vec<String>], spacing: &SpacingHints) {
    let layer_heights: Vec<f64> = layers
        .iter()
        .map(|ids| {
            let heights: f64 = ids
                .iter()
                .filter_map(|id| scope.bounds(id))
                .map(|b| b.height)
                .sum();
            heights + spacing.node_node * (ids.len().saturating_sub(1)) as f64
        })
        .collect();
    let layer_widths: Vec<f64> = layers
        .iter()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| scope.bounds(id))
                .map(|b| b.width)
                .fold(0.0, f64::max)
        })
        .collect();
    let max_height = layer_heights.iter().copied().fold(0.0, f64::max);

    let mut x = 0.0;
    for (rank, ids) in layers.iter().enumerate() {
        let width = layer_widths[rank];
        let mut y = (max_height - layer_heights[rank]) / 2.0;
        for id in ids {
            let Some(node) = scope.nodes.get_mut(id.as_str()) else {
                continue;
            };
            node.bounds.x = x + (width - node.bounds.width) / 2.0;
            node.bounds.y = y;
            y += node.bounds.height + spacing.node_node;
        }
        x += width + spacing.layer;
    }

    // Anything that is not a flow node falls back to a row below the flow.
    let fallback_y = max_height + spacing.layer;
    let mut fallback_x = 0.0;
    let ids: Vec<String> = scope
        .nodes
        .values()
        .filter(|node| !node.kind.is_flow_node())
        .map(|node| node.id.clone())
        .collect();
    for id in ids {
        if let Some(node) = scope.nodes.get_mut(id.as_str()) {
            node.bounds.x = fallback_x;
            node.bounds.y = fallback_y;
            fallback_x += node.bounds.width + spacing.node_node;
        }
    }
}

/// Straight or L-shaped first sections between node side midpoints.
/// Boundary-sourced edges stay unrouted; the boundary stage owns them.
fn route_initial_edges(scope: &mut FlowScope) {
    for index in 0..scope.edges.len() {
        let edge = scope.edges[index].clone();
        if scope.is_boundary_event(&edge.source) {
            continue;
        }
        let (Some(source), Some(target)) = (
            scope.bounds(&edge.source),
            scope.bounds(&edge.target),
        ) else {
            continue;
        };
        let (exit, entry) = crate::geometry::best_connection_sides(&source, &target);
        let start = source.connection_point(exit);
        let end = target.connection_point(entry);
        let points = l_path(start, end, exit.is_horizontal());
        scope.edges[index].section = Some(Section::from_points(&points));
    }
}
