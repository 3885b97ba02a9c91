//! Main-flow normalization.
//!
//! Pulls the upstream main flow up to a fixed target Y, re-centers end
//! events on their predecessors, and drops the converging-gateway section so
//! the gateway hangs a fixed distance below the main flow. Edge waypoints
//! follow the nodes they connect.

use indexmap::{IndexMap, IndexSet};

use crate::layout::FlowScope;
use crate::layout::boundary::main_flow_nodes;
use crate::model::NodeKind;

/// Y the topmost upstream node is pulled to.
const TARGET_MIN_Y: f64 = 12.0;

/// Distance between the main-flow bottom and a converging gateway.
const CONVERGING_DROP: f64 = 150.0;

/// Normalizes one scope. `converging` names the gateways that receive
/// boundary branches, as reported by the boundary stage.
pub fn normalize_main_flow(scope: &mut FlowScope, converging: &[String]) {
    let main_flow = main_flow_nodes(scope);

    // Everything at or past a converging gateway moves as one group.
    let mut downstream: IndexSet<String> = IndexSet::new();
    let mut queue: Vec<String> = converging.to_vec();
    while let Some(id) = queue.pop() {
        if !downstream.insert(id.clone()) {
            continue;
        }
        for edge in scope.outgoing(&id) {
            queue.push(edge.target.clone());
        }
    }

    let upstream: Vec<String> = main_flow
        .iter()
        .filter(|id| !downstream.contains(id.as_str()))
        .cloned()
        .collect();

    let mut moves: IndexMap<String, f64> = IndexMap::new();

    // Pull the upstream flow to the target Y. End events stay put here and
    // re-align to their predecessors afterwards.
    let min_y = upstream
        .iter()
        .filter(|id| {
            scope
                .nodes
                .get(id.as_str())
                .is_some_and(|n| n.kind != NodeKind::EndEvent)
        })
        .filter_map(|id| scope.bounds(id))
        .map(|b| b.y)
        .fold(f64::INFINITY, f64::min);
    if min_y.is_finite() && min_y > TARGET_MIN_Y {
        let dy = TARGET_MIN_Y - min_y;
        for id in &upstream {
            let is_end = scope
                .nodes
                .get(id.as_str())
                .is_some_and(|n| n.kind == NodeKind::EndEvent);
            if is_end {
                continue;
            }
            scope.translate_node(id, 0.0, dy);
            moves.insert(id.clone(), dy);
        }
    }

    // End events center on their predecessor's vertical center.
    for id in &upstream {
        let is_end = scope
            .nodes
            .get(id.as_str())
            .is_some_and(|n| n.kind == NodeKind::EndEvent);
        if !is_end {
            continue;
        }
        let Some(pred) = scope
            .incoming(id)
            .next()
            .map(|edge| edge.source.clone())
        else {
            continue;
        };
        let (Some(pred_bounds), Some(own)) =
            (scope.element_bounds(&pred), scope.bounds(id))
        else {
            continue;
        };
        let dy = pred_bounds.center().y - own.center().y;
        if dy.abs() > f64::EPSILON {
            scope.translate_node(id, 0.0, dy);
            *moves.entry(id.clone()).or_insert(0.0) += dy;
        }
    }

    // Drop the downstream group so the first converging gateway sits a fixed
    // distance below the upstream flow.
    if let Some(gateway) = converging.first() {
        let main_bottom = upstream
            .iter()
            .filter_map(|id| scope.bounds(id))
            .map(|b| b.bottom())
            .fold(f64::NEG_INFINITY, f64::max);
        if let Some(gw_bounds) = scope.bounds(gateway) {
            if main_bottom.is_finite() {
                let dy = main_bottom + CONVERGING_DROP - gw_bounds.y;
                if dy.abs() > f64::EPSILON {
                    for id in &downstream {
                        scope.translate_node(id, 0.0, dy);
                        *moves.entry(id.clone()).or_insert(0.0) += dy;
                    }
                }
            }
        }
    }

    adjust_waypoints(scope, &moves);
}

/// Moves edge waypoints after node moves: both endpoints moved shifts the
/// whole polyline, one endpoint moved shifts only that endpoint.
fn adjust_waypoints(scope: &mut FlowScope, moves: &IndexMap<String, f64>) {
    for edge in &mut scope.edges {
        let Some(section) = edge.section.as_mut() else {
            continue;
        };
        let source_dy = moves.get(edge.source.as_str()).copied();
        let target_dy = moves.get(edge.target.as_str()).copied();
        match (source_dy, target_dy) {
            (Some(dy), Some(_)) => section.translate(0.0, dy),
            (Some(dy), None) => section.start.y += dy,
            (None, Some(dy)) => section.end.y += dy,
            (None, None) => {}
        }
    }
}
