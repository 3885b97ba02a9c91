//! Rightward propagation after gateway moves.
//!
//! When the boundary stage pushes a gateway to the right, everything
//! downstream of it on the main flow must keep clear of the gateway's right
//! edge. The shift travels transitively along sequence flows; nodes that
//! already sit far enough right are left alone.

use indexmap::IndexMap;

use crate::layout::FlowScope;

/// Minimum clearance between a node and the gateway (or predecessor) it
/// follows.
const CLEARANCE: f64 = 50.0;

/// Shifts the downstream main flow of each listed gateway.
pub fn propagate_gateway_shift(scope: &mut FlowScope, gateways: &[String]) {
    // Best X seen per node; revisits only ever push a node further right.
    let mut assigned: IndexMap<String, f64> = IndexMap::new();
    let mut queue: std::collections::VecDeque<String> = gateways.iter().cloned().collect();

    while let Some(id) = queue.pop_front() {
        let Some(source) = scope.bounds(&id) else {
            continue;
        };
        let required = source.right() + CLEARANCE;
        let targets: Vec<String> = scope
            .outgoing(&id)
            .map(|edge| edge.target.clone())
            .collect();
        for target in targets {
            let Some(current) = scope.bounds(&target) else {
                continue;
            };
            let best = assigned
                .get(target.as_str())
                .copied()
                .unwrap_or(current.x);
            if required > best {
                scope.translate_node(&target, required - current.x, 0.0);
                assigned.insert(target.clone(), required);
                queue.push_back(target);
            } else if !assigned.contains_key(target.as_str()) {
                // Already clear; still walk through it once so transitive
                // successors are checked against its position.
                assigned.insert(target.clone(), best);
                queue.push_back(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::layout::ScopeNode;
    use crate::model::{Edge, NodeKind};

    fn node(id: &str, kind: NodeKind, x: f64) -> ScopeNode {
        let (w, h) = kind.default_size(false);
        ScopeNode {
            id: id.into(),
            kind,
            bounds: Bounds::new(x, 0.0, w, h),
            visual_height: None,
        }
    }

    #[test]
    fn test_downstream_nodes_shift_right() {
        let mut scope = FlowScope::default();
        for n in [
            node("gw", NodeKind::ExclusiveGateway, 300.0),
            node("task_b", NodeKind::Task, 200.0),
            node("end", NodeKind::EndEvent, 340.0),
        ] {
            scope.nodes.insert(n.id.clone(), n);
        }
        scope.edges = vec![
            Edge::sequence_flow("f1", "gw", "task_b"),
            Edge::sequence_flow("f2", "task_b", "end"),
        ];
        propagate_gateway_shift(&mut scope, &["gw".to_owned()]);

        let gw = scope.bounds("gw").unwrap();
        let task = scope.bounds("task_b").unwrap();
        let end = scope.bounds("end").unwrap();
        assert!(task.x >= gw.right() + CLEARANCE - 0.5);
        assert!(end.x >= task.right() + CLEARANCE - 0.5);
    }

    #[test]
    fn test_far_nodes_untouched() {
        let mut scope = FlowScope::default();
        for n in [
            node("gw", NodeKind::ExclusiveGateway, 0.0),
            node("task_b", NodeKind::Task, 500.0),
        ] {
            scope.nodes.insert(n.id.clone(), n);
        }
        scope.edges = vec![Edge::sequence_flow("f1", "gw", "task_b")];
        propagate_gateway_shift(&mut scope, &["gw".to_owned()]);
        assert_eq!(scope.bounds("task_b").unwrap().x, 500.0);
    }
}
