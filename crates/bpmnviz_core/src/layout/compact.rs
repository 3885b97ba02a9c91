//! Optional whitespace reduction.
//!
//! The plain sweep pulls each node toward its nearest predecessor along one
//! axis, keeping a minimum gap, and never pushes a node the other way. The
//! dependency-aware mode orders nodes topologically first so a node never
//! compacts past something it depends on.

use indexmap::IndexMap;

use crate::layout::FlowScope;
use crate::solver::Axis;

/// Sweeps the scope along `axis`, pulling nodes together down to `min_gap`.
pub fn compact(scope: &mut FlowScope, axis: Axis, min_gap: f64) {
    let mut order: Vec<String> = scope.nodes.keys().cloned().collect();
    order.sort_by(|a, b| {
        let pa = position(scope, a, axis);
        let pb = position(scope, b, axis);
        pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
    });

    for index in 1..order.len() {
        let current = scope.bounds(&order[index]).unwrap_or_default();
        // Nearest allowed position given every earlier node that overlaps on
        // the perpendicular axis.
        let mut limit = f64::NEG_INFINITY;
        for earlier in &order[..index] {
            let other = scope.bounds(earlier).unwrap_or_default();
            let overlaps = match axis {
                Axis::X => current.y < other.bottom() && current.bottom() > other.y,
                Axis::Y => current.x < other.right() && current.right() > other.x,
            };
            if overlaps {
                limit = limit.max(match axis {
                    Axis::X => other.right() + min_gap,
                    Axis::Y => other.bottom() + min_gap,
                });
            }
        }
        // No overlapping predecessor means the node is not part of any
        // adjacent pair; it stays where it is.
        if !limit.is_finite() {
            continue;
        }
        let current_pos = match axis {
            Axis::X => current.x,
            Axis::Y => current.y,
        };
        if limit < current_pos {
            match axis {
                Axis::X => scope.translate_node(&order[index], limit - current.x, 0.0),
                Axis::Y => scope.translate_node(&order[index], 0.0, limit - current.y),
            }
        }
    }
}

/// Dependency-aware horizontal compaction: Kahn's topological sort over the
/// sequence flows, then each node moves left to sit `min_gap` past the
/// rightmost of its dependencies. Nodes on cycles are left where they are.
pub fn compact_with_dependencies(scope: &mut FlowScope, min_gap: f64) {
    let ids: Vec<String> = scope.nodes.keys().cloned().collect();
    let mut indegree: IndexMap<String, usize> =
        ids.iter().map(|id| (id.clone(), 0)).collect();
    for edge in scope.edges.iter() {
        if scope.nodes.contains_key(edge.source.as_str())
            && scope.nodes.contains_key(edge.target.as_str())
            && edge.source != edge.target
        {
            if let Some(count) = indegree.get_mut(edge.target.as_str()) {
                *count += 1;
            }
        }
    }

    let mut queue: std::collections::VecDeque<String> = ids
        .iter()
        .filter(|id| indegree[id.as_str()] == 0)
        .cloned()
        .collect();
    let mut topo: Vec<String> = Vec::new();
    while let Some(id) = queue.pop_front() {
        topo.push(id.clone());
        let targets: Vec<String> = scope
            .edges
            .iter()
            .filter(|e| e.source == id && e.source != e.target)
            .map(|e| e.target.clone())
            .collect();
        for target in targets {
            if let Some(count) = indegree.get_mut(target.as_str()) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    queue.push_back(target);
                }
            }
        }
    }
    // Cycle residuals keep their positions but still come after the sorted
    // prefix, matching the sweep order.
    for id in &ids {
        if !topo.contains(id) {
            topo.push(id.clone());
        }
    }

    for id in &topo {
        let deps: Vec<String> = scope.incoming(id).map(|e| e.source.clone()).collect();
        if deps.is_empty() {
            continue;
        }
        let limit = deps
            .iter()
            .filter_map(|dep| scope.bounds(dep))
            .map(|b| b.right())
            .fold(f64::NEG_INFINITY, f64::max)
            + min_gap;
        let current = scope.bounds(id).unwrap_or_default();
        if limit.is_finite() && limit < current.x {
            scope.translate_node(id, limit - current.x, 0.0);
        }
    }
}

fn position(scope: &FlowScope, id: &str, axis: Axis) -> f64 {
    let bounds = scope.bounds(id).unwrap_or_default();
    match axis {
        Axis::X => bounds.x,
        Axis::Y => bounds.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::layout::ScopeNode;
    use crate::model::{Edge, NodeKind};

    fn node(id: &str, x: f64, y: f64) -> ScopeNode {
        ScopeNode {
            id: id.into(),
            kind: NodeKind::Task,
            bounds: Bounds::new(x, y, 100.0, 80.0),
            visual_height: None,
        }
    }

    #[test]
    fn test_sweep_pulls_overlapping_row_together() {
        let mut scope = FlowScope::default();
        for n in [node("a", 0.0, 0.0), node("b", 400.0, 10.0)] {
            scope.nodes.insert(n.id.clone(), n);
        }
        compact(&mut scope, Axis::X, 40.0);
        assert_eq!(scope.bounds("b").unwrap().x, 140.0);
    }

    #[test]
    fn test_sweep_leaves_disjoint_rows_alone() {
        let mut scope = FlowScope::default();
        for n in [node("a", 0.0, 0.0), node("b", 400.0, 300.0)] {
            scope.nodes.insert(n.id.clone(), n);
        }
        compact(&mut scope, Axis::X, 40.0);
        // No perpendicular overlap: b is not part of any adjacent pair and
        // must not move.
        assert_eq!(scope.bounds("b").unwrap().x, 400.0);
    }

    #[test]
    fn test_dependency_mode_respects_edges() {
        let mut scope = FlowScope::default();
        for n in [node("a", 0.0, 0.0), node("b", 150.0, 200.0), node("c", 600.0, 0.0)] {
            scope.nodes.insert(n.id.clone(), n);
        }
        scope.edges = vec![
            Edge::sequence_flow("f1", "a", "c"),
            Edge::sequence_flow("f2", "b", "c"),
        ];
        compact_with_dependencies(&mut scope, 40.0);
        let b = scope.bounds("b").unwrap();
        let c = scope.bounds("c").unwrap();
        assert!(c.x >= b.right() + 40.0 - 0.5);
        assert_eq!(c.x, 290.0);
    }

    #[test]
    fn test_dependency_mode_never_moves_right() {
        let mut scope = FlowScope::default();
        for n in [node("a", 0.0, 0.0), node("b", 110.0, 0.0)] {
            scope.nodes.insert(n.id.clone(), n);
        }
        scope.edges = vec![Edge::sequence_flow("f1", "a", "b")];
        compact_with_dependencies(&mut scope, 40.0);
        // Already tighter than the gap; must not be pushed outward.
        assert_eq!(scope.bounds("b").unwrap().x, 110.0);
    }
}
