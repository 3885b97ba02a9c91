//! Lowering and numeric resolution for the constraint vocabulary.
//!
//! Every constraint reduces to pairwise relations of the form
//! `a − b ⟗ rhs` (with `b` optional). The engine starts all variables at
//! their suggested values and repeatedly projects violated relations in
//! ascending strength order, so stronger projections overwrite weaker ones
//! within a pass and the suggested values act as the weakest layer.

use indexmap::IndexMap;

use crate::errors::ConstraintClass;

use super::{Constraint, SolverNode, Strength};

const EPS: f64 = 0.01;
const MAX_PASSES: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Eq,
    Geq,
}

#[derive(Debug, Clone, Copy)]
struct LinCon {
    a: usize,
    b: Option<usize>,
    rel: Relation,
    rhs: f64,
    strength: Strength,
    class: ConstraintClass,
}

impl LinCon {
    fn residual(&self, vars: &[f64]) -> f64 {
        let value = vars[self.a] - self.b.map_or(0.0, |b| vars[b]);
        match self.rel {
            Relation::Eq => (value - self.rhs).abs(),
            Relation::Geq => (self.rhs - value).max(0.0),
        }
    }
}

/// Result of a solver run.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Solved (or fallback) position per registered node.
    pub positions: IndexMap<String, (f64, f64)>,
    /// Whether all required constraints were satisfied.
    pub converged: bool,
    /// Constraint class with the largest residual when not converged.
    pub dominant: Option<ConstraintClass>,
}

pub(super) fn solve(
    nodes: &IndexMap<String, SolverNode>,
    constraints: &[Constraint],
) -> SolveOutcome {
    // Variable layout: X of node i at 2*i, Y at 2*i + 1.
    let var_of = |id: &str, y: bool| -> Option<usize> {
        nodes.get_index_of(id).map(|i| i * 2 + usize::from(y))
    };

    let mut vars = Vec::with_capacity(nodes.len() * 2);
    for node in nodes.values() {
        vars.push(node.suggested_x);
        vars.push(node.suggested_y);
    }

    let mut relations: Vec<LinCon> = Vec::new();
    let mut anchored = vec![false; vars.len()];

    for constraint in constraints {
        lower(constraint, nodes, &var_of, &mut relations, &mut anchored);
    }

    // Weakest first, so later (stronger) projections win within a pass.
    relations.sort_by_key(|r| r.strength);

    // Required fixed values are applied up front; anchoring would otherwise
    // block their own projection.
    for relation in &relations {
        if relation.strength == Strength::Required
            && relation.rel == Relation::Eq
            && relation.b.is_none()
        {
            vars[relation.a] = relation.rhs;
        }
    }

    for _ in 0..MAX_PASSES {
        let mut moved: f64 = 0.0;
        for relation in &relations {
            moved = moved.max(project(relation, &mut vars, &anchored));
        }
        if moved < EPS {
            break;
        }
    }

    let mut worst: Option<(f64, ConstraintClass)> = None;
    for relation in &relations {
        if relation.strength != Strength::Required {
            continue;
        }
        let residual = relation.residual(&vars);
        if residual > EPS && worst.map_or(true, |(r, _)| residual > r) {
            worst = Some((residual, relation.class));
        }
    }

    let converged = worst.is_none();
    let positions = nodes
        .iter()
        .enumerate()
        .map(|(i, (id, node))| {
            let value = if converged {
                (vars[i * 2], vars[i * 2 + 1])
            } else {
                (node.suggested_x, node.suggested_y)
            };
            (id.clone(), value)
        })
        .collect();

    SolveOutcome {
        positions,
        converged,
        dominant: worst.map(|(_, class)| class),
    }
}

fn project(relation: &LinCon, vars: &mut [f64], anchored: &[bool]) -> f64 {
    let b_value = relation.b.map_or(0.0, |b| vars[b]);
    let value = vars[relation.a] - b_value;
    match relation.rel {
        Relation::Eq => {
            let deficit = relation.rhs - value;
            if deficit.abs() < EPS {
                return 0.0;
            }
            match relation.b {
                None => {
                    if anchored[relation.a] {
                        return 0.0;
                    }
                    vars[relation.a] += deficit;
                }
                Some(b) => match (anchored[relation.a], anchored[b]) {
                    (true, true) => return 0.0,
                    (true, false) => vars[b] -= deficit,
                    (false, true) => vars[relation.a] += deficit,
                    (false, false) => {
                        vars[relation.a] += deficit / 2.0;
                        vars[b] -= deficit / 2.0;
                    }
                },
            }
            deficit.abs()
        }
        Relation::Geq => {
            let deficit = relation.rhs - value;
            if deficit < EPS {
                return 0.0;
            }
            // Move the positive-side variable only; monotone growth keeps
            // ordering chains from oscillating.
            if !anchored[relation.a] {
                vars[relation.a] += deficit;
            } else if let Some(b) = relation.b {
                if anchored[b] {
                    return 0.0;
                }
                vars[b] -= deficit;
            } else {
                return 0.0;
            }
            deficit
        }
    }
}

fn lower(
    constraint: &Constraint,
    nodes: &IndexMap<String, SolverNode>,
    var_of: &dyn Fn(&str, bool) -> Option<usize>,
    out: &mut Vec<LinCon>,
    anchored: &mut [bool],
) {
    let class = constraint.class();
    let mut push = |a: Option<usize>, b: Option<usize>, rel, rhs, strength| {
        if let Some(a) = a {
            out.push(LinCon {
                a,
                b,
                rel,
                rhs,
                strength,
                class,
            });
        }
    };

    match constraint {
        Constraint::AlignX { nodes: ids, strength } => {
            for pair in ids.windows(2) {
                push(
                    var_of(&pair[1], false),
                    var_of(&pair[0], false),
                    Relation::Eq,
                    0.0,
                    *strength,
                );
            }
        }
        Constraint::AlignY { nodes: ids, strength } => {
            for pair in ids.windows(2) {
                push(
                    var_of(&pair[1], true),
                    var_of(&pair[0], true),
                    Relation::Eq,
                    0.0,
                    *strength,
                );
            }
        }
        Constraint::LeftOf {
            node,
            reference,
            min_gap,
            strength,
        } => {
            let width = nodes.get(node).map_or(0.0, |n| n.width);
            push(
                var_of(reference, false),
                var_of(node, false),
                Relation::Geq,
                width + min_gap,
                *strength,
            );
        }
        Constraint::RightOf {
            node,
            reference,
            min_gap,
            strength,
        } => {
            let width = nodes.get(reference).map_or(0.0, |n| n.width);
            push(
                var_of(node, false),
                var_of(reference, false),
                Relation::Geq,
                width + min_gap,
                *strength,
            );
        }
        Constraint::Above {
            node,
            reference,
            min_gap,
            strength,
        } => {
            let height = nodes.get(node).map_or(0.0, |n| n.height);
            push(
                var_of(reference, true),
                var_of(node, true),
                Relation::Geq,
                height + min_gap,
                *strength,
            );
        }
        Constraint::Below {
            node,
            reference,
            min_gap,
            strength,
        } => {
            let height = nodes.get(reference).map_or(0.0, |n| n.height);
            push(
                var_of(node, true),
                var_of(reference, true),
                Relation::Geq,
                height + min_gap,
                *strength,
            );
        }
        Constraint::FixedPosition {
            node,
            x,
            y,
            strength,
        } => {
            if let Some(x) = x {
                if let Some(var) = var_of(node, false) {
                    push(Some(var), None, Relation::Eq, *x, *strength);
                    if *strength == Strength::Required {
                        anchored[var] = true;
                    }
                }
            }
            if let Some(y) = y {
                if let Some(var) = var_of(node, true) {
                    push(Some(var), None, Relation::Eq, *y, *strength);
                    if *strength == Strength::Required {
                        anchored[var] = true;
                    }
                }
            }
        }
        Constraint::InContainer {
            node,
            container,
            padding,
            strength,
        } => {
            let (nw, nh) = nodes.get(node).map_or((0.0, 0.0), |n| (n.width, n.height));
            let (cw, ch) = nodes
                .get(container)
                .map_or((0.0, 0.0), |n| (n.width, n.height));
            // Left / top inset.
            push(
                var_of(node, false),
                var_of(container, false),
                Relation::Geq,
                *padding,
                *strength,
            );
            push(
                var_of(node, true),
                var_of(container, true),
                Relation::Geq,
                *padding,
                *strength,
            );
            // Right / bottom inset.
            push(
                var_of(container, false),
                var_of(node, false),
                Relation::Geq,
                padding + nw - cw,
                *strength,
            );
            push(
                var_of(container, true),
                var_of(node, true),
                Relation::Geq,
                padding + nh - ch,
                *strength,
            );
        }
        Constraint::MinDistance {
            first,
            second,
            axis,
            min_distance,
            strength,
        } => {
            let is_y = matches!(axis, super::Axis::Y);
            push(
                var_of(second, is_y),
                var_of(first, is_y),
                Relation::Geq,
                *min_distance,
                *strength,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Constraint, LayoutSolver, Strength};

    #[test]
    fn test_left_of_pushes_reference_right() {
        let mut solver = LayoutSolver::new();
        solver.register_node("a", 100.0, 80.0, 0.0, 0.0);
        solver.register_node("b", 100.0, 80.0, 10.0, 0.0);
        assert!(solver.add_constraint(Constraint::LeftOf {
            node: "a".into(),
            reference: "b".into(),
            min_gap: 60.0,
            strength: Strength::Strong,
        }));
        let outcome = solver.solve();
        assert!(outcome.converged);
        let a = outcome.positions["a"];
        let b = outcome.positions["b"];
        assert!(b.0 - a.0 >= 160.0 - 0.1);
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let mut solver = LayoutSolver::new();
        solver.register_node("a", 100.0, 80.0, 0.0, 0.0);
        assert!(!solver.add_constraint(Constraint::AlignY {
            nodes: vec!["a".into(), "ghost".into()],
            strength: Strength::Strong,
        }));
    }

    #[test]
    fn test_conflicting_required_falls_back_to_suggested() {
        let mut solver = LayoutSolver::new();
        solver.register_node("a", 10.0, 10.0, 5.0, 7.0);
        solver.add_constraint(Constraint::FixedPosition {
            node: "a".into(),
            x: Some(0.0),
            y: None,
            strength: Strength::Required,
        });
        solver.add_constraint(Constraint::FixedPosition {
            node: "a".into(),
            x: Some(100.0),
            y: None,
            strength: Strength::Required,
        });
        let outcome = solver.solve();
        assert!(!outcome.converged);
        assert_eq!(outcome.positions["a"], (5.0, 7.0));
    }

    #[test]
    fn test_solution_is_cached_until_clear() {
        let mut solver = LayoutSolver::new();
        solver.register_node("a", 10.0, 10.0, 1.0, 2.0);
        let first = solver.solve();
        let second = solver.solve();
        assert_eq!(first.positions, second.positions);
        solver.clear();
        assert!(solver.solve().positions.is_empty());
    }

    #[test]
    fn test_ordering_chain_converges() {
        let mut solver = LayoutSolver::new();
        for id in ["a", "b", "c"] {
            solver.register_node(id, 50.0, 50.0, 0.0, 0.0);
        }
        for (node, reference) in [("a", "b"), ("b", "c")] {
            solver.add_constraint(Constraint::LeftOf {
                node: node.into(),
                reference: reference.into(),
                min_gap: 10.0,
                strength: Strength::Strong,
            });
        }
        let outcome = solver.solve();
        assert!(outcome.converged);
        assert!(outcome.positions["b"].0 >= 60.0 - 0.1);
        assert!(outcome.positions["c"].0 >= 120.0 - 0.1);
    }
}
