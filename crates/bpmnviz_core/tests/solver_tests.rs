//! Constraint solver behavior through the public API.

use bpmnviz_core::model::Edge;
use bpmnviz_core::solver::{
    Axis, Constraint, ConstraintOptions, LayoutSolver, Strength, generate_bpmn_constraints,
};

#[test]
fn test_canonical_constraints_order_sequence_flows() {
    let edges = vec![
        Edge::sequence_flow("f1", "start_1", "task_a"),
        Edge::sequence_flow("f2", "task_a", "end_1"),
    ];
    let constraints =
        generate_bpmn_constraints(&edges, &[], &[], &ConstraintOptions::default());
    assert_eq!(constraints.len(), 2);

    let mut solver = LayoutSolver::new();
    solver.register_node("start_1", 36.0, 36.0, 0.0, 22.0);
    solver.register_node("task_a", 100.0, 80.0, 0.0, 0.0);
    solver.register_node("end_1", 36.0, 36.0, 0.0, 22.0);
    for constraint in constraints {
        assert!(solver.add_constraint(constraint));
    }
    let outcome = solver.solve();
    assert!(outcome.converged);
    let start = outcome.positions["start_1"];
    let task = outcome.positions["task_a"];
    let end = outcome.positions["end_1"];
    assert!(task.0 >= start.0 + 36.0 + 60.0 - 0.1);
    assert!(end.0 >= task.0 + 100.0 + 60.0 - 0.1);
}

#[test]
fn test_boundary_targets_forced_below_hosts() {
    let constraints = generate_bpmn_constraints(
        &[],
        &[("task_a".to_owned(), "task_fix".to_owned())],
        &[],
        &ConstraintOptions::default(),
    );
    let mut solver = LayoutSolver::new();
    solver.register_node("task_a", 100.0, 80.0, 0.0, 0.0);
    solver.register_node("task_fix", 100.0, 80.0, 200.0, 0.0);
    for constraint in constraints {
        solver.add_constraint(constraint);
    }
    let outcome = solver.solve();
    assert!(outcome.converged);
    assert!(outcome.positions["task_fix"].1 >= 80.0 + 85.0 - 0.1);
}

#[test]
fn test_sibling_lanes_stack_in_order() {
    let constraints = generate_bpmn_constraints(
        &[],
        &[],
        &["lane_a".to_owned(), "lane_b".to_owned(), "lane_c".to_owned()],
        &ConstraintOptions::default(),
    );
    let mut solver = LayoutSolver::new();
    for lane in ["lane_a", "lane_b", "lane_c"] {
        solver.register_node(lane, 600.0, 120.0, 0.0, 0.0);
    }
    for constraint in constraints {
        solver.add_constraint(constraint);
    }
    let outcome = solver.solve();
    assert!(outcome.converged);
    assert!(outcome.positions["lane_b"].1 >= outcome.positions["lane_a"].1 + 120.0 - 0.1);
    assert!(outcome.positions["lane_c"].1 >= outcome.positions["lane_b"].1 + 120.0 - 0.1);
}

#[test]
fn test_container_constraint_keeps_node_inside() {
    let mut solver = LayoutSolver::new();
    solver.register_node("pool", 600.0, 250.0, 0.0, 0.0);
    solver.add_constraint(Constraint::FixedPosition {
        node: "pool".into(),
        x: Some(0.0),
        y: Some(0.0),
        strength: Strength::Required,
    });
    solver.register_node("task", 100.0, 80.0, -40.0, 400.0);
    solver.add_constraint(Constraint::InContainer {
        node: "task".into(),
        container: "pool".into(),
        padding: 25.0,
        strength: Strength::Strong,
    });
    let outcome = solver.solve();
    assert!(outcome.converged);
    let (x, y) = outcome.positions["task"];
    assert!(x >= 25.0 - 0.1 && x + 100.0 <= 600.0 - 25.0 + 0.1);
    assert!(y >= 25.0 - 0.1 && y + 80.0 <= 250.0 - 25.0 + 0.1);
}

#[test]
fn test_min_distance_prefers_positive_side() {
    let mut solver = LayoutSolver::new();
    solver.register_node("a", 50.0, 50.0, 100.0, 0.0);
    solver.register_node("b", 50.0, 50.0, 90.0, 0.0);
    solver.add_constraint(Constraint::MinDistance {
        first: "a".into(),
        second: "b".into(),
        axis: Axis::X,
        min_distance: 80.0,
        strength: Strength::Strong,
    });
    let outcome = solver.solve();
    assert!(outcome.converged);
    assert!(outcome.positions["b"].0 >= outcome.positions["a"].0 + 80.0 - 0.1);
}
