//! Diagram-wide invariants checked over several layouts: orthogonality,
//! perpendicular endpoints, obstacle avoidance, diamond endpoints, boundary
//! spacing and determinism.

use bpmnviz_core::diagram::BpmnDocument;
use bpmnviz_core::geometry::{Bounds, Point, Side};
use bpmnviz_core::model::{BoundaryEvent, BpmnGraph, Edge, EventDefinitionKind, Node, NodeKind};
use bpmnviz_core::Pipeline;

fn process_graph(children: Vec<Node>, edges: Vec<Edge>) -> BpmnGraph {
    let mut process = Node::new("process_1", NodeKind::Process);
    process.children = children;
    process.edges = edges;
    BpmnGraph {
        id: "root".into(),
        children: vec![process],
        ..BpmnGraph::default()
    }
}

fn boundary(id: &str, host: &str) -> BoundaryEvent {
    BoundaryEvent {
        id: id.into(),
        attached_to: host.into(),
        name: None,
        event_definition: EventDefinitionKind::Error,
        interrupting: true,
        timer_definition: None,
        x: None,
        y: None,
    }
}

/// A graph exercising gateways, a boundary branch and a back edge at once.
fn busy_graph() -> BpmnGraph {
    let mut task_a = Node::new("task_a", NodeKind::Task);
    task_a.boundary_events.push(boundary("be_1", "task_a"));
    let mut gw = Node::new("gw_1", NodeKind::ExclusiveGateway);
    gw.default_flow = Some("flow_done".into());
    let mut retry = Edge::sequence_flow("flow_retry", "gw_1", "task_a");
    retry.condition = Some("${retry}".into());

    process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            task_a,
            Node::new("task_b", NodeKind::Task),
            gw,
            Node::new("end_1", NodeKind::EndEvent),
            Node::new("task_fix", NodeKind::Task),
            Node::new("end_err", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "task_b"),
            Edge::sequence_flow("flow_3", "task_b", "gw_1"),
            Edge::sequence_flow("flow_done", "gw_1", "end_1"),
            retry,
            Edge::sequence_flow("flow_err", "be_1", "task_fix"),
            Edge::sequence_flow("flow_4", "task_fix", "end_err"),
        ],
    )
}

fn linear_graph() -> BpmnGraph {
    process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            Node::new("task_a", NodeKind::Task),
            Node::new("end_1", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "end_1"),
        ],
    )
}

fn run(graph: BpmnGraph) -> BpmnDocument {
    Pipeline::default().to_bpmn(graph).unwrap()
}

fn flow_shapes(document: &BpmnDocument) -> Vec<(&str, Bounds)> {
    document
        .plane
        .shapes
        .iter()
        .filter(|shape| shape.kind.is_flow_node())
        .map(|shape| (shape.element.as_str(), shape.bounds))
        .collect()
}

fn segment_perpendicular(side: Side, from: Point, to: Point) -> bool {
    if side.is_horizontal() {
        (from.y - to.y).abs() < 0.5
    } else {
        (from.x - to.x).abs() < 0.5
    }
}

#[test]
fn test_every_segment_is_orthogonal() {
    for graph in [linear_graph(), busy_graph()] {
        let document = run(graph);
        for edge in &document.plane.edges {
            for pair in edge.waypoints.windows(2) {
                let dx = (pair[0].x - pair[1].x).abs();
                let dy = (pair[0].y - pair[1].y).abs();
                assert!(
                    dx < 0.5 || dy < 0.5,
                    "edge {} has diagonal segment {pair:?}",
                    edge.element
                );
            }
        }
    }
}

#[test]
fn test_endpoints_leave_and_enter_perpendicular() {
    let document = run(busy_graph());
    for edge in &document.plane.edges {
        if edge.waypoints.len() < 2 {
            continue;
        }
        let element = document
            .definitions
            .children
            .iter()
            .find_map(|c| c.edges.iter().find(|e| e.id == edge.element));
        let Some(model_edge) = element else { continue };

        if let Some(source) = document.plane.shape(&model_edge.source) {
            let side = source.bounds.closest_side(edge.waypoints[0]);
            assert!(
                segment_perpendicular(side, edge.waypoints[0], edge.waypoints[1]),
                "edge {} leaves {side:?} of {} non-perpendicular",
                edge.element,
                model_edge.source
            );
        }
        if let Some(target) = document.plane.shape(&model_edge.target) {
            let n = edge.waypoints.len();
            let side = target.bounds.closest_side(edge.waypoints[n - 1]);
            assert!(
                segment_perpendicular(side, edge.waypoints[n - 2], edge.waypoints[n - 1]),
                "edge {} enters {side:?} of {} non-perpendicular",
                edge.element,
                model_edge.target
            );
        }
    }
}

#[test]
fn test_no_segment_crosses_foreign_node_interior() {
    let document = run(busy_graph());
    let shapes = flow_shapes(&document);
    for edge in &document.plane.edges {
        let model_edge = document
            .definitions
            .children
            .iter()
            .find_map(|c| c.edges.iter().find(|e| e.id == edge.element));
        let Some(model_edge) = model_edge else { continue };
        for (id, bounds) in &shapes {
            if *id == model_edge.source || *id == model_edge.target {
                continue;
            }
            let interior = Bounds::new(
                bounds.x + 5.0,
                bounds.y + 5.0,
                bounds.width - 10.0,
                bounds.height - 10.0,
            );
            for pair in edge.waypoints.windows(2) {
                let min_x = pair[0].x.min(pair[1].x);
                let max_x = pair[0].x.max(pair[1].x);
                let min_y = pair[0].y.min(pair[1].y);
                let max_y = pair[0].y.max(pair[1].y);
                let crosses = min_x <= interior.right()
                    && max_x >= interior.x
                    && min_y <= interior.bottom()
                    && max_y >= interior.y;
                assert!(
                    !crosses,
                    "edge {} crosses interior of {id}: {pair:?}",
                    edge.element
                );
            }
        }
    }
}

#[test]
fn test_gateway_endpoints_lie_on_the_diamond() {
    let document = run(busy_graph());
    let gw = document.plane.shape("gw_1").unwrap().bounds;
    let c = gw.center();
    for edge in &document.plane.edges {
        let model_edge = document
            .definitions
            .children
            .iter()
            .find_map(|ch| ch.edges.iter().find(|e| e.id == edge.element));
        let Some(model_edge) = model_edge else { continue };
        let mut endpoints = Vec::new();
        if model_edge.source == "gw_1" {
            endpoints.push(edge.waypoints[0]);
        }
        if model_edge.target == "gw_1" {
            endpoints.push(edge.waypoints[edge.waypoints.len() - 1]);
        }
        for p in endpoints {
            let value =
                (p.x - c.x).abs() / (gw.width / 2.0) + (p.y - c.y).abs() / (gw.height / 2.0);
            assert!(
                (value - 1.0).abs() < 0.1,
                "endpoint {p:?} of {} misses the diamond",
                edge.element
            );
        }
    }
}

#[test]
fn test_two_boundary_events_evenly_spaced() {
    let mut task = Node::new("task_a", NodeKind::Task);
    task.boundary_events.push(boundary("be_1", "task_a"));
    task.boundary_events.push(boundary("be_2", "task_a"));
    let graph = process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            task,
            Node::new("end_1", NodeKind::EndEvent),
            Node::new("end_a", NodeKind::EndEvent),
            Node::new("end_b", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "end_1"),
            Edge::sequence_flow("flow_a", "be_1", "end_a"),
            Edge::sequence_flow("flow_b", "be_2", "end_b"),
        ],
    );
    let document = run(graph);
    let host = document.plane.shape("task_a").unwrap().bounds;
    let be_1 = document.plane.shape("be_1").unwrap().bounds;
    let be_2 = document.plane.shape("be_2").unwrap().bounds;

    // Centers at one third and two thirds of the host width, both straddling
    // the bottom edge.
    assert!((be_1.center().x - (host.x + host.width / 3.0)).abs() < 0.5);
    assert!((be_2.center().x - (host.x + host.width * 2.0 / 3.0)).abs() < 0.5);
    for be in [be_1, be_2] {
        assert!((be.center().y - host.bottom()).abs() < 0.5);
    }
}

#[test]
fn test_upstream_flow_starts_near_the_top() {
    let document = run(busy_graph());
    let min_y = flow_shapes(&document)
        .iter()
        .map(|(_, b)| b.y)
        .fold(f64::INFINITY, f64::min);
    assert!(min_y <= 12.5, "upstream flow drifted down to {min_y}");
}

#[test]
fn test_relayout_of_absolute_coords_is_a_noop() {
    let first = run(linear_graph());
    let mut graph = first.definitions.clone();
    for child in &mut graph.children {
        for edge in &mut child.edges {
            edge.absolute_coords = true;
        }
    }
    let second = Pipeline::default().to_bpmn(graph).unwrap();
    for shape in &first.plane.shapes {
        let replayed = second.plane.shape(&shape.element).unwrap();
        assert_eq!(shape.bounds, replayed.bounds, "{} moved", shape.element);
    }
    for edge in &first.plane.edges {
        let replayed = second.plane.edge(&edge.element).unwrap();
        assert_eq!(edge.waypoints, replayed.waypoints, "{} rerouted", edge.element);
    }
}

#[test]
fn test_pipeline_is_deterministic() {
    let first = bpmnviz_core::xml::write_bpmn(&run(busy_graph())).unwrap();
    let second = bpmnviz_core::xml::write_bpmn(&run(busy_graph())).unwrap();
    assert_eq!(first, second);
}
