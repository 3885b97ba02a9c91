//! Serialization checks: semantic tree, DI plane and escaping.

use bpmnviz_core::model::{
    BoundaryEvent, BpmnGraph, Edge, EdgeKind, EventDefinitionKind, Node, NodeKind,
};
use bpmnviz_core::xml::write_bpmn;
use bpmnviz_core::{LayoutOptions, Pipeline, convert};

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

fn render(graph: BpmnGraph) -> String {
    let document = Pipeline::default().to_bpmn(graph).unwrap();
    write_bpmn(&document).unwrap()
}

#[test]
fn test_linear_process_serializes_tree_and_plane() {
    let xml = render(process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            Node::new("task_a", NodeKind::Task),
            Node::new("end_1", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "end_1"),
        ],
    ));

    assert!(xml.contains(r#"<bpmn:process id="process_1" isExecutable="true">"#));
    assert!(xml.contains(r#"<bpmn:startEvent id="start_1" />"#));
    assert!(xml.contains(r#"sourceRef="task_a" targetRef="end_1""#));
    assert!(xml.contains(r#"<bpmndi:BPMNShape id="task_a_di" bpmnElement="task_a">"#));
    assert!(xml.contains("<dc:Bounds"));
    assert!(xml.contains("<di:waypoint"));
    assert!(xml.contains("</bpmn:definitions>"));
}

#[test]
fn test_gateway_default_and_condition() {
    let mut gw = Node::new("gw_1", NodeKind::ExclusiveGateway);
    gw.default_flow = Some("flow_no".into());
    let mut yes = Edge::sequence_flow("flow_yes", "gw_1", "end_yes");
    yes.condition = Some("${ok}".into());
    let xml = render(process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            gw,
            Node::new("end_yes", NodeKind::EndEvent),
            Node::new("end_no", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "gw_1"),
            yes,
            Edge::sequence_flow("flow_no", "gw_1", "end_no"),
        ],
    ));

    assert!(xml.contains(r#"default="flow_no""#));
    assert!(xml.contains(
        r#"<bpmn:conditionExpression xsi:type="bpmn:tFormalExpression">${ok}</bpmn:conditionExpression>"#
    ));
}

#[test]
fn test_boundary_event_with_timer() {
    let mut task = Node::new("task_a", NodeKind::Task);
    task.boundary_events.push(BoundaryEvent {
        id: "be_1".into(),
        attached_to: "task_a".into(),
        name: None,
        event_definition: EventDefinitionKind::Timer,
        interrupting: false,
        timer_definition: Some("PT30M".into()),
        x: None,
        y: None,
    });
    let xml = render(process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            task,
            Node::new("end_1", NodeKind::EndEvent),
            Node::new("end_t", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "end_1"),
            Edge::sequence_flow("flow_t", "be_1", "end_t"),
        ],
    ));

    assert!(xml.contains(
        r#"<bpmn:boundaryEvent id="be_1" attachedToRef="task_a" cancelActivity="false">"#
    ));
    assert!(xml.contains("PT30M</bpmn:timeDuration>"));
    assert!(xml.contains(r#"<bpmndi:BPMNShape id="be_1_di" bpmnElement="be_1">"#));
}

#[test]
fn test_collaboration_serializes_pools_and_message_flow() {
    let mut pool_a = Node::new("pool_a", NodeKind::Participant);
    pool_a.name = Some("Customer".into());
    let mut proc_a = Node::new("proc_a", NodeKind::Process);
    proc_a.children = vec![
        Node::new("start_a", NodeKind::StartEvent),
        Node::new("send_a", NodeKind::SendTask),
    ];
    proc_a.edges = vec![Edge::sequence_flow("flow_a", "start_a", "send_a")];
    pool_a.children = vec![proc_a];

    let mut pool_b = Node::new("pool_b", NodeKind::Participant);
    let mut proc_b = Node::new("proc_b", NodeKind::Process);
    proc_b.children = vec![Node::new("recv_b", NodeKind::ReceiveTask)];
    pool_b.children = vec![proc_b];

    let graph = BpmnGraph {
        id: "root".into(),
        children: vec![pool_a, pool_b],
        edges: vec![Edge::new("msg_1", "send_a", "recv_b", EdgeKind::MessageFlow)],
        ..BpmnGraph::default()
    };
    let xml = render(graph);

    assert!(xml.contains(r#"<bpmn:collaboration id="root_collaboration">"#));
    assert!(xml.contains(r#"<bpmn:participant id="pool_a" name="Customer" processRef="proc_a" />"#));
    assert!(xml.contains(r#"<bpmn:messageFlow id="msg_1" sourceRef="send_a" targetRef="recv_b" />"#));
    assert!(xml.contains(r#"isHorizontal="true""#));
    assert!(xml.contains(r#"bpmnElement="root_collaboration""#));
}

#[test]
fn test_names_are_escaped() {
    let mut task = Node::new("task_a", NodeKind::Task);
    task.name = Some("Check <amount> & \"limits\"".into());
    let xml = render(process_graph(
        vec![
            Node::new("start_1", NodeKind::StartEvent),
            task,
            Node::new("end_1", NodeKind::EndEvent),
        ],
        vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "end_1"),
        ],
    ));
    assert!(xml.contains("Check &lt;amount&gt; &amp; &quot;limits&quot;"));
}

#[test]
fn test_convert_goes_from_json_to_xml() {
    let json = r##"{
        "id": "demo",
        "children": [
            {
                "id": "process_1",
                "bpmn": { "type": "bpmn:process" },
                "children": [
                    { "id": "start_1", "bpmn": { "type": "bpmn:startEvent" }, "width": 36, "height": 36 },
                    { "id": "task_a", "bpmn": { "type": "bpmn:userTask", "name": "Review" }, "width": 100, "height": 80 },
                    { "id": "end_1", "bpmn": { "type": "bpmn:endEvent" }, "width": 36, "height": 36 }
                ],
                "edges": [
                    { "id": "flow_1", "sources": ["start_1"], "targets": ["task_a"] },
                    { "id": "flow_2", "sources": ["task_a"], "targets": ["end_1"] }
                ]
            }
        ]
    }"##;
    let xml = convert(json, LayoutOptions::default()).unwrap();
    assert!(xml.contains(r#"<bpmn:userTask id="task_a" name="Review" />"#));
    assert!(xml.contains("<bpmndi:BPMNDiagram"));
}

#[test]
fn test_invalid_input_is_rejected_before_layout() {
    let graph = BpmnGraph {
        id: "root".into(),
        ..BpmnGraph::default()
    };
    let error = Pipeline::default().to_bpmn(graph).unwrap_err();
    assert!(matches!(
        error,
        bpmnviz_core::LayoutError::Input(bpmnviz_core::InputError::EmptyGraph)
    ));
}
