//! Reader for the ELK-BPMN Extended Schema v2.0 JSON format.
//!
//! The raw structs mirror the wire format; [`parse_graph`] converts them
//! into the internal model and reports unknown kinds and missing required
//! attributes as [`InputError`]s.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::errors::InputError;
use crate::model::edge::{Edge, EdgeKind};
use crate::model::graph::{BpmnGraph, NamedDef, SpacingHints};
use crate::model::node::{
    BoundaryEvent, DataRef, EventDefinitionKind, GatewayDirection, IoSpecification, Node, NodeKind,
};

/// Failure while reading an input document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed input json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Input(#[from] InputError),
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "layoutOptions")]
    layout_options: serde_json::Map<String, Value>,
    #[serde(default)]
    children: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
    #[serde(default)]
    messages: Vec<RawNamed>,
    #[serde(default)]
    signals: Vec<RawNamed>,
    #[serde(default)]
    errors: Vec<RawNamed>,
    #[serde(default)]
    escalations: Vec<RawNamed>,
}

#[derive(Debug, Deserialize)]
struct RawNamed {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBpmn {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_expanded: Option<bool>,
    #[serde(default)]
    is_interrupting: Option<bool>,
    #[serde(default)]
    event_definition_kind: Option<EventDefinitionKind>,
    #[serde(default)]
    gateway_direction: Option<GatewayDirection>,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    timer_definition: Option<String>,
    #[serde(default)]
    io_specification: Option<RawIoSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIoSpec {
    #[serde(default)]
    data_inputs: Vec<RawNamed>,
    #[serde(default)]
    data_outputs: Vec<RawNamed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: String,
    #[serde(default)]
    bpmn: RawBpmn,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    children: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
    #[serde(default)]
    boundary_events: Vec<RawBoundary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoundary {
    id: String,
    attached_to_ref: String,
    #[serde(default)]
    bpmn: RawBpmn,
    #[serde(default)]
    cancel_activity: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCondition {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEdge {
    id: String,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    bpmn: RawBpmn,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    condition_expression: Option<RawCondition>,
}

/// Parses an ELK-BPMN JSON document into a [`BpmnGraph`].
///
/// Only structural conversion happens here; graph-level invariants are
/// checked separately by [`BpmnGraph::validate`].
pub fn parse_graph(json: &str) -> Result<BpmnGraph, SchemaError> {
    let raw: RawGraph = serde_json::from_str(json)?;
    let spacing = parse_spacing(&raw.layout_options);

    let mut children = Vec::with_capacity(raw.children.len());
    for raw_child in raw.children {
        children.push(convert_node(raw_child)?);
    }
    let mut edges = Vec::with_capacity(raw.edges.len());
    for raw_edge in raw.edges {
        edges.push(convert_edge(raw_edge)?);
    }

    Ok(BpmnGraph {
        id: raw.id.unwrap_or_else(|| String::from("root")),
        children,
        edges,
        messages: convert_named(raw.messages),
        signals: convert_named(raw.signals),
        errors: convert_named(raw.errors),
        escalations: convert_named(raw.escalations),
        spacing,
    })
}

fn convert_named(raw: Vec<RawNamed>) -> Vec<NamedDef> {
    raw.into_iter()
        .map(|item| NamedDef {
            id: item.id,
            name: item.name,
        })
        .collect()
}

fn convert_node(raw: RawNode) -> Result<Node, SchemaError> {
    let kind_value = raw.bpmn.kind.as_deref().ok_or(InputError::MissingAttribute {
        id: raw.id.clone(),
        attribute: "bpmn.type",
    })?;
    let kind = NodeKind::parse(kind_value).ok_or_else(|| InputError::UnknownKind {
        id: raw.id.clone(),
        value: kind_value.to_owned(),
    })?;

    let mut node = Node::new(raw.id, kind);
    node.name = raw
        .bpmn
        .name
        .or_else(|| raw.labels.into_iter().find_map(|label| label.text));
    node.x = raw.x;
    node.y = raw.y;
    node.width = raw.width.unwrap_or(0.0);
    node.height = raw.height.unwrap_or(0.0);
    node.is_expanded = raw.bpmn.is_expanded.unwrap_or(false);
    node.event_definition = raw.bpmn.event_definition_kind.unwrap_or_default();
    node.gateway_direction = raw.bpmn.gateway_direction;
    node.default_flow = raw.bpmn.default;
    node.timer_definition = raw.bpmn.timer_definition;
    node.io_specification = raw.bpmn.io_specification.map(convert_io_spec);

    for raw_child in raw.children {
        node.children.push(convert_node(raw_child)?);
    }
    for raw_edge in raw.edges {
        node.edges.push(convert_edge(raw_edge)?);
    }
    for raw_be in raw.boundary_events {
        node.boundary_events.push(convert_boundary(raw_be));
    }
    Ok(node)
}

fn convert_io_spec(raw: RawIoSpec) -> IoSpecification {
    let convert = |items: Vec<RawNamed>| {
        items
            .into_iter()
            .map(|item| DataRef {
                id: item.id,
                name: item.name,
            })
            .collect()
    };
    IoSpecification {
        inputs: convert(raw.data_inputs),
        outputs: convert(raw.data_outputs),
    }
}

fn convert_boundary(raw: RawBoundary) -> BoundaryEvent {
    BoundaryEvent {
        id: raw.id,
        attached_to: raw.attached_to_ref,
        name: raw.bpmn.name,
        event_definition: raw.bpmn.event_definition_kind.unwrap_or_default(),
        // Both spellings appear in the wild; cancelActivity is the BPMN one.
        interrupting: raw
            .cancel_activity
            .or(raw.bpmn.is_interrupting)
            .unwrap_or(true),
        timer_definition: raw.bpmn.timer_definition,
        x: None,
        y: None,
    }
}

fn convert_edge(raw: RawEdge) -> Result<Edge, SchemaError> {
    let source = raw
        .sources
        .first()
        .cloned()
        .ok_or(InputError::MissingAttribute {
            id: raw.id.clone(),
            attribute: "sources",
        })?;
    let target = raw
        .targets
        .first()
        .cloned()
        .ok_or(InputError::MissingAttribute {
            id: raw.id.clone(),
            attribute: "targets",
        })?;
    let kind = match raw.bpmn.kind.as_deref() {
        None => EdgeKind::SequenceFlow,
        Some(value) => EdgeKind::parse(value).ok_or_else(|| InputError::UnknownKind {
            id: raw.id.clone(),
            value: value.to_owned(),
        })?,
    };

    let mut edge = Edge::new(raw.id, source, target, kind);
    edge.name = raw
        .bpmn
        .name
        .or_else(|| raw.labels.into_iter().find_map(|label| label.text));
    edge.condition = raw.condition_expression.and_then(|cond| cond.body);
    Ok(edge)
}

fn parse_spacing(options: &serde_json::Map<String, Value>) -> SpacingHints {
    let mut spacing = SpacingHints::default();
    let read = |key: &str| -> Option<f64> {
        match options.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    };
    if let Some(v) = read("elk.spacing.nodeNode") {
        spacing.node_node = v;
    }
    if let Some(v) = read("elk.spacing.edgeNode") {
        spacing.edge_node = v;
    }
    if let Some(v) = read("elk.spacing.edgeEdge") {
        spacing.edge_edge = v;
    }
    if let Some(v) = read("elk.layered.spacing.nodeNodeBetweenLayers") {
        spacing.layer = v;
    }
    spacing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_process() {
        let json = r##"{
            "id": "root",
            "layoutOptions": { "elk.spacing.nodeNode": "60" },
            "children": [
                {
                    "id": "process_1",
                    "bpmn": { "type": "bpmn:process" },
                    "children": [
                        { "id": "start_1", "bpmn": { "type": "bpmn:startEvent" }, "width": 36, "height": 36 },
                        { "id": "task_a", "bpmn": { "type": "bpmn:userTask", "name": "Review" }, "width": 100, "height": 80 }
                    ],
                    "edges": [
                        { "id": "flow_1", "sources": ["start_1"], "targets": ["task_a"], "bpmn": { "type": "bpmn:sequenceFlow" } }
                    ]
                }
            ]
        }"##;
        let graph = parse_graph(json).unwrap();
        assert_eq!(graph.children.len(), 1);
        let process = &graph.children[0];
        assert_eq!(process.kind, NodeKind::Process);
        assert_eq!(process.children[1].name.as_deref(), Some("Review"));
        assert_eq!(process.edges[0].kind, EdgeKind::SequenceFlow);
        assert_eq!(graph.spacing.node_node, 60.0);
    }

    #[test]
    fn test_parse_boundary_and_condition() {
        let json = r##"{
            "children": [
                {
                    "id": "p",
                    "bpmn": { "type": "bpmn:process" },
                    "children": [
                        {
                            "id": "task_long",
                            "bpmn": { "type": "bpmn:task" },
                            "width": 100, "height": 80,
                            "boundaryEvents": [
                                {
                                    "id": "boundary_timer_1",
                                    "attachedToRef": "task_long",
                                    "bpmn": { "type": "bpmn:boundaryEvent", "eventDefinitionKind": "timer" },
                                    "cancelActivity": false
                                }
                            ]
                        }
                    ],
                    "edges": [
                        {
                            "id": "flow_cond",
                            "sources": ["task_long"], "targets": ["task_long"],
                            "conditionExpression": { "body": "${ok}" }
                        }
                    ]
                }
            ]
        }"##;
        let graph = parse_graph(json).unwrap();
        let task = graph.find("task_long").unwrap();
        let be = &task.boundary_events[0];
        assert_eq!(be.event_definition, EventDefinitionKind::Timer);
        assert!(!be.interrupting);
        assert_eq!(task.edges[0].condition.as_deref(), Some("${ok}"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r##"{
            "children": [ { "id": "x", "bpmn": { "type": "bpmn:flubber" } } ]
        }"##;
        assert!(matches!(
            parse_graph(json),
            Err(SchemaError::Input(InputError::UnknownKind { .. }))
        ));
    }
}
