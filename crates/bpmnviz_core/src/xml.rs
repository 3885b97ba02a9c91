//! BPMN 2.0 XML serialization.
//!
//! Writes `bpmn:definitions` with the semantic collaboration or process
//! tree followed by the `bpmndi:BPMNDiagram` plane carrying shape bounds,
//! edge waypoints and label bounds.

use std::fmt::Write;

use crate::diagram::{BpmnDocument, DiagramPlane};
use crate::model::{BpmnGraph, Edge, EdgeKind, EventDefinitionKind, NamedDef, Node, NodeKind};

/// Escapes a string for use in XML attribute and text content.
#[must_use]
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serializes a laid-out document to BPMN 2.0 XML.
pub fn write_bpmn(document: &BpmnDocument) -> Result<String, std::fmt::Error> {
    let graph = &document.definitions;
    let mut xml = String::new();

    writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        xml,
        r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL""#
    )?;
    writeln!(
        xml,
        r#"                  xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI""#
    )?;
    writeln!(
        xml,
        r#"                  xmlns:dc="http://www.omg.org/spec/DD/20100524/DC""#
    )?;
    writeln!(
        xml,
        r#"                  xmlns:di="http://www.omg.org/spec/DD/20100524/DI""#
    )?;
    writeln!(
        xml,
        r#"                  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#
    )?;
    writeln!(
        xml,
        r#"                  id="{}_definitions" targetNamespace="http://bpmn.io/schema/bpmn">"#,
        xml_escape(&graph.id)
    )?;

    write_globals(&mut xml, "message", &graph.messages)?;
    write_globals(&mut xml, "signal", &graph.signals)?;
    write_globals(&mut xml, "error", &graph.errors)?;
    write_globals(&mut xml, "escalation", &graph.escalations)?;

    if graph.is_collaboration() {
        write_collaboration(&mut xml, graph)?;
        for pool in &graph.children {
            if pool.kind != NodeKind::Participant {
                continue;
            }
            for process in processes_of(pool) {
                write_process(&mut xml, &process.0, process.1, 1)?;
            }
        }
    } else {
        for child in &graph.children {
            if child.kind == NodeKind::Process {
                write_process(&mut xml, &child.id, child, 1)?;
            }
        }
    }

    write_diagram(&mut xml, graph, &document.plane)?;
    writeln!(xml, "</bpmn:definitions>")?;
    Ok(xml)
}

fn write_globals(xml: &mut String, tag: &str, defs: &[NamedDef]) -> std::fmt::Result {
    for def in defs {
        let name = def
            .name
            .as_deref()
            .map(|n| format!(r#" name="{}""#, xml_escape(n)))
            .unwrap_or_default();
        writeln!(xml, r#"  <bpmn:{tag} id="{}"{name} />"#, xml_escape(&def.id))?;
    }
    Ok(())
}

/// The process element(s) a participant refers to: either its explicit
/// nested process or a synthesized one wrapping the pool's direct content.
fn processes_of(pool: &Node) -> Vec<(String, &Node)> {
    if pool.children.len() == 1 && pool.children[0].kind == NodeKind::Process {
        vec![(pool.children[0].id.clone(), &pool.children[0])]
    } else {
        vec![(format!("{}_process", pool.id), pool)]
    }
}

fn write_collaboration(xml: &mut String, graph: &BpmnGraph) -> std::fmt::Result {
    writeln!(
        xml,
        r#"  <bpmn:collaboration id="{}_collaboration">"#,
        xml_escape(&graph.id)
    )?;
    for pool in &graph.children {
        if pool.kind != NodeKind::Participant {
            continue;
        }
        let name = pool
            .name
            .as_deref()
            .map(|n| format!(r#" name="{}""#, xml_escape(n)))
            .unwrap_or_default();
        let process_ref = processes_of(pool)[0].0.clone();
        writeln!(
            xml,
            r#"    <bpmn:participant id="{}"{name} processRef="{}" />"#,
            xml_escape(&pool.id),
            xml_escape(&process_ref)
        )?;
    }
    for edge in &graph.edges {
        if edge.kind == EdgeKind::MessageFlow {
            write_edge_element(xml, edge, 2)?;
        }
    }
    writeln!(xml, "  </bpmn:collaboration>")?;
    Ok(())
}

fn write_process(xml: &mut String, id: &str, container: &Node, depth: usize) -> std::fmt::Result {
    let pad = "  ".repeat(depth);
    writeln!(
        xml,
        r#"{pad}<bpmn:process id="{}" isExecutable="true">"#,
        xml_escape(id)
    )?;

    let lanes: Vec<&Node> = container
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Lane)
        .collect();
    if !lanes.is_empty() {
        writeln!(xml, r#"{pad}  <bpmn:laneSet id="{}_lanes">"#, xml_escape(id))?;
        for lane in &lanes {
            let name = lane
                .name
                .as_deref()
                .map(|n| format!(r#" name="{}""#, xml_escape(n)))
                .unwrap_or_default();
            writeln!(
                xml,
                r#"{pad}    <bpmn:lane id="{}"{name}>"#,
                xml_escape(&lane.id)
            )?;
            for child in &lane.children {
                writeln!(
                    xml,
                    r#"{pad}      <bpmn:flowNodeRef>{}</bpmn:flowNodeRef>"#,
                    xml_escape(&child.id)
                )?;
            }
            writeln!(xml, r#"{pad}    </bpmn:lane>"#)?;
        }
        writeln!(xml, r#"{pad}  </bpmn:laneSet>"#)?;
    }

    write_container_content(xml, container, depth + 1)?;
    writeln!(xml, "{pad}</bpmn:process>")?;
    Ok(())
}

/// Flow nodes, nested containers and sequence flows of one container. Lane
/// content is flattened into the owning process, as BPMN requires.
fn write_container_content(xml: &mut String, container: &Node, depth: usize) -> std::fmt::Result {
    for child in &container.children {
        match child.kind {
            NodeKind::Lane => write_container_content(xml, child, depth)?,
            NodeKind::Process => write_container_content(xml, child, depth)?,
            _ => write_flow_node(xml, child, depth)?,
        }
    }
    let edge_containers = std::iter::once(container).chain(
        container
            .children
            .iter()
            .filter(|c| matches!(c.kind, NodeKind::Lane | NodeKind::Process)),
    );
    for owner in edge_containers {
        for edge in &owner.edges {
            write_edge_element(xml, edge, depth)?;
        }
    }
    Ok(())
}

fn write_flow_node(xml: &mut String, node: &Node, depth: usize) -> std::fmt::Result {
    let pad = "  ".repeat(depth);
    let tag = node.kind.xml_name();
    let name = node
        .name
        .as_deref()
        .map(|n| format!(r#" name="{}""#, xml_escape(n)))
        .unwrap_or_default();

    let mut attrs = String::new();
    if node.kind.is_gateway() {
        if let Some(default) = node.default_flow.as_deref() {
            write!(attrs, r#" default="{}""#, xml_escape(default))?;
        }
    }

    let event_def = event_definition_tag(node.event_definition);
    let has_body = event_def.is_some()
        || node.timer_definition.is_some()
        || (node.kind == NodeKind::SubProcess && !node.children.is_empty())
        || node.kind == NodeKind::TextAnnotation;

    if !has_body {
        writeln!(
            xml,
            r#"{pad}<bpmn:{tag} id="{}"{name}{attrs} />"#,
            xml_escape(&node.id)
        )?;
    } else {
        writeln!(
            xml,
            r#"{pad}<bpmn:{tag} id="{}"{name}{attrs}>"#,
            xml_escape(&node.id)
        )?;
        if node.kind == NodeKind::TextAnnotation {
            writeln!(
                xml,
                r#"{pad}  <bpmn:text>{}</bpmn:text>"#,
                xml_escape(node.name.as_deref().unwrap_or_default())
            )?;
        }
        write_event_definition(xml, node.event_definition, node.timer_definition.as_deref(), depth + 1)?;
        if node.kind == NodeKind::SubProcess {
            write_container_content(xml, node, depth + 1)?;
        }
        writeln!(xml, r#"{pad}</bpmn:{tag}>"#)?;
    }

    for be in &node.boundary_events {
        let be_name = be
            .name
            .as_deref()
            .map(|n| format!(r#" name="{}""#, xml_escape(n)))
            .unwrap_or_default();
        let cancel = if be.interrupting {
            String::new()
        } else {
            r#" cancelActivity="false""#.to_owned()
        };
        writeln!(
            xml,
            r#"{pad}<bpmn:boundaryEvent id="{}"{be_name} attachedToRef="{}"{cancel}>"#,
            xml_escape(&be.id),
            xml_escape(&be.attached_to)
        )?;
        write_event_definition(xml, be.event_definition, be.timer_definition.as_deref(), depth + 1)?;
        writeln!(xml, r#"{pad}</bpmn:boundaryEvent>"#)?;
    }
    Ok(())
}

fn event_definition_tag(kind: EventDefinitionKind) -> Option<&'static str> {
    match kind {
        EventDefinitionKind::None => None,
        EventDefinitionKind::Message => Some("messageEventDefinition"),
        EventDefinitionKind::Timer => Some("timerEventDefinition"),
        EventDefinitionKind::Error => Some("errorEventDefinition"),
        EventDefinitionKind::Signal => Some("signalEventDefinition"),
        EventDefinitionKind::Escalation => Some("escalationEventDefinition"),
        EventDefinitionKind::Conditional => Some("conditionalEventDefinition"),
        EventDefinitionKind::Terminate => Some("terminateEventDefinition"),
    }
}

fn write_event_definition(
    xml: &mut String,
    kind: EventDefinitionKind,
    timer: Option<&str>,
    depth: usize,
) -> std::fmt::Result {
    let Some(tag) = event_definition_tag(kind) else {
        return Ok(());
    };
    let pad = "  ".repeat(depth);
    match (kind, timer) {
        (EventDefinitionKind::Timer, Some(expr)) => {
            writeln!(xml, r#"{pad}<bpmn:{tag}>"#)?;
            writeln!(
                xml,
                r#"{pad}  <bpmn:timeDuration xsi:type="bpmn:tFormalExpression">{}</bpmn:timeDuration>"#,
                xml_escape(expr)
            )?;
            writeln!(xml, r#"{pad}</bpmn:{tag}>"#)?;
        }
        _ => writeln!(xml, r#"{pad}<bpmn:{tag} />"#)?,
    }
    Ok(())
}

fn write_edge_element(xml: &mut String, edge: &Edge, depth: usize) -> std::fmt::Result {
    let pad = "  ".repeat(depth);
    let tag = edge.kind.xml_name();
    let name = edge
        .name
        .as_deref()
        .map(|n| format!(r#" name="{}""#, xml_escape(n)))
        .unwrap_or_default();
    match edge.condition.as_deref() {
        None => writeln!(
            xml,
            r#"{pad}<bpmn:{tag} id="{}"{name} sourceRef="{}" targetRef="{}" />"#,
            xml_escape(&edge.id),
            xml_escape(&edge.source),
            xml_escape(&edge.target)
        )?,
        Some(condition) => {
            writeln!(
                xml,
                r#"{pad}<bpmn:{tag} id="{}"{name} sourceRef="{}" targetRef="{}">"#,
                xml_escape(&edge.id),
                xml_escape(&edge.source),
                xml_escape(&edge.target)
            )?;
            writeln!(
                xml,
                r#"{pad}  <bpmn:conditionExpression xsi:type="bpmn:tFormalExpression">{}</bpmn:conditionExpression>"#,
                xml_escape(condition)
            )?;
            writeln!(xml, r#"{pad}</bpmn:{tag}>"#)?;
        }
    }
    Ok(())
}

fn write_diagram(xml: &mut String, graph: &BpmnGraph, plane: &DiagramPlane) -> std::fmt::Result {
    let plane_element = if graph.is_collaboration() {
        format!("{}_collaboration", graph.id)
    } else {
        graph
            .children
            .iter()
            .find(|c| c.kind == NodeKind::Process)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| graph.id.clone())
    };

    writeln!(
        xml,
        r#"  <bpmndi:BPMNDiagram id="{}_diagram">"#,
        xml_escape(&graph.id)
    )?;
    writeln!(
        xml,
        r#"    <bpmndi:BPMNPlane id="{}_plane" bpmnElement="{}">"#,
        xml_escape(&graph.id),
        xml_escape(&plane_element)
    )?;

    for shape in &plane.shapes {
        let mut attrs = String::new();
        if shape.is_horizontal {
            attrs.push_str(r#" isHorizontal="true""#);
        }
        if let Some(expanded) = shape.is_expanded {
            write!(attrs, r#" isExpanded="{expanded}""#)?;
        }
        writeln!(
            xml,
            r#"      <bpmndi:BPMNShape id="{0}_di" bpmnElement="{0}"{attrs}>"#,
            xml_escape(&shape.element)
        )?;
        let b = shape.bounds;
        writeln!(
            xml,
            r#"        <dc:Bounds x="{}" y="{}" width="{}" height="{}" />"#,
            b.x, b.y, b.width, b.height
        )?;
        if let Some(label) = &shape.label {
            writeln!(xml, r#"        <bpmndi:BPMNLabel>"#)?;
            let lb = label.bounds;
            writeln!(
                xml,
                r#"          <dc:Bounds x="{}" y="{}" width="{}" height="{}" />"#,
                lb.x, lb.y, lb.width, lb.height
            )?;
            writeln!(xml, r#"        </bpmndi:BPMNLabel>"#)?;
        }
        writeln!(xml, r#"      </bpmndi:BPMNShape>"#)?;
    }

    for edge in &plane.edges {
        writeln!(
            xml,
            r#"      <bpmndi:BPMNEdge id="{0}_di" bpmnElement="{0}">"#,
            xml_escape(&edge.element)
        )?;
        for point in &edge.waypoints {
            writeln!(
                xml,
                r#"        <di:waypoint x="{}" y="{}" />"#,
                point.x, point.y
            )?;
        }
        if let Some(label) = &edge.label {
            writeln!(xml, r#"        <bpmndi:BPMNLabel>"#)?;
            let lb = label.bounds;
            writeln!(
                xml,
                r#"          <dc:Bounds x="{}" y="{}" width="{}" height="{}" />"#,
                lb.x, lb.y, lb.width, lb.height
            )?;
            writeln!(xml, r#"        </bpmndi:BPMNLabel>"#)?;
        }
        writeln!(xml, r#"      </bpmndi:BPMNEdge>"#)?;
    }

    writeln!(xml, r#"    </bpmndi:BPMNPlane>"#)?;
    writeln!(xml, r#"  </bpmndi:BPMNDiagram>"#)?;
    Ok(())
}
