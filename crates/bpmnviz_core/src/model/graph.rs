use indexmap::IndexMap;

use crate::errors::InputError;
use crate::model::edge::{Edge, EdgeKind};
use crate::model::node::{Node, NodeKind};

/// A named global definition (message, signal, error or escalation).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedDef {
    pub id: String,
    pub name: Option<String>,
}

/// Layer and spacing hints parsed from the input's `layoutOptions`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacingHints {
    /// Space between nodes in the same layer.
    pub node_node: f64,
    /// Space between an edge and a node.
    pub edge_node: f64,
    /// Space between parallel edges.
    pub edge_edge: f64,
    /// Space between consecutive layers.
    pub layer: f64,
}

impl Default for SpacingHints {
    fn default() -> Self {
        Self {
            node_node: 60.0,
            edge_node: 40.0,
            edge_edge: 25.0,
            layer: 100.0,
        }
    }
}

/// The root of a BPMN process graph, before and after layout.
///
/// Children are either participants (a collaboration) or the flow nodes of a
/// single process. Edges at this level are message flows; sequence flows live
/// on the container that owns both endpoints.
#[derive(Debug, Clone, Default)]
pub struct BpmnGraph {
    pub id: String,
    pub children: Vec<Node>,
    pub edges: Vec<Edge>,
    pub messages: Vec<NamedDef>,
    pub signals: Vec<NamedDef>,
    pub errors: Vec<NamedDef>,
    pub escalations: Vec<NamedDef>,
    pub spacing: SpacingHints,
}

/// Flattened per-element facts used by validation and the diagram builder.
#[derive(Debug, Clone)]
pub struct ElementInfo {
    pub kind: NodeKind,
    /// Id of the enclosing participant, when inside a collaboration.
    pub pool: Option<String>,
    /// Whether the element is a boundary event rather than a regular node.
    pub is_boundary: bool,
}

impl BpmnGraph {
    /// Whether the graph is a collaboration of pools.
    #[must_use]
    pub fn is_collaboration(&self) -> bool {
        self.children
            .iter()
            .any(|child| child.kind == NodeKind::Participant)
    }

    /// Recursively searches the whole tree for a node.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Node> {
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable variant of [`BpmnGraph::find`].
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Builds an id → [`ElementInfo`] index over every node and boundary
    /// event in the tree. Insertion order follows document order.
    #[must_use]
    pub fn element_index(&self) -> IndexMap<String, ElementInfo> {
        let mut index = IndexMap::new();
        for child in &self.children {
            let pool = (child.kind == NodeKind::Participant).then(|| child.id.clone());
            collect_elements(child, pool.as_deref(), &mut index);
        }
        index
    }

    /// Applies kind-default dimensions wherever the input left width or
    /// height unset (zero).
    pub fn apply_default_sizes(&mut self) {
        for child in &mut self.children {
            apply_sizes(child);
        }
    }

    /// Validates the structural invariants the layout pipeline relies on.
    ///
    /// Runs before any layout work; the first violation found is returned.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.children.is_empty() {
            return Err(InputError::EmptyGraph);
        }

        let index = self.element_index();
        {
            // element_index deduplicates by construction; re-walk to catch
            // ids that collided while building it.
            let mut seen = indexmap::IndexSet::new();
            let mut duplicate = None;
            for child in &self.children {
                find_duplicate(child, &mut seen, &mut duplicate);
            }
            if let Some(id) = duplicate {
                return Err(InputError::DuplicateId { id });
            }
        }

        let mut all_edges: Vec<&Edge> = self.edges.iter().collect();
        for child in &self.children {
            collect_edges(child, &mut all_edges);
        }

        for edge in &all_edges {
            for endpoint in [&edge.source, &edge.target] {
                if !index.contains_key(endpoint.as_str()) {
                    return Err(InputError::DanglingReference {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            let source_pool = index[edge.source.as_str()].pool.clone();
            let target_pool = index[edge.target.as_str()].pool.clone();
            match edge.kind {
                EdgeKind::MessageFlow => {
                    if source_pool == target_pool {
                        return Err(InputError::MessageFlowWithinPool {
                            id: edge.id.clone(),
                        });
                    }
                }
                EdgeKind::SequenceFlow => {
                    if source_pool != target_pool {
                        return Err(InputError::SequenceFlowAcrossPools {
                            id: edge.id.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        for child in &self.children {
            validate_node(child, &index, &all_edges)?;
        }
        Ok(())
    }
}

fn collect_elements(node: &Node, pool: Option<&str>, index: &mut IndexMap<String, ElementInfo>) {
    index.insert(
        node.id.clone(),
        ElementInfo {
            kind: node.kind,
            pool: pool.map(str::to_owned),
            is_boundary: false,
        },
    );
    for be in &node.boundary_events {
        index.insert(
            be.id.clone(),
            ElementInfo {
                kind: NodeKind::BoundaryEvent,
                pool: pool.map(str::to_owned),
                is_boundary: true,
            },
        );
    }
    let pool = if node.kind == NodeKind::Participant {
        Some(node.id.as_str())
    } else {
        pool
    };
    for child in &node.children {
        collect_elements(child, pool, index);
    }
}

fn collect_edges<'a>(node: &'a Node, out: &mut Vec<&'a Edge>) {
    out.extend(node.edges.iter());
    for child in &node.children {
        collect_edges(child, out);
    }
}

fn find_duplicate(
    node: &Node,
    seen: &mut indexmap::IndexSet<String>,
    duplicate: &mut Option<String>,
) {
    if duplicate.is_some() {
        return;
    }
    if !seen.insert(node.id.clone()) {
        *duplicate = Some(node.id.clone());
        return;
    }
    for be in &node.boundary_events {
        if !seen.insert(be.id.clone()) {
            *duplicate = Some(be.id.clone());
            return;
        }
    }
    for child in &node.children {
        find_duplicate(child, seen, duplicate);
    }
}

fn apply_sizes(node: &mut Node) {
    let (w, h) = node.kind.default_size(node.is_expanded);
    if node.width <= 0.0 {
        node.width = w;
    }
    if node.height <= 0.0 {
        node.height = h;
    }
    for child in &mut node.children {
        apply_sizes(child);
    }
}

fn validate_node(
    node: &Node,
    index: &IndexMap<String, ElementInfo>,
    all_edges: &[&Edge],
) -> Result<(), InputError> {
    if node.id.is_empty() {
        return Err(InputError::MissingAttribute {
            id: String::from("<unnamed>"),
            attribute: "id",
        });
    }

    for be in &node.boundary_events {
        match index.get(be.attached_to.as_str()) {
            None => {
                return Err(InputError::DanglingAttachment {
                    id: be.id.clone(),
                    attached_to: be.attached_to.clone(),
                });
            }
            Some(info) if info.is_boundary => {
                return Err(InputError::BoundaryAttachedToBoundary { id: be.id.clone() });
            }
            Some(_) => {}
        }
    }

    match node.kind {
        NodeKind::StartEvent => {
            let incoming = all_edges.iter().any(|edge| {
                edge.kind == EdgeKind::SequenceFlow && edge.target == node.id
            });
            if incoming {
                return Err(InputError::StartWithIncoming {
                    id: node.id.clone(),
                });
            }
        }
        NodeKind::EndEvent => {
            let outgoing = all_edges.iter().any(|edge| {
                edge.kind == EdgeKind::SequenceFlow && edge.source == node.id
            });
            if outgoing {
                return Err(InputError::EndWithOutgoing {
                    id: node.id.clone(),
                });
            }
        }
        _ => {}
    }

    for child in &node.children {
        validate_node(child, index, all_edges)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::NodeKind;

    fn linear_graph() -> BpmnGraph {
        let mut process = Node::new("process_1", NodeKind::Process);
        process.children = vec![
            Node::new("start_1", NodeKind::StartEvent),
            Node::new("task_a", NodeKind::Task),
            Node::new("end_1", NodeKind::EndEvent),
        ];
        process.edges = vec![
            Edge::sequence_flow("flow_1", "start_1", "task_a"),
            Edge::sequence_flow("flow_2", "task_a", "end_1"),
        ];
        BpmnGraph {
            id: "root".into(),
            children: vec![process],
            ..BpmnGraph::default()
        }
    }

    #[test]
    fn test_validate_accepts_linear_graph() {
        assert!(linear_graph().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_edge() {
        let mut graph = linear_graph();
        graph.children[0]
            .edges
            .push(Edge::sequence_flow("flow_bad", "task_a", "missing"));
        assert!(matches!(
            graph.validate(),
            Err(InputError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_incoming_into_start() {
        let mut graph = linear_graph();
        graph.children[0]
            .edges
            .push(Edge::sequence_flow("flow_back", "task_a", "start_1"));
        assert!(matches!(
            graph.validate(),
            Err(InputError::StartWithIncoming { .. })
        ));
    }

    #[test]
    fn test_default_sizes_applied_by_kind() {
        let mut graph = linear_graph();
        graph.children[0].children[0].width = 0.0;
        graph.children[0].children[0].height = 0.0;
        graph.apply_default_sizes();
        let start = graph.find("start_1").unwrap();
        assert_eq!((start.width, start.height), (36.0, 36.0));
    }
}
