use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::model::edge::Edge;

/// Width and height of a boundary event shape, fixed by the BPMN DI spec.
pub const BOUNDARY_EVENT_SIZE: f64 = 36.0;

/// Kind of event definition carried by an event node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventDefinitionKind {
    #[default]
    None,
    Message,
    Timer,
    Error,
    Signal,
    Escalation,
    Conditional,
    Terminate,
}

/// Declared direction of a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GatewayDirection {
    Diverging,
    Converging,
    Mixed,
    Unspecified,
}

/// Tagged BPMN element kind. Layout decisions switch on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    StartEvent,
    EndEvent,
    IntermediateCatchEvent,
    IntermediateThrowEvent,
    BoundaryEvent,
    Task,
    UserTask,
    ServiceTask,
    ScriptTask,
    SendTask,
    ReceiveTask,
    ManualTask,
    BusinessRuleTask,
    ExclusiveGateway,
    ParallelGateway,
    InclusiveGateway,
    EventBasedGateway,
    SubProcess,
    CallActivity,
    Process,
    Participant,
    Lane,
    DataObjectReference,
    DataStoreReference,
    TextAnnotation,
}

impl NodeKind {
    /// Parses an ELK-BPMN `bpmn.type` value such as `"bpmn:userTask"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let name = value.strip_prefix("bpmn:").unwrap_or(value);
        let kind = match name {
            "startEvent" => Self::StartEvent,
            "endEvent" => Self::EndEvent,
            "intermediateCatchEvent" => Self::IntermediateCatchEvent,
            "intermediateThrowEvent" => Self::IntermediateThrowEvent,
            "boundaryEvent" => Self::BoundaryEvent,
            "task" => Self::Task,
            "userTask" => Self::UserTask,
            "serviceTask" => Self::ServiceTask,
            "scriptTask" => Self::ScriptTask,
            "sendTask" => Self::SendTask,
            "receiveTask" => Self::ReceiveTask,
            "manualTask" => Self::ManualTask,
            "businessRuleTask" => Self::BusinessRuleTask,
            "exclusiveGateway" => Self::ExclusiveGateway,
            "parallelGateway" => Self::ParallelGateway,
            "inclusiveGateway" => Self::InclusiveGateway,
            "eventBasedGateway" => Self::EventBasedGateway,
            "subProcess" => Self::SubProcess,
            "callActivity" => Self::CallActivity,
            "process" => Self::Process,
            "participant" => Self::Participant,
            "lane" => Self::Lane,
            "dataObjectReference" => Self::DataObjectReference,
            "dataStoreReference" => Self::DataStoreReference,
            "textAnnotation" => Self::TextAnnotation,
            _ => return None,
        };
        Some(kind)
    }

    /// The local XML element name, without the `bpmn:` prefix.
    #[must_use]
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::StartEvent => "startEvent",
            Self::EndEvent => "endEvent",
            Self::IntermediateCatchEvent => "intermediateCatchEvent",
            Self::IntermediateThrowEvent => "intermediateThrowEvent",
            Self::BoundaryEvent => "boundaryEvent",
            Self::Task => "task",
            Self::UserTask => "userTask",
            Self::ServiceTask => "serviceTask",
            Self::ScriptTask => "scriptTask",
            Self::SendTask => "sendTask",
            Self::ReceiveTask => "receiveTask",
            Self::ManualTask => "manualTask",
            Self::BusinessRuleTask => "businessRuleTask",
            Self::ExclusiveGateway => "exclusiveGateway",
            Self::ParallelGateway => "parallelGateway",
            Self::InclusiveGateway => "inclusiveGateway",
            Self::EventBasedGateway => "eventBasedGateway",
            Self::SubProcess => "subProcess",
            Self::CallActivity => "callActivity",
            Self::Process => "process",
            Self::Participant => "participant",
            Self::Lane => "lane",
            Self::DataObjectReference => "dataObjectReference",
            Self::DataStoreReference => "dataStoreReference",
            Self::TextAnnotation => "textAnnotation",
        }
    }

    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            Self::StartEvent
                | Self::EndEvent
                | Self::IntermediateCatchEvent
                | Self::IntermediateThrowEvent
                | Self::BoundaryEvent
        )
    }

    #[must_use]
    pub fn is_task(&self) -> bool {
        matches!(
            self,
            Self::Task
                | Self::UserTask
                | Self::ServiceTask
                | Self::ScriptTask
                | Self::SendTask
                | Self::ReceiveTask
                | Self::ManualTask
                | Self::BusinessRuleTask
        )
    }

    #[must_use]
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            Self::ExclusiveGateway
                | Self::ParallelGateway
                | Self::InclusiveGateway
                | Self::EventBasedGateway
        )
    }

    /// Whether nodes of this kind take part in sequence-flow layout.
    #[must_use]
    pub fn is_flow_node(&self) -> bool {
        self.is_event() && *self != Self::BoundaryEvent
            || self.is_task()
            || self.is_gateway()
            || matches!(self, Self::SubProcess | Self::CallActivity)
    }

    /// Whether this kind may carry children of its own.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Process | Self::Participant | Self::Lane | Self::SubProcess
        )
    }

    /// Default width and height for the kind, per the BPMN DI conventions.
    ///
    /// Expanded subprocesses start at their minimum size and grow to fit
    /// their content once children are laid out.
    #[must_use]
    pub fn default_size(&self, expanded: bool) -> (f64, f64) {
        match self {
            k if k.is_event() => (36.0, 36.0),
            k if k.is_gateway() => (50.0, 50.0),
            Self::SubProcess if expanded => (300.0, 200.0),
            k if k.is_task() || matches!(k, Self::SubProcess | Self::CallActivity) => (100.0, 80.0),
            Self::DataObjectReference => (36.0, 50.0),
            Self::DataStoreReference => (50.0, 50.0),
            Self::TextAnnotation => (100.0, 30.0),
            Self::Participant => (600.0, 250.0),
            Self::Lane => (600.0, 120.0),
            Self::Process => (600.0, 250.0),
            Self::BoundaryEvent => (BOUNDARY_EVENT_SIZE, BOUNDARY_EVENT_SIZE),
            _ => unreachable!(),
        }
    }
}

/// A named data input or output declared on a task's ioSpecification.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRef {
    pub id: String,
    pub name: Option<String>,
}

/// Data inputs and outputs attached to a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoSpecification {
    pub inputs: Vec<DataRef>,
    pub outputs: Vec<DataRef>,
}

impl IoSpecification {
    /// Extra layout height claimed by the taller data stack rendered below
    /// the host: 36×50 shapes with 24 px spacing, 12 px off the host.
    #[must_use]
    pub fn stack_height(&self) -> f64 {
        let count = self.inputs.len().max(self.outputs.len());
        if count == 0 {
            return 0.0;
        }
        12.0 + count as f64 * 50.0 + (count as f64 - 1.0) * 24.0
    }
}

/// An event attached to the border of a host task or subprocess.
#[derive(Debug, Clone)]
pub struct BoundaryEvent {
    pub id: String,
    /// Id of the host node this event is attached to.
    pub attached_to: String,
    pub name: Option<String>,
    pub event_definition: EventDefinitionKind,
    /// Interrupting boundary events cancel the host when triggered.
    pub interrupting: bool,
    /// Timer expression, for timer definitions.
    pub timer_definition: Option<String>,
    /// Position assigned during layout, local to the host's container.
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl BoundaryEvent {
    /// Bounds of the event shape once positioned.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(
            self.x?,
            self.y?,
            BOUNDARY_EVENT_SIZE,
            BOUNDARY_EVENT_SIZE,
        ))
    }
}

/// A BPMN element in the process tree.
///
/// Coordinates are local to the nearest offsetting ancestor (pool, lane,
/// expanded subprocess, or process-directly-in-pool); the diagram builder
/// folds them to absolute coordinates at the end of the pipeline.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: f64,
    pub height: f64,
    /// Rendered height when smaller than the layout height, e.g. a task
    /// whose layout slot includes stacked data shapes below it.
    pub visual_height: Option<f64>,
    /// Child elements, ordered. Only structural kinds carry children.
    pub children: Vec<Node>,
    /// Edges owned by this container (sequence flows, associations).
    pub edges: Vec<Edge>,
    /// Boundary events attached to this node.
    pub boundary_events: Vec<BoundaryEvent>,
    /// Whether a subprocess renders expanded.
    pub is_expanded: bool,
    pub event_definition: EventDefinitionKind,
    pub gateway_direction: Option<GatewayDirection>,
    /// Id of the default outgoing sequence flow on a diverging gateway.
    pub default_flow: Option<String>,
    pub timer_definition: Option<String>,
    pub io_specification: Option<IoSpecification>,
}

impl Node {
    /// Creates a node of the given kind with its default size and no position.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let (width, height) = kind.default_size(false);
        Self {
            id: id.into(),
            kind,
            name: None,
            x: None,
            y: None,
            width,
            height,
            visual_height: None,
            children: Vec::new(),
            edges: Vec::new(),
            boundary_events: Vec::new(),
            is_expanded: false,
            event_definition: EventDefinitionKind::None,
            gateway_direction: None,
            default_flow: None,
            timer_definition: None,
            io_specification: None,
        }
    }

    /// Bounds of the node, once both coordinates are assigned.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(self.x?, self.y?, self.width, self.height))
    }

    /// Height used for rendering, which may be smaller than the layout
    /// height when data shapes are stacked below the node.
    #[must_use]
    pub fn visual_bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(
            self.x?,
            self.y?,
            self.width,
            self.visual_height.unwrap_or(self.height),
        ))
    }

    /// Whether this node offsets its children's coordinates.
    ///
    /// `parent_is_pool` distinguishes a process nested directly inside a
    /// participant (which offsets) from a top-level process (which does not).
    #[must_use]
    pub fn is_offsetting_container(&self, parent_is_pool: bool) -> bool {
        match self.kind {
            NodeKind::Participant | NodeKind::Lane => true,
            NodeKind::SubProcess => self.is_expanded,
            NodeKind::Process => parent_is_pool,
            _ => false,
        }
    }

    /// Recursively searches this subtree for a node with the given id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable variant of [`Node::find`].
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }
}
