pub mod edge;
pub mod graph;
pub mod node;
pub mod schema;

pub use edge::{Edge, EdgeKind, Section};
pub use graph::{BpmnGraph, ElementInfo, NamedDef, SpacingHints};
pub use node::{
    BoundaryEvent, DataRef, EventDefinitionKind, GatewayDirection, IoSpecification, Node, NodeKind,
};
pub use schema::{SchemaError, parse_graph};
