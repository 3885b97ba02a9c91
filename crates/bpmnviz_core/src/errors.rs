use thiserror::Error;

use crate::layout::pipeline::Stage;

/// Validation failure detected before any layout work starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("graph has no children")]
    EmptyGraph,
    #[error("node {id} is missing required attribute {attribute}")]
    MissingAttribute { id: String, attribute: &'static str },
    #[error("duplicate node id {id}")]
    DuplicateId { id: String },
    #[error("edge {edge} references unknown node {node}")]
    DanglingReference { edge: String, node: String },
    #[error("boundary event {id} is attached to unknown node {attached_to}")]
    DanglingAttachment { id: String, attached_to: String },
    #[error("boundary event {id} is attached to another boundary event")]
    BoundaryAttachedToBoundary { id: String },
    #[error("start event {id} has incoming sequence flows")]
    StartWithIncoming { id: String },
    #[error("end event {id} has outgoing sequence flows")]
    EndWithOutgoing { id: String },
    #[error("message flow {id} connects nodes inside the same pool")]
    MessageFlowWithinPool { id: String },
    #[error("sequence flow {id} crosses pool boundaries")]
    SequenceFlowAcrossPools { id: String },
    #[error("unknown bpmn type {value:?} on element {id}")]
    UnknownKind { id: String, value: String },
}

/// Classes of solver constraints, reported when a system fails to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintClass {
    Alignment,
    Ordering,
    Fixed,
    Containment,
    Distance,
}

impl std::fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConstraintClass::Alignment => "alignment",
            ConstraintClass::Ordering => "ordering",
            ConstraintClass::Fixed => "fixed-position",
            ConstraintClass::Containment => "containment",
            ConstraintClass::Distance => "min-distance",
        };
        f.write_str(name)
    }
}

/// Error surfaced by the layout pipeline.
///
/// Only [`LayoutError::Input`] and [`LayoutError::InternalInvariant`] abort a
/// run in practice. Routing failures fall back to a straight segment and
/// unsatisfiable constraint systems fall back to the suggested positions;
/// both are reported through these variants only when no fallback exists.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
    #[error("constraint system unsatisfiable in stage {stage}: {dominant} constraints dominated")]
    Unsatisfiable {
        stage: Stage,
        dominant: ConstraintClass,
    },
    #[error("no route found for edge {edge}")]
    Routing { edge: String },
    #[error("invariant violated in stage {stage}: {message}")]
    InternalInvariant { stage: Stage, message: String },
}

impl LayoutError {
    /// Creates an [`LayoutError::InternalInvariant`] for the given stage.
    #[must_use]
    pub fn invariant(stage: Stage, message: impl Into<String>) -> Self {
        Self::InternalInvariant {
            stage,
            message: message.into(),
        }
    }
}
