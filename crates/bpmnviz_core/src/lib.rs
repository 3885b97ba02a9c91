//! Layout engine turning hierarchical BPMN process graphs into fully
//! positioned BPMN 2.0 diagrams.
//!
//! The input is an ELK-BPMN JSON graph without positions; the output is a
//! BPMN 2.0 XML document containing both the semantic tree and the DI plane
//! with node bounds, orthogonal edge waypoints and label bounds. The
//! [`layout::pipeline::Pipeline`] drives the stages: layered first pass,
//! boundary-event post-processing, gateway propagation, main-flow
//! normalization, edge fixing, optional compaction and solver refinement,
//! then coordinate folding into the diagram model.

pub mod diagram;
pub mod errors;
pub mod geometry;
pub mod layered;
pub mod layout;
pub mod model;
pub mod solver;
pub mod xml;

use thiserror::Error;

pub use diagram::{BpmnDocument, DiagramPlane};
pub use errors::{InputError, LayoutError};
pub use layout::LayoutOptions;
pub use layout::pipeline::Pipeline;
pub use model::{BpmnGraph, parse_graph};

/// Failure while converting a JSON document to BPMN XML.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Schema(#[from] model::SchemaError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("serialization failed: {0}")]
    Serialize(#[from] std::fmt::Error),
}

/// One-call conversion: parse, validate, lay out, serialize.
pub fn convert(json: &str, options: LayoutOptions) -> Result<String, ConvertError> {
    let graph = model::parse_graph(json)?;
    let document = Pipeline::new(options).to_bpmn(graph)?;
    Ok(xml::write_bpmn(&document)?)
}
