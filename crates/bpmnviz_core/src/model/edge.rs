use crate::geometry::Point;

/// Kind of connection between two BPMN elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    SequenceFlow,
    MessageFlow,
    Association,
    DataInputAssociation,
    DataOutputAssociation,
}

impl EdgeKind {
    /// Parses an ELK-BPMN `bpmn.type` value such as `"bpmn:sequenceFlow"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let name = value.strip_prefix("bpmn:").unwrap_or(value);
        let kind = match name {
            "sequenceFlow" => Self::SequenceFlow,
            "messageFlow" => Self::MessageFlow,
            "association" => Self::Association,
            "dataInputAssociation" => Self::DataInputAssociation,
            "dataOutputAssociation" => Self::DataOutputAssociation,
            _ => return None,
        };
        Some(kind)
    }

    /// The local XML element name, without the `bpmn:` prefix.
    #[must_use]
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::SequenceFlow => "sequenceFlow",
            Self::MessageFlow => "messageFlow",
            Self::Association => "association",
            Self::DataInputAssociation => "dataInputAssociation",
            Self::DataOutputAssociation => "dataOutputAssociation",
        }
    }
}

/// Routed waypoints of an edge: a start point, an end point and the bends
/// in between.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    pub start: Point,
    pub end: Point,
    pub bends: Vec<Point>,
}

impl Section {
    /// Builds a section from a full waypoint polyline.
    ///
    /// The slice must hold at least two points; interior points become bends.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Self {
        debug_assert!(points.len() >= 2);
        Self {
            start: points[0],
            end: *points.last().unwrap_or(&points[0]),
            bends: points[1..points.len().saturating_sub(1)].to_vec(),
        }
    }

    /// The full polyline: start, bends, end.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.bends.len() + 2);
        points.push(self.start);
        points.extend_from_slice(&self.bends);
        points.push(self.end);
        points
    }

    /// Translates every waypoint by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.start = self.start.translated(dx, dy);
        self.end = self.end.translated(dx, dy);
        for bend in &mut self.bends {
            *bend = bend.translated(dx, dy);
        }
    }
}

/// A connection between two elements, addressed by their string ids.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub name: Option<String>,
    /// Condition expression on a conditional sequence flow.
    pub condition: Option<String>,
    /// Routed waypoints; absent until the first layout pass runs.
    pub section: Option<Section>,
    /// Waypoints are already in the global diagram frame and must be used
    /// verbatim by the coordinate folder.
    pub absolute_coords: bool,
    /// Waypoints are relative to the enclosing pool rather than the source
    /// node's container.
    pub pool_relative_coords: bool,
}

impl Edge {
    /// Creates a sequence flow between two nodes.
    #[must_use]
    pub fn sequence_flow(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(id, source, target, EdgeKind::SequenceFlow)
    }

    /// Creates an edge of the given kind with no waypoints.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            name: None,
            condition: None,
            section: None,
            absolute_coords: false,
            pool_relative_coords: false,
        }
    }
}
