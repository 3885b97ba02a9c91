//! The coordinate folder and diagram assembler.
//!
//! Walks the laid-out tree depth-first with running absolute offsets,
//! records shape bounds and the offset every node was translated by, then
//! translates edge waypoints, projects gateway endpoints, clamps entries
//! into reduced-height shapes and places all labels.

use indexmap::{IndexMap, IndexSet};

use crate::geometry::{Bounds, ORTHO_EPS, Point, Side};
use crate::layout::LayoutOptions;
use crate::layout::edge_fix::{ensure_orthogonal_waypoints, ensure_perpendicular_endpoints};
use crate::layout::gateway::adjust_gateway_endpoint;
use crate::layout::pathfind::collapse_collinear;
use crate::model::{BpmnGraph, Edge, EdgeKind, Node, NodeKind};

use super::{BpmnDocument, DiagramEdge, DiagramPlane, DiagramShape, labels};

/// Size of a generated data input/output shape.
const DATA_SHAPE: (f64, f64) = (36.0, 50.0);

/// Vertical spacing between stacked data shapes.
const DATA_STACK_GAP: f64 = 24.0;

/// Gap between a task's visual bottom and the first stacked data shape.
const DATA_STACK_OFFSET: f64 = 12.0;

#[derive(Default)]
struct Folder {
    shapes: Vec<DiagramShape>,
    edges: Vec<DiagramEdge>,
    /// Absolute layout bounds per element.
    absolute: IndexMap<String, Bounds>,
    /// Absolute rendered bounds (differs for reduced-height hosts).
    visual: IndexMap<String, Bounds>,
    /// Offset each node's local coordinates were translated by.
    offsets: IndexMap<String, (f64, f64)>,
    gateways: IndexSet<String>,
    /// Pool id → content offset, for pool-relative edges.
    pool_offsets: IndexMap<String, (f64, f64)>,
    /// Container edges along with their enclosing pool, folded after the
    /// node walk completes.
    pending: Vec<(Edge, Option<String>)>,
    label_registry: Vec<Bounds>,
}

/// Folds the laid-out graph into a [`BpmnDocument`].
#[must_use]
pub fn build_diagram(definitions: BpmnGraph, _options: &LayoutOptions) -> BpmnDocument {
    let mut folder = Folder::default();
    for child in &definitions.children {
        let pool = (child.kind == NodeKind::Participant).then(|| child.id.clone());
        folder.walk(child, (0.0, 0.0), false, pool.as_deref());
    }

    let pending = std::mem::take(&mut folder.pending);
    for (edge, pool) in &pending {
        folder.fold_edge(edge, pool.as_deref());
    }
    for edge in &definitions.edges {
        folder.fold_message_flow(edge);
    }

    BpmnDocument {
        definitions,
        plane: DiagramPlane {
            shapes: folder.shapes,
            edges: folder.edges,
        },
    }
}

impl Folder {
    fn walk(&mut self, node: &Node, offset: (f64, f64), parent_is_pool: bool, pool: Option<&str>) {
        let local_x = node.x.unwrap_or(0.0);
        let local_y = node.y.unwrap_or(0.0);
        let absolute = Bounds::new(local_x + offset.0, local_y + offset.1, node.width, node.height);

        self.offsets.insert(node.id.clone(), offset);
        self.absolute.insert(node.id.clone(), absolute);
        let visual = Bounds::new(
            absolute.x,
            absolute.y,
            absolute.width,
            node.visual_height.unwrap_or(absolute.height),
        );
        self.visual.insert(node.id.clone(), visual);
        if node.kind.is_gateway() {
            self.gateways.insert(node.id.clone());
        }
        if node.kind == NodeKind::Participant {
            self.pool_offsets
                .insert(node.id.clone(), (absolute.x, absolute.y));
        }

        if node.kind != NodeKind::Process {
            self.shapes.push(shape_for(node, visual));
        }
        if node.io_specification.is_some() {
            self.emit_data_shapes(node, visual);
        }

        // Boundary events share their host's offset.
        for be in &node.boundary_events {
            let Some(local) = be.bounds() else { continue };
            let bounds = Bounds::new(
                local.x + offset.0,
                local.y + offset.1,
                local.width,
                local.height,
            );
            self.absolute.insert(be.id.clone(), bounds);
            self.visual.insert(be.id.clone(), bounds);
            self.offsets.insert(be.id.clone(), offset);
            self.shapes.push(DiagramShape {
                element: be.id.clone(),
                kind: NodeKind::BoundaryEvent,
                bounds,
                label: be
                    .name
                    .as_deref()
                    .map(|text| labels::label_below(&bounds, text)),
                is_horizontal: false,
                is_expanded: None,
            });
        }

        let child_offset = if node.is_offsetting_container(parent_is_pool) {
            (absolute.x, absolute.y)
        } else {
            offset
        };
        for child in &node.children {
            self.walk(child, child_offset, node.kind == NodeKind::Participant, pool);
        }
        for edge in &node.edges {
            self.pending.push((edge.clone(), pool.map(str::to_owned)));
        }
    }

    /// Stacked data input/output shapes below an ioSpecification host. The
    /// topmost of each stack gets a dashed association edge to the task.
    fn emit_data_shapes(&mut self, node: &Node, visual: Bounds) {
        let Some(spec) = node.io_specification.as_ref() else {
            return;
        };
        let (dw, dh) = DATA_SHAPE;
        for (stack, kind, x) in [
            (
                &spec.inputs,
                EdgeKind::DataInputAssociation,
                visual.x,
            ),
            (
                &spec.outputs,
                EdgeKind::DataOutputAssociation,
                visual.right() - dw,
            ),
        ] {
            let mut y = visual.bottom() + DATA_STACK_OFFSET;
            for (index, data) in stack.iter().enumerate() {
                let bounds = Bounds::new(x, y, dw, dh);
                self.shapes.push(DiagramShape {
                    element: data.id.clone(),
                    kind: NodeKind::DataObjectReference,
                    bounds,
                    label: data
                        .name
                        .as_deref()
                        .map(|text| labels::label_below(&bounds, text)),
                    is_horizontal: false,
                    is_expanded: None,
                });
                if index == 0 {
                    let top = Point::new(bounds.center().x, bounds.y);
                    let anchor = Point::new(bounds.center().x, visual.bottom());
                    let waypoints = match kind {
                        EdgeKind::DataInputAssociation => vec![top, anchor],
                        _ => vec![anchor, top],
                    };
                    self.edges.push(DiagramEdge {
                        element: format!("{}_{}", data.id, kind.xml_name()),
                        kind,
                        waypoints,
                        label: None,
                    });
                }
                y += dh + DATA_STACK_GAP;
            }
        }
    }

    fn fold_edge(&mut self, edge: &Edge, pool: Option<&str>) {
        let Some(section) = edge.section.as_ref() else {
            self.fold_unrouted(edge);
            return;
        };

        // Waypoint translation: absolute coordinates verbatim, pool-relative
        // by the pool offset, everything else by the source node's recorded
        // offset (the layered layout emits waypoints in the source's frame).
        let (dx, dy) = if edge.absolute_coords {
            (0.0, 0.0)
        } else if edge.pool_relative_coords {
            pool.and_then(|id| self.pool_offsets.get(id))
                .copied()
                .unwrap_or((0.0, 0.0))
        } else {
            self.offsets
                .get(edge.source.as_str())
                .copied()
                .unwrap_or((0.0, 0.0))
        };

        let mut points: Vec<Point> = section
            .points()
            .iter()
            .map(|p| p.translated(dx, dy))
            .collect();

        self.clamp_visual_entries(edge, &mut points);

        // Gateway endpoints land on the diamond, not the bounding box.
        if points.len() >= 2 {
            if self.gateways.contains(edge.source.as_str()) {
                if let Some(bounds) = self.absolute.get(edge.source.as_str()) {
                    points[0] = adjust_gateway_endpoint(bounds, points[0], points[1]);
                }
            }
            if self.gateways.contains(edge.target.as_str()) {
                let n = points.len();
                if let Some(bounds) = self.absolute.get(edge.target.as_str()) {
                    points[n - 1] = adjust_gateway_endpoint(bounds, points[n - 1], points[n - 2]);
                }
            }
        }

        let mut points = ensure_orthogonal_waypoints(&points);
        if let (Some(source), Some(target)) = (
            self.visual.get(edge.source.as_str()).copied(),
            self.visual.get(edge.target.as_str()).copied(),
        ) {
            let source_diamond = self.gateways.contains(edge.source.as_str());
            let target_diamond = self.gateways.contains(edge.target.as_str());
            ensure_perpendicular_endpoints(
                &mut points,
                &source,
                &target,
                source_diamond,
                target_diamond,
            );
        }
        let points = collapse_collinear(&points);

        let label = self.edge_label(edge, &points);
        self.edges.push(DiagramEdge {
            element: edge.id.clone(),
            kind: edge.kind,
            waypoints: points,
            label,
        });
    }

    /// Fallback for edges the layout never routed: a straight connection
    /// between the facing sides.
    fn fold_unrouted(&mut self, edge: &Edge) {
        let (Some(source), Some(target)) = (
            self.visual.get(edge.source.as_str()).copied(),
            self.visual.get(edge.target.as_str()).copied(),
        ) else {
            return;
        };
        let (exit, entry) = crate::geometry::best_connection_sides(&source, &target);
        let points = crate::geometry::l_path(
            source.connection_point(exit),
            target.connection_point(entry),
            exit.is_horizontal(),
        );
        let label = self.edge_label(edge, &points);
        self.edges.push(DiagramEdge {
            element: edge.id.clone(),
            kind: edge.kind,
            waypoints: points,
            label,
        });
    }

    /// Message flows connect pools top to bottom in collaboration
    /// coordinates: leave the source's bottom, enter the target's top.
    fn fold_message_flow(&mut self, edge: &Edge) {
        let (Some(source), Some(target)) = (
            self.visual.get(edge.source.as_str()).copied(),
            self.visual.get(edge.target.as_str()).copied(),
        ) else {
            return;
        };
        let (start, end) = if target.y >= source.bottom() {
            (
                source.connection_point(Side::Bottom),
                target.connection_point(Side::Top),
            )
        } else {
            (
                source.connection_point(Side::Top),
                target.connection_point(Side::Bottom),
            )
        };
        let points = if (start.x - end.x).abs() < ORTHO_EPS {
            vec![start, end]
        } else {
            let mid_y = (start.y + end.y) / 2.0;
            vec![
                start,
                Point::new(start.x, mid_y),
                Point::new(end.x, mid_y),
                end,
            ]
        };
        let label = self.edge_label(edge, &points);
        self.edges.push(DiagramEdge {
            element: edge.id.clone(),
            kind: edge.kind,
            waypoints: points,
            label,
        });
    }

    /// Horizontal entries into a reduced-height host clamp onto the visual
    /// center line; the adjacent waypoint follows so the last segment stays
    /// horizontal.
    fn clamp_visual_entries(&self, edge: &Edge, points: &mut [Point]) {
        if points.len() < 2 {
            return;
        }
        let clamp_end = |points: &mut [Point], visual: Bounds| {
            let n = points.len();
            let horizontal = (points[n - 1].y - points[n - 2].y).abs() < ORTHO_EPS;
            if horizontal && points[n - 1].y > visual.bottom() {
                let center_y = visual.center().y;
                points[n - 1].y = center_y;
                points[n - 2].y = center_y;
            }
        };
        if let (Some(layout), Some(visual)) = (
            self.absolute.get(edge.target.as_str()),
            self.visual.get(edge.target.as_str()),
        ) {
            if visual.height < layout.height {
                clamp_end(points, *visual);
            }
        }
        if let (Some(layout), Some(visual)) = (
            self.absolute.get(edge.source.as_str()),
            self.visual.get(edge.source.as_str()),
        ) {
            if visual.height < layout.height {
                points.reverse();
                clamp_end(points, *visual);
                points.reverse();
            }
        }
    }

    fn edge_label(&mut self, edge: &Edge, points: &[Point]) -> Option<super::DiagramLabel> {
        let text = edge.name.as_deref()?;
        let source = self.visual.get(edge.source.as_str()).copied()?;
        let target = self.visual.get(edge.target.as_str()).copied()?;
        let obstacles: Vec<Bounds> = self.absolute.values().copied().collect();
        labels::place_edge_label(
            points,
            text,
            &source,
            &target,
            &obstacles,
            &mut self.label_registry,
        )
    }
}

fn shape_for(node: &Node, visual: Bounds) -> DiagramShape {
    let label = node.name.as_deref().map(|text| {
        if node.kind.is_event() {
            labels::label_below(&visual, text)
        } else if node.kind.is_gateway() {
            labels::label_above(&visual, text)
        } else {
            labels::label_inside(&visual, text)
        }
    });
    DiagramShape {
        element: node.id.clone(),
        kind: node.kind,
        bounds: visual,
        label,
        is_horizontal: matches!(node.kind, NodeKind::Participant | NodeKind::Lane),
        is_expanded: matches!(node.kind, NodeKind::SubProcess | NodeKind::CallActivity)
            .then_some(node.is_expanded),
    }
}
