//! Detection and repair of edges whose segments cross node interiors.
//!
//! Every edge in a container is scanned segment by segment against the flow
//! nodes of the same container (its own endpoints and boundary events
//! excluded). Offending edges are rerouted with a quadrant strategy that
//! threads between the blocking obstacles, and both endpoints are forced
//! perpendicular to the boundary side they touch.

use tracing::{debug, warn};

use crate::geometry::{
    Bounds, ORTHO_EPS, Point, Side, route_score, segment_crosses_interior,
};
use crate::layout::FlowScope;
use crate::layout::gateway::diamond_corners;
use crate::layout::pathfind::{PathfinderConfig, collapse_collinear, find_path, orthogonalize};
use crate::model::{EdgeKind, Section};

/// Distance from a node border at which a repair bend is inserted.
const STANDOFF: f64 = 15.0;

/// Clearance kept between a rerouted segment and the obstacles it passes.
const ROUTE_MARGIN: f64 = 20.0;

/// Vertical dominance factor above which an edge enters via top or bottom.
const VERTICAL_BIAS: f64 = 1.5;

/// Rewrites diagonal segments into right-angle bends, horizontal first.
#[must_use]
pub fn ensure_orthogonal_waypoints(points: &[Point]) -> Vec<Point> {
    orthogonalize(points)
}

fn closest_side(bounds: &Bounds, p: Point, diamond: bool) -> Side {
    if diamond {
        // For diamonds the nearest corner decides: each corner belongs to
        // one box side.
        let corners = diamond_corners(bounds);
        let sides = [Side::Top, Side::Right, Side::Bottom, Side::Left];
        let mut best = 0;
        for (i, corner) in corners.iter().enumerate() {
            if p.distance(*corner) < p.distance(corners[best]) {
                best = i;
            }
        }
        sides[best]
    } else {
        bounds.closest_side(p)
    }
}

fn segment_perpendicular_to(side: Side, from: Point, to: Point) -> bool {
    if side.is_horizontal() {
        (from.y - to.y).abs() < ORTHO_EPS
    } else {
        (from.x - to.x).abs() < ORTHO_EPS
    }
}

fn standoff_point(p: Point, side: Side) -> Point {
    match side {
        Side::Top => Point::new(p.x, p.y - STANDOFF),
        Side::Bottom => Point::new(p.x, p.y + STANDOFF),
        Side::Left => Point::new(p.x - STANDOFF, p.y),
        Side::Right => Point::new(p.x + STANDOFF, p.y),
    }
}

/// Forces the first segment perpendicular to the source side containing the
/// start point, and the last segment perpendicular to the target side
/// containing the end point.
///
/// Where a segment is not perpendicular, a bend is inserted at a fixed
/// standoff from the border and the adjacent waypoint is pulled to align.
pub fn ensure_perpendicular_endpoints(
    points: &mut Vec<Point>,
    source: &Bounds,
    target: &Bounds,
    source_diamond: bool,
    target_diamond: bool,
) {
    if points.len() < 2 {
        return;
    }

    let start_side = closest_side(source, points[0], source_diamond);
    if !segment_perpendicular_to(start_side, points[0], points[1]) {
        let bend = standoff_point(points[0], start_side);
        points.insert(1, bend);
        if points.len() == 3 {
            // The adjacent waypoint is the endpoint itself; add another bend
            // rather than moving it.
            let end = points[2];
            let elbow = if start_side.is_horizontal() {
                Point::new(bend.x, end.y)
            } else {
                Point::new(end.x, bend.y)
            };
            points.insert(2, elbow);
        } else if start_side.is_horizontal() {
            points[2].x = bend.x;
        } else {
            points[2].y = bend.y;
        }
    }

    let n = points.len();
    let end_side = closest_side(target, points[n - 1], target_diamond);
    if !segment_perpendicular_to(end_side, points[n - 2], points[n - 1]) {
        let bend = standoff_point(points[n - 1], end_side);
        points.insert(n - 1, bend);
        let n = points.len();
        if n == 3 {
            let start = points[0];
            let elbow = if end_side.is_horizontal() {
                Point::new(start.x, bend.y)
            } else {
                Point::new(bend.x, start.y)
            };
            points.insert(1, elbow);
        } else if end_side.is_horizontal() {
            points[n - 3].x = bend.x;
        } else {
            points[n - 3].y = bend.y;
        }
    }
}

fn path_bbox(points: &[Point]) -> Bounds {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

fn crosses_any(points: &[Point], obstacles: &[Bounds]) -> bool {
    points.windows(2).any(|pair| {
        obstacles
            .iter()
            .any(|o| segment_crosses_interior(pair[0], pair[1], o))
    })
}

/// Whether a waypoint still touches the border band of its node. Node moves
/// in later stages can leave an endpoint dangling in free space.
fn on_border(p: Point, bounds: &Bounds) -> bool {
    bounds.expanded(2.0).contains(p)
}

/// Picks a clear X for the vertical run of a Z-shaped route.
///
/// Candidates are the corridor midpoint and every blocker border plus
/// margin; candidates inside the corridor are preferred, and the best
/// scoring route wins.
fn choose_route_x(start: Point, end: Point, blockers: &[Bounds], lo: f64, hi: f64) -> f64 {
    let mut candidates = vec![(lo + hi) / 2.0];
    for blocker in blockers {
        candidates.push(blocker.right() + ROUTE_MARGIN);
        candidates.push(blocker.x - ROUTE_MARGIN);
    }
    let inside: Vec<f64> = candidates
        .iter()
        .copied()
        .filter(|x| *x >= lo && *x <= hi)
        .collect();
    let pool = if inside.is_empty() { candidates } else { inside };

    let mut best = pool[0];
    let mut best_score = f64::INFINITY;
    for x in pool {
        let path = [
            start,
            Point::new(x, start.y),
            Point::new(x, end.y),
            end,
        ];
        let score = route_score(&path, blockers);
        if score < best_score {
            best_score = score;
            best = x;
        }
    }
    best
}

fn choose_route_y(start: Point, end: Point, blockers: &[Bounds], lo: f64, hi: f64) -> f64 {
    let mut candidates = vec![(lo + hi) / 2.0];
    for blocker in blockers {
        candidates.push(blocker.bottom() + ROUTE_MARGIN);
        candidates.push(blocker.y - ROUTE_MARGIN);
    }
    let inside: Vec<f64> = candidates
        .iter()
        .copied()
        .filter(|y| *y >= lo && *y <= hi)
        .collect();
    let pool = if inside.is_empty() { candidates } else { inside };

    let mut best = pool[0];
    let mut best_score = f64::INFINITY;
    for y in pool {
        let path = [
            start,
            Point::new(start.x, y),
            Point::new(end.x, y),
            end,
        ];
        let score = route_score(&path, blockers);
        if score < best_score {
            best_score = score;
            best = y;
        }
    }
    best
}

/// Builds a replacement route for an edge whose current polyline crosses
/// node interiors. Returns the new waypoints.
#[must_use]
pub fn reroute_edge(source: &Bounds, target: &Bounds, obstacles: &[Bounds]) -> Vec<Point> {
    let sc = source.center();
    let tc = target.center();
    let dx = tc.x - sc.x;
    let dy = tc.y - sc.y;

    // Side selection: rightward edges exit right and enter left; a dominant
    // vertical offset switches the entry to top or bottom.
    if dx > 0.0 {
        let exit = Side::Right;
        let entry = if dy.abs() > VERTICAL_BIAS * dx.abs() {
            if dy > 0.0 { Side::Top } else { Side::Bottom }
        } else {
            Side::Left
        };
        let start = source.connection_point(exit);
        let end = target.connection_point(entry);
        let blockers: Vec<Bounds> = obstacles
            .iter()
            .copied()
            .filter(|o| o.overlaps_with_margin(&path_bbox(&[start, end]), ROUTE_MARGIN))
            .collect();
        if entry == Side::Left {
            if (start.y - end.y).abs() < ORTHO_EPS {
                let blocked = blockers
                    .iter()
                    .any(|o| segment_crosses_interior(start, end, o));
                if !blocked {
                    return vec![start, end];
                }
                // Detour over or under the blockers, whichever scores better.
                let x1 = start.x + STANDOFF;
                let x2 = end.x - STANDOFF;
                let mut best: Option<(f64, Vec<Point>)> = None;
                for blocker in &blockers {
                    for detour_y in [blocker.y - ROUTE_MARGIN, blocker.bottom() + ROUTE_MARGIN] {
                        let path = vec![
                            start,
                            Point::new(x1, start.y),
                            Point::new(x1, detour_y),
                            Point::new(x2, detour_y),
                            Point::new(x2, end.y),
                            end,
                        ];
                        let score = route_score(&path, &blockers);
                        if best.as_ref().is_none_or(|(s, _)| score < *s) {
                            best = Some((score, path));
                        }
                    }
                }
                if let Some((_, path)) = best {
                    return path;
                }
                return vec![start, end];
            }
            // Z-shape through a clear vertical corridor.
            let route_x = choose_route_x(start, end, &blockers, start.x + 10.0, end.x - 10.0);
            return vec![
                start,
                Point::new(route_x, start.y),
                Point::new(route_x, end.y),
                end,
            ];
        }
        // Right then up/down into a vertical entry.
        return vec![start, Point::new(end.x, start.y), end];
    }

    if dx.abs() < ORTHO_EPS && dy.abs() > ORTHO_EPS {
        // Straight vertical neighborhood: go up or down directly.
        let (exit, entry) = if dy > 0.0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        };
        let start = source.connection_point(exit);
        let end = target.connection_point(entry);
        if (start.x - end.x).abs() < ORTHO_EPS {
            return vec![start, end];
        }
        let blockers: Vec<Bounds> = obstacles
            .iter()
            .copied()
            .filter(|o| o.overlaps_with_margin(&path_bbox(&[start, end]), ROUTE_MARGIN))
            .collect();
        let lo = start.y.min(end.y) + 10.0;
        let hi = start.y.max(end.y) - 10.0;
        let route_y = choose_route_y(start, end, &blockers, lo, hi);
        return vec![
            start,
            Point::new(start.x, route_y),
            Point::new(end.x, route_y),
            end,
        ];
    }

    // Leftward (return) edge: exit right, climb over the flow through a
    // clear corridor, run back left above everything, drop next to the
    // target and enter its right side.
    let start = source.connection_point(Side::Right);
    let end = target.connection_point(Side::Right);

    let clear_y = obstacles
        .iter()
        .map(|o| o.y)
        .fold(source.y.min(target.y), f64::min)
        - ROUTE_MARGIN;

    // Climb corridor: just past the source if that column is free,
    // otherwise past the blocking obstacles.
    let mut candidates = vec![start.x + ROUTE_MARGIN];
    for obstacle in obstacles {
        if obstacle.right() > start.x {
            candidates.push(obstacle.right() + ROUTE_MARGIN);
        }
    }
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let up_x = candidates
        .iter()
        .copied()
        .find(|x| {
            crate::geometry::clear_horizontal_path(start.y, start.x, *x, obstacles)
                && crate::geometry::clear_vertical_path(*x, start.y, clear_y, obstacles)
        })
        .unwrap_or_else(|| *candidates.last().unwrap_or(&(start.x + ROUTE_MARGIN)));

    let drop_x = end.x + ROUTE_MARGIN;
    vec![
        start,
        Point::new(up_x, start.y),
        Point::new(up_x, clear_y),
        Point::new(drop_x, clear_y),
        Point::new(drop_x, end.y),
        end,
    ]
}

/// Scans and repairs every edge of the scope. See the module documentation.
pub fn fix_edges(scope: &mut FlowScope) {
    for index in 0..scope.edges.len() {
        let edge = scope.edges[index].clone();
        if edge.kind != EdgeKind::SequenceFlow && edge.kind != EdgeKind::Association {
            continue;
        }
        let Some(section) = edge.section.as_ref() else {
            continue;
        };
        let (Some(source), Some(target)) = (
            scope.element_bounds(&edge.source),
            scope.element_bounds(&edge.target),
        ) else {
            continue;
        };

        let mut points = ensure_orthogonal_waypoints(&section.points());

        // Return edges entering through their interior get shifted onto the
        // target's right edge before the crossing scan.
        if target.bottom() <= source.y && points.len() >= 2 {
            let n = points.len();
            let last = points[n - 1];
            let prev = points[n - 2];
            let horizontal = (last.y - prev.y).abs() < ORTHO_EPS;
            if horizontal && segment_crosses_interior(prev, last, &target) {
                points[n - 1] = target.connection_point(Side::Right);
            }
        }

        let obstacles = scope.obstacles(&[edge.source.as_str(), edge.target.as_str()]);
        let detached = !on_border(points[0], &source)
            || !on_border(points[points.len() - 1], &target);
        if detached || crosses_any(&points, &obstacles) {
            debug!(edge = %edge.id, detached, "rerouting edge");
            points = reroute_edge(&source, &target, &obstacles);
            if crosses_any(&points, &obstacles) {
                // The quadrant strategies could not thread past everything;
                // fall back to grid pathfinding between the chosen ports.
                let routed = find_path(
                    points[0],
                    points[points.len() - 1],
                    &obstacles,
                    &PathfinderConfig::default(),
                );
                if routed.success {
                    points = routed.points;
                } else {
                    warn!(edge = %edge.id, "no clear route found; keeping fallback path");
                }
            }
        }

        let source_diamond = scope
            .nodes
            .get(edge.source.as_str())
            .is_some_and(|n| n.kind.is_gateway());
        let target_diamond = scope
            .nodes
            .get(edge.target.as_str())
            .is_some_and(|n| n.kind.is_gateway());
        ensure_perpendicular_endpoints(
            &mut points,
            &source,
            &target,
            source_diamond,
            target_diamond,
        );
        let points = collapse_collinear(&ensure_orthogonal_waypoints(&points));
        scope.edges[index].section = Some(Section::from_points(&points));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ScopeNode;
    use crate::model::{Edge, NodeKind};

    fn scope_node(id: &str, kind: NodeKind, bounds: Bounds) -> ScopeNode {
        ScopeNode {
            id: id.into(),
            kind,
            bounds,
            visual_height: None,
        }
    }

    fn scope_with_blocker() -> FlowScope {
        let mut scope = FlowScope::default();
        for node in [
            scope_node("a", NodeKind::Task, Bounds::new(0.0, 0.0, 100.0, 80.0)),
            scope_node("blocker", NodeKind::Task, Bounds::new(160.0, 0.0, 100.0, 80.0)),
            scope_node("b", NodeKind::Task, Bounds::new(320.0, 0.0, 100.0, 80.0)),
        ] {
            scope.nodes.insert(node.id.clone(), node);
        }
        let mut edge = Edge::sequence_flow("e", "a", "b");
        edge.section = Some(Section::from_points(&[
            Point::new(100.0, 40.0),
            Point::new(320.0, 40.0),
        ]));
        scope.edges.push(edge);
        scope
    }

    #[test]
    fn test_crossing_edge_is_rerouted_clear() {
        let mut scope = scope_with_blocker();
        fix_edges(&mut scope);
        let section = scope.edges[0].section.clone().unwrap();
        let points = section.points();
        let blocker = scope.bounds("blocker").unwrap();
        for pair in points.windows(2) {
            assert!(!segment_crosses_interior(pair[0], pair[1], &blocker));
        }
    }

    #[test]
    fn test_fix_is_idempotent() {
        let mut scope = scope_with_blocker();
        fix_edges(&mut scope);
        let first = scope.edges[0].section.clone();
        fix_edges(&mut scope);
        assert_eq!(scope.edges[0].section, first);
    }

    #[test]
    fn test_clean_edge_untouched() {
        let mut scope = FlowScope::default();
        for node in [
            scope_node("a", NodeKind::Task, Bounds::new(0.0, 0.0, 100.0, 80.0)),
            scope_node("b", NodeKind::Task, Bounds::new(200.0, 0.0, 100.0, 80.0)),
        ] {
            scope.nodes.insert(node.id.clone(), node);
        }
        let mut edge = Edge::sequence_flow("e", "a", "b");
        edge.section = Some(Section::from_points(&[
            Point::new(100.0, 40.0),
            Point::new(200.0, 40.0),
        ]));
        scope.edges.push(edge);
        fix_edges(&mut scope);
        let points = scope.edges[0].section.clone().unwrap().points();
        assert_eq!(points, vec![Point::new(100.0, 40.0), Point::new(200.0, 40.0)]);
    }

    #[test]
    fn test_perpendicular_repair_inserts_standoff() {
        let source = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let target = Bounds::new(200.0, 200.0, 100.0, 80.0);
        // Leaves the source's right side but travels vertically.
        let mut points = vec![
            Point::new(100.0, 40.0),
            Point::new(100.0, 240.0),
            Point::new(200.0, 240.0),
        ];
        ensure_perpendicular_endpoints(&mut points, &source, &target, false, false);
        assert!((points[1].y - points[0].y).abs() < ORTHO_EPS);
    }
}
