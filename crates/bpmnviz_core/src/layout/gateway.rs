//! Projection of edge endpoints onto gateway diamonds.
//!
//! Gateways render as diamonds inscribed in their bounding box, so an
//! orthogonal endpoint sitting on the box border floats away from the
//! visible shape. The adjuster moves it onto the diamond edge, which
//! satisfies `|x−cx|/(w/2) + |y−cy|/(h/2) = 1`.

use crate::geometry::{Bounds, Point};

/// Distance under which an endpoint already counts as on a diamond corner.
const CORNER_TOLERANCE: f64 = 1.0;

/// Tolerance for detecting that an endpoint lies on a box side.
const SIDE_TOLERANCE: f64 = 1.0;

/// The four corners of the inscribed diamond: top, right, bottom, left.
#[must_use]
pub fn diamond_corners(gateway: &Bounds) -> [Point; 4] {
    let center = gateway.center();
    [
        Point::new(center.x, gateway.y),
        Point::new(gateway.right(), center.y),
        Point::new(center.x, gateway.bottom()),
        Point::new(gateway.x, center.y),
    ]
}

/// Whether the point satisfies the diamond edge equation within `tolerance`.
#[must_use]
pub fn on_diamond_edge(gateway: &Bounds, p: Point, tolerance: f64) -> bool {
    let center = gateway.center();
    let half_w = gateway.width / 2.0;
    let half_h = gateway.height / 2.0;
    if half_w <= 0.0 || half_h <= 0.0 {
        return false;
    }
    let value = (p.x - center.x).abs() / half_w + (p.y - center.y).abs() / half_h;
    // Normalize the equation error back into pixels along the shorter axis.
    (value - 1.0).abs() * half_w.min(half_h) <= tolerance
}

/// Moves an edge endpoint touching a gateway box onto the diamond.
///
/// Endpoints already on a corner are returned unchanged. Endpoints on a box
/// side keep their perpendicular coordinate and solve the edge equation for
/// the other one. Endpoints off all sides snap to the corner facing the
/// adjacent waypoint.
#[must_use]
pub fn adjust_gateway_endpoint(gateway: &Bounds, endpoint: Point, adjacent: Point) -> Point {
    for corner in diamond_corners(gateway) {
        if endpoint.distance(corner) <= CORNER_TOLERANCE {
            return endpoint;
        }
    }

    let center = gateway.center();
    let half_w = gateway.width / 2.0;
    let half_h = gateway.height / 2.0;

    let on_top = (endpoint.y - gateway.y).abs() <= SIDE_TOLERANCE;
    let on_bottom = (endpoint.y - gateway.bottom()).abs() <= SIDE_TOLERANCE;
    let on_left = (endpoint.x - gateway.x).abs() <= SIDE_TOLERANCE;
    let on_right = (endpoint.x - gateway.right()).abs() <= SIDE_TOLERANCE;

    if on_top || on_bottom {
        let remainder = (1.0 - (endpoint.x - center.x).abs() / half_w).max(0.0);
        let offset = half_h * remainder;
        let y = if on_top {
            center.y - offset
        } else {
            center.y + offset
        };
        return Point::new(endpoint.x, y);
    }
    if on_left || on_right {
        let remainder = (1.0 - (endpoint.y - center.y).abs() / half_h).max(0.0);
        let offset = half_w * remainder;
        let x = if on_left {
            center.x - offset
        } else {
            center.x + offset
        };
        return Point::new(x, endpoint.y);
    }

    // Off all sides: pick the corner by the direction of the last segment.
    let dx = endpoint.x - adjacent.x;
    let dy = endpoint.y - adjacent.y;
    let corners = diamond_corners(gateway);
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 { corners[3] } else { corners[1] }
    } else if dy >= 0.0 {
        corners[0]
    } else {
        corners[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_endpoint_unchanged() {
        let gw = Bounds::new(100.0, 100.0, 50.0, 50.0);
        let left = Point::new(100.0, 125.0);
        assert_eq!(adjust_gateway_endpoint(&gw, left, Point::new(0.0, 125.0)), left);
    }

    #[test]
    fn test_top_side_endpoint_projected_onto_diamond() {
        let gw = Bounds::new(100.0, 100.0, 50.0, 50.0);
        // Vertical entry at x = 112.5, a quarter along the top side.
        let adjusted =
            adjust_gateway_endpoint(&gw, Point::new(112.5, 100.0), Point::new(112.5, 0.0));
        assert!(on_diamond_edge(&gw, adjusted, CORNER_TOLERANCE));
        assert_eq!(adjusted.x, 112.5);
        assert!(adjusted.y > 100.0);
    }

    #[test]
    fn test_detached_endpoint_snaps_to_facing_corner() {
        let gw = Bounds::new(100.0, 100.0, 50.0, 50.0);
        let adjusted =
            adjust_gateway_endpoint(&gw, Point::new(90.0, 125.0), Point::new(0.0, 125.0));
        assert_eq!(adjusted, Point::new(100.0, 125.0));
    }
}
