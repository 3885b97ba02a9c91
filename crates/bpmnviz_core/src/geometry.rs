//! Pure geometry helpers shared by every layout stage.
//!
//! All functions here are stateless; the pipeline threads [`Point`] and
//! [`Bounds`] values through them without any hidden caches.

/// Tolerance under which two coordinates are considered equal.
pub const ORTHO_EPS: f64 = 0.5;

/// Margin by which node interiors are shrunk before crossing tests, so that
/// segments running along a node border do not count as crossings.
pub const INTERIOR_MARGIN: f64 = 5.0;

/// A position in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new [`Point`].
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Returns this point translated by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One of the four sides of a [`Bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// Whether an edge leaving through this side travels horizontally.
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }

    /// The side facing this one on an opposing node.
    #[must_use]
    pub fn opposite(&self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl Bounds {
    /// Creates a new [`Bounds`].
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Geometric center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns the rectangle grown by `margin` on every side. A negative
    /// margin shrinks it.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    /// Whether the point lies inside or on the border of the rectangle.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether two rectangles overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Whether two rectangles overlap once both are grown by `margin`.
    #[must_use]
    pub fn overlaps_with_margin(&self, other: &Bounds, margin: f64) -> bool {
        self.expanded(margin).overlaps(other)
    }

    /// Smallest rectangle enclosing both operands.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Self {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Point on the middle of the requested side.
    #[must_use]
    pub fn connection_point(&self, side: Side) -> Point {
        match side {
            Side::Top => Point::new(self.x + self.width / 2.0, self.y),
            Side::Bottom => Point::new(self.x + self.width / 2.0, self.bottom()),
            Side::Left => Point::new(self.x, self.y + self.height / 2.0),
            Side::Right => Point::new(self.right(), self.y + self.height / 2.0),
        }
    }

    /// The side whose border lies closest to `p`.
    #[must_use]
    pub fn closest_side(&self, p: Point) -> Side {
        let d_left = (p.x - self.x).abs();
        let d_right = (p.x - self.right()).abs();
        let d_top = (p.y - self.y).abs();
        let d_bottom = (p.y - self.bottom()).abs();
        let mut side = Side::Left;
        let mut best = d_left;
        if d_right < best {
            side = Side::Right;
            best = d_right;
        }
        if d_top < best {
            side = Side::Top;
            best = d_top;
        }
        if d_bottom < best {
            side = Side::Bottom;
        }
        side
    }
}

/// Midpoint between two points.
#[must_use]
pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Total length of a polyline.
#[must_use]
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

/// Whether the axis-aligned segment `p`–`q` intersects the rectangle.
///
/// Diagonal segments are reduced to their bounding box, which is exact for
/// the horizontal and vertical segments the pipeline produces.
#[must_use]
pub fn segment_intersects_rect(p: Point, q: Point, rect: &Bounds) -> bool {
    let min_x = p.x.min(q.x);
    let max_x = p.x.max(q.x);
    let min_y = p.y.min(q.y);
    let max_y = p.y.max(q.y);
    min_x <= rect.right() && max_x >= rect.x && min_y <= rect.bottom() && max_y >= rect.y
}

/// Whether the segment `p`–`q` crosses the strict interior of a node.
///
/// The interior is the node shrunk by [`INTERIOR_MARGIN`], so segments that
/// hug a border are tolerated.
#[must_use]
pub fn segment_crosses_interior(p: Point, q: Point, node: &Bounds) -> bool {
    let interior = node.expanded(-INTERIOR_MARGIN);
    if interior.width <= 0.0 || interior.height <= 0.0 {
        return false;
    }
    segment_intersects_rect(p, q, &interior)
}

/// Chooses connection sides for an edge between two rectangles based on the
/// relative position of their centers.
///
/// Horizontal separation wins unless the vertical offset dominates it.
#[must_use]
pub fn best_connection_sides(source: &Bounds, target: &Bounds) -> (Side, Side) {
    let sc = source.center();
    let tc = target.center();
    let dx = tc.x - sc.x;
    let dy = tc.y - sc.y;
    if dy.abs() > dx.abs() {
        if dy >= 0.0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        }
    } else if dx >= 0.0 {
        (Side::Right, Side::Left)
    } else {
        (Side::Left, Side::Right)
    }
}

/// Builds an L-shaped orthogonal path from `from` to `to`.
///
/// With `horizontal_first` the bend sits at `(to.x, from.y)`, otherwise at
/// `(from.x, to.y)`. Collinear inputs collapse to a straight segment.
#[must_use]
pub fn l_path(from: Point, to: Point, horizontal_first: bool) -> Vec<Point> {
    if (from.x - to.x).abs() < ORTHO_EPS || (from.y - to.y).abs() < ORTHO_EPS {
        return vec![from, to];
    }
    let bend = if horizontal_first {
        Point::new(to.x, from.y)
    } else {
        Point::new(from.x, to.y)
    };
    vec![from, bend, to]
}

/// Scores a candidate route: each obstacle crossing costs 100, plus a length
/// term weighted at 0.1. Lower is better.
#[must_use]
pub fn route_score(points: &[Point], obstacles: &[Bounds]) -> f64 {
    let mut crossings = 0usize;
    for pair in points.windows(2) {
        for obstacle in obstacles {
            if segment_crosses_interior(pair[0], pair[1], obstacle) {
                crossings += 1;
            }
        }
    }
    crossings as f64 * 100.0 + polyline_length(points) * 0.1
}

/// Whether a vertical run at `x` between `y1` and `y2` stays clear of every
/// obstacle interior.
#[must_use]
pub fn clear_vertical_path(x: f64, y1: f64, y2: f64, obstacles: &[Bounds]) -> bool {
    let from = Point::new(x, y1.min(y2));
    let to = Point::new(x, y1.max(y2));
    obstacles
        .iter()
        .all(|o| !segment_crosses_interior(from, to, o))
}

/// Whether a horizontal run at `y` between `x1` and `x2` stays clear of every
/// obstacle interior.
#[must_use]
pub fn clear_horizontal_path(y: f64, x1: f64, x2: f64, obstacles: &[Bounds]) -> bool {
    let from = Point::new(x1.min(x2), y);
    let to = Point::new(x1.max(x2), y);
    obstacles
        .iter()
        .all(|o| !segment_crosses_interior(from, to, o))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_crossing_respects_margin() {
        let node = Bounds::new(100.0, 100.0, 100.0, 80.0);
        // Runs along the top border: tolerated.
        let top = Point::new(0.0, 100.0);
        assert!(!segment_crosses_interior(
            top,
            Point::new(300.0, 100.0),
            &node
        ));
        // Runs through the middle: a crossing.
        let mid = Point::new(0.0, 140.0);
        assert!(segment_crosses_interior(
            mid,
            Point::new(300.0, 140.0),
            &node
        ));
    }

    #[test]
    fn test_l_path_collapses_collinear() {
        let a = Point::new(0.0, 10.0);
        let b = Point::new(50.0, 10.0);
        assert_eq!(l_path(a, b, true).len(), 2);
        assert_eq!(l_path(a, Point::new(50.0, 60.0), true).len(), 3);
    }

    #[test]
    fn test_best_sides_prefer_horizontal() {
        let source = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let target = Bounds::new(200.0, 30.0, 100.0, 80.0);
        assert_eq!(
            best_connection_sides(&source, &target),
            (Side::Right, Side::Left)
        );
    }

    #[test]
    fn test_route_score_penalizes_crossings() {
        let obstacle = Bounds::new(40.0, -40.0, 20.0, 80.0);
        let direct = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let detour = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 60.0),
            Point::new(100.0, 60.0),
            Point::new(100.0, 0.0),
        ];
        assert!(route_score(&direct, &[obstacle]) > route_score(&detour, &[obstacle]));
    }
}
