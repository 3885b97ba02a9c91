//! Grid-based A* pathfinding with obstacle avoidance.
//!
//! The grid is built per call from the inflated obstacle set plus padding
//! and released on return. Paths come back collapsed (no collinear interior
//! points) and orthogonalized with the horizontal-first convention.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::geometry::{Bounds, ORTHO_EPS, Point, Side};

/// Pathfinder tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct PathfinderConfig {
    /// Side length of one grid cell.
    pub cell_size: f64,
    /// Margin by which obstacles are inflated before rasterization.
    pub obstacle_margin: f64,
    /// Diagonal movement; BPMN routing keeps this off.
    pub allow_diagonal: bool,
    /// Free space added around the obstacle union so routes can go around.
    pub grid_padding: f64,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            cell_size: 10.0,
            obstacle_margin: 5.0,
            allow_diagonal: false,
            grid_padding: 50.0,
        }
    }
}

/// A routed polyline. `success` is `false` when no path existed and the
/// points fall back to a straight segment.
#[derive(Debug, Clone)]
pub struct RoutedPath {
    pub points: Vec<Point>,
    pub success: bool,
}

struct Grid {
    origin: Point,
    cell: f64,
    cols: usize,
    rows: usize,
    walkable: Vec<bool>,
}

impl Grid {
    fn build(start: Point, end: Point, obstacles: &[Bounds], config: &PathfinderConfig) -> Self {
        let mut area = Bounds::new(start.x.min(end.x), start.y.min(end.y), 0.0, 0.0);
        area.width = (start.x.max(end.x) - area.x).max(1.0);
        area.height = (start.y.max(end.y) - area.y).max(1.0);
        for obstacle in obstacles {
            area = area.union(&obstacle.expanded(config.obstacle_margin));
        }
        let area = area.expanded(config.grid_padding);

        let cols = (area.width / config.cell_size).ceil() as usize + 1;
        let rows = (area.height / config.cell_size).ceil() as usize + 1;
        let mut walkable = vec![true; cols * rows];

        for obstacle in obstacles {
            let inflated = obstacle.expanded(config.obstacle_margin);
            let c0 = (((inflated.x - area.x) / config.cell_size).floor().max(0.0)) as usize;
            let r0 = (((inflated.y - area.y) / config.cell_size).floor().max(0.0)) as usize;
            let c1 = (((inflated.right() - area.x) / config.cell_size).ceil()) as usize;
            let r1 = (((inflated.bottom() - area.y) / config.cell_size).ceil()) as usize;
            for row in r0..=r1.min(rows - 1) {
                for col in c0..=c1.min(cols - 1) {
                    walkable[row * cols + col] = false;
                }
            }
        }

        Self {
            origin: Point::new(area.x, area.y),
            cell: config.cell_size,
            cols,
            rows,
            walkable,
        }
    }

    fn cell_of(&self, p: Point) -> (usize, usize) {
        let col = ((p.x - self.origin.x) / self.cell).round().max(0.0) as usize;
        let row = ((p.y - self.origin.y) / self.cell).round().max(0.0) as usize;
        (col.min(self.cols - 1), row.min(self.rows - 1))
    }

    fn point_of(&self, col: usize, row: usize) -> Point {
        Point::new(
            self.origin.x + col as f64 * self.cell,
            self.origin.y + row as f64 * self.cell,
        )
    }
}

/// Finds an obstacle-avoiding path from `start` to `end`.
///
/// Start and end cells are forced walkable so endpoints that touch a node
/// border can still connect. On failure the result is the straight segment
/// with `success = false`.
#[must_use]
pub fn find_path(
    start: Point,
    end: Point,
    obstacles: &[Bounds],
    config: &PathfinderConfig,
) -> RoutedPath {
    let grid = Grid::build(start, end, obstacles, config);
    let (sc, sr) = grid.cell_of(start);
    let (ec, er) = grid.cell_of(end);

    let cols = grid.cols;
    let start_idx = sr * cols + sc;
    let end_idx = er * cols + ec;
    let mut walkable = grid.walkable.clone();
    walkable[start_idx] = true;
    walkable[end_idx] = true;

    let heuristic = |idx: usize| -> usize {
        let (c, r) = (idx % cols, idx / cols);
        c.abs_diff(ec) + r.abs_diff(er)
    };

    let mut g = vec![usize::MAX; walkable.len()];
    let mut came = vec![usize::MAX; walkable.len()];
    let mut open = BinaryHeap::new();
    g[start_idx] = 0;
    open.push(Reverse((heuristic(start_idx), start_idx)));

    let mut found = false;
    while let Some(Reverse((_, idx))) = open.pop() {
        if idx == end_idx {
            found = true;
            break;
        }
        let (c, r) = (idx % cols, idx / cols);
        let mut neighbors: Vec<(usize, usize)> = Vec::with_capacity(8);
        if c > 0 {
            neighbors.push((c - 1, r));
        }
        if c + 1 < cols {
            neighbors.push((c + 1, r));
        }
        if r > 0 {
            neighbors.push((c, r - 1));
        }
        if r + 1 < grid.rows {
            neighbors.push((c, r + 1));
        }
        if config.allow_diagonal {
            if c > 0 && r > 0 {
                neighbors.push((c - 1, r - 1));
            }
            if c + 1 < cols && r > 0 {
                neighbors.push((c + 1, r - 1));
            }
            if c > 0 && r + 1 < grid.rows {
                neighbors.push((c - 1, r + 1));
            }
            if c + 1 < cols && r + 1 < grid.rows {
                neighbors.push((c + 1, r + 1));
            }
        }
        for (nc, nr) in neighbors {
            let next = nr * cols + nc;
            if !walkable[next] {
                continue;
            }
            let tentative = g[idx].saturating_add(1);
            if tentative < g[next] {
                g[next] = tentative;
                came[next] = idx;
                open.push(Reverse((tentative + heuristic(next), next)));
            }
        }
    }

    if !found {
        return RoutedPath {
            points: vec![start, end],
            success: false,
        };
    }

    let mut cells = vec![end_idx];
    let mut cursor = end_idx;
    while cursor != start_idx {
        cursor = came[cursor];
        cells.push(cursor);
    }
    cells.reverse();

    let mut points: Vec<Point> = cells
        .iter()
        .map(|idx| grid.point_of(idx % cols, idx / cols))
        .collect();
    // Snap the rounded boundary cells back onto the exact endpoints.
    if let Some(first) = points.first_mut() {
        *first = start;
    }
    if let Some(last) = points.last_mut() {
        *last = end;
    }

    let collapsed = collapse_collinear(&points);
    RoutedPath {
        points: orthogonalize(&collapsed),
        success: true,
    }
}

/// Removes interior points that lie on the segment between their neighbors.
#[must_use]
pub fn collapse_collinear(points: &[Point]) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out = vec![points[0]];
    for window in points.windows(3) {
        let [a, b, c] = [window[0], window[1], window[2]];
        let horizontal = (a.y - b.y).abs() < ORTHO_EPS && (b.y - c.y).abs() < ORTHO_EPS;
        let vertical = (a.x - b.x).abs() < ORTHO_EPS && (b.x - c.x).abs() < ORTHO_EPS;
        if !horizontal && !vertical {
            out.push(b);
        }
    }
    out.push(points[points.len() - 1]);
    out
}

/// Rewrites any diagonal step into a right-angle bend, horizontal first.
#[must_use]
pub fn orthogonalize(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(&prev) = out.last() {
            let dx = (point.x - prev.x).abs();
            let dy = (point.y - prev.y).abs();
            if dx > ORTHO_EPS && dy > ORTHO_EPS {
                out.push(Point::new(point.x, prev.y));
            }
        }
        out.push(point);
    }
    out
}

/// Infers connection ports from the relative centers of the two nodes.
#[must_use]
pub fn infer_ports(source: &Bounds, target: &Bounds) -> (Side, Side) {
    crate::geometry::best_connection_sides(source, target)
}
