//! Label sizing and placement.
//!
//! Text metrics are estimated, not measured: CJK characters count 14 px and
//! everything else 7 px against the label width. Edge labels scan the route
//! for the longest segment clear of both endpoint nodes and dodge node and
//! label collisions via side flips and ratio retries.

use crate::geometry::{Bounds, ORTHO_EPS, Point};

use super::DiagramLabel;

/// Pixel width of one CJK character.
const CJK_CHAR_WIDTH: f64 = 14.0;

/// Pixel width of one ASCII character.
const ASCII_CHAR_WIDTH: f64 = 7.0;

/// Height of one label line.
const LINE_HEIGHT: f64 = 14.0;

/// Maximum label width before the text wraps.
const MAX_LABEL_WIDTH: f64 = 100.0;

/// Gap between a shape and its label.
const SHAPE_LABEL_GAP: f64 = 4.0;

/// Offset between an edge segment and its label.
const EDGE_LABEL_GAP: f64 = 5.0;

/// Minimum usable segment length for an edge label.
const MIN_SEGMENT: f64 = 30.0;

/// Clearance an edge-label segment keeps from the endpoint nodes.
const ENDPOINT_CLEARANCE: f64 = 30.0;

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x2E80..=0x9FFF | 0xAC00..=0xD7FF | 0xF900..=0xFAFF | 0xFF00..=0xFFEF
    )
}

/// Estimated pixel width of a text run.
#[must_use]
pub fn text_width(text: &str) -> f64 {
    text.chars()
        .map(|c| if is_cjk(c) { CJK_CHAR_WIDTH } else { ASCII_CHAR_WIDTH })
        .sum()
}

/// Estimated (width, height) of a label, wrapping against the maximum width.
#[must_use]
pub fn estimate_label_size(text: &str) -> (f64, f64) {
    let width = text_width(text);
    if width <= MAX_LABEL_WIDTH {
        return (width.max(ASCII_CHAR_WIDTH), LINE_HEIGHT);
    }
    let lines = (width / MAX_LABEL_WIDTH).ceil();
    (MAX_LABEL_WIDTH, lines * LINE_HEIGHT)
}

/// Label centered below a shape (events).
#[must_use]
pub fn label_below(shape: &Bounds, text: &str) -> DiagramLabel {
    let (w, h) = estimate_label_size(text);
    DiagramLabel {
        text: text.to_owned(),
        bounds: Bounds::new(
            shape.center().x - w / 2.0,
            shape.bottom() + SHAPE_LABEL_GAP,
            w,
            h,
        ),
    }
}

/// Label centered above a shape (gateways).
#[must_use]
pub fn label_above(shape: &Bounds, text: &str) -> DiagramLabel {
    let (w, h) = estimate_label_size(text);
    DiagramLabel {
        text: text.to_owned(),
        bounds: Bounds::new(
            shape.center().x - w / 2.0,
            shape.y - SHAPE_LABEL_GAP - h,
            w,
            h,
        ),
    }
}

/// Label centered inside a shape (tasks, subprocesses, pools).
#[must_use]
pub fn label_inside(shape: &Bounds, text: &str) -> DiagramLabel {
    let (w, h) = estimate_label_size(text);
    let center = shape.center();
    DiagramLabel {
        text: text.to_owned(),
        bounds: Bounds::new(center.x - w / 2.0, center.y - h / 2.0, w, h),
    }
}

fn segment_clear_of(p: Point, q: Point, node: &Bounds) -> bool {
    let seg = Bounds::new(
        p.x.min(q.x),
        p.y.min(q.y),
        (p.x - q.x).abs(),
        (p.y - q.y).abs(),
    );
    !node.expanded(ENDPOINT_CLEARANCE).overlaps(&seg.expanded(0.1))
}

/// Places a label along an edge route.
///
/// The longest segment clear of both endpoint nodes wins; the label sits
/// just above horizontal segments or to the right of vertical ones, flips
/// to the other side when it lands on a node, and for long vertical
/// segments walks several ratios along the segment. `registry` holds the
/// labels already placed so two edge labels never overlap.
#[must_use]
pub fn place_edge_label(
    points: &[Point],
    text: &str,
    source: &Bounds,
    target: &Bounds,
    obstacles: &[Bounds],
    registry: &mut Vec<Bounds>,
) -> Option<DiagramLabel> {
    if points.len() < 2 || text.is_empty() {
        return None;
    }
    let (w, h) = estimate_label_size(text);

    // Pick the host segment.
    let mut best: Option<(f64, Point, Point)> = None;
    let mut longest: Option<(f64, Point, Point)> = None;
    for pair in points.windows(2) {
        let (p, q) = (pair[0], pair[1]);
        let length = p.distance(q);
        if longest.as_ref().is_none_or(|(l, _, _)| length > *l) {
            longest = Some((length, p, q));
        }
        if length < MIN_SEGMENT {
            continue;
        }
        if !segment_clear_of(p, q, source) || !segment_clear_of(p, q, target) {
            continue;
        }
        if best.as_ref().is_none_or(|(l, _, _)| length > *l) {
            best = Some((length, p, q));
        }
    }
    let (length, p, q) = best.or(longest)?;

    let horizontal = (p.y - q.y).abs() < ORTHO_EPS;
    let mut candidates: Vec<Bounds> = Vec::new();
    let ratios: &[f64] = if !horizontal && length > 3.0 * MIN_SEGMENT {
        &[0.5, 0.25, 0.75]
    } else {
        &[0.5]
    };
    for ratio in ratios {
        let at = Point::new(p.x + (q.x - p.x) * ratio, p.y + (q.y - p.y) * ratio);
        if horizontal {
            candidates.push(Bounds::new(at.x - w / 2.0, at.y - EDGE_LABEL_GAP - h, w, h));
            candidates.push(Bounds::new(at.x - w / 2.0, at.y + EDGE_LABEL_GAP, w, h));
        } else {
            candidates.push(Bounds::new(at.x + EDGE_LABEL_GAP, at.y - h / 2.0, w, h));
            candidates.push(Bounds::new(at.x - EDGE_LABEL_GAP - w, at.y - h / 2.0, w, h));
        }
    }

    let chosen = candidates
        .iter()
        .find(|candidate| {
            obstacles.iter().all(|o| !o.overlaps(candidate))
                && registry.iter().all(|r| !r.overlaps(candidate))
        })
        .or(candidates.first())
        .copied()?;

    registry.push(chosen);
    Some(DiagramLabel {
        text: text.to_owned(),
        bounds: chosen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_counts_double() {
        assert_eq!(text_width("ab"), 14.0);
        assert_eq!(text_width("審査"), 28.0);
    }

    #[test]
    fn test_long_text_wraps() {
        let (w, h) = estimate_label_size("a very long label that definitely wraps around");
        assert_eq!(w, 100.0);
        assert!(h >= 2.0 * 14.0);
    }

    #[test]
    fn test_edge_label_avoids_registry() {
        let points = [Point::new(0.0, 100.0), Point::new(300.0, 100.0)];
        let node = Bounds::new(-50.0, 80.0, 36.0, 36.0);
        let far = Bounds::new(400.0, 80.0, 36.0, 36.0);
        let mut registry = Vec::new();
        let first =
            place_edge_label(&points, "yes", &node, &far, &[], &mut registry).unwrap();
        let second =
            place_edge_label(&points, "yes", &node, &far, &[], &mut registry).unwrap();
        assert!(!first.bounds.overlaps(&second.bounds));
    }
}
