//! Connector layout between parent and child nodes.
//!
//! Produces curved path descriptors (cubic beziers plus arrowhead tips) for
//! every resolvable parent edge. Dangling parent ids are skipped edge by
//! edge; a missing parent never hides a node's other connectors.

use crate::node::NodeId;
use crate::store::NodeStore;
use kurbo::{CubicBez, Line, Point, Rect, Vec2};

/// Distance the curve end is pulled back from the child border so the
/// rendered arrowhead tip lands exactly on the border.
pub const ARROWHEAD_CLEARANCE: f64 = 6.0;
/// Height of the shared stem above a merge child's top edge where all
/// parent curves converge.
pub const MERGE_STEM_LENGTH: f64 = 40.0;

/// Routing axis for a single-parent connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingAxis {
    Vertical,
    Horizontal,
}

/// Rendered path(s) linking a child to its parent(s).
#[derive(Debug, Clone)]
pub struct Connector {
    /// The child node the arrowhead points at.
    pub child: NodeId,
    pub kind: ConnectorKind,
}

/// Geometry of a connector.
#[derive(Debug, Clone)]
pub enum ConnectorKind {
    /// One S-curve from the parent edge to the child edge.
    Single {
        parent: NodeId,
        /// Curve ending short of the child border by the arrowhead
        /// clearance.
        curve: CubicBez,
        /// Where the arrowhead tip sits, on the child border.
        tip: Point,
    },
    /// Funnel of per-parent curves meeting above the child, plus a short
    /// straight stem carrying the arrowhead into the child's top border.
    Merge {
        /// One curve per resolvable parent, bottom-center to convergence.
        curves: Vec<(NodeId, CubicBez)>,
        /// Straight segment from the convergence point towards the child.
        stem: Line,
        /// Arrowhead tip on the child's top border.
        tip: Point,
    },
}

/// Compute connectors for every node with at least one resolvable parent.
pub fn layout_connectors(store: &NodeStore) -> Vec<Connector> {
    let mut connectors = Vec::new();

    for node in store.iter() {
        if node.parent_ids.is_empty() {
            continue;
        }

        if node.parent_ids.len() == 1 {
            let parent_id = node.parent_ids[0];
            let Some(parent) = store.get(parent_id) else {
                continue;
            };
            let (curve, tip) = route_single(parent.rect(), node.rect());
            connectors.push(Connector {
                child: node.id,
                kind: ConnectorKind::Single {
                    parent: parent_id,
                    curve,
                    tip,
                },
            });
        } else {
            let child_rect = node.rect();
            let convergence = Point::new(
                child_rect.center().x,
                child_rect.y0 - MERGE_STEM_LENGTH,
            );
            let curves: Vec<(NodeId, CubicBez)> = node
                .parent_ids
                .iter()
                .filter_map(|&pid| {
                    let parent = store.get(pid)?;
                    Some((pid, merge_curve(parent.rect(), convergence)))
                })
                .collect();
            if curves.is_empty() {
                continue;
            }
            let tip = Point::new(child_rect.center().x, child_rect.y0);
            let stem = Line::new(
                convergence,
                Point::new(tip.x, tip.y - ARROWHEAD_CLEARANCE),
            );
            connectors.push(Connector {
                child: node.id,
                kind: ConnectorKind::Merge { curves, stem, tip },
            });
        }
    }

    connectors
}

/// Pick the routing axis for a single-parent connector.
///
/// Compares the center displacement on each axis; ties route vertically.
/// Rectangles that overlap horizontally always route vertically so the
/// curve never doubles back through either node.
pub fn routing_axis(parent: Rect, child: Rect) -> RoutingAxis {
    if overlaps_x(parent, child) {
        return RoutingAxis::Vertical;
    }
    let delta = child.center() - parent.center();
    if delta.y.abs() < delta.x.abs() {
        RoutingAxis::Horizontal
    } else {
        RoutingAxis::Vertical
    }
}

/// Route a single-parent connector: parent edge midpoint to the matching
/// child edge midpoint, with the end pulled back by the arrowhead
/// clearance. Returns the curve and the arrowhead tip on the child border.
fn route_single(parent: Rect, child: Rect) -> (CubicBez, Point) {
    let axis = routing_axis(parent, child);
    let delta = child.center() - parent.center();

    let (start, tip) = match axis {
        RoutingAxis::Vertical => {
            if delta.y >= 0.0 {
                // Child below: parent bottom edge to child top edge.
                (
                    Point::new(parent.center().x, parent.y1),
                    Point::new(child.center().x, child.y0),
                )
            } else {
                (
                    Point::new(parent.center().x, parent.y0),
                    Point::new(child.center().x, child.y1),
                )
            }
        }
        RoutingAxis::Horizontal => {
            if delta.x >= 0.0 {
                (
                    Point::new(parent.x1, parent.center().y),
                    Point::new(child.x0, child.center().y),
                )
            } else {
                (
                    Point::new(parent.x0, parent.center().y),
                    Point::new(child.x1, child.center().y),
                )
            }
        }
    };

    let end = pull_back(start, tip, ARROWHEAD_CLEARANCE);

    let curve = match axis {
        RoutingAxis::Vertical => {
            let mid_y = (start.y + end.y) / 2.0;
            CubicBez::new(
                start,
                Point::new(start.x, mid_y),
                Point::new(end.x, mid_y),
                end,
            )
        }
        RoutingAxis::Horizontal => {
            let mid_x = (start.x + end.x) / 2.0;
            CubicBez::new(
                start,
                Point::new(mid_x, start.y),
                Point::new(mid_x, end.y),
                end,
            )
        }
    };

    (curve, tip)
}

/// Curve from a merge parent's bottom-center down to the shared
/// convergence point.
fn merge_curve(parent: Rect, convergence: Point) -> CubicBez {
    let start = Point::new(parent.center().x, parent.y1);
    let mid_y = (start.y + convergence.y) / 2.0;
    CubicBez::new(
        start,
        Point::new(start.x, mid_y),
        Point::new(convergence.x, mid_y),
        convergence,
    )
}

/// Move `tip` back towards `start` by `distance` along the straight line
/// between them. Degenerate (zero-length) edges keep the tip in place.
fn pull_back(start: Point, tip: Point, distance: f64) -> Point {
    let dir: Vec2 = tip - start;
    let len = dir.hypot();
    if len <= f64::EPSILON {
        return tip;
    }
    tip - dir * (distance / len)
}

fn overlaps_x(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1
}
