//! Connector paths between bars.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::geometry::{BarRect, Point};
use crate::model::{DependencyKind, DependencyRecord, TaskId};

/// Horizontal gap between a bar edge and its connector anchor.
pub const ANCHOR_GAP_PX: f32 = 5.0;
/// Anchors closer than this vertically are joined by a straight segment.
pub const STRAIGHT_THRESHOLD_PX: f32 = 5.0;
const MAX_ELBOW_PX: f32 = 50.0;
const ELBOW_FACTOR: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrowDirection {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arrowhead {
    pub tip: Point,
    pub points: ArrowDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connector {
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub kind: DependencyKind,
    pub path: Vec<Point>,
    /// Successor starts at or before the predecessor's end.
    pub is_backward: bool,
    pub arrow: Arrowhead,
}

/// Route one edge from `pred` to `succ`.
pub fn route(pred: &BarRect, succ: &BarRect) -> (Vec<Point>, bool, Arrowhead) {
    let start = Point::new(pred.right() + ANCHOR_GAP_PX, pred.center_y());
    let end = Point::new(succ.left - ANCHOR_GAP_PX, succ.center_y());
    let is_backward = succ.left <= pred.right();

    let path = if (end.y - start.y).abs() < STRAIGHT_THRESHOLD_PX {
        vec![start, end]
    } else {
        let dx = (end.x - start.x).abs();
        let mid_x = start.x + MAX_ELBOW_PX.min(dx * ELBOW_FACTOR);
        vec![
            start,
            Point::new(mid_x, start.y),
            Point::new(mid_x, end.y),
            end,
        ]
    };

    let arrow = Arrowhead {
        tip: end,
        points: if is_backward {
            ArrowDirection::Left
        } else {
            ArrowDirection::Right
        },
    };
    (path, is_backward, arrow)
}

/// Connectors for every dependency whose two ends both have a bar.
///
/// Edges to hidden, filtered or dateless tasks are skipped; they are expected.
/// At most `max_edges` connectors are produced, the first ones in input order.
/// Returns the connectors and how many edges were routable before the cap.
pub fn route_all(
    bars: &HashMap<TaskId, BarRect>,
    dependencies: &[DependencyRecord],
    max_edges: usize,
) -> (Vec<Connector>, usize) {
    let routable: Vec<(&DependencyRecord, &BarRect, &BarRect)> = dependencies
        .iter()
        .filter_map(|dep| {
            let pred = bars.get(&dep.predecessor_id)?;
            let succ = bars.get(&dep.successor_id)?;
            Some((dep, pred, succ))
        })
        .collect();

    let available = routable.len();
    if available > max_edges {
        debug!(available, max_edges, "dependency cap applied");
    }

    let connectors = routable
        .into_iter()
        .take(max_edges)
        .map(|(dep, pred, succ)| {
            let (path, is_backward, arrow) = route(pred, succ);
            Connector {
                predecessor: dep.predecessor_id.clone(),
                successor: dep.successor_id.clone(),
                kind: dep.kind,
                path,
                is_backward,
                arrow,
            }
        })
        .collect();

    (connectors, available)
}
