//! The descriptor handed to whatever paints the chart.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::geometry::{bar_for, is_off_axis, BarMetrics, BarRect, BarStyle};
use super::routing::{route_all, Connector};
use crate::model::{SeqNum, TaskId, TaskStore, TimelineHeader, TimelineLayout};

/// One table row plus its bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDescriptor {
    pub task_id: Option<TaskId>,
    pub seq_num: Option<SeqNum>,
    pub depth: usize,
    pub is_parent: bool,
    pub is_collapsed: bool,
    /// Task name, else WBS name.
    pub label: String,
    pub code: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub duration_label: Option<String>,
    pub total_float_hours: Option<f64>,
    pub percent: Option<f32>,
    pub status: Option<String>,
    pub bar: Option<BarRect>,
    pub style: BarStyle,
    pub is_wbs: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    pub total: usize,
    pub filtered: usize,
    pub visible: usize,
    pub revealed: usize,
    pub truncated_rows: usize,
    pub timeline_clamped: bool,
    /// Revealed rows whose dates fall wholly outside a clamped axis.
    pub off_axis_bars: usize,
    pub dependencies_total: usize,
    /// Edges with both ends on screen, before the connector cap.
    pub dependencies_routable: usize,
    pub dependencies_rendered: usize,
    pub wbs_nodes: usize,
    pub resources: usize,
}

impl LayoutStats {
    /// Routable edges left out by the connector cap.
    pub fn dependencies_capped(&self) -> usize {
        self.dependencies_routable.saturating_sub(self.dependencies_rendered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutDescriptor {
    pub rows: Vec<RowDescriptor>,
    pub connectors: Vec<Connector>,
    pub timeline: TimelineLayout,
    pub header: TimelineHeader,
    pub today_x: Option<f32>,
    pub stats: LayoutStats,
}

impl LayoutDescriptor {
    /// Height of the row area.
    pub fn content_height(&self, row_height_px: f32) -> f32 {
        self.rows.len() as f32 * row_height_px
    }
}

/// Tree facts for one row about to be laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFacts {
    /// Index into the store.
    pub index: usize,
    pub depth: usize,
    pub is_parent: bool,
    pub is_collapsed: bool,
}

/// Hours per working day used for the duration column.
const HOURS_PER_DAY: f64 = 8.0;

pub fn duration_label(hours: Option<f64>) -> Option<String> {
    hours.map(|h| format!("{}d", (h / HOURS_PER_DAY).round() as i64))
}

/// Output of [`assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub rows: Vec<RowDescriptor>,
    pub connectors: Vec<Connector>,
    pub routable_dependencies: usize,
    pub off_axis_bars: usize,
}

/// Build row descriptors and connectors for `rows`, in order.
pub fn assemble(
    store: &TaskStore,
    rows: &[RowFacts],
    timeline: &TimelineLayout,
    metrics: &BarMetrics,
    max_dependencies: Option<usize>,
) -> Assembled {
    let tasks = store.tasks();
    let mut bars: HashMap<TaskId, BarRect> = HashMap::new();
    let mut off_axis_bars = 0;

    let descriptors: Vec<RowDescriptor> = rows
        .iter()
        .enumerate()
        .map(|(row_index, facts)| {
            let task = &tasks[facts.index];
            let bar = bar_for(task, row_index, timeline, metrics);
            if let (Some(id), Some(rect)) = (&task.id, bar) {
                bars.insert(id.clone(), rect);
            }
            if is_off_axis(task, timeline) {
                off_axis_bars += 1;
            }
            RowDescriptor {
                task_id: task.id.clone(),
                seq_num: task.seq_num.clone(),
                depth: facts.depth,
                is_parent: facts.is_parent,
                is_collapsed: facts.is_collapsed,
                label: task.label().to_string(),
                code: task.code.clone(),
                start: task.start,
                end: task.end,
                duration_label: duration_label(task.duration_hours),
                total_float_hours: task.total_float_hours,
                percent: task.percent_complete,
                status: task.status.clone(),
                bar,
                style: BarStyle::for_task(task),
                is_wbs: task.is_wbs_node(),
            }
        })
        .collect();

    let (connectors, routable_dependencies) = match max_dependencies {
        Some(max) => route_all(&bars, store.dependencies(), max),
        None => (Vec::new(), 0),
    };

    Assembled {
        rows: descriptors,
        connectors,
        routable_dependencies,
        off_axis_bars,
    }
}
