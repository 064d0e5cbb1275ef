//! Bar rectangles for visible rows.

use serde::Serialize;

use crate::model::{TaskRecord, TimelineLayout};

/// A point in chart coordinates (origin at the top-left of the first row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BarRect {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BarKind {
    /// On the driving path.
    Critical,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarStyle {
    pub kind: BarKind,
    /// Completed fraction, 0.0..=1.0.
    pub progress: f32,
}

impl BarStyle {
    pub fn for_task(task: &TaskRecord) -> Self {
        Self {
            kind: if task.is_on_driving_path {
                BarKind::Critical
            } else {
                BarKind::Normal
            },
            progress: task
                .percent_complete
                .map(|p| (p / 100.0).clamp(0.0, 1.0))
                .unwrap_or(0.0),
        }
    }
}

/// Row and bar sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarMetrics {
    pub row_height_px: f32,
    pub bar_height_px: f32,
    pub min_bar_width_px: f32,
}

impl Default for BarMetrics {
    fn default() -> Self {
        Self {
            row_height_px: 30.0,
            bar_height_px: 18.0,
            min_bar_width_px: 4.0,
        }
    }
}

/// Place the bar for `task` on row `row_index`.
///
/// Rows without their own start and end get no bar. Width is the distance
/// from start to end date, so a task ending the day before its successor
/// starts leaves a one-day gap. Bars are clipped to the axis, which matters
/// when the timeline was clamped; a task lying wholly outside the axis gets
/// no bar (see [`is_off_axis`]).
pub fn bar_for(
    task: &TaskRecord,
    row_index: usize,
    timeline: &TimelineLayout,
    metrics: &BarMetrics,
) -> Option<BarRect> {
    let span = task.span()?;
    if span.start > timeline.max_date || span.end < timeline.min_date {
        return None;
    }
    let axis = timeline.total_width_px;
    let start_x = timeline.date_to_x(span.start).max(0.0).min(axis);
    let end_x = timeline.date_to_x(span.end).max(0.0).min(axis);
    let width = (end_x - start_x).max(metrics.min_bar_width_px);
    // A minimum-width bar at the far end still has to fit.
    let left = start_x.min((axis - width).max(0.0));
    let row_top = row_index as f32 * metrics.row_height_px;

    Some(BarRect {
        left,
        top: row_top + (metrics.row_height_px - metrics.bar_height_px) / 2.0,
        width,
        height: metrics.bar_height_px,
    })
}

/// Whether `task` has dates but none of them fall on the axis.
pub fn is_off_axis(task: &TaskRecord, timeline: &TimelineLayout) -> bool {
    task.span()
        .is_some_and(|span| span.start > timeline.max_date || span.end < timeline.min_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateSpan, TimelineScale, TimelineSettings};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_timeline() -> TimelineLayout {
        let bounds = DateSpan::new(date(2025, 1, 8), date(2025, 2, 10)).unwrap();
        TimelineLayout::compute(bounds, TimelineScale::Day, 1000.0, &TimelineSettings::default())
    }

    #[test]
    fn bar_spans_its_days() {
        // Day scale pads by a week: the axis starts 2025-01-01 at 20 px per day.
        let timeline = day_timeline();
        let task = TaskRecord::new("a", "1", "A").with_dates(date(2025, 1, 11), date(2025, 1, 15));
        let rect = bar_for(&task, 2, &timeline, &BarMetrics::default()).unwrap();
        assert_eq!(rect.left, 200.0);
        assert_eq!(rect.width, 80.0);
        assert_eq!(rect.top, 66.0);
        assert_eq!(rect.height, 18.0);
        assert_eq!(rect.center_y(), 75.0);
        assert_eq!(rect.right(), 280.0);
    }

    #[test]
    fn narrow_bars_get_the_minimum_width() {
        let timeline = day_timeline();
        let metrics = BarMetrics {
            min_bar_width_px: 30.0,
            ..BarMetrics::default()
        };
        let task = TaskRecord::new("m", "1", "Milestone").with_dates(date(2025, 1, 20), date(2025, 1, 20));
        assert_eq!(bar_for(&task, 0, &timeline, &metrics).unwrap().width, 30.0);
    }

    #[test]
    fn rows_without_dates_get_no_bar() {
        let timeline = day_timeline();
        let node = TaskRecord::wbs_node("1", "Phase");
        assert!(bar_for(&node, 0, &timeline, &BarMetrics::default()).is_none());
    }

    #[test]
    fn style_reflects_driving_path_and_progress() {
        let mut task = TaskRecord::new("c", "1", "Crit");
        task.is_on_driving_path = true;
        task.percent_complete = Some(40.0);
        let style = BarStyle::for_task(&task);
        assert_eq!(style.kind, BarKind::Critical);
        assert!((style.progress - 0.4).abs() < 1e-6);

        let plain = BarStyle::for_task(&TaskRecord::new("n", "2", "Plain"));
        assert_eq!(plain.kind, BarKind::Normal);
        assert_eq!(plain.progress, 0.0);
    }

    #[test]
    fn tasks_past_a_clamped_axis_get_no_bar() {
        let bounds = DateSpan::new(date(2020, 1, 1), date(2026, 11, 1)).unwrap();
        let timeline = TimelineLayout::compute(bounds, TimelineScale::Day, 1000.0, &TimelineSettings::default());
        assert!(timeline.clamped.is_some());

        let late = TaskRecord::new("late", "2", "Late").with_dates(date(2026, 10, 1), date(2026, 11, 1));
        assert!(bar_for(&late, 1, &timeline, &BarMetrics::default()).is_none());
        assert!(is_off_axis(&late, &timeline));

        let early = TaskRecord::new("early", "1", "Early").with_dates(date(2020, 1, 1), date(2020, 2, 1));
        let rect = bar_for(&early, 0, &timeline, &BarMetrics::default()).unwrap();
        assert!(rect.right() <= timeline.total_width_px);
        assert!(!is_off_axis(&early, &timeline));
    }

    #[test]
    fn bars_crossing_the_axis_end_are_clipped() {
        let bounds = DateSpan::new(date(2020, 1, 1), date(2026, 11, 1)).unwrap();
        let timeline = TimelineLayout::compute(bounds, TimelineScale::Day, 1000.0, &TimelineSettings::default());

        let long = TaskRecord::new("long", "1", "Long").with_dates(date(2021, 6, 1), date(2026, 1, 1));
        let rect = bar_for(&long, 0, &timeline, &BarMetrics::default()).unwrap();
        assert_eq!(rect.right(), timeline.total_width_px);

        // Starts on the last axis day: the minimum width still stays on the axis.
        let last = TaskRecord::new("last", "2", "Last").with_dates(timeline.max_date, timeline.max_date);
        let rect = bar_for(&last, 1, &timeline, &BarMetrics::default()).unwrap();
        assert!(rect.right() <= timeline.total_width_px);
        assert!(rect.left >= 0.0);
    }
}
