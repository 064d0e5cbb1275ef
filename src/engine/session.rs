use std::cell::RefCell;
use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::batch::{
    drive, BatchConfig, BatchPlan, BatchScheduler, DriveOutcome, GenerationCounter, RenderState,
    Reveal,
};
use super::geometry::BarMetrics;
use super::hierarchy::HierarchyInfo;
use super::layout::{assemble, LayoutDescriptor, LayoutStats, RowFacts};
use super::visibility::{DateWindow, Filtered, VisibilityController};
use crate::config::{GanttConfig, Lookahead};
use crate::model::{SeqNum, TaskStore, TimelineLayout, TimelineScale, TimelineSettings};

/// All per-project state: the store, filter and collapse state, and the
/// reveal in progress.
///
/// Replaced wholesale when another project is loaded.
#[derive(Debug)]
pub struct GanttSession {
    store: TaskStore,
    today: NaiveDate,
    scale: TimelineScale,
    settings: TimelineSettings,
    metrics: BarMetrics,
    max_dependencies: usize,
    show_dependencies: bool,

    visibility: VisibilityController,
    filtered: Filtered,
    /// Over `filtered.rows`.
    hierarchy: HierarchyInfo,
    parents: HashSet<SeqNum>,
    /// Positions into `filtered.rows`.
    visible: Vec<usize>,

    scheduler: BatchScheduler,
    plan: Option<BatchPlan>,
    render: RenderState,
}

impl GanttSession {
    pub fn new(store: TaskStore, config: &GanttConfig, today: NaiveDate) -> Self {
        Self::with_counter(store, config, today, GenerationCounter::new())
    }

    /// Share `counter` with an earlier session so its reveals go stale.
    pub fn with_counter(
        store: TaskStore,
        config: &GanttConfig,
        today: NaiveDate,
        counter: GenerationCounter,
    ) -> Self {
        let window = DateWindow::from_config(
            today,
            config.lookahead_days,
            config.include_past_tasks,
            store.bounds(),
        );
        let batch = BatchConfig {
            initial_batch: config.initial_batch,
            chunk_size: config.chunk_size,
            max_chunks: config.max_chunks,
        };

        let scale = match store.bounds() {
            Some(bounds) if config.auto_scale => {
                let scale = TimelineScale::auto_for_span((bounds.end - bounds.start).num_days());
                debug!(?scale, "scale picked from project span");
                scale
            }
            _ => config.scale_mode,
        };

        let mut session = Self {
            store,
            today,
            scale,
            settings: config.timeline_settings(),
            metrics: BarMetrics {
                row_height_px: config.row_height_px,
                bar_height_px: config.bar_height_px,
                min_bar_width_px: config.min_bar_width_px,
            },
            max_dependencies: config.max_rendered_dependencies,
            show_dependencies: config.show_dependencies,
            visibility: VisibilityController::new(window, config.max_visible_rows),
            filtered: Filtered::default(),
            hierarchy: HierarchyInfo::default(),
            parents: HashSet::new(),
            visible: Vec::new(),
            scheduler: BatchScheduler::new(counter, batch),
            plan: None,
            render: RenderState::default(),
        };
        session.refilter();
        session
    }

    // ── Getters ─────────────────────────────────────────────────

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn scale(&self) -> TimelineScale {
        self.scale
    }

    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &BarMetrics {
        &self.metrics
    }

    pub fn window(&self) -> &DateWindow {
        self.visibility.window()
    }

    pub fn counter(&self) -> &GenerationCounter {
        self.scheduler.counter()
    }

    pub fn render_state(&self) -> RenderState {
        self.render
    }

    /// A reveal is still in progress.
    pub fn is_revealing(&self) -> bool {
        self.plan.is_some()
    }

    pub fn show_dependencies(&self) -> bool {
        self.show_dependencies
    }

    /// Window for `lookahead` from `today`, against this project's bounds.
    pub fn window_for(&self, today: NaiveDate, lookahead: Lookahead, include_past: bool) -> DateWindow {
        DateWindow::from_config(today, lookahead, include_past, self.store.bounds())
    }

    // ── Filter & hierarchy ──────────────────────────────────────

    /// Refilter with `window`; collapsed nodes are forgotten.
    pub fn apply_filter(&mut self, window: DateWindow) {
        self.today = window.today;
        self.visibility.set_window(window);
        self.refilter();
    }

    /// Collapse or expand `seq`. Only rows with children in the filtered set
    /// can be toggled; returns whether anything changed.
    pub fn toggle(&mut self, seq: &SeqNum) -> bool {
        if !self.parents.contains(seq) {
            return false;
        }
        let collapsed = self.visibility.toggle(seq);
        debug!(%seq, collapsed, "toggled");
        self.refresh_visible();
        true
    }

    pub fn expand_all(&mut self) {
        self.visibility.expand_all();
        self.refresh_visible();
    }

    pub fn collapse_all(&mut self) {
        self.visibility.collapse_all(self.parents.iter());
        self.refresh_visible();
    }

    pub fn is_collapsed(&self, seq: &SeqNum) -> bool {
        self.visibility.is_collapsed(seq.as_str())
    }

    fn refilter(&mut self) {
        self.filtered = self.visibility.filter(&self.store);
        let tasks = self.store.tasks();
        self.hierarchy =
            HierarchyInfo::resolve(self.filtered.rows.iter().map(|&i| tasks[i].seq_num.as_ref()));
        self.parents = self
            .filtered
            .rows
            .iter()
            .zip(&self.hierarchy.has_children)
            .filter(|(_, has_children)| **has_children)
            .filter_map(|(&i, _)| tasks[i].seq_num.clone())
            .collect();
        info!(
            total = self.store.len(),
            filtered = self.filtered.rows.len(),
            "filter applied"
        );
        self.refresh_visible();
    }

    fn refresh_visible(&mut self) {
        let shown = self.visibility.visible(&self.store, &self.filtered.rows);
        let mut shown = shown.iter().peekable();
        self.visible = self
            .filtered
            .rows
            .iter()
            .enumerate()
            .filter_map(|(pos, idx)| {
                if shown.peek() == Some(&idx) {
                    shown.next();
                    Some(pos)
                } else {
                    None
                }
            })
            .collect();

        self.plan = Some(self.scheduler.begin(self.visible.len()));
        // The first slice goes out immediately.
        self.step();
    }

    // ── Timeline ────────────────────────────────────────────────

    /// Switch scale; the timeline is recomputed from scratch on the next descriptor.
    pub fn set_scale(&mut self, scale: TimelineScale) {
        self.scale = scale;
    }

    pub fn settings_mut(&mut self) -> &mut TimelineSettings {
        &mut self.settings
    }

    pub fn set_show_dependencies(&mut self, show: bool) {
        self.show_dependencies = show;
    }

    pub fn timeline(&self, container_width_px: f32) -> TimelineLayout {
        TimelineLayout::compute(
            self.store.bounds_or_default(self.today),
            self.scale,
            container_width_px,
            &self.settings,
        )
    }

    // ── Incremental reveal ──────────────────────────────────────

    /// Advance the reveal in progress by one step.
    pub fn step(&mut self) -> Option<Reveal> {
        let reveal = self.plan.as_mut()?.next();
        let Some(reveal) = reveal else {
            self.plan = None;
            return None;
        };
        let applied = self.render.apply(reveal, self.scheduler.counter());
        if reveal.is_final || !applied {
            self.plan = None;
        }
        applied.then_some(reveal)
    }

    /// Reveal everything that is left.
    pub fn finish(&mut self) {
        while self.step().is_some() {}
    }

    /// Drive the remaining reveal asynchronously, yielding between chunks.
    pub async fn reveal_all(&mut self) -> DriveOutcome {
        let Some(plan) = self.plan.take() else {
            return DriveOutcome::Completed {
                revealed: self.render.upto,
            };
        };
        let sink = RefCell::new(self.render);
        let outcome = drive(plan, self.scheduler.counter(), &sink).await;
        self.render = sink.into_inner();
        outcome
    }

    // ── Output ──────────────────────────────────────────────────

    /// Layout of the rows revealed so far.
    pub fn descriptor(&self, container_width_px: f32) -> LayoutDescriptor {
        let timeline = self.timeline(container_width_px);
        let tasks = self.store.tasks();
        let revealed = self.render.upto.min(self.visible.len());

        let rows: Vec<RowFacts> = self.visible[..revealed]
            .iter()
            .map(|&pos| {
                let index = self.filtered.rows[pos];
                RowFacts {
                    index,
                    depth: self.hierarchy.depth[pos],
                    is_parent: self.hierarchy.has_children[pos],
                    is_collapsed: tasks[index]
                        .seq_num
                        .as_ref()
                        .is_some_and(|s| self.hierarchy.has_children[pos] && self.is_collapsed(s)),
                }
            })
            .collect();

        let max_dependencies = self.show_dependencies.then_some(self.max_dependencies);
        let assembled = assemble(&self.store, &rows, &timeline, &self.metrics, max_dependencies);

        let stats = LayoutStats {
            total: self.store.len(),
            filtered: self.filtered.rows.len(),
            visible: self.visible.len(),
            revealed,
            truncated_rows: self.filtered.truncated,
            timeline_clamped: timeline.clamped.is_some(),
            off_axis_bars: assembled.off_axis_bars,
            dependencies_total: self.store.dependencies().len(),
            dependencies_routable: assembled.routable_dependencies,
            dependencies_rendered: assembled.connectors.len(),
            wbs_nodes: self.store.wbs().len(),
            resources: self.store.resources().len(),
        };

        LayoutDescriptor {
            rows: assembled.rows,
            connectors: assembled.connectors,
            header: timeline.header(),
            today_x: timeline.today_x(self.today),
            timeline,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependencyRecord, TaskRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seq(s: &str) -> SeqNum {
        SeqNum::new(s).unwrap()
    }

    fn many_tasks(n: usize) -> TaskStore {
        let tasks = (0..n)
            .map(|i| {
                TaskRecord::new(i.to_string(), &format!("1.{}", i + 1), format!("T{i}"))
                    .with_dates(date(2025, 1, 1), date(2025, 1, 5))
            })
            .chain(std::iter::once(TaskRecord::wbs_node("1", "Root")))
            .collect();
        TaskStore::new("Many", tasks, Vec::new())
    }

    fn config() -> GanttConfig {
        GanttConfig {
            lookahead_days: Lookahead::All,
            include_past_tasks: true,
            ..GanttConfig::default()
        }
    }

    #[test]
    fn first_slice_is_revealed_on_creation() {
        let session = GanttSession::new(many_tasks(500), &config(), date(2025, 1, 1));
        assert!(session.is_revealing());
        let descriptor = session.descriptor(1200.0);
        assert_eq!(descriptor.rows.len(), 100);
        assert_eq!(descriptor.stats.visible, 501);
        assert_eq!(descriptor.rows[0].label, "Root");
        assert!(descriptor.rows[0].is_parent);
    }

    #[test]
    fn finish_reveals_every_visible_row() {
        let mut session = GanttSession::new(many_tasks(500), &config(), date(2025, 1, 1));
        session.finish();
        assert!(!session.is_revealing());
        assert_eq!(session.descriptor(1200.0).rows.len(), 501);
    }

    #[test]
    fn toggle_restarts_the_reveal() {
        let mut session = GanttSession::new(many_tasks(500), &config(), date(2025, 1, 1));
        session.finish();
        let before = session.counter().current();

        assert!(session.toggle(&seq("1")));
        assert!(session.counter().current() > before);
        let descriptor = session.descriptor(1200.0);
        assert_eq!(descriptor.rows.len(), 1);
        assert!(descriptor.rows[0].is_collapsed);
    }

    #[test]
    fn leaves_cannot_be_toggled() {
        let mut session = GanttSession::new(many_tasks(3), &config(), date(2025, 1, 1));
        assert!(!session.toggle(&seq("1.2")));
        assert!(!session.is_collapsed(&seq("1.2")));
    }

    #[test]
    fn collapse_all_then_expand_all() {
        let mut session = GanttSession::new(many_tasks(3), &config(), date(2025, 1, 1));
        session.collapse_all();
        session.finish();
        assert_eq!(session.descriptor(800.0).rows.len(), 1);
        session.expand_all();
        session.finish();
        assert_eq!(session.descriptor(800.0).rows.len(), 4);
    }

    #[test]
    fn new_filter_clears_collapsed_nodes() {
        let mut session = GanttSession::new(many_tasks(3), &config(), date(2025, 1, 1));
        session.toggle(&seq("1"));
        let window = session.window_for(date(2025, 1, 1), Lookahead::All, true);
        session.apply_filter(window);
        session.finish();
        assert_eq!(session.descriptor(800.0).rows.len(), 4);
    }

    #[test]
    fn dependencies_can_be_hidden() {
        let tasks = vec![
            TaskRecord::new("a", "1", "A").with_dates(date(2025, 1, 1), date(2025, 1, 3)),
            TaskRecord::new("b", "2", "B").with_dates(date(2025, 1, 6), date(2025, 1, 9)),
        ];
        let store = TaskStore::new("Deps", tasks, vec![DependencyRecord::new("a", "b")]);
        let mut session = GanttSession::new(store, &config(), date(2025, 1, 1));
        session.finish();
        assert_eq!(session.descriptor(800.0).connectors.len(), 1);

        session.set_show_dependencies(false);
        let descriptor = session.descriptor(800.0);
        assert!(descriptor.connectors.is_empty());
        assert_eq!(descriptor.stats.dependencies_total, 1);
        assert_eq!(descriptor.stats.dependencies_rendered, 0);
    }

    #[test]
    fn auto_scale_follows_the_project_span() {
        let auto = GanttConfig {
            auto_scale: true,
            scale_mode: TimelineScale::Month,
            ..config()
        };
        // Every task runs 2025-01-01..05: a short span reads best in days.
        let session = GanttSession::new(many_tasks(3), &auto, date(2025, 1, 1));
        assert_eq!(session.scale(), TimelineScale::Day);

        let empty = GanttSession::new(TaskStore::new("Empty", Vec::new(), Vec::new()), &auto, date(2025, 1, 1));
        assert_eq!(empty.scale(), TimelineScale::Month);

        let fixed = GanttSession::new(many_tasks(3), &config(), date(2025, 1, 1));
        assert_eq!(fixed.scale(), TimelineScale::Week);
    }

    #[test]
    fn scale_change_recomputes_the_timeline() {
        let mut session = GanttSession::new(many_tasks(3), &config(), date(2025, 1, 1));
        let weekly = session.descriptor(800.0).timeline;
        session.set_scale(TimelineScale::Day);
        let daily = session.descriptor(800.0).timeline;
        assert_eq!(weekly.scale, TimelineScale::Week);
        assert_eq!(daily.scale, TimelineScale::Day);
        assert_ne!(weekly.min_date, daily.min_date);
    }

    #[tokio::test]
    async fn async_reveal_completes() {
        let mut session = GanttSession::new(many_tasks(2500), &config(), date(2025, 1, 1));
        let outcome = session.reveal_all().await;
        assert_eq!(outcome, DriveOutcome::Completed { revealed: 2000 });
        assert_eq!(session.descriptor(800.0).stats.truncated_rows, 501);
        assert!(session.render_state().complete);
    }
}
