use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::task::{DateSpan, DependencyRecord, ResourceRow, TaskId, TaskRecord, WbsRow};
use crate::engine::hierarchy;

/// Projects are addressed with the same lenient id type as tasks.
pub type ProjectId = TaskId;

/// One row of `GET projects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub proj_id: ProjectId,
    #[serde(default)]
    pub proj_name: Option<String>,
    #[serde(default)]
    pub plan_start_date: Option<String>,
    #[serde(default)]
    pub plan_end_date: Option<String>,
    #[serde(default)]
    pub data_date: Option<String>,
}

impl ProjectSummary {
    pub fn display_name(&self) -> String {
        self.proj_name
            .clone()
            .unwrap_or_else(|| format!("Project {}", self.proj_id))
    }
}

/// Everything fetched for one project, in hierarchy order.
///
/// Built once per project selection and replaced wholesale on the next one.
#[derive(Debug, Clone)]
pub struct TaskStore {
    pub name: String,
    pub loaded_at: DateTime<Utc>,
    tasks: Vec<TaskRecord>,
    rollups: Vec<Option<DateSpan>>,
    dependencies: Vec<DependencyRecord>,
    wbs: Vec<WbsRow>,
    resources: Vec<ResourceRow>,
    by_id: HashMap<TaskId, usize>,
    bounds: Option<DateSpan>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new("Untitled Project", Vec::new(), Vec::new())
    }
}

impl TaskStore {
    pub fn new(
        name: impl Into<String>,
        tasks: Vec<TaskRecord>,
        dependencies: Vec<DependencyRecord>,
    ) -> Self {
        let tasks = hierarchy::into_hierarchy_order(tasks);
        let rollups = compute_rollups(&tasks);
        let bounds = compute_bounds(&tasks);
        let by_id = tasks
            .iter()
            .enumerate()
            .filter_map(|(idx, t)| t.id.clone().map(|id| (id, idx)))
            .collect();

        debug!(
            tasks = tasks.len(),
            dependencies = dependencies.len(),
            ?bounds,
            "task store built"
        );

        Self {
            name: name.into(),
            loaded_at: Utc::now(),
            tasks,
            rollups,
            dependencies,
            wbs: Vec::new(),
            resources: Vec::new(),
            by_id,
            bounds,
        }
    }

    /// Attach the auxiliary WBS and resource rows.
    pub fn with_auxiliary(mut self, wbs: Vec<WbsRow>, resources: Vec<ResourceRow>) -> Self {
        self.wbs = wbs;
        self.resources = resources;
        self
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn dependencies(&self) -> &[DependencyRecord] {
        &self.dependencies
    }

    pub fn wbs(&self) -> &[WbsRow] {
        &self.wbs
    }

    pub fn resources(&self) -> &[ResourceRow] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.by_id.get(id).map(|&idx| &self.tasks[idx])
    }

    /// Own span, or the span rolled up from dated descendants for rows without dates.
    pub fn effective_span(&self, index: usize) -> Option<DateSpan> {
        self.tasks
            .get(index)
            .and_then(TaskRecord::span)
            .or_else(|| self.rollups.get(index).copied().flatten())
    }

    /// Global bounds over the entire unfiltered set.
    pub fn bounds(&self) -> Option<DateSpan> {
        self.bounds
    }

    /// Global bounds, or Jan 1 of this year .. Dec 31 of next year when nothing is dated.
    pub fn bounds_or_default(&self, today: NaiveDate) -> DateSpan {
        self.bounds.unwrap_or_else(|| default_bounds(today))
    }
}

fn default_bounds(today: NaiveDate) -> DateSpan {
    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(today.year() + 1, 12, 31).unwrap_or(today);
    DateSpan { start, end }
}

/// Earliest start and latest end, each taken independently.
fn compute_bounds(tasks: &[TaskRecord]) -> Option<DateSpan> {
    let min = tasks.iter().filter_map(|t| t.start).min();
    let max = tasks.iter().filter_map(|t| t.end).max();
    match (min, max) {
        (Some(start), Some(end)) => Some(DateSpan {
            start: start.min(end),
            end: end.max(start),
        }),
        _ => None,
    }
}

/// For each row, the union of its dated descendants' spans.
///
/// Relies on `tasks` being in hierarchy order, where every subtree is a
/// contiguous run directly after its root.
fn compute_rollups(tasks: &[TaskRecord]) -> Vec<Option<DateSpan>> {
    let mut rollups: Vec<Option<DateSpan>> = vec![None; tasks.len()];
    let mut open: Vec<usize> = Vec::new();

    for (idx, task) in tasks.iter().enumerate() {
        let Some(seq) = &task.seq_num else {
            open.clear();
            continue;
        };
        while let Some(&top) = open.last() {
            let top_seq = tasks[top].seq_num.as_ref();
            if top_seq.is_some_and(|s| s == seq || s.is_ancestor_of(seq)) {
                break;
            }
            open.pop();
        }
        if let Some(span) = task.span() {
            for &ancestor in &open {
                let is_ancestor = tasks[ancestor]
                    .seq_num
                    .as_ref()
                    .is_some_and(|s| s.is_ancestor_of(seq));
                if is_ancestor {
                    rollups[ancestor] = Some(match rollups[ancestor] {
                        Some(existing) => existing.union(span),
                        None => span,
                    });
                }
            }
        }
        open.push(idx);
    }
    rollups
}
