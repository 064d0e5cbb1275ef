//! Activity Work Package view: the AWP activity-code tree with each task
//! hung under its package.
//!
//! The backend only sends parent links, so keys are derived here the same
//! way the XER import derives WBS keys. After that the engine treats the
//! packages exactly like WBS nodes.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::keys::{assign_task_keys, child_key};
use crate::model::task::lenient;
use crate::model::{DependencyRecord, DependencyRow, TaskId, TaskRecord, TaskRow, TaskStore, WbsRow};

/// Group for tasks whose package is missing from the hierarchy.
const UNASSIGNED_ID: &str = "unassigned";

/// One row of `GET awp/projects/{id}/hierarchy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwpNodeRow {
    pub actv_code_id: TaskId,
    #[serde(default)]
    pub actv_code_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    /// Null or blank for top-level packages.
    #[serde(default)]
    pub parent_actv_code_id: Option<TaskId>,
    #[serde(default, alias = "seq_num", deserialize_with = "lenient::number")]
    pub sequence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub level: Option<f64>,
    #[serde(default)]
    pub hierarchy_path: Option<String>,
}

impl AwpNodeRow {
    fn label(&self) -> String {
        [&self.actv_code_name, &self.short_name]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| self.actv_code_id.to_string())
    }

    fn parent(&self) -> Option<&TaskId> {
        self.parent_actv_code_id
            .as_ref()
            .filter(|p| !p.as_str().is_empty() && **p != self.actv_code_id)
    }
}

/// One row of `GET awp/projects/{id}/tasks`: the task columns plus its package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwpTaskRow {
    #[serde(flatten)]
    pub task: TaskRow,
    #[serde(default)]
    pub actv_code_id: Option<TaskId>,
    #[serde(default)]
    pub awp_code: Option<String>,
    #[serde(default)]
    pub awp_name: Option<String>,
}

/// Siblings by sequence, then the server's hierarchy path, then short name.
fn sibling_order(a: &&AwpNodeRow, b: &&AwpNodeRow) -> Ordering {
    a.sequence
        .unwrap_or(0.0)
        .total_cmp(&b.sequence.unwrap_or(0.0))
        .then_with(|| a.hierarchy_path.cmp(&b.hierarchy_path))
        .then_with(|| a.short_name.cmp(&b.short_name))
        .then_with(|| a.actv_code_id.cmp(&b.actv_code_id))
}

/// Keys for every package reachable from a top-level one.
///
/// Packages whose parent is not in the list are treated as top level.
/// Packages caught in a parent cycle are unreachable and get no key.
fn awp_keys(nodes: &[AwpNodeRow]) -> HashMap<TaskId, String> {
    let known: HashSet<&TaskId> = nodes.iter().map(|n| &n.actv_code_id).collect();
    let mut children: HashMap<&TaskId, Vec<&AwpNodeRow>> = HashMap::new();
    let mut roots: Vec<&AwpNodeRow> = Vec::new();

    for node in nodes {
        match node.parent() {
            Some(parent) if known.contains(parent) => children.entry(parent).or_default().push(node),
            Some(parent) => {
                debug!(package = %node.actv_code_id, %parent, "parent package missing, shown at top level");
                roots.push(node);
            }
            None => roots.push(node),
        }
    }

    let mut keys: HashMap<TaskId, String> = HashMap::new();
    let mut queue: VecDeque<&AwpNodeRow> = VecDeque::new();
    roots.sort_by(sibling_order);
    for (rank, node) in roots.into_iter().enumerate() {
        keys.insert(node.actv_code_id.clone(), (rank + 1).to_string());
        queue.push_back(node);
    }

    while let Some(node) = queue.pop_front() {
        let Some(mut kids) = children.remove(&node.actv_code_id) else {
            continue;
        };
        let Some(parent_key) = keys.get(&node.actv_code_id).cloned() else {
            continue;
        };
        kids.sort_by(sibling_order);
        for (rank, kid) in kids.into_iter().enumerate() {
            keys.insert(kid.actv_code_id.clone(), child_key(&parent_key, rank));
            queue.push_back(kid);
        }
    }

    let unreachable = known.len().saturating_sub(keys.len());
    if unreachable > 0 {
        warn!(unreachable, "AWP packages in a parent cycle were skipped");
    }
    keys
}

/// Build a store arranged by work package.
///
/// A task listed under several packages is kept under the first one only.
/// Tasks without a known package go in a trailing "Unassigned" group.
pub fn awp_store(
    name: &str,
    nodes: Vec<AwpNodeRow>,
    tasks: Vec<AwpTaskRow>,
    dependencies: Vec<DependencyRow>,
) -> TaskStore {
    let mut keys = awp_keys(&nodes);

    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut duplicates = 0usize;
    let (mut rows, mut groups): (Vec<TaskRow>, Vec<Option<TaskId>>) = tasks
        .into_iter()
        .filter(|t| match &t.task.task_id {
            Some(id) if !seen.insert(id.clone()) => {
                duplicates += 1;
                false
            }
            _ => true,
        })
        .map(|t| {
            let mut row = t.task;
            row.seq_num = None;
            (row, t.actv_code_id)
        })
        .unzip();
    if duplicates > 0 {
        debug!(duplicates, "tasks in more than one package kept under the first");
    }

    let mut records: Vec<TaskRecord> = nodes
        .iter()
        .filter_map(|node| {
            let key = keys.get(&node.actv_code_id)?;
            let mut record = TaskRecord::wbs_node(key, node.label());
            record.code = node.short_name.clone().unwrap_or_default();
            record.wbs_id = Some(node.actv_code_id.clone());
            Some(record)
        })
        .collect();

    let orphans = groups
        .iter()
        .filter(|g| g.as_ref().map_or(true, |id| !keys.contains_key(id)))
        .count();
    if orphans > 0 {
        let top_level = keys.values().filter(|k| !k.contains('.')).count();
        let key = (top_level + 1).to_string();
        let bucket = TaskId::new(UNASSIGNED_ID);
        for group in groups.iter_mut() {
            if group.as_ref().map_or(true, |id| !keys.contains_key(id)) {
                *group = Some(bucket.clone());
            }
        }
        records.push(TaskRecord::wbs_node(&key, "Unassigned"));
        keys.insert(bucket, key);
        warn!(orphans, "tasks without a known AWP package");
    }

    assign_task_keys(&mut rows, &groups, &keys);

    let wbs_rows: Vec<WbsRow> = nodes
        .iter()
        .map(|node| WbsRow {
            wbs_id: node.actv_code_id.clone(),
            wbs_name: Some(node.label()),
            parent_wbs_id: node.parent().cloned(),
            seq_num: keys.get(&node.actv_code_id).cloned(),
        })
        .collect();

    info!(
        packages = nodes.len(),
        tasks = rows.len(),
        dependencies = dependencies.len(),
        "AWP hierarchy built"
    );

    records.extend(rows.into_iter().map(TaskRecord::from));
    let dependencies = dependencies.into_iter().map(DependencyRecord::from).collect();
    TaskStore::new(name, records, dependencies).with_auxiliary(wbs_rows, Vec::new())
}
