//! Import of Primavera P6 XER exports.
//!
//! An XER file is tab separated: `%T` starts a table, `%F` lists its fields,
//! `%R` is one row and `%E` ends the file.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use tracing::{debug, info, warn};

use super::keys::{assign_task_keys, child_key};
use crate::error::{GanttError, Result};
use crate::model::{
    DependencyRecord, DependencyRow, ProjectId, ProjectSummary, ResourceRow, TaskId, TaskRecord,
    TaskRow, TaskStore, WbsRow,
};

/// One `%T` block.
#[derive(Debug, Clone, Default)]
pub struct XerTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl XerTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Rows as field-name lookups; empty cells read as `None`.
    pub fn records(&self) -> impl Iterator<Item = XerRecord<'_>> {
        self.rows.iter().map(move |values| XerRecord {
            table: self,
            values,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct XerRecord<'a> {
    table: &'a XerTable,
    values: &'a [String],
}

impl<'a> XerRecord<'a> {
    pub fn get(&self, field: &str) -> Option<&'a str> {
        let idx = self.table.column(field)?;
        self.values
            .get(idx)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn owned(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }

    fn id(&self, field: &str) -> Option<TaskId> {
        self.get(field).map(TaskId::new)
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(|v| v.parse().ok())
    }
}

/// All tables of one XER file.
#[derive(Debug, Clone, Default)]
pub struct XerFile {
    tables: HashMap<String, XerTable>,
}

impl XerFile {
    /// Read and parse `path`. Non-UTF-8 bytes (P6 writes Windows-1252) are replaced.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| GanttError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(content.as_bytes());

        let mut tables: HashMap<String, XerTable> = HashMap::new();
        let mut current: Option<String> = None;

        for result in reader.records() {
            let record = result.map_err(|e| GanttError::Decode {
                what: "XER file".into(),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let mut cells = record.iter();
            match cells.next().map(str::trim) {
                Some("%T") => {
                    let name = cells.next().unwrap_or("").trim().to_string();
                    if name.is_empty() {
                        return Err(GanttError::Xer(format!("unnamed table at line {line}")));
                    }
                    tables.entry(name.clone()).or_default();
                    current = Some(name);
                }
                Some("%F") => {
                    let table = current
                        .as_ref()
                        .and_then(|name| tables.get_mut(name))
                        .ok_or_else(|| GanttError::Xer(format!("fields outside a table at line {line}")))?;
                    table.fields = cells.map(|c| c.trim().to_string()).collect();
                }
                Some("%R") => {
                    let table = current
                        .as_ref()
                        .and_then(|name| tables.get_mut(name))
                        .ok_or_else(|| GanttError::Xer(format!("row outside a table at line {line}")))?;
                    if table.fields.is_empty() {
                        return Err(GanttError::Xer(format!("row before field list at line {line}")));
                    }
                    table.rows.push(cells.map(str::to_string).collect());
                }
                Some("%E") => current = None,
                // ERMHDR and blank lines
                _ => {}
            }
        }

        debug!(tables = tables.len(), "XER parsed");
        Ok(Self { tables })
    }

    pub fn table(&self, name: &str) -> Option<&XerTable> {
        self.tables.get(name)
    }

    fn records(&self, name: &str) -> impl Iterator<Item = XerRecord<'_>> {
        self.tables.get(name).into_iter().flat_map(XerTable::records)
    }

    pub fn projects(&self) -> Vec<ProjectSummary> {
        self.records("PROJECT")
            .filter_map(|r| {
                Some(ProjectSummary {
                    proj_id: r.id("proj_id")?,
                    proj_name: r.owned("proj_short_name"),
                    plan_start_date: r.owned("plan_start_date"),
                    plan_end_date: r.owned("plan_end_date"),
                    data_date: r.owned("last_recalc_date"),
                })
            })
            .collect()
    }

    /// Build the store for `project`, or for the first project when `None`.
    pub fn project_store(&self, project: Option<&ProjectId>) -> Result<TaskStore> {
        if self.table("TASK").is_none() {
            return Err(GanttError::Xer("no TASK table".into()));
        }
        let projects = self.projects();
        let summary = match project {
            Some(id) => projects
                .iter()
                .find(|p| &p.proj_id == id)
                .ok_or_else(|| GanttError::Xer(format!("project {id} not in file")))?,
            None => projects
                .first()
                .ok_or_else(|| GanttError::Xer("no PROJECT rows".into()))?,
        };
        let proj_id = &summary.proj_id;
        let in_project = |r: &XerRecord<'_>| r.get("proj_id") == Some(proj_id.as_str());

        let wbs: Vec<WbsNode> = self
            .records("PROJWBS")
            .filter(in_project)
            .filter_map(|r| {
                Some(WbsNode {
                    id: r.id("wbs_id")?,
                    parent: r.id("parent_wbs_id"),
                    short_name: r.owned("wbs_short_name").unwrap_or_default(),
                    name: r.owned("wbs_name").unwrap_or_default(),
                    seq: r.number("seq_num").unwrap_or(0.0),
                    is_project_node: r.get("proj_node_flag") == Some("Y"),
                })
            })
            .collect();
        let keys = wbs_keys(&wbs);

        let mut rows: Vec<TaskRow> = wbs
            .iter()
            .filter_map(|node| {
                Some(TaskRow {
                    seq_num: Some(keys.get(&node.id)?.clone()),
                    wbs_id: Some(node.id.clone()),
                    wbs_name: Some(if node.is_project_node {
                        summary.display_name()
                    } else {
                        node.name.clone()
                    }),
                    ..TaskRow::default()
                })
            })
            .collect();

        let mut tasks: Vec<TaskRow> = self
            .records("TASK")
            .filter(in_project)
            .filter_map(|r| {
                Some(TaskRow {
                    task_id: Some(r.id("task_id")?),
                    seq_num: None,
                    wbs_id: r.id("wbs_id"),
                    wbs_name: None,
                    task_name: r.owned("task_name"),
                    task_code: r.owned("task_code"),
                    target_start_date: r.owned("target_start_date"),
                    target_end_date: r.owned("target_end_date"),
                    act_start_date: r.owned("act_start_date"),
                    act_end_date: r.owned("act_end_date"),
                    early_start_date: r.owned("early_start_date"),
                    early_end_date: r.owned("early_end_date"),
                    target_drtn_hr_cnt: r.number("target_drtn_hr_cnt"),
                    total_float_hr_cnt: r.number("total_float_hr_cnt"),
                    driving_path_flag: r.owned("driving_path_flag"),
                    phys_complete_pct: r.number("phys_complete_pct"),
                    status_code: r.owned("status_code"),
                })
            })
            .collect();
        let groups: Vec<Option<TaskId>> = tasks.iter().map(|t| t.wbs_id.clone()).collect();
        assign_task_keys(&mut tasks, &groups, &keys);
        let task_count = tasks.len();
        rows.extend(tasks);

        let dependencies: Vec<DependencyRecord> = self
            .records("TASKPRED")
            .filter(in_project)
            .filter_map(|r| {
                Some(DependencyRow {
                    pred_task_id: r.id("pred_task_id")?,
                    task_id: r.id("task_id")?,
                    pred_type: r.owned("pred_type"),
                    lag_hr_cnt: r.number("lag_hr_cnt"),
                })
            })
            .map(DependencyRecord::from)
            .collect();

        let wbs_rows: Vec<WbsRow> = wbs
            .iter()
            .map(|node| WbsRow {
                wbs_id: node.id.clone(),
                wbs_name: Some(node.name.clone()),
                parent_wbs_id: node.parent.clone(),
                seq_num: keys.get(&node.id).cloned(),
            })
            .collect();

        info!(
            project = %proj_id,
            wbs = wbs.len(),
            tasks = task_count,
            dependencies = dependencies.len(),
            "XER project imported"
        );

        let records: Vec<TaskRecord> = rows.into_iter().map(TaskRecord::from).collect();
        Ok(TaskStore::new(summary.display_name(), records, dependencies)
            .with_auxiliary(wbs_rows, self.resources(proj_id)))
    }

    /// `TASKRSRC` joined with `RSRC`.
    fn resources(&self, proj_id: &ProjectId) -> Vec<ResourceRow> {
        let names: HashMap<&str, (Option<String>, Option<String>)> = self
            .records("RSRC")
            .filter_map(|r| Some((r.get("rsrc_id")?, (r.owned("rsrc_name"), r.owned("rsrc_type")))))
            .collect();

        self.records("TASKRSRC")
            .filter(|r| r.get("proj_id") == Some(proj_id.as_str()))
            .filter_map(|r| {
                let rsrc_id = r.get("rsrc_id");
                let (rsrc_name, rsrc_type) = rsrc_id
                    .and_then(|id| names.get(id).cloned())
                    .unwrap_or_default();
                Some(ResourceRow {
                    task_id: r.id("task_id")?,
                    rsrc_id: rsrc_id.map(TaskId::new),
                    rsrc_name,
                    rsrc_type,
                    target_qty: r.number("target_qty"),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct WbsNode {
    id: TaskId,
    parent: Option<TaskId>,
    short_name: String,
    name: String,
    seq: f64,
    is_project_node: bool,
}

/// Sequence keys for every WBS node reachable from the project node.
///
/// The project node is `"1"`; each child is `parent + "." + rank`, the rank
/// being its two-digit position among siblings ordered by short name. Without
/// a project node, nodes whose parent is unknown become the roots.
fn wbs_keys(nodes: &[WbsNode]) -> HashMap<TaskId, String> {
    let known: HashMap<&TaskId, &WbsNode> = nodes.iter().map(|n| (&n.id, n)).collect();
    let mut children: HashMap<&TaskId, Vec<&WbsNode>> = HashMap::new();
    let mut roots: Vec<&WbsNode> = Vec::new();

    let project_node = nodes.iter().find(|n| n.is_project_node);
    for node in nodes {
        match (&node.parent, project_node) {
            (_, Some(root)) if root.id == node.id => {}
            (Some(parent), _) if known.contains_key(parent) => {
                children.entry(parent).or_default().push(node)
            }
            (_, None) => roots.push(node),
            // Orphan under a project node: unreachable, like the backend query.
            _ => {}
        }
    }

    let by_short_name = |a: &&WbsNode, b: &&WbsNode| {
        a.short_name
            .cmp(&b.short_name)
            .then(a.seq.total_cmp(&b.seq))
            .then_with(|| a.id.cmp(&b.id))
    };

    let mut keys: HashMap<TaskId, String> = HashMap::new();
    let mut queue: VecDeque<&WbsNode> = VecDeque::new();
    match project_node {
        Some(root) => {
            keys.insert(root.id.clone(), "1".to_string());
            queue.push_back(root);
        }
        None => {
            roots.sort_by(by_short_name);
            for (rank, node) in roots.into_iter().enumerate() {
                keys.insert(node.id.clone(), (rank + 1).to_string());
                queue.push_back(node);
            }
        }
    }

    while let Some(node) = queue.pop_front() {
        let Some(mut kids) = children.remove(&node.id) else {
            continue;
        };
        let Some(parent_key) = keys.get(&node.id).cloned() else {
            continue;
        };
        kids.sort_by(by_short_name);
        for (rank, kid) in kids.into_iter().enumerate() {
            keys.insert(kid.id.clone(), child_key(&parent_key, rank));
            queue.push_back(kid);
        }
    }

    let unreachable = nodes.len() - keys.len();
    if unreachable > 0 {
        warn!(unreachable, "WBS nodes not connected to the project node were skipped");
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ERMHDR\t19.12\t2025-01-01\tProject\tadmin\n\
%T\tPROJECT\n\
%F\tproj_id\tproj_short_name\tplan_start_date\tplan_end_date\tlast_recalc_date\n\
%R\t100\tPLANT-A\t2025-01-01 08:00\t2025-03-01 17:00\t2025-01-15 00:00\n\
%T\tPROJWBS\n\
%F\twbs_id\tproj_id\tproj_node_flag\tseq_num\twbs_short_name\twbs_name\tparent_wbs_id\n\
%R\t1\t100\tY\t0\tPLANT-A\tPlant A\t\n\
%R\t2\t100\tN\t10\tENG\tEngineering\t1\n\
%R\t3\t100\tN\t20\tCON\tConstruction\t1\n\
%R\t4\t100\tN\t10\tCIV\tCivil\t3\n\
%R\t9\t100\tN\t10\tLOST\tOrphan\t77\n\
%T\tTASK\n\
%F\ttask_id\tproj_id\twbs_id\ttask_code\ttask_name\tstatus_code\ttarget_start_date\ttarget_end_date\tact_start_date\tact_end_date\ttarget_drtn_hr_cnt\ttotal_float_hr_cnt\tdriving_path_flag\tphys_complete_pct\n\
%R\t500\t100\t2\tE1010\tDesign review\tTK_Active\t2025-01-06 08:00\t2025-01-10 17:00\t\t\t40\t0\tY\t50\n\
%R\t501\t100\t4\tC1010\tExcavation\tTK_NotStart\t2025-01-13 08:00\t2025-01-24 17:00\t\t\t80\t16\tN\t0\n\
%R\t502\t100\t2\tE1000\tKick-off\tTK_Complete\t2025-01-02 08:00\t2025-01-02 17:00\t\t\t8\t0\tN\t100\n\
%T\tTASKPRED\n\
%F\ttask_pred_id\ttask_id\tpred_task_id\tproj_id\tpred_type\tlag_hr_cnt\n\
%R\t1\t500\t502\t100\tPR_FS\t0\n\
%R\t2\t501\t500\t100\tPR_SS\t8\n\
%T\tRSRC\n\
%F\trsrc_id\trsrc_name\trsrc_type\n\
%R\t70\tExcavator\tRT_Equip\n\
%T\tTASKRSRC\n\
%F\ttaskrsrc_id\ttask_id\tproj_id\trsrc_id\ttarget_qty\n\
%R\t1\t501\t100\t70\t80\n\
%E\n";

    fn keyed(store: &TaskStore) -> Vec<(String, String)> {
        store
            .tasks()
            .iter()
            .map(|t| {
                (
                    t.seq_num.as_ref().map(|s| s.to_string()).unwrap_or_default(),
                    t.label().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn parses_tables_and_fields() {
        let xer = XerFile::parse(SAMPLE).unwrap();
        let task = xer.table("TASK").unwrap();
        assert_eq!(task.rows.len(), 3);
        let first = task.records().next().unwrap();
        assert_eq!(first.get("task_code"), Some("E1010"));
        assert_eq!(first.get("act_start_date"), None);
    }

    #[test]
    fn builds_wbs_keys_and_nests_tasks() {
        let store = XerFile::parse(SAMPLE).unwrap().project_store(None).unwrap();
        let pairs = keyed(&store);
        let expected: Vec<(String, String)> = [
            ("1", "PLANT-A"),
            ("1.01", "Construction"),
            ("1.01.01", "Civil"),
            ("1.01.01.A0001", "Excavation"),
            ("1.02", "Engineering"),
            ("1.02.A0001", "Kick-off"),
            ("1.02.A0002", "Design review"),
        ]
        .iter()
        .map(|(k, l)| (k.to_string(), l.to_string()))
        .collect();
        pretty_assertions::assert_eq!(pairs, expected);
    }

    #[test]
    fn imports_dependencies_and_resources() {
        let store = XerFile::parse(SAMPLE).unwrap().project_store(None).unwrap();
        assert_eq!(store.dependencies().len(), 2);
        assert_eq!(store.dependencies()[1].lag_hours, Some(8.0));
        assert_eq!(store.resources().len(), 1);
        assert_eq!(store.resources()[0].rsrc_name.as_deref(), Some("Excavator"));
        assert_eq!(store.wbs().len(), 5);

        let design = store.get(&TaskId::new("500")).unwrap();
        assert!(design.is_on_driving_path);
        assert_eq!(design.percent_complete, Some(50.0));
    }

    #[test]
    fn unknown_project_is_an_error() {
        let xer = XerFile::parse(SAMPLE).unwrap();
        let err = xer.project_store(Some(&TaskId::new("999"))).unwrap_err();
        assert!(matches!(err, GanttError::Xer(_)));
    }

    #[test]
    fn rows_before_fields_are_rejected() {
        let err = XerFile::parse("%T\tTASK\n%R\t1\n").unwrap_err();
        assert!(matches!(err, GanttError::Xer(_)));
        let err = XerFile::parse("%T\tPROJECT\n%F\tproj_id\n%R\t1\n")
            .unwrap()
            .project_store(None)
            .unwrap_err();
        assert!(matches!(err, GanttError::Xer(_)));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plant.xer");
        std::fs::write(&path, SAMPLE).unwrap();
        let xer = XerFile::read(&path).unwrap();
        assert_eq!(xer.projects().len(), 1);
        assert_eq!(xer.projects()[0].display_name(), "PLANT-A");
    }
}
