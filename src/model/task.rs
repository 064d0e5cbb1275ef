use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::seq_num::SeqNum;

/// Identifier of a task as sent by the backend (numbers and strings both occur).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Scalar::deserialize(deserializer)? {
            Scalar::Int(n) => Ok(TaskId(n.to_string())),
            Scalar::Float(f) if f.fract() == 0.0 => Ok(TaskId(format!("{}", f as i64))),
            Scalar::Float(f) => Ok(TaskId(f.to_string())),
            Scalar::Text(s) => Ok(TaskId(s)),
        }
    }
}

/// A JSON scalar that may carry a number either natively or as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};

    use super::Scalar;

    /// Numbers may arrive as JSON numbers or as numeric text (Postgres `numeric`).
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Scalar>::deserialize(deserializer)? {
            Some(Scalar::Int(n)) => Some(n as f64),
            Some(Scalar::Float(f)) => Some(f),
            Some(Scalar::Text(s)) => s.trim().parse::<f64>().ok(),
            None => None,
        })
    }

    /// Sequence keys are usually text but `'1'` can come back as a bare number.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Scalar>::deserialize(deserializer)? {
            Some(Scalar::Int(n)) => Some(n.to_string()),
            Some(Scalar::Float(f)) => Some(f.to_string()),
            Some(Scalar::Text(s)) => Some(s),
            None => None,
        })
    }
}

/// Try parsing a backend date string with the formats the API and XER files use.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// First candidate that is set and not blank; blank strings fall through.
fn first_present<const N: usize>(candidates: [&Option<String>; N]) -> Option<&str> {
    candidates
        .into_iter()
        .filter_map(|c| c.as_deref())
        .find(|s| !s.trim().is_empty())
}

/// Inclusive calendar span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn union(self, other: DateSpan) -> DateSpan {
        DateSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// One row of `GET tasks(projectId)`.
///
/// WBS nodes without activities come back with every task column null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRow {
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub seq_num: Option<String>,
    #[serde(default)]
    pub wbs_id: Option<TaskId>,
    #[serde(default)]
    pub wbs_name: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub task_code: Option<String>,
    #[serde(default, alias = "start_date")]
    pub target_start_date: Option<String>,
    #[serde(default, alias = "end_date")]
    pub target_end_date: Option<String>,
    #[serde(default)]
    pub act_start_date: Option<String>,
    #[serde(default)]
    pub act_end_date: Option<String>,
    #[serde(default)]
    pub early_start_date: Option<String>,
    #[serde(default)]
    pub early_end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub target_drtn_hr_cnt: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total_float_hr_cnt: Option<f64>,
    #[serde(default)]
    pub driving_path_flag: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub phys_complete_pct: Option<f64>,
    #[serde(default)]
    pub status_code: Option<String>,
}

impl TaskRow {
    /// Target start, else actual, else early. Blank columns are skipped.
    pub fn start_date(&self) -> Option<NaiveDate> {
        first_present([&self.target_start_date, &self.act_start_date, &self.early_start_date])
            .and_then(parse_date)
    }

    /// Target finish, else actual, else early.
    pub fn end_date(&self) -> Option<NaiveDate> {
        first_present([&self.target_end_date, &self.act_end_date, &self.early_end_date])
            .and_then(parse_date)
    }
}

/// A normalised task or WBS node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Option<TaskId>,
    pub seq_num: Option<SeqNum>,
    pub wbs_id: Option<TaskId>,
    pub wbs_name: Option<String>,
    pub name: String,
    pub code: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub duration_hours: Option<f64>,
    pub total_float_hours: Option<f64>,
    pub is_on_driving_path: bool,
    /// 0..=100
    pub percent_complete: Option<f32>,
    pub status: Option<String>,
}

impl TaskRecord {
    /// Create a dated task with sensible defaults.
    pub fn new(id: impl Into<String>, seq_num: &str, name: impl Into<String>) -> Self {
        Self {
            id: Some(TaskId::new(id)),
            seq_num: SeqNum::new(seq_num),
            wbs_id: None,
            wbs_name: None,
            name: name.into(),
            code: String::new(),
            start: None,
            end: None,
            duration_hours: None,
            total_float_hours: None,
            is_on_driving_path: false,
            percent_complete: None,
            status: None,
        }
    }

    /// Create a hierarchy-only WBS node.
    pub fn wbs_node(seq_num: &str, wbs_name: impl Into<String>) -> Self {
        let wbs_name = wbs_name.into();
        Self {
            id: None,
            wbs_name: Some(wbs_name),
            ..Self::new("", seq_num, "")
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Own start/end when both are present and ordered.
    pub fn span(&self) -> Option<DateSpan> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => DateSpan::new(start, end),
            _ => None,
        }
    }

    pub fn is_wbs_node(&self) -> bool {
        self.id.is_none() && self.wbs_name.is_some()
    }

    /// Task name, else WBS name.
    pub fn label(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.wbs_name.as_deref().unwrap_or("")
        }
    }
}

impl From<TaskRow> for TaskRecord {
    fn from(row: TaskRow) -> Self {
        let start = row.start_date();
        let end = row.end_date();
        // A reversed span is as unusable as a missing one.
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if s > e => (None, None),
            other => other,
        };

        Self {
            id: row.task_id.filter(|id| !id.0.is_empty()),
            seq_num: row.seq_num.as_deref().and_then(SeqNum::new),
            wbs_id: row.wbs_id,
            wbs_name: row.wbs_name.filter(|n| !n.is_empty()),
            name: row.task_name.unwrap_or_default(),
            code: row.task_code.unwrap_or_default(),
            start,
            end,
            duration_hours: row.target_drtn_hr_cnt,
            total_float_hours: row.total_float_hr_cnt,
            is_on_driving_path: row
                .driving_path_flag
                .as_deref()
                .is_some_and(|f| f.eq_ignore_ascii_case("y")),
            percent_complete: row
                .phys_complete_pct
                .map(|p| p.clamp(0.0, 100.0) as f32),
            status: row.status_code,
        }
    }
}

/// Represents the type of dependency between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DependencyKind {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyKind {
    /// Map a P6 `pred_type` code; unknown codes default to finish-to-start.
    pub fn from_p6(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "PR_SS" | "SS" => DependencyKind::StartToStart,
            "PR_FF" | "FF" => DependencyKind::FinishToFinish,
            "PR_SF" | "SF" => DependencyKind::StartToFinish,
            _ => DependencyKind::FinishToStart,
        }
    }
}

/// One row of `GET dependencies(projectId)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRow {
    #[serde(alias = "predecessor_id")]
    pub pred_task_id: TaskId,
    /// Successor.
    #[serde(alias = "successor_id")]
    pub task_id: TaskId,
    #[serde(default)]
    pub pred_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lag_hr_cnt: Option<f64>,
}

/// A dependency link between two tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    pub kind: DependencyKind,
    pub lag_hours: Option<f64>,
}

impl DependencyRecord {
    pub fn new(predecessor: impl Into<String>, successor: impl Into<String>) -> Self {
        Self {
            predecessor_id: TaskId::new(predecessor),
            successor_id: TaskId::new(successor),
            kind: DependencyKind::FinishToStart,
            lag_hours: None,
        }
    }
}

impl From<DependencyRow> for DependencyRecord {
    fn from(row: DependencyRow) -> Self {
        Self {
            predecessor_id: row.pred_task_id,
            successor_id: row.task_id,
            kind: row
                .pred_type
                .as_deref()
                .map(DependencyKind::from_p6)
                .unwrap_or_default(),
            lag_hours: row.lag_hr_cnt,
        }
    }
}

/// One row of `GET wbs(projectId)`; only shown as auxiliary information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WbsRow {
    pub wbs_id: TaskId,
    #[serde(default)]
    pub wbs_name: Option<String>,
    #[serde(default)]
    pub parent_wbs_id: Option<TaskId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub seq_num: Option<String>,
}

/// One row of `GET resources(projectId)`; only shown as auxiliary information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRow {
    pub task_id: TaskId,
    #[serde(default)]
    pub rsrc_id: Option<TaskId>,
    #[serde(default)]
    pub rsrc_name: Option<String>,
    #[serde(default)]
    pub rsrc_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub target_qty: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_backend_date_formats() {
        assert_eq!(parse_date("2025-01-10"), Some(date(2025, 1, 10)));
        assert_eq!(parse_date("2025-01-10T00:00:00.000Z"), Some(date(2025, 1, 10)));
        assert_eq!(parse_date("2025-01-10 08:00"), Some(date(2025, 1, 10)));
        assert_eq!(parse_date("2025-01-10 17:00:00"), Some(date(2025, 1, 10)));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn task_row_prefers_target_dates_then_actuals() {
        let json = r#"{
            "task_id": 4021,
            "seq_num": "1.02",
            "wbs_id": "77",
            "task_name": "Pour slab",
            "task_code": "A1010",
            "target_start_date": null,
            "act_start_date": "2025-03-01T00:00:00Z",
            "target_end_date": "2025-03-09",
            "target_drtn_hr_cnt": "56.0",
            "total_float_hr_cnt": 0,
            "driving_path_flag": "Y",
            "phys_complete_pct": 120
        }"#;
        let row: TaskRow = serde_json::from_str(json).unwrap();
        let record = TaskRecord::from(row);

        assert_eq!(record.id, Some(TaskId::new("4021")));
        assert_eq!(record.seq_num.as_ref().map(SeqNum::as_str), Some("1.02"));
        assert_eq!(record.start, Some(date(2025, 3, 1)));
        assert_eq!(record.end, Some(date(2025, 3, 9)));
        assert_eq!(record.duration_hours, Some(56.0));
        assert!(record.is_on_driving_path);
        assert_eq!(record.percent_complete, Some(100.0));
        assert!(!record.is_wbs_node());
    }

    #[test]
    fn blank_target_dates_fall_back_to_actuals_then_early() {
        let row = TaskRow {
            task_id: Some(TaskId::new("9")),
            target_start_date: Some(String::new()),
            act_start_date: Some("2025-04-02".into()),
            target_end_date: Some("  ".into()),
            act_end_date: None,
            early_end_date: Some("2025-04-20".into()),
            ..Default::default()
        };
        let record = TaskRecord::from(row);
        assert_eq!(record.start, Some(date(2025, 4, 2)));
        assert_eq!(record.end, Some(date(2025, 4, 20)));
    }

    #[test]
    fn wbs_only_rows_become_hierarchy_nodes() {
        let json = r#"{ "seq_num": "1", "wbs_name": "Site works", "task_id": null }"#;
        let record = TaskRecord::from(serde_json::from_str::<TaskRow>(json).unwrap());
        assert!(record.is_wbs_node());
        assert_eq!(record.label(), "Site works");
        assert_eq!(record.span(), None);
    }

    #[test]
    fn reversed_dates_are_dropped() {
        let row = TaskRow {
            task_id: Some(TaskId::new("1")),
            target_start_date: Some("2025-02-01".into()),
            target_end_date: Some("2025-01-01".into()),
            ..Default::default()
        };
        let record = TaskRecord::from(row);
        assert_eq!(record.start, None);
        assert_eq!(record.end, None);
    }

    #[test]
    fn dependency_rows_map_p6_types() {
        let json = r#"{ "pred_task_id": 10, "task_id": "11", "pred_type": "PR_SS", "lag_hr_cnt": "8" }"#;
        let dep = DependencyRecord::from(serde_json::from_str::<DependencyRow>(json).unwrap());
        assert_eq!(dep.predecessor_id, TaskId::new("10"));
        assert_eq!(dep.successor_id, TaskId::new("11"));
        assert_eq!(dep.kind, DependencyKind::StartToStart);
        assert_eq!(dep.lag_hours, Some(8.0));
        assert_eq!(DependencyKind::from_p6("PR_XX"), DependencyKind::FinishToStart);
    }

    #[test]
    fn view_based_endpoints_use_alternate_column_names() {
        let json = r#"{ "successor_id": 5, "predecessor_id": 4, "pred_type": "PR_FS" }"#;
        let dep = DependencyRecord::from(serde_json::from_str::<DependencyRow>(json).unwrap());
        assert_eq!(dep.predecessor_id, TaskId::new("4"));
        assert_eq!(dep.successor_id, TaskId::new("5"));

        let json = r#"{ "task_id": 5, "seq_num": 2, "start_date": "2025-05-01", "end_date": "2025-05-03" }"#;
        let record = TaskRecord::from(serde_json::from_str::<TaskRow>(json).unwrap());
        assert_eq!(record.seq_num.as_ref().map(SeqNum::as_str), Some("2"));
        assert_eq!(record.span().map(|s| s.end), Some(date(2025, 5, 3)));
    }
}
