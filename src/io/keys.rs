//! Sequence keys for sources that only give parent links.

use std::collections::HashMap;

use crate::model::{TaskId, TaskRow};

/// Key of the `rank`-th child (0-based) of `parent`.
///
/// Two digits keep siblings aligned in the table; ordering is by value either way.
pub fn child_key(parent: &str, rank: usize) -> String {
    format!("{parent}.{:02}", rank + 1)
}

/// Key each task under its group node, ordered by start date then code.
///
/// `groups[i]` is the node task `i` belongs to. Tasks whose node has no key
/// are left unkeyed.
pub fn assign_task_keys(
    tasks: &mut [TaskRow],
    groups: &[Option<TaskId>],
    keys: &HashMap<TaskId, String>,
) {
    let mut by_group: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, group) in groups.iter().enumerate().take(tasks.len()) {
        if let Some(key) = group.as_ref().and_then(|g| keys.get(g)) {
            by_group.entry(key.as_str()).or_default().push(idx);
        }
    }

    let mut assigned: Vec<(usize, String)> = Vec::with_capacity(tasks.len());
    for (group_key, mut members) in by_group {
        members.sort_by(|&a, &b| {
            tasks[a]
                .start_date()
                .cmp(&tasks[b].start_date())
                .then_with(|| tasks[a].task_code.cmp(&tasks[b].task_code))
        });
        for (rank, idx) in members.into_iter().enumerate() {
            assigned.push((idx, format!("{group_key}.A{:04}", rank + 1)));
        }
    }

    for (idx, key) in assigned {
        tasks[idx].seq_num = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, code: &str, start: Option<&str>) -> TaskRow {
        TaskRow {
            task_id: Some(TaskId::new(id)),
            task_code: Some(code.into()),
            target_start_date: start.map(str::to_string),
            ..TaskRow::default()
        }
    }

    #[test]
    fn tasks_are_ranked_by_start_then_code() {
        let mut tasks = vec![
            task("1", "B", Some("2025-02-01")),
            task("2", "A", Some("2025-02-01")),
            task("3", "C", Some("2025-01-01")),
            task("4", "D", None),
        ];
        let groups = vec![
            Some(TaskId::new("n")),
            Some(TaskId::new("n")),
            Some(TaskId::new("n")),
            Some(TaskId::new("missing")),
        ];
        let keys = HashMap::from([(TaskId::new("n"), "1.02".to_string())]);
        assign_task_keys(&mut tasks, &groups, &keys);

        let got: Vec<Option<&str>> = tasks.iter().map(|t| t.seq_num.as_deref()).collect();
        assert_eq!(
            got,
            vec![Some("1.02.A0003"), Some("1.02.A0002"), Some("1.02.A0001"), None]
        );
    }

    #[test]
    fn child_keys_are_two_digit_ranks() {
        assert_eq!(child_key("1", 0), "1.01");
        assert_eq!(child_key("2.03", 11), "2.03.12");
    }
}
