//! End-to-end runs of the layout engine over small schedules.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use wbs_gantt::engine::{DriveOutcome, GenerationCounter};
use wbs_gantt::io::{awp_store, AwpNodeRow, AwpTaskRow};
use wbs_gantt::model::{DependencyRecord, DependencyRow, SeqNum, TaskRecord, TaskStore, TimelineScale};
use wbs_gantt::{GanttConfig, GanttSession, LayoutDescriptor, Lookahead};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seq(s: &str) -> SeqNum {
    SeqNum::new(s).unwrap()
}

/// Two phases; the first is a pure WBS node over Design and Build.
fn phases(dependencies: Vec<DependencyRecord>) -> TaskStore {
    let tasks = vec![
        TaskRecord::new("build", "1.2", "Build").with_dates(date(2025, 1, 11), date(2025, 2, 1)),
        TaskRecord::new("phase-b", "2", "Phase B").with_dates(date(2025, 2, 2), date(2025, 2, 10)),
        TaskRecord::wbs_node("1", "Phase A"),
        TaskRecord::new("design", "1.1", "Design").with_dates(date(2025, 1, 1), date(2025, 1, 10)),
    ];
    TaskStore::new("Phases", tasks, dependencies)
}

fn everything() -> GanttConfig {
    GanttConfig {
        lookahead_days: Lookahead::All,
        include_past_tasks: true,
        ..GanttConfig::default()
    }
}

fn keys(descriptor: &LayoutDescriptor) -> Vec<&str> {
    descriptor
        .rows
        .iter()
        .map(|r| r.seq_num.as_ref().map_or("", |s| s.as_str()))
        .collect()
}

#[test]
fn collapse_and_expand_phase_a() {
    let mut session = GanttSession::new(phases(Vec::new()), &everything(), date(2025, 1, 1));
    session.finish();
    let all = session.descriptor(1000.0);
    assert_eq!(keys(&all), vec!["1", "1.1", "1.2", "2"]);
    assert_eq!(
        all.rows.iter().map(|r| r.depth).collect::<Vec<_>>(),
        vec![1, 2, 2, 1]
    );
    assert!(all.rows[0].is_parent);
    assert!(!all.rows[3].is_parent);

    assert!(session.toggle(&seq("1")));
    session.finish();
    let collapsed = session.descriptor(1000.0);
    assert_eq!(keys(&collapsed), vec!["1", "2"]);
    assert!(collapsed.rows[0].is_collapsed);

    assert!(session.toggle(&seq("1")));
    session.finish();
    assert_eq!(session.descriptor(1000.0), all);
}

#[test]
fn wbs_node_has_no_bar_but_keeps_its_row() {
    let mut session = GanttSession::new(phases(Vec::new()), &everything(), date(2025, 1, 1));
    session.finish();
    let descriptor = session.descriptor(1000.0);

    assert_eq!(descriptor.rows[0].label, "Phase A");
    assert!(descriptor.rows[0].is_wbs);
    assert!(descriptor.rows[0].bar.is_none());
    assert!(descriptor.rows[1..].iter().all(|r| r.bar.is_some()));

    // Bars sit on their own row, in order.
    let tops: Vec<f32> = descriptor.rows[1..]
        .iter()
        .filter_map(|r| r.bar.map(|b| b.top))
        .collect();
    assert_eq!(tops, vec![36.0, 66.0, 96.0]);
}

#[test]
fn dependency_direction_follows_bar_positions() {
    let deps = vec![
        DependencyRecord::new("design", "build"),
        DependencyRecord::new("build", "design"),
    ];
    let mut session = GanttSession::new(phases(deps), &everything(), date(2025, 1, 1));
    session.set_scale(TimelineScale::Day);
    session.finish();
    let descriptor = session.descriptor(1000.0);

    let flags: Vec<(&str, &str, bool)> = descriptor
        .connectors
        .iter()
        .map(|c| (c.predecessor.as_str(), c.successor.as_str(), c.is_backward))
        .collect();
    assert_eq!(
        flags,
        vec![("design", "build", false), ("build", "design", true)]
    );
}

#[test]
fn edges_to_collapsed_rows_are_not_routed() {
    let deps = vec![
        DependencyRecord::new("design", "build"),
        DependencyRecord::new("build", "phase-b"),
    ];
    let mut session = GanttSession::new(phases(deps), &everything(), date(2025, 1, 1));
    session.toggle(&seq("1"));
    session.finish();
    let descriptor = session.descriptor(1000.0);
    assert!(descriptor.connectors.is_empty());
    assert_eq!(descriptor.stats.dependencies_total, 2);
}

#[test]
fn lookahead_window_hides_finished_and_far_tasks() {
    let config = GanttConfig {
        lookahead_days: Lookahead::Days(14),
        include_past_tasks: false,
        ..GanttConfig::default()
    };
    let mut session = GanttSession::new(phases(Vec::new()), &config, date(2025, 1, 15));
    session.finish();
    let descriptor = session.descriptor(1000.0);

    // Design finished before the 15th, Phase B starts after the 29th.
    assert_eq!(keys(&descriptor), vec!["1", "1.2"]);
    assert_eq!(descriptor.stats.total, 4);
    assert_eq!(descriptor.stats.filtered, 2);
}

#[test]
fn timeline_comes_from_the_whole_project() {
    let config = GanttConfig {
        lookahead_days: Lookahead::Days(14),
        ..GanttConfig::default()
    };
    let mut session = GanttSession::new(phases(Vec::new()), &config, date(2025, 1, 15));
    let narrow = session.descriptor(1000.0).timeline;

    let window = session.window_for(date(2025, 1, 15), Lookahead::All, true);
    session.apply_filter(window);
    let wide = session.descriptor(1000.0).timeline;

    assert_eq!(narrow, wide);
}

#[tokio::test]
async fn newer_load_supersedes_an_unfinished_reveal() {
    let counter = GenerationCounter::new();
    let big: Vec<TaskRecord> = (1..=3000)
        .map(|i| {
            TaskRecord::new(format!("t{i}"), &format!("1.{i}"), format!("Task {i}"))
                .with_dates(date(2025, 1, 1), date(2025, 1, 20))
        })
        .collect();

    let mut old = GanttSession::with_counter(
        TaskStore::new("Old", big, Vec::new()),
        &everything(),
        date(2025, 1, 1),
        counter.clone(),
    );
    assert!(old.is_revealing());

    let mut new = GanttSession::with_counter(phases(Vec::new()), &everything(), date(2025, 1, 1), counter);

    let outcome = old.reveal_all().await;
    assert!(matches!(outcome, DriveOutcome::Superseded { .. }));
    assert!(!old.render_state().complete);

    assert_eq!(new.reveal_all().await, DriveOutcome::Completed { revealed: 4 });
    assert_eq!(keys(&new.descriptor(1000.0)), vec!["1", "1.1", "1.2", "2"]);
}

/// Area A over package A1, as the AWP endpoints return it.
fn awp_plant() -> TaskStore {
    let nodes: Vec<AwpNodeRow> = serde_json::from_str(
        r#"[
            {"actv_code_id": 20, "actv_code_name": "Pkg A1", "short_name": "A1",
             "parent_actv_code_id": 10, "seq_num": "1", "hierarchy_path": "A/A1"},
            {"actv_code_id": 10, "actv_code_name": "Area A", "short_name": "A",
             "parent_actv_code_id": null, "seq_num": "1", "hierarchy_path": "A"}
        ]"#,
    )
    .unwrap();
    let tasks: Vec<AwpTaskRow> = serde_json::from_str(
        r#"[
            {"task_id": 2, "task_code": "A200", "task_name": "Pour",
             "target_start_date": "2025-01-10", "target_end_date": "2025-01-20",
             "actv_code_id": 20},
            {"task_id": 1, "task_code": "A100", "task_name": "Excavate",
             "target_start_date": "", "act_start_date": "2025-01-01",
             "target_end_date": "2025-01-09", "actv_code_id": 20}
        ]"#,
    )
    .unwrap();
    let dependencies: Vec<DependencyRow> =
        serde_json::from_str(r#"[{"pred_task_id": 1, "task_id": 2, "pred_type": "PR_FS"}]"#).unwrap();
    awp_store("Plant", nodes, tasks, dependencies)
}

#[test]
fn awp_packages_collapse_like_wbs_nodes() {
    let mut session = GanttSession::new(awp_plant(), &everything(), date(2025, 1, 1));
    session.finish();
    let all = session.descriptor(1000.0);
    assert_eq!(keys(&all), vec!["1", "1.01", "1.01.A0001", "1.01.A0002"]);
    assert_eq!(
        all.rows.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
        vec!["Area A", "Pkg A1", "Excavate", "Pour"]
    );
    assert!(all.rows[0].is_wbs && all.rows[1].is_wbs);
    assert_eq!(all.stats.wbs_nodes, 2);
    assert_eq!(all.stats.dependencies_routable, 1);
    assert_eq!(all.connectors.len(), 1);

    assert!(session.toggle(&seq("1.01")));
    session.finish();
    let collapsed = session.descriptor(1000.0);
    assert_eq!(keys(&collapsed), vec!["1", "1.01"]);
    assert_eq!(collapsed.stats.dependencies_routable, 0);
    assert!(collapsed.connectors.is_empty());
}

#[test]
fn late_task_past_a_clamped_axis_is_counted_not_drawn() {
    let tasks = vec![
        TaskRecord::new("early", "1", "Early").with_dates(date(2020, 1, 1), date(2020, 2, 1)),
        TaskRecord::new("late", "2", "Late").with_dates(date(2026, 10, 1), date(2026, 11, 1)),
    ];
    let config = GanttConfig {
        scale_mode: TimelineScale::Day,
        ..everything()
    };
    let mut session = GanttSession::new(TaskStore::new("Long", tasks, Vec::new()), &config, date(2020, 1, 1));
    session.finish();
    let descriptor = session.descriptor(1000.0);

    assert!(descriptor.stats.timeline_clamped);
    assert_eq!(descriptor.stats.off_axis_bars, 1);
    let early = descriptor.rows[0].bar.unwrap();
    assert!(early.left + early.width <= descriptor.timeline.total_width_px);
    assert!(descriptor.rows[1].bar.is_none());
}
