pub mod project;
pub mod seq_num;
pub mod task;
pub mod timeline;

pub use project::{ProjectId, ProjectSummary, TaskStore};
pub use seq_num::SeqNum;
pub use task::{
    DateSpan, DependencyKind, DependencyRecord, DependencyRow, ResourceRow, TaskId, TaskRecord,
    TaskRow, WbsRow,
};
pub use timeline::{
    HeaderCell, TimelineClamp, TimelineFit, TimelineHeader, TimelineLayout, TimelineScale,
    TimelineSettings,
};
