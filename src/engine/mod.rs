//! Layout engine: everything between the task store and the painted chart.

pub mod batch;
pub mod geometry;
pub mod hierarchy;
pub mod layout;
pub mod routing;
pub mod session;
pub mod visibility;

pub use batch::{BatchConfig, BatchPlan, BatchScheduler, DriveOutcome, GenerationCounter, RenderState, Reveal};
pub use geometry::{is_off_axis, BarKind, BarMetrics, BarRect, BarStyle, Point};
pub use hierarchy::HierarchyInfo;
pub use layout::{LayoutDescriptor, LayoutStats, RowDescriptor};
pub use routing::{ArrowDirection, Arrowhead, Connector};
pub use session::GanttSession;
pub use visibility::{DateWindow, Filtered, VisibilityController};
