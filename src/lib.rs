//! Hierarchical Gantt layout for P6 schedules.
//!
//! [`model`] holds the records and timeline math, [`engine`] turns a
//! [`model::TaskStore`] into a [`engine::LayoutDescriptor`] for a renderer,
//! and [`io`] gets schedules in and out.

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;

pub use config::{GanttConfig, HierarchySource, Lookahead};
pub use engine::{GanttSession, LayoutDescriptor};
pub use error::{GanttError, Result};
