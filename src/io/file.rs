use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GanttError, Result};
use crate::model::{DependencyRecord, ResourceRow, TaskRecord, TaskStore, WbsRow};

/// On-disk form of a loaded project, for working offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub tasks: Vec<TaskRecord>,
    pub dependencies: Vec<DependencyRecord>,
    #[serde(default)]
    pub wbs: Vec<WbsRow>,
    #[serde(default)]
    pub resources: Vec<ResourceRow>,
}

impl From<&TaskStore> for Snapshot {
    fn from(store: &TaskStore) -> Self {
        Self {
            name: store.name.clone(),
            tasks: store.tasks().to_vec(),
            dependencies: store.dependencies().to_vec(),
            wbs: store.wbs().to_vec(),
            resources: store.resources().to_vec(),
        }
    }
}

impl From<Snapshot> for TaskStore {
    fn from(snapshot: Snapshot) -> Self {
        TaskStore::new(snapshot.name, snapshot.tasks, snapshot.dependencies)
            .with_auxiliary(snapshot.wbs, snapshot.resources)
    }
}

/// Save a project to a JSON file.
pub fn save_snapshot(store: &TaskStore, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&Snapshot::from(store)).map_err(|e| GanttError::Decode {
        what: "snapshot".into(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|source| GanttError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a project from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<TaskStore> {
    let json = std::fs::read_to_string(path).map_err(|source| GanttError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: Snapshot = serde_json::from_str(&json).map_err(|e| GanttError::Decode {
        what: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(snapshot.into())
}
