//! Persisted viewer settings (lives in the OS config directory).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{GanttError, Result};
use crate::model::{TimelineFit, TimelineScale, TimelineSettings};

/// How far ahead of today the date filter reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
    Days(u32),
    /// Through the end of the project.
    All,
}

impl Default for Lookahead {
    fn default() -> Self {
        Lookahead::Days(90)
    }
}

impl Lookahead {
    /// The choices offered in the filter bar.
    pub const PRESETS: [Lookahead; 6] = [
        Lookahead::Days(14),
        Lookahead::Days(30),
        Lookahead::Days(90),
        Lookahead::Days(180),
        Lookahead::Days(365),
        Lookahead::All,
    ];
}

impl fmt::Display for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookahead::Days(days) => write!(f, "{days} days"),
            Lookahead::All => f.write_str("All"),
        }
    }
}

impl Serialize for Lookahead {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Lookahead::Days(days) => serializer.serialize_u32(*days),
            Lookahead::All => serializer.serialize_str("all"),
        }
    }
}

impl<'de> Deserialize<'de> for Lookahead {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Days(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Days(days) => Ok(Lookahead::Days(days)),
            Raw::Text(text) if text.trim().eq_ignore_ascii_case("all") => Ok(Lookahead::All),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Lookahead::Days)
                .map_err(|_| serde::de::Error::custom(format!("invalid lookahead {text:?}"))),
        }
    }
}

/// Which tree the server-side rows are arranged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HierarchySource {
    /// P6 work breakdown structure.
    #[default]
    Wbs,
    /// Activity Work Packages from the AWP activity-code tree.
    Awp,
}

impl HierarchySource {
    pub const ALL: [HierarchySource; 2] = [HierarchySource::Wbs, HierarchySource::Awp];

    pub fn label(self) -> &'static str {
        match self {
            HierarchySource::Wbs => "WBS",
            HierarchySource::Awp => "AWP",
        }
    }
}

/// Every recognised option. Missing keys take their defaults, so a partial
/// file is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanttConfig {
    pub api_base_url: String,
    /// Base URL of the AWP endpoints (`/hierarchy`, `/tasks`, `/dependencies`).
    pub awp_base_url: String,
    pub hierarchy_source: HierarchySource,
    pub scale_mode: TimelineScale,
    /// Pick the scale from the project's span on each load instead of `scale_mode`.
    pub auto_scale: bool,
    pub lookahead_days: Lookahead,
    pub include_past_tasks: bool,
    pub max_visible_rows: usize,
    pub max_timeline_days: u32,
    pub max_rendered_dependencies: usize,
    pub fit_to_container: bool,

    // Batching
    pub initial_batch: usize,
    pub chunk_size: usize,
    pub max_chunks: usize,

    // Geometry
    pub row_height_px: f32,
    pub bar_height_px: f32,
    pub min_bar_width_px: f32,
    pub day_width_px: f32,
    pub week_width_px: f32,
    pub month_width_px: f32,

    pub show_dependencies: bool,
}

impl Default for GanttConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api/gantt".into(),
            awp_base_url: "http://localhost:3000/api/awp".into(),
            hierarchy_source: HierarchySource::default(),
            scale_mode: TimelineScale::Week,
            auto_scale: false,
            lookahead_days: Lookahead::default(),
            include_past_tasks: false,
            max_visible_rows: 2000,
            max_timeline_days: 730,
            max_rendered_dependencies: 100,
            fit_to_container: false,
            initial_batch: 100,
            chunk_size: 1000,
            max_chunks: 10,
            row_height_px: 30.0,
            bar_height_px: 18.0,
            min_bar_width_px: 4.0,
            day_width_px: 20.0,
            week_width_px: 84.0,
            month_width_px: 120.0,
            show_dependencies: true,
        }
    }
}

impl GanttConfig {
    pub fn timeline_settings(&self) -> TimelineSettings {
        TimelineSettings {
            max_timeline_days: self.max_timeline_days,
            fit: if self.fit_to_container {
                TimelineFit::FitToContainer
            } else {
                TimelineFit::Fixed
            },
            day_width_px: self.day_width_px,
            week_width_px: self.week_width_px,
            month_width_px: self.month_width_px,
        }
    }

    /// Copy zoomed unit widths back so they persist.
    pub fn store_timeline_settings(&mut self, settings: &TimelineSettings) {
        self.fit_to_container = settings.fit == TimelineFit::FitToContainer;
        self.day_width_px = settings.day_width_px;
        self.week_width_px = settings.week_width_px;
        self.month_width_px = settings.month_width_px;
    }

    // ── Persistence helpers ─────────────────────────────────────

    /// `config.json` in the OS config directory, or the working directory.
    pub fn default_path() -> PathBuf {
        match directories::ProjectDirs::from("", "", "WbsGantt") {
            Some(dirs) => dirs.config_dir().join("config.json"),
            None => PathBuf::from(".").join("config.json"),
        }
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(GanttError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|e| GanttError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Like [`GanttConfig::load`] but falls back to the defaults on a bad file.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable config");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GanttError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| GanttError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|source| GanttError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
