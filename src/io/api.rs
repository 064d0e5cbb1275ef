//! HTTP client for the schedule backend.
//!
//! All methods are async and meant to run on the background runtime; the
//! viewer only ever sees the finished [`TaskStore`] or the error.

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::awp::{awp_store, AwpNodeRow, AwpTaskRow};
use crate::error::{GanttError, Result};
use crate::model::{
    DependencyRecord, DependencyRow, ProjectId, ProjectSummary, ResourceRow, TaskRecord, TaskRow,
    TaskStore, WbsRow,
};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/gantt";

/// Default base URL of the AWP routes
pub const DEFAULT_AWP_BASE_URL: &str = "http://localhost:3000/api/awp";

/// API client for the Gantt backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    awp_base_url: String,
}

impl ApiClient {
    /// Create a new API client with the specified base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|source| GanttError::Http {
                endpoint: base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            base_url,
            awp_base_url: DEFAULT_AWP_BASE_URL.to_string(),
        })
    }

    /// Point the AWP routes somewhere other than the default.
    pub fn with_awp_base_url(mut self, url: impl Into<String>) -> Self {
        self.awp_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a new API client with the default base URL
    pub fn with_default_url() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn awp_base_url(&self) -> &str {
        &self.awp_base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn awp_url(&self, path: &str) -> String {
        format!("{}/{}", self.awp_base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_from(self.url(path), path).await
    }

    async fn get_awp_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_from(self.awp_url(path), path).await
    }

    async fn get_json_from<T: DeserializeOwned>(&self, url: String, path: &str) -> Result<T> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| GanttError::Http {
                endpoint: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "API error");
            return Err(GanttError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|source| GanttError::Http {
            endpoint: path.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| GanttError::Decode {
            what: path.to_string(),
            message: e.to_string(),
        })
    }

    // ============================================
    // Projects
    // ============================================

    /// Fetch the project list
    pub async fn fetch_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.get_json("projects").await
    }

    // ============================================
    // Per-project data
    // ============================================

    pub async fn fetch_tasks(&self, project: &ProjectId) -> Result<Vec<TaskRow>> {
        self.get_json(&format!("projects/{project}/tasks")).await
    }

    pub async fn fetch_dependencies(&self, project: &ProjectId) -> Result<Vec<DependencyRow>> {
        self.get_json(&format!("projects/{project}/dependencies")).await
    }

    pub async fn fetch_wbs(&self, project: &ProjectId) -> Result<Vec<WbsRow>> {
        self.get_json(&format!("projects/{project}/wbs")).await
    }

    pub async fn fetch_resources(&self, project: &ProjectId) -> Result<Vec<ResourceRow>> {
        self.get_json(&format!("projects/{project}/resources")).await
    }

    /// Fetch everything for `project` concurrently and build its store.
    ///
    /// Any failing request fails the whole load; nothing partial is returned.
    pub async fn load_project(&self, project: &ProjectId, name: &str) -> Result<TaskStore> {
        let (tasks, dependencies, wbs, resources) = tokio::try_join!(
            self.fetch_tasks(project),
            self.fetch_dependencies(project),
            self.fetch_wbs(project),
            self.fetch_resources(project),
        )?;

        info!(
            %project,
            tasks = tasks.len(),
            dependencies = dependencies.len(),
            wbs = wbs.len(),
            resources = resources.len(),
            "project fetched"
        );

        Ok(store_from_rows(name, tasks, dependencies).with_auxiliary(wbs, resources))
    }

    // ============================================
    // AWP view
    // ============================================

    /// The AWP activity-code tree.
    pub async fn fetch_awp_hierarchy(&self, project: &ProjectId) -> Result<Vec<AwpNodeRow>> {
        self.get_awp_json(&format!("projects/{project}/hierarchy")).await
    }

    /// Tasks joined with the package each is assigned to.
    pub async fn fetch_awp_tasks(&self, project: &ProjectId) -> Result<Vec<AwpTaskRow>> {
        self.get_awp_json(&format!("projects/{project}/tasks")).await
    }

    pub async fn fetch_awp_dependencies(&self, project: &ProjectId) -> Result<Vec<DependencyRow>> {
        self.get_awp_json(&format!("projects/{project}/dependencies")).await
    }

    /// Like [`ApiClient::load_project`], arranged by work package.
    pub async fn load_awp_project(&self, project: &ProjectId, name: &str) -> Result<TaskStore> {
        let (nodes, tasks, dependencies) = tokio::try_join!(
            self.fetch_awp_hierarchy(project),
            self.fetch_awp_tasks(project),
            self.fetch_awp_dependencies(project),
        )?;

        info!(
            %project,
            packages = nodes.len(),
            tasks = tasks.len(),
            dependencies = dependencies.len(),
            "AWP project fetched"
        );

        Ok(awp_store(name, nodes, tasks, dependencies))
    }
}

/// Normalise wire rows into a store.
pub fn store_from_rows(
    name: &str,
    tasks: Vec<TaskRow>,
    dependencies: Vec<DependencyRow>,
) -> TaskStore {
    let tasks: Vec<TaskRecord> = tasks.into_iter().map(TaskRecord::from).collect();
    let dependencies: Vec<DependencyRecord> =
        dependencies.into_iter().map(DependencyRecord::from).collect();
    TaskStore::new(name, tasks, dependencies)
}
