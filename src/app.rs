use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use wbs_gantt::engine::GenerationCounter;
use wbs_gantt::io::{csv_export, file, ApiClient, XerFile};
use wbs_gantt::model::{ProjectId, ProjectSummary, SeqNum, TaskStore, TimelineFit, TimelineScale};
use wbs_gantt::{GanttConfig, GanttError, GanttSession, HierarchySource, LayoutDescriptor, Lookahead};

use crate::ui;

/// Where a project comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    Api {
        project_id: ProjectId,
        name: String,
        source: HierarchySource,
    },
    Xer { path: PathBuf, project_id: Option<ProjectId> },
    Snapshot { path: PathBuf },
}

impl LoadRequest {
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            LoadRequest::Api { project_id, .. } => Some(project_id),
            LoadRequest::Xer { project_id, .. } => project_id.as_ref(),
            LoadRequest::Snapshot { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            LoadRequest::Api {
                name,
                source: HierarchySource::Wbs,
                ..
            } => name.clone(),
            LoadRequest::Api { name, source, .. } => format!("{name} ({})", source.label()),
            LoadRequest::Xer { path, .. } | LoadRequest::Snapshot { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading { request: LoadRequest },
    Loaded,
    Failed {
        request: LoadRequest,
        message: String,
        /// Retrying the same request could succeed.
        transient: bool,
    },
}

impl LoadState {
    /// Offer Retry only where it could help.
    pub fn can_retry(&self) -> bool {
        matches!(self, LoadState::Failed { transient: true, .. })
    }
}

/// Results sent back from the background runtime.
enum Background {
    Projects(Result<Vec<ProjectSummary>, GanttError>),
    Store {
        ticket: u64,
        result: Result<TaskStore, GanttError>,
    },
}

/// What the viewer was asked to open on start.
#[derive(Debug, Clone, Default)]
pub struct Startup {
    pub project: Option<ProjectId>,
    pub xer: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
}

/// Main application state.
pub struct GanttApp {
    pub config: GanttConfig,
    config_path: PathBuf,
    runtime: Runtime,
    api: Option<ApiClient>,
    tx: UnboundedSender<Background>,
    rx: UnboundedReceiver<Background>,

    pub projects: Vec<ProjectSummary>,
    pub session: Option<GanttSession>,
    pub load_state: LoadState,
    /// What the current (or last attempted) session was loaded from.
    last_request: Option<LoadRequest>,
    /// Only the newest load may install a session.
    ticket: u64,
    counter: GenerationCounter,

    // Filter bar
    pub lookahead: Lookahead,
    pub include_past: bool,
    pub as_of: NaiveDate,

    // Chart geometry carried between frames
    pub chart_width: f32,
    pub scroll_y: f32,

    pub show_about: bool,
    pub status_message: String,
}

impl GanttApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: GanttConfig,
        config_path: PathBuf,
        runtime: Runtime,
        startup: Startup,
    ) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let api = match ApiClient::new(config.api_base_url.clone()) {
            Ok(client) => Some(client.with_awp_base_url(config.awp_base_url.clone())),
            Err(e) => {
                warn!(error = %e, "API client unavailable");
                None
            }
        };
        let (tx, rx) = unbounded_channel();

        let mut app = Self {
            lookahead: config.lookahead_days,
            include_past: config.include_past_tasks,
            as_of: chrono::Local::now().date_naive(),
            config,
            config_path,
            runtime,
            api,
            tx,
            rx,
            projects: Vec::new(),
            session: None,
            load_state: LoadState::Idle,
            last_request: None,
            ticket: 0,
            counter: GenerationCounter::new(),
            chart_width: 800.0,
            scroll_y: 0.0,
            show_about: false,
            status_message: "Ready".to_string(),
        };

        app.refresh_projects(&cc.egui_ctx);
        if let Some(path) = startup.snapshot {
            app.load(LoadRequest::Snapshot { path }, &cc.egui_ctx);
        } else if let Some(path) = startup.xer {
            app.load(
                LoadRequest::Xer {
                    path,
                    project_id: startup.project,
                },
                &cc.egui_ctx,
            );
        } else if let Some(project_id) = startup.project {
            let name = format!("Project {project_id}");
            let source = app.config.hierarchy_source;
            app.load(
                LoadRequest::Api {
                    project_id,
                    name,
                    source,
                },
                &cc.egui_ctx,
            );
        }
        app
    }

    // --- Loading ---

    pub fn refresh_projects(&mut self, ctx: &egui::Context) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = api.fetch_projects().await;
            let _ = tx.send(Background::Projects(result));
            ctx.request_repaint();
        });
    }

    /// Start loading a project. The current session is dropped first, so a
    /// failed load never leaves a half-built chart behind.
    pub fn load(&mut self, request: LoadRequest, ctx: &egui::Context) {
        self.ticket += 1;
        let ticket = self.ticket;
        self.session = None;
        self.scroll_y = 0.0;
        self.load_state = LoadState::Loading {
            request: request.clone(),
        };
        self.last_request = Some(request.clone());
        self.status_message = format!("Loading {}…", request.describe());
        info!(request = %request.describe(), "loading project");

        let tx = self.tx.clone();
        let ctx = ctx.clone();
        match request {
            LoadRequest::Api {
                project_id,
                name,
                source,
            } => {
                let Some(api) = self.api.clone() else {
                    self.fail("no API client configured".to_string(), false);
                    return;
                };
                self.runtime.spawn(async move {
                    let result = match source {
                        HierarchySource::Wbs => api.load_project(&project_id, &name).await,
                        HierarchySource::Awp => api.load_awp_project(&project_id, &name).await,
                    };
                    let _ = tx.send(Background::Store { ticket, result });
                    ctx.request_repaint();
                });
            }
            LoadRequest::Xer { path, project_id } => {
                self.runtime.spawn_blocking(move || {
                    let result = XerFile::read(&path).and_then(|xer| xer.project_store(project_id.as_ref()));
                    let _ = tx.send(Background::Store { ticket, result });
                    ctx.request_repaint();
                });
            }
            LoadRequest::Snapshot { path } => {
                self.runtime.spawn_blocking(move || {
                    let result = file::load_snapshot(&path);
                    let _ = tx.send(Background::Store { ticket, result });
                    ctx.request_repaint();
                });
            }
        }
    }

    pub fn retry(&mut self, ctx: &egui::Context) {
        if !self.load_state.can_retry() {
            return;
        }
        if let LoadState::Failed { request, .. } = &self.load_state {
            let request = request.clone();
            self.load(request, ctx);
        }
    }

    pub fn dismiss_error(&mut self) {
        if matches!(self.load_state, LoadState::Failed { .. }) {
            self.load_state = LoadState::Idle;
        }
    }

    fn fail(&mut self, message: String, transient: bool) {
        if let LoadState::Loading { request } = &self.load_state {
            warn!(
                request = %request.describe(),
                project = ?request.project_id(),
                transient,
                %message,
                "load failed"
            );
            self.status_message = format!("Load failed: {message}");
            self.load_state = LoadState::Failed {
                request: request.clone(),
                message,
                transient,
            };
        }
    }

    fn poll_background(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                Background::Projects(Ok(projects)) => {
                    info!(count = projects.len(), "project list fetched");
                    self.projects = projects;
                }
                Background::Projects(Err(e)) => {
                    warn!(error = %e, "project list unavailable");
                }
                Background::Store { ticket, .. } if ticket != self.ticket => {
                    info!(ticket, "dropping superseded load");
                }
                Background::Store { result: Ok(store), .. } => self.install(store),
                Background::Store { result: Err(e), .. } => self.fail(e.to_string(), e.is_transient()),
            }
        }
    }

    fn install(&mut self, store: TaskStore) {
        // The filter bar keeps the config's lookahead and past flag current.
        let session = GanttSession::with_counter(store, &self.config, self.as_of, self.counter.clone());
        self.status_message = format!(
            "Loaded '{}' ({} rows, {} dependencies)",
            session.store().name,
            session.store().len(),
            session.store().dependencies().len()
        );
        self.session = Some(session);
        self.load_state = LoadState::Loaded;
    }

    // --- View operations ---

    pub fn apply_filter(&mut self) {
        self.config.lookahead_days = self.lookahead;
        self.config.include_past_tasks = self.include_past;
        self.persist_config();
        if let Some(session) = &mut self.session {
            let window = session.window_for(self.as_of, self.lookahead, self.include_past);
            session.apply_filter(window);
            self.scroll_y = 0.0;
        }
    }

    pub fn toggle(&mut self, seq: &SeqNum) {
        if let Some(session) = &mut self.session {
            session.toggle(seq);
        }
    }

    pub fn expand_all(&mut self) {
        if let Some(session) = &mut self.session {
            session.expand_all();
        }
    }

    pub fn collapse_all(&mut self) {
        if let Some(session) = &mut self.session {
            session.collapse_all();
        }
    }

    pub fn hierarchy_source(&self) -> HierarchySource {
        self.config.hierarchy_source
    }

    /// Switch between the WBS and AWP trees, reloading a server project.
    pub fn set_hierarchy_source(&mut self, source: HierarchySource, ctx: &egui::Context) {
        if self.config.hierarchy_source == source {
            return;
        }
        self.config.hierarchy_source = source;
        self.persist_config();
        if let Some(LoadRequest::Api {
            project_id, name, ..
        }) = self.last_request.clone()
        {
            self.load(
                LoadRequest::Api {
                    project_id,
                    name,
                    source,
                },
                ctx,
            );
        }
    }

    pub fn auto_scale(&self) -> bool {
        self.config.auto_scale
    }

    /// Takes effect on the next load.
    pub fn set_auto_scale(&mut self, auto: bool) {
        self.config.auto_scale = auto;
        self.persist_config();
    }

    pub fn scale(&self) -> TimelineScale {
        self.session.as_ref().map_or(self.config.scale_mode, |s| s.scale())
    }

    pub fn set_scale(&mut self, scale: TimelineScale) {
        self.config.scale_mode = scale;
        if let Some(session) = &mut self.session {
            session.set_scale(scale);
        }
        self.persist_config();
    }

    pub fn fit_to_container(&self) -> bool {
        self.session
            .as_ref()
            .map_or(self.config.fit_to_container, |s| s.settings().fit == TimelineFit::FitToContainer)
    }

    pub fn set_fit_to_container(&mut self, fit: bool) {
        if let Some(session) = &mut self.session {
            session.settings_mut().fit = if fit {
                TimelineFit::FitToContainer
            } else {
                TimelineFit::Fixed
            };
            self.config.store_timeline_settings(session.settings());
        } else {
            self.config.fit_to_container = fit;
        }
        self.persist_config();
    }

    pub fn zoom(&mut self, zoom_in: bool) {
        if let Some(session) = &mut self.session {
            let scale = session.scale();
            if zoom_in {
                session.settings_mut().zoom_in(scale);
            } else {
                session.settings_mut().zoom_out(scale);
            }
            self.config.store_timeline_settings(session.settings());
            self.persist_config();
        }
    }

    pub fn show_dependencies(&self) -> bool {
        self.session
            .as_ref()
            .map_or(self.config.show_dependencies, |s| s.show_dependencies())
    }

    pub fn set_show_dependencies(&mut self, show: bool) {
        self.config.show_dependencies = show;
        if let Some(session) = &mut self.session {
            session.set_show_dependencies(show);
        }
        self.persist_config();
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save(&self.config_path) {
            warn!(error = %e, "could not save config");
        }
    }

    // --- File operations ---

    pub fn open_xer(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Primavera P6 export", &["xer"])
            .pick_file()
        {
            self.load(LoadRequest::Xer { path, project_id: None }, ctx);
        }
    }

    pub fn open_snapshot(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Gantt snapshot", &["json"])
            .pick_file()
        {
            self.load(LoadRequest::Snapshot { path }, ctx);
        }
    }

    pub fn save_snapshot(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let store = session.store();
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Gantt snapshot", &["json"])
            .set_file_name(format!("{}.json", store.name))
            .save_file()
        {
            self.status_message = match file::save_snapshot(store, &path) {
                Ok(()) => format!("Snapshot saved to {}", path.display()),
                Err(e) => format!("Error saving: {e}"),
            };
        }
    }

    /// Export every visible row, finishing the reveal first.
    pub fn export_csv(&mut self) {
        let Some(session) = &mut self.session else {
            self.status_message = "Nothing to export".to_string();
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(format!("{}.csv", session.store().name))
            .save_file()
        {
            session.finish();
            let descriptor = session.descriptor(self.chart_width);
            self.status_message = match csv_export::export_csv(&descriptor.rows, &path) {
                Ok(count) => format!("Exported {count} rows to CSV"),
                Err(e) => format!("CSV export failed: {e}"),
            };
        }
    }

    pub fn open_config_folder(&self) {
        let dir = self.config_path.parent().unwrap_or(&self.config_path);
        if let Err(e) = open::that(dir) {
            warn!(error = %e, dir = %dir.display(), "could not open config folder");
        }
    }

    pub fn project_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.store().name.as_str())
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background();

        // One reveal step per frame until the plan is done.
        let mut descriptor: Option<LayoutDescriptor> = None;
        if let Some(session) = &mut self.session {
            if session.is_revealing() {
                session.step();
                ctx.request_repaint();
            }
            descriptor = Some(session.descriptor(self.chart_width));
        }

        let zoom = ctx.input(|i| {
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Plus) {
                Some(true)
            } else if i.modifiers.ctrl && i.key_pressed(egui::Key::Minus) {
                Some(false)
            } else {
                None
            }
        });
        if let Some(zoom_in) = zoom {
            self.zoom(zoom_in);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        egui::TopBottomPanel::top("filter_bar").show(ctx, |ui| {
            if ui::filter_bar::show_filter_bar(
                &mut self.lookahead,
                &mut self.include_past,
                &mut self.as_of,
                ui,
            ) {
                self.apply_filter();
            }
        });

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui::status_bar::show_status_bar(self, descriptor.as_ref(), ui);
            });

        let row_height = self.config.row_height_px;
        let Some(descriptor) = descriptor else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui::dialogs::show_placeholder(self, ui);
            });
            ui::dialogs::show_dialogs(self, ctx);
            return;
        };

        let mut table_action = ui::task_table::TableAction::None;
        egui::SidePanel::left("task_panel")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .min_width(240.0)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                table_action = ui::task_table::show_task_table(&descriptor, row_height, &mut self.scroll_y, ui);
            });

        let mut chart_action = ui::gantt_chart::ChartAction::None;
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
            self.chart_width = ui.available_width();
            chart_action = ui::gantt_chart::show_gantt_chart(&descriptor, row_height, &mut self.scroll_y, ui);
        });

        match table_action {
            ui::task_table::TableAction::Toggle(seq) => self.toggle(&seq),
            ui::task_table::TableAction::None => {}
        }
        match chart_action {
            ui::gantt_chart::ChartAction::Zoom(zoom_in) => self.zoom(zoom_in),
            ui::gantt_chart::ChartAction::None => {}
        }

        ui::dialogs::show_dialogs(self, ctx);
    }
}
