#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod ui;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wbs_gantt::model::ProjectId;
use wbs_gantt::{GanttConfig, HierarchySource};

#[derive(Parser, Debug)]
#[command(name = "wbs-gantt")]
#[command(version)]
#[command(about = "Hierarchical Gantt viewer for P6 schedules", long_about = None)]
struct Args {
    /// Base URL of the schedule backend
    #[arg(long, env = "WBS_GANTT_API_URL")]
    api_url: Option<String>,

    /// Base URL of the AWP endpoints
    #[arg(long, env = "WBS_GANTT_AWP_URL")]
    awp_url: Option<String>,

    /// Arrange server projects by Activity Work Package instead of WBS
    #[arg(long)]
    awp: bool,

    /// Project id to open on start
    #[arg(long)]
    project: Option<String>,

    /// Open a Primavera P6 XER export instead of fetching
    #[arg(long, conflicts_with = "snapshot")]
    xer: Option<PathBuf>,

    /// Open a saved JSON snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Config file (defaults to the OS config directory)
    #[arg(long, env = "WBS_GANTT_CONFIG")]
    config: Option<PathBuf>,
}

/// Command-line flags win over the config file for this run.
fn apply_overrides(args: &Args, config: &mut GanttConfig) {
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(url) = &args.awp_url {
        config.awp_base_url = url.clone();
    }
    if args.awp {
        config.hierarchy_source = HierarchySource::Awp;
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = args.config.clone().unwrap_or_else(GanttConfig::default_path);
    let mut config = GanttConfig::load_or_default(&config_path);
    apply_overrides(&args, &mut config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let startup = app::Startup {
        project: args.project.map(ProjectId::new),
        xer: args.xer,
        snapshot: args.snapshot,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("WBS Gantt"),
        ..Default::default()
    };

    eframe::run_native(
        "WBS Gantt",
        options,
        Box::new(move |cc| Ok(Box::new(app::GanttApp::new(cc, config, config_path, runtime, startup)))),
    )?;
    Ok(())
}
