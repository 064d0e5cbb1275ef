use crate::app::{GanttApp, LoadRequest, LoadState};
use crate::ui::theme::{self, TextRole};
use egui::{menu, RichText, Ui};
use wbs_gantt::model::TimelineScale;
use wbs_gantt::HierarchySource;

/// Render the top menu bar.
pub fn show_toolbar(app: &mut GanttApp, ui: &mut Ui) {
    let ctx = ui.ctx().clone();
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  Project  ").font(theme::font(TextRole::Menu)), |ui| {
            if app.projects.is_empty() {
                ui.label(RichText::new("No projects from the server").small().weak());
            }
            let source = app.hierarchy_source();
            egui::ScrollArea::vertical().max_height(320.0).show(ui, |ui| {
                let mut picked = None;
                for project in &app.projects {
                    if ui.button(format!("  {}", project.display_name())).clicked() {
                        picked = Some(LoadRequest::Api {
                            project_id: project.proj_id.clone(),
                            name: project.display_name(),
                            source,
                        });
                    }
                }
                if let Some(request) = picked {
                    app.load(request, &ctx);
                    ui.close_menu();
                }
            });
            if ui.button("  Refresh List").clicked() {
                app.refresh_projects(&ctx);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Open XER...").clicked() {
                app.open_xer(&ctx);
                ui.close_menu();
            }
            if ui.button("  Open Snapshot...").clicked() {
                app.open_snapshot(&ctx);
                ui.close_menu();
            }
            let loaded = app.session.is_some();
            if ui.add_enabled(loaded, egui::Button::new("  Save Snapshot...")).clicked() {
                app.save_snapshot();
                ui.close_menu();
            }
            ui.separator();
            if ui.add_enabled(loaded, egui::Button::new("  Export CSV...")).clicked() {
                app.export_csv();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font(TextRole::Menu)), |ui| {
            if ui.button("  Zoom In        Ctrl+Scroll ↑").clicked() {
                app.zoom(true);
                ui.close_menu();
            }
            if ui.button("  Zoom Out      Ctrl+Scroll ↓").clicked() {
                app.zoom(false);
                ui.close_menu();
            }
            let mut fit = app.fit_to_container();
            if ui.checkbox(&mut fit, "Fit to window").changed() {
                app.set_fit_to_container(fit);
            }
            ui.separator();
            ui.label(RichText::new("Timeline Scale").small().weak());
            let current = app.scale();
            for scale in TimelineScale::ALL {
                if ui.radio(current == scale, scale.label()).clicked() {
                    app.set_scale(scale);
                    ui.close_menu();
                }
            }
            let mut auto = app.auto_scale();
            if ui
                .checkbox(&mut auto, "Auto scale on load")
                .on_hover_text("Pick the scale from the project span")
                .changed()
            {
                app.set_auto_scale(auto);
            }
            ui.separator();
            ui.label(RichText::new("Hierarchy").small().weak());
            let current = app.hierarchy_source();
            for source in HierarchySource::ALL {
                if ui.radio(current == source, source.label()).clicked() {
                    app.set_hierarchy_source(source, &ctx);
                    ui.close_menu();
                }
            }
            ui.separator();
            let mut deps = app.show_dependencies();
            if ui.checkbox(&mut deps, "Show dependencies").changed() {
                app.set_show_dependencies(deps);
            }
            ui.separator();
            if ui.button("  Expand All").clicked() {
                app.expand_all();
                ui.close_menu();
            }
            if ui.button("  Collapse All").clicked() {
                app.collapse_all();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font(TextRole::Menu)), |ui| {
            if ui.button("Open Config Folder").clicked() {
                app.open_config_folder();
                ui.close_menu();
            }
            if ui.button("About").clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        // Right-aligned project name and load state
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let text = match (&app.load_state, app.project_name()) {
                (LoadState::Loading { request }, _) => {
                    RichText::new(format!("Loading {}…", request.describe())).color(theme::WARNING)
                }
                (LoadState::Failed { request, .. }, _) => {
                    RichText::new(format!("{} failed", request.describe())).color(theme::ERROR)
                }
                (_, Some(name)) => RichText::new(name.to_string()).weak(),
                (_, None) => RichText::new("No project").weak(),
            };
            ui.label(text.size(11.0));
        });
    });
}
