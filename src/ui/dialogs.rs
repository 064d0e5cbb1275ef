use crate::app::{GanttApp, LoadState};
use crate::ui::theme;
use egui::{Color32, Context, RichText, Ui, Window};

/// Windows that float over the main layout.
pub fn show_dialogs(app: &mut GanttApp, ctx: &Context) {
    if app.show_about {
        show_about_dialog(app, ctx);
    }
    if matches!(app.load_state, LoadState::Failed { .. }) {
        show_load_error_dialog(app, ctx);
    }
}

/// Shown in the chart area while no project is loaded.
pub fn show_placeholder(app: &mut GanttApp, ui: &mut Ui) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() / 3.0);
        let loading = match &app.load_state {
            LoadState::Loading { request } => Some(request.describe()),
            _ => None,
        };
        match loading {
            Some(what) => {
                ui.spinner();
                ui.label(RichText::new(format!("Loading {what}…")).color(theme::TEXT_SECONDARY));
            }
            None => {
                ui.label(RichText::new("No project loaded").size(16.0).color(theme::TEXT_SECONDARY));
                ui.add_space(6.0);
                ui.label(
                    RichText::new("Pick one from the Project menu, or open an XER export.")
                        .color(theme::TEXT_DIM),
                );
                ui.add_space(10.0);
                if ui.button("Open XER...").clicked() {
                    let ctx = ui.ctx().clone();
                    app.open_xer(&ctx);
                }
            }
        }
    });
}

/// Render the load failure dialog. Retry is offered for transient failures only.
pub fn show_load_error_dialog(app: &mut GanttApp, ctx: &Context) {
    let LoadState::Failed { request, message, .. } = &app.load_state else {
        return;
    };
    let can_retry = app.load_state.can_retry();
    let title = format!("Could not load {}", request.describe());
    let message = message.clone();

    let mut retry = false;
    let mut dismiss = false;
    Window::new(RichText::new("Load failed").strong().size(14.0))
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([360.0, 0.0])
        .show(ctx, |ui| {
            ui.add_space(4.0);
            ui.label(RichText::new(title).color(theme::TEXT_PRIMARY));
            ui.add_space(4.0);
            ui.label(RichText::new(message).color(theme::ERROR));
            ui.add_space(6.0);
            ui.separator();
            ui.horizontal(|ui| {
                let retry_btn = egui::Button::new(RichText::new("Retry").color(Color32::WHITE))
                    .fill(theme::ACCENT)
                    .rounding(egui::Rounding::same(4.0));
                if can_retry && ui.add_sized([80.0, 28.0], retry_btn).clicked() {
                    retry = true;
                }
                if ui.add_sized([80.0, 28.0], egui::Button::new("Dismiss")).clicked() {
                    dismiss = true;
                }
            });
        });

    if retry {
        app.retry(ctx);
    } else if dismiss || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.dismiss_error();
    }
}

/// Render the "About" dialog.
pub fn show_about_dialog(app: &mut GanttApp, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 180.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("WBS Gantt").strong());
                ui.add_space(2.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme::TEXT_SECONDARY),
                );
                ui.add_space(10.0);
                ui.label("Hierarchical Gantt viewer");
                ui.label("for Primavera P6 schedules.");
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_about = false;
    }
}
