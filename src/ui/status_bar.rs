use egui::{RichText, Ui};
use wbs_gantt::LayoutDescriptor;

use crate::app::{GanttApp, LoadState};
use crate::ui::theme::{self, TextRole};

pub fn show_status_bar(app: &mut GanttApp, descriptor: Option<&LayoutDescriptor>, ui: &mut Ui) {
    let mut retry = false;
    ui.horizontal_centered(|ui| {
        let message_color = match app.load_state {
            LoadState::Failed { .. } => theme::ERROR,
            _ => theme::TEXT_SECONDARY,
        };
        ui.label(
            RichText::new(&app.status_message)
                .font(theme::font(TextRole::Sub))
                .color(message_color),
        );
        if app.load_state.can_retry() && ui.small_button("Retry").clicked() {
            retry = true;
        }

        let Some(descriptor) = descriptor else {
            return;
        };
        let stats = descriptor.stats;
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let dim = |text: String| RichText::new(text).size(10.5).color(theme::TEXT_DIM);
            let capped = stats.dependencies_capped();
            let deps = if capped > 0 {
                format!(
                    "Deps: {}/{} of {} ({capped} capped)",
                    stats.dependencies_rendered, stats.dependencies_routable, stats.dependencies_total
                )
            } else {
                format!(
                    "Deps: {}/{} of {}",
                    stats.dependencies_rendered, stats.dependencies_routable, stats.dependencies_total
                )
            };
            ui.label(dim(deps));
            ui.label(dim(" · ".into()));
            ui.label(dim(format!("WBS {} · Resources {}", stats.wbs_nodes, stats.resources)));
            ui.label(dim(" · ".into()));
            if stats.off_axis_bars > 0 {
                ui.label(
                    RichText::new(format!("{} bars off the axis", stats.off_axis_bars))
                        .size(10.5)
                        .color(theme::WARNING),
                );
                ui.label(dim(" · ".into()));
            }
            if stats.timeline_clamped {
                ui.label(RichText::new("Timeline clamped").size(10.5).color(theme::WARNING));
                ui.label(dim(" · ".into()));
            }
            if stats.truncated_rows > 0 {
                ui.label(
                    RichText::new(format!("{} rows over the limit", stats.truncated_rows))
                        .size(10.5)
                        .color(theme::WARNING),
                );
                ui.label(dim(" · ".into()));
            }
            let rows = if stats.revealed < stats.visible {
                format!("Rows: {}/{} (rendering…)", stats.revealed, stats.visible)
            } else {
                format!("Rows: {}", stats.visible)
            };
            ui.label(dim(format!("{rows} · {} in window of {}", stats.filtered, stats.total)));
        });
    });
    if retry {
        let ctx = ui.ctx().clone();
        app.retry(&ctx);
    }
}
