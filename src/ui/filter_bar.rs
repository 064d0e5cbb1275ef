use chrono::NaiveDate;
use egui::{RichText, Ui};
use wbs_gantt::Lookahead;

use crate::ui::theme;

/// Lookahead, past-task and as-of controls. Returns true when any changed.
pub fn show_filter_bar(
    lookahead: &mut Lookahead,
    include_past: &mut bool,
    as_of: &mut NaiveDate,
    ui: &mut Ui,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(RichText::new(egui_phosphor::regular::FUNNEL).color(theme::TEXT_DIM));
        ui.label(RichText::new("Show next").color(theme::TEXT_SECONDARY));
        egui::ComboBox::from_id_salt("lookahead")
            .selected_text(lookahead.to_string())
            .show_ui(ui, |ui| {
                for preset in Lookahead::PRESETS {
                    changed |= ui
                        .selectable_value(lookahead, preset, preset.to_string())
                        .changed();
                }
            });

        changed |= ui.checkbox(include_past, "Include past").changed();

        ui.separator();
        ui.label(RichText::new("As of").color(theme::TEXT_SECONDARY));
        changed |= ui
            .add(egui_extras::DatePickerButton::new(as_of).id_salt("filter_as_of"))
            .changed();
        let today = chrono::Local::now().date_naive();
        if ui
            .add_enabled(*as_of != today, egui::Button::new("Today"))
            .clicked()
        {
            *as_of = today;
            changed = true;
        }
    });
    changed
}
