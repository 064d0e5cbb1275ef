use egui::{Align2, Pos2, Rect, RichText, Sense, Stroke, Ui, Vec2};
use egui_phosphor::regular as icons;
use wbs_gantt::engine::{BarKind, RowDescriptor};
use wbs_gantt::model::SeqNum;
use wbs_gantt::LayoutDescriptor;

use crate::ui::theme::{self, TextRole};

/// Actions that the task table can request.
pub enum TableAction {
    None,
    Toggle(SeqNum),
}

const COL_START: f32 = 74.0;
const COL_END: f32 = 74.0;
const COL_DURATION: f32 = 44.0;
const COL_PERCENT: f32 = 40.0;
const CARET_WIDTH: f32 = 16.0;

fn fixed_columns() -> f32 {
    COL_START + COL_END + COL_DURATION + COL_PERCENT
}

/// Render the left-side table, row for row with the chart.
pub fn show_task_table(
    descriptor: &LayoutDescriptor,
    row_height: f32,
    scroll_y: &mut f32,
    ui: &mut Ui,
) -> TableAction {
    let mut action = TableAction::None;

    let output = egui::ScrollArea::vertical()
        .id_salt("task_table")
        .auto_shrink([false, false])
        .vertical_scroll_offset(*scroll_y)
        .show(ui, |ui| {
            ui.spacing_mut().item_spacing = Vec2::ZERO;
            let width = ui.available_width();
            draw_column_headers(ui, width);

            for (i, row) in descriptor.rows.iter().enumerate() {
                if let Some(seq) = draw_row(ui, i, row, width, row_height) {
                    action = TableAction::Toggle(seq);
                }
            }
            ui.add_space(40.0);
        });
    *scroll_y = output.state.offset.y;

    action
}

fn draw_column_headers(ui: &mut Ui, width: f32) {
    let (rect, _) = ui.allocate_exact_size(Vec2::new(width, theme::HEADER_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, theme::BG_HEADER);
    painter.line_segment(
        [rect.left_bottom(), rect.right_bottom()],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let y = rect.bottom() - 12.0;
    let mut x = rect.right() - fixed_columns();
    painter.text(Pos2::new(rect.left() + 8.0, y), Align2::LEFT_CENTER, "TASK", theme::font(TextRole::Small), theme::TEXT_DIM);
    for (title, w) in [("START", COL_START), ("FINISH", COL_END), ("DUR", COL_DURATION), ("%", COL_PERCENT)] {
        painter.text(Pos2::new(x + 4.0, y), Align2::LEFT_CENTER, title, theme::font(TextRole::Small), theme::TEXT_DIM);
        x += w;
    }
}

/// Paint one row; returns the key to toggle when its caret was clicked.
fn draw_row(ui: &mut Ui, index: usize, row: &RowDescriptor, width: f32, row_height: f32) -> Option<SeqNum> {
    let (rect, response) = ui.allocate_exact_size(Vec2::new(width, row_height), Sense::hover());
    let painter = ui.painter_at(rect);

    if row.is_wbs {
        painter.rect_filled(rect, 0.0, theme::BG_WBS_ROW);
    }
    if response.hovered() {
        painter.rect_filled(rect, 0.0, theme::BG_ROW_HOVER);
    }
    painter.line_segment(
        [rect.left_bottom(), rect.right_bottom()],
        Stroke::new(0.5, theme::BORDER_SUBTLE),
    );

    let critical = row.style.kind == BarKind::Critical;
    let color = theme::row_text(critical, row.is_wbs);
    let center_y = rect.center().y;
    let indent = rect.left() + 6.0 + row.depth as f32 * theme::INDENT_PER_LEVEL;

    // Caret
    let mut toggled = None;
    if row.is_parent {
        let caret_rect = Rect::from_min_size(Pos2::new(indent, rect.top()), Vec2::new(CARET_WIDTH, row_height));
        let caret = ui.interact(caret_rect, ui.id().with(("caret", index)), Sense::click());
        let glyph = if row.is_collapsed {
            icons::CARET_RIGHT
        } else {
            icons::CARET_DOWN
        };
        let glyph_color = if caret.hovered() { theme::ACCENT } else { theme::TEXT_SECONDARY };
        painter.text(caret_rect.center(), Align2::CENTER_CENTER, glyph, theme::font(TextRole::Row), glyph_color);
        if caret.clicked() {
            toggled = row.seq_num.clone();
        }
    }

    // Name, clipped to its column
    let name_left = indent + CARET_WIDTH + 2.0;
    let name_right = rect.right() - fixed_columns() - 4.0;
    if name_right > name_left {
        let name_rect = Rect::from_min_max(Pos2::new(name_left, rect.top()), Pos2::new(name_right, rect.bottom()));
        let font = if row.is_wbs { theme::font(TextRole::Header) } else { theme::font(TextRole::Row) };
        painter
            .with_clip_rect(name_rect)
            .text(Pos2::new(name_left, center_y), Align2::LEFT_CENTER, &row.label, font, color);
    }

    let fmt_date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%d/%m/%y").to_string()).unwrap_or_default();
    let cells = [
        (fmt_date(row.start), COL_START),
        (fmt_date(row.end), COL_END),
        (row.duration_label.clone().unwrap_or_default(), COL_DURATION),
        (row.percent.map(|p| format!("{p:.0}")).unwrap_or_default(), COL_PERCENT),
    ];
    let mut x = rect.right() - fixed_columns();
    for (text, w) in cells {
        painter.text(Pos2::new(x + 4.0, center_y), Align2::LEFT_CENTER, text, theme::font(TextRole::Sub), color);
        x += w;
    }

    if !row.code.is_empty() {
        response.on_hover_ui(|ui| {
            ui.label(RichText::new(&row.label).strong());
            ui.label(RichText::new(&row.code).color(theme::TEXT_SECONDARY));
        });
    }

    toggled
}
