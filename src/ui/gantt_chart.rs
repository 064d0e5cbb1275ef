use chrono::NaiveDate;
use egui::{Align2, Color32, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};
use wbs_gantt::engine::{ArrowDirection, BarKind, BarRect, Connector, Point, RowDescriptor};
use wbs_gantt::LayoutDescriptor;

use crate::ui::theme::{self, TextRole};

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;

/// What the chart asks the app to do.
pub enum ChartAction {
    None,
    /// `true` zooms in.
    Zoom(bool),
}

/// Render the Gantt chart area (right panel).
pub fn show_gantt_chart(
    descriptor: &LayoutDescriptor,
    row_height: f32,
    scroll_y: &mut f32,
    ui: &mut Ui,
) -> ChartAction {
    let mut action = ChartAction::None;
    let available = ui.available_size();
    let chart_width = descriptor.timeline.total_width_px.max(available.x);
    let chart_height = HEADER_HEIGHT + descriptor.content_height(row_height) + 40.0;

    // Handle zoom with scroll wheel
    if ui.rect_contains_pointer(ui.max_rect()) {
        let (ctrl, delta) = ui.input(|i| (i.modifiers.ctrl, i.smooth_scroll_delta.y));
        if ctrl && delta > 0.0 {
            action = ChartAction::Zoom(true);
        } else if ctrl && delta < 0.0 {
            action = ChartAction::Zoom(false);
        }
    }

    let output = egui::ScrollArea::both()
        .id_salt("gantt_chart")
        .auto_shrink([false, false])
        .vertical_scroll_offset(*scroll_y)
        .show(ui, |ui| {
            let (response, painter) =
                ui.allocate_painter(Vec2::new(chart_width, chart_height.max(available.y)), Sense::hover());
            let origin = response.rect.min;
            let body = origin + Vec2::new(0.0, HEADER_HEIGHT);
            let to_screen = |p: Point| body + Vec2::new(p.x, p.y);

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

            draw_row_backgrounds(&painter, body, chart_width, row_height, &descriptor.rows);
            draw_grid(&painter, descriptor, body, chart_height);
            draw_timeline_header(&painter, origin, descriptor, chart_width);

            for row in &descriptor.rows {
                if let Some(bar) = row.bar {
                    let rect = bar_rect(body, &bar);
                    draw_task_bar(&painter, rect, row);
                    let hover = ui.interact(rect, ui.id().with(("bar", rect.min.x as i32, rect.min.y as i32)), Sense::hover());
                    if hover.hovered() {
                        let hovered_date = hover
                            .hover_pos()
                            .map(|pos| descriptor.timeline.x_to_date(pos.x - origin.x));
                        show_bar_tooltip(ui, row, hovered_date);
                    }
                }
            }

            for connector in &descriptor.connectors {
                draw_connector(&painter, connector, &to_screen);
            }

            if let Some(x) = descriptor.today_x {
                draw_today_line(&painter, origin, origin.x + x, chart_height);
            }
        });
    *scroll_y = output.state.offset.y;

    action
}

fn bar_rect(body: Pos2, bar: &BarRect) -> Rect {
    Rect::from_min_size(body + Vec2::new(bar.left, bar.top), Vec2::new(bar.width, bar.height))
}

fn draw_row_backgrounds(painter: &egui::Painter, body: Pos2, width: f32, row_height: f32, rows: &[RowDescriptor]) {
    for (i, row) in rows.iter().enumerate() {
        let y = body.y + i as f32 * row_height;
        if row.is_wbs {
            painter.rect_filled(
                Rect::from_min_size(Pos2::new(body.x, y), Vec2::new(width, row_height)),
                0.0,
                theme::BG_WBS_ROW,
            );
        }
        painter.line_segment(
            [Pos2::new(body.x, y + row_height), Pos2::new(body.x + width, y + row_height)],
            Stroke::new(0.5, theme::BORDER_SUBTLE),
        );
    }
}

fn draw_grid(painter: &egui::Painter, descriptor: &LayoutDescriptor, body: Pos2, height: f32) {
    for cell in &descriptor.header.bottom {
        let x = body.x + cell.x;
        painter.line_segment(
            [Pos2::new(x, body.y), Pos2::new(x, body.y + height)],
            Stroke::new(0.5, theme::GRID_LINE),
        );
    }
}

fn draw_timeline_header(painter: &egui::Painter, origin: Pos2, descriptor: &LayoutDescriptor, width: f32) {
    let tier = HEADER_HEIGHT / 2.0;
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [Pos2::new(origin.x, origin.y + HEADER_HEIGHT), Pos2::new(origin.x + width, origin.y + HEADER_HEIGHT)],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );
    painter.line_segment(
        [Pos2::new(origin.x, origin.y + tier), Pos2::new(origin.x + width, origin.y + tier)],
        Stroke::new(0.5, theme::BORDER_SUBTLE),
    );

    let tiers = [
        (&descriptor.header.top, 0.0, theme::font(TextRole::Header), theme::TEXT_PRIMARY),
        (&descriptor.header.bottom, tier, theme::font(TextRole::Sub), theme::TEXT_SECONDARY),
    ];
    for (cells, top, font, color) in tiers {
        for cell in cells.iter() {
            let rect = Rect::from_min_size(Pos2::new(origin.x + cell.x, origin.y + top), Vec2::new(cell.width, tier));
            painter.line_segment([rect.left_top(), rect.left_bottom()], Stroke::new(0.5, theme::BORDER_SUBTLE));
            // Labels wider than their cell are dropped rather than overlapping.
            let galley = painter.layout_no_wrap(cell.label.clone(), font.clone(), color);
            if galley.size().x + 6.0 <= cell.width {
                painter.galley(
                    Pos2::new(rect.left() + 3.0, rect.center().y - galley.size().y / 2.0),
                    galley,
                    Color32::TRANSPARENT,
                );
            }
        }
    }
}

fn draw_today_line(painter: &egui::Painter, origin: Pos2, x: f32, height: f32) {
    painter.line_segment(
        [Pos2::new(x, origin.y + HEADER_HEIGHT), Pos2::new(x, origin.y + height)],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(x - badge_w / 2.0, origin.y + HEADER_HEIGHT - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(badge_rect.center(), Align2::CENTER_CENTER, "Today", theme::font(TextRole::Small), Color32::WHITE);
}

fn draw_task_bar(painter: &egui::Painter, rect: Rect, row: &RowDescriptor) {
    let fill = match (row.is_wbs, row.style.kind) {
        (_, BarKind::Critical) => theme::BAR_CRITICAL,
        (true, BarKind::Normal) => theme::BAR_SUMMARY,
        (false, BarKind::Normal) => theme::BAR_NORMAL,
    };
    let rounding = Rounding::same(theme::BAR_ROUNDING.min(rect.height() / 2.0));

    painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    painter.rect_filled(rect, rounding, fill);

    let progress = row.style.progress;
    if progress > 0.0 {
        let done = Rect::from_min_size(rect.min, Vec2::new(rect.width() * progress, rect.height()));
        painter.rect_filled(done, rounding, theme::PROGRESS_OVERLAY);
    }

    if rect.width() > 30.0 {
        let galley = painter.layout_no_wrap(row.label.clone(), theme::font(TextRole::Bar), theme::TEXT_ON_BAR);
        let text_y = rect.center().y - galley.size().y / 2.0;
        painter
            .with_clip_rect(rect.shrink(1.0))
            .galley(Pos2::new(rect.left() + 5.0, text_y), galley, Color32::TRANSPARENT);
    }
}

fn draw_connector(painter: &egui::Painter, connector: &Connector, to_screen: &impl Fn(Point) -> Pos2) {
    let color = if connector.is_backward {
        theme::CONNECTOR_BACKWARD
    } else {
        theme::CONNECTOR
    };
    let points: Vec<Pos2> = connector.path.iter().map(|&p| to_screen(p)).collect();
    painter.add(Shape::line(points, Stroke::new(1.2, color)));

    let tip = to_screen(connector.arrow.tip);
    let back = match connector.arrow.points {
        ArrowDirection::Right => -theme::ARROW_SIZE,
        ArrowDirection::Left => theme::ARROW_SIZE,
    };
    painter.add(Shape::convex_polygon(
        vec![
            tip,
            Pos2::new(tip.x + back, tip.y - theme::ARROW_SIZE * 0.8),
            Pos2::new(tip.x + back, tip.y + theme::ARROW_SIZE * 0.8),
        ],
        color,
        Stroke::NONE,
    ));
}

fn show_bar_tooltip(ui: &Ui, row: &RowDescriptor, hovered: Option<NaiveDate>) {
    egui::show_tooltip_at_pointer(ui.ctx(), ui.layer_id(), egui::Id::new("bar-tip"), |ui| {
        ui.strong(&row.label);
        if !row.code.is_empty() {
            ui.label(&row.code);
        }
        if let (Some(start), Some(end)) = (row.start, row.end) {
            ui.label(format!("{} → {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y")));
        }
        if let Some(duration) = &row.duration_label {
            ui.label(format!("Duration: {duration}"));
        }
        if let Some(float) = row.total_float_hours {
            ui.label(format!("Total float: {float:.0} h"));
        }
        if let Some(status) = &row.status {
            ui.label(format!("Status: {status}"));
        }
        ui.label(format!("Progress: {:.0}%", row.style.progress * 100.0));
        if let Some(date) = hovered {
            ui.separator();
            ui.label(egui::RichText::new(format!("At {}", date.format("%d/%m/%Y"))).weak());
        }
    });
}
