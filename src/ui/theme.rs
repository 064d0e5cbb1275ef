use egui::{Color32, FontId, Rounding, Stroke, Visuals};

// ── Palette ──────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(22, 25, 31);
pub const BG_PANEL: Color32 = Color32::from_rgb(28, 32, 39);
pub const BG_HEADER: Color32 = Color32::from_rgb(35, 40, 50);
pub const BG_FIELD: Color32 = Color32::from_rgb(18, 21, 26);
pub const BG_ROW_HOVER: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 10);
/// Band behind WBS summary rows.
pub const BG_WBS_ROW: Color32 = Color32::from_rgb(33, 39, 49);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(47, 53, 64);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(226, 230, 236);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(150, 158, 172);
pub const TEXT_DIM: Color32 = Color32::from_rgb(96, 104, 118);
pub const TEXT_ON_BAR: Color32 = Color32::WHITE;

pub const ACCENT: Color32 = Color32::from_rgb(72, 150, 210);
pub const TODAY_LINE: Color32 = Color32::from_rgb(236, 86, 70);
pub const GRID_LINE: Color32 = Color32::from_rgb(40, 45, 55);
pub const ERROR: Color32 = Color32::from_rgb(222, 68, 55);
pub const WARNING: Color32 = Color32::from_rgb(240, 182, 40);

// Activity bars, P6 style: green normal, red critical, slate summary
pub const BAR_NORMAL: Color32 = Color32::from_rgb(67, 160, 110);
pub const BAR_CRITICAL: Color32 = Color32::from_rgb(214, 64, 58);
pub const BAR_SUMMARY: Color32 = Color32::from_rgb(112, 124, 146);
pub const PROGRESS_OVERLAY: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 60);

pub const CONNECTOR: Color32 = Color32::from_rgb(140, 150, 168);
pub const CONNECTOR_BACKWARD: Color32 = Color32::from_rgb(236, 132, 24);

// ── Sizes ────────────────────────────────────────────────────────────────────

/// Two header tiers of 22 px each.
pub const HEADER_HEIGHT: f32 = 44.0;
pub const STATUS_BAR_HEIGHT: f32 = 24.0;
pub const SIDE_PANEL_WIDTH: f32 = 460.0;
pub const INDENT_PER_LEVEL: f32 = 14.0;
pub const BAR_ROUNDING: f32 = 3.0;
pub const ARROW_SIZE: f32 = 5.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum TextRole {
    Menu,
    Header,
    Sub,
    Row,
    Bar,
    Small,
}

pub fn font(role: TextRole) -> FontId {
    let size = match role {
        TextRole::Menu => 13.0,
        TextRole::Header | TextRole::Row => 12.0,
        TextRole::Bar => 11.0,
        TextRole::Sub => 10.5,
        TextRole::Small => 9.5,
    };
    FontId::proportional(size)
}

/// Text color for a table row.
pub fn row_text(critical: bool, wbs: bool) -> Color32 {
    if critical {
        BAR_CRITICAL
    } else if wbs {
        TEXT_PRIMARY
    } else {
        TEXT_SECONDARY
    }
}

// ── Apply custom visuals ─────────────────────────────────────────────────────

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();

    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.extreme_bg_color = BG_FIELD;
    visuals.faint_bg_color = BG_PANEL;
    visuals.striped = false;

    let widgets = &mut visuals.widgets;
    let states = [
        (&mut widgets.noninteractive, BG_PANEL, BORDER_SUBTLE, TEXT_SECONDARY),
        (&mut widgets.inactive, Color32::from_rgb(42, 44, 56), BORDER_SUBTLE, TEXT_PRIMARY),
        (&mut widgets.hovered, Color32::from_rgb(52, 54, 68), ACCENT, TEXT_PRIMARY),
        (&mut widgets.active, Color32::from_rgb(60, 62, 76), ACCENT, Color32::WHITE),
        (&mut widgets.open, Color32::from_rgb(50, 52, 66), ACCENT, TEXT_PRIMARY),
    ];
    for (state, fill, border, text) in states {
        state.bg_fill = fill;
        state.weak_bg_fill = fill;
        state.bg_stroke = Stroke::new(1.0, border);
        state.fg_stroke = Stroke::new(1.0, text);
        state.rounding = Rounding::same(4.0);
    }

    visuals.selection.bg_fill = Color32::from_rgba_premultiplied(80, 140, 220, 45);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    visuals.window_rounding = Rounding::same(8.0);
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 4.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    ctx.set_style(style);
}
