use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::task::DateSpan;

/// Controls what unit the timeline is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimelineScale {
    Day,
    #[default]
    Week,
    Month,
}

impl TimelineScale {
    pub const ALL: [TimelineScale; 3] = [TimelineScale::Day, TimelineScale::Week, TimelineScale::Month];

    /// Pick a scale that keeps a span of `days` readable.
    pub fn auto_for_span(days: i64) -> Self {
        if days <= 31 {
            TimelineScale::Day
        } else if days <= 183 {
            TimelineScale::Week
        } else {
            TimelineScale::Month
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimelineScale::Day => "Days",
            TimelineScale::Week => "Weeks",
            TimelineScale::Month => "Months",
        }
    }
}

/// How the unit width is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimelineFit {
    /// Fixed width per unit; the chart scrolls horizontally.
    #[default]
    Fixed,
    /// Units are compressed so the whole span fits the container.
    FitToContainer,
}

/// Inputs to [`TimelineLayout::compute`] besides the bounds and the scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSettings {
    pub max_timeline_days: u32,
    pub fit: TimelineFit,
    pub day_width_px: f32,
    pub week_width_px: f32,
    pub month_width_px: f32,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            max_timeline_days: 730,
            fit: TimelineFit::Fixed,
            day_width_px: 20.0,
            week_width_px: 84.0,
            month_width_px: 120.0,
        }
    }
}

impl TimelineSettings {
    pub fn unit_width(&self, scale: TimelineScale) -> f32 {
        match scale {
            TimelineScale::Day => self.day_width_px,
            TimelineScale::Week => self.week_width_px,
            TimelineScale::Month => self.month_width_px,
        }
    }

    fn unit_width_mut(&mut self, scale: TimelineScale) -> &mut f32 {
        match scale {
            TimelineScale::Day => &mut self.day_width_px,
            TimelineScale::Week => &mut self.week_width_px,
            TimelineScale::Month => &mut self.month_width_px,
        }
    }

    /// Zoom in (widen the unit of `scale`).
    pub fn zoom_in(&mut self, scale: TimelineScale) {
        let w = self.unit_width_mut(scale);
        *w = (*w * 1.2).min(400.0);
    }

    /// Zoom out (narrow the unit of `scale`).
    pub fn zoom_out(&mut self, scale: TimelineScale) {
        let w = self.unit_width_mut(scale);
        *w = (*w / 1.2).max(2.0);
    }
}

/// Reported when the natural span was longer than `max_timeline_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineClamp {
    pub natural_end: NaiveDate,
    pub natural_days: i64,
}

/// Pixel geometry of the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub scale: TimelineScale,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub unit_width_px: f32,
    pub total_units: u32,
    pub total_width_px: f32,
    pub clamped: Option<TimelineClamp>,
}

/// One labelled cell of a header tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderCell {
    pub label: String,
    pub x: f32,
    pub width: f32,
}

/// Two-tier header: coarse on top, the scale unit below.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineHeader {
    pub top: Vec<HeaderCell>,
    pub bottom: Vec<HeaderCell>,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(30)
}

/// Pad `span` for `scale` and align it to unit boundaries.
pub fn padded_range(span: DateSpan, scale: TimelineScale) -> (NaiveDate, NaiveDate) {
    match scale {
        TimelineScale::Day => (span.start - Duration::days(7), span.end + Duration::days(7)),
        TimelineScale::Week => {
            let start = span.start - Duration::days(14);
            let end = span.end + Duration::days(14);
            let to_monday = start.weekday().num_days_from_monday() as i64;
            let to_sunday = 6 - end.weekday().num_days_from_monday() as i64;
            (start - Duration::days(to_monday), end + Duration::days(to_sunday))
        }
        TimelineScale::Month => {
            let start = first_of_month(span.start);
            let start = start.checked_sub_months(Months::new(1)).unwrap_or(start);
            // Last day of the month after the one containing `end`.
            let end = first_of_month(span.end)
                .checked_add_months(Months::new(2))
                .map(|d| d - Duration::days(1))
                .unwrap_or(span.end);
            (start, end)
        }
    }
}

impl TimelineLayout {
    /// Map the global project bounds to pixel geometry for `scale`.
    ///
    /// Every call recomputes from scratch; the span is capped at
    /// `settings.max_timeline_days`.
    pub fn compute(
        bounds: DateSpan,
        scale: TimelineScale,
        container_width_px: f32,
        settings: &TimelineSettings,
    ) -> Self {
        let (min_date, natural_end) = padded_range(bounds, scale);
        let natural_days = (natural_end - min_date).num_days();
        let max_days = settings.max_timeline_days as i64;

        let (max_date, clamped) = if natural_days > max_days {
            let max_date = min_date + Duration::days(max_days);
            warn!(
                natural_days,
                max_days,
                %natural_end,
                %max_date,
                "timeline span exceeds the cap, clamping"
            );
            (
                max_date,
                Some(TimelineClamp {
                    natural_end,
                    natural_days,
                }),
            )
        } else {
            (natural_end, None)
        };

        let days = (max_date - min_date).num_days();
        let total_units = match scale {
            TimelineScale::Day => days + 1,
            TimelineScale::Week => (days + 1 + 6) / 7,
            TimelineScale::Month => month_index(max_date) - month_index(min_date) + 1,
        }
        .max(1) as u32;

        let unit_width_px = match settings.fit {
            TimelineFit::FitToContainer if container_width_px > 0.0 => {
                container_width_px * 0.98 / total_units as f32
            }
            _ => settings.unit_width(scale),
        };

        Self {
            scale,
            min_date,
            max_date,
            unit_width_px,
            total_units,
            total_width_px: unit_width_px * total_units as f32,
            clamped,
        }
    }

    /// Horizontal offset of the start of `date` from the start of the timeline.
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        match self.scale {
            TimelineScale::Day => (date - self.min_date).num_days() as f32 * self.unit_width_px,
            TimelineScale::Week => {
                (date - self.min_date).num_days() as f32 * self.unit_width_px / 7.0
            }
            TimelineScale::Month => {
                let whole = (month_index(date) - month_index(self.min_date)) as f32;
                let fraction = (date.day() - 1) as f32 / days_in_month(date) as f32;
                (whole + fraction) * self.unit_width_px
            }
        }
    }

    /// Convert an x offset back to the date it falls in, kept on the axis.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        let x = x.max(0.0).min(self.total_width_px);
        let date = match self.scale {
            TimelineScale::Day => self.min_date + Duration::days((x / self.unit_width_px).floor() as i64),
            TimelineScale::Week => {
                self.min_date + Duration::days((x / self.unit_width_px * 7.0).floor() as i64)
            }
            TimelineScale::Month => {
                let months = (x / self.unit_width_px).floor() as u32;
                let month_start = first_of_month(self.min_date)
                    .checked_add_months(Months::new(months))
                    .unwrap_or(self.max_date);
                let fraction = x / self.unit_width_px - months as f32;
                let offset = (fraction * days_in_month(month_start) as f32).floor() as i64;
                month_start + Duration::days(offset)
            }
        };
        date.clamp(self.min_date, self.max_date)
    }

    /// Position of the today marker, or `None` when today is off the axis.
    pub fn today_x(&self, today: NaiveDate) -> Option<f32> {
        (today >= self.min_date && today <= self.max_date).then(|| self.date_to_x(today))
    }

    fn cell(&self, label: String, from: NaiveDate, to_exclusive: NaiveDate) -> HeaderCell {
        let end = to_exclusive.min(self.max_date + Duration::days(1));
        let x = self.date_to_x(from.max(self.min_date));
        HeaderCell {
            label,
            x,
            width: (self.date_to_x(end) - x).max(0.0),
        }
    }

    fn month_cells(&self, fmt: &str) -> Vec<HeaderCell> {
        let mut cells = Vec::new();
        let mut month = first_of_month(self.min_date);
        while month <= self.max_date {
            let Some(next) = month.checked_add_months(Months::new(1)) else {
                break;
            };
            cells.push(self.cell(month.format(fmt).to_string(), month, next));
            month = next;
        }
        cells
    }

    /// Header cells for the renderer; both tiers cover exactly the axis.
    pub fn header(&self) -> TimelineHeader {
        match self.scale {
            TimelineScale::Day => {
                let mut bottom = Vec::with_capacity(self.total_units as usize);
                let mut day = self.min_date;
                while day <= self.max_date {
                    let next = day + Duration::days(1);
                    bottom.push(self.cell(day.format("%d").to_string(), day, next));
                    day = next;
                }
                TimelineHeader {
                    top: self.month_cells("%B %Y"),
                    bottom,
                }
            }
            TimelineScale::Week => {
                let mut bottom = Vec::with_capacity(self.total_units as usize);
                let mut week = self.min_date;
                while week <= self.max_date {
                    let next = week + Duration::days(7);
                    bottom.push(self.cell(week.format("W%V").to_string(), week, next));
                    week = next;
                }
                TimelineHeader {
                    top: self.month_cells("%b %Y"),
                    bottom,
                }
            }
            TimelineScale::Month => {
                let mut top = Vec::new();
                let mut year_start = self.min_date;
                while year_start <= self.max_date {
                    let Some(next) = NaiveDate::from_ymd_opt(year_start.year() + 1, 1, 1) else {
                        break;
                    };
                    top.push(self.cell(year_start.year().to_string(), year_start, next));
                    year_start = next;
                }
                TimelineHeader {
                    top,
                    bottom: self.month_cells("%b"),
                }
            }
        }
    }
}
