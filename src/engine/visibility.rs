//! Date-window filtering plus expand/collapse.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use crate::config::Lookahead;
use crate::model::{DateSpan, SeqNum, TaskStore};

/// The date range used to decide which rows are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// "As of" date; the filter never reads the clock itself.
    pub today: NaiveDate,
    pub end: NaiveDate,
    pub include_past: bool,
}

impl DateWindow {
    /// `today .. today + lookahead`, or through the project end for [`Lookahead::All`].
    ///
    /// Without dated tasks, `All` reaches two years ahead.
    pub fn from_config(
        today: NaiveDate,
        lookahead: Lookahead,
        include_past: bool,
        bounds: Option<DateSpan>,
    ) -> Self {
        let end = match lookahead {
            Lookahead::Days(days) => today
                .checked_add_days(Days::new(days.into()))
                .unwrap_or(NaiveDate::MAX),
            Lookahead::All => bounds
                .map(|b| b.end.max(today))
                .unwrap_or_else(|| today.checked_add_days(Days::new(730)).unwrap_or(NaiveDate::MAX)),
        };
        Self {
            today,
            end,
            include_past,
        }
    }

    pub fn admits(&self, span: DateSpan) -> bool {
        if self.include_past {
            span.start <= self.end
        } else {
            span.end >= self.today && span.start <= self.end
        }
    }
}

/// Result of the date filter over a [`TaskStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filtered {
    /// Store indices, in hierarchy order.
    pub rows: Vec<usize>,
    /// Rows dropped by the row cap.
    pub truncated: usize,
    /// Rows with neither own nor rolled-up dates.
    pub undated: usize,
}

/// Collapsed-node set and the active date window for one project.
#[derive(Debug, Clone)]
pub struct VisibilityController {
    collapsed: HashSet<SeqNum>,
    window: DateWindow,
    max_visible_rows: usize,
}

impl VisibilityController {
    pub fn new(window: DateWindow, max_visible_rows: usize) -> Self {
        Self {
            collapsed: HashSet::new(),
            window,
            max_visible_rows,
        }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Replace the window. Collapsed nodes are forgotten.
    pub fn set_window(&mut self, window: DateWindow) {
        self.window = window;
        self.collapsed.clear();
    }

    pub fn collapsed(&self) -> &HashSet<SeqNum> {
        &self.collapsed
    }

    pub fn is_collapsed(&self, seq: &str) -> bool {
        self.collapsed.contains(seq)
    }

    /// Flip `seq` in the collapsed set; returns whether it is now collapsed.
    pub fn toggle(&mut self, seq: &SeqNum) -> bool {
        if self.collapsed.remove(seq.as_str()) {
            false
        } else {
            self.collapsed.insert(seq.clone());
            true
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    /// Collapse every given key (normally all parents).
    pub fn collapse_all<'a>(&mut self, parents: impl IntoIterator<Item = &'a SeqNum>) {
        self.collapsed.extend(parents.into_iter().cloned());
    }

    /// Whether some ancestor of `seq` is collapsed.
    pub fn is_hidden(&self, seq: &SeqNum) -> bool {
        !self.collapsed.is_empty() && seq.ancestors().any(|a| self.collapsed.contains(a))
    }

    /// Apply the date window and the row cap.
    ///
    /// Rows use their own span, or the span rolled up from their descendants
    /// when they have none. The store is already in hierarchy order, so the cap
    /// keeps the structurally earliest rows.
    pub fn filter(&self, store: &TaskStore) -> Filtered {
        let mut undated = 0;
        let mut rows: Vec<usize> = (0..store.len())
            .filter(|&idx| match store.effective_span(idx) {
                Some(span) => self.window.admits(span),
                None => {
                    undated += 1;
                    false
                }
            })
            .collect();

        if undated > 0 {
            debug!(undated, "skipped rows without usable dates");
        }

        let mut truncated = 0;
        if rows.len() > self.max_visible_rows {
            truncated = rows.len() - self.max_visible_rows;
            rows.truncate(self.max_visible_rows);
            info!(
                kept = self.max_visible_rows,
                truncated, "row cap applied to filtered tasks"
            );
        }

        Filtered {
            rows,
            truncated,
            undated,
        }
    }

    /// Drop rows under a collapsed ancestor; order is preserved.
    pub fn visible(&self, store: &TaskStore, filtered: &[usize]) -> Vec<usize> {
        let tasks = store.tasks();
        filtered
            .iter()
            .copied()
            .filter(|&idx| {
                tasks[idx]
                    .seq_num
                    .as_ref()
                    .map_or(true, |seq| !self.is_hidden(seq))
            })
            .collect()
    }
}
