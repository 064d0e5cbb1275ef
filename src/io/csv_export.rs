use std::io::Write;
use std::path::Path;

use crate::engine::{BarKind, RowDescriptor};
use crate::error::{GanttError, Result};

const HEADER: [&str; 10] = [
    "Seq", "Level", "Code", "Name", "Start Date", "End Date", "Duration", "Float (h)",
    "% Complete", "Critical",
];

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

fn number_cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write `rows` as a semicolon-delimited CSV.
///
/// Dates are formatted as DD/MM/YYYY. Returns the number of rows written.
pub fn write_rows<W: Write>(rows: &[RowDescriptor], out: W) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(out);

    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.write_record([
            row.seq_num.as_ref().map(|s| s.to_string()).unwrap_or_default(),
            row.depth.to_string(),
            row.code.clone(),
            row.label.clone(),
            date_cell(row.start),
            date_cell(row.end),
            row.duration_label.clone().unwrap_or_default(),
            number_cell(row.total_float_hours),
            number_cell(row.percent),
            if row.style.kind == BarKind::Critical { "Y" } else { "N" }.to_string(),
        ])?;
    }

    wtr.flush().map_err(|e| GanttError::Csv(e.into()))?;
    Ok(rows.len())
}

/// Export the visible rows to `path`.
pub fn export_csv(rows: &[RowDescriptor], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path).map_err(|source| GanttError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_rows(rows, file)
}
