//! CSV rendering of a [`RunReport`].
//!
//! The file has three blocks separated by blank lines: run header, summary
//! with per-category totals, then one row per element in report order.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::report::RunReport;

const DETAIL_HEADER: [&str; 8] = [
    "Level",
    "Category",
    "Id",
    "Name",
    "Pieces",
    "Area formula",
    "Net area (m²)",
    "Concrete volume (m³)",
];

/// Quotes a field when it contains a separator, quote or line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn write_row<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        out.write_all(escape(field.as_ref()).as_bytes())?;
    }
    out.write_all(b"\n")
}

/// Writes `report` as CSV.
///
/// # Errors
///
/// Propagates any error from the writer.
pub fn write_csv<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    let summary = &report.summary;
    let counters = &summary.counters;

    write_row(out, &["Formwork report"])?;
    write_row(out, &["Timestamp", report.timestamp.as_str()])?;
    write_row(out, &["Precision mode", yes_no(report.precision_mode)])?;
    write_row(out, &["Cancelled", yes_no(report.cancelled)])?;
    out.write_all(b"\n")?;

    write_row(out, &["Summary"])?;
    let totals = [
        ("Elements", summary.element_count.to_string()),
        ("Pieces", summary.piece_count.to_string()),
        ("Gross area (m²)", format!("{:.3}", summary.gross_area_m2)),
        ("Net area (m²)", format!("{:.3}", summary.net_area_m2)),
        ("Concrete volume (m³)", format!("{:.3}", summary.concrete_volume_m3)),
        ("Succeeded", counters.succeeded.to_string()),
        ("Failed", counters.failed.to_string()),
        ("Skipped", counters.skipped.to_string()),
        ("Deductions applied", counters.deductions_applied.to_string()),
        ("Boolean fallbacks", counters.boolean_fallbacks.to_string()),
        ("Union skips", counters.union_skips.to_string()),
        ("Parameter failures", counters.parameter_failures.to_string()),
    ];
    for (label, value) in &totals {
        write_row(out, &[*label, value.as_str()])?;
    }
    out.write_all(b"\n")?;

    write_row(
        out,
        &[
            "Category",
            "Elements",
            "Pieces",
            "Gross area (m²)",
            "Net area (m²)",
            "Concrete volume (m³)",
        ],
    )?;
    for row in &summary.categories {
        write_row(
            out,
            &[
                row.category.label().to_string(),
                row.element_count.to_string(),
                row.piece_count.to_string(),
                format!("{:.3}", row.gross_area_m2),
                format!("{:.3}", row.net_area_m2),
                format!("{:.3}", row.concrete_volume_m3),
            ],
        )?;
    }
    out.write_all(b"\n")?;

    write_row(out, &DETAIL_HEADER)?;
    for record in &report.elements {
        write_row(
            out,
            &[
                record.level.clone().unwrap_or_default(),
                record.category.label().to_string(),
                record.id.to_string(),
                record.name.clone(),
                record.piece_count.to_string(),
                record.area_formula.clone(),
                format!("{:.3}", record.net_area_m2),
                format!("{:.3}", record.concrete_volume_m3),
            ],
        )?;
    }
    Ok(())
}

/// Renders `report` as a CSV string.
#[must_use]
pub fn to_csv_string(report: &RunReport) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_csv(report, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
