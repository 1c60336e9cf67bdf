//! Plain-text listing of all stored records.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::KillRecord;

/// Render the export listing. Records are sorted by key, so the output only
/// depends on `records` and `generated_at`.
pub fn export_text(records: &[KillRecord], generated_at: DateTime<Utc>) -> String {
    let mut sorted: Vec<&KillRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.key());

    let mut lines = vec![
        "KillTracker export".to_string(),
        format!(
            "Generated: {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        String::new(),
    ];
    for record in sorted {
        lines.push(record.label());
        lines.push(format!("  KC: {}", record.kill_count));
        lines.push(format!("  Pet: {}", yes_no(record.pet_acquired)));
        lines.push(String::new());
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Default export file name for a given day: `killtrack_export_YYYY-MM-DD.txt`.
pub fn export_file_name(generated_at: DateTime<Utc>) -> String {
    format!("killtrack_export_{}.txt", generated_at.format("%Y-%m-%d"))
}

/// Compact fixed-width table, one row per record.
pub fn render_table(records: &[KillRecord]) -> String {
    if records.is_empty() {
        return "No data yet.\n".to_string();
    }
    let width = records
        .iter()
        .map(|r| r.subject.len())
        .max()
        .unwrap_or(0)
        .max("SUBJECT".len());

    let header = format!("{:<width$}  {:<4}  {:>6}  PET", "SUBJECT", "MODE", "KC");
    let rows = records.iter().map(|r| {
        format!(
            "{:<width$}  {:<4}  {:>6}  {}",
            r.subject,
            r.mode.tag().unwrap_or("-"),
            r.kill_count,
            yes_no(r.pet_acquired)
        )
    });
    let mut out: String = std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
