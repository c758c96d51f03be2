use crate::table::{ACTIVITY_COLUMN, Cell, Row, Table};
use chrono::NaiveDate;
use std::cmp::Ordering;

const PROMPT_TEMPLATE: &str = include_str!("prompt.md");

/// Substitute `{{KEY}}` placeholders in a single pass, so substituted text
/// is never scanned for further placeholders.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((head, after)) = rest.split_once("{{") {
        out.push_str(head);
        let substituted = after.split_once("}}").and_then(|(key, tail)| {
            values
                .iter()
                .find(|&&(name, _)| name == key)
                .map(|&(_, value)| (value, tail))
        });
        match substituted {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn records_json(table: &Table, rows: &[&Row]) -> String {
    let records: Vec<_> = rows.iter().map(|row| table.record(row)).collect();
    serde_json::to_string(&records).unwrap_or_default()
}

/// Highest activity first; rows without a numeric value go last. The sort
/// is stable, so ties keep their source order.
fn rank_by_activity(personas: &Table, rows: &mut [&Row]) {
    let Some(index) = personas.column_index(ACTIVITY_COLUMN) else {
        return;
    };
    let activity =
        |row: &&Row| row.cells.get(index).and_then(Cell::as_f64);

    rows.sort_by(|a, b| match (activity(a), activity(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn build_prompt(
    week: NaiveDate,
    weekly_summary: &Table,
    persona_weekly: &Table,
) -> String {
    let overall = weekly_summary.rows_for_week(week);
    let mut personas = persona_weekly.rows_for_week(week);
    rank_by_activity(persona_weekly, &mut personas);

    let week_start = week.format("%Y-%m-%d").to_string();
    let overall_payload = records_json(weekly_summary, &overall);
    let persona_payload = records_json(persona_weekly, &personas);

    fill_template(
        PROMPT_TEMPLATE,
        &[
            ("WEEK_START", &week_start),
            ("OVERALL_METRICS", &overall_payload),
            ("PERSONA_METRICS", &persona_payload),
        ],
    )
}
