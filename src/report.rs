use crate::error::ReportError;
use crate::prompt::build_prompt;
use crate::table::{ACTIVITY_COLUMN, Table, read_table};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INDEX_FILE: &str = "README.md";
const INDEX_HEADING: &str = "# Weekly Insight Prompts\n";

#[derive(Debug)]
pub struct Report {
    pub out_dir: PathBuf,
    pub index_path: PathBuf,
    /// One `(week, file name)` entry per prompt file, ascending by week.
    pub entries: Vec<(NaiveDate, String)>,
}

fn load(path: &Path, required: &[&'static str]) -> Result<Table, ReportError> {
    let table =
        read_table(path, required).map_err(|source| ReportError::Load {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), rows = table.len(), "loaded table");
    Ok(table)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn distinct_weeks(table: &Table) -> BTreeSet<NaiveDate> {
    table.rows().iter().filter_map(|row| row.week).collect()
}

fn prompt_file_name(week: NaiveDate) -> String {
    format!("{}_prompt.md", week.format("%Y-%m-%d"))
}

fn render_prompt_file(week: NaiveDate, prompt: &str) -> String {
    format!(
        "## Week Starting {}\n\n```text\n{}\n```\n",
        week.format("%Y-%m-%d"),
        prompt.trim()
    )
}

fn render_index(entries: &[(NaiveDate, String)]) -> String {
    let mut lines = vec![INDEX_HEADING.to_owned()];
    lines.extend(entries.iter().map(|&(week, ref name)| {
        format!("- {}: {name}", week.format("%Y-%m-%d"))
    }));
    let mut index = lines.join("\n");
    index.push('\n');
    index
}

/// Write one prompt file per week found in the summary table, plus an index.
///
/// Both sources are loaded before anything is written. A failed write stops
/// the run; files written before it are left in place.
pub fn write_weekly_prompts(
    weekly_summary_path: &Path,
    persona_weekly_path: &Path,
    out_dir: &Path,
) -> Result<Report, ReportError> {
    let weekly_summary = load(weekly_summary_path, &[])?;
    let persona_weekly = load(persona_weekly_path, &[ACTIVITY_COLUMN])?;

    fs::create_dir_all(out_dir).map_err(|source| ReportError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let weeks = distinct_weeks(&weekly_summary);
    info!(weeks = weeks.len(), "generating weekly prompts");

    let mut entries = Vec::with_capacity(weeks.len());
    for week in weeks {
        let prompt = build_prompt(week, &weekly_summary, &persona_weekly);

        let file_name = prompt_file_name(week);
        let week_file = out_dir.join(&file_name);
        write_file(&week_file, &render_prompt_file(week, &prompt))?;
        debug!(path = %week_file.display(), "wrote prompt");

        entries.push((week, file_name));
    }

    let index_path = out_dir.join(INDEX_FILE);
    write_file(&index_path, &render_index(&entries))?;
    info!(path = %index_path.display(), "wrote index");

    Ok(Report {
        out_dir: out_dir.to_path_buf(),
        index_path,
        entries,
    })
}
