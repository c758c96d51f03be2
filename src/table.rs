use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{Reader, StringRecord};
use serde::Serialize;
use serde::ser::SerializeMap as _;
use serde_json::Number;
use std::fs;
use std::path::Path;

use crate::error::LoadError;

pub const WEEK_COLUMN: &str = "week";
pub const ACTIVITY_COLUMN: &str = "avg_steps";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    /// Integers keep their exact value; non-finite floats become `Null`.
    Number(Number),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if let Ok(int_val) = trimmed.parse::<i64>() {
            return Self::Number(Number::from(int_val));
        }
        if let Ok(float_val) = trimmed.parse::<f64>() {
            return Number::from_f64(float_val)
                .map_or(Self::Null, Self::Number);
        }
        Self::Text(raw.to_owned())
    }

    /// Numeric view used for ranking.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Number(ref number) => number.as_f64(),
            Self::Null | Self::Text(_) | Self::Date(_) => None,
        }
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match *self {
            Self::Null => serializer.serialize_none(),
            Self::Number(ref number) => number.serialize(serializer),
            Self::Text(ref text) => serializer.serialize_str(text),
            Self::Date(date) => {
                serializer.collect_str(&date.format("%Y-%m-%d"))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub week: Option<NaiveDate>,
    pub cells: Vec<Cell>,
}

/// A CSV table with its column order preserved.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// One row paired with its column names, serialized as an ordered map.
pub struct Record<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl Serialize for Record<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(&self.row.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

impl Table {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn record<'a>(&'a self, row: &'a Row) -> Record<'a> {
        Record {
            columns: &self.columns,
            row,
        }
    }

    /// Rows whose week equals `week`, in source order.
    pub fn rows_for_week(&self, week: NaiveDate) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|row| row.week == Some(week))
            .collect()
    }
}

fn parse_week(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Parse CSV content into a table, requiring a `week` column plus any
/// columns named in `required`.
pub fn parse_table_csv(
    csv_content: &str,
    required: &[&'static str],
) -> Result<Table, LoadError> {
    let mut reader = Reader::from_reader(csv_content.as_bytes());
    let columns: Vec<String> =
        reader.headers()?.iter().map(str::to_owned).collect();

    let week_index = columns
        .iter()
        .position(|column| column == WEEK_COLUMN)
        .ok_or(LoadError::MissingColumn {
            column: WEEK_COLUMN,
        })?;
    for &column in required {
        if !columns.iter().any(|name| name == column) {
            return Err(LoadError::MissingColumn { column });
        }
    }

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    let mut row_num: usize = 1;
    while reader.read_record(&mut record)? {
        row_num = row_num.saturating_add(1);
        let raw_week = &record[week_index];
        let week = if raw_week.trim().is_empty() {
            None
        } else {
            Some(parse_week(raw_week).ok_or_else(|| {
                LoadError::InvalidWeek {
                    row: row_num,
                    value: raw_week.to_owned(),
                }
            })?)
        };

        let cells = record
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                if index == week_index {
                    week.map_or(Cell::Null, Cell::Date)
                } else {
                    Cell::infer(raw)
                }
            })
            .collect();

        rows.push(Row { week, cells });
    }

    Ok(Table { columns, rows })
}

pub fn read_table(
    path: &Path,
    required: &[&'static str],
) -> Result<Table, LoadError> {
    let file_content = fs::read_to_string(path)?;
    parse_table_csv(&file_content, required)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_table() {
        let csv = "week,avg_steps,active_users\n\
                   2024-01-01,5000,12\n\
                   2024-01-08,5200.5,";

        let table = parse_table_csv(csv, &[]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].week, Some(date(2024, 1, 1)));
        assert_eq!(
            table.rows()[0].cells,
            vec![
                Cell::Date(date(2024, 1, 1)),
                Cell::Number(5000.into()),
                Cell::Number(12.into())
            ]
        );
        assert_eq!(
            table.rows()[1].cells,
            vec![
                Cell::Date(date(2024, 1, 8)),
                Cell::Number(Number::from_f64(5200.5).unwrap()),
                Cell::Null
            ]
        );
    }

    #[test]
    fn test_non_finite_numbers_are_null() {
        let csv = "week,avg_steps,ratio\n2024-01-01,NaN,inf";

        let table = parse_table_csv(csv, &[]).unwrap();
        assert_eq!(table.rows()[0].cells[1], Cell::Null);
        assert_eq!(table.rows()[0].cells[2], Cell::Null);
        assert_eq!(table.rows()[0].cells[1].as_f64(), None);
    }

    #[test]
    fn test_missing_week_column() {
        let csv = "date,avg_steps\n2024-01-01,5000";

        let result = parse_table_csv(csv, &[]);
        assert!(matches!(
            result,
            Err(LoadError::MissingColumn { column: "week" })
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "week,persona\n2024-01-01,A";

        let result = parse_table_csv(csv, &[ACTIVITY_COLUMN]);
        assert!(matches!(
            result,
            Err(LoadError::MissingColumn { column: "avg_steps" })
        ));
    }

    #[test]
    fn test_invalid_week_value() {
        let csv = "week,avg_steps\n2024-01-01,1\nlast week,2";

        let err = parse_table_csv(csv, &[]).unwrap_err();
        match err {
            LoadError::InvalidWeek { row, value } => {
                assert_eq!(row, 3);
                assert_eq!(value, "last week");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_week_is_null() {
        let csv = "week,avg_steps\n,100";

        let table = parse_table_csv(csv, &[]).unwrap();
        assert_eq!(table.rows()[0].week, None);
        assert_eq!(table.rows()[0].cells[0], Cell::Null);
    }

    #[test]
    fn test_datetime_weeks_truncate_to_date() {
        let csv = "week\n\
                   2024-01-01 00:00:00\n\
                   2024-01-08T00:00:00\n\
                   2024-01-15T00:00:00+00:00";

        let table = parse_table_csv(csv, &[]).unwrap();
        let weeks: Vec<_> = table.rows().iter().map(|row| row.week).collect();
        assert_eq!(
            weeks,
            vec![
                Some(date(2024, 1, 1)),
                Some(date(2024, 1, 8)),
                Some(date(2024, 1, 15))
            ]
        );
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let csv = "week,avg_steps\n2024-01-01,1,extra";

        let result = parse_table_csv(csv, &[]);
        assert!(matches!(result, Err(LoadError::Csv(_))));
    }

    #[test]
    fn test_header_only_table() {
        let table = parse_table_csv("week,avg_steps\n", &[]).unwrap();
        assert_eq!(table.len(), 0);
        assert_eq!(table.column_index("avg_steps"), Some(1));
    }

    #[test]
    fn test_record_keeps_column_order() {
        let csv = "zeta,week,alpha\nx,2024-01-01,1.5";

        let table = parse_table_csv(csv, &[]).unwrap();
        let json =
            serde_json::to_string(&table.record(&table.rows()[0])).unwrap();
        assert_eq!(json, r#"{"zeta":"x","week":"2024-01-01","alpha":1.5}"#);
    }

    #[test]
    fn test_missing_file() {
        let result = read_table(Path::new("/nonexistent/weekly.csv"), &[]);
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
