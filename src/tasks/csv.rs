//! CSV interchange for task lists.
//!
//! Export writes `ID,Title,Done,Created,Completed` with the title always
//! quoted. Import is lenient: it skips the header and blank lines, counts
//! malformed rows instead of failing, and ignores the `ID` column since the
//! store assigns ids on insert.

use chrono::{DateTime, Utc};

use crate::error::CsvError;
use crate::tasks::model::{Task, format_timestamp, parse_timestamp, validate_title};

pub const HEADER: &str = "ID,Title,Done,Created,Completed";

/// A row ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub title: String,
    pub done: bool,
    pub date_start: DateTime<Utc>,
    pub date_end: Option<DateTime<Utc>>,
}

/// Parsed import file.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<ImportRow>,
    /// Lines that looked like data but could not be used.
    pub errors: usize,
}

/// Render tasks as CSV text.
pub fn export(tasks: &[Task]) -> String {
    let mut lines = Vec::with_capacity(tasks.len() + 1);
    lines.push(HEADER.to_string());
    for task in tasks {
        lines.push(format!(
            "{},\"{}\",{},{},{}",
            task.id,
            task.title.replace('"', "\"\""),
            if task.done { "1" } else { "0" },
            task.date_start.as_ref().map(format_timestamp).unwrap_or_default(),
            task.date_end.as_ref().map(format_timestamp).unwrap_or_default(),
        ));
    }
    lines.join("\n")
}

/// File name an export taken at `at` is saved under.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("tasks_{}.csv", at.format("%Y-%m-%d"))
}

/// Parse CSV text. `now` fills in a missing creation date.
pub fn parse(text: &str, now: DateTime<Utc>, max_title_len: usize) -> Result<ParsedCsv, CsvError> {
    let lines: Vec<&str> = text.split('\n').filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(CsvError::Empty);
    }

    let mut parsed = ParsedCsv::default();
    for line in &lines[1..] {
        let values = split_line(line);
        if values.len() < 3 || values[1].is_empty() {
            continue;
        }
        match parse_row(&values, now, max_title_len) {
            Some(row) => parsed.rows.push(row),
            None => parsed.errors += 1,
        }
    }
    Ok(parsed)
}

fn parse_row(values: &[String], now: DateTime<Utc>, max_title_len: usize) -> Option<ImportRow> {
    let title = validate_title(&values[1], max_title_len).ok()?;
    let done = values[2] == "1";
    let date_start = match values.get(3).filter(|v| !v.is_empty()) {
        Some(raw) => parse_timestamp(raw)?,
        None => now,
    };
    let date_end = match values.get(4).filter(|v| !v.is_empty()) {
        Some(raw) => Some(parse_timestamp(raw)?),
        None => None,
    };
    // Keep the completion date paired with the done flag.
    let date_end = match (done, date_end) {
        (false, _) => None,
        (true, Some(end)) => Some(end),
        (true, None) => Some(now),
    };
    Some(ImportRow {
        title,
        done,
        date_start,
        date_end,
    })
}

/// Split on commas that sit outside double quotes, then trim each field,
/// strip its surrounding quotes and unescape doubled quotes.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
        .into_iter()
        .map(|field| {
            let field = field.trim();
            let field = field.strip_prefix('"').unwrap_or(field);
            let field = field.strip_suffix('"').unwrap_or(field);
            field.replace("\"\"", "\"")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, d, 8, 0, 0).unwrap()
    }

    #[test]
    fn export_quotes_titles() {
        let tasks = vec![
            Task {
                id: 1,
                title: "Say \"hi\", then leave".into(),
                done: true,
                date_start: Some(at(1)),
                date_end: Some(at(2)),
            },
            Task {
                id: 2,
                title: "Plain".into(),
                done: false,
                date_start: None,
                date_end: None,
            },
        ];
        let csv = export(&tasks);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "1,\"Say \"\"hi\"\", then leave\",1,2025-02-01T08:00:00.000Z,2025-02-02T08:00:00.000Z"
        );
        assert_eq!(lines[2], "2,\"Plain\",0,,");
    }

    #[test]
    fn parse_reads_export_back() {
        let tasks = vec![Task {
            id: 7,
            title: "Say \"hi\", then leave".into(),
            done: true,
            date_start: Some(at(1)),
            date_end: Some(at(2)),
        }];
        let parsed = parse(&export(&tasks), at(9), 200).unwrap();
        assert_eq!(parsed.errors, 0);
        assert_eq!(
            parsed.rows,
            vec![ImportRow {
                title: "Say \"hi\", then leave".into(),
                done: true,
                date_start: at(1),
                date_end: Some(at(2)),
            }]
        );
    }

    #[test]
    fn parse_fills_missing_dates() {
        let text = "ID,Title,Done\n1,Water plants,0\n2,\"Pay rent\",1\n";
        let parsed = parse(text, at(9), 200).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].date_start, at(9));
        assert_eq!(parsed.rows[0].date_end, None);
        assert!(parsed.rows[1].done);
        assert_eq!(parsed.rows[1].date_end, Some(at(9)));
    }

    #[test]
    fn parse_skips_short_and_untitled_rows() {
        let text = "ID,Title,Done\r\n\r\n1,only-two\r\n2,,1\r\n3,Real,0\r\n";
        let parsed = parse(text, at(9), 200).unwrap();
        assert_eq!(parsed.errors, 0);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].title, "Real");
    }

    #[test]
    fn parse_counts_bad_dates_as_errors() {
        let text = "ID,Title,Done,Created,Completed\n1,A,0,not-a-date,\n2,B,0,2025-02-03T08:00:00.000Z,\n";
        let parsed = parse(text, at(9), 200).unwrap();
        assert_eq!(parsed.errors, 1);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].date_start, at(3));
    }

    #[test]
    fn parse_drops_completion_date_of_active_rows() {
        let text = "h\n1,A,0,2025-02-01T08:00:00.000Z,2025-02-02T08:00:00.000Z\n";
        let parsed = parse(text, at(9), 200).unwrap();
        assert_eq!(parsed.rows[0].date_end, None);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(matches!(parse("ID,Title,Done\n\n", at(9), 200), Err(CsvError::Empty)));
        assert!(matches!(parse("", at(9), 200), Err(CsvError::Empty)));
    }

    #[test]
    fn file_name_uses_date() {
        assert_eq!(export_file_name(at(14)), "tasks_2025-02-14.csv");
    }
}
