// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV rendering for network reports.
//!
//! The format is deliberately small: the header is the first row's field
//! names in upper case, strings that need it are quoted with inner quotes
//! doubled, and every other value is written as-is.

use super::record::HttpRequestRecord;
use crate::errors::CsvParseError;
use serde_json::{Map, Value};
use swrite::{SWrite, swrite};

/// Converts request records to CSV.
///
/// Returns an empty string for an empty slice.
pub fn records_to_csv(records: &[HttpRequestRecord]) -> Result<String, serde_json::Error> {
    let rows = records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "expected a record to serialize to an object, found {other}"
            ))),
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;
    Ok(rows_to_csv(&rows))
}

/// Converts JSON objects to CSV, using the first object's keys as columns.
///
/// Keys missing from later rows render as empty fields.
pub fn rows_to_csv(rows: &[Map<String, Value>]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let columns: Vec<&String> = first.keys().collect();
    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|column| column.to_uppercase())
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        out.push('\n');
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            if let Some(value) = row.get(column.as_str()) {
                write_value(&mut out, value);
            }
        }
    }

    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => write_str_field(out, s),
        // Numbers, booleans and null are written the way they appear in JSON.
        other => swrite!(out, "{other}"),
    }
}

fn write_str_field(out: &mut String, s: &str) {
    if s.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&s.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(s);
    }
}

/// Parses CSV produced by [`rows_to_csv`] back into rows of fields.
///
/// Rows are separated by `\n`, and a final line break ends the input rather
/// than starting an empty row. Quoted fields may contain separators, line
/// breaks and doubled quotes. An empty input has no rows.
pub fn parse_csv(input: &str) -> Result<Vec<Vec<String>>, CsvParseError> {
    let mut rows = Vec::new();
    if input.is_empty() {
        return Ok(rows);
    }

    let mut row = Vec::new();
    let mut field = String::new();
    let mut line = 1;
    let mut chars = input.chars().peekable();

    loop {
        // At the start of a field.
        if chars.peek() == Some(&'"') {
            chars.next();
            let start_line = line;
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => {
                        if c == '\n' {
                            line += 1;
                        }
                        field.push(c);
                    }
                    None => return Err(CsvParseError::UnterminatedQuote { line: start_line }),
                }
            }
            match chars.peek() {
                None | Some(',') | Some('\n') => {}
                Some(&found) => return Err(CsvParseError::TrailingAfterQuote { line, found }),
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' || c == '\n' {
                    break;
                }
                field.push(c);
                chars.next();
            }
        }

        row.push(std::mem::take(&mut field));
        match chars.next() {
            Some(',') => {}
            Some(_) => {
                // A line break ends the row.
                rows.push(std::mem::take(&mut row));
                if chars.peek().is_none() {
                    return Ok(rows);
                }
                line += 1;
            }
            None => {
                rows.push(row);
                return Ok(rows);
            }
        }
    }
}
