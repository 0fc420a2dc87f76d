use crate::language::{
    errors::WireError,
    sequence::{cell_coordinate, SequenceSpecification, SourceLine, Statement},
};
use nom::{combinator::all_consuming, Parser as NomParser};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const OUTPUT_COLUMN: u32 = 0;
pub const OPERATION_COLUMN: u32 = 1;
pub const FIRST_INPUT_COLUMN: u32 = 2;

#[derive(Deserialize)]
struct RowRecord {
    #[serde(alias = "name")]
    sheet: String,
    #[serde(default)]
    header: String,
    #[serde(default)]
    cells: Map<String, Json>,
}

/// Parses a JSON-lines sheet stream. Rows are grouped per sheet in order of first appearance.
pub fn parse_sheets(text: &str) -> Result<Vec<SequenceSpecification>, WireError> {
    let mut sheets: Vec<SequenceSpecification> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut offset = 0usize;

    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let line_number = idx + 1;
        let line_offset = offset;
        offset += raw.len();
        let trimmed = raw.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }
        let record: RowRecord = serde_json::from_str(trimmed).map_err(|source| WireError::Json {
            line: line_number,
            source,
        })?;
        let source = SourceLine {
            number: line_number,
            offset: line_offset,
            len: trimmed.len(),
        };
        let statement = row_to_statement(line_number, &record, source)?;

        let slot = *by_name.entry(record.sheet.clone()).or_insert_with(|| {
            sheets.push(SequenceSpecification::new(record.sheet.clone()));
            sheets.len() - 1
        });
        let sheet = &mut sheets[slot];
        if sheet.position_of_row(statement.row).is_some() {
            return Err(WireError::DuplicateRow {
                line: line_number,
                sheet: sheet.name.clone(),
                row: statement.row,
            });
        }
        sheet.statements.push(statement);
    }

    debug!(sheets = sheets.len(), "parsed sheet stream");
    Ok(sheets)
}

/// Convenience for single-sheet streams; returns the first sheet.
pub fn parse_sheet(text: &str) -> Result<SequenceSpecification, WireError> {
    Ok(parse_sheets(text)?
        .into_iter()
        .next()
        .unwrap_or_else(|| SequenceSpecification::new("")))
}

fn row_to_statement(
    line: usize,
    record: &RowRecord,
    source: SourceLine,
) -> Result<Statement, WireError> {
    let mut row: Option<u32> = None;
    let mut cells: BTreeMap<u32, Option<String>> = BTreeMap::new();

    for (key, value) in &record.cells {
        let (column, cell_row) = match all_consuming(cell_coordinate).parse(key.as_str()) {
            Ok((_, coordinate)) => coordinate,
            Err(_) => {
                return Err(WireError::CellKey {
                    line,
                    key: key.clone(),
                })
            }
        };
        match row {
            Some(first) if first != cell_row => {
                return Err(WireError::MixedRows {
                    line,
                    first,
                    second: cell_row,
                })
            }
            _ => row = Some(cell_row),
        }
        if column == OPERATION_COLUMN && !matches!(value, Json::String(_)) {
            return Err(WireError::OperationNotText { line });
        }
        cells.insert(column, cell_text(value));
    }

    let operation = match cells.remove(&OPERATION_COLUMN) {
        Some(Some(op)) => op,
        _ => return Err(WireError::MissingOperation { line }),
    };
    let expected = cells.remove(&OUTPUT_COLUMN).flatten();
    let inputs = cells
        .into_iter()
        .filter(|(column, _)| *column >= FIRST_INPUT_COLUMN)
        .filter_map(|(_, text)| text)
        .collect();

    Ok(Statement {
        row: row.unwrap_or(0),
        header: record.header.clone(),
        expected,
        operation,
        inputs,
        line: Some(source),
    })
}

/// Spreadsheet key for a zero-based column and one-based row, e.g. `(27, 3)` is `AB3`.
pub fn cell_key(column: u32, row: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &row.to_string()
}

/// `{}` and empty text mean "no cell"; scalars keep their JSON spelling.
fn cell_text(value: &Json) -> Option<String> {
    match value {
        Json::Object(map) if map.is_empty() => None,
        Json::String(text) if text.trim().is_empty() => None,
        Json::String(text) => Some(text.clone()),
        Json::Null => Some("null".to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STACK_SHEET: &str = r#"{"sheet": "Sheet 1", "header": "Row 1", "cells": {"A1": {}, "B1": "create", "C1": "Stack"}}
{"sheet": "Sheet 1", "header": "Row 2", "cells": {"A2": {}, "B2": "create", "C2": "java.lang.String", "D2": "'Hello World!'"}}
{"sheet": "Sheet 1", "header": "Row 3", "cells": {"A3": {}, "B3": "push", "C3": "A1", "D3": "A2"}}
{"sheet": "Sheet 1", "header": "Row 4", "cells": {"A4": 1, "B4": "size", "C4": "A1"}}
"#;

    #[test]
    fn rows_become_statements_in_column_order() {
        let sheet = parse_sheet(STACK_SHEET).unwrap();
        assert_eq!(sheet.name, "Sheet 1");
        assert_eq!(sheet.len(), 4);
        assert_eq!(sheet.statements[0].operation, "create");
        assert_eq!(sheet.statements[0].inputs, vec!["Stack".to_string()]);
        assert_eq!(sheet.statements[0].expected, None);
        assert_eq!(
            sheet.statements[1].inputs,
            vec!["java.lang.String".to_string(), "'Hello World!'".to_string()]
        );
        assert_eq!(sheet.statements[3].expected.as_deref(), Some("1"));
        assert_eq!(sheet.statements[3].row, 4);
        let line = sheet.statements[2].line.unwrap();
        assert_eq!(line.number, 3);
        assert!(STACK_SHEET[line.offset..line.offset + line.len].contains("\"B3\": \"push\""));
    }

    #[test]
    fn sheets_are_grouped_by_name() {
        let text = r#"{"sheet": "a", "cells": {"B1": "create", "C1": "Stack"}}
{"name": "b", "cells": {"B1": "create", "C1": "Stack", "D1": 10}}
{"sheet": "a", "cells": {"B2": "pop", "C2": "A1", "A2": null}}"#;
        let sheets = parse_sheets(text).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].len(), 2);
        assert_eq!(sheets[0].statements[1].expected.as_deref(), Some("null"));
        assert_eq!(sheets[1].statements[0].inputs[1], "10");
    }

    #[test]
    fn cell_keys_round_trip_through_the_coordinate_parser() {
        assert_eq!(cell_key(0, 1), "A1");
        assert_eq!(cell_key(25, 2), "Z2");
        assert_eq!(cell_key(27, 3), "AB3");
        let (_, (column, row)) = cell_coordinate("AB3").unwrap();
        assert_eq!((column, row), (27, 3));
    }

    #[test]
    fn malformed_rows_name_their_line() {
        let err = parse_sheets("\n{\"sheet\": \"a\", \"cells\": {\"C2\": \"x\"}}").unwrap_err();
        assert!(matches!(err, WireError::MissingOperation { line: 2 }));

        let err = parse_sheets("{\"sheet\": \"a\", \"cells\": {\"B1\": \"x\", \"C2\": \"y\"}}")
            .unwrap_err();
        assert!(matches!(err, WireError::MixedRows { line: 1, .. }));

        let err = parse_sheets("{not json}").unwrap_err();
        assert!(matches!(err, WireError::Json { line: 1, .. }));

        let err = parse_sheets("{\"sheet\": \"a\", \"cells\": {\"b1\": \"x\"}}").unwrap_err();
        assert!(matches!(err, WireError::CellKey { .. }));
    }
}
