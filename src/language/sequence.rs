use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res},
    sequence::{pair, preceded},
    IResult, Parser as NomParser,
};
use serde::{Deserialize, Serialize};

/// Byte range of the wire line a statement came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLine {
    pub number: usize,
    pub offset: usize,
    pub len: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub row: u32,
    pub header: String,
    pub expected: Option<String>,
    pub operation: String,
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<SourceLine>,
}

impl Statement {
    pub fn new(operation: impl Into<String>, inputs: &[&str]) -> Self {
        Self {
            row: 0,
            header: String::new(),
            expected: None,
            operation: operation.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            line: None,
        }
    }

    pub fn expecting(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpecification {
    pub name: String,
    pub statements: Vec<Statement>,
}

impl SequenceSpecification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: Vec::new(),
        }
    }

    /// Appends a statement; programmatic rows are numbered from 1 like sheet rows.
    pub fn push(mut self, mut statement: Statement) -> Self {
        if statement.row == 0 {
            statement.row = self.statements.len() as u32 + 1;
        }
        if statement.header.is_empty() {
            statement.header = format!("Row {}", statement.row);
        }
        self.statements.push(statement);
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn position_of_row(&self, row: u32) -> Option<usize> {
        self.statements.iter().position(|s| s.row == row)
    }

    pub fn lookup_reference(&self, text: &str) -> ReferenceLookup {
        match CellReference::parse(text) {
            Some(CellReference::Slot(index)) if index < self.statements.len() => {
                ReferenceLookup::Statement(index)
            }
            Some(CellReference::Cell { column: 0, row }) => match self.position_of_row(row) {
                Some(index) => ReferenceLookup::Statement(index),
                None => ReferenceLookup::Dangling,
            },
            Some(CellReference::Slot(_)) => ReferenceLookup::Dangling,
            Some(CellReference::Cell { .. }) | None => ReferenceLookup::NotAReference,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceLookup {
    NotAReference,
    Statement(usize),
    /// Well-formed, but names no statement of this sequence.
    Dangling,
}

/// `A3` style sheet coordinates or `$2` style slot indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellReference {
    Cell { column: u32, row: u32 },
    Slot(usize),
}

impl CellReference {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok((_, slot)) = all_consuming(slot_reference).parse(text) {
            return Some(CellReference::Slot(slot));
        }
        all_consuming(cell_coordinate)
            .parse(text)
            .ok()
            .map(|(_, (column, row))| CellReference::Cell { column, row })
    }
}

fn slot_reference(input: &str) -> IResult<&str, usize> {
    preceded(char('$'), map_res(digit1, |digits: &str| digits.parse::<usize>())).parse(input)
}

/// Column letters (A = 0) followed by a 1-based row number.
pub(crate) fn cell_coordinate(input: &str) -> IResult<&str, (u32, u32)> {
    let (rest, (letters, digits)) = pair(
        take_while1(|c: char| c.is_ascii_uppercase()),
        map_res(digit1, |digits: &str| digits.parse::<u32>()),
    )
    .parse(input)?;
    if digits == 0 || letters.len() > 3 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    let column = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1))
        - 1;
    Ok((rest, (column, digits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cell_and_slot_references() {
        assert_eq!(
            CellReference::parse("A1"),
            Some(CellReference::Cell { column: 0, row: 1 })
        );
        assert_eq!(
            CellReference::parse("AB12"),
            Some(CellReference::Cell { column: 27, row: 12 })
        );
        assert_eq!(CellReference::parse("$3"), Some(CellReference::Slot(3)));
        assert_eq!(CellReference::parse("A0"), None);
        assert_eq!(CellReference::parse("Stack"), None);
        assert_eq!(CellReference::parse("'A1'"), None);
        assert_eq!(CellReference::parse("a1"), None);
    }

    #[test]
    fn only_output_cells_are_references() {
        let sequence = SequenceSpecification::new("s")
            .push(Statement::new("create", &["Stack"]))
            .push(Statement::new("size", &["A1"]));
        assert_eq!(sequence.lookup_reference("A1"), ReferenceLookup::Statement(0));
        assert_eq!(sequence.lookup_reference("$1"), ReferenceLookup::Statement(1));
        assert_eq!(sequence.lookup_reference("A9"), ReferenceLookup::Dangling);
        assert_eq!(sequence.lookup_reference("$7"), ReferenceLookup::Dangling);
        assert_eq!(sequence.lookup_reference("C1"), ReferenceLookup::NotAReference);
        assert_eq!(sequence.lookup_reference("42"), ReferenceLookup::NotAReference);
    }
}
