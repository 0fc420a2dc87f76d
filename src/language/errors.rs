use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{text}` is not a valid type name")]
pub struct TypeParseError {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("line {line}: malformed sheet record: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: `{key}` is not a cell coordinate")]
    CellKey { line: usize, key: String },
    #[error("line {line}: cells span more than one row ({first} and {second})")]
    MixedRows {
        line: usize,
        first: u32,
        second: u32,
    },
    #[error("line {line}: row has no operation cell")]
    MissingOperation { line: usize },
    #[error("line {line}: operation cell must be text")]
    OperationNotText { line: usize },
    #[error("line {line}: row {row} appears twice in sheet `{sheet}`")]
    DuplicateRow { line: usize, sheet: String, row: u32 },
}

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("malformed interface specification: {0}")]
    Json(#[from] serde_json::Error),
    #[error("descriptor `{descriptor}`: {source}")]
    Type {
        descriptor: String,
        #[source]
        source: TypeParseError,
    },
}

impl WireError {
    /// One-based line of the offending record.
    pub fn line(&self) -> usize {
        match self {
            WireError::Json { line, .. }
            | WireError::CellKey { line, .. }
            | WireError::MixedRows { line, .. }
            | WireError::MissingOperation { line }
            | WireError::OperationNotText { line }
            | WireError::DuplicateRow { line, .. } => *line,
        }
    }
}
