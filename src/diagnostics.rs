use crate::language::{errors::WireError, sequence::SequenceSpecification};
use crate::runtime::error::BuildError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

/// A build failure pointed at the sheet line of the offending statement.
#[derive(Debug, Error, Diagnostic)]
#[error("{candidate} excluded from `{sequence}`: {message}")]
pub struct BuildDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    candidate: String,
    sequence: String,
    message: String,
    label: String,
}

impl BuildDiagnostic {
    pub fn new(
        src: NamedSource<String>,
        sequence: &SequenceSpecification,
        candidate: &str,
        err: &BuildError,
    ) -> Self {
        let statement = sequence.statements.get(err.statement());
        Self {
            src,
            span: statement
                .and_then(|statement| statement.line)
                .map(|line| SourceSpan::from((line.offset, line.len))),
            help: err.help().map(|help| help.to_string()),
            candidate: candidate.to_string(),
            sequence: sequence.name.clone(),
            message: err.to_string(),
            label: statement
                .map(|statement| format!("row {} (`{}`)", statement.row, statement.operation))
                .unwrap_or_else(|| "here".to_string()),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(arena::wire))]
pub struct WireDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("this record")]
    span: Option<SourceSpan>,
    message: String,
}

impl WireDiagnostic {
    pub fn new(src: NamedSource<String>, text: &str, err: &WireError) -> Self {
        Self {
            span: line_span(text, err.line()),
            src,
            message: err.to_string(),
        }
    }
}

/// Byte span of a one-based line, without its terminator.
fn line_span(text: &str, number: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == number {
            let len = raw.trim_end_matches(['\n', '\r']).len();
            return Some(SourceSpan::from((offset, len)));
        }
        offset += raw.len();
    }
    None
}

pub fn source(path: &Path, text: &str) -> NamedSource<String> {
    NamedSource::new(path.display().to_string(), text.to_string())
}

pub fn report_build_error(
    path: &Path,
    text: &str,
    sequence: &SequenceSpecification,
    candidate: &str,
    err: &BuildError,
) {
    let diagnostic = BuildDiagnostic::new(source(path, text), sequence, candidate, err);
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn wire_report(path: &Path, text: &str, err: &WireError) -> Report {
    Report::new(WireDiagnostic::new(source(path, text), text, err))
}
