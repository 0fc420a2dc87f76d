use crate::language::wire::cell_key;
use crate::runtime::{
    adapter::AdaptedCandidate,
    builder::{Invocation, Invocations},
    listener::{ExecutionListener, ListenerResult},
    record::{ExecutedSequence, ExecutedStatement, FIRST_PARAMETER_COLUMN, OUTPUT_COLUMN},
};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;

pub const OPERATION_COLUMN: u32 = 1;
pub const TARGET_COLUMN: u32 = 2;

/// Listener that lays a run out as a spreadsheet: one row per statement, the
/// record in column A, the operation in B, the receiver or type in C and the
/// resolved inputs after it.
#[derive(Debug, Default)]
pub struct ActuationSheet {
    sheet: String,
    candidate: String,
    cells: BTreeMap<(u32, u32), Json>,
}

impl ActuationSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&Json> {
        self.cells.get(&(row, column))
    }

    pub fn rows(&self) -> usize {
        let mut rows: Vec<u32> = self.cells.keys().map(|(row, _)| *row).collect();
        rows.dedup();
        rows.len()
    }

    /// One JSON object per row in the sheet wire shape, keyed by spreadsheet cell.
    pub fn to_json_lines(&self) -> String {
        let mut rows: BTreeMap<u32, Map<String, Json>> = BTreeMap::new();
        for ((row, column), value) in &self.cells {
            rows.entry(*row)
                .or_default()
                .insert(cell_key(*column, *row), value.clone());
        }
        let mut out = String::new();
        for cells in rows.into_values() {
            let line = json!({
                "sheet": self.sheet,
                "header": self.candidate,
                "cells": cells,
            });
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

impl ExecutionListener for ActuationSheet {
    fn name(&self) -> &str {
        "actuation-sheet"
    }

    fn before_sequence(
        &mut self,
        invocations: &Invocations,
        _executed: &ExecutedSequence,
        candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        self.sheet = invocations.name().to_string();
        self.candidate = candidate.name.clone();
        self.cells.clear();
        Ok(())
    }

    fn after_statement(
        &mut self,
        invocation: &Invocation,
        statement: &ExecutedStatement,
        _executed: &ExecutedSequence,
        _candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        let row = invocation.row;
        self.cells
            .insert((row, OUTPUT_COLUMN), statement.record.to_json());
        self.cells
            .insert((row, OPERATION_COLUMN), json!(invocation.operation));
        if let Some(target) = &invocation.target {
            self.cells.insert((row, TARGET_COLUMN), json!(target));
        }
        for (position, input) in statement.inputs.iter().enumerate() {
            self.cells
                .insert((row, FIRST_PARAMETER_COLUMN + position as u32), input.to_json());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::language::{
        interface::{InterfaceSpecification, MethodDescriptor},
        wire::parse_sheet,
    };
    use crate::runtime::{
        adapter::AdaptedCandidate,
        builder::InvocationBuilder,
        engine::ExecutionEngine,
        eval::ExpressionEvaluator,
        registry::{TypeDescriptor, TypeRegistry},
        resolver::SignatureResolver,
        value::Value,
    };
    use std::sync::Arc;

    #[test]
    fn cells_mirror_the_executed_rows() {
        let interface = Arc::new(InterfaceSpecification::new(
            "Echo",
            vec![MethodDescriptor::constructor(&[])],
            vec![MethodDescriptor::method("echo", &["int"], "int")],
        ));
        let candidate = Arc::new(
            TypeDescriptor::builder("Echoer")
                .constructor(&[], |_| Ok(Value::string("echoer")))
                .method("echo", &["int"], "int", |_, args| Ok(args[0].clone()))
                .build()
                .unwrap(),
        );
        let sequence = parse_sheet(concat!(
            r#"{"sheet":"S","cells":{"B1":"create","C1":"Echo"}}"#,
            "\n",
            r#"{"sheet":"S","cells":{"A2":7,"B2":"echo","C2":"A1","D2":7}}"#,
            "\n",
        ))
        .unwrap();
        let registry = Arc::new(TypeRegistry::with_builtins().unwrap());
        let binding = Arc::new(SignatureResolver::resolve(&candidate, &interface));
        let invocations = InvocationBuilder::new(&ExpressionEvaluator, registry)
            .build(&sequence, binding)
            .unwrap();

        let mut sheet = ActuationSheet::new();
        ExecutionEngine::new(&ExpressionEvaluator, EngineConfig::default()).execute(
            &invocations,
            &AdaptedCandidate::direct(candidate),
            &mut sheet,
        );

        assert_eq!(sheet.sheet(), "S");
        assert_eq!(sheet.rows(), 2);
        assert_eq!(sheet.cell(1, OUTPUT_COLUMN), Some(&json!("echoer")));
        assert_eq!(sheet.cell(2, OPERATION_COLUMN), Some(&json!("echo")));
        assert_eq!(sheet.cell(2, TARGET_COLUMN), Some(&json!("A1")));
        assert_eq!(sheet.cell(2, FIRST_PARAMETER_COLUMN), Some(&json!(7)));
        assert_eq!(sheet.cell(2, OUTPUT_COLUMN), Some(&json!(7)));

        let lines = sheet.to_json_lines();
        let second: Json = serde_json::from_str(lines.lines().nth(1).unwrap()).unwrap();
        assert_eq!(second["cells"]["D2"], json!(7));
        assert_eq!(second["header"], json!("Echoer"));
    }
}
