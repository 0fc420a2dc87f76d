use crate::runtime::{error::Fault, oracle::Verdict, value::Value};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Value(Value),
    Fault(Fault),
}

/// Outcome of one statement, tagged with the statement that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    producer: usize,
    outcome: Outcome,
    adapted: bool,
}

impl Record {
    pub fn value(producer: usize, value: Value) -> Self {
        Self {
            producer,
            outcome: Outcome::Value(value),
            adapted: false,
        }
    }

    pub fn fault(producer: usize, fault: Fault) -> Self {
        Self {
            producer,
            outcome: Outcome::Fault(fault),
            adapted: false,
        }
    }

    /// Marks the value as the adapted stand-in for the object under comparison.
    pub fn adapted(mut self, adapted: bool) -> Self {
        self.adapted = adapted && matches!(self.outcome, Outcome::Value(_));
        self
    }

    pub fn producer(&self) -> usize {
        self.producer
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn get_value(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Value(value) => Some(value),
            Outcome::Fault(_) => None,
        }
    }

    pub fn get_fault(&self) -> Option<&Fault> {
        match &self.outcome {
            Outcome::Fault(fault) => Some(fault),
            Outcome::Value(_) => None,
        }
    }

    /// The value a referencing statement receives; faults read as `null`.
    pub fn value_or_null(&self) -> Value {
        self.get_value().cloned().unwrap_or(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.outcome, Outcome::Value(Value::Null))
    }

    pub fn is_fault(&self) -> bool {
        matches!(self.outcome, Outcome::Fault(_))
    }

    pub fn is_adapted(&self) -> bool {
        self.adapted
    }

    pub fn to_json(&self) -> Json {
        match &self.outcome {
            Outcome::Value(value) => value.to_json(),
            Outcome::Fault(fault) => json!({ "fault": fault.kind, "message": fault.message }),
        }
    }

    pub fn type_name(&self) -> String {
        match &self.outcome {
            Outcome::Value(value) => value.runtime_type().to_string(),
            Outcome::Fault(fault) => fault.kind.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutedStatement {
    pub index: usize,
    pub row: u32,
    pub operation: String,
    pub target: Option<String>,
    pub record: Record,
    pub inputs: Vec<Value>,
    pub duration: Duration,
    pub verdict: Verdict,
}

/// Trace of one run of a sequence against one candidate.
#[derive(Clone, Debug)]
pub struct ExecutedSequence {
    sequence: String,
    candidate: String,
    statements: Vec<ExecutedStatement>,
    total: Duration,
}

impl ExecutedSequence {
    pub fn new(sequence: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            candidate: candidate.into(),
            statements: Vec::new(),
            total: Duration::ZERO,
        }
    }

    pub(crate) fn push(&mut self, statement: ExecutedStatement) {
        self.statements.push(statement);
    }

    pub(crate) fn finish(&mut self, total: Duration) {
        self.total = total;
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn statements(&self) -> &[ExecutedStatement] {
        &self.statements
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.statements.get(index).map(|statement| &statement.record)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.statements.iter().map(|statement| &statement.record)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn fault_count(&self) -> usize {
        self.records().filter(|record| record.is_fault()).count()
    }

    /// Flattens the run into collector rows: the output at column 0 and captured
    /// inputs from column 3 on.
    pub fn observations(&self, key: &ObservationKey) -> Vec<Observation> {
        let mut rows = Vec::new();
        for statement in &self.statements {
            let base = Observation {
                execution: key.execution.clone(),
                abstraction: key.abstraction.clone(),
                action: key.action.clone(),
                sequence: self.sequence.clone(),
                candidate: self.candidate.clone(),
                row: statement.row,
                column: OUTPUT_COLUMN,
                kind: ObservationKind::Output,
                value: statement.record.to_json(),
                type_name: statement.record.type_name(),
                producer: statement.record.producer(),
                adapted: statement.record.is_adapted(),
                duration_nanos: u64::try_from(statement.duration.as_nanos()).unwrap_or(u64::MAX),
                verdict: statement.verdict,
            };
            let inputs: Vec<Observation> = statement
                .inputs
                .iter()
                .enumerate()
                .map(|(position, input)| Observation {
                    column: FIRST_PARAMETER_COLUMN + position as u32,
                    kind: ObservationKind::Input,
                    value: input.to_json(),
                    type_name: input.runtime_type().to_string(),
                    adapted: false,
                    duration_nanos: 0,
                    verdict: Verdict::Undefined,
                    ..base.clone()
                })
                .collect();
            let base = if statement.record.is_fault() {
                Observation {
                    kind: ObservationKind::Fault,
                    ..base
                }
            } else {
                base
            };
            rows.push(base);
            rows.extend(inputs);
        }
        rows
    }
}

pub const OUTPUT_COLUMN: u32 = 0;
/// Column 2 names the type or receiver; parameters follow it.
pub const FIRST_PARAMETER_COLUMN: u32 = 3;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationKey {
    pub execution: String,
    pub abstraction: String,
    pub action: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Output,
    Fault,
    Input,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub execution: String,
    pub abstraction: String,
    pub action: String,
    pub sequence: String,
    pub candidate: String,
    pub row: u32,
    pub column: u32,
    pub kind: ObservationKind,
    pub value: Json,
    pub type_name: String,
    pub producer: usize,
    pub adapted: bool,
    pub duration_nanos: u64,
    pub verdict: Verdict,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(index: usize, record: Record, inputs: Vec<Value>) -> ExecutedStatement {
        ExecutedStatement {
            index,
            row: index as u32 + 1,
            operation: "op".into(),
            target: None,
            record,
            inputs,
            duration: Duration::from_nanos(10),
            verdict: Verdict::Undefined,
        }
    }

    #[test]
    fn records_hold_a_value_or_a_fault() {
        let value = Record::value(0, Value::Null);
        assert!(value.is_null());
        assert!(!value.is_fault());
        let fault = Record::fault(1, Fault::unsupported("nope")).adapted(true);
        assert!(fault.is_fault());
        assert!(!fault.is_null());
        assert!(!fault.is_adapted());
        assert_eq!(fault.value_or_null(), Value::Null);
        assert_eq!(fault.producer(), 1);
    }

    #[test]
    fn observations_cover_outputs_and_inputs() {
        let mut executed = ExecutedSequence::new("Sheet 1", "ListStack");
        executed.push(statement(0, Record::value(0, Value::Int(1)), vec![Value::Int(1)]));
        executed.push(statement(
            1,
            Record::fault(1, Fault::new("java.util.EmptyStackException", "")),
            Vec::new(),
        ));
        let key = ObservationKey {
            execution: "e1".into(),
            abstraction: "Stack".into(),
            action: "arena".into(),
        };
        let rows = executed.observations(&key);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].column, OUTPUT_COLUMN);
        assert_eq!(rows[0].value, json!(1));
        assert_eq!(rows[1].kind, ObservationKind::Input);
        assert_eq!(rows[1].column, 3);
        assert_eq!(rows[2].kind, ObservationKind::Fault);
        assert_eq!(rows[2].type_name, "java.util.EmptyStackException");
        assert_eq!(rows[2].row, 2);
        assert_eq!(executed.fault_count(), 1);

        let encoded = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(encoded["typeName"], json!("int"));
        assert_eq!(encoded["candidate"], json!("ListStack"));
    }
}
