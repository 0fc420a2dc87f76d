use crate::runtime::{record::Record, value::Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing a record against the statement's expected value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No expectation was given.
    #[default]
    Undefined,
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::Undefined => "undefined",
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
        };
        f.write_str(text)
    }
}

/// A fault never satisfies an expectation.
pub fn judge(record: &Record, expected: &Value) -> Verdict {
    match record.get_value() {
        Some(actual) if actual.loosely_equals(expected) => Verdict::Pass,
        _ => Verdict::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::Fault;

    #[test]
    fn values_pass_across_numeric_widths() {
        let record = Record::value(0, Value::Long(3));
        assert_eq!(judge(&record, &Value::Short(3)), Verdict::Pass);
        assert_eq!(judge(&record, &Value::Int(4)), Verdict::Fail);
        assert_eq!(judge(&Record::value(1, Value::Null), &Value::Null), Verdict::Pass);
    }

    #[test]
    fn faults_fail_even_against_null() {
        let record = Record::fault(0, Fault::null_pointer(""));
        assert_eq!(judge(&record, &Value::Null), Verdict::Fail);
        assert_eq!(Verdict::default().to_string(), "undefined");
    }
}
