use miette::Diagnostic;
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

pub type InvokeResult = Result<crate::runtime::value::Value, Fault>;
pub type BuildResult<T> = Result<T, BuildError>;

/// A thrown failure, recorded as data instead of propagated.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct Fault {
    pub kind: String,
    pub message: String,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new("java.lang.IllegalArgumentException", message)
    }

    pub fn null_pointer(message: impl Into<String>) -> Self {
        Self::new("java.lang.NullPointerException", message)
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            "java.lang.IndexOutOfBoundsException",
            format!("Index {index} out of bounds for length {len}"),
        )
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new("java.lang.ArithmeticException", message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new("java.lang.UnsupportedOperationException", message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new("java.lang.IllegalStateException", message)
    }

    pub fn no_such_method(message: impl Into<String>) -> Self {
        Self::new("java.lang.NoSuchMethodException", message)
    }

    pub fn evaluation(err: &EvalError) -> Self {
        match err {
            EvalError::Thrown(fault) => fault.clone(),
            other => Self::new("evaluation", other.to_string()),
        }
    }

    /// Converts a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "candidate panicked".to_string()
        };
        Self::new("panic", message)
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("cannot parse expression `{text}`")]
    Syntax { text: String },
    #[error("unknown symbol `{name}`")]
    UnknownSymbol { name: String },
    #[error("unknown type `{name}`")]
    UnknownType { name: String },
    #[error("`{type_name}` has no member `{name}` taking {arity} argument(s) of the given types")]
    UnknownMember {
        type_name: String,
        name: String,
        arity: usize,
    },
    #[error("array shorthand `{text}` needs an expected array type")]
    ArrayShorthand { text: String },
    #[error("{value} cannot be converted to {target}")]
    Conversion { value: String, target: String },
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("evaluation threw {0}")]
    Thrown(Fault),
}

/// Fatal problems found while binding a sequence to one candidate.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("statement {statement}: `{signature}` has no counterpart on `{candidate}`")]
    #[diagnostic(
        code(arena::build::unresolved_signature),
        help("the candidate does not expose this interface signature and is excluded")
    )]
    UnresolvedSignature {
        statement: usize,
        signature: String,
        candidate: String,
    },
    #[error("statement {statement}: `{operation}` needs a reference to an earlier statement as its receiver")]
    #[diagnostic(
        code(arena::build::malformed_receiver),
        help("put a reference such as `A1` or `$0` into the first input cell")
    )]
    MalformedReceiver {
        statement: usize,
        operation: String,
        input: Option<String>,
    },
    #[error("statement {statement}: `{reference}` does not refer to an earlier statement")]
    #[diagnostic(
        code(arena::build::forward_reference),
        help("references may only name statements that come before this one")
    )]
    ForwardReference { statement: usize, reference: String },
    #[error("statement {statement}: `{reference}` names no statement of this sequence")]
    #[diagnostic(code(arena::build::dangling_reference))]
    DanglingReference { statement: usize, reference: String },
    #[error("statement {statement}: `{operation}` with {arity} argument(s) resolves neither against the interface nor against `{receiver}`")]
    #[diagnostic(code(arena::build::unknown_operation))]
    UnknownOperation {
        statement: usize,
        operation: String,
        receiver: String,
        arity: usize,
    },
    #[error("statement {statement}: unknown type `{name}`")]
    #[diagnostic(code(arena::build::unknown_type))]
    UnknownType { statement: usize, name: String },
    #[error("statement {statement}: `{type_name}` has no constructor taking {arity} argument(s) of the given types")]
    #[diagnostic(code(arena::build::no_matching_constructor))]
    NoMatchingConstructor {
        statement: usize,
        type_name: String,
        arity: usize,
    },
    #[error("statement {statement}: cannot evaluate `{text}`")]
    #[diagnostic(code(arena::build::evaluation))]
    Evaluation {
        statement: usize,
        text: String,
        #[source]
        source: EvalError,
    },
    #[error("statement {statement}: `{operation}` is missing its first input")]
    #[diagnostic(code(arena::build::missing_input))]
    MissingInput { statement: usize, operation: String },
}

impl BuildError {
    /// Index of the offending statement.
    pub fn statement(&self) -> usize {
        match self {
            BuildError::UnresolvedSignature { statement, .. }
            | BuildError::MalformedReceiver { statement, .. }
            | BuildError::ForwardReference { statement, .. }
            | BuildError::DanglingReference { statement, .. }
            | BuildError::UnknownOperation { statement, .. }
            | BuildError::UnknownType { statement, .. }
            | BuildError::NoMatchingConstructor { statement, .. }
            | BuildError::Evaluation { statement, .. }
            | BuildError::MissingInput { statement, .. } => *statement,
        }
    }
}

#[derive(Debug, Error)]
#[error("listener `{listener}` failed: {message}")]
pub struct ListenerError {
    pub listener: String,
    pub message: String,
}

impl ListenerError {
    pub fn new(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            message: message.into(),
        }
    }
}
