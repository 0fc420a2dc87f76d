pub mod actuation;
pub mod adapter;
pub mod builder;
pub mod builtins;
pub mod engine;
pub mod environment;
pub mod error;
pub mod eval;
pub mod listener;
pub mod oracle;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod value;

pub use adapter::{AdaptedCandidate, Adapter, DirectAdapter};
pub use builder::{InvocationBuilder, Invocations};
pub use engine::ExecutionEngine;
pub use error::{BuildError, EvalError, Fault};
pub use eval::{Evaluator, ExpressionEvaluator};
pub use listener::ExecutionListener;
pub use record::{ExecutedSequence, Record};
pub use registry::{TypeDescriptor, TypeRegistry};
pub use resolver::{ResolvedBinding, ResolverCache, SignatureResolver};
pub use value::Value;
