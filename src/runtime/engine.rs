use crate::config::EngineConfig;
use crate::language::types::TypeRef;
use crate::runtime::{
    adapter::AdaptedCandidate,
    builder::{CallTarget, ConstructionTarget, Invocation, InvocationKind, Invocations, Parameter},
    environment::TypeEnvironment,
    error::{Fault, InvokeResult},
    eval::Evaluator,
    listener::{ExecutionListener, ListenerResult},
    oracle::{judge, Verdict},
    record::{ExecutedSequence, ExecutedStatement, Record},
    value::Value,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, trace, warn};

/// Runs bound sequences against adapted candidates, one statement at a time.
pub struct ExecutionEngine<'e> {
    evaluator: &'e dyn Evaluator,
    config: EngineConfig,
}

impl<'e> ExecutionEngine<'e> {
    pub fn new(evaluator: &'e dyn Evaluator, config: EngineConfig) -> Self {
        Self { evaluator, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Always completes: faults become records and listener failures are logged.
    pub fn execute(
        &self,
        invocations: &Invocations,
        candidate: &AdaptedCandidate,
        listener: &mut dyn ExecutionListener,
    ) -> ExecutedSequence {
        let span = info_span!(
            "execute",
            sequence = invocations.name(),
            candidate = %candidate.name
        );
        let _enter = span.enter();

        let bound = &invocations.binding().candidate;
        let mismatch = (!Arc::ptr_eq(bound, &candidate.candidate)).then(|| {
            warn!(
                bound = bound.name(),
                adapted = candidate.candidate.name(),
                "sequence was bound to a different candidate type"
            );
            Fault::illegal_state(format!(
                "sequence was bound to `{}`, not to `{}`",
                bound.name(),
                candidate.candidate.name()
            ))
        });

        let started = Instant::now();
        let mut run = Run {
            evaluator: self.evaluator,
            config: self.config,
            candidate,
            mismatch,
            env: invocations.environment().clone(),
            executed: ExecutedSequence::new(invocations.name(), candidate.name.clone()),
        };

        notify(listener, "before_sequence", |l| {
            l.before_sequence(invocations, &run.executed, candidate)
        });
        for invocation in invocations.invocations() {
            notify(listener, "before_statement", |l| {
                l.before_statement(invocation, &run.executed, candidate)
            });
            let statement = run.statement(invocation);
            notify(listener, "after_statement", |l| {
                l.after_statement(invocation, &statement, &run.executed, candidate)
            });
            run.executed.push(statement);
        }

        let mut executed = run.executed;
        executed.finish(started.elapsed());
        notify(listener, "after_sequence", |l| l.after_sequence(&executed, candidate));
        info!(
            statements = executed.len(),
            faults = executed.fault_count(),
            elapsed = ?executed.total(),
            "executed sequence"
        );
        executed
    }
}

/// Runs a listener hook; errors and panics are logged and dropped.
fn notify<L: ExecutionListener + ?Sized>(
    listener: &mut L,
    hook: &'static str,
    call: impl FnOnce(&mut L) -> ListenerResult,
) {
    let name = listener.name().to_string();
    match panic::catch_unwind(AssertUnwindSafe(|| call(listener))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(listener = %err.listener, hook, error = %err.message, "listener failed"),
        Err(payload) => {
            let fault = Fault::from_panic(payload);
            warn!(listener = %name, hook, panic = %fault.message, "listener panicked");
        }
    }
}

/// State of one run. The environment is a copy, so types seen here stay here.
struct Run<'r> {
    evaluator: &'r dyn Evaluator,
    config: EngineConfig,
    candidate: &'r AdaptedCandidate,
    /// Set when the invocations were bound to another candidate; interface
    /// dispatch then faults instead of calling the bound members.
    mismatch: Option<Fault>,
    env: TypeEnvironment,
    executed: ExecutedSequence,
}

impl Run<'_> {
    fn statement(&mut self, invocation: &Invocation) -> ExecutedStatement {
        let started = Instant::now();
        let (record, inputs) = self.record(invocation);
        let duration = started.elapsed();
        let verdict = match &invocation.expected {
            Some(expected) if self.config.check_oracles => self.verdict(&record, expected),
            _ => Verdict::Undefined,
        };
        match record.get_fault() {
            Some(fault) => debug!(index = invocation.index, %fault, "statement faulted"),
            None => trace!(index = invocation.index, ?duration, %verdict, "statement done"),
        }
        ExecutedStatement {
            index: invocation.index,
            row: invocation.row,
            operation: invocation.operation.clone(),
            target: invocation.target.clone(),
            record,
            inputs: if self.config.capture_inputs {
                inputs
            } else {
                Vec::new()
            },
            duration,
            verdict,
        }
    }

    fn record(&mut self, invocation: &Invocation) -> (Record, Vec<Value>) {
        let index = invocation.index;
        if let InvocationKind::Alias { source } = &invocation.kind {
            let record = self
                .executed
                .record(*source)
                .cloned()
                .unwrap_or_else(|| Record::value(*source, Value::Null));
            return (record, Vec::new());
        }

        let args = match self.arguments(&invocation.parameters) {
            Ok(args) => args,
            Err(fault) => return (Record::fault(index, fault), Vec::new()),
        };
        let outcome = if self.config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&invocation.kind, &args)))
                .unwrap_or_else(|payload| Err(Fault::from_panic(payload)))
        } else {
            self.dispatch(&invocation.kind, &args)
        };
        let record = match outcome {
            Ok(value) => {
                let adapted = self.is_adapted(&invocation.kind, &value);
                Record::value(index, value).adapted(adapted)
            }
            Err(fault) => Record::fault(index, fault),
        };
        (record, args)
    }

    /// References read earlier records; literals are evaluated afresh for every run.
    fn arguments(&mut self, parameters: &[Parameter]) -> Result<Vec<Value>, Fault> {
        let mut args = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let value = match parameter {
                Parameter::Reference { index, .. } => self.referenced(*index),
                Parameter::Value {
                    declared, source, ..
                } => {
                    self.evaluator
                        .eval(source, Some(declared), &mut self.env)
                        .map_err(|err| Fault::evaluation(&err))?
                        .value
                }
            };
            args.push(value);
        }
        Ok(args)
    }

    /// A faulted or missing producer reads as `null`.
    fn referenced(&self, index: usize) -> Value {
        self.executed
            .record(index)
            .map(Record::value_or_null)
            .unwrap_or(Value::Null)
    }

    fn dispatch(&mut self, kind: &InvocationKind, args: &[Value]) -> InvokeResult {
        let adapter = &self.candidate.adapter;
        match kind {
            InvocationKind::Construction(ConstructionTarget::Interface(id, member)) => {
                if let Some(fault) = &self.mismatch {
                    return Err(fault.clone());
                }
                if !adapter.supports(*id) {
                    return Err(Fault::unsupported(format!(
                        "adapter `{}` does not support {}",
                        adapter.name(),
                        member.signature()
                    )));
                }
                adapter.construct(*id, member, args)
            }
            InvocationKind::Construction(ConstructionTarget::Direct(member)) => {
                member.call(&Value::Null, args)
            }
            InvocationKind::MemberCall { receiver, target } => {
                let this = self.referenced(*receiver);
                if this.is_null() {
                    return Err(Fault::null_pointer(format!(
                        "cannot invoke `{}` on a null receiver",
                        target_name(target)
                    )));
                }
                match target {
                    CallTarget::Interface(id, member) => {
                        if let Some(fault) = &self.mismatch {
                            return Err(fault.clone());
                        }
                        if !adapter.supports(*id) {
                            return Err(Fault::unsupported(format!(
                                "adapter `{}` does not support {}",
                                adapter.name(),
                                member.signature()
                            )));
                        }
                        adapter.invoke(*id, member, &this, args)
                    }
                    CallTarget::Runtime(member) => member.call(&this, args),
                    CallTarget::Dynamic { name, .. } => {
                        let types: Vec<TypeRef> = args.iter().map(Value::runtime_type).collect();
                        let descriptor = self.env.descriptor_for_value(&this);
                        let member = descriptor
                            .as_ref()
                            .and_then(|descriptor| descriptor.find_method(name, &types))
                            .ok_or_else(|| {
                                Fault::no_such_method(format!(
                                    "{}.{name} taking {} argument(s)",
                                    this.runtime_type(),
                                    args.len()
                                ))
                            })?;
                        member.call(&this, args)
                    }
                }
            }
            InvocationKind::RawExpression { expression } => self
                .evaluator
                .eval(expression, None, &mut self.env)
                .map(|evaluated| evaluated.value)
                .map_err(|err| Fault::evaluation(&err)),
            InvocationKind::Alias { source } => Ok(self.referenced(*source)),
        }
    }

    /// Interface constructions yield the adapted object; so does anything identical to one.
    fn is_adapted(&self, kind: &InvocationKind, value: &Value) -> bool {
        if matches!(
            kind,
            InvocationKind::Construction(ConstructionTarget::Interface(..))
        ) {
            return true;
        }
        self.executed.records().any(|record| {
            record.is_adapted()
                && record
                    .get_value()
                    .is_some_and(|adapted| adapted.same_identity(value))
        })
    }

    /// Oracle text is typed by the statement's result; it is evaluated after the statement ran.
    fn verdict(&mut self, record: &Record, expected: &Parameter) -> Verdict {
        let expected = match expected {
            Parameter::Reference { index, .. } => self.referenced(*index),
            Parameter::Value {
                declared, source, ..
            } => match self.evaluator.eval(source, Some(declared), &mut self.env) {
                Ok(evaluated) => evaluated.value,
                Err(err) => {
                    debug!(oracle = %source, error = %err, "expected value does not evaluate");
                    return Verdict::Fail;
                }
            },
        };
        judge(record, &expected)
    }
}

fn target_name(target: &CallTarget) -> &str {
    match target {
        CallTarget::Interface(_, member) | CallTarget::Runtime(member) => &member.name,
        CallTarget::Dynamic { name, .. } => name,
    }
}
