use crate::language::{
    interface::SignatureId,
    sequence::{ReferenceLookup, SequenceSpecification, SourceLine, Statement},
    types::TypeRef,
};
use crate::runtime::{
    environment::TypeEnvironment,
    error::{BuildError, BuildResult},
    eval::Evaluator,
    registry::{select, Member, TypeRegistry},
    resolver::ResolvedBinding,
    value::Value,
};
use std::sync::Arc;
use tracing::{debug, debug_span, trace};

/// Input of an invocation: an earlier record, or literal text evaluated per run.
#[derive(Clone, Debug, PartialEq)]
pub enum Parameter {
    Reference {
        index: usize,
        label: String,
        declared: TypeRef,
    },
    Value {
        declared: TypeRef,
        source: String,
        value: Option<Value>,
    },
}

impl Parameter {
    pub fn declared(&self) -> &TypeRef {
        match self {
            Parameter::Reference { declared, .. } | Parameter::Value { declared, .. } => declared,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Parameter::Reference { label, .. } => label,
            Parameter::Value { source, .. } => source,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstructionTarget {
    /// Constructor of the object under comparison, bound through the interface.
    Interface(SignatureId, Member),
    /// Helper type constructed directly.
    Direct(Member),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallTarget {
    Interface(SignatureId, Member),
    Runtime(Member),
    /// Receiver type only known at run time; looked up by name and arity then.
    Dynamic { name: String, arity: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum InvocationKind {
    Construction(ConstructionTarget),
    MemberCall { receiver: usize, target: CallTarget },
    Alias { source: usize },
    RawExpression { expression: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub index: usize,
    pub row: u32,
    pub operation: String,
    pub kind: InvocationKind,
    pub parameters: Vec<Parameter>,
    pub expected: Option<Parameter>,
    pub result_type: TypeRef,
    /// Type name, receiver label or expression shown next to the operation.
    pub target: Option<String>,
    pub line: Option<SourceLine>,
}

/// A sequence bound to one candidate, ready to execute any number of times.
#[derive(Clone, Debug)]
pub struct Invocations {
    name: String,
    binding: Arc<ResolvedBinding>,
    environment: TypeEnvironment,
    invocations: Vec<Invocation>,
}

impl Invocations {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &Arc<ResolvedBinding> {
        &self.binding
    }

    pub fn environment(&self) -> &TypeEnvironment {
        &self.environment
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    pub fn get(&self, index: usize) -> Option<&Invocation> {
        self.invocations.get(index)
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

enum Operation<'a> {
    Create,
    Eval(Option<&'a str>),
    Value,
    Call(&'a str),
}

/// Keywords are case-insensitive and may carry a `$` prefix; `#{..}` is inline eval.
fn classify(operation: &str) -> Operation<'_> {
    let trimmed = operation.trim();
    if let Some(inner) = trimmed
        .strip_prefix("#{")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        return Operation::Eval(Some(inner.trim()));
    }
    let word = trimmed.strip_prefix('$').unwrap_or(trimmed);
    match word.to_ascii_lowercase().as_str() {
        "create" => Operation::Create,
        "eval" => Operation::Eval(None),
        "value" => Operation::Value,
        _ => Operation::Call(word),
    }
}

pub struct InvocationBuilder<'e> {
    evaluator: &'e dyn Evaluator,
    registry: Arc<TypeRegistry>,
}

impl<'e> InvocationBuilder<'e> {
    pub fn new(evaluator: &'e dyn Evaluator, registry: Arc<TypeRegistry>) -> Self {
        Self {
            evaluator,
            registry,
        }
    }

    pub fn build(
        &self,
        sequence: &SequenceSpecification,
        binding: Arc<ResolvedBinding>,
    ) -> BuildResult<Invocations> {
        let span = debug_span!(
            "build",
            sequence = %sequence.name,
            candidate = binding.candidate.name()
        );
        let _enter = span.enter();

        let environment =
            TypeEnvironment::new(Arc::clone(&self.registry)).with_interface(Arc::clone(&binding));
        let mut context = BuildContext {
            evaluator: self.evaluator,
            sequence,
            binding: &binding,
            env: environment,
            slots: Vec::with_capacity(sequence.len()),
        };
        let mut invocations = Vec::with_capacity(sequence.len());
        for (index, statement) in sequence.statements.iter().enumerate() {
            let (invocation, cut) = context.statement(index, statement)?;
            trace!(index, operation = %invocation.operation, result = %invocation.result_type, "bound statement");
            context.env.observe(&invocation.result_type);
            context.slots.push(Slot {
                ty: invocation.result_type.clone(),
                cut,
            });
            invocations.push(invocation);
        }
        debug!(statements = invocations.len(), "bound sequence");

        let environment = context.env;
        Ok(Invocations {
            name: sequence.name.clone(),
            binding,
            environment,
            invocations,
        })
    }
}

/// Static knowledge about an earlier statement's result.
struct Slot {
    ty: TypeRef,
    /// Holds the object under comparison.
    cut: bool,
}

struct Bound {
    kind: InvocationKind,
    parameters: Vec<Parameter>,
    result_type: TypeRef,
    target: Option<String>,
    cut: bool,
}

struct BuildContext<'a> {
    evaluator: &'a dyn Evaluator,
    sequence: &'a SequenceSpecification,
    binding: &'a ResolvedBinding,
    env: TypeEnvironment,
    slots: Vec<Slot>,
}

impl<'a> BuildContext<'a> {
    fn statement(&mut self, index: usize, statement: &Statement) -> BuildResult<(Invocation, bool)> {
        let bound = match classify(&statement.operation) {
            Operation::Create => self.construction(index, statement)?,
            Operation::Eval(inline) => {
                let expression = match (inline, statement.inputs.first()) {
                    (Some(inline), _) => inline.to_string(),
                    (None, Some(input)) => input.clone(),
                    (None, None) => return Err(missing_input(index, statement)),
                };
                self.raw_expression(index, expression)?
            }
            Operation::Value => {
                let first = statement
                    .inputs
                    .first()
                    .ok_or_else(|| missing_input(index, statement))?;
                match self.reference(index, first)? {
                    Some(source) if statement.inputs.len() == 1 => Bound {
                        kind: InvocationKind::Alias { source },
                        parameters: Vec::new(),
                        result_type: self.slots[source].ty.clone(),
                        target: Some(first.trim().to_string()),
                        cut: self.slots[source].cut,
                    },
                    _ => self.raw_expression(index, first.clone())?,
                }
            }
            Operation::Call(name) => self.member_call(index, statement, name)?,
        };
        let expected = match &statement.expected {
            Some(text) => Some(self.parameter(index, text, Some(&bound.result_type))?),
            None => None,
        };
        let invocation = Invocation {
            index,
            row: statement.row,
            operation: statement.operation.trim().to_string(),
            kind: bound.kind,
            parameters: bound.parameters,
            expected,
            result_type: bound.result_type,
            target: bound.target,
            line: statement.line,
        };
        Ok((invocation, bound.cut))
    }

    fn construction(&mut self, index: usize, statement: &Statement) -> BuildResult<Bound> {
        let (type_name, args) = statement
            .inputs
            .split_first()
            .ok_or_else(|| missing_input(index, statement))?;
        let type_name = type_name.trim();
        let interface = Arc::clone(&self.binding.interface);

        if interface.declares_type(type_name) {
            let id = interface.constructor_for_arity(args.len()).ok_or_else(|| {
                BuildError::NoMatchingConstructor {
                    statement: index,
                    type_name: type_name.to_string(),
                    arity: args.len(),
                }
            })?;
            let member = self.binding.require(id, index)?.clone();
            let hints = self.declared_inputs(id);
            let parameters = self.parameters(index, args, &hints)?;
            return Ok(Bound {
                kind: InvocationKind::Construction(ConstructionTarget::Interface(id, member)),
                parameters,
                result_type: interface.class_type(),
                target: Some(type_name.to_string()),
                cut: true,
            });
        }

        let descriptor =
            self.env
                .resolve_type(type_name)
                .ok_or_else(|| BuildError::UnknownType {
                    statement: index,
                    name: type_name.to_string(),
                })?;
        let same_arity: Vec<Member> = descriptor
            .constructors()
            .iter()
            .filter(|ctor| ctor.arity() == args.len())
            .cloned()
            .collect();
        let (member, parameters) =
            self.bind_overload(index, same_arity, args)?
                .ok_or_else(|| BuildError::NoMatchingConstructor {
                    statement: index,
                    type_name: descriptor.name().to_string(),
                    arity: args.len(),
                })?;
        Ok(Bound {
            kind: InvocationKind::Construction(ConstructionTarget::Direct(member)),
            parameters,
            result_type: descriptor.type_ref(),
            target: Some(type_name.to_string()),
            cut: false,
        })
    }

    fn member_call(&mut self, index: usize, statement: &Statement, name: &str) -> BuildResult<Bound> {
        let malformed = |input: Option<&String>| BuildError::MalformedReceiver {
            statement: index,
            operation: name.to_string(),
            input: input.cloned(),
        };
        let (receiver_text, args) = statement
            .inputs
            .split_first()
            .ok_or_else(|| malformed(None))?;
        let receiver = self
            .reference(index, receiver_text)?
            .ok_or_else(|| malformed(Some(receiver_text)))?;
        let target_label = Some(receiver_text.trim().to_string());
        let unknown = |receiver: &str| BuildError::UnknownOperation {
            statement: index,
            operation: name.to_string(),
            receiver: receiver.to_string(),
            arity: args.len(),
        };

        if self.slots[receiver].cut {
            let interface = Arc::clone(&self.binding.interface);
            if let Some(id) = interface.method_for(name, args.len()) {
                let member = self.binding.require(id, index)?.clone();
                let hints = self.declared_inputs(id);
                let parameters = self.parameters(index, args, &hints)?;
                let result_type = interface
                    .descriptor(id)
                    .and_then(|descriptor| descriptor.output_type().ok())
                    .unwrap_or_else(TypeRef::object);
                let cut = matches!(&result_type, TypeRef::Class(class) if interface.declares_type(class));
                return Ok(Bound {
                    kind: InvocationKind::MemberCall {
                        receiver,
                        target: CallTarget::Interface(id, member),
                    },
                    parameters,
                    result_type,
                    target: target_label,
                    cut,
                });
            }
            let candidate = Arc::clone(&self.binding.candidate);
            let members: Vec<Member> = candidate.lookup(name, args.len()).cloned().collect();
            let (member, parameters) = self
                .bind_overload(index, members, args)?
                .ok_or_else(|| unknown(candidate.name()))?;
            let cut = member.returns == candidate.type_ref();
            return Ok(Bound {
                result_type: member.returns.clone(),
                kind: InvocationKind::MemberCall {
                    receiver,
                    target: CallTarget::Runtime(member),
                },
                parameters,
                target: target_label,
                cut,
            });
        }

        let static_type = self.slots[receiver].ty.clone();
        let descriptor = match &static_type {
            TypeRef::Class(_) if static_type.is_object() => None,
            TypeRef::Null => None,
            other => self.env.descriptor_for_type(other),
        };
        let Some(descriptor) = descriptor else {
            let parameters = self.parameters(index, args, &[])?;
            return Ok(Bound {
                kind: InvocationKind::MemberCall {
                    receiver,
                    target: CallTarget::Dynamic {
                        name: name.to_string(),
                        arity: args.len(),
                    },
                },
                parameters,
                result_type: TypeRef::object(),
                target: target_label,
                cut: false,
            });
        };
        let members: Vec<Member> = descriptor.lookup(name, args.len()).cloned().collect();
        let (member, parameters) = self
            .bind_overload(index, members, args)?
            .ok_or_else(|| unknown(&static_type.to_string()))?;
        Ok(Bound {
            result_type: member.returns.clone(),
            kind: InvocationKind::MemberCall {
                receiver,
                target: CallTarget::Runtime(member),
            },
            parameters,
            target: target_label,
            cut: false,
        })
    }

    fn raw_expression(&mut self, index: usize, expression: String) -> BuildResult<Bound> {
        let evaluated = self
            .evaluator
            .eval(&expression, None, &mut self.env)
            .map_err(|source| BuildError::Evaluation {
                statement: index,
                text: expression.clone(),
                source,
            })?;
        Ok(Bound {
            kind: InvocationKind::RawExpression {
                expression: expression.clone(),
            },
            parameters: Vec::new(),
            result_type: evaluated.ty,
            target: Some(expression),
            cut: false,
        })
    }

    /// A lone overload seeds literal evaluation with its parameter types; several are
    /// told apart by the evaluated argument types.
    fn bind_overload(
        &mut self,
        index: usize,
        members: Vec<Member>,
        args: &[String],
    ) -> BuildResult<Option<(Member, Vec<Parameter>)>> {
        if let [only] = members.as_slice() {
            let parameters = self.parameters(index, args, &only.params)?;
            let types = self.argument_types(&parameters);
            return Ok(only.accepts(&types).then(|| (only.clone(), parameters)));
        }
        let parameters = self.parameters(index, args, &[])?;
        let types = self.argument_types(&parameters);
        Ok(select(members.iter(), &types).map(|member| (member.clone(), parameters)))
    }

    fn argument_types(&self, parameters: &[Parameter]) -> Vec<TypeRef> {
        parameters
            .iter()
            .map(|parameter| self.env.localize(parameter.declared()))
            .collect()
    }

    fn declared_inputs(&self, id: SignatureId) -> Vec<TypeRef> {
        self.binding
            .interface
            .descriptor(id)
            .and_then(|descriptor| descriptor.input_types().ok())
            .unwrap_or_default()
    }

    fn parameters(
        &mut self,
        index: usize,
        texts: &[String],
        hints: &[TypeRef],
    ) -> BuildResult<Vec<Parameter>> {
        texts
            .iter()
            .enumerate()
            .map(|(position, text)| self.parameter(index, text, hints.get(position)))
            .collect()
    }

    fn parameter(
        &mut self,
        index: usize,
        text: &str,
        hint: Option<&TypeRef>,
    ) -> BuildResult<Parameter> {
        if let Some(source) = self.reference(index, text)? {
            return Ok(Parameter::Reference {
                index: source,
                label: text.trim().to_string(),
                declared: self.slots[source].ty.clone(),
            });
        }
        let evaluated = self
            .evaluator
            .eval(text, hint, &mut self.env)
            .map_err(|source| BuildError::Evaluation {
                statement: index,
                text: text.to_string(),
                source,
            })?;
        Ok(Parameter::Value {
            declared: evaluated.ty.normalized(),
            source: text.to_string(),
            value: Some(evaluated.value),
        })
    }

    /// Back-references only; forward, self and dangling references fail the build.
    fn reference(&self, index: usize, text: &str) -> BuildResult<Option<usize>> {
        match self.sequence.lookup_reference(text) {
            ReferenceLookup::Statement(source) if source < index => Ok(Some(source)),
            ReferenceLookup::Statement(_) => Err(BuildError::ForwardReference {
                statement: index,
                reference: text.trim().to_string(),
            }),
            ReferenceLookup::Dangling => Err(BuildError::DanglingReference {
                statement: index,
                reference: text.trim().to_string(),
            }),
            ReferenceLookup::NotAReference => Ok(None),
        }
    }
}

fn missing_input(index: usize, statement: &Statement) -> BuildError {
    BuildError::MissingInput {
        statement: index,
        operation: statement.operation.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::interface::{InterfaceSpecification, MethodDescriptor};
    use crate::language::types::Primitive;
    use crate::runtime::{eval::ExpressionEvaluator, registry::TypeDescriptor, resolver::SignatureResolver};

    fn binding() -> (Arc<TypeRegistry>, Arc<ResolvedBinding>) {
        let interface = Arc::new(InterfaceSpecification::new(
            "Stack",
            vec![MethodDescriptor::constructor(&[])],
            vec![
                MethodDescriptor::method("push", &["java.lang.Object"], "java.lang.Object"),
                MethodDescriptor::method("pop", &[], "java.lang.Object"),
                MethodDescriptor::method("reserve", &["short"], "void"),
            ],
        ));
        let candidate = Arc::new(
            TypeDescriptor::builder("VecStack")
                .constructor(&[], |_| Ok(Value::Null))
                .method("push", &["java.lang.Object"], "java.lang.Object", |_, a| Ok(a[0].clone()))
                .method("pop", &[], "java.lang.Object", |_, _| Ok(Value::Null))
                .method("reserve", &["short"], "void", |_, _| Ok(Value::Null))
                .method("snapshot", &[], "java.util.ArrayList", |_, _| Ok(Value::Null))
                .build()
                .unwrap(),
        );
        let registry = Arc::new(TypeRegistry::with_builtins().unwrap());
        let binding = Arc::new(SignatureResolver::resolve(&candidate, &interface));
        (registry, binding)
    }

    fn build(statements: Vec<Statement>) -> BuildResult<Invocations> {
        let (registry, binding) = binding();
        let sequence = statements
            .into_iter()
            .fold(SequenceSpecification::new("test"), |seq, st| seq.push(st));
        InvocationBuilder::new(&ExpressionEvaluator, registry).build(&sequence, binding)
    }

    #[test]
    fn operations_bind_to_their_kinds() {
        let built = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("push", &["A1", "1"]),
            Statement::new("$VALUE", &["A2"]),
            Statement::new("eval", &["Math.max(1, 2)"]),
            Statement::new("#{ 'x' + 1 }", &[]),
            Statement::new("create", &["java.util.ArrayList"]),
            Statement::new("add", &["$5", "A2"]),
        ])
        .unwrap();
        let kinds: Vec<_> = built.invocations().iter().map(|inv| &inv.kind).collect();
        assert!(matches!(
            kinds[0],
            InvocationKind::Construction(ConstructionTarget::Interface(..))
        ));
        assert!(matches!(
            kinds[1],
            InvocationKind::MemberCall { receiver: 0, target: CallTarget::Interface(..) }
        ));
        assert_eq!(kinds[2], &InvocationKind::Alias { source: 1 });
        assert!(matches!(kinds[3], InvocationKind::RawExpression { .. }));
        assert_eq!(
            kinds[4],
            &InvocationKind::RawExpression {
                expression: "'x' + 1".into()
            }
        );
        assert!(matches!(
            kinds[5],
            InvocationKind::Construction(ConstructionTarget::Direct(..))
        ));
        assert!(matches!(
            kinds[6],
            InvocationKind::MemberCall { receiver: 5, target: CallTarget::Runtime(..) }
        ));
        assert_eq!(built.get(3).unwrap().result_type, TypeRef::Primitive(Primitive::Int));

        let push = built.get(1).unwrap();
        assert_eq!(
            push.parameters,
            vec![
                Parameter::Reference {
                    index: 0,
                    label: "A1".into(),
                    declared: TypeRef::class("Stack"),
                },
                Parameter::Value {
                    declared: TypeRef::Primitive(Primitive::Int),
                    source: "1".into(),
                    value: Some(Value::Int(1)),
                },
            ]
        );
    }

    #[test]
    fn literals_are_seeded_with_the_declared_parameter_type() {
        let built = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("reserve", &["A1", "3"]),
        ])
        .unwrap();
        assert_eq!(
            built.get(1).unwrap().parameters[1].declared(),
            &TypeRef::Primitive(Primitive::Short)
        );
    }

    #[test]
    fn object_typed_receivers_are_looked_up_at_run_time() {
        let built = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("pop", &["A1"]),
            Statement::new("size", &["A2"]),
            Statement::new("snapshot", &["A1"]),
            Statement::new("size", &["A4"]),
        ])
        .unwrap();
        assert_eq!(
            built.get(2).unwrap().kind,
            InvocationKind::MemberCall {
                receiver: 1,
                target: CallTarget::Dynamic {
                    name: "size".into(),
                    arity: 0
                },
            }
        );
        assert!(matches!(
            built.get(3).unwrap().kind,
            InvocationKind::MemberCall { target: CallTarget::Runtime(..), .. }
        ));
        assert!(matches!(
            built.get(4).unwrap().kind,
            InvocationKind::MemberCall { target: CallTarget::Runtime(..), .. }
        ));
    }

    #[test]
    fn references_must_point_backwards() {
        let err = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("push", &["A1", "A3"]),
            Statement::new("pop", &["A1"]),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::ForwardReference { statement: 1, .. }));

        let err = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("push", &["A2", "1"]),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::ForwardReference { statement: 1, .. }));

        let err = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("pop", &["A7"]),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::DanglingReference { .. }));
    }

    #[test]
    fn malformed_statements_fail_the_build() {
        let err = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("push", &["'not a reference'", "1"]),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::MalformedReceiver { statement: 1, .. }));

        let err = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("peek", &["A1"]),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::UnknownOperation { statement: 1, .. }));

        let err = build(vec![Statement::new("create", &["Nowhere"])]).unwrap_err();
        assert!(matches!(err, BuildError::UnknownType { .. }));

        let err = build(vec![Statement::new("create", &["Stack", "1"])]).unwrap_err();
        assert!(matches!(err, BuildError::NoMatchingConstructor { .. }));

        let err = build(vec![Statement::new("eval", &["1 +"])]).unwrap_err();
        assert!(matches!(err, BuildError::Evaluation { statement: 0, .. }));

        let err = build(vec![Statement::new("create", &[])]).unwrap_err();
        assert!(matches!(err, BuildError::MissingInput { .. }));
    }

    #[test]
    fn oracles_are_typed_by_the_result() {
        let built = build(vec![
            Statement::new("create", &["Stack"]),
            Statement::new("push", &["A1", "1"]).expecting("1"),
            Statement::new("pop", &["A1"]).expecting("A2"),
        ])
        .unwrap();
        assert!(matches!(
            built.get(1).unwrap().expected,
            Some(Parameter::Value { .. })
        ));
        assert!(matches!(
            built.get(2).unwrap().expected,
            Some(Parameter::Reference { index: 1, .. })
        ));
    }
}
