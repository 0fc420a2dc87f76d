use crate::language::{
    errors::TypeParseError,
    types::{canonical_class_name, TypeRef, STRING},
};
use crate::runtime::{
    builtins::register_builtins,
    error::{Fault, InvokeResult},
    value::Value,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pseudo-type that hosts the members callable on array values.
pub const ARRAY_TYPE: &str = "<array>";

pub type Invoke = Arc<dyn Fn(&Value, &[Value]) -> InvokeResult + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MemberKind {
    Constructor,
    Method,
    Static,
}

/// One introspected callable of a type.
#[derive(Clone)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
    pub declaring_type: String,
    pub params: Vec<TypeRef>,
    pub returns: TypeRef,
    pub ordinal: usize,
    invoke: Invoke,
}

impl Member {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == MemberKind::Constructor
    }

    pub fn call(&self, receiver: &Value, args: &[Value]) -> InvokeResult {
        if args.len() != self.arity() {
            return Err(Fault::illegal_argument(format!(
                "{} expects {} argument(s), got {}",
                self.signature(),
                self.arity(),
                args.len()
            )));
        }
        (self.invoke)(receiver, args)
    }

    /// Positional assignability of the given argument types.
    pub fn accepts(&self, args: &[TypeRef]) -> bool {
        args.len() == self.arity()
            && args
                .iter()
                .zip(&self.params)
                .all(|(arg, param)| arg.is_assignable_to(param))
    }

    pub fn matches_exactly(&self, params: &[TypeRef]) -> bool {
        params.len() == self.arity()
            && params
                .iter()
                .zip(&self.params)
                .all(|(a, b)| a.normalized() == b.normalized())
    }

    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        match self.kind {
            MemberKind::Constructor => format!("{}({params})", self.declaring_type),
            _ => format!(
                "{}.{}({params})->{}",
                self.declaring_type, self.name, self.returns
            ),
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.declaring_type == other.declaring_type
            && self.params == other.params
            && self.returns == other.returns
            && self.ordinal == other.ordinal
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({})", self.signature())
    }
}

/// Picks the member for the given argument types: exact matches first, then the
/// first assignable one in declaration order.
pub fn select<'m>(
    members: impl IntoIterator<Item = &'m Member>,
    args: &[TypeRef],
) -> Option<&'m Member> {
    let mut fallback = None;
    for member in members {
        if member.matches_exactly(args) {
            return Some(member);
        }
        if fallback.is_none() && member.accepts(args) {
            fallback = Some(member);
        }
    }
    fallback
}

/// Introspection registry for one type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDescriptor {
    name: String,
    constructors: Vec<Member>,
    methods: Vec<Member>,
    index: HashMap<(String, usize), Vec<usize>>,
}

impl TypeDescriptor {
    pub fn builder(name: impl AsRef<str>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            name: canonical_class_name(name.as_ref()),
            constructors: Vec::new(),
            methods: Vec::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::class(&self.name)
    }

    pub fn constructors(&self) -> &[Member] {
        &self.constructors
    }

    pub fn methods(&self) -> &[Member] {
        &self.methods
    }

    /// Methods (instance and static) named `name` taking `arity` arguments, in declaration order.
    pub fn lookup(&self, name: &str, arity: usize) -> impl Iterator<Item = &Member> + '_ {
        self.index
            .get(&(name.to_string(), arity))
            .into_iter()
            .flatten()
            .map(move |&idx| &self.methods[idx])
    }

    pub fn find_method(&self, name: &str, args: &[TypeRef]) -> Option<&Member> {
        select(self.lookup(name, args.len()), args)
    }

    pub fn find_constructor(&self, args: &[TypeRef]) -> Option<&Member> {
        select(
            self.constructors.iter().filter(|c| c.arity() == args.len()),
            args,
        )
    }
}

pub struct TypeDescriptorBuilder {
    name: String,
    constructors: Vec<Member>,
    methods: Vec<Member>,
    error: Option<TypeParseError>,
}

impl TypeDescriptorBuilder {
    fn parse_all(&mut self, names: &[&str]) -> Vec<TypeRef> {
        names.iter().map(|name| self.parse(name)).collect()
    }

    fn parse(&mut self, name: &str) -> TypeRef {
        TypeRef::parse(name).unwrap_or_else(|err| {
            self.error.get_or_insert(err);
            TypeRef::object()
        })
    }

    pub fn constructor<F>(mut self, params: &[&str], f: F) -> Self
    where
        F: Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        let params = self.parse_all(params);
        self.constructors.push(Member {
            kind: MemberKind::Constructor,
            name: self.name.clone(),
            declaring_type: self.name.clone(),
            params,
            returns: TypeRef::class(&self.name),
            ordinal: self.constructors.len(),
            invoke: Arc::new(move |_: &Value, args: &[Value]| f(args)),
        });
        self
    }

    pub fn method<F>(mut self, name: &str, params: &[&str], returns: &str, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        let params = self.parse_all(params);
        let returns = self.parse(returns);
        self.push_method(MemberKind::Method, name, params, returns, Arc::new(f));
        self
    }

    pub fn static_method<F>(mut self, name: &str, params: &[&str], returns: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        let params = self.parse_all(params);
        let returns = self.parse(returns);
        self.push_method(
            MemberKind::Static,
            name,
            params,
            returns,
            Arc::new(move |_: &Value, args: &[Value]| f(args)),
        );
        self
    }

    fn push_method(
        &mut self,
        kind: MemberKind,
        name: &str,
        params: Vec<TypeRef>,
        returns: TypeRef,
        invoke: Invoke,
    ) {
        self.methods.push(Member {
            kind,
            name: name.to_string(),
            declaring_type: self.name.clone(),
            params,
            returns,
            ordinal: self.methods.len(),
            invoke,
        });
    }

    pub fn build(self) -> Result<TypeDescriptor, TypeParseError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut index: HashMap<(String, usize), Vec<usize>> = HashMap::new();
        for (idx, method) in self.methods.iter().enumerate() {
            index
                .entry((method.name.clone(), method.arity()))
                .or_default()
                .push(idx);
        }
        Ok(TypeDescriptor {
            name: self.name,
            constructors: self.constructors,
            methods: self.methods,
            index,
        })
    }
}

/// Named, aliased type descriptors shared by every run.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDescriptor>>,
    aliases: HashMap<String, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the helper types sequences may create and call.
    pub fn with_builtins() -> Result<Self, TypeParseError> {
        let mut registry = Self::new();
        register_builtins(&mut registry)?;
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.types
            .insert(descriptor.name().to_string(), Arc::clone(&descriptor));
        descriptor
    }

    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases
            .insert(canonical_class_name(alias), canonical_class_name(target));
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        let name = canonical_class_name(name.trim());
        let name = self.aliases.get(&name).unwrap_or(&name);
        self.types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Descriptor for a static type; arrays map to the array pseudo-type.
    pub fn descriptor_for_type(&self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>> {
        match ty {
            TypeRef::Array(_) => self.get(ARRAY_TYPE),
            TypeRef::Class(name) => self.get(name),
            _ => None,
        }
    }

    pub fn descriptor_for_value(&self, value: &Value) -> Option<Arc<TypeDescriptor>> {
        match value {
            Value::String(_) => self.get(STRING),
            Value::Array(_) => self.get(ARRAY_TYPE),
            Value::Object(object) => self.get(&object.class),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::types::Primitive;

    fn counter() -> TypeDescriptor {
        TypeDescriptor::builder("Counter")
            .constructor(&[], |_| Ok(Value::Int(0)))
            .constructor(&["long"], |args| Ok(args[0].clone()))
            .method("add", &["int"], "int", |_, args| Ok(args[0].clone()))
            .method("add", &["java.lang.Object"], "int", |_, _| Ok(Value::Int(-1)))
            .static_method("zero", &[], "int", |_| Ok(Value::Int(0)))
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_is_keyed_by_name_and_arity() {
        let counter = counter();
        assert_eq!(counter.lookup("add", 1).count(), 2);
        assert_eq!(counter.lookup("add", 2).count(), 0);
        assert_eq!(counter.lookup("zero", 0).next().unwrap().kind, MemberKind::Static);
    }

    #[test]
    fn selection_prefers_exact_then_declaration_order() {
        let counter = counter();
        let int = TypeRef::Primitive(Primitive::Int);
        let exact = counter.find_method("add", &[int.clone()]).unwrap();
        assert_eq!(exact.ordinal, 0);
        let short = TypeRef::Primitive(Primitive::Short);
        assert_eq!(counter.find_method("add", &[short]).unwrap().ordinal, 0);
        let object = counter.find_method("add", &[TypeRef::string()]).unwrap();
        assert_eq!(object.ordinal, 1);
        let ctor = counter.find_constructor(&[int]).unwrap();
        assert_eq!(ctor.signature(), "Counter(long)");
    }

    #[test]
    fn arity_is_checked_on_call() {
        let counter = counter();
        let add = counter.lookup("add", 1).next().unwrap();
        assert_eq!(add.call(&Value::Null, &[Value::Int(4)]).unwrap(), Value::Int(4));
        assert!(add.call(&Value::Null, &[]).is_err());
    }

    #[test]
    fn bad_type_names_fail_the_build() {
        let err = TypeDescriptor::builder("Broken")
            .method("f", &["int["], "void", |_, _| Ok(Value::Null))
            .build()
            .unwrap_err();
        assert_eq!(err.text, "int[");
    }

    #[test]
    fn registry_resolves_aliases_and_short_names() {
        let mut registry = TypeRegistry::new();
        registry.register(counter());
        registry.alias("Tally", "Counter");
        assert!(registry.get("Counter").is_some());
        assert_eq!(registry.get("Tally").unwrap().name(), "Counter");
        assert!(registry.get("Missing").is_none());
    }
}
