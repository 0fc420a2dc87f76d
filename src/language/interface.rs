use crate::language::{
    errors::{InterfaceError, TypeParseError},
    types::{canonical_class_name, TypeRef},
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const CONSTRUCTOR_NAME: &str = "<init>";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default = "void_output")]
    pub output: String,
    #[serde(default)]
    pub constructor: bool,
}

fn void_output() -> String {
    "void".to_string()
}

impl MethodDescriptor {
    pub fn method(name: impl Into<String>, inputs: &[&str], output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.into(),
            constructor: false,
        }
    }

    pub fn constructor(inputs: &[&str]) -> Self {
        Self {
            name: CONSTRUCTOR_NAME.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: void_output(),
            constructor: true,
        }
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_types(&self) -> Result<Vec<TypeRef>, TypeParseError> {
        self.inputs.iter().map(|input| TypeRef::parse(input)).collect()
    }

    pub fn output_type(&self) -> Result<TypeRef, TypeParseError> {
        TypeRef::parse(&self.output)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.inputs.join(","))?;
        if !self.constructor {
            write!(f, "->{}", self.output)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignatureKind {
    Constructor,
    Method,
}

/// Position of a descriptor inside its interface specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignatureId {
    pub kind: SignatureKind,
    pub index: usize,
}

impl SignatureId {
    pub fn constructor(index: usize) -> Self {
        Self {
            kind: SignatureKind::Constructor,
            index,
        }
    }

    pub fn method(index: usize) -> Self {
        Self {
            kind: SignatureKind::Method,
            index,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSpecification {
    pub class_name: String,
    #[serde(default)]
    pub constructors: Vec<MethodDescriptor>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceSpecification {
    pub fn new(
        class_name: impl Into<String>,
        constructors: Vec<MethodDescriptor>,
        methods: Vec<MethodDescriptor>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            constructors,
            methods,
        }
        .normalize()
    }

    pub fn from_json(text: &str) -> Result<Self, InterfaceError> {
        let spec: InterfaceSpecification = serde_json::from_str(text)?;
        let spec = spec.normalize();
        spec.validate()?;
        Ok(spec)
    }

    /// Moves constructor-flagged methods over and adds the implicit no-arg constructor.
    pub fn normalize(mut self) -> Self {
        let (ctors, methods): (Vec<_>, Vec<_>) = self
            .methods
            .into_iter()
            .partition(|method| method.constructor);
        self.methods = methods;
        for mut ctor in ctors {
            ctor.name = CONSTRUCTOR_NAME.to_string();
            self.constructors.push(ctor);
        }
        for ctor in &mut self.constructors {
            ctor.constructor = true;
        }
        if self.constructors.is_empty() {
            self.constructors.push(MethodDescriptor::constructor(&[]));
        }
        self
    }

    pub fn validate(&self) -> Result<(), InterfaceError> {
        for (_, descriptor) in self.signatures() {
            let check = descriptor
                .input_types()
                .and_then(|_| descriptor.output_type().map(|_| ()));
            if let Err(source) = check {
                return Err(InterfaceError::Type {
                    descriptor: descriptor.to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Content hash, stable for equal specifications within one process.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn class_type(&self) -> TypeRef {
        TypeRef::class(&self.class_name)
    }

    pub fn declares_type(&self, name: &str) -> bool {
        canonical_class_name(name) == canonical_class_name(&self.class_name)
    }

    pub fn descriptor(&self, id: SignatureId) -> Option<&MethodDescriptor> {
        match id.kind {
            SignatureKind::Constructor => self.constructors.get(id.index),
            SignatureKind::Method => self.methods.get(id.index),
        }
    }

    pub fn signatures(&self) -> impl Iterator<Item = (SignatureId, &MethodDescriptor)> {
        let ctors = self
            .constructors
            .iter()
            .enumerate()
            .map(|(index, d)| (SignatureId::constructor(index), d));
        let methods = self
            .methods
            .iter()
            .enumerate()
            .map(|(index, d)| (SignatureId::method(index), d));
        ctors.chain(methods)
    }

    /// First declared constructor taking `arity` inputs.
    pub fn constructor_for_arity(&self, arity: usize) -> Option<SignatureId> {
        self.constructors
            .iter()
            .position(|ctor| ctor.arity() == arity)
            .map(SignatureId::constructor)
    }

    /// First declared method named `name` taking `arity` inputs.
    pub fn method_for(&self, name: &str, arity: usize) -> Option<SignatureId> {
        self.methods
            .iter()
            .position(|method| method.name == name && method.arity() == arity)
            .map(SignatureId::method)
    }
}

impl fmt::Display for InterfaceSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.class_name)?;
        for ctor in &self.constructors {
            writeln!(f, "    {}({})", self.class_name, ctor.inputs.join(","))?;
        }
        for method in &self.methods {
            writeln!(f, "    {method}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_document_is_normalized() {
        let spec = InterfaceSpecification::from_json(
            r#"{
                "className": "Stack",
                "methods": [
                    {"name": "Stack", "inputs": ["int"], "constructor": true},
                    {"name": "push", "inputs": ["java.lang.Object"], "output": "java.lang.Object"},
                    {"name": "size", "output": "int"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.constructors.len(), 1);
        assert_eq!(spec.constructors[0].name, CONSTRUCTOR_NAME);
        assert_eq!(spec.methods.len(), 2);
        assert_eq!(spec.method_for("push", 1), Some(SignatureId::method(0)));
        assert_eq!(spec.method_for("push", 2), None);
        assert_eq!(spec.constructor_for_arity(1), Some(SignatureId::constructor(0)));
    }

    #[test]
    fn missing_constructor_gets_a_default_one() {
        let spec = InterfaceSpecification::new(
            "Stack",
            Vec::new(),
            vec![MethodDescriptor::method("pop", &[], "Object")],
        );
        assert_eq!(spec.constructors, vec![MethodDescriptor::constructor(&[])]);
        assert_eq!(spec.constructor_for_arity(0), Some(SignatureId::constructor(0)));
    }

    #[test]
    fn invalid_type_names_are_rejected() {
        let err = InterfaceSpecification::from_json(
            r#"{"className": "Stack", "methods": [{"name": "push", "inputs": ["int["]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("push(int[)"));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = InterfaceSpecification::new("Stack", Vec::new(), Vec::new());
        let b = InterfaceSpecification::new("Stack", Vec::new(), Vec::new());
        let c = InterfaceSpecification::new("Queue", Vec::new(), Vec::new());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
