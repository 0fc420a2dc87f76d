use crate::language::types::TypeRef;
use crate::runtime::{
    registry::{TypeDescriptor, TypeRegistry},
    resolver::ResolvedBinding,
    value::Value,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Types visible to the evaluator: the shared registry, the interface shape bound
/// to the current candidate, and every type that showed up while interpreting.
#[derive(Clone, Debug)]
pub struct TypeEnvironment {
    registry: Arc<TypeRegistry>,
    interface: Option<Arc<ResolvedBinding>>,
    seen: BTreeSet<String>,
}

impl TypeEnvironment {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            interface: None,
            seen: BTreeSet::new(),
        }
    }

    pub fn with_interface(mut self, binding: Arc<ResolvedBinding>) -> Self {
        self.seen.insert(binding.candidate.name().to_string());
        self.interface = Some(binding);
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn binding(&self) -> Option<&Arc<ResolvedBinding>> {
        self.interface.as_ref()
    }

    /// Records a type so later lookups by simple name find it.
    pub fn observe(&mut self, ty: &TypeRef) {
        match ty {
            TypeRef::Class(name) => {
                self.seen.insert(name.clone());
            }
            TypeRef::Array(elem) => self.observe(elem),
            _ => {}
        }
    }

    pub fn seen(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// Resolves a type name. The interface's declared class name denotes the candidate.
    pub fn resolve_type(&mut self, name: &str) -> Option<Arc<TypeDescriptor>> {
        let name = name.trim();
        if let Some(binding) = &self.interface {
            if binding.interface.declares_type(name) || binding.candidate.name() == name {
                return Some(Arc::clone(&binding.candidate));
            }
        }
        let found = self.registry.get(name).or_else(|| {
            self.seen
                .iter()
                .find(|seen| simple_name(seen) == name)
                .and_then(|seen| self.lookup_seen(seen))
        })?;
        self.seen.insert(found.name().to_string());
        Some(found)
    }

    fn lookup_seen(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        match &self.interface {
            Some(binding) if binding.candidate.name() == name => {
                Some(Arc::clone(&binding.candidate))
            }
            _ => self.registry.get(name),
        }
    }

    /// Descriptor for a static type, mapping the interface type onto the candidate.
    pub fn descriptor_for_type(&mut self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>> {
        match ty {
            TypeRef::Class(name) => self.resolve_type(name),
            other => self.registry.descriptor_for_type(other),
        }
    }

    /// Descriptor for a runtime value; instances of the candidate map to the candidate.
    pub fn descriptor_for_value(&self, value: &Value) -> Option<Arc<TypeDescriptor>> {
        if let (Value::Object(object), Some(binding)) = (value, &self.interface) {
            if object.class == binding.candidate.name() {
                return Some(Arc::clone(&binding.candidate));
            }
        }
        self.registry.descriptor_for_value(value)
    }

    /// Rewrites the interface class name to the candidate's own type.
    pub fn localize(&self, ty: &TypeRef) -> TypeRef {
        match (ty, &self.interface) {
            (TypeRef::Class(name), Some(binding)) if binding.interface.declares_type(name) => {
                binding.candidate.type_ref()
            }
            (TypeRef::Array(elem), _) => TypeRef::array_of(self.localize(elem)),
            (other, _) => other.clone(),
        }
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
