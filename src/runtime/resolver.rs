use crate::language::{
    interface::{InterfaceSpecification, MethodDescriptor, SignatureId, SignatureKind},
    types::TypeRef,
};
use crate::runtime::{
    error::BuildError,
    registry::{select, Member, MemberKind, TypeDescriptor},
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Interface signatures mapped onto the members of one candidate type.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBinding {
    pub candidate: Arc<TypeDescriptor>,
    pub interface: Arc<InterfaceSpecification>,
    constructors: Vec<Option<Member>>,
    methods: Vec<Option<Member>>,
}

impl ResolvedBinding {
    pub fn member(&self, id: SignatureId) -> Option<&Member> {
        let slot = match id.kind {
            SignatureKind::Constructor => self.constructors.get(id.index),
            SignatureKind::Method => self.methods.get(id.index),
        };
        slot.and_then(Option::as_ref)
    }

    /// The bound member, or the fatal error for the statement that needs it.
    pub fn require(&self, id: SignatureId, statement: usize) -> Result<&Member, BuildError> {
        self.member(id).ok_or_else(|| BuildError::UnresolvedSignature {
            statement,
            signature: self
                .interface
                .descriptor(id)
                .map(|descriptor| self.describe(descriptor))
                .unwrap_or_else(|| format!("{id:?}")),
            candidate: self.candidate.name().to_string(),
        })
    }

    fn describe(&self, descriptor: &MethodDescriptor) -> String {
        if descriptor.constructor {
            format!("{}({})", self.interface.class_name, descriptor.inputs.join(","))
        } else {
            descriptor.to_string()
        }
    }

    pub fn unresolved(&self) -> Vec<SignatureId> {
        self.interface
            .signatures()
            .map(|(id, _)| id)
            .filter(|id| self.member(*id).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved().is_empty()
    }
}

/// Binds interface specifications to candidate types.
pub struct SignatureResolver;

impl SignatureResolver {
    pub fn resolve(
        candidate: &Arc<TypeDescriptor>,
        interface: &Arc<InterfaceSpecification>,
    ) -> ResolvedBinding {
        let constructors = interface
            .constructors
            .iter()
            .map(|declared| {
                let params = declared_params(declared, interface, candidate)?;
                let same_arity = candidate
                    .constructors()
                    .iter()
                    .filter(|ctor| ctor.arity() == params.len());
                select(same_arity, &params).cloned()
            })
            .collect();
        let methods = interface
            .methods
            .iter()
            .map(|declared| {
                let params = declared_params(declared, interface, candidate)?;
                candidate
                    .lookup(&declared.name, params.len())
                    .find(|method| {
                        method.kind == MemberKind::Method && method.matches_exactly(&params)
                    })
                    .cloned()
            })
            .collect();
        let binding = ResolvedBinding {
            candidate: Arc::clone(candidate),
            interface: Arc::clone(interface),
            constructors,
            methods,
        };
        debug!(
            candidate = candidate.name(),
            interface = %interface.class_name,
            unresolved = binding.unresolved().len(),
            "resolved interface signatures"
        );
        binding
    }
}

/// Declared input types, with the interface class standing for the candidate itself.
fn declared_params(
    declared: &MethodDescriptor,
    interface: &InterfaceSpecification,
    candidate: &TypeDescriptor,
) -> Option<Vec<TypeRef>> {
    let params = declared.input_types().ok()?;
    Some(
        params
            .into_iter()
            .map(|ty| localize(ty, interface, candidate))
            .collect(),
    )
}

fn localize(ty: TypeRef, interface: &InterfaceSpecification, candidate: &TypeDescriptor) -> TypeRef {
    match ty {
        TypeRef::Class(name) if interface.declares_type(&name) => candidate.type_ref(),
        TypeRef::Array(elem) => TypeRef::array_of(localize(*elem, interface, candidate)),
        other => other,
    }
}

/// Caller-owned cache of bindings keyed by candidate descriptor identity and
/// interface content. Candidates sharing a type name stay apart.
///
/// Each binding holds its descriptor, so a cached address is never reused.
#[derive(Default)]
pub struct ResolverCache {
    bindings: DashMap<(usize, u64), Arc<ResolvedBinding>>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(
        &self,
        candidate: &Arc<TypeDescriptor>,
        interface: &Arc<InterfaceSpecification>,
    ) -> Arc<ResolvedBinding> {
        let key = (Arc::as_ptr(candidate) as usize, interface.fingerprint());
        if let Some(found) = self.bindings.get(&key) {
            return Arc::clone(found.value());
        }
        let resolved = Arc::new(SignatureResolver::resolve(candidate, interface));
        Arc::clone(self.bindings.entry(key).or_insert(resolved).value())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&self) {
        self.bindings.clear();
    }
}
