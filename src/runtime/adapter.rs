use crate::language::interface::SignatureId;
use crate::runtime::{
    error::InvokeResult,
    registry::{Member, TypeDescriptor},
    value::Value,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Indirection between interface-level calls and the candidate's own members.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, signature: SignatureId) -> bool;

    fn construct(&self, signature: SignatureId, member: &Member, args: &[Value]) -> InvokeResult;

    fn invoke(
        &self,
        signature: SignatureId,
        member: &Member,
        receiver: &Value,
        args: &[Value],
    ) -> InvokeResult;
}

/// Calls bound members as they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectAdapter;

impl Adapter for DirectAdapter {
    fn name(&self) -> &str {
        "direct"
    }

    fn supports(&self, _signature: SignatureId) -> bool {
        true
    }

    fn construct(&self, _signature: SignatureId, member: &Member, args: &[Value]) -> InvokeResult {
        member.call(&Value::Null, args)
    }

    fn invoke(
        &self,
        _signature: SignatureId,
        member: &Member,
        receiver: &Value,
        args: &[Value],
    ) -> InvokeResult {
        member.call(receiver, args)
    }
}

/// Direct dispatch that refuses a fixed set of signatures.
#[derive(Clone, Debug, Default)]
pub struct RestrictedAdapter {
    refused: BTreeSet<SignatureId>,
}

impl RestrictedAdapter {
    pub fn refusing(signatures: impl IntoIterator<Item = SignatureId>) -> Self {
        Self {
            refused: signatures.into_iter().collect(),
        }
    }
}

impl Adapter for RestrictedAdapter {
    fn name(&self) -> &str {
        "restricted"
    }

    fn supports(&self, signature: SignatureId) -> bool {
        !self.refused.contains(&signature)
    }

    fn construct(&self, signature: SignatureId, member: &Member, args: &[Value]) -> InvokeResult {
        DirectAdapter.construct(signature, member, args)
    }

    fn invoke(
        &self,
        signature: SignatureId,
        member: &Member,
        receiver: &Value,
        args: &[Value],
    ) -> InvokeResult {
        DirectAdapter.invoke(signature, member, receiver, args)
    }
}

/// A candidate type as the engine sees it: its members and how to reach them.
#[derive(Clone)]
pub struct AdaptedCandidate {
    pub name: String,
    pub candidate: Arc<TypeDescriptor>,
    pub adapter: Arc<dyn Adapter>,
}

impl AdaptedCandidate {
    pub fn new(candidate: Arc<TypeDescriptor>, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            name: candidate.name().to_string(),
            candidate,
            adapter,
        }
    }

    pub fn direct(candidate: Arc<TypeDescriptor>) -> Self {
        Self::new(candidate, Arc::new(DirectAdapter))
    }
}

impl fmt::Debug for AdaptedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptedCandidate")
            .field("name", &self.name)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_adapter_refuses_listed_signatures() {
        let adapter = RestrictedAdapter::refusing([SignatureId::method(1)]);
        assert!(adapter.supports(SignatureId::method(0)));
        assert!(!adapter.supports(SignatureId::method(1)));
        assert!(DirectAdapter.supports(SignatureId::method(1)));
    }

    #[test]
    fn direct_candidates_take_the_type_name() {
        let descriptor = Arc::new(
            TypeDescriptor::builder("Counter")
                .constructor(&[], |_| Ok(Value::Int(0)))
                .build()
                .unwrap(),
        );
        let adapted = AdaptedCandidate::direct(Arc::clone(&descriptor));
        assert_eq!(adapted.name, "Counter");
        let ctor = &descriptor.constructors()[0];
        assert_eq!(
            adapted.adapter.construct(SignatureId::constructor(0), ctor, &[]),
            Ok(Value::Int(0))
        );
        assert!(format!("{adapted:?}").contains("direct"));
    }
}
