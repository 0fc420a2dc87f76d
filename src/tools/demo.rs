//! Two small stack implementations that disagree on popping an empty stack.
//! The CLI compares them; the scenario tests drive them too.

use crate::language::{errors::TypeParseError, interface::InterfaceSpecification};
use crate::runtime::{
    adapter::AdaptedCandidate,
    builtins::{int_arg, this_object},
    error::Fault,
    registry::TypeDescriptor,
    value::{ObjectRef, Value},
};
use std::sync::Arc;

pub const LIST_STACK: &str = "org.arena.demo.ListStack";
pub const LINKED_STACK: &str = "org.arena.demo.LinkedStack";

pub const STACK_INTERFACE_JSON: &str = r#"{
  "className": "Stack",
  "constructors": [{ "name": "<init>", "inputs": [], "output": "void", "constructor": true }],
  "methods": [
    { "name": "push", "inputs": ["java.lang.Object"], "output": "java.lang.Object" },
    { "name": "pop", "inputs": [], "output": "java.lang.Object" },
    { "name": "peek", "inputs": [], "output": "java.lang.Object" },
    { "name": "isEmpty", "inputs": [], "output": "boolean" },
    { "name": "size", "inputs": [], "output": "int" }
  ]
}"#;

pub fn stack_interface() -> Arc<InterfaceSpecification> {
    use crate::language::interface::MethodDescriptor;
    Arc::new(InterfaceSpecification::new(
        "Stack",
        vec![MethodDescriptor::constructor(&[])],
        vec![
            MethodDescriptor::method("push", &["java.lang.Object"], "java.lang.Object"),
            MethodDescriptor::method("pop", &[], "java.lang.Object"),
            MethodDescriptor::method("peek", &[], "java.lang.Object"),
            MethodDescriptor::method("isEmpty", &[], "boolean"),
            MethodDescriptor::method("size", &[], "int"),
        ],
    ))
}

fn empty_stack() -> Fault {
    Fault::new("java.util.EmptyStackException", "")
}

fn items<R>(this: &Value, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, Fault> {
    this_object(this)?.with_state::<Vec<Value>, _>(f)
}

/// Vector-backed; popping or peeking an empty stack throws.
pub fn list_stack() -> Result<TypeDescriptor, TypeParseError> {
    let new = || Value::Object(ObjectRef::new(LIST_STACK, Vec::<Value>::new()));
    TypeDescriptor::builder(LIST_STACK)
        .constructor(&[], move |_| Ok(new()))
        .constructor(&["int"], move |args| {
            let capacity = int_arg(args, 0)?;
            let capacity = usize::try_from(capacity)
                .map_err(|_| Fault::illegal_argument(format!("Illegal Capacity: {capacity}")))?;
            Ok(Value::Object(ObjectRef::new(
                LIST_STACK,
                Vec::<Value>::with_capacity(capacity),
            )))
        })
        .method("push", &["java.lang.Object"], "java.lang.Object", |this, args| {
            items(this, |items| items.push(args[0].clone()))?;
            Ok(args[0].clone())
        })
        .method("pop", &[], "java.lang.Object", |this, _| {
            items(this, Vec::pop)?.ok_or_else(empty_stack)
        })
        .method("peek", &[], "java.lang.Object", |this, _| {
            items(this, |items| items.last().cloned())?.ok_or_else(empty_stack)
        })
        .method("isEmpty", &[], "boolean", |this, _| {
            Ok(Value::Bool(items(this, |items| items.is_empty())?))
        })
        .method("size", &[], "int", |this, _| {
            Ok(Value::Int(items(this, |items| items.len() as i32)?))
        })
        .method("search", &["java.lang.Object"], "int", |this, args| {
            let needle = &args[0];
            items(this, |items| {
                items
                    .iter()
                    .rev()
                    .position(|item| item.loosely_equals(needle))
                    .map_or(-1, |depth| depth as i32 + 1)
            })
            .map(Value::Int)
        })
        .build()
}

struct Node {
    value: Value,
    next: Option<Box<Node>>,
}

#[derive(Default)]
struct Linked {
    head: Option<Box<Node>>,
    len: usize,
}

impl Linked {
    fn push(&mut self, value: Value) {
        let next = self.head.take();
        self.head = Some(Box::new(Node { value, next }));
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Value> {
        let node = self.head.take()?;
        self.head = node.next;
        self.len -= 1;
        Some(node.value)
    }
}

fn linked<R>(this: &Value, f: impl FnOnce(&mut Linked) -> R) -> Result<R, Fault> {
    this_object(this)?.with_state::<Linked, _>(f)
}

/// Singly linked; popping or peeking an empty stack yields `null`.
pub fn linked_stack() -> Result<TypeDescriptor, TypeParseError> {
    TypeDescriptor::builder(LINKED_STACK)
        .constructor(&[], |_| {
            Ok(Value::Object(ObjectRef::new(LINKED_STACK, Linked::default())))
        })
        .method("push", &["java.lang.Object"], "java.lang.Object", |this, args| {
            linked(this, |stack| stack.push(args[0].clone()))?;
            Ok(args[0].clone())
        })
        .method("pop", &[], "java.lang.Object", |this, _| {
            Ok(linked(this, Linked::pop)?.unwrap_or(Value::Null))
        })
        .method("peek", &[], "java.lang.Object", |this, _| {
            let top = linked(this, |stack| stack.head.as_ref().map(|node| node.value.clone()))?;
            Ok(top.unwrap_or(Value::Null))
        })
        .method("isEmpty", &[], "boolean", |this, _| {
            Ok(Value::Bool(linked(this, |stack| stack.head.is_none())?))
        })
        .method("size", &[], "int", |this, _| {
            Ok(Value::Int(linked(this, |stack| stack.len as i32)?))
        })
        .build()
}

/// Both stacks behind the direct adapter.
pub fn candidates() -> Result<Vec<AdaptedCandidate>, TypeParseError> {
    Ok(vec![
        AdaptedCandidate::direct(Arc::new(list_stack()?)),
        AdaptedCandidate::direct(Arc::new(linked_stack()?)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_json_document_matches_the_built_interface() {
        let parsed = InterfaceSpecification::from_json(STACK_INTERFACE_JSON).unwrap();
        assert_eq!(parsed, *stack_interface());
    }

    #[test]
    fn stacks_differ_only_when_empty() {
        let list = list_stack().unwrap();
        let linked = linked_stack().unwrap();
        for descriptor in [&list, &linked] {
            let stack = descriptor.constructors()[0].call(&Value::Null, &[]).unwrap();
            let push = descriptor.lookup("push", 1).next().unwrap();
            let pop = descriptor.lookup("pop", 0).next().unwrap();
            push.call(&stack, &[Value::Int(1)]).unwrap();
            push.call(&stack, &[Value::Int(2)]).unwrap();
            assert_eq!(pop.call(&stack, &[]), Ok(Value::Int(2)));
            assert_eq!(pop.call(&stack, &[]), Ok(Value::Int(1)));
        }

        let stack = linked.constructors()[0].call(&Value::Null, &[]).unwrap();
        let pop = linked.lookup("pop", 0).next().unwrap();
        assert_eq!(pop.call(&stack, &[]), Ok(Value::Null));

        let stack = list.constructors()[0].call(&Value::Null, &[]).unwrap();
        let pop = list.lookup("pop", 0).next().unwrap();
        assert_eq!(pop.call(&stack, &[]).unwrap_err().kind, "java.util.EmptyStackException");
    }
}
