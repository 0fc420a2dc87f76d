use crate::language::{errors::TypeParseError, types::OBJECT};
use crate::runtime::{
    error::{Fault, InvokeResult},
    registry::{TypeDescriptor, TypeRegistry, ARRAY_TYPE},
    value::{ArrayValue, ObjectRef, Value},
};
use rand::Rng;

pub const ARRAY_LIST: &str = "java.util.ArrayList";
pub const MATH: &str = "java.lang.Math";

/// Integral argument at `idx`.
pub fn int_arg(args: &[Value], idx: usize) -> Result<i64, Fault> {
    args.get(idx)
        .and_then(Value::as_i64)
        .ok_or_else(|| Fault::illegal_argument(format!("argument {idx} must be integral")))
}

pub fn float_arg(args: &[Value], idx: usize) -> Result<f64, Fault> {
    args.get(idx)
        .and_then(Value::as_f64)
        .ok_or_else(|| Fault::illegal_argument(format!("argument {idx} must be numeric")))
}

fn this_string(this: &Value) -> Result<&str, Fault> {
    this.as_str()
        .ok_or_else(|| Fault::null_pointer("receiver is not a string"))
}

pub(crate) fn this_object(this: &Value) -> Result<&ObjectRef, Fault> {
    match this {
        Value::Object(object) => Ok(object),
        Value::Null => Err(Fault::null_pointer("receiver is null")),
        other => Err(Fault::new(
            "java.lang.ClassCastException",
            format!("{} is not an object", other.runtime_type()),
        )),
    }
}

fn list_state<R>(this: &Value, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, Fault> {
    this_object(this)?.with_state::<Vec<Value>, _>(f)
}

fn list_index(items: &[Value], index: i64) -> Result<usize, Fault> {
    usize::try_from(index)
        .ok()
        .filter(|idx| *idx < items.len())
        .ok_or_else(|| Fault::index_out_of_bounds(index, items.len()))
}

fn array_arg(this: &Value) -> Result<&ArrayValue, Fault> {
    match this {
        Value::Array(array) => Ok(array),
        _ => Err(Fault::null_pointer("receiver is not an array")),
    }
}

pub fn register_builtins(registry: &mut TypeRegistry) -> Result<(), TypeParseError> {
    registry.register(object_type()?);
    registry.register(string_type()?);
    registry.register(array_list_type()?);
    registry.register(math_type()?);
    registry.register(array_type()?);
    for alias in ["java.util.List", "List", "ArrayList"] {
        registry.alias(alias, ARRAY_LIST);
    }
    Ok(())
}

fn object_type() -> Result<TypeDescriptor, TypeParseError> {
    TypeDescriptor::builder(OBJECT)
        .constructor(&[], |_| Ok(Value::Object(ObjectRef::new(OBJECT, ()))))
        .method("hashCode", &[], "int", |this, _| {
            let object = this_object(this)?;
            Ok(Value::Int(object.identity_hash() as i32))
        })
        .method("toString", &[], "String", |this, _| {
            Ok(Value::string(this.to_string()))
        })
        .method("equals", &["Object"], "boolean", |this, args| {
            Ok(Value::Bool(*this == args[0]))
        })
        .build()
}

fn string_type() -> Result<TypeDescriptor, TypeParseError> {
    TypeDescriptor::builder("String")
        .constructor(&[], |_| Ok(Value::string("")))
        .constructor(&["String"], |args| match &args[0] {
            Value::String(text) => Ok(Value::string(text.clone())),
            _ => Err(Fault::null_pointer("cannot copy a null string")),
        })
        .method("length", &[], "int", |this, _| {
            Ok(Value::Int(this_string(this)?.chars().count() as i32))
        })
        .method("isEmpty", &[], "boolean", |this, _| {
            Ok(Value::Bool(this_string(this)?.is_empty()))
        })
        .method("charAt", &["int"], "char", |this, args| {
            let text = this_string(this)?;
            let index = int_arg(args, 0)?;
            usize::try_from(index)
                .ok()
                .and_then(|idx| text.chars().nth(idx))
                .map(Value::Char)
                .ok_or_else(|| Fault::index_out_of_bounds(index, text.chars().count()))
        })
        .method("concat", &["String"], "String", |this, args| {
            let tail = args[0]
                .as_str()
                .ok_or_else(|| Fault::null_pointer("concat(null)"))?;
            Ok(Value::string(format!("{}{tail}", this_string(this)?)))
        })
        .method("toUpperCase", &[], "String", |this, _| {
            Ok(Value::string(this_string(this)?.to_uppercase()))
        })
        .method("equals", &["Object"], "boolean", |this, args| {
            Ok(Value::Bool(*this == args[0]))
        })
        .build()
}

fn new_list() -> InvokeResult {
    Ok(Value::Object(ObjectRef::new(ARRAY_LIST, Vec::<Value>::new())))
}

fn array_list_type() -> Result<TypeDescriptor, TypeParseError> {
    TypeDescriptor::builder(ARRAY_LIST)
        .constructor(&[], |_| new_list())
        .constructor(&["int"], |args| {
            if int_arg(args, 0)? < 0 {
                return Err(Fault::illegal_argument("negative capacity"));
            }
            new_list()
        })
        .method("add", &["Object"], "boolean", |this, args| {
            list_state(this, |items| items.push(args[0].clone()))?;
            Ok(Value::Bool(true))
        })
        .method("get", &["int"], "Object", |this, args| {
            let index = int_arg(args, 0)?;
            list_state(this, |items| {
                list_index(items, index).map(|idx| items[idx].clone())
            })?
        })
        .method("set", &["int", "Object"], "Object", |this, args| {
            let index = int_arg(args, 0)?;
            list_state(this, |items| {
                list_index(items, index)
                    .map(|idx| std::mem::replace(&mut items[idx], args[1].clone()))
            })?
        })
        .method("remove", &["int"], "Object", |this, args| {
            let index = int_arg(args, 0)?;
            list_state(this, |items| {
                list_index(items, index).map(|idx| items.remove(idx))
            })?
        })
        .method("size", &[], "int", |this, _| {
            list_state(this, |items| Value::Int(items.len() as i32))
        })
        .method("isEmpty", &[], "boolean", |this, _| {
            list_state(this, |items| Value::Bool(items.is_empty()))
        })
        .method("contains", &["Object"], "boolean", |this, args| {
            list_state(this, |items| {
                Value::Bool(items.iter().any(|item| item.loosely_equals(&args[0])))
            })
        })
        .method("clear", &[], "void", |this, _| {
            list_state(this, |items| items.clear())?;
            Ok(Value::Null)
        })
        .build()
}

fn math_type() -> Result<TypeDescriptor, TypeParseError> {
    TypeDescriptor::builder(MATH)
        .static_method("abs", &["int"], "int", |args| {
            Ok(Value::Int((int_arg(args, 0)? as i32).wrapping_abs()))
        })
        .static_method("abs", &["long"], "long", |args| {
            Ok(Value::Long(int_arg(args, 0)?.wrapping_abs()))
        })
        .static_method("abs", &["double"], "double", |args| {
            Ok(Value::Double(float_arg(args, 0)?.abs()))
        })
        .static_method("max", &["int", "int"], "int", |args| {
            Ok(Value::Int(int_arg(args, 0)?.max(int_arg(args, 1)?) as i32))
        })
        .static_method("max", &["double", "double"], "double", |args| {
            Ok(Value::Double(float_arg(args, 0)?.max(float_arg(args, 1)?)))
        })
        .static_method("min", &["int", "int"], "int", |args| {
            Ok(Value::Int(int_arg(args, 0)?.min(int_arg(args, 1)?) as i32))
        })
        .static_method("min", &["double", "double"], "double", |args| {
            Ok(Value::Double(float_arg(args, 0)?.min(float_arg(args, 1)?)))
        })
        .static_method("random", &[], "double", |_| {
            Ok(Value::Double(rand::thread_rng().gen::<f64>()))
        })
        .build()
}

fn array_type() -> Result<TypeDescriptor, TypeParseError> {
    TypeDescriptor::builder(ARRAY_TYPE)
        .method("length", &[], "int", |this, _| {
            Ok(Value::Int(array_arg(this)?.len() as i32))
        })
        .method("get", &["int"], "Object", |this, args| {
            array_arg(this)?.get(int_arg(args, 0)?)
        })
        .method("set", &["int", "Object"], "Object", |this, args| {
            array_arg(this)?.set(int_arg(args, 0)?, args[1].clone())
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::types::TypeRef;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        register_builtins(&mut registry).unwrap();
        registry
    }

    #[test]
    fn lists_behave_like_array_lists() {
        let registry = registry();
        let list_type = registry.get("List").unwrap();
        assert_eq!(list_type.name(), ARRAY_LIST);
        let list = list_type.constructors()[0].call(&Value::Null, &[]).unwrap();
        let add = list_type.lookup("add", 1).next().unwrap();
        add.call(&list, &[Value::Int(7)]).unwrap();
        add.call(&list, &[Value::string("x")]).unwrap();
        let get = list_type.lookup("get", 1).next().unwrap();
        assert_eq!(get.call(&list, &[Value::Int(1)]).unwrap(), Value::string("x"));
        let fault = get.call(&list, &[Value::Int(5)]).unwrap_err();
        assert_eq!(fault.kind, "java.lang.IndexOutOfBoundsException");
        let size = list_type.lookup("size", 0).next().unwrap();
        assert_eq!(size.call(&list, &[]).unwrap(), Value::Int(2));
    }

    #[test]
    fn math_statics_and_strings() {
        let registry = registry();
        let math = registry.get("Math").unwrap();
        let int = TypeRef::parse("int").unwrap();
        let max = math.find_method("max", &[int.clone(), int]).unwrap();
        assert_eq!(
            max.call(&Value::Null, &[Value::Int(3), Value::Int(9)]).unwrap(),
            Value::Int(9)
        );
        let random = math.lookup("random", 0).next().unwrap();
        let value = random.call(&Value::Null, &[]).unwrap().as_f64().unwrap();
        assert!((0.0..1.0).contains(&value));

        let string = registry.get("java.lang.String").unwrap();
        let length = string.lookup("length", 0).next().unwrap();
        assert_eq!(
            length.call(&Value::string("héllo"), &[]).unwrap(),
            Value::Int(5)
        );
    }
}
