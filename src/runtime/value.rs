use crate::language::types::{Primitive, TypeRef, STRING};
use crate::runtime::error::{EvalError, Fault};
use serde_json::{json, Value as Json};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Array(ArrayValue),
    Object(ObjectRef),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn runtime_type(&self) -> TypeRef {
        match self {
            Value::Null => TypeRef::Null,
            Value::Bool(_) => TypeRef::Primitive(Primitive::Boolean),
            Value::Byte(_) => TypeRef::Primitive(Primitive::Byte),
            Value::Short(_) => TypeRef::Primitive(Primitive::Short),
            Value::Char(_) => TypeRef::Primitive(Primitive::Char),
            Value::Int(_) => TypeRef::Primitive(Primitive::Int),
            Value::Long(_) => TypeRef::Primitive(Primitive::Long),
            Value::Float(_) => TypeRef::Primitive(Primitive::Float),
            Value::Double(_) => TypeRef::Primitive(Primitive::Double),
            Value::String(_) => TypeRef::Class(STRING.to_string()),
            Value::Array(array) => TypeRef::array_of(array.element.clone()),
            Value::Object(object) => TypeRef::class(&object.class),
        }
    }

    /// Integral view, chars included.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Char(v) => Some(i64::from(u32::from(*v))),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Value::Float(_) | Value::Double(_))
    }

    /// Default element of a freshly allocated array.
    pub fn zero(ty: &TypeRef) -> Value {
        match ty.normalized() {
            TypeRef::Primitive(Primitive::Boolean) => Value::Bool(false),
            TypeRef::Primitive(Primitive::Byte) => Value::Byte(0),
            TypeRef::Primitive(Primitive::Short) => Value::Short(0),
            TypeRef::Primitive(Primitive::Char) => Value::Char('\0'),
            TypeRef::Primitive(Primitive::Int) => Value::Int(0),
            TypeRef::Primitive(Primitive::Long) => Value::Long(0),
            TypeRef::Primitive(Primitive::Float) => Value::Float(0.0),
            TypeRef::Primitive(Primitive::Double) => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    /// Widens or narrows a numeric value to `target`. Floating values only narrow
    /// to integral types when they carry no fraction.
    pub fn convert_to(&self, target: Primitive) -> Result<Value, EvalError> {
        let fail = || EvalError::Conversion {
            value: self.to_string(),
            target: target.keyword().to_string(),
        };
        if target == Primitive::Boolean {
            return match self {
                Value::Bool(_) => Ok(self.clone()),
                _ => Err(fail()),
            };
        }
        // Java narrowing: floating values truncate toward zero and saturate,
        // integral values keep their low bits.
        let integral = match self {
            Value::Float(_) | Value::Double(_) => {
                let v = self.as_f64().ok_or_else(fail)?;
                match target {
                    Primitive::Float => return Ok(Value::Float(v as f32)),
                    Primitive::Double => return Ok(Value::Double(v)),
                    Primitive::Long => v as i64,
                    _ => i64::from(v as i32),
                }
            }
            other => other.as_i64().ok_or_else(fail)?,
        };
        Ok(match target {
            Primitive::Byte => Value::Byte(integral as i8),
            Primitive::Short => Value::Short(integral as i16),
            Primitive::Char => {
                Value::Char(char::from_u32(u32::from(integral as u16)).ok_or_else(fail)?)
            }
            Primitive::Int => Value::Int(integral as i32),
            Primitive::Long => Value::Long(integral),
            Primitive::Float => Value::Float(integral as f32),
            Primitive::Double => Value::Double(integral as f64),
            Primitive::Boolean => return Err(fail()),
        })
    }

    /// Whether both sides denote the same heap object.
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Width-insensitive comparison used for expectations: numbers by value,
    /// arrays element-wise, objects by identity.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let left = a.items.borrow();
                let right = b.items.borrow();
                left.len() == right.len()
                    && left.iter().zip(right.iter()).all(|(l, r)| l.loosely_equals(r))
            }
            (l, r) if l.is_numeric() && r.is_numeric() => {
                if l.is_floating() || r.is_floating() {
                    l.as_f64() == r.as_f64()
                } else {
                    l.as_i64() == r.as_i64()
                }
            }
            (l, r) => l == r,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => json!(v),
            Value::Char(v) => json!(v.to_string()),
            Value::Float(v) => json!(v),
            Value::Double(v) => json!(v),
            Value::String(v) => json!(v),
            Value::Array(array) => {
                Json::Array(array.items.borrow().iter().map(Value::to_json).collect())
            }
            Value::Object(_) => json!(self.to_string()),
            other => other.as_i64().map(|v| json!(v)).unwrap_or(Json::Null),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Double(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Array(array) => {
                write!(f, "[")?;
                for (idx, value) in array.items.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "{object}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ArrayValue {
    pub element: TypeRef,
    pub items: Rc<RefCell<Vec<Value>>>,
}

impl ArrayValue {
    pub fn new(element: TypeRef, items: Vec<Value>) -> Self {
        Self {
            element,
            items: Rc::new(RefCell::new(items)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: i64) -> Result<Value, Fault> {
        let items = self.items.borrow();
        usize::try_from(index)
            .ok()
            .and_then(|idx| items.get(idx).cloned())
            .ok_or_else(|| Fault::index_out_of_bounds(index, items.len()))
    }

    pub fn set(&self, index: i64, value: Value) -> Result<Value, Fault> {
        let mut items = self.items.borrow_mut();
        let len = items.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|idx| items.get_mut(idx))
            .ok_or_else(|| Fault::index_out_of_bounds(index, len))?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn ptr_eq(&self, other: &ArrayValue) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }
}

/// Instance of a registered type: class name plus its native state.
#[derive(Clone)]
pub struct ObjectRef {
    pub class: String,
    state: Rc<RefCell<dyn Any>>,
}

impl ObjectRef {
    pub fn new<T: Any>(class: impl Into<String>, state: T) -> Self {
        Self {
            class: class.into(),
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Runs `f` against the native state, faulting if it is not a `T` or already borrowed.
    pub fn with_state<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, Fault> {
        let mut guard = self.state.try_borrow_mut().map_err(|_| {
            Fault::new(
                "java.util.ConcurrentModificationException",
                format!("{} is already in use", self.class),
            )
        })?;
        match guard.downcast_mut::<T>() {
            Some(state) => Ok(f(state)),
            None => Err(Fault::new(
                "java.lang.ClassCastException",
                format!("{} has unexpected native state", self.class),
            )),
        }
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub fn identity_hash(&self) -> usize {
        Rc::as_ptr(&self.state) as *const () as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("class", &self.class)
            .field("identity", &format_args!("{:#x}", self.identity_hash()))
            .finish()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class, self.identity_hash() & 0xffff_ffff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_truncates_and_wraps() {
        assert_eq!(
            Value::Int(3).convert_to(Primitive::Short).unwrap(),
            Value::Short(3)
        );
        assert_eq!(
            Value::Double(4.0).convert_to(Primitive::Int).unwrap(),
            Value::Int(4)
        );
        assert_eq!(
            Value::Double(1.5).convert_to(Primitive::Float).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            Value::Double(2.5).convert_to(Primitive::Int).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            Value::Double(-2.7).convert_to(Primitive::Long).unwrap(),
            Value::Long(-2)
        );
        assert_eq!(
            Value::Double(1e12).convert_to(Primitive::Int).unwrap(),
            Value::Int(i32::MAX)
        );
        assert_eq!(
            Value::Double(f64::NAN).convert_to(Primitive::Short).unwrap(),
            Value::Short(0)
        );
        assert_eq!(
            Value::Int(70_000).convert_to(Primitive::Short).unwrap(),
            Value::Short(4_464)
        );
        assert_eq!(
            Value::Long(300).convert_to(Primitive::Byte).unwrap(),
            Value::Byte(44)
        );
        assert!(Value::Int(0xD800).convert_to(Primitive::Char).is_err());
        assert!(Value::string("x").convert_to(Primitive::Int).is_err());
        assert_eq!(
            Value::Int(97).convert_to(Primitive::Char).unwrap(),
            Value::Char('a')
        );
    }

    #[test]
    fn loose_equality_ignores_width_but_not_identity() {
        assert!(Value::Short(1).loosely_equals(&Value::Long(1)));
        assert!(Value::Int(2).loosely_equals(&Value::Double(2.0)));
        assert!(!Value::Int(2).loosely_equals(&Value::string("2")));
        let a = Value::Array(ArrayValue::new(
            TypeRef::Primitive(Primitive::Int),
            vec![Value::Int(1), Value::Int(2)],
        ));
        let b = Value::Array(ArrayValue::new(
            TypeRef::Primitive(Primitive::Long),
            vec![Value::Long(1), Value::Long(2)],
        ));
        assert!(a.loosely_equals(&b));
        assert_ne!(a, b);

        let first = Value::Object(ObjectRef::new("Box", 1u8));
        let second = Value::Object(ObjectRef::new("Box", 1u8));
        assert!(first.same_identity(&first.clone()));
        assert!(!first.loosely_equals(&second));
    }

    #[test]
    fn object_state_is_shared_between_clones() {
        let object = ObjectRef::new("Counter", 0i32);
        let alias = object.clone();
        alias.with_state::<i32, _>(|count| *count += 5).unwrap();
        assert_eq!(object.with_state::<i32, _>(|count| *count).unwrap(), 5);
        assert!(object.with_state::<String, _>(|_| ()).is_err());
    }

    #[test]
    fn arrays_report_bounds_faults() {
        let array = ArrayValue::new(TypeRef::string(), vec![Value::Null]);
        assert_eq!(array.set(0, Value::string("a")).unwrap(), Value::Null);
        assert_eq!(array.get(0).unwrap(), Value::string("a"));
        let fault = array.get(3).unwrap_err();
        assert_eq!(fault.kind, "java.lang.IndexOutOfBoundsException");
        assert_eq!(Value::Array(array).to_string(), "[a]");
    }
}
