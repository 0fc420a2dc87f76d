use crate::language::errors::TypeParseError;
use nom::{
    bytes::complete::{tag, take_while},
    character::complete::{multispace0, satisfy},
    combinator::{all_consuming, recognize},
    multi::many0,
    sequence::{delimited, pair, terminated},
    IResult, Parser as NomParser,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub fn keyword(&self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "boolean" => Primitive::Boolean,
            "byte" => Primitive::Byte,
            "short" => Primitive::Short,
            "char" => Primitive::Char,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            _ => return None,
        })
    }

    /// Boxed wrapper classes collapse onto their primitive.
    pub fn from_boxed(class: &str) -> Option<Self> {
        let simple = class.strip_prefix("java.lang.").unwrap_or(class);
        Some(match simple {
            "Boolean" => Primitive::Boolean,
            "Byte" => Primitive::Byte,
            "Short" => Primitive::Short,
            "Character" => Primitive::Char,
            "Integer" => Primitive::Int,
            "Long" => Primitive::Long,
            "Float" => Primitive::Float,
            "Double" => Primitive::Double,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Primitive::Boolean)
    }

    fn widening_rank(&self) -> Option<u8> {
        match self {
            Primitive::Byte => Some(1),
            Primitive::Short => Some(2),
            Primitive::Char => Some(2),
            Primitive::Int => Some(3),
            Primitive::Long => Some(4),
            Primitive::Float => Some(5),
            Primitive::Double => Some(6),
            Primitive::Boolean => None,
        }
    }

    pub fn widens_to(&self, target: Primitive) -> bool {
        if *self == target {
            return true;
        }
        // char and short are not convertible into each other
        if matches!(
            (self, target),
            (Primitive::Char, Primitive::Short) | (Primitive::Short, Primitive::Char) | (Primitive::Byte, Primitive::Char)
        ) {
            return false;
        }
        match (self.widening_rank(), target.widening_rank()) {
            (Some(from), Some(to)) => from < to,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeRef {
    Void,
    Null,
    Primitive(Primitive),
    Class(String),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn object() -> Self {
        TypeRef::Class(OBJECT.to_string())
    }

    pub fn string() -> Self {
        TypeRef::Class(STRING.to_string())
    }

    pub fn class(name: impl AsRef<str>) -> Self {
        TypeRef::Class(canonical_class_name(name.as_ref()))
    }

    pub fn array_of(elem: TypeRef) -> Self {
        TypeRef::Array(Box::new(elem))
    }

    pub fn parse(text: &str) -> Result<Self, TypeParseError> {
        match all_consuming(delimited(multispace0, type_ref, multispace0)).parse(text) {
            Ok((_, ty)) => Ok(ty),
            Err(_) => Err(TypeParseError {
                text: text.to_string(),
            }),
        }
    }

    /// Boxed numerics become primitives, recursively through arrays.
    pub fn normalized(&self) -> TypeRef {
        match self {
            TypeRef::Class(name) => match Primitive::from_boxed(name) {
                Some(primitive) => TypeRef::Primitive(primitive),
                None => self.clone(),
            },
            TypeRef::Array(elem) => TypeRef::Array(Box::new(elem.normalized())),
            other => other.clone(),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeRef::Class(name) if name == OBJECT)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TypeRef::Class(_) | TypeRef::Array(_) | TypeRef::Null)
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self.normalized() {
            TypeRef::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Whether a value of type `self` can be passed where `target` is declared.
    pub fn is_assignable_to(&self, target: &TypeRef) -> bool {
        let from = self.normalized();
        let to = target.normalized();
        if from == to {
            return true;
        }
        match (&from, &to) {
            (TypeRef::Void, _) | (_, TypeRef::Void) => false,
            (_, TypeRef::Class(name)) if name == OBJECT => true,
            (TypeRef::Null, TypeRef::Class(_) | TypeRef::Array(_)) => true,
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a.widens_to(*b),
            (TypeRef::Array(a), TypeRef::Array(b)) => a.is_reference() && a.is_assignable_to(b),
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Null => write!(f, "null"),
            TypeRef::Primitive(primitive) => write!(f, "{}", primitive.keyword()),
            TypeRef::Class(name) => write!(f, "{name}"),
            TypeRef::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

/// `String` and friends are written unqualified in sheets and interface queries.
pub fn canonical_class_name(name: &str) -> String {
    match name {
        "Object" | "String" | "Integer" | "Long" | "Short" | "Byte" | "Character" | "Boolean"
        | "Float" | "Double" | "Math" | "Number" | "CharSequence" => format!("java.lang.{name}"),
        other => other.to_string(),
    }
}

pub(crate) fn qualified_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(identifier, many0(pair(tag("."), identifier)))).parse(input)
}

pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))
    .parse(input)
}

pub(crate) fn type_ref(input: &str) -> IResult<&str, TypeRef> {
    let (input, name) = terminated(qualified_name, multispace0).parse(input)?;
    let (input, dims) = many0(terminated(
        pair(tag("["), delimited(multispace0, tag("]"), multispace0)),
        multispace0,
    ))
    .parse(input)?;
    let base = match name {
        "void" => TypeRef::Void,
        other => match Primitive::from_keyword(other) {
            Some(primitive) => TypeRef::Primitive(primitive),
            None => TypeRef::class(other),
        },
    };
    let ty = dims
        .into_iter()
        .fold(base, |ty, _| TypeRef::Array(Box::new(ty)));
    Ok((input, ty))
}
