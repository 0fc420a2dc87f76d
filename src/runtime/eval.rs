use crate::language::types::{qualified_name, Primitive, TypeRef};
use crate::runtime::{
    environment::TypeEnvironment,
    error::{EvalError, Fault},
    registry::{select, MemberKind},
    value::{ArrayValue, Value},
};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, not, opt, recognize, value},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult, Parser as NomParser,
};

/// Result of evaluating literal text: its declared type and runtime value.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluated {
    pub ty: TypeRef,
    pub value: Value,
}

/// Turns literal text into a typed value inside a live type environment.
pub trait Evaluator: Send + Sync {
    fn eval(
        &self,
        text: &str,
        expected: Option<&TypeRef>,
        env: &mut TypeEnvironment,
    ) -> Result<Evaluated, EvalError>;
}

/// Default evaluator for the Java-flavoured literal and expression syntax used in sheets.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpressionEvaluator;

impl Evaluator for ExpressionEvaluator {
    fn eval(
        &self,
        text: &str,
        expected: Option<&TypeRef>,
        env: &mut TypeEnvironment,
    ) -> Result<Evaluated, EvalError> {
        let expected = expected.map(TypeRef::normalized);
        let expected = expected.as_ref();
        let trimmed = text.trim();

        if let Some(inner) = unwrap_typographic(trimmed) {
            return Ok(Evaluated {
                ty: TypeRef::string(),
                value: Value::string(inner),
            });
        }

        let rewritten;
        let source = if trimmed.starts_with('{') || trimmed.starts_with('[') {
            match expected {
                Some(array @ TypeRef::Array(_)) => {
                    rewritten = format!("new {array}{}", braces(trimmed));
                    rewritten.as_str()
                }
                _ => {
                    return Err(EvalError::ArrayShorthand {
                        text: trimmed.to_string(),
                    })
                }
            }
        } else {
            trimmed
        };

        let expr = parse_expression(source)?;
        let value = coerce(evaluate(&expr, expected, env)?, expected)?;
        let ty = match (&value, expected) {
            (Value::Null, Some(expected)) => expected.clone(),
            (value, _) => value.runtime_type(),
        };
        env.observe(&ty);
        Ok(Evaluated { ty, value })
    }
}

const QUOTE_PAIRS: [(char, char); 6] = [
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
    ('\u{201E}', '\u{201C}'),
    ('\u{201E}', '\u{201D}'),
    ('\u{00AB}', '\u{00BB}'),
    ('\u{00BB}', '\u{00AB}'),
];

fn unwrap_typographic(text: &str) -> Option<&str> {
    QUOTE_PAIRS.iter().find_map(|(open, close)| {
        text.strip_prefix(*open)
            .and_then(|rest| rest.strip_suffix(*close))
    })
}

/// `[1, [2]]` becomes `{1, {2}}`; quoted text is left alone.
fn braces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        match (quote, c) {
            (Some(_), _) if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(c),
            _ => {}
        }
        out.push(match (quote, c) {
            (None, '[') => '{',
            (None, ']') => '}',
            _ => c,
        });
    }
    out
}

fn coerce(value: Value, expected: Option<&TypeRef>) -> Result<Value, EvalError> {
    match expected {
        Some(TypeRef::Primitive(target)) if target.is_numeric() && value.is_numeric() => {
            value.convert_to(*target)
        }
        _ => Ok(value),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Null,
    Bool(bool),
    Quoted(String),
    Text(String),
    Integer { value: i64, long: bool },
    Floating { value: f64, single: bool },
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    New { class: String, args: Vec<Expr> },
    NewArray {
        element: String,
        dims: Vec<Option<Expr>>,
        init: Option<Vec<Init>>,
    },
    Call { target: String, args: Vec<Expr> },
    Name(String),
}

#[derive(Clone, Debug, PartialEq)]
enum Init {
    Item(Expr),
    Nested(Vec<Init>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn from_char(c: char) -> Self {
        match c {
            '+' => BinOp::Add,
            '-' => BinOp::Sub,
            '*' => BinOp::Mul,
            '/' => BinOp::Div,
            _ => BinOp::Rem,
        }
    }

    fn symbol(&self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Rem => '%',
        }
    }
}

fn parse_expression(text: &str) -> Result<Expr, EvalError> {
    all_consuming(delimited(multispace0, expression, multispace0))
        .parse(text)
        .map(|(_, expr)| expr)
        .map_err(|_| EvalError::Syntax {
            text: text.to_string(),
        })
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: NomParser<&'a str, O, nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(
        tag(word),
        not(satisfy(|c: char| c.is_alphanumeric() || c == '_' || c == '$')),
    )
}

fn fold_binary(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter().fold(first, |lhs, (op, rhs)| {
        Expr::Binary(BinOp::from_char(op), Box::new(lhs), Box::new(rhs))
    })
}

fn expression(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term)).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/%")), unary)).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('-')), unary), |expr| Expr::Neg(Box::new(expr))),
        ws(primary),
    ))
    .parse(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
    alt((
        delimited(char('('), expression, char(')')),
        literal,
        new_expression,
        call_or_name,
    ))
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Expr> {
    alt((
        value(Expr::Null, keyword("null")),
        value(Expr::Bool(true), keyword("true")),
        value(Expr::Bool(false), keyword("false")),
        map(quoted('\''), Expr::Quoted),
        map(quoted('"'), Expr::Text),
        number,
    ))
    .parse(input)
}

fn quoted<'a>(delimiter: char) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    let stop: &'static str = if delimiter == '\'' { "\\'" } else { "\\\"" };
    delimited(
        char(delimiter),
        map(
            opt(nom::bytes::complete::escaped_transform(
                is_not(stop),
                '\\',
                alt((
                    value('\\', char('\\')),
                    value('\'', char('\'')),
                    value('"', char('"')),
                    value('\n', char('n')),
                    value('\t', char('t')),
                    value('\r', char('r')),
                    value('\0', char('0')),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char(delimiter),
    )
}

fn number(input: &str) -> IResult<&str, Expr> {
    let (rest, digits) = recognize(tuple((
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))
    .parse(input)?;
    let (rest, suffix) = opt(one_of("lLfFdD")).parse(rest)?;
    let invalid = || {
        nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))
    };
    let floating =
        digits.contains(['.', 'e', 'E']) || matches!(suffix, Some('f' | 'F' | 'd' | 'D'));
    let expr = if floating {
        Expr::Floating {
            value: digits.parse().map_err(|_| invalid())?,
            single: matches!(suffix, Some('f' | 'F')),
        }
    } else {
        Expr::Integer {
            value: digits.parse().map_err(|_| invalid())?,
            long: matches!(suffix, Some('l' | 'L')),
        }
    };
    Ok((rest, expr))
}

fn arguments(input: &str) -> IResult<&str, Vec<Expr>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )
    .parse(input)
}

fn new_expression(input: &str) -> IResult<&str, Expr> {
    let (input, class) = preceded(ws(keyword("new")), ws(qualified_name)).parse(input)?;
    if let Ok((rest, args)) = arguments(input) {
        return Ok((
            rest,
            Expr::New {
                class: class.to_string(),
                args,
            },
        ));
    }
    let (input, dims) =
        many1(delimited(ws(char('[')), opt(expression), ws(char(']')))).parse(input)?;
    let (input, init) = opt(initializer).parse(input)?;
    Ok((
        input,
        Expr::NewArray {
            element: class.to_string(),
            dims,
            init,
        },
    ))
}

fn initializer(input: &str) -> IResult<&str, Vec<Init>> {
    delimited(
        ws(char('{')),
        terminated(
            separated_list0(ws(char(',')), init_item),
            opt(ws(char(','))),
        ),
        ws(char('}')),
    )
    .parse(input)
}

fn init_item(input: &str) -> IResult<&str, Init> {
    alt((map(initializer, Init::Nested), map(expression, Init::Item))).parse(input)
}

fn call_or_name(input: &str) -> IResult<&str, Expr> {
    let (input, name) = qualified_name(input)?;
    let (input, args) = opt(arguments).parse(input)?;
    let expr = match args {
        Some(args) => Expr::Call {
            target: name.to_string(),
            args,
        },
        None => Expr::Name(name.to_string()),
    };
    Ok((input, expr))
}

fn element_type(name: &str) -> TypeRef {
    match Primitive::from_keyword(name) {
        Some(primitive) => TypeRef::Primitive(primitive),
        None => TypeRef::class(name),
    }
}

fn evaluate(
    expr: &Expr,
    hint: Option<&TypeRef>,
    env: &mut TypeEnvironment,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Quoted(text) => {
            let mut chars = text.chars();
            match (hint, chars.next(), chars.next()) {
                (Some(TypeRef::Primitive(Primitive::Char)), Some(c), None) => Ok(Value::Char(c)),
                _ => Ok(Value::string(text.clone())),
            }
        }
        Expr::Text(text) => Ok(Value::string(text.clone())),
        Expr::Integer { value, long: true } => Ok(Value::Long(*value)),
        Expr::Integer { value, long: false } => match hint.and_then(TypeRef::primitive) {
            Some(target) if target.is_numeric() => Value::Long(*value).convert_to(target),
            _ => Ok(i32::try_from(*value)
                .map(Value::Int)
                .unwrap_or(Value::Long(*value))),
        },
        Expr::Floating {
            value,
            single: true,
        } => Ok(Value::Float(*value as f32)),
        Expr::Floating { value, .. } => match hint.and_then(TypeRef::primitive) {
            Some(Primitive::Float) => Ok(Value::Float(*value as f32)),
            _ => Ok(Value::Double(*value)),
        },
        Expr::Neg(inner) => negate(evaluate(inner, hint, env)?),
        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, None, env)?;
            let rhs = evaluate(rhs, None, env)?;
            arithmetic(*op, lhs, rhs)
        }
        Expr::New { class, args } => {
            let descriptor = env
                .resolve_type(class)
                .ok_or_else(|| EvalError::UnknownType {
                    name: class.clone(),
                })?;
            let args = evaluate_all(args, env)?;
            let types: Vec<TypeRef> = args.iter().map(Value::runtime_type).collect();
            let ctor = descriptor
                .find_constructor(&types)
                .ok_or_else(|| EvalError::UnknownMember {
                    type_name: descriptor.name().to_string(),
                    name: "<init>".to_string(),
                    arity: args.len(),
                })?;
            ctor.call(&Value::Null, &args).map_err(EvalError::Thrown)
        }
        Expr::NewArray {
            element,
            dims,
            init,
        } => {
            let base = element_type(element);
            env.observe(&base);
            let array_type = dims
                .iter()
                .fold(base, |ty, _| TypeRef::array_of(ty));
            match init {
                Some(items) if dims.iter().all(Option::is_none) => {
                    build_array(&array_type, items, env)
                }
                None => {
                    let mut sizes = Vec::new();
                    for dim in dims.iter().map_while(Option::as_ref) {
                        let size = evaluate(dim, Some(&TypeRef::Primitive(Primitive::Int)), env)?;
                        let size = size.as_i64().ok_or_else(|| EvalError::TypeMismatch {
                            message: format!("array size {size} is not integral"),
                        })?;
                        if size < 0 {
                            return Err(EvalError::Thrown(Fault::new(
                                "java.lang.NegativeArraySizeException",
                                size.to_string(),
                            )));
                        }
                        sizes.push(size as usize);
                    }
                    if sizes.is_empty() || dims.iter().skip(sizes.len()).any(Option::is_some) {
                        return Err(EvalError::Syntax {
                            text: format!("new {element}[..]"),
                        });
                    }
                    Ok(allocate(&array_type, &sizes))
                }
                Some(_) => Err(EvalError::Syntax {
                    text: format!("new {element}[..]{{..}}"),
                }),
            }
        }
        Expr::Call { target, args } => {
            let (type_name, method) =
                target
                    .rsplit_once('.')
                    .ok_or_else(|| EvalError::UnknownSymbol {
                        name: target.clone(),
                    })?;
            let descriptor = env
                .resolve_type(type_name)
                .ok_or_else(|| EvalError::UnknownType {
                    name: type_name.to_string(),
                })?;
            let args = evaluate_all(args, env)?;
            let types: Vec<TypeRef> = args.iter().map(Value::runtime_type).collect();
            let statics = descriptor
                .lookup(method, args.len())
                .filter(|member| member.kind == MemberKind::Static);
            let member = select(statics, &types).ok_or_else(|| EvalError::UnknownMember {
                type_name: descriptor.name().to_string(),
                name: method.to_string(),
                arity: args.len(),
            })?;
            member.call(&Value::Null, &args).map_err(EvalError::Thrown)
        }
        Expr::Name(name) => Err(EvalError::UnknownSymbol { name: name.clone() }),
    }
}

fn evaluate_all(args: &[Expr], env: &mut TypeEnvironment) -> Result<Vec<Value>, EvalError> {
    args.iter().map(|arg| evaluate(arg, None, env)).collect()
}

fn build_array(
    array_type: &TypeRef,
    items: &[Init],
    env: &mut TypeEnvironment,
) -> Result<Value, EvalError> {
    let element = array_type
        .element()
        .cloned()
        .ok_or_else(|| EvalError::TypeMismatch {
            message: format!("nested initializer for non-array {array_type}"),
        })?;
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let value = match item {
            Init::Nested(inner) => build_array(&element, inner, env)?,
            Init::Item(expr) => coerce(evaluate(expr, Some(&element), env)?, Some(&element))?,
        };
        values.push(value);
    }
    Ok(Value::Array(ArrayValue::new(element, values)))
}

fn allocate(array_type: &TypeRef, sizes: &[usize]) -> Value {
    let Some(element) = array_type.element() else {
        return Value::Null;
    };
    let items = match sizes.split_first() {
        Some((len, [])) => vec![Value::zero(element); *len],
        Some((len, rest)) => (0..*len).map(|_| allocate(element, rest)).collect(),
        None => Vec::new(),
    };
    Value::Array(ArrayValue::new(element.clone(), items))
}

fn negate(value: Value) -> Result<Value, EvalError> {
    Ok(match value {
        Value::Byte(v) => Value::Byte(v.wrapping_neg()),
        Value::Short(v) => Value::Short(v.wrapping_neg()),
        Value::Char(c) => Value::Int(-(u32::from(c) as i32)),
        Value::Int(v) => Value::Int(v.wrapping_neg()),
        Value::Long(v) => Value::Long(v.wrapping_neg()),
        Value::Float(v) => Value::Float(-v),
        Value::Double(v) => Value::Double(-v),
        other => {
            return Err(EvalError::TypeMismatch {
                message: format!("cannot negate {}", other.runtime_type()),
            })
        }
    })
}

fn numeric_rank(value: &Value) -> u8 {
    match value {
        Value::Double(_) => 3,
        Value::Float(_) => 2,
        Value::Long(_) => 1,
        _ => 0,
    }
}

fn arithmetic(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    if op == BinOp::Add && (matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_))) {
        return Ok(Value::string(format!("{lhs}{rhs}")));
    }
    let mismatch = || EvalError::TypeMismatch {
        message: format!(
            "cannot apply `{}` to {} and {}",
            op.symbol(),
            lhs.runtime_type(),
            rhs.runtime_type()
        ),
    };
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return Err(mismatch());
    }
    match numeric_rank(&lhs).max(numeric_rank(&rhs)) {
        3 => {
            let (a, b) = (lhs.as_f64().ok_or_else(mismatch)?, rhs.as_f64().ok_or_else(mismatch)?);
            Ok(Value::Double(float_op(op, a, b)))
        }
        2 => {
            let (a, b) = (lhs.as_f64().ok_or_else(mismatch)?, rhs.as_f64().ok_or_else(mismatch)?);
            Ok(Value::Float(float_op(op, a, b) as f32))
        }
        1 => {
            let (a, b) = (lhs.as_i64().ok_or_else(mismatch)?, rhs.as_i64().ok_or_else(mismatch)?);
            Ok(Value::Long(long_op(op, a, b)?))
        }
        _ => {
            let (a, b) = (lhs.as_i64().ok_or_else(mismatch)?, rhs.as_i64().ok_or_else(mismatch)?);
            Ok(Value::Int(int_op(op, a as i32, b as i32)?))
        }
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
    }
}

fn division_by_zero() -> EvalError {
    EvalError::Thrown(Fault::arithmetic("/ by zero"))
}

fn long_op(op: BinOp, a: i64, b: i64) -> Result<i64, EvalError> {
    Ok(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div if b == 0 => return Err(division_by_zero()),
        BinOp::Div => a.wrapping_div(b),
        BinOp::Rem if b == 0 => return Err(division_by_zero()),
        BinOp::Rem => a.wrapping_rem(b),
    })
}

fn int_op(op: BinOp, a: i32, b: i32) -> Result<i32, EvalError> {
    Ok(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div if b == 0 => return Err(division_by_zero()),
        BinOp::Div => a.wrapping_div(b),
        BinOp::Rem if b == 0 => return Err(division_by_zero()),
        BinOp::Rem => a.wrapping_rem(b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::registry::TypeRegistry;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn env() -> TypeEnvironment {
        TypeEnvironment::new(Arc::new(TypeRegistry::with_builtins().unwrap()))
    }

    fn eval(text: &str, expected: Option<&str>) -> Result<Evaluated, EvalError> {
        let expected = expected.map(|ty| TypeRef::parse(ty).unwrap());
        ExpressionEvaluator.eval(text, expected.as_ref(), &mut env())
    }

    fn value(text: &str, expected: Option<&str>) -> Value {
        eval(text, expected).unwrap().value
    }

    #[test]
    fn narrow_targets_keep_their_width() {
        let evaluated = eval("3", Some("short")).unwrap();
        assert_eq!(evaluated.value, Value::Short(3));
        assert_eq!(evaluated.ty, TypeRef::Primitive(Primitive::Short));
        assert_eq!(value("3", Some("java.lang.Byte")), Value::Byte(3));
        assert_eq!(value("1.5", Some("float")), Value::Float(1.5));
        assert_eq!(value("2.0", Some("int")), Value::Int(2));
        assert_eq!(value("-3", Some("short")), Value::Short(-3));
        assert_eq!(value("3", None), Value::Int(3));
        assert_eq!(value("3000000000", None), Value::Long(3_000_000_000));
        assert_eq!(value("3L", None), Value::Long(3));
    }

    #[test]
    fn out_of_range_literals_narrow_like_casts() {
        assert_eq!(value("2.5", Some("int")), Value::Int(2));
        assert_eq!(value("-2.5", Some("int")), Value::Int(-2));
        assert_eq!(value("300", Some("byte")), Value::Byte(44));
        assert_eq!(value("-128", Some("byte")), Value::Byte(-128));
        assert_eq!(value("70000", Some("short")), Value::Short(4_464));
        assert_eq!(value("9.99", Some("java.lang.Long")), Value::Long(9));
    }

    #[test]
    fn strings_chars_and_typographic_quotes() {
        assert_eq!(value("'Hello World!'", None), Value::string("Hello World!"));
        assert_eq!(value("'a'", Some("char")), Value::Char('a'));
        assert_eq!(value("'a'", Some("String")), Value::string("a"));
        assert_eq!(value("''", None), Value::string(""));
        assert_eq!(value(r#""tab\there""#, None), Value::string("tab\there"));
        assert_eq!(value("\u{201C}quoted\u{201D}", None), Value::string("quoted"));
        assert_eq!(value("\u{00AB}guillemets\u{00BB}", None), Value::string("guillemets"));
        let null = eval("null", Some("String")).unwrap();
        assert_eq!(null.value, Value::Null);
        assert_eq!(null.ty, TypeRef::string());
    }

    #[test]
    fn array_shorthand_uses_the_expected_type() {
        let evaluated = eval("[1, 2, 3]", Some("int[]")).unwrap();
        assert_eq!(evaluated.ty.to_string(), "int[]");
        assert_eq!(evaluated.value.to_string(), "[1, 2, 3]");

        let nested = value("{{1}, {2, 3}}", Some("long[][]"));
        assert_eq!(nested.to_string(), "[[1], [2, 3]]");
        let Value::Array(outer) = nested else {
            panic!("expected an array");
        };
        assert_eq!(outer.element.to_string(), "long[]");

        assert_eq!(
            value("['a]', 'b']", Some("String[]")).to_string(),
            "[a], b]"
        );
        assert!(matches!(
            eval("[1, 2]", None),
            Err(EvalError::ArrayShorthand { .. })
        ));
    }

    #[test]
    fn array_allocation_and_initializers() {
        assert_eq!(value("new int[2]", None).to_string(), "[0, 0]");
        assert_eq!(value("new int[2][1]", None).to_string(), "[[0], [0]]");
        assert_eq!(value("new String[]{'a', null}", None).to_string(), "[a, null]");
        assert!(eval("new int[]", None).is_err());
    }

    #[test]
    fn arithmetic_follows_numeric_promotion() {
        assert_eq!(value("1 + 2 * 3", None), Value::Int(7));
        assert_eq!(value("(1 + 2) * 3", None), Value::Int(9));
        assert_eq!(value("7 % 3", None), Value::Int(1));
        assert_eq!(value("2.5 * 2", None), Value::Double(5.0));
        assert_eq!(value("1 + 2L", None), Value::Long(3));
        assert_eq!(value("'a' + 1", None), Value::string("a1"));
        assert!(matches!(
            eval("7 / 0", None),
            Err(EvalError::Thrown(fault)) if fault.kind == "java.lang.ArithmeticException"
        ));
        assert!(matches!(eval("true + 1", None), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn objects_and_static_calls_go_through_the_environment() {
        let list = value("new java.util.ArrayList()", None);
        assert_eq!(list.runtime_type(), TypeRef::class("java.util.ArrayList"));
        assert_eq!(value("Math.max(3, 9)", None), Value::Int(9));
        assert_eq!(value("java.lang.Math.abs(-4)", None), Value::Int(4));
        let random = value("Math.random()", None).as_f64().unwrap();
        assert!((0.0..1.0).contains(&random));
        assert!(matches!(
            eval("new Unknown()", None),
            Err(EvalError::UnknownType { .. })
        ));
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(matches!(eval("1 +", None), Err(EvalError::Syntax { .. })));
        assert!(matches!(
            eval("bogus", None),
            Err(EvalError::UnknownSymbol { .. })
        ));
        assert!(matches!(eval("'open", None), Err(EvalError::Syntax { .. })));
    }
}
